// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Log destinations.
//!
//! Each returns a [`Dispatch`] that the binary installs for the scope of one
//! run with [`tracing::dispatcher::set_default`], so nothing here is global.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::{Dispatch, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy()
}

/// JSON lines appended to the file at `path`, created if missing.
pub fn file_dispatch(path: &Path) -> io::Result<Dispatch> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let subscriber = tracing_subscriber::registry()
        .with(fmt::layer().json().with_writer(Mutex::new(file)))
        .with(filter());
    Ok(Dispatch::new(subscriber))
}

/// Plain text on stderr, which CGI servers forward to their own log.
/// Used until the configuration names a log file.
pub fn stderr_dispatch() -> Dispatch {
    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false)
                .with_target(false),
        )
        .with(filter());
    Dispatch::new(subscriber)
}

/// Discards everything.
pub fn disabled() -> Dispatch {
    Dispatch::none()
}
