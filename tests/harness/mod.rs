// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the mention pipeline.
//!
//! Scripted Gemini fetcher, recording mail transport and gemtext generators,
//! so whole submissions can be replayed without network access.

#![allow(dead_code)]

pub mod fakes;
pub mod generators;
