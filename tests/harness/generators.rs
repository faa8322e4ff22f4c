// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators.

use gemini_mention::CapsuleConfig;

/// Configuration for a capsule at `root` verifying at most `max_mentions`.
pub fn config(root: &str, max_mentions: usize) -> CapsuleConfig {
    CapsuleConfig::from_toml_str(&format!(
        r#"
CapsuleRootAddress = "{root}"
MaxMentions = {max_mentions}
Contact = "owner@example.org"
From = "mentions@example.org"
SmtpServer = "smtp.example.org"
"#
    ))
    .expect("test configuration parses")
}

/// A reply post replying to each of `targets`.
pub fn reply_document(targets: &[&str]) -> String {
    let mut doc = String::from("# My reply\n\nSome thoughts on your post.\n\n");
    for (i, target) in targets.iter().enumerate() {
        doc.push_str(&format!("=> {target} RE: reply {i}\n"));
    }
    doc.push_str("\n=> gemini://remote.net/ Home\n");
    doc
}

/// Ordinary gemtext with links to the capsule that are not replies.
pub fn document_without_mentions(root: &str) -> String {
    format!(
        "# Links\n\
         => gemini://{root}/post.gmi A good post\n\
         => gemini://other.net/ RE: elsewhere\n\
         * RE: gemini://{root}/post.gmi\n\
         ```\n\
         preformatted\n\
         ```\n"
    )
}

/// `count` mention lines, numbered pages on `root`.
pub fn mention_flood(root: &str, count: usize) -> String {
    (0..count)
        .map(|i| format!("=> gemini://{root}/page-{i}.gmi RE: spam {i}\n"))
        .collect()
}
