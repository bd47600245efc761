//! Message metadata anchors.
//!
//! Archive units are markdown renderings of forum pages:
//!
//! ```text
//! [Original Message ID:A20JX9PGHII]
//! # WING LEADING EDGE MOLDS
//! ### ted davis
//! > Feb 11, 2011, 2:21:35 AM
//! ...body...
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::model::message::MessageMetadata;

static MESSAGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Original Message ID:([^\]]+)\]").expect("valid regex"));

/// `# Subject`, a single-hash heading. `### author` does not match because the
/// first `#` must be followed by whitespace.
static SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#[ \t]+(.+?)[ \t\r]*$").expect("valid regex"));

static AUTHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)###[ \t]+(.+?)[ \t\r]*$").expect("valid regex"));

/// Only the date part of `> Feb 11, 2011, 2:21:35 AM`.
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+([A-Za-z]+\s+\d+,\s+\d{4})").expect("valid regex"));

/// Extract message metadata. Missing anchors yield empty strings.
pub fn extract_metadata(text: &str) -> MessageMetadata {
    MessageMetadata {
        message_id: capture(&MESSAGE_ID, text),
        subject: capture(&SUBJECT, text),
        author: capture(&AUTHOR, text),
        date: capture(&DATE, text),
    }
}

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
