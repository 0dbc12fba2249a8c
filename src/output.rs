//! Structured output extraction for batch replies.
//!
//! A batch prompt may ask the model to wrap its answer as
//! `OUTPUT="""<answer>"""`. When the marker is present only the answer is
//! printed, which lets scripts consume the reply without scraping prose.

use std::sync::LazyLock;

use regex::Regex;

static OUTPUT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)OUTPUT ?= ?"""(.*?)""""#).unwrap());

/// Returns the trimmed payload of the first `OUTPUT="""..."""` marker.
pub fn extract_structured_output(reply: &str) -> Option<&str> {
    OUTPUT_MARKER
        .captures(reply)
        .and_then(|captures| captures.get(1))
        .map(|payload| payload.as_str().trim())
}

/// The text batch mode prints for `reply`.
pub fn batch_output(reply: &str) -> &str {
    extract_structured_output(reply).unwrap_or(reply)
}
