//! Cheap pre-parse check for hand-history text.
//!
//! Runs on every inbound message, so it only counts independent regex
//! signatures. Ordinary chat traffic never reaches the parser.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Minimum number of signatures that must match.
pub const MATCH_THRESHOLD: usize = 3;

/// A named pattern that hand-history transcripts usually contain.
#[derive(Debug)]
pub struct Signature {
    pub name: &'static str,
    pub regex: Regex,
}

static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    vec![
        Signature {
            name: "hand number",
            regex: Regex::new(r"(?i)Hand #[\dA-Z]+").unwrap(),
        },
        // Level marker, e.g. `Level12(400/800)`
        Signature {
            name: "blind level",
            regex: Regex::new(r"\d+/[\d,]+\)").unwrap(),
        },
        Signature {
            name: "hole cards section",
            regex: Regex::new(r"\*\*\* HOLE CARDS \*\*\*").unwrap(),
        },
        Signature {
            name: "dealt cards",
            regex: Regex::new(r"Dealt to .+\[.+\]").unwrap(),
        },
    ]
});

/// Names of the signatures found in `text`.
pub fn matched_signatures(text: &str) -> Vec<&'static str> {
    SIGNATURES
        .iter()
        .filter(|sig| sig.regex.is_match(text))
        .map(|sig| sig.name)
        .collect()
}

/// True when at least [`MATCH_THRESHOLD`] signatures match.
pub fn looks_like_hand_history(text: &str) -> bool {
    let matched = matched_signatures(text);
    debug!(
        matched = matched.len(),
        signatures = ?matched,
        "Hand history classification"
    );
    matched.len() >= MATCH_THRESHOLD
}
