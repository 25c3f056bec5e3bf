//! Product-mention extraction from assistant replies.
//!
//! Three independent heuristics run over the reply text: an explicit
//! `SKU: <token>` label, a `producto/<token>` path reference, and a generic
//! "two or three letters, hyphen, code" shape. Results are deduplicated in
//! first-seen order. False positives are harmless because every match is
//! resolved against the catalog before it is shown.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)SKU:\s*([A-ZÀ-ÿ0-9-]+)").expect("labeled SKU pattern is valid")
});

static PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)producto/([A-ZÀ-ÿ0-9-]+)").expect("path SKU pattern is valid")
});

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-zÀ-ÿ0-9-]+").expect("token pattern is valid"));

/// Whole-token shape of a bare SKU, e.g. `MAL-VES-ROJ-001`.
static GENERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-ZÀ-Þ]{2,3}-[A-ZÀ-Þ0-9][A-ZÀ-Þ0-9-]{2,}$").expect("generic SKU pattern is valid")
});

/// Extract candidate SKUs mentioned in `text`, deduplicated, in the order
/// they were first found (labeled, then path, then generic matches).
pub fn extract_skus(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut skus = Vec::new();
    let mut push = |candidate: &str| {
        let candidate = candidate.trim_matches('-');
        if !candidate.is_empty() && seen.insert(candidate.to_string()) {
            skus.push(candidate.to_string());
        }
    };

    for pattern in [&*LABELED, &*PATH] {
        for caps in pattern.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                push(m.as_str());
            }
        }
    }

    for token in TOKEN.find_iter(text) {
        let token = token.as_str().trim_matches('-');
        if GENERIC.is_match(token) {
            push(token);
        }
    }

    if !skus.is_empty() {
        debug!(count = skus.len(), "extracted product mentions");
    }
    skus
}
