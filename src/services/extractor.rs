//! Finds book, movie and music mentions in free text.
//!
//! Matching is a single pass over two ordered pattern families: quoted mentions
//! (`read "Project Hail Mary"`) first, then unquoted intent phrases
//! (`need to watch Dune`). Every capture is cleaned, filtered and deduplicated on
//! its type plus normalized title.

use crate::models::{CandidateReason, RecommendationCandidate, TrackerType};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Ordered (type, pattern) pair; capture group 1 holds the title fragment.
struct IntentPattern {
    item_type: TrackerType,
    regex: Regex,
}

impl IntentPattern {
    fn new(item_type: TrackerType, pattern: &str) -> Self {
        Self {
            item_type,
            regex: Regex::new(pattern).unwrap(),
        }
    }
}

// Keywords sit in `(?-u:...)` groups so case-insensitive matching folds ASCII
// letters only; titles keep full Unicode matching.
const INTENT_PREFIX: &str = r"\b(?-u:need|should|want|plan|remember|gotta|have to|must)\s+(?-u:to)\s+";
const FRAGMENT: &str = r"([^.\n!?;,]+)";

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref NON_ALPHANUMERIC: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    static ref EDGE_QUOTES: Regex = Regex::new(r#"^[\s"']+|[\s"']+$"#).unwrap();
    static ref TRAILING_PARENTHETICAL: Regex = Regex::new(r"\(([^)]+)\)$").unwrap();

    /// Verb plus a title wrapped in single or double quotes.
    static ref QUOTED_PATTERN: Regex =
        Regex::new(r#"(?i)\b((?-u:watch|see|read|listen))(?:\s+(?-u:to))?\s+["']([^"']+)["']"#).unwrap();

    /// Unquoted intent phrases, in priority order.
    static ref INTENT_PATTERNS: Vec<IntentPattern> = vec![
        IntentPattern::new(
            TrackerType::Movie,
            &format!(r"(?i){INTENT_PREFIX}(?-u:watch|see)\s+{FRAGMENT}"),
        ),
        IntentPattern::new(
            TrackerType::Book,
            &format!(r"(?i){INTENT_PREFIX}(?-u:read)\s+{FRAGMENT}"),
        ),
        IntentPattern::new(
            TrackerType::Music,
            &format!(r"(?i){INTENT_PREFIX}(?-u:listen)(?:\s+(?-u:to))?\s+{FRAGMENT}"),
        ),
        IntentPattern::new(TrackerType::Movie, &format!(r"(?i)\b(?-u:watch|see)\s+{FRAGMENT}")),
        IntentPattern::new(TrackerType::Book, &format!(r"(?i)\b(?-u:read)\s+{FRAGMENT}")),
        IntentPattern::new(
            TrackerType::Music,
            &format!(r"(?i)\b(?-u:listen)(?:\s+(?-u:to))?\s+{FRAGMENT}"),
        ),
        IntentPattern::new(
            TrackerType::Movie,
            &format!(r"(?i)\b(?-u:recommend|recommended)\s+(?-u:watch|see)\s+{FRAGMENT}"),
        ),
        IntentPattern::new(
            TrackerType::Book,
            &format!(r"(?i)\b(?-u:recommend|recommended)\s+(?-u:read)\s+{FRAGMENT}"),
        ),
        IntentPattern::new(
            TrackerType::Music,
            &format!(r"(?i)\b(?-u:recommend|recommended)\s+(?-u:listen)(?:\s+(?-u:to))?\s+{FRAGMENT}"),
        ),
    ];

    /// Words that usually start a clause trailing the title. Applied in order,
    /// each against the already-truncated title.
    static ref TRAILING_STOPWORDS: Vec<Regex> = [
        "with", "for", "because", "so", "after", "before", "when", "while",
        "tonight", "today", "tomorrow", "later", "again",
    ]
    .iter()
    .map(|word| Regex::new(&format!(r"(?i)\s+(?-u:{})\b.*$", word)).unwrap())
    .collect();

    static ref IGNORED_TITLES: HashSet<&'static str> = [
        "it",
        "this",
        "that",
        "something",
        "a movie",
        "a book",
        "a song",
        "a podcast",
        "a show",
    ]
    .into_iter()
    .collect();
}

/// Canonical comparison key for a title: lowercase ASCII alphanumerics separated
/// by single spaces. `"Dune: Part Two!"` and `"dune part two"` share a key.
///
/// This is the uniqueness key for library items, so every caller that stores or
/// looks up a title must go through this function.
pub fn normalize_title(title: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&title.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Trim a raw regex capture down to the title it most likely names.
pub fn clean_title(raw: &str) -> String {
    let collapsed = WHITESPACE.replace_all(raw, " ");
    let unquoted = EDGE_QUOTES.replace_all(collapsed.trim(), "");
    let mut title = TRAILING_PARENTHETICAL
        .replace_all(&unquoted, "")
        .trim()
        .to_string();

    for stopword in TRAILING_STOPWORDS.iter() {
        if stopword.is_match(&title) {
            title = stopword.replace(&title, "").trim().to_string();
        }
    }

    title
}

fn type_for_verb(verb: &str) -> TrackerType {
    match verb {
        "read" => TrackerType::Book,
        "listen" => TrackerType::Music,
        _ => TrackerType::Movie,
    }
}

fn is_discarded(title: &str) -> bool {
    let lower = title.to_lowercase();
    title.is_empty() || lower.starts_with("out ") || IGNORED_TITLES.contains(lower.as_str())
}

/// Accumulates candidates in order, keeping the first of each type + key.
#[derive(Default)]
struct CandidateSet {
    candidates: Vec<RecommendationCandidate>,
    seen: HashSet<String>,
}

impl CandidateSet {
    fn offer(&mut self, item_type: TrackerType, raw: &str, reason: CandidateReason) {
        let title = clean_title(raw);
        if is_discarded(&title) {
            return;
        }

        let key = format!("{}:{}", item_type.as_str(), normalize_title(&title));
        if !self.seen.insert(key) {
            return;
        }

        self.candidates.push(RecommendationCandidate {
            item_type,
            title,
            reason,
        });
    }
}

/// Extract recommendation candidates from free text.
///
/// Quoted mentions come first in text order, followed by intent-phrase matches in
/// pattern priority order. No two results share a type and normalized title.
pub fn extract_recommendation_candidates(text: &str) -> Vec<RecommendationCandidate> {
    let text = WHITESPACE.replace_all(text, " ");
    let mut set = CandidateSet::default();

    for captures in QUOTED_PATTERN.captures_iter(&text) {
        let verb = captures
            .get(1)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        let raw = captures.get(2).map_or("", |m| m.as_str());
        set.offer(type_for_verb(&verb), raw, CandidateReason::QuotedIntent);
    }

    for pattern in INTENT_PATTERNS.iter() {
        for captures in pattern.regex.captures_iter(&text) {
            let raw = captures.get(1).map_or("", |m| m.as_str());
            set.offer(pattern.item_type, raw, CandidateReason::Intent);
        }
    }

    set.candidates
}
