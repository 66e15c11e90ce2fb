// Safety domain models - data structures for rule-based content scanning.
//
// These are pure domain types with no HTTP or database dependencies.
// The api layer converts these into response payloads.

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// A score below or at this threshold blocks the message outright.
pub const BLOCK_SCORE_THRESHOLD: i32 = 30;
/// A single violation at or above this severity blocks regardless of score.
pub const BLOCK_SEVERITY_THRESHOLD: i32 = 4;
/// Each matched term subtracts `severity * SCORE_PENALTY_PER_SEVERITY` points.
pub const SCORE_PENALTY_PER_SEVERITY: i32 = 10;

/// A moderation rule: a term (literal or regex) with a category and severity.
///
/// Rules are never deleted - retiring one flips `is_active` off so old
/// safety logs keep pointing at a real row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedTerm {
    pub id: i64,
    /// The literal substring or regex pattern to match (unique).
    pub term: String,
    /// Free-form rule category, e.g. "drugs", "spam", "predatory".
    pub category: String,
    /// 1 (mild) to 5 (severe).
    pub severity: i32,
    pub is_regex: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating or updating a rule. Upserting an existing term
/// overwrites category/severity/is_regex and re-activates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFlaggedTerm {
    pub term: String,
    pub category: String,
    pub severity: i32,
    #[serde(default)]
    pub is_regex: bool,
}

/// How a single rule decides whether it applies to a piece of text.
pub enum TermMatcher {
    /// Case-insensitive substring match. Holds the lowercased term.
    Literal(String),
    /// Case-insensitive compiled pattern.
    Pattern(Regex),
}

impl TermMatcher {
    /// Build a matcher for a rule. Returns `None` for an invalid regex -
    /// a broken rule should be skipped, never take the scanner down.
    pub fn compile(term: &FlaggedTerm) -> Option<Self> {
        if term.is_regex {
            match RegexBuilder::new(&term.term).case_insensitive(true).build() {
                Ok(re) => Some(TermMatcher::Pattern(re)),
                Err(e) => {
                    tracing::warn!(term = %term.term, "Skipping flagged term with invalid regex: {}", e);
                    None
                }
            }
        } else {
            Some(TermMatcher::Literal(term.term.to_lowercase()))
        }
    }

    pub fn matches(&self, content: &str, content_lower: &str) -> bool {
        match self {
            TermMatcher::Literal(needle) => content_lower.contains(needle),
            TermMatcher::Pattern(re) => re.is_match(content),
        }
    }
}

/// A normalized violation: one per violation type, aggregating every matched
/// term of that type and carrying the worst severity seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub violation_type: String,
    pub severity: i32,
    pub terms: Vec<String>,
}

/// The analyzer's verdict for one piece of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyVerdict {
    /// 0-100, lower is less safe.
    pub safety_score: i32,
    pub violations: Vec<Violation>,
    /// Every raw term that matched, in rule order.
    pub matched_terms: Vec<String>,
    pub is_blocked: bool,
}

impl SafetyVerdict {
    /// The default verdict: clean content, and also what the analyzer
    /// returns when the rule set cannot be loaded (fail open).
    pub fn safe() -> Self {
        Self {
            safety_score: 100,
            violations: Vec::new(),
            matched_terms: Vec::new(),
            is_blocked: false,
        }
    }

    pub fn max_severity(&self) -> i32 {
        self.violations.iter().map(|v| v.severity).max().unwrap_or(0)
    }
}

/// Map a rule category onto the violation type reported to moderators.
/// Categories without an explicit mapping count as generic inappropriate
/// content rather than being dropped.
pub fn violation_type_for(category: &str) -> &'static str {
    match category {
        "drugs" => "substance_offering",
        "dealing" => "drug_dealing",
        "contact_exchange" => "suspicious_contact_exchange",
        "predatory" => "predatory_behavior",
        "spam" => "spam",
        "harmful" => "inappropriate_content",
        _ => "inappropriate_content",
    }
}
