// Safety analyzer - core business logic for scanning message content.
//
// This service handles:
// - Loading the active rule set
// - Matching literal and regex terms against content
// - Aggregating matches into per-type violations
// - Computing the 0-100 safety score and the block decision
//
// NO HTTP or database dependencies here - just pure domain logic.

use super::safety_models::{
    violation_type_for, FlaggedTerm, NewFlaggedTerm, SafetyVerdict, TermMatcher, Violation,
    BLOCK_SCORE_THRESHOLD, BLOCK_SEVERITY_THRESHOLD, SCORE_PENALTY_PER_SEVERITY,
};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting the flagged-term rule set.
#[async_trait]
pub trait FlaggedTermStore: Send + Sync {
    /// Fetch every rule with `is_active = true`.
    async fn active_terms(&self) -> Result<Vec<FlaggedTerm>, SafetyError>;

    /// Insert a rule, or overwrite category/severity/is_regex if the term
    /// already exists. Either way the rule ends up active.
    async fn upsert_term(&self, rule: NewFlaggedTerm) -> Result<FlaggedTerm, SafetyError>;

    /// Fetch all rules, active or not (moderator tooling).
    async fn list_terms(&self) -> Result<Vec<FlaggedTerm>, SafetyError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Scans message content against the mutable rule set.
pub struct SafetyAnalyzer<S: FlaggedTermStore> {
    store: S,
}

impl<S: FlaggedTermStore> SafetyAnalyzer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Score a piece of content against the active rule set.
    ///
    /// Fails open: if the rule set cannot be loaded the content passes with
    /// the default safe verdict and the failure is logged at error level.
    pub async fn analyze(&self, content: &str) -> SafetyVerdict {
        let terms = match self.store.active_terms().await {
            Ok(terms) => terms,
            Err(e) => {
                tracing::error!("Flagged-term lookup failed, passing content unscanned: {}", e);
                return SafetyVerdict::safe();
            }
        };

        Self::score_against(content, &terms)
    }

    /// Pure scoring step, split out so it is trivially testable.
    fn score_against(content: &str, terms: &[FlaggedTerm]) -> SafetyVerdict {
        let content_lower = content.to_lowercase();

        let mut score = 100i32;
        let mut violations: Vec<Violation> = Vec::new();
        let mut matched_terms: Vec<String> = Vec::new();

        for term in terms {
            let matcher = match TermMatcher::compile(term) {
                Some(m) => m,
                None => continue,
            };
            if !matcher.matches(content, &content_lower) {
                continue;
            }

            matched_terms.push(term.term.clone());
            score -= term.severity * SCORE_PENALTY_PER_SEVERITY;

            let violation_type = violation_type_for(&term.category);
            match violations
                .iter_mut()
                .find(|v| v.violation_type == violation_type)
            {
                Some(existing) => {
                    // Same violation type: collect the term, keep the worst
                    // severity rather than summing.
                    existing.terms.push(term.term.clone());
                    existing.severity = existing.severity.max(term.severity);
                }
                None => violations.push(Violation {
                    violation_type: violation_type.to_string(),
                    severity: term.severity,
                    terms: vec![term.term.clone()],
                }),
            }
        }

        let score = score.clamp(0, 100);
        // Severity alone can force a block even when the score is tolerable.
        let is_blocked = score <= BLOCK_SCORE_THRESHOLD
            || violations
                .iter()
                .any(|v| v.severity >= BLOCK_SEVERITY_THRESHOLD);

        SafetyVerdict {
            safety_score: score,
            violations,
            matched_terms,
            is_blocked,
        }
    }

    /// Add or update a rule. Severity outside 1-5 is rejected, and a regex
    /// rule that does not compile never makes it into the set.
    pub async fn upsert_term(&self, rule: NewFlaggedTerm) -> Result<FlaggedTerm, SafetyError> {
        if rule.term.trim().is_empty() {
            return Err(SafetyError::InvalidRule("term must not be empty".into()));
        }
        if !(1..=5).contains(&rule.severity) {
            return Err(SafetyError::InvalidRule(format!(
                "severity must be 1-5, got {}",
                rule.severity
            )));
        }
        if rule.is_regex {
            regex::Regex::new(&rule.term)
                .map_err(|e| SafetyError::InvalidRule(format!("invalid regex: {}", e)))?;
        }
        self.store.upsert_term(rule).await
    }

    pub async fn list_terms(&self) -> Result<Vec<FlaggedTerm>, SafetyError> {
        self.store.list_terms().await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dashmap::DashMap;

    /// In-memory store for testing
    struct MockTermStore {
        terms: DashMap<String, FlaggedTerm>,
        fail: bool,
    }

    impl MockTermStore {
        fn new() -> Self {
            Self {
                terms: DashMap::new(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                terms: DashMap::new(),
                fail: true,
            }
        }

        fn seed(&self, term: &str, category: &str, severity: i32, is_regex: bool) {
            let rule = FlaggedTerm {
                id: self.terms.len() as i64 + 1,
                term: term.to_string(),
                category: category.to_string(),
                severity,
                is_regex,
                is_active: true,
                created_at: Utc::now(),
            };
            self.terms.insert(rule.term.clone(), rule);
        }
    }

    #[async_trait]
    impl FlaggedTermStore for MockTermStore {
        async fn active_terms(&self) -> Result<Vec<FlaggedTerm>, SafetyError> {
            if self.fail {
                return Err(SafetyError::StorageError("db unavailable".into()));
            }
            let mut terms: Vec<FlaggedTerm> = self
                .terms
                .iter()
                .filter(|t| t.is_active)
                .map(|t| t.clone())
                .collect();
            terms.sort_by_key(|t| t.id);
            Ok(terms)
        }

        async fn upsert_term(&self, rule: NewFlaggedTerm) -> Result<FlaggedTerm, SafetyError> {
            let stored = match self.terms.get(&rule.term) {
                Some(existing) => FlaggedTerm {
                    id: existing.id,
                    term: rule.term.clone(),
                    category: rule.category,
                    severity: rule.severity,
                    is_regex: rule.is_regex,
                    is_active: true,
                    created_at: existing.created_at,
                },
                None => FlaggedTerm {
                    id: self.terms.len() as i64 + 1,
                    term: rule.term.clone(),
                    category: rule.category,
                    severity: rule.severity,
                    is_regex: rule.is_regex,
                    is_active: true,
                    created_at: Utc::now(),
                },
            };
            self.terms.insert(rule.term, stored.clone());
            Ok(stored)
        }

        async fn list_terms(&self) -> Result<Vec<FlaggedTerm>, SafetyError> {
            Ok(self.terms.iter().map(|t| t.clone()).collect())
        }
    }

    #[tokio::test]
    async fn test_clean_content_scores_100() {
        let analyzer = SafetyAnalyzer::new(MockTermStore::new());

        let verdict = analyzer.analyze("hope you have a great day").await;

        assert_eq!(verdict.safety_score, 100);
        assert!(!verdict.is_blocked);
        assert!(verdict.violations.is_empty());
    }

    #[tokio::test]
    async fn test_spam_term_scores_and_flags() {
        let store = MockTermStore::new();
        store.seed("spam", "spam", 2, false);
        let analyzer = SafetyAnalyzer::new(store);

        let verdict = analyzer.analyze("this is spam").await;

        assert_eq!(verdict.safety_score, 80);
        assert!(!verdict.is_blocked);
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.violations[0].violation_type, "spam");
        assert_eq!(verdict.violations[0].severity, 2);
    }

    #[tokio::test]
    async fn test_literal_match_is_case_insensitive() {
        let store = MockTermStore::new();
        store.seed("free money", "spam", 2, false);
        let analyzer = SafetyAnalyzer::new(store);

        let verdict = analyzer.analyze("FREE MONEY here!!").await;

        assert_eq!(verdict.matched_terms, vec!["free money"]);
    }

    #[tokio::test]
    async fn test_regex_term_matches() {
        let store = MockTermStore::new();
        store.seed(r"\b\d{3}[- ]?\d{4}\b", "contact_exchange", 3, true);
        let analyzer = SafetyAnalyzer::new(store);

        let verdict = analyzer.analyze("text me at 555-0199").await;

        assert_eq!(verdict.safety_score, 70);
        assert_eq!(
            verdict.violations[0].violation_type,
            "suspicious_contact_exchange"
        );
    }

    #[tokio::test]
    async fn test_invalid_regex_rule_is_skipped() {
        let store = MockTermStore::new();
        store.seed(r"([unclosed", "spam", 5, true);
        store.seed("junk", "spam", 1, false);
        let analyzer = SafetyAnalyzer::new(store);

        let verdict = analyzer.analyze("junk ([unclosed").await;

        // Only the literal rule counts; the broken regex never blocks.
        assert_eq!(verdict.safety_score, 90);
        assert!(!verdict.is_blocked);
    }

    #[tokio::test]
    async fn test_same_type_violations_take_max_severity_not_sum() {
        let store = MockTermStore::new();
        store.seed("pills", "drugs", 3, false);
        store.seed("oxy", "drugs", 4, false);
        let analyzer = SafetyAnalyzer::new(store);

        let verdict = analyzer.analyze("selling pills and oxy").await;

        assert_eq!(verdict.violations.len(), 1);
        let v = &verdict.violations[0];
        assert_eq!(v.violation_type, "substance_offering");
        assert_eq!(v.severity, 4);
        assert_eq!(v.terms.len(), 2);
        // Score still reflects both matches.
        assert_eq!(verdict.safety_score, 30);
    }

    #[tokio::test]
    async fn test_score_is_clamped_to_zero() {
        let store = MockTermStore::new();
        store.seed("bad1", "harmful", 5, false);
        store.seed("bad2", "harmful", 5, false);
        store.seed("bad3", "harmful", 5, false);
        let analyzer = SafetyAnalyzer::new(store);

        let verdict = analyzer.analyze("bad1 bad2 bad3").await;

        assert_eq!(verdict.safety_score, 0);
        assert!(verdict.is_blocked);
    }

    #[tokio::test]
    async fn test_severity_blocks_even_with_tolerable_score() {
        let store = MockTermStore::new();
        store.seed("groom", "predatory", 5, false);
        let analyzer = SafetyAnalyzer::new(store);

        let verdict = analyzer.analyze("trying to groom someone").await;

        // One severity-5 match: score 50 is above the score threshold but
        // the severity rule blocks anyway.
        assert_eq!(verdict.safety_score, 50);
        assert!(verdict.is_blocked);
    }

    #[tokio::test]
    async fn test_low_score_blocks_without_high_severity() {
        let store = MockTermStore::new();
        for i in 0..4 {
            store.seed(&format!("junk{}", i), "spam", 2, false);
        }
        let analyzer = SafetyAnalyzer::new(store);

        let verdict = analyzer.analyze("junk0 junk1 junk2 junk3").await;

        assert_eq!(verdict.safety_score, 20);
        assert!(verdict.is_blocked);
        assert!(verdict.max_severity() < 4);
    }

    #[tokio::test]
    async fn test_unmapped_category_defaults_to_inappropriate_content() {
        let store = MockTermStore::new();
        store.seed("weird", "something_new", 2, false);
        let analyzer = SafetyAnalyzer::new(store);

        let verdict = analyzer.analyze("weird stuff").await;

        assert_eq!(verdict.violations[0].violation_type, "inappropriate_content");
    }

    #[tokio::test]
    async fn test_fails_open_when_store_unavailable() {
        let analyzer = SafetyAnalyzer::new(MockTermStore::failing());

        let verdict = analyzer.analyze("would normally be flagged spam").await;

        assert_eq!(verdict.safety_score, 100);
        assert!(!verdict.is_blocked);
        assert!(verdict.violations.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_severity_and_stays_active() {
        let analyzer = SafetyAnalyzer::new(MockTermStore::new());

        analyzer
            .upsert_term(NewFlaggedTerm {
                term: "spam".into(),
                category: "spam".into(),
                severity: 2,
                is_regex: false,
            })
            .await
            .unwrap();

        let updated = analyzer
            .upsert_term(NewFlaggedTerm {
                term: "spam".into(),
                category: "harmful".into(),
                severity: 4,
                is_regex: false,
            })
            .await
            .unwrap();

        assert_eq!(updated.severity, 4);
        assert_eq!(updated.category, "harmful");
        assert!(updated.is_active);

        let terms = analyzer.list_terms().await.unwrap();
        assert_eq!(terms.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_rules() {
        let analyzer = SafetyAnalyzer::new(MockTermStore::new());

        let bad_severity = analyzer
            .upsert_term(NewFlaggedTerm {
                term: "x".into(),
                category: "spam".into(),
                severity: 9,
                is_regex: false,
            })
            .await;
        assert!(matches!(bad_severity, Err(SafetyError::InvalidRule(_))));

        let bad_regex = analyzer
            .upsert_term(NewFlaggedTerm {
                term: "([".into(),
                category: "spam".into(),
                severity: 2,
                is_regex: true,
            })
            .await;
        assert!(matches!(bad_regex, Err(SafetyError::InvalidRule(_))));
    }
}
