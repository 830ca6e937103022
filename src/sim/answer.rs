//! Typed-answer validation
//!
//! Submissions are compared against a level's canonical forms after
//! normalization: trimmed, lowercased, whitespace runs collapsed, and one
//! trailing `;` made optional. Matching is literal or token-structural only;
//! no attempt is made to decide whether two queries are semantically equal.

use serde::{Deserialize, Serialize};

/// A required token, optionally with accepted alternatives (`count(*)` / `count(id)`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequiredToken {
    One(String),
    AnyOf(Vec<String>),
}

impl RequiredToken {
    pub fn alternatives(&self) -> &[String] {
        match self {
            RequiredToken::One(s) => std::slice::from_ref(s),
            RequiredToken::AnyOf(alts) => alts,
        }
    }

    /// Human-readable form used in feedback
    pub fn label(&self) -> String {
        self.alternatives().join(" or ")
    }
}

impl From<&str> for RequiredToken {
    fn from(s: &str) -> Self {
        RequiredToken::One(s.to_string())
    }
}

/// Whether structural tokens must appear in the listed order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenOrder {
    #[default]
    Ordered,
    Unordered,
}

/// Accepted forms for one answer gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalAnswerSet {
    /// Any of these strings, compared after normalization
    Literal { accepted: Vec<String> },
    /// All tokens present (case-insensitive), in order unless `Unordered`
    Structural {
        tokens: Vec<RequiredToken>,
        #[serde(default)]
        order: TokenOrder,
    },
}

impl CanonicalAnswerSet {
    pub fn literal<I, S>(accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CanonicalAnswerSet::Literal {
            accepted: accepted.into_iter().map(Into::into).collect(),
        }
    }

    pub fn structural<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RequiredToken>,
    {
        CanonicalAnswerSet::Structural {
            tokens: tokens.into_iter().map(Into::into).collect(),
            order: TokenOrder::Ordered,
        }
    }

    /// Nothing could ever match (used by config validation)
    pub fn is_empty(&self) -> bool {
        match self {
            CanonicalAnswerSet::Literal { accepted } => {
                accepted.iter().all(|a| normalize(a).is_empty())
            }
            CanonicalAnswerSet::Structural { tokens, .. } => {
                tokens.is_empty()
                    || tokens.iter().any(|t| {
                        t.alternatives().is_empty()
                            || t.alternatives().iter().any(|a| normalize(a).is_empty())
                    })
            }
        }
    }
}

/// Outcome of a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub matched: bool,
    /// Required tokens not found in the required order (structural only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    /// Subset of `missing` that does appear, just not where it should
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub misplaced: Vec<String>,
}

impl ValidationResult {
    /// Non-match with no diagnostic (wrong phase, literal miss)
    pub fn rejected() -> Self {
        Self::default()
    }
}

/// Canonical comparison form of a submission
pub fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = collapsed.to_lowercase();
    match collapsed.strip_suffix(';') {
        Some(rest) => rest.trim_end().to_string(),
        None => collapsed,
    }
}

/// Validate `submitted` against `canonical`. Never fails; garbage is a non-match.
pub fn validate(submitted: &str, canonical: &CanonicalAnswerSet) -> ValidationResult {
    let text = normalize(submitted);
    match canonical {
        CanonicalAnswerSet::Literal { accepted } => ValidationResult {
            matched: !text.is_empty() && accepted.iter().any(|a| normalize(a) == text),
            ..Default::default()
        },
        CanonicalAnswerSet::Structural { tokens, order } => {
            validate_structural(&text, tokens, *order)
        }
    }
}

fn validate_structural(text: &str, tokens: &[RequiredToken], order: TokenOrder) -> ValidationResult {
    let mut missing = Vec::new();
    let mut misplaced = Vec::new();
    let mut cursor = 0;

    for token in tokens {
        let alts: Vec<String> = token.alternatives().iter().map(|a| normalize(a)).collect();
        let present_anywhere = alts.iter().any(|a| !a.is_empty() && text.contains(a.as_str()));

        match order {
            TokenOrder::Unordered => {
                if !present_anywhere {
                    missing.push(token.label());
                }
            }
            TokenOrder::Ordered => {
                // Earliest-ending alternative after the cursor
                let next_end = alts
                    .iter()
                    .filter(|a| !a.is_empty())
                    .filter_map(|a| text[cursor..].find(a.as_str()).map(|pos| cursor + pos + a.len()))
                    .min();
                match next_end {
                    Some(end) => cursor = end,
                    None => {
                        let label = token.label();
                        if present_anywhere {
                            misplaced.push(label.clone());
                        }
                        missing.push(label);
                    }
                }
            }
        }
    }

    ValidationResult {
        matched: missing.is_empty(),
        missing,
        misplaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  SELECT *\n  FROM t; "), "select * from t");
        assert_eq!(normalize("select * from t"), "select * from t");
        assert_eq!(normalize("select * from t ;"), "select * from t");
        // Only one terminator is optional
        assert_eq!(normalize("select 1;;"), "select 1;");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_literal_match_ignores_case_whitespace_and_terminator() {
        let set = CanonicalAnswerSet::literal(["SELECT * FROM artifacts WHERE found_by IS NOT NULL;"]);
        let result = validate("select * from artifacts where found_by is not null", &set);
        assert!(result.matched);
        assert!(result.missing.is_empty());

        let a = validate("  SELECT * FROM t; ", &CanonicalAnswerSet::literal(["SELECT * FROM t;"]));
        let b = validate("select * from t", &CanonicalAnswerSet::literal(["SELECT * FROM t;"]));
        assert_eq!(a, b);
        assert!(a.matched);
    }

    #[test]
    fn test_literal_miss() {
        let set = CanonicalAnswerSet::literal(["SELECT name FROM fish;", "SELECT fish.name FROM fish;"]);
        assert!(validate("select fish.name from fish", &set).matched);
        let miss = validate("select * from fish", &set);
        assert!(!miss.matched);
        assert!(miss.missing.is_empty());
    }

    #[test]
    fn test_structural_reports_missing_tokens() {
        let set = CanonicalAnswerSet::structural([
            "select",
            "skill",
            "count(",
            "from jungle_explorers",
            "group by skill",
        ]);
        let result = validate("SELECT skill FROM jungle_explorers", &set);
        assert!(!result.matched);
        assert!(result.missing.contains(&"count(".to_string()));
        assert!(result.missing.contains(&"group by skill".to_string()));
        assert_eq!(result.missing.len(), 2);

        let ok = validate(
            "SELECT skill, COUNT(*) FROM jungle_explorers GROUP BY skill;",
            &set,
        );
        assert!(ok.matched);
    }

    #[test]
    fn test_structural_order_matters() {
        let set = CanonicalAnswerSet::structural(["select", "from relics", "order by age"]);
        let result = validate("order by age select * from relics", &set);
        assert!(!result.matched);
        assert_eq!(result.missing, vec!["order by age".to_string()]);
        assert_eq!(result.misplaced, vec!["order by age".to_string()]);

        let unordered = CanonicalAnswerSet::Structural {
            tokens: vec!["select".into(), "from relics".into(), "order by age".into()],
            order: TokenOrder::Unordered,
        };
        assert!(validate("order by age select * from relics", &unordered).matched);
    }

    #[test]
    fn test_structural_alternatives() {
        let set = CanonicalAnswerSet::Structural {
            tokens: vec![
                "select".into(),
                RequiredToken::AnyOf(vec!["count(*)".into(), "count(id)".into()]),
                "from guardians".into(),
            ],
            order: TokenOrder::Ordered,
        };
        assert!(validate("SELECT COUNT(id) FROM guardians", &set).matched);
        let miss = validate("SELECT id FROM guardians", &set);
        assert_eq!(miss.missing, vec!["count(*) or count(id)".to_string()]);
    }

    #[test]
    fn test_empty_input_reports_everything_missing() {
        let set = CanonicalAnswerSet::structural(["select", "from t"]);
        let result = validate("", &set);
        assert!(!result.matched);
        assert_eq!(result.missing.len(), 2);
        assert!(!validate("", &CanonicalAnswerSet::literal(["SELECT 1;"])).matched);
    }

    #[test]
    fn test_non_ascii_input_does_not_panic() {
        let set = CanonicalAnswerSet::structural(["sélect", "from"]);
        let result = validate("SÉLECT ✓ FROM ünïcode", &set);
        assert!(result.matched);
    }

    #[test]
    fn test_answer_set_from_json() {
        let json = r#"{"type":"structural","tokens":["select",["count(*)","count(id)"]]}"#;
        let set: CanonicalAnswerSet = serde_json::from_str(json).unwrap();
        assert!(!set.is_empty());
        assert!(validate("select count(*) from x", &set).matched);

        let empty: CanonicalAnswerSet = serde_json::from_str(r#"{"type":"literal","accepted":[" "]}"#).unwrap();
        assert!(empty.is_empty());
    }
}
