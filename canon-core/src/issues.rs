//! Issue types flowing through the pipeline.
//!
//! A [`CandidateIssue`] is an unverified complaint from the reviewer; a
//! [`ReportedIssue`] is what survives adjudication and reaches the
//! caller, carrying the exact located sentence instead of the
//! reviewer's approximate quote.

use serde::{Deserialize, Serialize};

/// Ordinal severity of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Numeric rank used by the threshold filter.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    /// Parse a reviewer-supplied severity label. Accepts the English
    /// labels and their common Korean equivalents.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" | "낮음" | "하" => Some(Severity::Low),
            "medium" | "중간" | "중" => Some(Severity::Medium),
            "high" | "높음" | "상" => Some(Severity::High),
            _ => None,
        }
    }
}

/// What kind of canon an issue contradicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    World,
    Character,
    Plot,
    History,
    /// Result of merging issues of different categories on one sentence.
    Mixed,
}

impl IssueCategory {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            IssueCategory::World => "world",
            IssueCategory::Character => "character",
            IssueCategory::Plot => "plot",
            IssueCategory::History => "history",
            IssueCategory::Mixed => "mixed",
        }
    }

    /// Parse a reviewer-supplied category label. Unrecognized labels
    /// fall back to plot/continuity, the broadest bucket.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "world" | "setting" | "세계관" | "설정" => IssueCategory::World,
            "character" | "인물" | "캐릭터" => IssueCategory::Character,
            "history" | "연재" | "회차" => IssueCategory::History,
            _ => IssueCategory::Plot,
        }
    }
}

/// An unverified consistency complaint from the reviewer.
#[derive(Debug, Clone)]
pub struct CandidateIssue {
    pub category: IssueCategory,
    pub title: String,
    /// Approximate quote of the offending sentence.
    pub sentence_hint: String,
    /// Approximate restatement of the canonical statement contradicted.
    pub anchor_ref: String,
    /// Why the reviewer considers this a contradiction.
    pub reason: String,
    /// Suggested rewrite, when the reviewer offered one.
    pub rewrite: Option<String>,
    pub severity: Severity,
}

/// A verified issue, as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ReportedIssue {
    /// Category label; "mixed" for merged issues.
    pub category: String,
    pub title: String,
    /// The exact offending sentence as it appears in the draft.
    pub sentence: String,
    pub reason: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(Severity::High.rank(), 3);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse("중"), Some(Severity::Medium));
        assert_eq!(Severity::parse("낮음"), Some(Severity::Low));
        assert_eq!(Severity::parse("critical"), None);
    }

    #[test]
    fn test_severity_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        let parsed: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(IssueCategory::parse("설정"), IssueCategory::World);
        assert_eq!(IssueCategory::parse("character"), IssueCategory::Character);
        assert_eq!(IssueCategory::parse("무엇인지 모름"), IssueCategory::Plot);
    }
}
