//! The reviewer boundary.
//!
//! The semantic judgment — "does this sentence contradict that canon
//! statement?" — is delegated to a language model treated as an
//! untrusted black box. This module owns the whole boundary: the
//! [`Oracle`] trait, the Claude-backed implementation, and the two
//! adapter calls (issue proposal, resolution check) with their
//! defensive parsing and degradation rules.
//!
//! Neither adapter call can fail. A dead or incoherent reviewer
//! degrades to a synthetic high-severity finding at proposal time and
//! to "not resolved" at resolution-check time, so a run always returns
//! a result and a silent failure is never mistaken for a clean draft.

use crate::anchors::AnchorPool;
use crate::extract::extract_structured;
use crate::issues::{CandidateIssue, IssueCategory, Severity};
use async_trait::async_trait;
use claude::{Claude, Message, Request};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default model for consistency review (fast and cheap).
const ORACLE_MODEL: &str = "claude-3-5-haiku-20241022";

/// Maximum tokens for a review response.
const ORACLE_MAX_TOKENS: usize = 2000;

/// Deadline for a single reviewer call.
const ORACLE_TIMEOUT_SECS: u64 = 45;

/// Sentence hint carried by the synthetic placeholder issue.
pub const PLACEHOLDER_HINT: &str = "(entire text)";

/// Errors from a reviewer call.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("API error: {0:?}")]
    Api(#[from] claude::Error),

    #[error("Reviewer call timed out")]
    Timeout,

    #[error("Reviewer returned an empty response")]
    Empty,
}

/// A semantic-classification capability: role instructions and a
/// payload in, free text out. Implementations are stateless across
/// calls, so callers may dispatch any number of them concurrently.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, instructions: &str, payload: &str) -> Result<String, OracleError>;
}

/// The Claude-backed reviewer.
pub struct ClaudeOracle {
    client: Claude,
    model: String,
    timeout: Duration,
}

impl ClaudeOracle {
    /// Create a reviewer over an existing client.
    pub fn new(client: Claude) -> Self {
        Self {
            client,
            model: ORACLE_MODEL.to_string(),
            timeout: Duration::from_secs(ORACLE_TIMEOUT_SECS),
        }
    }

    /// Create from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, claude::Error> {
        Ok(Self::new(Claude::from_env()?))
    }

    /// Set a custom model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Oracle for ClaudeOracle {
    async fn complete(&self, instructions: &str, payload: &str) -> Result<String, OracleError> {
        let request = Request::new(vec![Message::user(payload)])
            .with_system(instructions)
            .with_model(&self.model)
            .with_max_tokens(ORACLE_MAX_TOKENS)
            .with_temperature(0.0);

        let response = tokio::time::timeout(self.timeout, self.client.complete(request))
            .await
            .map_err(|_| OracleError::Timeout)?
            .map_err(|e| match e {
                claude::Error::Timeout => OracleError::Timeout,
                other => OracleError::Api(other),
            })?;

        if response.text.trim().is_empty() {
            return Err(OracleError::Empty);
        }
        Ok(response.text)
    }
}

// ============================================================================
// Issue proposal
// ============================================================================

/// Wire shape of one reviewer finding. Every field is defaulted so a
/// sloppy response still parses; unusable candidates are weeded out by
/// adjudication, not here.
#[derive(Debug, Deserialize)]
struct WireIssue {
    #[serde(default)]
    category: String,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "quote", alias = "hint")]
    sentence: String,
    #[serde(default, alias = "anchor_ref")]
    anchor: String,
    #[serde(default, alias = "rationale")]
    reason: String,
    #[serde(default)]
    rewrite: Option<String>,
    #[serde(default)]
    severity: String,
}

#[derive(Debug, Deserialize)]
struct ReviewEnvelope {
    #[serde(default)]
    issues: Vec<WireIssue>,
}

/// Ask the reviewer for contradictions between the anchor pool and an
/// excerpt. Degrades to the placeholder issue instead of failing.
pub async fn propose_issues(
    oracle: &dyn Oracle,
    pool: &AnchorPool,
    excerpt: &str,
) -> Vec<CandidateIssue> {
    let payload = format!(
        "## Canon\n{}\n\n## Draft excerpt\n{}",
        pool.as_prompt_text(),
        excerpt
    );

    match oracle.complete(include_str!("prompts/reviewer.txt"), &payload).await {
        Ok(text) => match parse_review(&text) {
            Some(issues) => issues,
            None => {
                tracing::warn!("reviewer response had no parseable structure");
                vec![placeholder_issue(
                    "응답에서 검토 결과를 해석할 수 없었습니다",
                )]
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "reviewer call failed during proposal");
            vec![placeholder_issue(&e.to_string())]
        }
    }
}

/// Parse a review response: either the `{"issues": [...]}` envelope or
/// a bare top-level array of findings.
fn parse_review(text: &str) -> Option<Vec<CandidateIssue>> {
    let value = extract_structured(text)?;

    let wire: Vec<WireIssue> = match value {
        Value::Array(_) => serde_json::from_value(value).ok()?,
        Value::Object(_) => {
            let envelope: ReviewEnvelope = serde_json::from_value(value).ok()?;
            envelope.issues
        }
        _ => return None,
    };

    Some(wire.into_iter().map(candidate_from_wire).collect())
}

fn candidate_from_wire(wire: WireIssue) -> CandidateIssue {
    CandidateIssue {
        category: IssueCategory::parse(&wire.category),
        title: wire.title,
        sentence_hint: wire.sentence,
        anchor_ref: wire.anchor,
        reason: wire.reason,
        rewrite: wire.rewrite.filter(|r| !r.trim().is_empty()),
        severity: Severity::parse(&wire.severity).unwrap_or(Severity::Medium),
    }
}

/// The synthetic issue emitted when a review could not be completed.
pub fn placeholder_issue(detail: &str) -> CandidateIssue {
    CandidateIssue {
        category: IssueCategory::Mixed,
        title: "일관성 검사 미완료".to_string(),
        sentence_hint: PLACEHOLDER_HINT.to_string(),
        anchor_ref: String::new(),
        reason: format!("이 구간은 일관성 검사를 완료하지 못했습니다: {detail}"),
        rewrite: None,
        severity: Severity::High,
    }
}

// ============================================================================
// Resolution check
// ============================================================================

#[derive(Debug, Deserialize)]
struct ResolutionVerdict {
    #[serde(default)]
    resolved: bool,
}

/// Ask whether the draft later retracts or resolves the contradiction.
/// Any failure defaults to "not resolved" so a flaky reviewer cannot
/// suppress a finding.
pub async fn check_resolution(
    oracle: &dyn Oracle,
    issue: &CandidateIssue,
    full_text: &str,
) -> bool {
    let payload = format!(
        "## Finding\ntitle: {}\nsentence: {}\nreason: {}\n\n## Full draft\n{}",
        issue.title, issue.sentence_hint, issue.reason, full_text
    );

    match oracle
        .complete(include_str!("prompts/resolution.txt"), &payload)
        .await
    {
        Ok(text) => extract_structured(&text)
            .and_then(|v| serde_json::from_value::<ResolutionVerdict>(v).ok())
            .map(|verdict| verdict.resolved)
            .unwrap_or(false),
        Err(e) => {
            tracing::warn!(error = %e, "reviewer call failed during resolution check");
            false
        }
    }
}
