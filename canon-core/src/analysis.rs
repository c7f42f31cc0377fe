//! Per-manuscript analysis orchestration.
//!
//! One [`Analyzer::analyze`] call is one pipeline run: the manuscript
//! is chunked, the canon snapshot is flattened into the anchor pool,
//! every chunk is reviewed concurrently, and the resulting candidates
//! are adjudicated into the final issue list. The run owns all of its
//! intermediate state; nothing is shared across concurrent analyses.

use crate::adjudicate::adjudicate;
use crate::anchors::AnchorPool;
use crate::canon::CanonSnapshot;
use crate::chunker::{chunk, ChunkError};
use crate::issues::{ReportedIssue, Severity};
use crate::oracle::{propose_issues, Oracle};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Errors from an analysis run. Only malformed input aborts a run;
/// reviewer faults degrade inside the pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Malformed manuscript: {0}")]
    Malformed(#[from] ChunkError),
}

/// Configuration for an analyzer.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Maximum chunk length in chars.
    pub max_chunk_chars: usize,

    /// Chunks shorter than this merge into their predecessor.
    pub min_chunk_chars: usize,

    /// Issues below this severity are dropped.
    pub severity_threshold: Severity,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 2000,
            min_chunk_chars: 200,
            severity_threshold: Severity::Medium,
        }
    }
}

impl AnalysisConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk length bounds.
    pub fn with_chunk_bounds(mut self, max_chars: usize, min_chars: usize) -> Self {
        self.max_chunk_chars = max_chars;
        self.min_chunk_chars = min_chars;
        self
    }

    /// Set the severity threshold.
    pub fn with_severity_threshold(mut self, threshold: Severity) -> Self {
        self.severity_threshold = threshold;
        self
    }
}

/// Result of one manuscript analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// How many canonical statements the draft was checked against.
    pub statements_checked: usize,

    /// How many issues carry a negative verdict.
    pub flagged: usize,

    /// The adjudicated issue list, in draft order.
    pub issues: Vec<ReportedIssue>,

    /// Canonical terms recognized in the draft, exempt from real-world
    /// checking.
    pub known_terms: Vec<String>,
}

/// The consistency analyzer.
pub struct Analyzer {
    oracle: Arc<dyn Oracle>,
    config: AnalysisConfig,
}

impl Analyzer {
    /// Create an analyzer over a reviewer with default configuration.
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            config: AnalysisConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Analyze one manuscript against a canon snapshot.
    pub async fn analyze(
        &self,
        manuscript: &str,
        snapshot: &CanonSnapshot,
    ) -> Result<AnalysisReport, AnalysisError> {
        let chunks = chunk(
            manuscript,
            self.config.max_chunk_chars,
            self.config.min_chunk_chars,
        )?;

        let pool = AnchorPool::from_snapshot(snapshot);
        tracing::info!(
            chunks = chunks.len(),
            anchors = pool.len(),
            "starting consistency analysis"
        );

        let proposals = join_all(
            chunks
                .iter()
                .map(|c| propose_issues(self.oracle.as_ref(), &pool, &c.text)),
        )
        .await;
        let candidates: Vec<_> = proposals.into_iter().flatten().collect();
        tracing::debug!(candidates = candidates.len(), "reviewer proposals collected");

        let issues = adjudicate(
            self.oracle.as_ref(),
            candidates,
            &pool,
            manuscript,
            self.config.severity_threshold,
        )
        .await;

        let known_terms = recognized_terms(manuscript, snapshot);
        tracing::info!(flagged = issues.len(), "analysis complete");

        Ok(AnalysisReport {
            statements_checked: pool.len(),
            flagged: issues.len(),
            issues,
            known_terms,
        })
    }
}

/// Canonical terms that literally appear in the manuscript.
fn recognized_terms(manuscript: &str, snapshot: &CanonSnapshot) -> Vec<String> {
    snapshot
        .known_terms()
        .into_iter()
        .filter(|term| manuscript.contains(term.as_str()))
        .collect()
}
