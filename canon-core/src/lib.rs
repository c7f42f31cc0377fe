//! Continuity checker for serialized fiction drafts.
//!
//! This crate compares a draft episode against the accumulated canon of
//! a serialized work — world settings, the character registry, plot
//! threads, episode history — and reports the sentences that contradict
//! it. The semantic judgment is delegated to an AI reviewer treated as
//! an untrusted black box; everything the reviewer claims is re-anchored
//! to exact positions in the draft with deterministic string algorithms
//! before it is believed.
//!
//! # Quick Start
//!
//! ```ignore
//! use canon_core::{Analyzer, CanonStore, ClaudeOracle};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = CanonStore::load_json("canon.json").await?;
//!     let oracle = Arc::new(ClaudeOracle::from_env()?);
//!
//!     let analyzer = Analyzer::new(oracle);
//!     let report = analyzer.analyze(&draft_text, &store.snapshot()).await?;
//!
//!     for issue in &report.issues {
//!         println!("[{}] {}: {}", issue.category, issue.title, issue.sentence);
//!     }
//!     Ok(())
//! }
//! ```

pub mod adjudicate;
pub mod analysis;
pub mod anchors;
pub mod canon;
pub mod chunker;
pub mod entity;
pub mod extract;
pub mod issues;
pub mod locate;
pub mod oracle;
pub mod similarity;
pub mod testing;

// Primary public API
pub use analysis::{AnalysisConfig, AnalysisError, AnalysisReport, Analyzer};
pub use anchors::{Anchor, AnchorCategory, AnchorPool};
pub use canon::{CanonSnapshot, CanonStore, CharacterRecord, StoreError};
pub use chunker::{chunk, Chunk, ChunkError};
pub use entity::resolve_name;
pub use issues::{CandidateIssue, IssueCategory, ReportedIssue, Severity};
pub use locate::{locate, Span};
pub use oracle::{ClaudeOracle, Oracle, OracleError};
