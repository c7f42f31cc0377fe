//! Testing utilities for the consistency pipeline.
//!
//! `ScriptedOracle` stands in for the real reviewer so the whole
//! pipeline runs deterministically without API calls: queue responses
//! in the order the pipeline will consume them (proposals first, then
//! resolution checks). An exhausted queue answers with an empty review,
//! which also reads as "not resolved" at the resolution-check stage.

use crate::canon::{CanonSnapshot, CharacterRecord};
use crate::oracle::{Oracle, OracleError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted reply from the mock reviewer.
#[derive(Debug, Clone)]
enum ScriptedReply {
    Text(String),
    Failure,
}

/// A mock reviewer that returns scripted responses in order.
#[derive(Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedOracle {
    /// Create a mock reviewer with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw text response.
    pub fn push_text(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .expect("scripted oracle lock")
            .push_back(ScriptedReply::Text(text.into()));
    }

    /// Queue a JSON response.
    pub fn push_json(&self, value: Value) {
        self.push_text(value.to_string());
    }

    /// Queue a failed call (reported as a timeout).
    pub fn push_failure(&self) {
        self.replies
            .lock()
            .expect("scripted oracle lock")
            .push_back(ScriptedReply::Failure);
    }

    /// Number of replies left in the queue.
    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("scripted oracle lock").len()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, _instructions: &str, _payload: &str) -> Result<String, OracleError> {
        let next = self
            .replies
            .lock()
            .expect("scripted oracle lock")
            .pop_front();

        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Failure) => Err(OracleError::Timeout),
            None => Ok(r#"{"issues": []}"#.to_string()),
        }
    }
}

/// A snapshot with one character, for pipeline tests.
pub fn snapshot_with_character(name: &str, attributes: Value) -> CanonSnapshot {
    CanonSnapshot {
        characters: vec![CharacterRecord::new(name).with_attributes(attributes)],
        ..Default::default()
    }
}
