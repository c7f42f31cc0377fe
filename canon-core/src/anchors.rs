//! Canonical-fact flattening.
//!
//! The reviewer cannot be handed a nested registry, so each analysis
//! run projects the canon snapshot into a flat pool of atomic
//! `path = value` statements. The pool is regenerated fresh every run
//! and capped so the reviewer context stays bounded; within the caps
//! the projection is deterministic and order-stable.

use crate::canon::CanonSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Total cap on the anchor pool; statements found after the cap is
/// reached are dropped.
pub const MAX_POOL_ANCHORS: usize = 180;

/// Cap on elements taken from a sequence.
const MAX_SEQUENCE_ITEMS: usize = 60;

/// Cap on keys taken from a mapping that is itself a sequence element.
const MAX_NESTED_KEYS: usize = 12;

/// Which section of the canon an anchor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorCategory {
    World,
    Character,
    Plot,
    History,
}

impl AnchorCategory {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            AnchorCategory::World => "world",
            AnchorCategory::Character => "character",
            AnchorCategory::Plot => "plot",
            AnchorCategory::History => "history",
        }
    }
}

/// An atomic canonical statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// `"<dotted.path[idx]> = <scalar>"`.
    pub statement: String,
    pub category: AnchorCategory,
}

/// Flatten a fact tree into `path = value` statements.
///
/// Scalars stringify directly (booleans as `true`/`false`, null as
/// `null`); mapping keys extend the dotted path (blank keys skipped);
/// sequences contribute up to 60 indexed elements, and mapping elements
/// inside sequences only their first 12 keys.
pub fn flatten(value: &Value, prefix: &str) -> Vec<String> {
    let mut out = Vec::new();
    walk(value, prefix, usize::MAX, &mut out);
    out
}

fn walk(value: &Value, path: &str, key_cap: usize, out: &mut Vec<String>) {
    match value {
        Value::Null => out.push(format!("{path} = null")),
        Value::Bool(b) => out.push(format!("{path} = {b}")),
        Value::Number(n) => out.push(format!("{path} = {n}")),
        Value::String(s) => out.push(format!("{path} = {s}")),
        Value::Array(items) => {
            for (idx, item) in items.iter().take(MAX_SEQUENCE_ITEMS).enumerate() {
                let item_path = format!("{path}[{idx}]");
                let cap = if item.is_object() {
                    MAX_NESTED_KEYS
                } else {
                    usize::MAX
                };
                walk(item, &item_path, cap, out);
            }
        }
        Value::Object(map) => {
            for (key, child) in map.iter().take(key_cap) {
                if key.trim().is_empty() {
                    continue;
                }
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                walk(child, &child_path, usize::MAX, out);
            }
        }
    }
}

/// The per-run anchor pool.
#[derive(Debug, Clone, Default)]
pub struct AnchorPool {
    anchors: Vec<Anchor>,
}

impl AnchorPool {
    /// Project a canon snapshot into a capped anchor pool.
    pub fn from_snapshot(snapshot: &CanonSnapshot) -> Self {
        let mut anchors = Vec::new();

        let mut extend = |statements: Vec<String>, category: AnchorCategory| {
            for statement in statements {
                if anchors.len() >= MAX_POOL_ANCHORS {
                    return;
                }
                anchors.push(Anchor {
                    statement,
                    category,
                });
            }
        };

        if !snapshot.world.is_null() {
            extend(flatten(&snapshot.world, "world"), AnchorCategory::World);
        }

        for record in &snapshot.characters {
            if record.attributes.is_null() {
                continue;
            }
            let prefix = format!("character[{}]", record.name);
            extend(
                flatten(&record.attributes, &prefix),
                AnchorCategory::Character,
            );
        }

        if !snapshot.plot.is_null() {
            extend(flatten(&snapshot.plot, "plot"), AnchorCategory::Plot);
        }

        if !snapshot.history.is_empty() {
            let history = Value::Array(snapshot.history.clone());
            extend(flatten(&history, "history"), AnchorCategory::History);
        }

        Self { anchors }
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter()
    }

    /// Serialize the pool for a reviewer prompt, one statement per line.
    pub fn as_prompt_text(&self) -> String {
        self.anchors
            .iter()
            .map(|a| format!("- [{}] {}", a.category.label(), a.statement))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Best token-overlap match for a reviewer-supplied anchor
    /// reference. `None` when no anchor shares a single token with the
    /// reference.
    pub fn best_match(&self, reference: &str) -> Option<&Anchor> {
        let ref_tokens = tokens(reference);
        if ref_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(&Anchor, usize)> = None;
        for anchor in &self.anchors {
            let overlap = tokens(&anchor.statement)
                .iter()
                .filter(|t| ref_tokens.contains(*t))
                .count();
            if overlap > 0 && best.map_or(true, |(_, b)| overlap > b) {
                best = Some((anchor, overlap));
            }
        }

        best.map(|(anchor, _)| anchor)
    }
}

/// Lowercased alphanumeric tokens.
fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
