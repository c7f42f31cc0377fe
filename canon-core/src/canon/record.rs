//! Canonical record types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A character registry entry.
///
/// The `attributes` tree is free-form (appearance, injuries, abilities,
/// relationships — whatever the author records); everything else is a
/// typed envelope validated when the registry is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Canonical identifier, stable across renames.
    pub id: String,
    /// Primary name.
    pub name: String,
    /// Alternative names or nicknames.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Free-form attribute tree.
    #[serde(default)]
    pub attributes: Value,
}

impl CharacterRecord {
    /// Create a new record with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            aliases: Vec::new(),
            attributes: Value::Null,
        }
    }

    /// Add an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the attribute tree.
    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }
}

/// An immutable read of the canonical facts, taken once per analysis
/// run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonSnapshot {
    /// World settings (geography, magic system, factions, ...).
    #[serde(default)]
    pub world: Value,
    /// The character registry.
    #[serde(default)]
    pub characters: Vec<CharacterRecord>,
    /// Open plot threads and foreshadowing.
    #[serde(default)]
    pub plot: Value,
    /// Episode history, in publication order.
    #[serde(default)]
    pub history: Vec<Value>,
}

impl CanonSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// All in-universe terms the canon knows: character names and
    /// aliases, deduplicated in first-seen order.
    pub fn known_terms(&self) -> Vec<String> {
        let mut terms = Vec::new();
        for record in &self.characters {
            for term in std::iter::once(&record.name).chain(record.aliases.iter()) {
                if !term.trim().is_empty() && !terms.contains(term) {
                    terms.push(term.clone());
                }
            }
        }
        terms
    }
}
