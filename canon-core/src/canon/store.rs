//! JSON-backed canonical fact registry.
//!
//! Mirrors the save/load shape used for campaign persistence: a
//! versioned JSON envelope on disk, a plain in-memory registry at
//! runtime. Name-addressed operations resolve through the entity
//! cascade, so "강백호를 지워줘" works with a nickname as well as the
//! registered name.

use super::record::{CanonSnapshot, CharacterRecord};
use crate::entity::resolve_name;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Current registry file version.
const STORE_VERSION: u32 = 1;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("No character matches '{0}'")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// The canonical fact registry.
#[derive(Debug, Clone, Default)]
pub struct CanonStore {
    world: Value,
    characters: Vec<CharacterRecord>,
    plot: Value,
    history: Vec<Value>,
}

/// On-disk envelope.
#[derive(Debug, Serialize, Deserialize)]
struct SavedCanon {
    version: u32,
    #[serde(default)]
    world: Value,
    #[serde(default)]
    characters: Vec<CharacterRecord>,
    #[serde(default)]
    plot: Value,
    #[serde(default)]
    history: Vec<Value>,
}

impl CanonStore {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an immutable snapshot for one analysis run.
    pub fn snapshot(&self) -> CanonSnapshot {
        CanonSnapshot {
            world: self.world.clone(),
            characters: self.characters.clone(),
            plot: self.plot.clone(),
            history: self.history.clone(),
        }
    }

    /// Replace the world settings tree.
    pub fn set_world(&mut self, world: Value) {
        self.world = world;
    }

    /// Replace the plot-thread tree.
    pub fn set_plot(&mut self, plot: Value) {
        self.plot = plot;
    }

    /// Append an episode summary to the history.
    pub fn record_episode(&mut self, episode: Value) {
        self.history.push(episode);
    }

    /// Number of registered characters.
    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Get a character by canonical id.
    pub fn character(&self, id: &str) -> Option<&CharacterRecord> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Add a character, or replace the record with the same id.
    pub fn upsert_character(&mut self, record: CharacterRecord) -> String {
        let id = record.id.clone();
        if let Some(existing) = self.characters.iter_mut().find(|c| c.id == record.id) {
            *existing = record;
        } else {
            self.characters.push(record);
        }
        id
    }

    /// Get an existing character id by name, or register a new one.
    pub fn get_or_create_character(&mut self, name: impl Into<String>) -> String {
        let name = name.into();
        let existing = resolve_name(&name, &self.characters).map(str::to_string);
        match existing {
            Some(id) => id,
            None => self.upsert_character(CharacterRecord::new(name)),
        }
    }

    /// Replace a character's attribute tree, addressing it by free-text
    /// name. Returns `NotFound` when the cascade resolves nothing.
    pub fn update_character_by_name(
        &mut self,
        name: &str,
        attributes: Value,
    ) -> Result<&CharacterRecord, StoreError> {
        let id = resolve_name(name, &self.characters)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?
            .to_string();

        let record = self
            .characters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        record.attributes = attributes;
        Ok(record)
    }

    /// Remove a character, addressing it by free-text name.
    pub fn delete_character_by_name(&mut self, name: &str) -> Result<CharacterRecord, StoreError> {
        let id = resolve_name(name, &self.characters)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?
            .to_string();

        let position = self
            .characters
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(self.characters.remove(position))
    }

    /// Save the registry to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let saved = SavedCanon {
            version: STORE_VERSION,
            world: self.world.clone(),
            characters: self.characters.clone(),
            plot: self.plot.clone(),
            history: self.history.clone(),
        };
        let content = serde_json::to_string_pretty(&saved)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load a registry from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path).await?;
        let saved: SavedCanon = serde_json::from_str(&content)?;

        if saved.version != STORE_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: STORE_VERSION,
                found: saved.version,
            });
        }

        for record in &saved.characters {
            if record.name.trim().is_empty() {
                return Err(StoreError::InvalidRecord(format!(
                    "character {} has a blank name",
                    record.id
                )));
            }
        }

        Ok(Self {
            world: saved.world,
            characters: saved.characters,
            plot: saved.plot,
            history: saved.history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn sample_store() -> CanonStore {
        let mut store = CanonStore::new();
        store.set_world(json!({"era": "조선 후기", "magic": false}));
        store.upsert_character(
            CharacterRecord::new("강백호")
                .with_alias("백호")
                .with_attributes(json!({"injury": "left_arm_broken"})),
        );
        store.record_episode(json!({"episode": 1, "summary": "강백호가 왼팔을 다쳤다"}));
        store
    }

    #[test]
    fn test_update_by_alias() {
        let mut store = sample_store();
        let record = store
            .update_character_by_name("백호", json!({"injury": "healed"}))
            .unwrap();
        assert_eq!(record.attributes["injury"], "healed");
    }

    #[test]
    fn test_delete_by_name() {
        let mut store = sample_store();
        let removed = store.delete_character_by_name("강백호").unwrap();
        assert_eq!(removed.name, "강백호");
        assert_eq!(store.character_count(), 0);
    }

    #[test]
    fn test_lookup_miss_is_not_found() {
        let mut store = sample_store();
        let err = store.delete_character_by_name("전혀 다른 사람").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.character_count(), 1);
    }

    #[test]
    fn test_get_or_create_reuses_existing() {
        let mut store = sample_store();
        let existing = store.get_or_create_character("백호");
        assert_eq!(store.character_count(), 1);

        let created = store.get_or_create_character("서연");
        assert_eq!(store.character_count(), 2);
        assert_ne!(existing, created);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = sample_store();
        let snapshot = store.snapshot();
        store.delete_character_by_name("강백호").unwrap();

        assert_eq!(snapshot.characters.len(), 1);
        assert_eq!(store.character_count(), 0);
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = sample_store();
        let path = std::env::temp_dir().join(format!("canon-{}.json", Uuid::new_v4()));

        store.save_json(&path).await.unwrap();
        let loaded = CanonStore::load_json(&path).await.unwrap();
        let _ = fs::remove_file(&path).await;

        assert_eq!(loaded.character_count(), 1);
        assert_eq!(loaded.characters[0].name, "강백호");
        assert_eq!(loaded.world["era"], "조선 후기");
        assert_eq!(loaded.history.len(), 1);
    }

    #[tokio::test]
    async fn test_version_mismatch_rejected() {
        let path = std::env::temp_dir().join(format!("canon-{}.json", Uuid::new_v4()));
        fs::write(&path, r#"{"version": 99, "characters": []}"#)
            .await
            .unwrap();

        let err = CanonStore::load_json(&path).await.unwrap_err();
        let _ = fs::remove_file(&path).await;

        assert!(matches!(
            err,
            StoreError::VersionMismatch {
                expected: 1,
                found: 99
            }
        ));
    }

    #[tokio::test]
    async fn test_blank_name_rejected_at_load() {
        let path = std::env::temp_dir().join(format!("canon-{}.json", Uuid::new_v4()));
        fs::write(
            &path,
            r#"{"version": 1, "characters": [{"id": "x", "name": "  "}]}"#,
        )
        .await
        .unwrap();

        let err = CanonStore::load_json(&path).await.unwrap_err();
        let _ = fs::remove_file(&path).await;

        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }
}
