use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{ServiceState, StudyItem};

/// Fixed document key under which the service state is persisted.
pub const STATE_KEY: &str = "service_state";

/// Document-oriented key-value store the engine persists into. The engine
/// does not care how documents are stored; implementations only need
/// last-writer-wins semantics (single logical writer per process).
#[async_trait]
pub trait Storage: Send + Sync {
    /// All items in a collection (e.g. "flashcards", "quiz").
    async fn get_all(&self, kind: &str) -> Result<Vec<StudyItem>>;

    /// Upsert items into a collection, keyed by item id.
    async fn save_many(&self, kind: &str, items: &[StudyItem]) -> Result<()>;

    /// Remove every item generated from the given source document.
    /// Returns the number of items removed.
    async fn delete_by_document(&self, kind: &str, document_id: &str) -> Result<usize>;

    /// The persisted service state document, if one exists.
    async fn load_state(&self) -> Result<Option<ServiceState>>;

    /// Persist the service state document.
    async fn save_state(&self, state: &ServiceState) -> Result<()>;
}

/// JSON-file-backed store: one file per collection under a data directory.
/// Writes go through a temp file + rename so a crash never leaves a
/// half-written collection behind.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn collection_path(&self, kind: &str) -> PathBuf {
        self.dir.join(format!("{kind}.json"))
    }

    async fn read_collection(&self, path: &Path) -> Result<Vec<StudyItem>> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("parsing collection file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("reading collection file {}", path.display())),
        }
    }

    async fn write_json(&self, path: &Path, json: String) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;
        debug!(path = %path.display(), "Persisted document");
        Ok(())
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn get_all(&self, kind: &str) -> Result<Vec<StudyItem>> {
        self.read_collection(&self.collection_path(kind)).await
    }

    async fn save_many(&self, kind: &str, items: &[StudyItem]) -> Result<()> {
        let path = self.collection_path(kind);
        let mut existing = self.read_collection(&path).await?;

        for item in items {
            match existing.iter_mut().find(|e| e.id == item.id) {
                Some(slot) => *slot = item.clone(),
                None => existing.push(item.clone()),
            }
        }

        let json = serde_json::to_string_pretty(&existing)?;
        self.write_json(&path, json).await
    }

    async fn delete_by_document(&self, kind: &str, document_id: &str) -> Result<usize> {
        let path = self.collection_path(kind);
        let mut existing = self.read_collection(&path).await?;
        let before = existing.len();
        existing.retain(|item| item.source_document_id.as_deref() != Some(document_id));
        let removed = before - existing.len();

        if removed > 0 {
            let json = serde_json::to_string_pretty(&existing)?;
            self.write_json(&path, json).await?;
        }
        Ok(removed)
    }

    async fn load_state(&self) -> Result<Option<ServiceState>> {
        let path = self.collection_path(STATE_KEY);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw).with_context(|| {
                format!("parsing service state file {}", path.display())
            })?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn save_state(&self, state: &ServiceState) -> Result<()> {
        let path = self.collection_path(STATE_KEY);
        let json = serde_json::to_string_pretty(state)?;
        self.write_json(&path, json).await
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    collections: Arc<RwLock<HashMap<String, Vec<StudyItem>>>>,
    state: Arc<RwLock<Option<ServiceState>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_all(&self, kind: &str) -> Result<Vec<StudyItem>> {
        let collections = self.collections.read().await;
        Ok(collections.get(kind).cloned().unwrap_or_default())
    }

    async fn save_many(&self, kind: &str, items: &[StudyItem]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let existing = collections.entry(kind.to_string()).or_default();
        for item in items {
            match existing.iter_mut().find(|e| e.id == item.id) {
                Some(slot) => *slot = item.clone(),
                None => existing.push(item.clone()),
            }
        }
        Ok(())
    }

    async fn delete_by_document(&self, kind: &str, document_id: &str) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let Some(existing) = collections.get_mut(kind) else {
            return Ok(0);
        };
        let before = existing.len();
        existing.retain(|item| item.source_document_id.as_deref() != Some(document_id));
        Ok(before - existing.len())
    }

    async fn load_state(&self) -> Result<Option<ServiceState>> {
        Ok(self.state.read().await.clone())
    }

    async fn save_state(&self, state: &ServiceState) -> Result<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }
}
