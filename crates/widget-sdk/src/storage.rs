//! Pending-event persistence — bounded, namespaced storage so click events
//! survive widget teardown, page reloads, and process restarts.
//!
//! All operations are best-effort: storage failures are logged and swallowed,
//! never surfaced to the queue's callers. The store is a passive mirror of
//! what the queue tells it to save or clear; it owns no event lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use offerpulse_core::types::ClickEvent;
use tracing::{debug, warn};
use uuid::Uuid;

/// Hard cap on persisted events per namespace. Oldest entries are dropped
/// first when the cap is exceeded, bounding growth under sustained offline
/// conditions.
pub const MAX_PERSISTED_EVENTS: usize = 100;

/// Durable string key-value store supplied by the host environment.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// File-backed storage: one JSON file per key under a root directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage backend for tests and hosts without durable storage.
#[derive(Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Namespaced view over a backend holding the pending click events for one
/// queue instance.
#[derive(Clone)]
pub struct EventStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
}

impl EventStore {
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Merge events into the persisted set, de-duplicating by event id and
    /// keeping only the most recent [`MAX_PERSISTED_EVENTS`]. Re-saving an
    /// id replaces the stored copy, so bumped retry counts stick.
    pub fn save(&self, events: &[ClickEvent]) {
        let mut merged = self.load();
        merged.retain(|existing| !events.iter().any(|e| e.id == existing.id));
        merged.extend_from_slice(events);
        if merged.len() > MAX_PERSISTED_EVENTS {
            let excess = merged.len() - MAX_PERSISTED_EVENTS;
            merged.drain(..excess);
        }

        let json = match serde_json::to_string(&merged) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize pending events");
                return;
            }
        };
        if let Err(e) = self.backend.write(&self.key, &json) {
            metrics::counter!("widget.storage.write_failed").increment(1);
            warn!(error = %e, key = %self.key, "failed to persist pending events");
        } else {
            debug!(count = merged.len(), key = %self.key, "pending events persisted");
        }
    }

    /// Load the persisted set. Backend errors and malformed content both
    /// yield an empty list; a corrupt record must never break the queue.
    pub fn load(&self) -> Vec<ClickEvent> {
        let raw = match self.backend.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, key = %self.key, "failed to read pending events");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, key = %self.key, "malformed pending events, discarding");
                Vec::new()
            }
        }
    }

    /// Remove the listed event ids from the persisted set, leaving events
    /// owned by other batches untouched.
    pub fn remove(&self, ids: &[Uuid]) {
        let remaining: Vec<ClickEvent> = self
            .load()
            .into_iter()
            .filter(|e| !ids.contains(&e.id))
            .collect();
        if remaining.is_empty() {
            self.clear();
            return;
        }
        match serde_json::to_string(&remaining) {
            Ok(json) => {
                if let Err(e) = self.backend.write(&self.key, &json) {
                    warn!(error = %e, key = %self.key, "failed to rewrite pending events");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize pending events"),
        }
    }

    /// Drop everything persisted under this namespace.
    pub fn clear(&self) {
        if let Err(e) = self.backend.delete(&self.key) {
            warn!(error = %e, key = %self.key, "failed to clear pending events");
        }
    }

    /// Number of events currently persisted.
    pub fn count(&self) -> usize {
        self.load().len()
    }
}
