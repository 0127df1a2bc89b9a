//! The message store: an in-memory index over a file-persisted dataset.
//!
//! The store is constructed explicitly and handed to the layer above; there
//! is no global instance. Lifecycle is construct → [`MessageStore::admit`] →
//! serve → drop. Every mutating operation holds the write lock across both
//! the index mutation and the full-file rewrite, so a concurrent caller can
//! never observe a partial write. Readers share the read lock.

pub(crate) mod admission;
mod directory;
pub(crate) mod files;

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{Message, QuarantineEntry};
use directory::AgentDirectory;

const DEFAULT_DATA_DIR: &str = "data";
const MESSAGES_FILE: &str = "messages.json";
const QUARANTINE_FILE: &str = "quarantine.json";

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: env_path("MAILSTORE_DATA_DIR", DEFAULT_DATA_DIR),
        }
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[derive(Default)]
struct StoreInner {
    messages: HashMap<Uuid, Message>,
    quarantined: Vec<QuarantineEntry>,
    directory: AgentDirectory,
}

/// File-persisted message store.
pub struct MessageStore {
    messages_path: PathBuf,
    quarantine_path: PathBuf,
    inner: RwLock<StoreInner>,
}

impl MessageStore {
    /// Create a store over the configured data directory. No I/O happens
    /// until [`MessageStore::admit`] runs.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            messages_path: config.data_dir.join(MESSAGES_FILE),
            quarantine_path: config.data_dir.join(QUARANTINE_FILE),
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Run the admission pipeline, replacing the in-memory index with the
    /// validated dataset. Must complete before any request is served;
    /// re-running is idempotent. The agent directory survives re-runs; it
    /// was never persisted to begin with.
    pub fn admit(&self) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let outcome = admission::run(&self.messages_path, &self.quarantine_path)?;
        inner.messages = outcome.messages;
        inner.quarantined = outcome.quarantined;
        Ok(())
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<Message> {
        self.inner.read().messages.get(&id).cloned()
    }

    pub fn exists(&self, id: Uuid) -> bool {
        self.inner.read().messages.contains_key(&id)
    }

    /// Consistent snapshot of every admitted message, taken under the read
    /// lock. Callers that scan (thread resolution, view filtering) operate
    /// on the snapshot so a concurrent write cannot skew the scan.
    pub fn get_all(&self) -> Vec<Message> {
        self.inner.read().messages.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().messages.is_empty()
    }

    /// Insert a new message and rewrite the backing file before returning.
    pub fn create(&self, message: Message) -> StoreResult<Message> {
        let mut inner = self.inner.write();
        inner.messages.insert(message.id, message.clone());
        self.save_messages(&inner)?;
        log::debug!("created message: {}", message.id);
        Ok(message)
    }

    /// Replace an existing message wholesale. `None` when the id is not in
    /// the index.
    pub fn update(&self, message: Message) -> StoreResult<Option<Message>> {
        let mut inner = self.inner.write();
        if !inner.messages.contains_key(&message.id) {
            return Ok(None);
        }
        inner.messages.insert(message.id, message.clone());
        self.save_messages(&inner)?;
        log::debug!("updated message: {}", message.id);
        Ok(Some(message))
    }

    /// Apply an in-place mutation to a message and persist it, all inside
    /// one critical section. `None` when the id is not in the index.
    pub fn modify<F>(&self, id: Uuid, apply: F) -> StoreResult<Option<Message>>
    where
        F: FnOnce(&mut Message),
    {
        let mut inner = self.inner.write();
        let Some(message) = inner.messages.get_mut(&id) else {
            return Ok(None);
        };
        apply(message);
        let updated = message.clone();
        self.save_messages(&inner)?;
        log::debug!("updated message: {id}");
        Ok(Some(updated))
    }

    pub fn quarantined(&self) -> Vec<QuarantineEntry> {
        self.inner.read().quarantined.clone()
    }

    /// Append a runtime quarantine entry and persist the quarantine file.
    pub fn add_to_quarantine(&self, original: Value, reason: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        log::warn!("quarantined record: {reason}");
        inner.quarantined.push(QuarantineEntry::new(original, reason));
        files::write_json(
            &self.quarantine_path,
            &admission::quarantine_doc(&inner.quarantined)?,
        )
    }

    // Agent directory: in-memory only, serialized through the same lock as
    // the index so registration and broadcast expansion never race.

    pub fn is_agent_name_available(&self, name: &str) -> bool {
        self.inner.read().directory.is_available(name)
    }

    pub fn register_agent(&self, name: &str, pid: Option<u32>) -> StoreResult<String> {
        self.inner.write().directory.register(name, pid)
    }

    pub fn update_agent_pid(&self, name: &str, pid: u32) -> bool {
        self.inner.write().directory.update_pid(name, pid)
    }

    pub fn registered_agent_names(&self) -> Vec<String> {
        self.inner.read().directory.names()
    }

    pub fn all_agents(&self) -> Vec<(String, Option<u32>)> {
        self.inner.read().directory.agents()
    }

    fn save_messages(&self, inner: &StoreInner) -> StoreResult<()> {
        files::write_json(
            &self.messages_path,
            &admission::messages_doc(&inner.messages)?,
        )?;
        log::debug!(
            "saved {} messages to {}",
            inner.messages.len(),
            self.messages_path.display()
        );
        Ok(())
    }
}
