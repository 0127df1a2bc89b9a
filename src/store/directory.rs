//! In-memory agent directory.
//!
//! Names are reserved permanently: once registered, a name is never
//! available again, even if the agent's process goes away. Nothing here is
//! persisted; the directory resets with the process.

use std::collections::{HashMap, HashSet};

use crate::error::{StoreError, StoreResult, ValidationError};
use crate::models::normalize_name;

#[derive(Debug, Default)]
pub(crate) struct AgentDirectory {
    registry: HashMap<String, Option<u32>>,
    reserved: HashSet<String>,
}

impl AgentDirectory {
    pub fn is_available(&self, name: &str) -> bool {
        !self.reserved.contains(&normalize_name(name))
    }

    /// Register a new agent, reserving its normalized name permanently.
    pub fn register(&mut self, name: &str, pid: Option<u32>) -> StoreResult<String> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(ValidationError::EmptyValue("name").into());
        }
        if self.reserved.contains(&normalized) {
            return Err(StoreError::NameTaken(normalized));
        }
        self.reserved.insert(normalized.clone());
        self.registry.insert(normalized.clone(), pid);
        log::debug!("registered agent: {normalized}");
        Ok(normalized)
    }

    /// Update a registered agent's pid; `false` when the name is unknown.
    pub fn update_pid(&mut self, name: &str, pid: u32) -> bool {
        let normalized = normalize_name(name);
        if !self.reserved.contains(&normalized) {
            return false;
        }
        self.registry.insert(normalized, Some(pid));
        true
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered agents with their pids, sorted by name.
    pub fn agents(&self) -> Vec<(String, Option<u32>)> {
        let mut agents: Vec<(String, Option<u32>)> = self
            .registry
            .iter()
            .map(|(name, pid)| (name.clone(), *pid))
            .collect();
        agents.sort_by(|a, b| a.0.cmp(&b.0));
        agents
    }
}
