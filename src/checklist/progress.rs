// SPDX-License-Identifier: MIT

//! Persisted player progress
//!
//! Progress lives in a flat JSON object whose keys are prefixed with a
//! namespace, e.g. `stellar-blade-checklist-completed`. Entries belonging to
//! other namespaces are kept as-is when the file is rewritten.

use crate::condition::Values;
use crate::error::GateError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const COMPLETED: &str = "completed";
const GAME_MODE: &str = "gameMode";
const LAST_REGION: &str = "lastRegion";

/// Completed keys plus the progression fields conditions are evaluated against
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: Option<PathBuf>,
    namespace: String,
    completed: Vec<String>,
    game_mode: i64,
    last_region: i64,
    /// Entries not owned by this namespace
    foreign: Map<String, Value>,
}

impl ProgressStore {
    /// Store that is never written to disk
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self {
            path: None,
            namespace: namespace.into(),
            completed: Vec::new(),
            game_mode: 0,
            last_region: 0,
            foreign: Map::new(),
        }
    }

    /// Open the progress file at `path`; a missing file yields an empty store
    pub fn open<P: AsRef<Path>>(path: P, namespace: impl Into<String>) -> Result<Self, GateError> {
        let path = path.as_ref();
        let mut store = Self::in_memory(namespace);
        store.path = Some(path.to_path_buf());

        if !path.exists() {
            log::info!("No progress file at {}, starting fresh", path.display());
            return Ok(store);
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(store);
        }
        let Value::Object(entries) = serde_json::from_str::<Value>(&content)? else {
            return Err(GateError::content(format!(
                "progress file {} is not a JSON object",
                path.display()
            )));
        };

        let prefix = store.prefix();
        for (key, value) in entries {
            match key.strip_prefix(prefix.as_str()) {
                Some(COMPLETED) => store.completed = parse_completed(value),
                Some(GAME_MODE) => store.game_mode = parse_number(GAME_MODE, &value),
                Some(LAST_REGION) => store.last_region = parse_number(LAST_REGION, &value),
                _ => {
                    store.foreign.insert(key, value);
                }
            }
        }
        log::debug!(
            "Loaded {} completed keys from {}",
            store.completed.len(),
            path.display()
        );
        Ok(store)
    }

    /// Write the store back to its file; in-memory stores do nothing
    pub fn save(&self) -> Result<(), GateError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut entries = self.foreign.clone();
        entries.insert(self.entry_key(COMPLETED), Value::from(self.completed.clone()));
        entries.insert(self.entry_key(GAME_MODE), Value::from(self.game_mode));
        entries.insert(self.entry_key(LAST_REGION), Value::from(self.last_region));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&Value::Object(entries))?)?;
        log::info!("Saved progress to {}", path.display());
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Completed keys in the order they were marked
    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    /// Mark or unmark `key`; returns whether anything changed
    pub fn set_completed(&mut self, key: &str, completed: bool) -> bool {
        let index = self.completed.iter().position(|k| k == key);
        match (completed, index) {
            (true, None) => {
                self.completed.push(key.to_string());
                true
            }
            (false, Some(index)) => {
                self.completed.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn is_completed(&self, key: &str) -> bool {
        self.completed.iter().any(|k| k == key)
    }

    /// Number of completed keys starting with `prefix`
    pub fn completed_count(&self, prefix: &str) -> usize {
        self.completed
            .iter()
            .filter(|k| k.starts_with(prefix))
            .count()
    }

    /// Add keys that are completed for everyone, keeping existing order
    pub fn merge_defaults(&mut self, defaults: &[String]) {
        for key in defaults {
            self.set_completed(key, true);
        }
    }

    /// Replace all completed keys, dropping duplicates
    pub fn replace_completed(&mut self, keys: Vec<String>) {
        self.completed.clear();
        for key in keys {
            self.set_completed(&key, true);
        }
    }

    pub fn game_mode(&self) -> i64 {
        self.game_mode
    }

    pub fn set_game_mode(&mut self, game_mode: i64) {
        self.game_mode = game_mode;
    }

    /// Zero-based index of the last region reached
    pub fn last_region(&self) -> i64 {
        self.last_region
    }

    pub fn set_last_region(&mut self, region: i64) {
        self.last_region = region;
    }

    /// Progression snapshot for condition evaluation
    pub fn values(&self) -> Values {
        Values::new()
            .with(GAME_MODE, self.game_mode)
            .with("region", self.last_region)
    }

    fn prefix(&self) -> String {
        format!("{}-", self.namespace)
    }

    fn entry_key(&self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }
}

fn parse_completed(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => {
            let mut keys: Vec<String> = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(key) if !keys.contains(&key) => keys.push(key),
                    Value::String(_) => {}
                    other => log::warn!("Skipping non-string completed entry {}", other),
                }
            }
            keys
        }
        other => {
            log::warn!("Completed entry is not a list: {}", other);
            Vec::new()
        }
    }
}

fn parse_number(name: &str, value: &Value) -> i64 {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        log::warn!("Ignoring invalid {} value {}", name, value);
        0
    })
}
