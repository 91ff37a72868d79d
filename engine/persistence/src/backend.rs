//! Group store trait and implementations

use crate::config::PersistenceConfig;
use crate::error::{PersistenceError, Result};
use crate::snapshot::{decode_or_reset, encode};
use auction::{GroupKey, GroupState};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Abstract storage for per-group market state.
///
/// Calls are synchronous: they run inside the group's critical section,
/// which is held for the whole read-match-settle-write sequence.
pub trait GroupStore: Send + Sync {
    /// Raw stored text for a group, if any
    fn load_raw(&self, key: &GroupKey) -> Result<Option<String>>;

    /// Replace the stored text for a group
    fn save_raw(&self, key: &GroupKey, text: &str) -> Result<()>;

    /// Forget a group entirely
    fn remove(&self, key: &GroupKey) -> Result<()>;

    /// Whether stored JSON should be pretty-printed
    fn pretty(&self) -> bool {
        false
    }

    /// Load a group's state. Missing, unreadable or corrupt data all read as empty.
    fn load(&self, key: &GroupKey) -> GroupState {
        match self.load_raw(key) {
            Ok(Some(text)) => decode_or_reset(&text),
            Ok(None) => GroupState::default(),
            Err(e) => {
                tracing::warn!(group = %key, error = %e, "group state unreadable; starting empty");
                GroupState::default()
            }
        }
    }

    /// Persist a group's state
    fn save(&self, key: &GroupKey, state: &GroupState) -> Result<()> {
        let text = encode(state, self.pretty())?;
        self.save_raw(key, &text)
    }

    /// Start a group over from an empty state
    fn reset(&self, key: &GroupKey) -> Result<()> {
        self.save(key, &GroupState::default())
    }
}

/// In-memory store (for tests and single-process runs)
#[derive(Default)]
pub struct InMemoryStore {
    groups: RwLock<HashMap<GroupKey, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups currently stored
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl GroupStore for InMemoryStore {
    fn load_raw(&self, key: &GroupKey) -> Result<Option<String>> {
        Ok(self.groups.read().get(key).cloned())
    }

    fn save_raw(&self, key: &GroupKey, text: &str) -> Result<()> {
        self.groups.write().insert(key.clone(), text.to_string());
        Ok(())
    }

    fn remove(&self, key: &GroupKey) -> Result<()> {
        self.groups.write().remove(key);
        Ok(())
    }
}

/// Local file-based store: one JSON file per group
pub struct LocalStore {
    config: PersistenceConfig,
}

impl LocalStore {
    /// Create a new local store, creating its directory if needed
    pub fn new(config: PersistenceConfig) -> Result<Self> {
        config.validate().map_err(PersistenceError::config)?;
        fs::create_dir_all(config.groups_dir())?;
        tracing::info!("Local group store initialized at: {:?}", config.groups_dir());
        Ok(Self { config })
    }

    /// Get the data directory
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// File that holds one group's state
    pub fn path_for(&self, key: &GroupKey) -> PathBuf {
        self.config
            .groups_dir()
            .join(sanitize(&key.stage.experiment))
            .join(sanitize(&key.stage.stage))
            .join(format!("round-{:03}-group-{:03}.json", key.round, key.group))
    }
}

fn sanitize(part: &str) -> String {
    part.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}

impl GroupStore for LocalStore {
    fn load_raw(&self, key: &GroupKey) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_raw(&self, key: &GroupKey, text: &str) -> Result<()> {
        let path = self.path_for(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        // Write-then-rename so a crash never leaves a half-written file behind.
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &GroupKey) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn pretty(&self) -> bool {
        self.config.pretty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction::{Order, StageKey};

    fn key(round: u32) -> GroupKey {
        GroupKey::new(StageKey::new("carbon", "carbon_trading"), round, 1)
    }

    #[test]
    fn memory_store_round_trip() {
        let store = InMemoryStore::new();
        assert_eq!(store.load(&key(1)), GroupState::default());

        let mut state = GroupState::new();
        state.book.add(Order::sell(3, 11, 2));
        store.save(&key(1), &state).unwrap();
        assert_eq!(store.load(&key(1)), state);
        assert_eq!(store.load(&key(2)), GroupState::default());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_store_recovers_from_garbage() {
        let store = InMemoryStore::new();
        store.save_raw(&key(1), "garbage").unwrap();
        assert_eq!(store.load(&key(1)), GroupState::default());
    }

    #[test]
    fn reset_and_remove() {
        let store = InMemoryStore::new();
        let mut state = GroupState::new();
        state.book.add(Order::buy(1, 5, 1));
        store.save(&key(1), &state).unwrap();

        store.reset(&key(1)).unwrap();
        assert!(store.load(&key(1)).book.is_empty());

        store.remove(&key(1)).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(sanitize("../etc"), "___etc");
        assert_eq!(sanitize("carbon_trading-2"), "carbon_trading-2");
    }
}
