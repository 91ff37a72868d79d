//! Store construction helpers

use crate::backend::{GroupStore, InMemoryStore, LocalStore};
use crate::config::{PersistenceConfig, StoreBackend};
use crate::error::Result;
use std::sync::Arc;

/// Create a new local store with default configuration
pub fn create_local_store(data_dir: impl Into<std::path::PathBuf>) -> Result<LocalStore> {
    LocalStore::new(PersistenceConfig::new(data_dir))
}

/// Create whichever store the configuration asks for
pub fn create_store(config: &PersistenceConfig) -> Result<Arc<dyn GroupStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreBackend::Local => Ok(Arc::new(LocalStore::new(config.clone())?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction::{GroupKey, GroupState, Order, StageKey};
    use tempfile::TempDir;

    fn key() -> GroupKey {
        GroupKey::new(StageKey::new("carbon", "carbon_trading"), 3, 1)
    }

    #[test]
    fn test_local_store_creation() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_local_store(temp_dir.path()).unwrap();
        assert_eq!(store.data_dir(), temp_dir.path());
        assert!(temp_dir.path().join("groups").exists());
    }

    #[test]
    fn test_local_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_local_store(temp_dir.path()).unwrap();

        let mut state = GroupState::new();
        state.book.add(Order::buy(4, 9, 2));
        store.save(&key(), &state).unwrap();

        let path = store.path_for(&key());
        assert!(path.exists());
        assert!(path.ends_with("carbon/carbon_trading/round-003-group-001.json"));
        assert_eq!(store.load(&key()), state);
    }

    #[test]
    fn test_local_store_truncated_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_local_store(temp_dir.path()).unwrap();

        let mut state = GroupState::new();
        state.book.add(Order::sell(1, 20, 1));
        store.save(&key(), &state).unwrap();

        let path = store.path_for(&key());
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, &text[..text.len() / 2]).unwrap();

        assert_eq!(store.load(&key()), GroupState::default());
    }

    #[test]
    fn test_local_store_remove_missing_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_local_store(temp_dir.path()).unwrap();
        store.remove(&key()).unwrap();
        assert_eq!(store.load_raw(&key()).unwrap(), None);
    }

    #[test]
    fn test_create_store_by_backend() {
        let memory = create_store(&PersistenceConfig::default()).unwrap();
        memory.save(&key(), &GroupState::default()).unwrap();
        assert!(memory.load_raw(&key()).unwrap().is_some());

        let temp_dir = TempDir::new().unwrap();
        let local = create_store(&PersistenceConfig::new(temp_dir.path())).unwrap();
        local.reset(&key()).unwrap();
        assert!(local.load(&key()).book.is_empty());
    }
}
