//! # Persistence Layer
//!
//! Storage for per-group auction state between market events. The order
//! book, trade ledger and price history of one group in one round are saved
//! as a single versioned JSON snapshot.
//!
//! ## Architecture
//!
//! - **GroupStore**: Abstract trait for different storage backends
//! - **InMemoryStore**: Process-local implementation
//! - **LocalStore**: One file per group, written atomically
//! - **Snapshots**: Versioned envelope; unreadable data resets to an empty state
//!
//! ## Usage
//!
//! ```rust
//! use auction::{GroupKey, GroupState, StageKey};
//! use persistence::{GroupStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! let key = GroupKey::new(StageKey::new("carbon", "carbon_trading"), 1, 1);
//! store.save(&key, &GroupState::default()).unwrap();
//! assert!(store.load(&key).book.is_empty());
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod local;
pub mod snapshot;

pub use backend::{GroupStore, InMemoryStore, LocalStore};
pub use config::{PersistenceConfig, StoreBackend};
pub use error::{PersistenceError, Result};
pub use local::{create_local_store, create_store};
pub use snapshot::{decode, decode_or_reset, encode, GroupSnapshot, SNAPSHOT_VERSION};
