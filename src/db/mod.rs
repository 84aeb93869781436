//! Persistence layer: a string key-value store plus typed JSON records.

pub mod file;
pub mod memory;
pub mod records;

use std::future::Future;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use records::EcoDb;

/// Storage keys as constants.
pub mod keys {
    /// JSON array of actions
    pub const ACTIONS: &str = "ecotrack_actions";
    /// JSON object of trips keyed by trip id
    pub const TRIPS: &str = "ecotrack_trips";
    /// Id of the current (active or paused) trip, absent when none
    pub const ACTIVE_TRIP: &str = "ecotrack_active_trip";
    pub const WEIGHT_UNIT: &str = "weightUnit";
    pub const CARBON_UNIT: &str = "carbonUnit";
}

/// Durable string key-value store.
///
/// Implementations must make each individual `set` all-or-nothing.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Keys are removed in order. On failure, keys before the failing one
    /// may be gone but later keys are untouched.
    fn multi_remove(&self, keys: &[&str]) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Errors from the key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed value for key '{key}': {message}")]
    Malformed { key: String, message: String },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Store selected at startup (`STORAGE=file|memory`).
#[derive(Debug, Clone)]
pub enum AnyStore {
    File(FileStore),
    Memory(MemoryStore),
}

impl KeyValueStore for AnyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            AnyStore::File(store) => store.get(key).await,
            AnyStore::Memory(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        match self {
            AnyStore::File(store) => store.set(key, value).await,
            AnyStore::Memory(store) => store.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self {
            AnyStore::File(store) => store.remove(key).await,
            AnyStore::Memory(store) => store.remove(key).await,
        }
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        match self {
            AnyStore::File(store) => store.multi_remove(keys).await,
            AnyStore::Memory(store) => store.multi_remove(keys).await,
        }
    }
}
