//! In-process key-value store.
//!
//! Used for `STORAGE=memory` and by tests, which can make writes fail to
//! exercise rollback paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::{KeyValueStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    values: HashMap<String, String>,
    fail_all_writes: bool,
    /// Successful writes left before the next one fails (once)
    fail_after_writes: Option<usize>,
}

/// Process-local store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned map is still a valid map.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every subsequent write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_all_writes = fail;
    }

    /// Let `successes` writes through, then fail exactly one.
    pub fn fail_write_after(&self, successes: usize) {
        self.lock().fail_after_writes = Some(successes);
    }

    /// Raw value for a key, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    /// Insert a raw value, bypassing failure injection.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock()
            .values
            .insert(key.to_string(), value.to_string());
    }

    fn check_write(inner: &mut Inner) -> Result<(), StoreError> {
        if inner.fail_all_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        match inner.fail_after_writes {
            Some(0) => {
                inner.fail_after_writes = None;
                Err(StoreError::Unavailable("injected write failure".to_string()))
            }
            Some(n) => {
                inner.fail_after_writes = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_write(&mut inner)?;
        inner.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_write(&mut inner)?;
        inner.values.remove(key);
        Ok(())
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_write(&mut inner)?;
        for key in keys {
            inner.values.remove(*key);
        }
        Ok(())
    }
}
