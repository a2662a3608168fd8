//! WetContext: thread-safe keyed store of opaque typed references.
//!
//! Mirror of [`DryContext`](crate::ops::dry_context::DryContext) minus
//! serialization and control flags: values are live runtime references
//! (services, connections, handles), retrieved by expected type. The
//! framework never copies a reference; only the `Arc` is cloned.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ops::error::OpError;

/// Thread-safe mapping from string keys to opaque typed references.
#[derive(Debug, Default)]
pub struct WetContext {
    inner: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl WetContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a shared reference under the given key, replacing any previous
    /// reference.
    pub fn put_ref<T: Send + Sync + 'static>(&self, reference: Arc<T>, key: impl Into<String>) {
        self.inner
            .lock()
            .expect("lock")
            .insert(key.into(), reference);
    }

    /// Builder-style insert for constructing a context inline.
    pub fn with_ref<T: Send + Sync + 'static>(self, reference: Arc<T>, key: impl Into<String>) -> Self {
        self.put_ref(reference, key);
        self
    }

    /// Retrieves the reference stored under `key` as `T`. Returns `None` when
    /// the key is missing or holds a reference of another type.
    pub fn get_ref<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let entry = {
            let guard = self.inner.lock().expect("lock");
            guard.get(key).cloned()
        };
        entry.and_then(|any| any.downcast::<T>().ok())
    }

    /// Retrieves the reference stored under `key` as `T`, distinguishing a
    /// missing key from a reference of the wrong type.
    pub fn require_ref<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>, OpError> {
        let entry = {
            let guard = self.inner.lock().expect("lock");
            guard.get(key).cloned()
        };
        let entry = entry.ok_or_else(|| {
            OpError::Context(format!("Required reference '{}' not found in WetContext", key))
        })?;
        entry.downcast::<T>().map_err(|_| {
            OpError::Context(format!(
                "Type mismatch for wet context key '{}': expected '{}'",
                key,
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().expect("lock").contains_key(key)
    }

    /// Snapshot of the stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().expect("lock").keys().cloned().collect()
    }

    /// Copies every reference from `other` into `self`, overwriting on
    /// overlap.
    pub fn merge(&self, other: &WetContext) {
        let entries: Vec<(String, Arc<dyn Any + Send + Sync>)> = {
            let guard = other.inner.lock().expect("lock");
            guard.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        let mut guard = self.inner.lock().expect("lock");
        guard.extend(entries);
    }
}
