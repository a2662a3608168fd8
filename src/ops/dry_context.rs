//! DryContext: thread-safe keyed store of JSON-representable values plus
//! cooperative control flags.
//!
//! Values are canonicalized to a `serde_json::Value` tree eagerly at
//! insertion, so round-tripping through the store yields a stable
//! representation. A non-serializable value is a programmer error and fails
//! loudly at insertion. All operations are synchronous behind a mutex and do
//! not suspend; multi-step views return copies.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ops::error::OpError;
use crate::ops::wet_context::WetContext;

/// Cooperative cancellation flags carried alongside the value store.
///
/// Once `aborted` is set it stays set until an explicit
/// [`DryContext::clear_control_flags`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlags {
    pub aborted: bool,
    pub abort_reason: Option<String>,
}

#[derive(Debug, Default)]
struct DryInner {
    values: HashMap<String, Value>,
    flags: ControlFlags,
}

/// Process-local, thread-safe mapping from string keys to JSON values, plus
/// abort flags. Created by a caller, mutated by any op during `perform`,
/// destroyed with the execution.
#[derive(Debug, Default)]
pub struct DryContext {
    inner: Mutex<DryInner>,
}

/// Human name for a JSON value's kind, for type-mismatch diagnostics.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl DryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes and stores a value under the given key, replacing any
    /// previous value.
    ///
    /// Panics if the value cannot be represented as JSON; the store must not
    /// silently accept non-serializable values.
    pub fn insert<T: Serialize>(&self, value: T, key: impl Into<String>) {
        let key = key.into();
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            panic!("non-serializable value for dry context key '{}': {}", key, e)
        });
        self.inner.lock().expect("lock").values.insert(key, value);
    }

    /// Builder-style insert for constructing a context inline.
    pub fn with<T: Serialize>(self, value: T, key: impl Into<String>) -> Self {
        self.insert(value, key);
        self
    }

    /// Decodes the stored value for `key` into `T`. Returns `None` when the
    /// key is missing or the stored value does not decode as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = {
            let guard = self.inner.lock().expect("lock");
            guard.values.get(key).cloned()
        };
        value.and_then(|v| serde_json::from_value(v).ok())
    }

    /// Decodes the stored value for `key`, distinguishing a missing key from
    /// a stored value of the wrong shape.
    pub fn get_required<T: DeserializeOwned>(&self, key: &str) -> Result<T, OpError> {
        let value = {
            let guard = self.inner.lock().expect("lock");
            guard.values.get(key).cloned()
        };
        let value = value.ok_or_else(|| {
            OpError::Context(format!("Required dry context key '{}' not found", key))
        })?;
        serde_json::from_value(value.clone()).map_err(|_| {
            OpError::Context(format!(
                "Type mismatch for dry context key '{}': expected '{}', but found '{}' value: {}",
                key,
                std::any::type_name::<T>(),
                json_kind(&value),
                value
            ))
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().expect("lock").values.contains_key(key)
    }

    /// Snapshot of the stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().expect("lock").values.keys().cloned().collect()
    }

    /// Snapshot of the full value map, e.g. for schema validation.
    pub fn values(&self) -> serde_json::Map<String, Value> {
        let guard = self.inner.lock().expect("lock");
        guard
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Copies every key from `other` into `self`, overwriting on overlap
    /// (last writer wins). The abort flag is only adopted when `self` is not
    /// already aborted; an existing abort is never overridden.
    pub fn merge(&self, other: &DryContext) {
        let (values, flags) = {
            let guard = other.inner.lock().expect("lock");
            (guard.values.clone(), guard.flags.clone())
        };
        let mut guard = self.inner.lock().expect("lock");
        guard.values.extend(values);
        if flags.aborted && !guard.flags.aborted {
            guard.flags.aborted = true;
            guard.flags.abort_reason = flags.abort_reason;
        }
    }

    /// Independent clone of values and control flags. Mutations on the copy
    /// do not affect the source.
    pub fn copy(&self) -> DryContext {
        let guard = self.inner.lock().expect("lock");
        DryContext {
            inner: Mutex::new(DryInner {
                values: guard.values.clone(),
                flags: guard.flags.clone(),
            }),
        }
    }

    /// Raises the abort flag. The flag stays raised until
    /// [`clear_control_flags`](Self::clear_control_flags).
    pub fn set_abort(&self, reason: Option<String>) {
        let mut guard = self.inner.lock().expect("lock");
        guard.flags.aborted = true;
        guard.flags.abort_reason = reason;
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.lock().expect("lock").flags.aborted
    }

    pub fn abort_reason(&self) -> Option<String> {
        self.inner.lock().expect("lock").flags.abort_reason.clone()
    }

    /// Resets the abort flag and reason.
    pub fn clear_control_flags(&self) {
        self.inner.lock().expect("lock").flags = ControlFlags::default();
    }

    /// Returns the decoded value for `key`, inserting `factory()` first when
    /// the key is absent (or its stored value does not decode as `T`).
    pub fn get_or_insert<T, F>(&self, key: &str, factory: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let mut guard = self.inner.lock().expect("lock");
        if let Some(existing) = guard.values.get(key) {
            if let Ok(decoded) = serde_json::from_value::<T>(existing.clone()) {
                return decoded;
            }
        }
        let value = factory();
        let serialized = serde_json::to_value(&value).unwrap_or_else(|e| {
            panic!("non-serializable value for dry context key '{}': {}", key, e)
        });
        guard.values.insert(key.to_string(), serialized);
        value
    }

    /// Like [`get_or_insert`](Self::get_or_insert), but the factory receives
    /// the context and key. The lock is not held across the factory call, so
    /// the factory may read other keys.
    pub fn get_or_compute<T, F>(&self, key: &str, factory: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&DryContext, &str) -> T,
    {
        if let Some(existing) = self.get::<T>(key) {
            return existing;
        }
        let value = factory(self, key);
        let serialized = serde_json::to_value(&value).unwrap_or_else(|e| {
            panic!("non-serializable value for dry context key '{}': {}", key, e)
        });
        self.inner
            .lock()
            .expect("lock")
            .values
            .insert(key.to_string(), serialized);
        value
    }

    /// Async insert-if-absent: when `key` is missing, awaits the factory
    /// (which may consult the [`WetContext`] for live services), stores the
    /// produced value, and returns it.
    pub async fn ensure<'a, T, F, Fut>(
        &self,
        key: &str,
        wet: &'a WetContext,
        factory: F,
    ) -> Result<T, OpError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&'a WetContext) -> Fut,
        Fut: Future<Output = Result<T, OpError>> + 'a,
    {
        if let Some(existing) = self.get::<T>(key) {
            return Ok(existing);
        }
        let value = factory(wet).await?;
        let serialized = serde_json::to_value(&value).unwrap_or_else(|e| {
            panic!("non-serializable value for dry context key '{}': {}", key, e)
        });
        self.inner
            .lock()
            .expect("lock")
            .values
            .insert(key.to_string(), serialized);
        Ok(value)
    }
}
