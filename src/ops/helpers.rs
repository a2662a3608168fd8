//! Ergonomic façades over the contexts and the control-flow protocol.
//!
//! The control helpers are the only supported way for user code to touch the
//! reserved keys: `abort` raises the abort flag and yields the matching
//! error; `continue_loop`/`break_loop` resolve the innermost loop through
//! `__current_loop_id`, set its derived flag, and yield the internal signal
//! so both surfaces stay in step.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::ops::dry_context::DryContext;
use crate::ops::error::OpError;
use crate::ops::logging::{caller_name, LoggingWrapper};
use crate::ops::loop_op::CURRENT_LOOP_ID_KEY;
use crate::ops::op::{AnyOp, Op};
use crate::ops::wet_context::WetContext;

/// Stores a value in the dry context.
pub fn dry_put<T: Serialize>(dry: &DryContext, value: T, key: &str) {
    dry.insert(value, key);
}

/// Reads a value from the dry context, if present and decodable.
pub fn dry_get<T: DeserializeOwned>(dry: &DryContext, key: &str) -> Option<T> {
    dry.get(key)
}

/// Reads a required value from the dry context.
pub fn dry_require<T: DeserializeOwned>(dry: &DryContext, key: &str) -> Result<T, OpError> {
    dry.get_required(key)
}

/// Stores an op's result under both its own name and the shared `"result"`
/// key, so downstream ops can consume either.
pub fn dry_result<T: Serialize>(value: T, op_name: &str, dry: &DryContext) {
    let serialized = serde_json::to_value(value).unwrap_or_else(|e| {
        panic!("non-serializable result for op '{}': {}", op_name, e)
    });
    dry.insert(serialized.clone(), op_name);
    dry.insert(serialized, "result");
}

/// Stores a shared reference in the wet context.
pub fn wet_put_ref<T: Send + Sync + 'static>(wet: &WetContext, reference: Arc<T>, key: &str) {
    wet.put_ref(reference, key);
}

/// Reads a required reference from the wet context.
pub fn wet_require_ref<T: Send + Sync + 'static>(
    wet: &WetContext,
    key: &str,
) -> Result<Arc<T>, OpError> {
    wet.require_ref(key)
}

/// Raises the abort flag and yields the abort error. Always returns `Err`,
/// so call as `abort(dry, reason)?`.
pub fn abort(dry: &DryContext, reason: Option<&str>) -> Result<(), OpError> {
    let reason = reason.unwrap_or("Operation aborted").to_string();
    dry.set_abort(Some(reason.clone()));
    Err(OpError::Aborted(reason))
}

/// Yields the abort error when the flag is already raised.
pub fn check_abort(dry: &DryContext) -> Result<(), OpError> {
    if dry.is_aborted() {
        return Err(OpError::Aborted(
            dry.abort_reason()
                .unwrap_or_else(|| "Operation aborted".to_string()),
        ));
    }
    Ok(())
}

/// Skips the remainder of the current loop iteration: sets the innermost
/// loop's continue flag and yields the internal signal. Always returns `Err`.
pub fn continue_loop(dry: &DryContext) -> Result<(), OpError> {
    if let Some(loop_id) = dry.get::<String>(CURRENT_LOOP_ID_KEY) {
        dry.insert(true, format!("__continue_loop_{}", loop_id));
    }
    Err(OpError::LoopContinue)
}

/// Terminates the innermost loop, keeping accumulated results: sets its
/// break flag and yields the internal signal. Always returns `Err`.
pub fn break_loop(dry: &DryContext) -> Result<(), OpError> {
    if let Some(loop_id) = dry.get::<String>(CURRENT_LOOP_ID_KEY) {
        dry.insert(true, format!("__break_loop_{}", loop_id));
    }
    Err(OpError::LoopBreak)
}

/// Runs an op wrapped in a [`LoggingWrapper`] whose trigger name is the
/// caller location (`"{file_stem}::{line}"`).
#[track_caller]
pub fn perform<'a, T: Send + 'static>(
    op: AnyOp<T>,
    dry: &'a DryContext,
    wet: &'a WetContext,
) -> impl Future<Output = Result<T, OpError>> + 'a {
    let wrapper = LoggingWrapper::new(op, caller_name());
    async move { wrapper.perform(dry, wet).await }
}
