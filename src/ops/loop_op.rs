//! LoopOp: counter-driven iterator with per-iteration rollback and in-band
//! control signals.
//!
//! Each instance owns a fresh loop id and derives private flag keys in the
//! shared dry context (`__continue_loop_{id}`, `__break_loop_{id}`). An op
//! inside the loop can skip the rest of its iteration or terminate the whole
//! loop either by setting the flag or by raising the matching internal
//! signal; both paths are observably identical. Successful prior iterations
//! are never rolled back on a later-iteration failure.

use async_trait::async_trait;
use uuid::Uuid;

use crate::ops::dry_context::DryContext;
use crate::ops::error::OpError;
use crate::ops::metadata::OpMetadata;
use crate::ops::op::{rollback_lifo, AnyOp, Op};
use crate::ops::wet_context::WetContext;

/// Reserved dry-context key recording the innermost loop's id, so the
/// control-flow helpers can resolve the derived flag keys.
pub const CURRENT_LOOP_ID_KEY: &str = "__current_loop_id";

/// Counter-driven composite running its ops once per iteration until the
/// counter reaches `limit`, producing the concatenation of per-iteration
/// outputs.
pub struct LoopOp<T> {
    counter_var: String,
    limit: i64,
    ops: Vec<AnyOp<T>>,
    continue_on_error: bool,
    loop_id: String,
    continue_var: String,
    break_var: String,
}

impl<T: Send + 'static> LoopOp<T> {
    pub fn new(counter_var: impl Into<String>, limit: i64, ops: Vec<AnyOp<T>>) -> Self {
        Self::with_continue_on_error(counter_var, limit, ops, false)
    }

    /// On a non-abort child failure, rolls back the current iteration and
    /// advances to the next one instead of failing the loop.
    pub fn with_continue_on_error(
        counter_var: impl Into<String>,
        limit: i64,
        ops: Vec<AnyOp<T>>,
        continue_on_error: bool,
    ) -> Self {
        let loop_id = Uuid::new_v4().to_string();
        let continue_var = format!("__continue_loop_{}", loop_id);
        let break_var = format!("__break_loop_{}", loop_id);
        Self {
            counter_var: counter_var.into(),
            limit,
            ops,
            continue_on_error,
            loop_id,
            continue_var,
            break_var,
        }
    }

    pub fn loop_id(&self) -> &str {
        &self.loop_id
    }

    /// Derived flag key: set to true to skip the rest of the current
    /// iteration.
    pub fn continue_var(&self) -> &str {
        &self.continue_var
    }

    /// Derived flag key: set to true to terminate the loop, keeping results.
    pub fn break_var(&self) -> &str {
        &self.break_var
    }

    pub fn counter_var(&self) -> &str {
        &self.counter_var
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    fn abort_error(dry: &DryContext) -> OpError {
        OpError::Aborted(
            dry.abort_reason()
                .unwrap_or_else(|| "Operation aborted".to_string()),
        )
    }

    fn flag_is_set(dry: &DryContext, key: &str) -> bool {
        dry.get::<bool>(key).unwrap_or(false)
    }
}

#[async_trait]
impl<T: Send + 'static> Op for LoopOp<T> {
    type Output = Vec<T>;

    async fn perform(&self, dry: &DryContext, wet: &WetContext) -> Result<Vec<T>, OpError> {
        let mut counter: i64 = if dry.contains(&self.counter_var) {
            dry.get::<i64>(&self.counter_var).unwrap_or(0)
        } else {
            dry.insert(0i64, &*self.counter_var);
            0
        };
        dry.insert(self.loop_id.clone(), CURRENT_LOOP_ID_KEY);

        let mut results = Vec::new();

        while counter < self.limit {
            if dry.is_aborted() {
                // Nothing has succeeded in this iteration yet.
                return Err(Self::abort_error(dry));
            }

            dry.insert(false, &*self.continue_var);
            dry.insert(false, &*self.break_var);
            let mut iteration_succeeded: Vec<&AnyOp<T>> = Vec::new();

            'ops: for op in &self.ops {
                if dry.is_aborted() {
                    rollback_lifo(&iteration_succeeded, dry, wet).await;
                    return Err(Self::abort_error(dry));
                }

                match op.perform(dry, wet).await {
                    Ok(value) => {
                        results.push(value);
                        iteration_succeeded.push(op);
                        if Self::flag_is_set(dry, &self.continue_var) {
                            dry.insert(false, &*self.continue_var);
                            break 'ops;
                        } else if Self::flag_is_set(dry, &self.break_var) {
                            return Ok(results);
                        }
                    }
                    Err(OpError::Aborted(reason)) => {
                        rollback_lifo(&iteration_succeeded, dry, wet).await;
                        return Err(OpError::Aborted(reason));
                    }
                    Err(OpError::LoopContinue) => {
                        // Kept identical to the flag path: assert then clear.
                        dry.insert(true, &*self.continue_var);
                        dry.insert(false, &*self.continue_var);
                        break 'ops;
                    }
                    Err(OpError::LoopBreak) => {
                        return Ok(results);
                    }
                    Err(err) => {
                        rollback_lifo(&iteration_succeeded, dry, wet).await;
                        if self.continue_on_error {
                            log::warn!(
                                "loop op '{}' failed in iteration {}, continuing: {}",
                                op.metadata().name,
                                counter,
                                err
                            );
                            break 'ops;
                        }
                        return Err(err);
                    }
                }
            }

            counter += 1;
            dry.insert(counter, &*self.counter_var);
        }

        Ok(results)
    }

    fn metadata(&self) -> OpMetadata {
        OpMetadata::builder("LoopOp")
            .description(format!(
                "Loop of {} operations over counter '{}' up to {}",
                self.ops.len(),
                self.counter_var,
                self.limit
            ))
            .build()
    }
}
