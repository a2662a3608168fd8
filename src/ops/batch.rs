//! BatchOp: sequential executor with LIFO rollback.
//!
//! Ops run strictly in declaration order. On failure, everything that
//! succeeded so far is compensated in reverse order (best-effort), unless
//! `continue_on_error` collects the failure and moves on. A pre-existing or
//! mid-flight abort on the dry context is honored at each step boundary.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::ops::batch_metadata::BatchMetadataBuilder;
use crate::ops::dry_context::DryContext;
use crate::ops::error::OpError;
use crate::ops::metadata::OpMetadata;
use crate::ops::op::{rollback_lifo, AnyOp, Op};
use crate::ops::wet_context::WetContext;

/// Ordered sequence of ops with a shared output type, producing the vector
/// of their results.
pub struct BatchOp<T> {
    ops: Mutex<Vec<AnyOp<T>>>,
    continue_on_error: bool,
}

impl<T: Send + 'static> BatchOp<T> {
    pub fn new(ops: Vec<AnyOp<T>>) -> Self {
        Self {
            ops: Mutex::new(ops),
            continue_on_error: false,
        }
    }

    /// On a child failure, records the error and continues with the next op
    /// instead of rolling back and failing the batch.
    pub fn with_continue_on_error(ops: Vec<AnyOp<T>>, continue_on_error: bool) -> Self {
        Self {
            ops: Mutex::new(ops),
            continue_on_error,
        }
    }

    /// Appends an op. `perform` snapshots the list at entry, so an append
    /// during an in-flight execution affects only later executions.
    pub fn add_op(&self, op: AnyOp<T>) {
        self.ops.lock().expect("lock").push(op);
    }

    pub fn count(&self) -> usize {
        self.ops.lock().expect("lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().expect("lock").is_empty()
    }

    fn abort_error(dry: &DryContext) -> OpError {
        OpError::Aborted(
            dry.abort_reason()
                .unwrap_or_else(|| "Operation aborted".to_string()),
        )
    }
}

#[async_trait]
impl<T: Send + 'static> Op for BatchOp<T> {
    type Output = Vec<T>;

    async fn perform(&self, dry: &DryContext, wet: &WetContext) -> Result<Vec<T>, OpError> {
        let ops: Vec<AnyOp<T>> = self.ops.lock().expect("lock").clone();
        let mut results = Vec::with_capacity(ops.len());
        let mut succeeded: Vec<&AnyOp<T>> = Vec::new();

        for (index, op) in ops.iter().enumerate() {
            if dry.is_aborted() {
                rollback_lifo(&succeeded, dry, wet).await;
                return Err(Self::abort_error(dry));
            }

            match op.perform(dry, wet).await {
                Ok(value) => {
                    results.push(value);
                    succeeded.push(op);
                }
                Err(OpError::Aborted(reason)) => {
                    rollback_lifo(&succeeded, dry, wet).await;
                    return Err(OpError::Aborted(reason));
                }
                // Loop control signals belong to the nearest enclosing loop.
                Err(signal @ (OpError::LoopContinue | OpError::LoopBreak)) => {
                    return Err(signal);
                }
                Err(err) => {
                    if self.continue_on_error {
                        log::warn!(
                            "batch op {}-{} failed, continuing: {}",
                            index,
                            op.metadata().name,
                            err
                        );
                        continue;
                    }
                    rollback_lifo(&succeeded, dry, wet).await;
                    return Err(OpError::BatchFailed(format!(
                        "Op {}-{} failed: {}",
                        index,
                        op.metadata().name,
                        err
                    )));
                }
            }
        }

        Ok(results)
    }

    fn metadata(&self) -> OpMetadata {
        let ops = self.ops.lock().expect("lock");
        BatchMetadataBuilder::build(&ops)
    }
}
