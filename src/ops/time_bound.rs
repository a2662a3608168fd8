//! Deadline enforcement with cancellation.
//!
//! Races the wrapped op against a timer; losing the race drops the op future,
//! which cancels it at its next suspension point. Wrapped-op errors are never
//! swallowed. A success that lands past 80% of the budget emits a
//! near-timeout warning.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::ops::dry_context::DryContext;
use crate::ops::error::OpError;
use crate::ops::logging::LoggingWrapper;
use crate::ops::metadata::OpMetadata;
use crate::ops::op::{AnyOp, Op};
use crate::ops::wet_context::WetContext;

/// Structural op enforcing a deadline on the wrapped op.
pub struct TimeBoundWrapper<T> {
    inner: AnyOp<T>,
    timeout_secs: f64,
}

impl<T: Send + 'static> TimeBoundWrapper<T> {
    pub fn new(op: AnyOp<T>, timeout_secs: f64) -> Self {
        Self {
            inner: op,
            timeout_secs,
        }
    }

    /// The deadline in milliseconds, as reported on timeout.
    pub fn timeout_ms(&self) -> u64 {
        (self.timeout_secs * 1000.0).round() as u64
    }
}

#[async_trait]
impl<T: Send + 'static> Op for TimeBoundWrapper<T> {
    type Output = T;

    async fn perform(&self, dry: &DryContext, wet: &WetContext) -> Result<T, OpError> {
        let budget_ms = self.timeout_ms();
        let start = Instant::now();

        match tokio::time::timeout(
            Duration::from_millis(budget_ms),
            self.inner.perform(dry, wet),
        )
        .await
        {
            Ok(Ok(value)) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > self.timeout_secs * 0.8 {
                    log::warn!(
                        "op '{}' completed in {:.3}s, near its {:.3}s deadline",
                        self.inner.metadata().name,
                        elapsed,
                        self.timeout_secs
                    );
                }
                Ok(value)
            }
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => Err(OpError::Timeout(budget_ms)),
        }
    }

    fn metadata(&self) -> OpMetadata {
        self.inner.metadata()
    }

    async fn rollback(&self, dry: &DryContext, wet: &WetContext) -> Result<(), OpError> {
        self.inner.rollback(dry, wet).await
    }
}

/// Composes deadline enforcement inside tracing: the op is time-bound, and
/// the whole race is logged under `trigger_name`.
pub fn time_bound_logged<T: Send + 'static>(
    op: AnyOp<T>,
    timeout_secs: f64,
    trigger_name: impl Into<String>,
) -> LoggingWrapper<T> {
    LoggingWrapper::new(AnyOp::new(TimeBoundWrapper::new(op, timeout_secs)), trigger_name)
}
