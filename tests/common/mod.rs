//! Shared test ops: probes that record perform/rollback order, fixed-value
//! ops, and ops that raise control signals at chosen iterations.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use opflow::ops::{abort, break_loop, continue_loop, DryContext, Op, OpError, OpMetadata, WetContext};

/// Records the order in which ops perform and roll back.
#[derive(Default)]
pub struct Probe {
    performed: Mutex<Vec<i64>>,
    rolled_back: Mutex<Vec<i64>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_perform(&self, id: i64) {
        self.performed.lock().expect("lock").push(id);
    }

    pub fn record_rollback(&self, id: i64) {
        self.rolled_back.lock().expect("lock").push(id);
    }

    pub fn performed(&self) -> Vec<i64> {
        self.performed.lock().expect("lock").clone()
    }

    pub fn rolled_back(&self) -> Vec<i64> {
        self.rolled_back.lock().expect("lock").clone()
    }
}

/// Probe-backed op: performs (optionally failing), and records rollback.
pub struct TrackOp {
    id: i64,
    fail: bool,
    probe: Arc<Probe>,
}

impl TrackOp {
    pub fn new(id: i64, probe: Arc<Probe>) -> Self {
        Self {
            id,
            fail: false,
            probe,
        }
    }

    pub fn failing(id: i64, probe: Arc<Probe>) -> Self {
        Self {
            id,
            fail: true,
            probe,
        }
    }
}

#[async_trait]
impl Op for TrackOp {
    type Output = i64;

    async fn perform(&self, _dry: &DryContext, _wet: &WetContext) -> Result<i64, OpError> {
        self.probe.record_perform(self.id);
        if self.fail {
            return Err(OpError::ExecutionFailed(format!(
                "track op {} failed",
                self.id
            )));
        }
        Ok(self.id)
    }

    fn metadata(&self) -> OpMetadata {
        OpMetadata::new(format!("track-{}", self.id))
    }

    async fn rollback(&self, _dry: &DryContext, _wet: &WetContext) -> Result<(), OpError> {
        self.probe.record_rollback(self.id);
        Ok(())
    }
}

/// Probe-backed op that fails only when the counter variable holds `when`.
pub struct FailAtIterationOp {
    id: i64,
    counter_var: String,
    when: i64,
    probe: Arc<Probe>,
}

impl FailAtIterationOp {
    pub fn new(id: i64, counter_var: impl Into<String>, when: i64, probe: Arc<Probe>) -> Self {
        Self {
            id,
            counter_var: counter_var.into(),
            when,
            probe,
        }
    }
}

#[async_trait]
impl Op for FailAtIterationOp {
    type Output = i64;

    async fn perform(&self, dry: &DryContext, _wet: &WetContext) -> Result<i64, OpError> {
        self.probe.record_perform(self.id);
        let counter: i64 = dry.get(&self.counter_var).unwrap_or(0);
        if counter == self.when {
            return Err(OpError::ExecutionFailed(format!(
                "op {} failed at iteration {}",
                self.id, counter
            )));
        }
        Ok(self.id)
    }

    fn metadata(&self) -> OpMetadata {
        OpMetadata::new(format!("fail-at-{}", self.when))
    }

    async fn rollback(&self, _dry: &DryContext, _wet: &WetContext) -> Result<(), OpError> {
        self.probe.record_rollback(self.id);
        Ok(())
    }
}

/// Returns a fixed value.
pub struct ValueOp(pub i64);

#[async_trait]
impl Op for ValueOp {
    type Output = i64;

    async fn perform(&self, _dry: &DryContext, _wet: &WetContext) -> Result<i64, OpError> {
        Ok(self.0)
    }

    fn metadata(&self) -> OpMetadata {
        OpMetadata::new(format!("value-{}", self.0))
    }
}

/// Returns the current value of a counter variable.
pub struct CounterReadOp {
    pub counter_var: String,
}

#[async_trait]
impl Op for CounterReadOp {
    type Output = i64;

    async fn perform(&self, dry: &DryContext, _wet: &WetContext) -> Result<i64, OpError> {
        dry.get_required(&self.counter_var)
    }

    fn metadata(&self) -> OpMetadata {
        OpMetadata::new("counter-read")
    }
}

/// Calls the `abort` helper when the counter variable holds `when`;
/// otherwise returns its id.
pub struct AbortAtIterationOp {
    pub id: i64,
    pub counter_var: String,
    pub when: i64,
}

#[async_trait]
impl Op for AbortAtIterationOp {
    type Output = i64;

    async fn perform(&self, dry: &DryContext, _wet: &WetContext) -> Result<i64, OpError> {
        let counter: i64 = dry.get(&self.counter_var).unwrap_or(0);
        if counter == self.when {
            abort(dry, Some("aborted mid-loop"))?;
        }
        Ok(self.id)
    }

    fn metadata(&self) -> OpMetadata {
        OpMetadata::new("abort-at-iteration")
    }
}

/// Raises the loop-break signal via the helper when the counter variable
/// holds `when`; otherwise returns its id.
pub struct BreakAtIterationOp {
    pub id: i64,
    pub counter_var: String,
    pub when: i64,
}

#[async_trait]
impl Op for BreakAtIterationOp {
    type Output = i64;

    async fn perform(&self, dry: &DryContext, _wet: &WetContext) -> Result<i64, OpError> {
        let counter: i64 = dry.get(&self.counter_var).unwrap_or(0);
        if counter == self.when {
            break_loop(dry)?;
        }
        Ok(self.id)
    }

    fn metadata(&self) -> OpMetadata {
        OpMetadata::new("break-at-iteration")
    }
}

/// Raises the loop-continue signal via the helper on every iteration.
pub struct ContinueSignalOp;

#[async_trait]
impl Op for ContinueSignalOp {
    type Output = i64;

    async fn perform(&self, dry: &DryContext, _wet: &WetContext) -> Result<i64, OpError> {
        continue_loop(dry)?;
        unreachable!("continue_loop always yields an error")
    }

    fn metadata(&self) -> OpMetadata {
        OpMetadata::new("continue-signal")
    }
}
