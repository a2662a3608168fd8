//! Trace emission around op execution.
//!
//! [`LoggingWrapper`] emits start / success / failure events through a
//! pluggable [`TraceSink`]; the default sink routes to the `log` facade with
//! ANSI-colored markers. Loop control signals and aborts pass through
//! unchanged so the enclosing composite can handle them; every other failure
//! is rewrapped to name the trigger.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ops::dry_context::DryContext;
use crate::ops::error::OpError;
use crate::ops::metadata::OpMetadata;
use crate::ops::op::{AnyOp, Op};
use crate::ops::wet_context::WetContext;

pub const ANSI_YELLOW: &str = "\x1b[33m";
pub const ANSI_GREEN: &str = "\x1b[32m";
pub const ANSI_RED: &str = "\x1b[31m";
pub const ANSI_RESET: &str = "\x1b[0m";

/// A single trace event emitted around `perform`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TraceEvent {
    Started {
        name: String,
        timestamp_ms: Option<i64>,
    },
    Completed {
        name: String,
        seconds: f64,
        timestamp_ms: Option<i64>,
    },
    Failed {
        name: String,
        seconds: f64,
        error: String,
        timestamp_ms: Option<i64>,
    },
}

impl TraceEvent {
    /// Human-readable rendering; these strings are stable.
    pub fn message(&self) -> String {
        match self {
            TraceEvent::Started { name, .. } => format!("Starting op: {}", name),
            TraceEvent::Completed { name, seconds, .. } => {
                format!("Op '{}' completed in {:.3} seconds", name, seconds)
            }
            TraceEvent::Failed {
                name,
                seconds,
                error,
                ..
            } => format!(
                "Op '{}' failed after {:.3} seconds: {}",
                name, seconds, error
            ),
        }
    }
}

/// Pluggable emitter for trace events.
pub trait TraceSink: Send + Sync {
    fn emit(&self, event: &TraceEvent);
}

/// Default sink: routes events to the `log` facade with ANSI color markers.
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn emit(&self, event: &TraceEvent) {
        match event {
            TraceEvent::Started { .. } => {
                log::info!("{}{}{}", ANSI_YELLOW, event.message(), ANSI_RESET)
            }
            TraceEvent::Completed { .. } => {
                log::info!("{}{}{}", ANSI_GREEN, event.message(), ANSI_RESET)
            }
            TraceEvent::Failed { .. } => {
                log::error!("{}{}{}", ANSI_RED, event.message(), ANSI_RESET)
            }
        }
    }
}

/// Sink that drops every event.
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn emit(&self, _event: &TraceEvent) {}
}

fn now_ms() -> Option<i64> {
    Some(chrono::Utc::now().timestamp_millis())
}

/// Structural op that traces the wrapped op's execution.
pub struct LoggingWrapper<T> {
    inner: AnyOp<T>,
    trigger_name: String,
    sink: Arc<dyn TraceSink>,
}

impl<T: Send + 'static> LoggingWrapper<T> {
    pub fn new(op: AnyOp<T>, trigger_name: impl Into<String>) -> Self {
        Self::with_sink(op, trigger_name, Arc::new(LogTraceSink))
    }

    pub fn with_sink(
        op: AnyOp<T>,
        trigger_name: impl Into<String>,
        sink: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            inner: op,
            trigger_name: trigger_name.into(),
            sink,
        }
    }

    pub fn trigger_name(&self) -> &str {
        &self.trigger_name
    }
}

#[async_trait]
impl<T: Send + 'static> Op for LoggingWrapper<T> {
    type Output = T;

    async fn perform(&self, dry: &DryContext, wet: &WetContext) -> Result<T, OpError> {
        let start = Instant::now();
        self.sink.emit(&TraceEvent::Started {
            name: self.trigger_name.clone(),
            timestamp_ms: now_ms(),
        });

        match self.inner.perform(dry, wet).await {
            Ok(value) => {
                self.sink.emit(&TraceEvent::Completed {
                    name: self.trigger_name.clone(),
                    seconds: start.elapsed().as_secs_f64(),
                    timestamp_ms: now_ms(),
                });
                Ok(value)
            }
            // Control signals are not failures; they belong to the loop.
            Err(signal @ (OpError::LoopContinue | OpError::LoopBreak)) => Err(signal),
            Err(OpError::Aborted(reason)) => {
                self.sink.emit(&TraceEvent::Failed {
                    name: self.trigger_name.clone(),
                    seconds: start.elapsed().as_secs_f64(),
                    error: OpError::Aborted(reason.clone()).to_string(),
                    timestamp_ms: now_ms(),
                });
                // Aborts propagate end-to-end with their reason intact.
                Err(OpError::Aborted(reason))
            }
            Err(err) => {
                let description = err.to_string();
                self.sink.emit(&TraceEvent::Failed {
                    name: self.trigger_name.clone(),
                    seconds: start.elapsed().as_secs_f64(),
                    error: description.clone(),
                    timestamp_ms: now_ms(),
                });
                Err(OpError::wrap_nested(
                    &self.trigger_name,
                    OpError::ExecutionFailed(description),
                ))
            }
        }
    }

    fn metadata(&self) -> OpMetadata {
        self.inner.metadata()
    }

    async fn rollback(&self, dry: &DryContext, wet: &WetContext) -> Result<(), OpError> {
        self.inner.rollback(dry, wet).await
    }
}

/// Captures the caller location as `"{file_stem}::{line}"`.
#[track_caller]
pub(crate) fn caller_name() -> String {
    let location = std::panic::Location::caller();
    let stem = std::path::Path::new(location.file())
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    format!("{}::{}", stem, location.line())
}

/// Wraps an op in a [`LoggingWrapper`] whose trigger name is the caller
/// location (`"{file_stem}::{line}"`).
#[track_caller]
pub fn context_aware_logger<T: Send + 'static>(op: AnyOp<T>) -> LoggingWrapper<T> {
    LoggingWrapper::new(op, caller_name())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::ops::op::FnOp;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<TraceEvent>>,
    }

    impl TraceSink for RecordingSink {
        fn emit(&self, event: &TraceEvent) {
            self.events.lock().expect("lock").push(event.clone());
        }
    }

    fn lit(value: i64) -> AnyOp<i64> {
        AnyOp::new(FnOp::new(OpMetadata::new("lit"), move |_dry, _wet| {
            Box::pin(async move { Ok(value) })
        }))
    }

    fn failing(msg: &str) -> AnyOp<i64> {
        let msg = msg.to_string();
        AnyOp::new(FnOp::new(OpMetadata::new("failing"), move |_dry, _wet| {
            let msg = msg.clone();
            Box::pin(async move { Err(OpError::ExecutionFailed(msg)) })
        }))
    }

    #[tokio::test]
    async fn emits_start_and_completion_events() {
        let sink = Arc::new(RecordingSink::default());
        let wrapper = LoggingWrapper::with_sink(lit(1), "fetch", sink.clone());
        let dry = DryContext::new();
        let wet = WetContext::new();
        assert_eq!(wrapper.perform(&dry, &wet).await.unwrap(), 1);

        let events = sink.events.lock().expect("lock");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message(), "Starting op: fetch");
        let completed = events[1].message();
        assert!(completed.starts_with("Op 'fetch' completed in "), "{completed}");
        assert!(completed.ends_with(" seconds"), "{completed}");
    }

    #[tokio::test]
    async fn failure_is_traced_and_rewrapped_with_trigger_name() {
        let sink = Arc::new(RecordingSink::default());
        let wrapper = LoggingWrapper::with_sink(failing("boom"), "fetch", sink.clone());
        let dry = DryContext::new();
        let wet = WetContext::new();
        let err = wrapper.perform(&dry, &wet).await.unwrap_err();
        assert_eq!(
            err,
            OpError::ExecutionFailed("fetch: Op execution failed: boom".to_string())
        );

        let events = sink.events.lock().expect("lock");
        assert_eq!(events.len(), 2);
        let failed = events[1].message();
        assert!(failed.starts_with("Op 'fetch' failed after "), "{failed}");
        assert!(failed.ends_with("seconds: Op execution failed: boom"), "{failed}");
    }

    #[tokio::test]
    async fn control_signals_pass_through_unchanged() {
        for signal in [OpError::LoopContinue, OpError::LoopBreak] {
            let raised = signal.clone();
            let op: AnyOp<i64> =
                AnyOp::new(FnOp::new(OpMetadata::new("signaling"), move |_dry, _wet| {
                    let raised = raised.clone();
                    Box::pin(async move { Err(raised) })
                }));
            let wrapper = LoggingWrapper::with_sink(op, "site", Arc::new(NoopTraceSink));
            let dry = DryContext::new();
            let wet = WetContext::new();
            assert_eq!(wrapper.perform(&dry, &wet).await.unwrap_err(), signal);
        }
    }

    #[tokio::test]
    async fn abort_passes_through_with_reason_intact() {
        let op: AnyOp<i64> = AnyOp::new(FnOp::new(OpMetadata::new("aborting"), |_dry, _wet| {
            Box::pin(async move { Err(OpError::Aborted("user cancelled".into())) })
        }));
        let wrapper = LoggingWrapper::with_sink(op, "site", Arc::new(NoopTraceSink));
        let dry = DryContext::new();
        let wet = WetContext::new();
        assert_eq!(
            wrapper.perform(&dry, &wet).await.unwrap_err(),
            OpError::Aborted("user cancelled".to_string())
        );
    }

    #[test]
    fn context_aware_logger_captures_file_and_line() {
        let wrapper = context_aware_logger(lit(1));
        let name = wrapper.trigger_name();
        let (file, line) = name.split_once("::").expect("file::line");
        assert_eq!(file, "logging");
        assert!(line.parse::<u32>().is_ok(), "{name}");
    }

    #[test]
    fn ansi_constants_are_exposed() {
        assert_eq!(ANSI_YELLOW, "\x1b[33m");
        assert_eq!(ANSI_GREEN, "\x1b[32m");
        assert_eq!(ANSI_RED, "\x1b[31m");
        assert_eq!(ANSI_RESET, "\x1b[0m");
    }
}
