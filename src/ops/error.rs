//! Error taxonomy for op execution.
//!
//! One tagged union covers op failures, context lookups, batch/loop outcomes,
//! cooperative aborts, and the two internal loop control signals. Control
//! signals ([`OpError::LoopContinue`], [`OpError::LoopBreak`]) are caught by
//! `LoopOp` and must never surface to callers; every other catcher rethrows
//! them unchanged.

use std::sync::Arc;

/// Failure kinds for op execution, plus internal loop control signals.
#[derive(Clone, Debug, thiserror::Error)]
pub enum OpError {
    /// The op's own logic failed.
    #[error("Op execution failed: {0}")]
    ExecutionFailed(String),
    /// A time-bound op exceeded its deadline (milliseconds).
    #[error("Op timeout after {0}ms")]
    Timeout(u64),
    /// A context lookup or validation failed.
    #[error("Context error: {0}")]
    Context(String),
    /// A batch op failed after rolling back its succeeded children.
    #[error("Batch op failed: {0}")]
    BatchFailed(String),
    /// Execution was cooperatively aborted; carries the abort reason.
    #[error("Op aborted: {0}")]
    Aborted(String),
    /// A trigger-level failure reported by an execution façade.
    #[error("Trigger error: {0}")]
    Trigger(String),
    /// Wrapped foreign error.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
    /// Internal: skip the remainder of the current loop iteration.
    #[error("Loop continue")]
    LoopContinue,
    /// Internal: terminate the enclosing loop, keeping accumulated results.
    #[error("Loop break")]
    LoopBreak,
}

impl OpError {
    /// Wraps a foreign error without losing it.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        OpError::Other(Arc::new(err))
    }

    /// Converts an arbitrary runtime failure into an execution failure.
    pub fn wrap_runtime(err: impl std::fmt::Display) -> Self {
        OpError::ExecutionFailed(format!("Runtime error: {}", err))
    }

    /// Rewrites a nested op's error so its message names the enclosing op.
    ///
    /// Control signals pass through unchanged; they belong to the nearest
    /// enclosing loop, not to the wrapper that observed them.
    pub fn wrap_nested(op_name: &str, err: OpError) -> Self {
        match err {
            OpError::ExecutionFailed(msg) => {
                OpError::ExecutionFailed(format!("{}: {}", op_name, msg))
            }
            OpError::Context(msg) => OpError::Context(format!("{}: {}", op_name, msg)),
            OpError::BatchFailed(msg) => OpError::BatchFailed(format!("{}: {}", op_name, msg)),
            OpError::Aborted(msg) => OpError::Aborted(format!("{}: {}", op_name, msg)),
            OpError::Trigger(msg) => OpError::Trigger(format!("{}: {}", op_name, msg)),
            OpError::Other(err) => OpError::ExecutionFailed(format!("{}: {}", op_name, err)),
            other @ (OpError::Timeout(_) | OpError::LoopContinue | OpError::LoopBreak) => other,
        }
    }

    /// True for the internal loop control signals.
    pub fn is_control_signal(&self) -> bool {
        matches!(self, OpError::LoopContinue | OpError::LoopBreak)
    }
}

impl PartialEq for OpError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OpError::ExecutionFailed(a), OpError::ExecutionFailed(b)) => a == b,
            (OpError::Timeout(a), OpError::Timeout(b)) => a == b,
            (OpError::Context(a), OpError::Context(b)) => a == b,
            (OpError::BatchFailed(a), OpError::BatchFailed(b)) => a == b,
            (OpError::Aborted(a), OpError::Aborted(b)) => a == b,
            (OpError::Trigger(a), OpError::Trigger(b)) => a == b,
            (OpError::Other(a), OpError::Other(b)) => a.to_string() == b.to_string(),
            (OpError::LoopContinue, OpError::LoopContinue) => true,
            (OpError::LoopBreak, OpError::LoopBreak) => true,
            _ => false,
        }
    }
}

impl Eq for OpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings_are_stable() {
        assert_eq!(
            OpError::ExecutionFailed("boom".into()).to_string(),
            "Op execution failed: boom"
        );
        assert_eq!(OpError::Timeout(50).to_string(), "Op timeout after 50ms");
        assert_eq!(
            OpError::Context("missing key".into()).to_string(),
            "Context error: missing key"
        );
        assert_eq!(
            OpError::BatchFailed("Op 2-store failed: x".into()).to_string(),
            "Batch op failed: Op 2-store failed: x"
        );
        assert_eq!(
            OpError::Aborted("user cancelled".into()).to_string(),
            "Op aborted: user cancelled"
        );
        assert_eq!(
            OpError::Trigger("no trigger".into()).to_string(),
            "Trigger error: no trigger"
        );
        assert_eq!(OpError::LoopContinue.to_string(), "Loop continue");
        assert_eq!(OpError::LoopBreak.to_string(), "Loop break");
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(
            OpError::ExecutionFailed("x".into()),
            OpError::ExecutionFailed("x".into())
        );
        assert_ne!(
            OpError::ExecutionFailed("x".into()),
            OpError::Context("x".into())
        );
        assert_eq!(OpError::Timeout(10), OpError::Timeout(10));
        assert_ne!(OpError::Timeout(10), OpError::Timeout(20));
    }

    #[test]
    fn wrap_nested_embeds_op_name() {
        let wrapped = OpError::wrap_nested("outer", OpError::ExecutionFailed("inner".into()));
        assert_eq!(wrapped, OpError::ExecutionFailed("outer: inner".into()));

        let wrapped = OpError::wrap_nested("outer", OpError::Context("no key".into()));
        assert_eq!(wrapped, OpError::Context("outer: no key".into()));
    }

    #[test]
    fn wrap_nested_leaves_control_signals_untouched() {
        assert_eq!(
            OpError::wrap_nested("outer", OpError::LoopContinue),
            OpError::LoopContinue
        );
        assert_eq!(
            OpError::wrap_nested("outer", OpError::LoopBreak),
            OpError::LoopBreak
        );
        assert_eq!(
            OpError::wrap_nested("outer", OpError::Timeout(5)),
            OpError::Timeout(5)
        );
    }

    #[test]
    fn wrap_runtime_formats_description() {
        let err = OpError::wrap_runtime("connection reset");
        assert_eq!(
            err.to_string(),
            "Op execution failed: Runtime error: connection reset"
        );
    }

    #[test]
    fn control_signal_predicate() {
        assert!(OpError::LoopContinue.is_control_signal());
        assert!(OpError::LoopBreak.is_control_signal());
        assert!(!OpError::ExecutionFailed("x".into()).is_control_signal());
    }
}
