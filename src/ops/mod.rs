//! Ops kernel: the operation contract, dual contexts, composite operators,
//! and decorator wrappers.
//!
//! Minimal complete set of interfaces: [`Op`] (unit of async work with typed
//! output and compensating rollback), [`DryContext`]/[`WetContext`] (data vs.
//! live references), [`BatchOp`]/[`LoopOp`] (sequenced composition with LIFO
//! rollback and cooperative control flow), and the logging / time-bound /
//! validating wrappers.

pub mod batch;
pub mod batch_metadata;
pub mod dry_context;
pub mod error;
pub mod helpers;
pub mod logging;
pub mod loop_op;
pub mod metadata;
pub mod op;
pub(crate) mod schema;
pub mod time_bound;
pub mod validating;
pub mod wet_context;

pub use batch::BatchOp;
pub use batch_metadata::BatchMetadataBuilder;
pub use dry_context::{ControlFlags, DryContext};
pub use error::OpError;
pub use helpers::{
    abort, break_loop, check_abort, continue_loop, dry_get, dry_put, dry_require, dry_result,
    perform, wet_put_ref, wet_require_ref,
};
pub use logging::{
    context_aware_logger, LogTraceSink, LoggingWrapper, NoopTraceSink, TraceEvent, TraceSink,
    ANSI_GREEN, ANSI_RED, ANSI_RESET, ANSI_YELLOW,
};
pub use loop_op::{LoopOp, CURRENT_LOOP_ID_KEY};
pub use metadata::{MetadataValidationReport, OpMetadata, OpMetadataBuilder};
pub use op::{AnyOp, FnOp, Op, OpFuture};
pub use time_bound::{time_bound_logged, TimeBoundWrapper};
pub use validating::ValidatingWrapper;
pub use wet_context::WetContext;
