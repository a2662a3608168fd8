//! # opflow
//!
//! Composable asynchronous operation framework: a small kernel for describing
//! units of work that run against a pair of contexts, compose via batches and
//! loops, and provide transactional semantics through automatic LIFO rollback
//! on failure.
//!
//! ## Overview
//!
//! - **Ops** — the uniform `perform` / `metadata` / `rollback` contract with a
//!   typed output and an optional compensating action
//! - **Contexts** — [`ops::DryContext`] (serializable keyed data plus abort
//!   flags) and [`ops::WetContext`] (live runtime references), shared by every
//!   op in an execution
//! - **Composites** — [`ops::BatchOp`] (sequenced, LIFO rollback on failure)
//!   and [`ops::LoopOp`] (counter-driven, per-iteration rollback, in-band
//!   continue/break signals)
//! - **Decorators** — logging, deadline enforcement, and schema validation as
//!   structural wrappers around any op
//!
//! ## Example
//!
//! ```ignore
//! use opflow::ops::{AnyOp, BatchOp, DryContext, Op, WetContext};
//!
//! # async fn run() -> Result<(), opflow::ops::OpError> {
//! let dry = DryContext::new().with(42, "seed");
//! let wet = WetContext::new();
//! let batch = BatchOp::new(vec![AnyOp::new(FetchOp), AnyOp::new(StoreOp)]);
//! let results = batch.perform(&dry, &wet).await?;
//! # Ok(()) }
//! ```

pub mod ops;

pub use ops::{
    AnyOp, BatchOp, DryContext, LoopOp, Op, OpError, OpMetadata, WetContext,
};
