//! The op contract and its type-erased handle.
//!
//! An op is a polymorphic unit of async work: `perform` runs it against the
//! dual contexts, `metadata` describes it, and `rollback` is the optional
//! compensating action invoked when a later sibling fails. [`AnyOp`] erases
//! the concrete type behind a shared vtable handle fixed on the output type,
//! so heterogeneous implementations compose inside one batch or loop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::ops::dry_context::DryContext;
use crate::ops::error::OpError;
use crate::ops::metadata::OpMetadata;
use crate::ops::wet_context::WetContext;

/// A unit of asynchronous work with a typed output and an optional
/// compensating action. Implementations must be safely shareable across
/// threads.
#[async_trait]
pub trait Op: Send + Sync {
    type Output;

    /// Runs the op against the contexts.
    async fn perform(&self, dry: &DryContext, wet: &WetContext)
        -> Result<Self::Output, OpError>;

    /// Describes the op for validation, data-flow analysis, and tracing.
    fn metadata(&self) -> OpMetadata;

    /// Compensating action invoked when a sibling fails after this op
    /// succeeded. Defaults to a successful no-op.
    async fn rollback(&self, _dry: &DryContext, _wet: &WetContext) -> Result<(), OpError> {
        Ok(())
    }
}

/// Type-erased, shareable handle to an op with output type `T`.
pub struct AnyOp<T> {
    inner: Arc<dyn Op<Output = T>>,
}

impl<T: Send + 'static> AnyOp<T> {
    /// Erases a concrete op into a shareable handle.
    pub fn new<O>(op: O) -> Self
    where
        O: Op<Output = T> + 'static,
    {
        Self { inner: Arc::new(op) }
    }

    /// Wraps an already-shared op.
    pub fn from_arc(op: Arc<dyn Op<Output = T>>) -> Self {
        Self { inner: op }
    }

    pub async fn perform(&self, dry: &DryContext, wet: &WetContext) -> Result<T, OpError> {
        self.inner.perform(dry, wet).await
    }

    pub fn metadata(&self) -> OpMetadata {
        self.inner.metadata()
    }

    pub async fn rollback(&self, dry: &DryContext, wet: &WetContext) -> Result<(), OpError> {
        self.inner.rollback(dry, wet).await
    }
}

impl<T> Clone for AnyOp<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for AnyOp<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyOp")
            .field("name", &self.inner.metadata().name)
            .finish()
    }
}

#[async_trait]
impl<T: Send + 'static> Op for AnyOp<T> {
    type Output = T;

    async fn perform(&self, dry: &DryContext, wet: &WetContext) -> Result<T, OpError> {
        self.inner.perform(dry, wet).await
    }

    fn metadata(&self) -> OpMetadata {
        self.inner.metadata()
    }

    async fn rollback(&self, dry: &DryContext, wet: &WetContext) -> Result<(), OpError> {
        self.inner.rollback(dry, wet).await
    }
}

/// Boxed future returned by [`FnOp`] closures.
pub type OpFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, OpError>> + Send + 'a>>;

type PerformFn<T> =
    Box<dyn for<'a> Fn(&'a DryContext, &'a WetContext) -> OpFuture<'a, T> + Send + Sync>;

/// Leaf op built from an async closure plus metadata, for callers that do not
/// want a struct per op.
///
/// The closure returns a boxed future so it can borrow the contexts:
///
/// ```ignore
/// let op = FnOp::new(OpMetadata::new("double"), |dry, _wet| {
///     Box::pin(async move {
///         let n: i64 = dry.get_required("n")?;
///         Ok(n * 2)
///     })
/// });
/// ```
pub struct FnOp<T> {
    metadata: OpMetadata,
    perform: PerformFn<T>,
}

impl<T: Send + 'static> FnOp<T> {
    pub fn new<F>(metadata: OpMetadata, perform: F) -> Self
    where
        F: for<'a> Fn(&'a DryContext, &'a WetContext) -> OpFuture<'a, T> + Send + Sync + 'static,
    {
        Self {
            metadata,
            perform: Box::new(perform),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Op for FnOp<T> {
    type Output = T;

    async fn perform(&self, dry: &DryContext, wet: &WetContext) -> Result<T, OpError> {
        (self.perform)(dry, wet).await
    }

    fn metadata(&self) -> OpMetadata {
        self.metadata.clone()
    }
}

/// Best-effort LIFO rollback over previously-succeeded ops. Individual
/// rollback failures are logged and swallowed; only invocation order is
/// guaranteed.
pub(crate) async fn rollback_lifo<T: Send + 'static>(
    succeeded: &[&AnyOp<T>],
    dry: &DryContext,
    wet: &WetContext,
) {
    for op in succeeded.iter().rev() {
        if let Err(err) = op.rollback(dry, wet).await {
            log::warn!(
                "rollback failed for op '{}': {}",
                op.metadata().name,
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DoubleOp;

    #[async_trait]
    impl Op for DoubleOp {
        type Output = i64;

        async fn perform(&self, dry: &DryContext, _wet: &WetContext) -> Result<i64, OpError> {
            let n: i64 = dry.get_required("n")?;
            Ok(n * 2)
        }

        fn metadata(&self) -> OpMetadata {
            OpMetadata::new("double")
        }
    }

    #[tokio::test]
    async fn any_op_delegates_contract() {
        let dry = DryContext::new().with(21i64, "n");
        let wet = WetContext::new();
        let op = AnyOp::new(DoubleOp);
        assert_eq!(op.metadata().name, "double");
        assert_eq!(op.perform(&dry, &wet).await.unwrap(), 42);
        op.rollback(&dry, &wet).await.unwrap();
    }

    #[tokio::test]
    async fn heterogeneous_ops_share_a_container() {
        let dry = DryContext::new().with(21i64, "n");
        let wet = WetContext::new();
        let fn_op = FnOp::new(OpMetadata::new("lit"), |_dry, _wet| {
            Box::pin(async move { Ok(7i64) })
        });
        let ops: Vec<AnyOp<i64>> = vec![AnyOp::new(DoubleOp), AnyOp::new(fn_op)];
        let mut outputs = Vec::new();
        for op in &ops {
            outputs.push(op.perform(&dry, &wet).await.unwrap());
        }
        assert_eq!(outputs, vec![42, 7]);
    }

    #[tokio::test]
    async fn fn_op_reads_contexts() {
        let dry = DryContext::new().with("abc", "token");
        let wet = WetContext::new();
        let op = FnOp::new(OpMetadata::new("token-len"), |dry, _wet| {
            Box::pin(async move {
                let token: String = dry.get_required("token")?;
                Ok(token.len() as i64)
            })
        });
        assert_eq!(op.perform(&dry, &wet).await.unwrap(), 3);
    }
}
