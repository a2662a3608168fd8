//! Schema checks around op execution.
//!
//! Input validation runs against a snapshot of the dry context; reference
//! validation checks that every required wet-context key is present (always
//! on when the op declares a reference schema); output validation serializes
//! the result (scalars wrapped as `{"value": v}`) and checks it against the
//! output schema.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::ops::dry_context::DryContext;
use crate::ops::error::OpError;
use crate::ops::metadata::OpMetadata;
use crate::ops::op::{AnyOp, Op};
use crate::ops::schema;
use crate::ops::wet_context::WetContext;

/// Structural op validating the wrapped op's inputs, references, and output
/// against its declared schemas.
pub struct ValidatingWrapper<T> {
    inner: AnyOp<T>,
    validate_input: bool,
    validate_output: bool,
}

impl<T: Serialize + Send + 'static> ValidatingWrapper<T> {
    pub fn new(op: AnyOp<T>) -> Self {
        Self {
            inner: op,
            validate_input: true,
            validate_output: true,
        }
    }

    pub fn with_input_validation(mut self, enabled: bool) -> Self {
        self.validate_input = enabled;
        self
    }

    pub fn with_output_validation(mut self, enabled: bool) -> Self {
        self.validate_output = enabled;
        self
    }
}

#[async_trait]
impl<T: Serialize + Send + 'static> Op for ValidatingWrapper<T> {
    type Output = T;

    async fn perform(&self, dry: &DryContext, wet: &WetContext) -> Result<T, OpError> {
        let metadata = self.inner.metadata();

        if self.validate_input {
            if let Some(input_schema) = &metadata.input_schema {
                let instance = Value::Object(dry.values());
                let violations = schema::validate(&instance, input_schema);
                if !violations.is_empty() {
                    return Err(OpError::Context(format!(
                        "Input validation failed for {}: {}",
                        metadata.name,
                        violations.join(", ")
                    )));
                }
            }
        }

        if let Some(reference_schema) = &metadata.reference_schema {
            for key in schema::required_fields(reference_schema) {
                if !wet.contains(key) {
                    return Err(OpError::Context(format!(
                        "Required reference '{}' not found in WetContext for op '{}'",
                        key, metadata.name
                    )));
                }
            }
        }

        let output = self.inner.perform(dry, wet).await?;

        if self.validate_output {
            if let Some(output_schema) = &metadata.output_schema {
                let serialized = serde_json::to_value(&output).map_err(|_| {
                    OpError::Context("Failed to serialize output for validation".to_string())
                })?;
                let instance = if serialized.is_object() {
                    serialized
                } else {
                    json!({"value": serialized})
                };
                let violations = schema::validate(&instance, output_schema);
                if !violations.is_empty() {
                    return Err(OpError::Context(format!(
                        "Output validation failed for {}: {}",
                        metadata.name,
                        violations.join(", ")
                    )));
                }
            }
        }

        Ok(output)
    }

    fn metadata(&self) -> OpMetadata {
        self.inner.metadata()
    }

    async fn rollback(&self, dry: &DryContext, wet: &WetContext) -> Result<(), OpError> {
        self.inner.rollback(dry, wet).await
    }
}
