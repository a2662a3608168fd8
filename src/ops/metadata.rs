//! Op metadata: name, description, and the input / reference / output
//! schemas consumed by the validating wrapper and batch data-flow analysis.
//!
//! Schemas are opaque key/value trees; the kernel interprets only
//! `required: [string]` and `properties: {string -> schema}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Describes an op: a stable name, an optional human description, and
/// optional schemas for its dry-context inputs, wet-context references, and
/// output shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OpMetadata {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
    pub reference_schema: Option<Value>,
    pub output_schema: Option<Value>,
}

impl OpMetadata {
    /// Metadata with a name only.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Fluent builder for the optional fields.
    pub fn builder(name: impl Into<String>) -> OpMetadataBuilder {
        OpMetadataBuilder {
            metadata: OpMetadata::new(name),
        }
    }

    /// Structural sanity check for tooling; never fails construction.
    pub fn validate(&self) -> MetadataValidationReport {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push("op name is empty".to_string());
        }
        for (label, schema) in [
            ("input_schema", &self.input_schema),
            ("reference_schema", &self.reference_schema),
            ("output_schema", &self.output_schema),
        ] {
            let Some(schema) = schema else { continue };
            let Some(obj) = schema.as_object() else {
                issues.push(format!("{} is not a JSON object", label));
                continue;
            };
            if let Some(required) = obj.get("required") {
                match required.as_array() {
                    Some(entries) => {
                        for entry in entries {
                            if !entry.is_string() {
                                issues.push(format!(
                                    "{} has a non-string 'required' entry: {}",
                                    label, entry
                                ));
                            }
                        }
                    }
                    None => issues.push(format!("{} 'required' is not an array", label)),
                }
            }
            if let Some(properties) = obj.get("properties") {
                if !properties.is_object() {
                    issues.push(format!("{} 'properties' is not an object", label));
                }
            }
        }
        MetadataValidationReport { issues }
    }
}

/// Fluent builder returned by [`OpMetadata::builder`].
pub struct OpMetadataBuilder {
    metadata: OpMetadata,
}

impl OpMetadataBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn input_schema(mut self, schema: Value) -> Self {
        self.metadata.input_schema = Some(schema);
        self
    }

    pub fn reference_schema(mut self, schema: Value) -> Self {
        self.metadata.reference_schema = Some(schema);
        self
    }

    pub fn output_schema(mut self, schema: Value) -> Self {
        self.metadata.output_schema = Some(schema);
        self
    }

    pub fn build(self) -> OpMetadata {
        self.metadata
    }
}

/// Result of [`OpMetadata::validate`]: a list of structural issues.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataValidationReport {
    pub issues: Vec<String>,
}

impl MetadataValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}
