//! Data-flow analysis over a batch's op schemas.
//!
//! Walks the ops in execution order tracking which output fields become
//! available, so the synthetic batch metadata only requires inputs that no
//! earlier op produces. Reference schemas are unioned; the output schema is a
//! fixed-length array of the children's outputs.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::ops::metadata::OpMetadata;
use crate::ops::op::AnyOp;
use crate::ops::schema;

/// Builds synthetic [`OpMetadata`] for a batch from its children's metadata.
pub struct BatchMetadataBuilder;

impl BatchMetadataBuilder {
    pub fn build<T: Send + 'static>(ops: &[AnyOp<T>]) -> OpMetadata {
        let metas: Vec<OpMetadata> = ops.iter().map(|op| op.metadata()).collect();
        Self::build_from_metadata(&metas)
    }

    pub fn build_from_metadata(metas: &[OpMetadata]) -> OpMetadata {
        let mut available_outputs: HashSet<String> = HashSet::new();
        let mut externally_required: Vec<String> = Vec::new();
        // First occurrence wins for property definitions.
        let mut input_properties: Map<String, Value> = Map::new();
        let mut reference_properties: Map<String, Value> = Map::new();
        let mut reference_required: Vec<String> = Vec::new();

        for meta in metas {
            if let Some(input) = &meta.input_schema {
                for field in schema::required_fields(input) {
                    if !available_outputs.contains(field)
                        && !externally_required.iter().any(|f| f == field)
                    {
                        externally_required.push(field.to_string());
                    }
                }
                if let Some(props) = schema::properties(input) {
                    for (name, definition) in props {
                        input_properties
                            .entry(name.clone())
                            .or_insert_with(|| definition.clone());
                    }
                }
            }

            if let Some(reference) = &meta.reference_schema {
                if let Some(props) = schema::properties(reference) {
                    for (name, definition) in props {
                        reference_properties
                            .entry(name.clone())
                            .or_insert_with(|| definition.clone());
                    }
                }
                for field in schema::required_fields(reference) {
                    if !reference_required.iter().any(|f| f == field) {
                        reference_required.push(field.to_string());
                    }
                }
            }

            if let Some(output) = &meta.output_schema {
                if let Some(props) = schema::properties(output) {
                    for name in props.keys() {
                        available_outputs.insert(name.clone());
                    }
                } else if output.get("type").and_then(Value::as_str) == Some("string") {
                    // A bare string output surfaces as the "result" field.
                    available_outputs.insert("result".to_string());
                }
            }
        }

        let input_schema = if externally_required.is_empty() {
            None
        } else {
            let filtered: Map<String, Value> = input_properties
                .into_iter()
                .filter(|(name, _)| externally_required.iter().any(|f| f == name))
                .collect();
            Some(json!({
                "type": "object",
                "properties": filtered,
                "required": externally_required,
            }))
        };

        let reference_schema = if reference_properties.is_empty() && reference_required.is_empty()
        {
            None
        } else {
            Some(json!({
                "type": "object",
                "properties": reference_properties,
                "required": reference_required,
            }))
        };

        let ops_count = metas.len();
        OpMetadata {
            name: "BatchOp".to_string(),
            description: Some(format!(
                "Batch of {} operations with data flow analysis",
                ops_count
            )),
            input_schema,
            reference_schema,
            output_schema: Some(json!({
                "type": "array",
                "items": {"type": "object"},
                "minItems": ops_count,
                "maxItems": ops_count,
            })),
        }
    }
}
