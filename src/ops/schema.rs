//! Minimal schema predicate over key/value maps.
//!
//! Deliberately not a general-purpose JSON Schema implementation. Coverage:
//! `required` on objects, `type` in {integer, number, string, boolean}, and
//! `minimum`/`maximum` on integers. Unknown constraints are ignored.

use serde_json::{Map, Value};

/// The `required` field names of a schema, if any.
pub(crate) fn required_fields(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// The `properties` map of a schema, if any.
pub(crate) fn properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        // Types outside the specified coverage are not checked.
        _ => true,
    }
}

/// Validates an instance against a schema, returning one violation string per
/// failed check, in pointer-prefixed form (`/field: ...`).
pub(crate) fn validate(instance: &Value, schema: &Value) -> Vec<String> {
    let mut violations = Vec::new();
    let fields = instance.as_object();

    for required in required_fields(schema) {
        let present = fields.map(|f| f.contains_key(required)).unwrap_or(false);
        if !present {
            violations.push(format!(
                "/{}: '{}' is a required property",
                required, required
            ));
        }
    }

    let Some(props) = properties(schema) else {
        return violations;
    };
    let Some(fields) = fields else {
        return violations;
    };

    for (name, prop_schema) in props {
        let Some(value) = fields.get(name) else { continue };

        if let Some(expected) = prop_schema.get("type").and_then(Value::as_str) {
            if !matches_type(value, expected) {
                violations.push(format!(
                    "/{}: {} is not of type '{}'",
                    name, value, expected
                ));
                continue;
            }
        }

        if let Some(int_value) = value.as_i64() {
            if let Some(minimum) = prop_schema.get("minimum").and_then(Value::as_i64) {
                if int_value < minimum {
                    violations.push(format!(
                        "/{}: {} is less than the minimum of {}",
                        name, int_value, minimum
                    ));
                }
            }
            if let Some(maximum) = prop_schema.get("maximum").and_then(Value::as_i64) {
                if int_value > maximum {
                    violations.push(format!(
                        "/{}: {} is greater than the maximum of {}",
                        name, int_value, maximum
                    ));
                }
            }
        }
    }

    violations
}
