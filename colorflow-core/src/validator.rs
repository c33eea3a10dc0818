//! C2 — Token Validator. Grounded in `specs/validators.TokenValidator` from
//! the original prototype: required-field presence is checked before
//! type/constraint, an absent optional field is skipped outright, and extra
//! content fields are silently ignored.

use crate::catalogue::SpecCatalogue;
use crate::error::ValidationError;
use crate::types::FieldType;
use std::collections::HashMap;

/// Validates a content map against a named spec in the catalogue.
pub struct TokenValidator<'a> {
    catalogue: &'a SpecCatalogue,
}

impl<'a> TokenValidator<'a> {
    pub fn new(catalogue: &'a SpecCatalogue) -> Self {
        Self { catalogue }
    }

    /// `validate(content, spec_id) → ok | fails` (spec §4.2).
    pub fn validate(
        &self,
        content: &HashMap<String, serde_json::Value>,
        spec_id: &str,
    ) -> Result<(), ValidationError> {
        let spec = self
            .catalogue
            .get(spec_id)
            .ok_or_else(|| ValidationError::UnknownSpec(spec_id.to_string()))?;

        for (field_name, rule) in &spec.fields {
            let Some(value) = content.get(field_name) else {
                if rule.required {
                    tracing::error!(spec_id, field = field_name.as_str(), "missing required field");
                    return Err(ValidationError::MissingField {
                        spec_id: spec_id.to_string(),
                        field: field_name.clone(),
                    });
                }
                continue;
            };

            check_constraint(field_name, value, rule.type_, rule.min_value, rule.max_value, rule.max_length)?;
        }

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn check_constraint(
    field: &str,
    value: &serde_json::Value,
    type_: FieldType,
    min_value: Option<f64>,
    max_value: Option<f64>,
    max_length: Option<usize>,
) -> Result<(), ValidationError> {
    let fail = |message: String| -> ValidationError {
        tracing::error!(field, %message, "constraint violation");
        ValidationError::ConstraintViolation {
            field: field.to_string(),
            message,
        }
    };

    match type_ {
        FieldType::String => {
            let Some(s) = value.as_str() else {
                return Err(fail(format!("must be a string, got {value}")));
            };
            if let Some(max_len) = max_length {
                if s.len() > max_len {
                    return Err(fail(format!("length {} > max_length {max_len}", s.len())));
                }
            }
        }
        FieldType::Float | FieldType::Int => {
            let Some(n) = value.as_f64() else {
                return Err(fail(format!("must be numeric, got {value}")));
            };
            if type_ == FieldType::Int && value.as_i64().is_none() && value.as_u64().is_none() {
                return Err(fail(format!("must be an integer, got {value}")));
            }
            if let Some(min) = min_value {
                if n < min {
                    return Err(fail(format!("value {n} < min {min}")));
                }
            }
            if let Some(max) = max_value {
                if n > max {
                    return Err(fail(format!("value {n} > max {max}")));
                }
            }
        }
        FieldType::Bool => {
            if !value.is_boolean() {
                return Err(fail(format!("must be a bool, got {value}")));
            }
        }
        FieldType::Json => {
            // Any JSON-representable value is acceptable.
        }
    }
    Ok(())
}
