//! Serving Input - strict coercion of a flat request into passenger fields
//!
//! Unlike training-time processing, nothing here is imputed: a missing or
//! malformed field is a client error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::error::FeatureError;

/// Typed, validated passenger fields from one prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PassengerInput {
    #[validate(range(min = 1, max = 3))]
    pub pclass: i64,
    pub sex: String,
    #[validate(range(min = 0.0, max = 120.0))]
    pub age: f64,
    #[validate(range(min = 0.0))]
    pub fare: f64,
    pub embarked: String,
    #[validate(range(min = 0, max = 20))]
    pub sib_sp: i64,
    #[validate(range(min = 0, max = 20))]
    pub parch: i64,
    #[validate(length(min = 1))]
    pub name: String,
    pub cabin: Option<String>,
}

impl PassengerInput {
    /// Coerce a flat field map (JSON body or form) into a validated input
    pub fn from_fields(fields: &BTreeMap<String, Value>) -> Result<Self, FeatureError> {
        let input = Self {
            pclass: required_int(fields, "Pclass")?,
            sex: required_text(fields, "Sex")?,
            age: required_number(fields, "Age")?,
            fare: required_number(fields, "Fare")?,
            embarked: required_text(fields, "Embarked")?,
            sib_sp: required_int(fields, "SibSp")?,
            parch: required_int(fields, "Parch")?,
            name: required_text(fields, "Name")?,
            cabin: optional_text(fields, "Cabin")?,
        };

        input
            .validate()
            .map_err(|e| FeatureError::Invalid(e.to_string()))?;

        Ok(input)
    }
}

// ============================================================================
// COERCION HELPERS
// ============================================================================

fn present<'a>(fields: &'a BTreeMap<String, Value>, field: &str) -> Option<&'a Value> {
    fields.get(field).filter(|v| !v.is_null())
}

fn not_coercible(field: &str, value: &Value) -> FeatureError {
    FeatureError::NotCoercible {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn required_number(fields: &BTreeMap<String, Value>, field: &str) -> Result<f64, FeatureError> {
    let value = present(fields, field).ok_or_else(|| FeatureError::MissingField(field.to_string()))?;

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| not_coercible(field, value))?;

    if !number.is_finite() {
        return Err(FeatureError::NonFinite { field: field.to_string() });
    }
    Ok(number)
}

fn required_int(fields: &BTreeMap<String, Value>, field: &str) -> Result<i64, FeatureError> {
    let number = required_number(fields, field)?;
    if number.fract() != 0.0 || number.abs() > i64::MAX as f64 {
        let value = present(fields, field).cloned().unwrap_or(Value::Null);
        return Err(not_coercible(field, &value));
    }
    Ok(number as i64)
}

fn required_text(fields: &BTreeMap<String, Value>, field: &str) -> Result<String, FeatureError> {
    let value = present(fields, field).ok_or_else(|| FeatureError::MissingField(field.to_string()))?;
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        Value::String(_) => Err(FeatureError::MissingField(field.to_string())),
        other => Err(not_coercible(field, other)),
    }
}

fn optional_text(fields: &BTreeMap<String, Value>, field: &str) -> Result<Option<String>, FeatureError> {
    match present(fields, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(not_coercible(field, other)),
    }
}
