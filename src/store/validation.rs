//! Input validation for new feeding records.

use serde_json::Value;
use thiserror::Error;

/// Client input problems. Reported as 400-class errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Invalid JSON body: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    /// Name of the offending field, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::MissingField(field) => Some(field),
            ValidationError::InvalidField { field, .. } => Some(field),
            ValidationError::NotAnObject | ValidationError::MalformedBody(_) => None,
        }
    }
}

/// A validated feeding ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeeding {
    pub bird_type: String,
    pub food_type: String,
    pub quantity: i64,
    pub location: String,
    pub notes: String,
}

fn required_text(body: &serde_json::Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(ValidationError::InvalidField {
            field,
            reason: "expected a string".to_string(),
        }),
    }
}

fn optional_text(body: &serde_json::Map<String, Value>, field: &str) -> String {
    match body.get(field) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn quantity(body: &serde_json::Map<String, Value>) -> Result<i64, ValidationError> {
    const FIELD: &str = "quantity";
    let invalid = |reason: &str| ValidationError::InvalidField {
        field: FIELD,
        reason: reason.to_string(),
    };

    let value = match body.get(FIELD) {
        None | Some(Value::Null) => return Err(ValidationError::MissingField(FIELD)),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| invalid("expected an integer"))?,
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(ValidationError::MissingField(FIELD))
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid("expected an integer"))?,
        Some(_) => return Err(invalid("expected an integer")),
    };

    // Zero counts as absent, matching the record-keeping rules.
    match value {
        0 => Err(ValidationError::MissingField(FIELD)),
        v if v < 0 => Err(invalid("must be positive")),
        v => Ok(v),
    }
}

impl NewFeeding {
    /// Validate a raw request body.
    ///
    /// `bird_type`, `food_type` and `quantity` are required; `quantity`
    /// may be a number or a numeric string.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let body = body.as_object().ok_or(ValidationError::NotAnObject)?;
        Ok(Self {
            bird_type: required_text(body, "bird_type")?,
            food_type: required_text(body, "food_type")?,
            quantity: quantity(body)?,
            location: optional_text(body, "location"),
            notes: optional_text(body, "notes"),
        })
    }
}
