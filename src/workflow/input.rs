//! Raw input validation
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. Must be a JSON object (`invalid_format`)
//! 2. Every required field present (`missing_field`)
//! 3. `event_type`, `subject_id` and `source` are non-empty strings
//! 4. `event_type` listed in the schema (`unknown_event`)
//!
//! Validation never fails loudly; a rejection is data.

use std::fmt;

use serde_json::{Map, Value};

use crate::config::InputSchema;
use crate::ledger::FactKind;

/// Why an input was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    InvalidFormat,
    MissingField,
    UnknownEvent,
}

impl IgnoreReason {
    pub fn code(&self) -> &'static str {
        match self {
            IgnoreReason::InvalidFormat => "invalid_format",
            IgnoreReason::MissingField => "missing_field",
            IgnoreReason::UnknownEvent => "unknown_event",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A refused input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: IgnoreReason,
    pub detail: String,
    /// Subject, when one could be read from the input.
    pub subject_id: Option<String>,
}

impl Rejection {
    fn new(reason: IgnoreReason, detail: impl Into<String>, subject_id: Option<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
            subject_id,
        }
    }
}

/// An input that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    pub event_type: String,
    pub subject_id: String,
    pub value: Value,
    pub source: String,
}

/// Validate raw text.
pub fn parse_input(raw: &str, schema: &InputSchema) -> Result<ValidatedInput, Rejection> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        Rejection::new(IgnoreReason::InvalidFormat, format!("not JSON: {}", e), None)
    })?;
    validate_input(&value, schema)
}

/// Validate a parsed JSON value.
pub fn validate_input(raw: &Value, schema: &InputSchema) -> Result<ValidatedInput, Rejection> {
    let Some(obj) = raw.as_object() else {
        return Err(Rejection::new(
            IgnoreReason::InvalidFormat,
            "input must be a JSON object",
            None,
        ));
    };

    let subject_hint = obj
        .get("subject_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    for field in &schema.required_fields {
        if !obj.contains_key(field.as_str()) {
            return Err(Rejection::new(
                IgnoreReason::MissingField,
                field.clone(),
                subject_hint,
            ));
        }
    }

    let event_type = string_field(obj, "event_type", &subject_hint)?;
    let subject_id = string_field(obj, "subject_id", &subject_hint)?;
    let source = string_field(obj, "source", &subject_hint)?;

    // Engine fact names are never accepted from outside
    if !schema.allows(&event_type) || FactKind::parse(&event_type).is_some() {
        return Err(Rejection::new(
            IgnoreReason::UnknownEvent,
            event_type,
            subject_hint,
        ));
    }

    Ok(ValidatedInput {
        event_type,
        subject_id,
        value: obj.get("value").cloned().unwrap_or(Value::Null),
        source,
    })
}

fn string_field(
    obj: &Map<String, Value>,
    field: &str,
    subject_hint: &Option<String>,
) -> Result<String, Rejection> {
    match obj.get(field) {
        None => Err(Rejection::new(
            IgnoreReason::MissingField,
            field,
            subject_hint.clone(),
        )),
        Some(Value::String(s)) if s.trim().is_empty() => Err(Rejection::new(
            IgnoreReason::MissingField,
            field,
            subject_hint.clone(),
        )),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(Rejection::new(
            IgnoreReason::InvalidFormat,
            format!("{} must be a string", field),
            subject_hint.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> InputSchema {
        InputSchema::default()
    }

    #[test]
    fn test_valid_input() {
        let raw = json!({
            "event_type": "PAYMENT_FAILED",
            "subject_id": "acct-1",
            "value": {"amount": 12},
            "source": "billing"
        });
        let input = validate_input(&raw, &schema()).unwrap();
        assert_eq!(input.event_type, "PAYMENT_FAILED");
        assert_eq!(input.value, json!({"amount": 12}));
    }

    #[test]
    fn test_not_an_object() {
        let err = validate_input(&json!([1, 2]), &schema()).unwrap_err();
        assert_eq!(err.reason, IgnoreReason::InvalidFormat);
    }

    #[test]
    fn test_not_json() {
        let err = parse_input("{oops", &schema()).unwrap_err();
        assert_eq!(err.reason.code(), "invalid_format");
    }

    #[test]
    fn test_missing_field_keeps_subject() {
        let raw = json!({"event_type": "PAYMENT_FAILED", "subject_id": "acct-1", "value": 1});
        let err = validate_input(&raw, &schema()).unwrap_err();
        assert_eq!(err.reason, IgnoreReason::MissingField);
        assert_eq!(err.detail, "source");
        assert_eq!(err.subject_id.as_deref(), Some("acct-1"));
    }

    #[test]
    fn test_null_value_is_present() {
        let raw = json!({"event_type": "PAYMENT_FAILED", "subject_id": "a", "value": null, "source": "s"});
        assert!(validate_input(&raw, &schema()).is_ok());
    }

    #[test]
    fn test_wrong_type() {
        let raw = json!({"event_type": 7, "subject_id": "a", "value": 1, "source": "s"});
        let err = validate_input(&raw, &schema()).unwrap_err();
        assert_eq!(err.reason, IgnoreReason::InvalidFormat);
    }

    #[test]
    fn test_empty_subject() {
        let raw = json!({"event_type": "PAYMENT_FAILED", "subject_id": " ", "value": 1, "source": "s"});
        let err = validate_input(&raw, &schema()).unwrap_err();
        assert_eq!(err.reason, IgnoreReason::MissingField);
        assert_eq!(err.subject_id, None);
    }

    #[test]
    fn test_unknown_event() {
        let raw = json!({"event_type": "COFFEE_SPILLED", "subject_id": "a", "value": 1, "source": "s"});
        let err = validate_input(&raw, &schema()).unwrap_err();
        assert_eq!(err.reason, IgnoreReason::UnknownEvent);
        assert_eq!(err.detail, "COFFEE_SPILLED");
    }

    #[test]
    fn test_engine_fact_name_is_unknown_event() {
        let mut schema = schema();
        schema.allowed_events.push("DECISION_APPROVED".to_string());
        let raw = json!({
            "event_type": "DECISION_APPROVED",
            "subject_id": "a",
            "value": {"cost": "HIGH"},
            "source": "s"
        });
        let err = validate_input(&raw, &schema).unwrap_err();
        assert_eq!(err.reason, IgnoreReason::UnknownEvent);
        assert_eq!(err.detail, "DECISION_APPROVED");
    }
}
