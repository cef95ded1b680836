//! Structural guards applied to caller supplied values before they reach an operation.
use serde_json::Value;

use super::names::is_valid_name;
use crate::configuration::Limits;
use crate::error::QueryBuilderError;

/// Reject values nested deeper than `limits.max_input_depth` or holding more than
/// `limits.max_input_properties` properties and elements in total.
pub fn validate_input_complexity(
    value: &Value,
    label: &str,
    limits: &Limits,
) -> Result<(), QueryBuilderError> {
    let mut properties = 0;
    walk(value, 0, &mut properties, label, limits)
}

fn walk(
    value: &Value,
    depth: usize,
    properties: &mut usize,
    label: &str,
    limits: &Limits,
) -> Result<(), QueryBuilderError> {
    let children: Box<dyn Iterator<Item = &Value>> = match value {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(object) => Box::new(object.values()),
        _ => return Ok(()),
    };
    if depth >= limits.max_input_depth {
        return Err(QueryBuilderError::InputTooComplex(format!(
            "{label} exceeds maximum nesting depth of {}",
            limits.max_input_depth
        )));
    }
    for child in children {
        *properties += 1;
        if *properties > limits.max_input_properties {
            return Err(QueryBuilderError::InputTooComplex(format!(
                "{label} exceeds maximum of {} properties",
                limits.max_input_properties
            )));
        }
        walk(child, depth + 1, properties, label, limits)?;
    }
    Ok(())
}

/// Object keys are rendered bare in GraphQL literals, so every key must be a valid name.
pub fn validate_literal_keys(value: &Value, label: &str) -> Result<(), QueryBuilderError> {
    match value {
        Value::Array(items) => items
            .iter()
            .try_for_each(|item| validate_literal_keys(item, label)),
        Value::Object(object) => object.iter().try_for_each(|(key, item)| {
            if !is_valid_name(key) {
                return Err(QueryBuilderError::InvalidLiteral(format!(
                    "{label} has key '{key}', which is not a valid GraphQL name"
                )));
            }
            validate_literal_keys(item, label)
        }),
        _ => Ok(()),
    }
}

/// Enforce the string length ceiling and reject control characters other than tab, line feed
/// and carriage return.
pub fn validate_string(text: &str, label: &str, limits: &Limits) -> Result<(), QueryBuilderError> {
    let length = text.chars().count();
    if length > limits.max_string_length {
        return Err(QueryBuilderError::StringTooLong {
            label: label.to_string(),
            length,
            max: limits.max_string_length,
        });
    }
    if text
        .chars()
        .any(|c| (c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r')))
    {
        return Err(QueryBuilderError::ControlCharacters {
            label: label.to_string(),
        });
    }
    Ok(())
}
