//! Lenient scalar coercion of loosely typed input values.
//!
//! Callers hand us JSON strings, numbers, booleans and nulls. Before anything is stored in an
//! operation those values are converted to the representation implied by the GraphQL type
//! they are bound to, so that `"1"` meant for an `Int` is rendered `1` and not `"1"`.
//!
//! Booleans never coerce from numbers and numbers never coerce from booleans.

use apollo_compiler::ast::Type;
use serde_json::Number;
use serde_json::Value;

// Spec: https://spec.graphql.org/October2021/#sec-Int
const INT_RANGE: std::ops::RangeInclusive<i64> = (i32::MIN as i64)..=(i32::MAX as i64);

/// Built-in scalar a string was coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercedScalar {
    Int,
    Float,
    Boolean,
}

impl CoercedScalar {
    fn name(self) -> &'static str {
        match self {
            CoercedScalar::Int => "Int",
            CoercedScalar::Float => "Float",
            CoercedScalar::Boolean => "Boolean",
        }
    }
}

/// Outcome of [`coerce_string_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct StringCoercion {
    pub coerced: bool,
    pub value: Value,
    pub scalar: Option<CoercedScalar>,
    pub warning: Option<String>,
}

/// Accept a native integer, or a string that round-trips exactly through integer parsing.
pub fn coerce_to_integer(value: &Value) -> Option<i64> {
    let integer = match value {
        Value::Number(number) => match number.as_i64() {
            Some(integer) => integer,
            None => {
                let float = number.as_f64()?;
                if float.fract() != 0.0 || !float.is_finite() {
                    return None;
                }
                float as i64
            }
        },
        Value::String(text) => {
            let integer = text.parse::<i64>().ok()?;
            if integer.to_string() != *text {
                return None;
            }
            integer
        }
        _ => return None,
    };
    INT_RANGE.contains(&integer).then_some(integer)
}

/// Accept a native number, or a string that parses to a finite float.
pub fn coerce_to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|float| float.is_finite()),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|float| float.is_finite())
        }
        _ => None,
    }
}

/// Accept a native boolean, or `"true"`/`"false"` in any case.
pub fn coerce_to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(boolean) => Some(*boolean),
        Value::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Try Int, then Float, then Boolean. Strings that are none of these pass through unchanged.
pub fn coerce_string_value(text: &str) -> StringCoercion {
    let original = Value::String(text.to_string());
    let (value, scalar) = if let Some(integer) = coerce_to_integer(&original) {
        (Value::from(integer), CoercedScalar::Int)
    } else if let Some(number) = coerce_to_float(&original).and_then(Number::from_f64) {
        (Value::Number(number), CoercedScalar::Float)
    } else if let Some(boolean) = coerce_to_boolean(&original) {
        (Value::Bool(boolean), CoercedScalar::Boolean)
    } else {
        return StringCoercion {
            coerced: false,
            value: original,
            scalar: None,
            warning: None,
        };
    };
    let warning = format!(
        "String '{text}' was coerced to {} {value}",
        scalar.name()
    );
    StringCoercion {
        coerced: true,
        value,
        scalar: Some(scalar),
        warning: Some(warning),
    }
}

/// JavaScript-style name of the JSON kind of `value`, used in error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate `value` against a GraphQL type reference.
///
/// Only the built-in scalars are checked here. Lists, enums, input objects and custom scalars
/// pass through: their structure is checked where the schema is at hand.
pub fn validate_value_against_type(value: &Value, ty: &Type) -> Result<(), String> {
    if value.is_null() {
        if ty.is_non_null() {
            return Err(format!(
                "Expected non-nullable type '{ty}' but received null"
            ));
        }
        return Ok(());
    }
    if matches!(ty, Type::List(_) | Type::NonNullList(_)) {
        return Ok(());
    }
    let type_name = ty.inner_named_type().as_str();
    let valid = match type_name {
        "String" => value.is_string(),
        "ID" => value.is_string() || coerce_to_integer(value).is_some(),
        "Int" => coerce_to_integer(value).is_some(),
        "Float" => coerce_to_float(value).is_some(),
        "Boolean" => coerce_to_boolean(value).is_some(),
        _ => return Ok(()),
    };
    if valid {
        Ok(())
    } else {
        Err(format!(
            "Type '{type_name}' cannot represent {} value {value}",
            kind_of(value)
        ))
    }
}
