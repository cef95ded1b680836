//! Rendering of JSON values as GraphQL literals, and parsing of GraphQL literals back.
use apollo_compiler::ast;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;

use super::names::is_variable_reference;
use crate::error::QueryBuilderError;
use crate::error::format_diagnostics;

/// Render a quoted GraphQL string.
pub fn quote_string(text: &str) -> String {
    ast::Value::String(text.to_string()).to_string()
}

/// Render a JSON value as a GraphQL literal.
///
/// Strings that are well-formed variable references are emitted bare; every other string is
/// quoted and escaped. Object keys are emitted bare, so they must be valid names; see
/// [`super::guard::validate_literal_keys`].
pub fn serialize_graphql_value(value: &Value) -> String {
    let mut output = String::new();
    write_value(&mut output, value);
    output
}

fn write_value(output: &mut String, value: &Value) {
    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(boolean) => output.push_str(if *boolean { "true" } else { "false" }),
        Value::Number(number) => output.push_str(&number.to_string()),
        Value::String(text) if is_variable_reference(text) => output.push_str(text),
        Value::String(text) => output.push_str(&quote_string(text)),
        Value::Array(items) => {
            output.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    output.push_str(", ");
                }
                write_value(output, item);
            }
            output.push(']');
        }
        Value::Object(object) => {
            output.push('{');
            for (index, (key, item)) in object.iter().enumerate() {
                if index > 0 {
                    output.push_str(", ");
                }
                output.push_str(key);
                output.push_str(": ");
                write_value(output, item);
            }
            output.push('}');
        }
    }
}

/// Parse GraphQL literal source text, e.g. `{first: 10, orderBy: NAME}`.
pub fn parse_graphql_literal(source: &str) -> Result<ast::Value, QueryBuilderError> {
    // The parser only exposes whole documents, so wrap the literal in a throwaway field.
    let document = format!("{{ literal(value: {source}) }}");
    let parsed = ast::Document::parse(document, "literal.graphql")
        .map_err(|invalid| QueryBuilderError::InvalidLiteral(format_diagnostics(&invalid.errors)))?;
    let literal = parsed
        .definitions
        .iter()
        .find_map(|definition| match definition {
            ast::Definition::OperationDefinition(operation) => {
                operation.selection_set.first().cloned()
            }
            _ => None,
        })
        .and_then(|selection| match selection {
            ast::Selection::Field(field) if field.arguments.len() == 1 => {
                Some((*field.arguments[0].value).clone())
            }
            _ => None,
        });
    literal.ok_or_else(|| {
        QueryBuilderError::InvalidLiteral(format!("'{source}' is not a single GraphQL value"))
    })
}

/// Convert a parsed literal to JSON. Enum values become strings; variables are rejected.
pub fn literal_to_json(value: &ast::Value) -> Result<Value, QueryBuilderError> {
    Ok(match value {
        ast::Value::Null => Value::Null,
        ast::Value::Boolean(boolean) => Value::Bool(*boolean),
        ast::Value::String(text) => Value::String(text.to_string()),
        ast::Value::Enum(name) => Value::String(name.to_string()),
        ast::Value::Int(int) => parse_number(int.as_str())?,
        ast::Value::Float(float) => parse_number(float.as_str())?,
        ast::Value::Variable(name) => {
            return Err(QueryBuilderError::InvalidLiteral(format!(
                "variable '${name}' is not allowed here"
            )));
        }
        ast::Value::List(items) => Value::Array(
            items
                .iter()
                .map(|item| literal_to_json(item))
                .collect::<Result<_, _>>()?,
        ),
        ast::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, item)| Ok((name.to_string(), literal_to_json(item)?)))
                .collect::<Result<Map<_, _>, QueryBuilderError>>()?,
        ),
    })
}

pub(crate) fn parse_number(text: &str) -> Result<Value, QueryBuilderError> {
    if let Ok(integer) = text.parse::<i64>() {
        return Ok(Value::from(integer));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| QueryBuilderError::InvalidLiteral(format!("'{text}' is not a number")))
}
