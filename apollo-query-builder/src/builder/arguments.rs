use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::ast::Type;
use apollo_compiler::schema::ExtendedType;
use serde_json::Value;

use super::Edit;
use super::QueryBuilder;
use super::coerce::Coercion;
use super::cursor::field_at;
use crate::error::QueryBuilderError;
use crate::response::MutationOutcome;
use crate::schema::SchemaHandle;
use crate::structure::ArgumentValue;
use crate::structure::SelectionPath;
use crate::structure::SessionState;
use crate::value::is_valid_name;
use crate::value::validate_input_complexity;
use crate::value::validate_literal_keys;
use crate::value::validate_name;
use crate::value::validate_string;
use crate::value::validate_variable_name;

const PAGINATION_ARGUMENTS: [&str; 5] = ["first", "last", "limit", "top", "count"];

impl QueryBuilder {
    /// Set a scalar argument from a loosely typed value.
    ///
    /// The string `"null"` in any case means null, `$name` binds a declared variable, and
    /// anything else is coerced to the argument's schema type, so `"1"` for an `Int` is stored
    /// as the number 1. Pagination arguments are capped at `limits.max_typed_pagination`.
    pub async fn set_typed_argument(
        &self,
        session_id: &str,
        field_path: &str,
        argument: &str,
        value: Value,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let path: SelectionPath = field_path.parse()?;
        validate_name("argument", argument)?;
        let value = match value {
            Value::Array(_) | Value::Object(_) => {
                return Err(QueryBuilderError::InvalidValue {
                    target: format!("argument '{argument}'"),
                    reason: "expected a string, number, boolean or null; use set_literal_argument for lists and input objects".to_string(),
                });
            }
            Value::String(text) if text.eq_ignore_ascii_case("null") => Value::Null,
            value => value,
        };
        let limits = &self.configuration.limits;
        if let Value::String(text) = &value {
            validate_string(text, &format!("Argument '{argument}'"), limits)?;
        }

        let mut edit = self.edit(session_id).await?;
        let schema = edit.schema.clone();
        let definition = argument_definition(schema.as_ref(), &edit.state, &path, argument)?;
        let mut coercion = Coercion::new(
            schema.as_ref(),
            &edit.state,
            limits,
            format!("argument '{argument}'"),
        );
        let stored = coercion.value(&value, slot_type(definition), has_default(definition))?;
        let warnings = coercion.warnings;
        check_pagination(argument, &stored, limits.max_typed_pagination)?;
        edit.warnings.extend(warnings);
        self.apply_argument(edit, &path, argument, stored).await
    }

    /// Set an argument from a string.
    ///
    /// Empty strings are rejected; use null instead. With `is_enum` the value must be a valid
    /// name and renders bare. Otherwise the string keeps its quotes for `String` and `ID`
    /// arguments and is coerced for every other type. Pagination arguments are capped at
    /// `limits.max_pagination`.
    pub async fn set_string_argument(
        &self,
        session_id: &str,
        field_path: &str,
        argument: &str,
        value: &str,
        is_enum: bool,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let path: SelectionPath = field_path.parse()?;
        validate_name("argument", argument)?;
        if value.is_empty() {
            return Err(QueryBuilderError::EmptyString {
                argument: argument.to_string(),
            });
        }
        let limits = &self.configuration.limits;
        validate_string(value, &format!("Argument '{argument}'"), limits)?;
        if is_enum {
            validate_name("enum value", value)?;
        }

        let mut edit = self.edit(session_id).await?;
        let schema = edit.schema.clone();
        let definition = argument_definition(schema.as_ref(), &edit.state, &path, argument)?;
        let target = format!("argument '{argument}'");
        let mut coercion =
            Coercion::new(schema.as_ref(), &edit.state, limits, target.clone()).without_variables();
        let stored = match (schema.as_ref(), definition) {
            (Some(schema), Some(definition)) => {
                let ty: &Type = &definition.ty;
                let type_name = ty.inner_named_type().as_str();
                let is_enum_type = matches!(schema.type_definition(type_name)?, ExtendedType::Enum(_));
                if is_enum && !is_enum_type {
                    return Err(QueryBuilderError::InvalidValue {
                        target,
                        reason: format!("type '{ty}' is not an enum"),
                    });
                }
                if is_enum_type {
                    if !is_valid_name(value) {
                        return Err(QueryBuilderError::InvalidValue {
                            target,
                            reason: format!("'{value}' is not a valid enum value name"),
                        });
                    }
                    schema.check_enum_value(type_name, value)?;
                    ArgumentValue::Enum(value.to_string())
                } else {
                    coercion.value(
                        &Value::String(value.to_string()),
                        Some(ty),
                        definition.default_value.is_some(),
                    )?
                }
            }
            _ if is_enum => ArgumentValue::Enum(value.to_string()),
            _ => coercion.value(&Value::String(value.to_string()), None, false)?,
        };
        let warnings = coercion.warnings;
        check_pagination(argument, &stored, limits.max_pagination)?;
        edit.warnings.extend(warnings);
        self.apply_argument(edit, &path, argument, stored).await
    }

    /// Bind an argument to a declared variable whose type fits the argument's type.
    pub async fn set_variable_argument(
        &self,
        session_id: &str,
        field_path: &str,
        argument: &str,
        variable_name: &str,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let path: SelectionPath = field_path.parse()?;
        validate_name("argument", argument)?;
        validate_variable_name(variable_name)?;

        let edit = self.edit(session_id).await?;
        let schema = edit.schema.clone();
        let definition = argument_definition(schema.as_ref(), &edit.state, &path, argument)?;
        let stored = Coercion::new(
            schema.as_ref(),
            &edit.state,
            &self.configuration.limits,
            format!("argument '{argument}'"),
        )
        .variable(variable_name, slot_type(definition), has_default(definition))?;
        self.apply_argument(edit, &path, argument, stored).await
    }

    /// Set an argument to any JSON value: a list, an input object or a scalar. Strings of the
    /// form `$name` anywhere in the value bind declared variables.
    pub async fn set_literal_argument(
        &self,
        session_id: &str,
        field_path: &str,
        argument: &str,
        value: Value,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let path: SelectionPath = field_path.parse()?;
        validate_name("argument", argument)?;
        let label = format!("Argument '{argument}'");
        let limits = &self.configuration.limits;
        validate_input_complexity(&value, &label, limits)?;
        validate_literal_keys(&value, &label)?;

        let mut edit = self.edit(session_id).await?;
        let schema = edit.schema.clone();
        let definition = argument_definition(schema.as_ref(), &edit.state, &path, argument)?;
        let mut coercion = Coercion::new(
            schema.as_ref(),
            &edit.state,
            limits,
            format!("argument '{argument}'"),
        );
        let stored = coercion.value(&value, slot_type(definition), has_default(definition))?;
        let warnings = coercion.warnings;
        check_pagination(argument, &stored, limits.max_pagination)?;
        edit.warnings.extend(warnings);
        self.apply_argument(edit, &path, argument, stored).await
    }

    /// Store `value` as `argument` of the field at `path` and save.
    pub(super) async fn apply_argument(
        &self,
        mut edit: Edit,
        path: &SelectionPath,
        argument: &str,
        value: ArgumentValue,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let rendered = value.to_string();
        edit.state
            .query_structure
            .descendant_mut(path)?
            .args
            .insert(argument.to_string(), value);
        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, path = %path, argument, "argument set");
        Ok(MutationOutcome::new(format!(
            "Argument '{argument}' set to {rendered} on field at path '{path}'"
        ))
        .with_detail("path", path.to_string())
        .with_detail("value", rendered)
        .with_warnings(warnings))
    }
}

/// The schema definition of `argument` on the field at `path`. `None` without a schema.
pub(super) fn argument_definition<'s>(
    schema: Option<&'s SchemaHandle>,
    state: &SessionState,
    path: &SelectionPath,
    argument: &str,
) -> Result<Option<&'s InputValueDefinition>, QueryBuilderError> {
    match (schema, field_at(schema, state, path)?) {
        (Some(schema), Some(field)) => Ok(Some(schema.field_argument(field, argument)?)),
        _ => Ok(None),
    }
}

pub(super) fn slot_type(definition: Option<&InputValueDefinition>) -> Option<&Type> {
    definition.map(|definition| &*definition.ty)
}

pub(super) fn has_default(definition: Option<&InputValueDefinition>) -> bool {
    definition.is_some_and(|definition| definition.default_value.is_some())
}

fn check_pagination(
    argument: &str,
    value: &ArgumentValue,
    max: u64,
) -> Result<(), QueryBuilderError> {
    if !PAGINATION_ARGUMENTS.contains(&argument) {
        return Ok(());
    }
    match value.as_f64() {
        Some(size) if size > max as f64 => Err(QueryBuilderError::PaginationLimit {
            argument: argument.to_string(),
            value: value.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pagination_ceiling() {
        assert!(check_pagination("first", &ArgumentValue::Typed(json!(500)), 500).is_ok());
        assert_eq!(
            check_pagination("first", &ArgumentValue::Typed(json!(501)), 500)
                .unwrap_err()
                .to_string(),
            "Value 501 for pagination argument 'first' exceeds maximum of 500"
        );
        assert!(check_pagination("page", &ArgumentValue::Typed(json!(501)), 500).is_ok());
        assert!(check_pagination("top", &ArgumentValue::Variable("$top".into()), 100).is_ok());
    }
}
