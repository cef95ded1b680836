use apollo_compiler::ast::Type;
use apollo_compiler::schema::ExtendedType;
use indexmap::IndexMap;
use serde_json::Value;

use super::QueryBuilder;
use super::arguments::argument_definition;
use super::coerce::Coercion;
use crate::error::QueryBuilderError;
use crate::response::MutationOutcome;
use crate::schema::SchemaHandle;
use crate::structure::ArgumentValue;
use crate::structure::SelectionPath;
use crate::value::is_valid_name;
use crate::value::validate_input_complexity;
use crate::value::validate_literal_keys;
use crate::value::validate_name;

impl QueryBuilder {
    /// Set one field of an input object argument, e.g. `status` of `filter`, or `range.from`
    /// for nested input objects. Missing intermediate objects are created.
    ///
    /// Every segment of `object_path` must be an input field of the schema type at that point,
    /// so values can only ever land where the schema allows an input field.
    pub async fn set_input_object_argument(
        &self,
        session_id: &str,
        field_path: &str,
        argument: &str,
        object_path: &str,
        value: Value,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let path: SelectionPath = field_path.parse()?;
        validate_name("argument", argument)?;
        let segments = parse_object_path(object_path)?;
        let label = format!("Input field '{object_path}'");
        let limits = &self.configuration.limits;
        validate_input_complexity(&value, &label, limits)?;
        validate_literal_keys(&value, &label)?;

        let mut edit = self.edit(session_id).await?;
        let schema = edit.schema.clone();
        let leaf_type = match (schema.as_ref(), argument_definition(schema.as_ref(), &edit.state, &path, argument)?) {
            (Some(schema), Some(definition)) => {
                Some(resolve_leaf(schema, argument, &definition.ty, &segments)?)
            }
            _ => None,
        };
        let mut coercion = Coercion::new(
            schema.as_ref(),
            &edit.state,
            limits,
            format!("input field '{object_path}' of argument '{argument}'"),
        );
        let leaf = coercion.value(
            &value,
            leaf_type.as_ref().map(|(ty, _)| ty),
            leaf_type.as_ref().is_some_and(|(_, has_default)| *has_default),
        )?;
        let warnings = coercion.warnings;
        edit.warnings.extend(warnings);

        let rendered = leaf.to_string();
        let root = edit
            .state
            .query_structure
            .descendant_mut(&path)?
            .args
            .entry(argument.to_string())
            .or_insert_with(|| ArgumentValue::Object(IndexMap::new()));
        write_object_path(root, argument, &segments, leaf)?;

        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, path = %path, argument, object_path, "input field set");
        Ok(MutationOutcome::new(format!(
            "Input field '{object_path}' set to {rendered} on argument '{argument}' at path '{path}'"
        ))
        .with_detail("path", path.to_string())
        .with_detail("value", rendered)
        .with_warnings(warnings))
    }
}

fn parse_object_path(object_path: &str) -> Result<Vec<&str>, QueryBuilderError> {
    let invalid = |reason: String| QueryBuilderError::InvalidPath {
        path: object_path.to_string(),
        reason,
    };
    if object_path.trim().is_empty() {
        return Err(invalid("an input field path is required".to_string()));
    }
    object_path
        .split('.')
        .map(|segment| {
            if !is_valid_name(segment) {
                Err(invalid(format!("'{segment}' is not a valid GraphQL name")))
            } else if segment.starts_with("__") {
                Err(invalid(format!("'{segment}' is a reserved name")))
            } else {
                Ok(segment)
            }
        })
        .collect()
}

/// Resolve `segments` through nested input object types, starting at the type of `argument`.
/// Returns the leaf field's type and whether it declares a default.
fn resolve_leaf(
    schema: &SchemaHandle,
    argument: &str,
    argument_type: &Type,
    segments: &[&str],
) -> Result<(Type, bool), QueryBuilderError> {
    let mut owner = argument;
    let mut ty = argument_type.clone();
    let mut has_default = false;
    for segment in segments {
        let type_name = ty.inner_named_type().clone();
        if !matches!(
            schema.type_definition(type_name.as_str())?,
            ExtendedType::InputObject(_)
        ) {
            return Err(QueryBuilderError::NotInputObject {
                argument: owner.to_string(),
                type_name: ty.to_string(),
            });
        }
        let definition = schema.input_field(type_name.as_str(), segment)?;
        ty = (*definition.ty).clone();
        has_default = definition.default_value.is_some();
        owner = *segment;
    }
    Ok((ty, has_default))
}

fn write_object_path(
    root: &mut ArgumentValue,
    argument: &str,
    segments: &[&str],
    leaf: ArgumentValue,
) -> Result<(), QueryBuilderError> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };
    let mut current = root;
    for segment in parents {
        current = as_object(current, argument)?
            .entry(segment.to_string())
            .or_insert_with(|| ArgumentValue::Object(IndexMap::new()));
    }
    as_object(current, argument)?.insert(last.to_string(), leaf);
    Ok(())
}

/// The fields of an input object value. Scalars in the way are replaced by an empty object;
/// variable bindings are never silently dropped.
fn as_object<'v>(
    value: &'v mut ArgumentValue,
    argument: &str,
) -> Result<&'v mut IndexMap<String, ArgumentValue>, QueryBuilderError> {
    if let ArgumentValue::Variable(variable) = value {
        return Err(QueryBuilderError::ArgumentBoundToVariable {
            argument: argument.to_string(),
            variable: variable.clone(),
        });
    }
    if !matches!(value, ArgumentValue::Object(_)) {
        *value = ArgumentValue::Object(IndexMap::new());
    }
    match value {
        ArgumentValue::Object(fields) => Ok(fields),
        other => Err(QueryBuilderError::InvalidValue {
            target: format!("argument '{argument}'"),
            reason: format!("{other} is not an input object"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::parse_type_reference;

    const SDL: &str = r#"
        type Query { characters(filter: FilterCharacter!, page: Int): [String] }
        input FilterCharacter { name: String range: Range }
        input Range { from: Int = 0 to: Int }
    "#;

    #[test]
    fn object_paths_are_names() {
        assert_eq!(parse_object_path("range.from").unwrap(), ["range", "from"]);
        assert_eq!(
            parse_object_path("__proto__.polluted").unwrap_err().to_string(),
            "Invalid path '__proto__.polluted': '__proto__' is a reserved name"
        );
        assert!(parse_object_path("a..b").is_err());
        assert!(parse_object_path("").is_err());
    }

    #[test]
    fn resolves_nested_input_fields() {
        let schema = SchemaHandle::parse(SDL).unwrap();
        let filter = parse_type_reference("FilterCharacter!").unwrap();
        let (ty, has_default) = resolve_leaf(&schema, "filter", &filter, &["range", "from"]).unwrap();
        assert_eq!(ty.to_string(), "Int");
        assert!(has_default);
        assert_eq!(
            resolve_leaf(&schema, "filter", &filter, &["name", "first"])
                .unwrap_err()
                .to_string(),
            "Argument 'name' has type 'String', which is not an input object type"
        );
        assert_eq!(
            resolve_leaf(&schema, "filter", &filter, &["constructor"])
                .unwrap_err()
                .to_string(),
            "Input field 'constructor' not found on input type 'FilterCharacter'"
        );
        let page = parse_type_reference("Int").unwrap();
        assert!(matches!(
            resolve_leaf(&schema, "page", &page, &["from"]),
            Err(QueryBuilderError::NotInputObject { .. })
        ));
    }

    #[test]
    fn writes_create_intermediate_objects() {
        let mut root = ArgumentValue::Typed(Value::Null);
        write_object_path(&mut root, "filter", &["range", "from"], ArgumentValue::Typed(json!(1)))
            .unwrap();
        write_object_path(
            &mut root,
            "filter",
            &["name"],
            ArgumentValue::MarkedString("Rick".into()),
        )
        .unwrap();
        assert_eq!(root.to_string(), r#"{range: {from: 1}, name: "Rick"}"#);
    }

    #[test]
    fn variable_bindings_are_conflicts() {
        let mut root = ArgumentValue::Variable("$filter".into());
        assert_eq!(
            write_object_path(&mut root, "filter", &["name"], ArgumentValue::Typed(json!(1)))
                .unwrap_err()
                .to_string(),
            "Argument 'filter' is bound to variable '$filter'; remove the binding before setting input object fields"
        );
    }
}
