//! Walking the selection tree and the schema together.
use apollo_compiler::ast::FieldDefinition;

use crate::error::QueryBuilderError;
use crate::schema::SchemaHandle;
use crate::structure::SelectionPath;
use crate::structure::SessionState;

/// The schema type selected at `path`: the operation's root type for the root path, else
/// the named type of the field found there. `None` without a schema.
pub(super) fn selection_type(
    schema: Option<&SchemaHandle>,
    state: &SessionState,
    path: &SelectionPath,
) -> Result<Option<String>, QueryBuilderError> {
    let mut node = &state.query_structure;
    let mut type_name = state.operation_type_name.clone();
    for segment in path.segments() {
        node = node
            .fields
            .get(segment)
            .ok_or_else(|| QueryBuilderError::PathNotFound {
                path: path.to_string(),
                segment: segment.clone(),
            })?;
        if let Some(schema) = schema {
            type_name = schema
                .field(&type_name, &node.field_name)?
                .ty
                .inner_named_type()
                .to_string();
        }
    }
    Ok(schema.map(|_| type_name))
}

/// The schema definition of the field selected at `path`. `None` without a schema.
pub(super) fn field_at<'s>(
    schema: Option<&'s SchemaHandle>,
    state: &SessionState,
    path: &SelectionPath,
) -> Result<Option<&'s FieldDefinition>, QueryBuilderError> {
    let Some(parent) = path.parent() else {
        return Err(QueryBuilderError::InvalidPath {
            path: path.to_string(),
            reason: "a field path is required".to_string(),
        });
    };
    let parent_type = selection_type(schema, state, &parent)?;
    let node = state.query_structure.descendant(path)?;
    match (schema, parent_type) {
        (Some(schema), Some(parent_type)) => Ok(Some(schema.field(&parent_type, &node.field_name)?)),
        _ => Ok(None),
    }
}
