use super::QueryBuilder;
use super::cursor::selection_type;
use crate::error::QueryBuilderError;
use crate::response::MutationOutcome;
use crate::structure::SelectionNode;
use crate::structure::SelectionPath;
use crate::value::validate_name;

impl QueryBuilder {
    /// Select `field_name` under the already selected field at `parent_path` (empty for the
    /// operation root), keyed by `alias` when given.
    ///
    /// Selecting the same field under the same key again changes nothing.
    pub async fn select_field(
        &self,
        session_id: &str,
        parent_path: &str,
        field_name: &str,
        alias: Option<&str>,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let parent_path: SelectionPath = parent_path.parse()?;
        validate_name("field", field_name)?;
        if let Some(alias) = alias {
            validate_name("alias", alias)?;
        }

        let mut edit = self.edit(session_id).await?;
        if let Some(parent_type) = selection_type(edit.schema.as_ref(), &edit.state, &parent_path)? {
            if let Some(schema) = &edit.schema {
                schema.field(&parent_type, field_name)?;
            }
        }
        let parent = edit.state.query_structure.descendant_mut(&parent_path)?;
        let key = insert_field(parent, &parent_path, field_name, alias)?;
        self.check_complexity(&mut edit)?;

        let field_path = parent_path.child(&key);
        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, path = %field_path, field = field_name, "field selected");
        Ok(MutationOutcome::new(format!(
            "Field '{field_name}' selected successfully at path '{field_path}'"
        ))
        .with_detail("path", field_path.to_string())
        .with_warnings(warnings))
    }

    /// Select several fields under `parent_path` at once. Either every field is selected or,
    /// when any of them is invalid, none is.
    pub async fn select_multiple_fields(
        &self,
        session_id: &str,
        parent_path: &str,
        field_names: &[&str],
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let parent_path: SelectionPath = parent_path.parse()?;
        if field_names.is_empty() {
            return Err(QueryBuilderError::InvalidValue {
                target: "field selection".to_string(),
                reason: "at least one field name is required".to_string(),
            });
        }
        for field_name in field_names {
            validate_name("field", field_name)?;
        }

        let mut edit = self.edit(session_id).await?;
        if let Some(parent_type) = selection_type(edit.schema.as_ref(), &edit.state, &parent_path)? {
            if let Some(schema) = &edit.schema {
                for field_name in field_names {
                    schema.field(&parent_type, field_name)?;
                }
            }
        }
        let parent = edit.state.query_structure.descendant_mut(&parent_path)?;
        for field_name in field_names {
            insert_field(parent, &parent_path, field_name, None)?;
        }
        self.check_complexity(&mut edit)?;

        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, path = %parent_path, count = field_names.len(), "fields selected");
        let listed = field_names
            .iter()
            .map(|name| format!("'{name}'"))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(MutationOutcome::new(format!(
            "Fields {listed} selected successfully at {}",
            describe(&parent_path)
        ))
        .with_detail("path", parent_path.to_string())
        .with_detail("selected", field_names.len())
        .with_warnings(warnings))
    }
}

/// Add a field node under `parent` and return its key.
fn insert_field(
    parent: &mut SelectionNode,
    parent_path: &SelectionPath,
    field_name: &str,
    alias: Option<&str>,
) -> Result<String, QueryBuilderError> {
    let alias = alias.filter(|alias| *alias != field_name);
    let key = alias.unwrap_or(field_name);
    match parent.fields.get(key) {
        Some(existing) if existing.field_name != field_name => {
            Err(QueryBuilderError::AliasConflict {
                key: key.to_string(),
                path: parent_path.to_string(),
                existing: existing.field_name.clone(),
                requested: field_name.to_string(),
            })
        }
        Some(_) => Ok(key.to_string()),
        None => {
            let mut node = SelectionNode::new(field_name);
            node.alias = alias.map(str::to_string);
            parent.fields.insert(key.to_string(), node);
            Ok(key.to_string())
        }
    }
}

/// How messages refer to a parent path.
pub(super) fn describe(path: &SelectionPath) -> String {
    if path.is_root() {
        "the operation root".to_string()
    } else {
        format!("path '{path}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_cannot_hide_another_field() {
        let mut parent = SelectionNode::default();
        let root = SelectionPath::root();
        assert_eq!(insert_field(&mut parent, &root, "name", None).unwrap(), "name");
        assert_eq!(
            insert_field(&mut parent, &root, "id", Some("name"))
                .unwrap_err()
                .to_string(),
            "Alias 'name' at path '' is already used for field 'name'; it cannot also select 'id'"
        );
        assert_eq!(
            insert_field(&mut parent, &root, "name", Some("name")).unwrap(),
            "name"
        );
        assert_eq!(parent.fields["name"].alias, None);
    }

    #[test]
    fn reselecting_keeps_sub_selections() {
        let mut parent = SelectionNode::default();
        let root = SelectionPath::root();
        insert_field(&mut parent, &root, "characters", None).unwrap();
        parent.fields["characters"]
            .fields
            .insert("name".into(), SelectionNode::new("name"));
        insert_field(&mut parent, &root, "characters", None).unwrap();
        assert_eq!(parent.fields.len(), 1);
        assert_eq!(parent.fields["characters"].fields.len(), 1);
    }
}
