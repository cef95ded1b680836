use indexmap::IndexMap;

use super::QueryBuilder;
use super::cursor::selection_type;
use super::select::describe;
use crate::error::QueryBuilderError;
use crate::response::MutationOutcome;
use crate::structure::FragmentDefinition;
use crate::structure::InlineFragment;
use crate::structure::SelectionNode;
use crate::structure::SelectionPath;
use crate::value::validate_name;

impl QueryBuilder {
    /// Define (or redefine) the named fragment `name` on `on_type` selecting `fields`.
    ///
    /// The type condition must be an object, interface or union type. Fields missing from
    /// `on_type` only produce warnings: GraphQL validation reports them once the fragment is
    /// used.
    pub async fn define_fragment(
        &self,
        session_id: &str,
        name: &str,
        on_type: &str,
        fields: &[&str],
    ) -> Result<MutationOutcome, QueryBuilderError> {
        validate_name("fragment", name)?;
        validate_name("type", on_type)?;
        check_field_names(fields)?;

        let mut edit = self.edit(session_id).await?;
        if let Some(schema) = &edit.schema {
            schema.check_composite_type(on_type)?;
            for field in fields {
                if let Err(error) = schema.field(on_type, field) {
                    edit.warnings.push(error.to_string());
                }
            }
        }
        let definition = FragmentDefinition {
            on_type: on_type.to_string(),
            fields: selections(fields),
        };
        if edit
            .state
            .fragments
            .insert(name.to_string(), definition)
            .is_some()
        {
            edit.warnings
                .push(format!("Fragment '{name}' was already defined and has been replaced"));
        }

        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, fragment = name, on_type, "fragment defined");
        Ok(MutationOutcome::new(format!(
            "Fragment '{name}' defined on type '{on_type}' with {} fields",
            fields.len()
        ))
        .with_detail("fragment", name)
        .with_warnings(warnings))
    }

    /// Spread the named fragment into the selection at `parent_path`. Applying the same
    /// fragment twice changes nothing.
    pub async fn apply_fragment(
        &self,
        session_id: &str,
        parent_path: &str,
        fragment_name: &str,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let parent_path: SelectionPath = parent_path.parse()?;
        validate_name("fragment", fragment_name)?;

        let mut edit = self.edit(session_id).await?;
        if !edit.state.fragments.contains_key(fragment_name) {
            return Err(QueryBuilderError::UndefinedFragment {
                name: fragment_name.to_string(),
            });
        }
        selection_type(edit.schema.as_ref(), &edit.state, &parent_path)?;
        let parent = edit.state.query_structure.descendant_mut(&parent_path)?;
        if !parent.fragment_spreads.iter().any(|spread| spread == fragment_name) {
            parent.fragment_spreads.push(fragment_name.to_string());
        }
        self.check_complexity(&mut edit)?;

        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, path = %parent_path, fragment = fragment_name, "fragment applied");
        Ok(MutationOutcome::new(format!(
            "Fragment '{fragment_name}' applied at {}",
            describe(&parent_path)
        ))
        .with_detail("path", parent_path.to_string())
        .with_warnings(warnings))
    }

    /// Add `... on on_type { fields }` to the selection at `parent_path`. Fields for a type
    /// condition that is already present are merged into it.
    pub async fn apply_inline_fragment(
        &self,
        session_id: &str,
        parent_path: &str,
        on_type: &str,
        fields: &[&str],
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let parent_path: SelectionPath = parent_path.parse()?;
        validate_name("type", on_type)?;
        check_field_names(fields)?;

        let mut edit = self.edit(session_id).await?;
        selection_type(edit.schema.as_ref(), &edit.state, &parent_path)?;
        if let Some(schema) = &edit.schema {
            schema.check_composite_type(on_type)?;
            for field in fields {
                schema.field(on_type, field)?;
            }
        }
        let parent = edit.state.query_structure.descendant_mut(&parent_path)?;
        match parent
            .inline_fragments
            .iter_mut()
            .find(|fragment| fragment.on_type == on_type)
        {
            Some(fragment) => {
                for field in fields {
                    fragment
                        .selections
                        .entry(field.to_string())
                        .or_insert_with(|| SelectionNode::new(*field));
                }
            }
            None => parent.inline_fragments.push(InlineFragment {
                on_type: on_type.to_string(),
                selections: selections(fields),
            }),
        }
        self.check_complexity(&mut edit)?;

        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, path = %parent_path, on_type, "inline fragment applied");
        let listed = fields
            .iter()
            .map(|field| format!("'{field}'"))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(MutationOutcome::new(format!(
            "Inline fragment on '{on_type}' with fields {listed} applied at {}",
            describe(&parent_path)
        ))
        .with_detail("path", parent_path.to_string())
        .with_warnings(warnings))
    }
}

fn check_field_names(fields: &[&str]) -> Result<(), QueryBuilderError> {
    if fields.is_empty() {
        return Err(QueryBuilderError::InvalidValue {
            target: "fragment".to_string(),
            reason: "at least one field is required".to_string(),
        });
    }
    fields
        .iter()
        .try_for_each(|field| validate_name("field", field))
}

fn selections(fields: &[&str]) -> IndexMap<String, SelectionNode> {
    fields
        .iter()
        .map(|field| (field.to_string(), SelectionNode::new(*field)))
        .collect()
}
