use apollo_compiler::ast::DirectiveLocation;
use serde_json::Value;

use super::QueryBuilder;
use super::arguments::has_default;
use super::arguments::slot_type;
use super::coerce::Coercion;
use super::cursor::field_at;
use crate::configuration::Limits;
use crate::error::QueryBuilderError;
use crate::response::MutationOutcome;
use crate::schema::SchemaHandle;
use crate::structure::ArgumentValue;
use crate::structure::OperationType;
use crate::structure::SelectionPath;
use crate::structure::SessionState;
use crate::structure::directive_entry;
use crate::value::validate_input_complexity;
use crate::value::validate_literal_keys;
use crate::value::validate_name;

impl QueryBuilder {
    /// Attach `@directive` to the field at `field_path`, optionally setting one of its
    /// arguments.
    ///
    /// A directive appears at most once per field: setting another argument of the same
    /// directive adds it to the existing application.
    pub async fn set_field_directive(
        &self,
        session_id: &str,
        field_path: &str,
        directive: &str,
        argument: Option<(&str, Value)>,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        let path: SelectionPath = field_path.parse()?;
        self.check_directive_input(directive, argument.as_ref())?;

        let mut edit = self.edit(session_id).await?;
        let schema = edit.schema.clone();
        field_at(schema.as_ref(), &edit.state, &path)?;
        let (resolved, warnings) = resolve_directive(
            schema.as_ref(),
            &edit.state,
            &self.configuration.limits,
            directive,
            (DirectiveLocation::Field, "fields"),
            argument.as_ref(),
        )?;
        edit.warnings.extend(warnings);

        let call = directive_entry(
            &mut edit.state.query_structure.descendant_mut(&path)?.directives,
            directive,
        );
        if let Some((name, value)) = resolved {
            call.set_argument(&name, value);
        }
        let rendered = call.to_string();

        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, path = %path, directive, "field directive set");
        Ok(MutationOutcome::new(format!(
            "Directive {rendered} set on field at path '{path}'"
        ))
        .with_detail("path", path.to_string())
        .with_detail("directive", rendered)
        .with_warnings(warnings))
    }

    /// Attach `@directive` to the operation itself, optionally setting one of its arguments.
    pub async fn set_operation_directive(
        &self,
        session_id: &str,
        directive: &str,
        argument: Option<(&str, Value)>,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        self.check_directive_input(directive, argument.as_ref())?;

        let mut edit = self.edit(session_id).await?;
        let schema = edit.schema.clone();
        let location = match edit.state.operation_type {
            OperationType::Query => (DirectiveLocation::Query, "query operations"),
            OperationType::Mutation => (DirectiveLocation::Mutation, "mutation operations"),
            OperationType::Subscription => {
                (DirectiveLocation::Subscription, "subscription operations")
            }
        };
        let (resolved, warnings) = resolve_directive(
            schema.as_ref(),
            &edit.state,
            &self.configuration.limits,
            directive,
            location,
            argument.as_ref(),
        )?;
        edit.warnings.extend(warnings);

        let call = directive_entry(&mut edit.state.operation_directives, directive);
        if let Some((name, value)) = resolved {
            call.set_argument(&name, value);
        }
        let rendered = call.to_string();
        let operation_type = edit.state.operation_type;

        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, directive, "operation directive set");
        Ok(
            MutationOutcome::new(format!("Directive {rendered} set on {operation_type} operation"))
                .with_detail("directive", rendered)
                .with_warnings(warnings),
        )
    }

    fn check_directive_input(
        &self,
        directive: &str,
        argument: Option<&(&str, Value)>,
    ) -> Result<(), QueryBuilderError> {
        validate_name("directive", directive)?;
        if let Some((argument, value)) = argument {
            validate_name("argument", argument)?;
            let label = format!("Argument '{argument}' of directive '@{directive}'");
            validate_input_complexity(value, &label, &self.configuration.limits)?;
            validate_literal_keys(value, &label)?;
        }
        Ok(())
    }
}

type ResolvedArgument = (Option<(String, ArgumentValue)>, Vec<String>);

/// Check the directive against the schema and coerce its argument value. Returns the
/// argument to set, if any, and coercion warnings.
fn resolve_directive(
    schema: Option<&SchemaHandle>,
    state: &SessionState,
    limits: &Limits,
    directive: &str,
    (location, location_name): (DirectiveLocation, &'static str),
    argument: Option<&(&str, Value)>,
) -> Result<ResolvedArgument, QueryBuilderError> {
    let definition = match schema {
        Some(schema) => {
            let definition = schema.directive(directive)?;
            if !definition.locations.contains(&location) {
                return Err(QueryBuilderError::InvalidDirectiveLocation {
                    directive: directive.to_string(),
                    location: location_name,
                });
            }
            Some(definition)
        }
        None => None,
    };
    let Some((argument, value)) = argument else {
        return Ok((None, Vec::new()));
    };
    let argument_definition = match (schema, definition) {
        (Some(schema), Some(definition)) => Some(schema.directive_argument(definition, argument)?),
        _ => None,
    };
    let mut coercion = Coercion::new(
        schema,
        state,
        limits,
        format!("argument '{argument}' of directive '@{directive}'"),
    );
    let stored = coercion.value(
        value,
        slot_type(argument_definition),
        has_default(argument_definition),
    )?;
    Ok((Some((argument.to_string(), stored)), coercion.warnings))
}
