use serde_json::Value;

use super::QueryBuilder;
use super::coerce::Coercion;
use crate::error::QueryBuilderError;
use crate::response::MutationOutcome;
use crate::schema::parse_type_reference;
use crate::value::is_variable_reference;
use crate::value::validate_input_complexity;
use crate::value::validate_literal_keys;
use crate::value::validate_variable_name;

impl QueryBuilder {
    /// Declare `$name` with a GraphQL type such as `Int`, `[ID!]!` or an input object type,
    /// and an optional default value checked against that type. Declaring an existing variable
    /// again replaces its type and default.
    pub async fn declare_query_variable(
        &self,
        session_id: &str,
        name: &str,
        type_ref: &str,
        default: Option<Value>,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        validate_variable_name(name)?;
        let mut ty = parse_type_reference(type_ref)?;
        let label = format!("Default value of variable '{name}'");
        let limits = &self.configuration.limits;
        if let Some(default) = &default {
            validate_input_complexity(default, &label, limits)?;
            validate_literal_keys(default, &label)?;
        }

        let mut edit = self.edit(session_id).await?;
        if let Some(schema) = &edit.schema {
            ty = schema.resolve_input_type(type_ref)?;
        }
        let default = match &default {
            Some(default) => {
                let mut coercion = Coercion::new(
                    edit.schema.as_ref(),
                    &edit.state,
                    limits,
                    format!("default value of variable '{name}'"),
                )
                .without_variables();
                let coerced = coercion.value(default, Some(&ty), false)?;
                let warnings = coercion.warnings;
                edit.warnings.extend(warnings);
                Some(coerced)
            }
            None => None,
        };

        let type_name = ty.to_string();
        let mut message = format!("Variable '{name}' declared with type '{type_name}'");
        edit.state
            .variables_schema
            .insert(name.to_string(), type_name.clone());
        match default {
            Some(default) => {
                message.push_str(&format!(" and default value {default}"));
                edit.state.variables_defaults.insert(name.to_string(), default);
            }
            None => {
                edit.state.variables_defaults.shift_remove(name);
            }
        }

        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, variable = name, variable_type = %type_name, "variable declared");
        Ok(MutationOutcome::new(message)
            .with_detail("variable", name)
            .with_detail("type", type_name)
            .with_warnings(warnings))
    }

    /// Set the value sent for the declared variable `$name` when the operation is executed.
    pub async fn set_query_variable_value(
        &self,
        session_id: &str,
        name: &str,
        value: Value,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        validate_variable_name(name)?;
        let label = format!("Value of variable '{name}'");
        let limits = &self.configuration.limits;
        validate_input_complexity(&value, &label, limits)?;
        validate_literal_keys(&value, &label)?;
        let target = format!("variable '{name}'");
        if let Value::String(text) = &value {
            if is_variable_reference(text) {
                return Err(QueryBuilderError::InvalidValue {
                    target,
                    reason: format!("variable values cannot reference other variables ('{text}')"),
                });
            }
        }

        let mut edit = self.edit(session_id).await?;
        let declared = edit
            .state
            .variables_schema
            .get(name)
            .ok_or_else(|| QueryBuilderError::UndefinedVariable {
                name: name.to_string(),
            })?;
        let ty = parse_type_reference(declared)?;
        let mut coercion = Coercion::new(edit.schema.as_ref(), &edit.state, limits, target.clone())
            .without_variables();
        let coerced = coercion.value(&value, Some(&ty), false)?;
        let warnings = coercion.warnings;
        let json = coerced
            .to_json()
            .ok_or_else(|| QueryBuilderError::InvalidValue {
                target,
                reason: "variable values cannot reference other variables".to_string(),
            })?;
        edit.warnings.extend(warnings);
        edit.state
            .variables_values
            .insert(name.to_string(), json.clone());

        let session_id = edit.session_id.clone();
        let warnings = self.commit(edit).await?;
        tracing::debug!(session.id = %session_id, variable = name, "variable value set");
        Ok(
            MutationOutcome::new(format!("Value for variable '{name}' set to {json}"))
                .with_detail("variable", name)
                .with_detail("value", json)
                .with_warnings(warnings),
        )
    }

    /// Remove the declaration, default and value of `$name`.
    pub async fn remove_query_variable(
        &self,
        session_id: &str,
        name: &str,
    ) -> Result<MutationOutcome, QueryBuilderError> {
        validate_variable_name(name)?;

        // Removal never needs the schema.
        let (session_id, mut state) = self.load(session_id).await?;
        if state.variables_schema.shift_remove(name).is_none() {
            return Err(QueryBuilderError::UndefinedVariable {
                name: name.to_string(),
            });
        }
        state.variables_defaults.shift_remove(name);
        state.variables_values.shift_remove(name);
        let mut warnings = Vec::new();
        if state.referenced_variables().contains(name) {
            warnings.push(format!(
                "Variable '{name}' is still referenced in the query; the query will not validate until those references are removed"
            ));
        }

        self.save(&session_id, &state).await?;
        tracing::debug!(session.id = %session_id, variable = name, "variable removed");
        Ok(MutationOutcome::new(format!("Variable '{name}' removed"))
            .with_detail("variable", name)
            .with_warnings(warnings))
    }
}
