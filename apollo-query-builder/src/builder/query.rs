use apollo_compiler::ExecutableDocument;
use apollo_compiler::ast;
use serde_json::Map;
use serde_json::Value;

use super::QueryBuilder;
use crate::complexity::ComplexityReport;
use crate::complexity::analyze;
use crate::error::QueryBuilderError;
use crate::error::diagnostic_messages;
use crate::execution::GraphQLRequest;
use crate::response::CurrentQuery;
use crate::response::QueryValidation;
use crate::schema::SchemaHandle;
use crate::schema::parse_type_reference;
use crate::serializer::QueryDocument;
use crate::serializer::build_document;
use crate::structure::SelectionNode;
use crate::structure::SelectionPath;
use crate::structure::SessionState;
use crate::timeout::with_timeout;
use crate::value::validate_value_against_type;

const DOCUMENT_PATH: &str = "query.graphql";

impl QueryBuilder {
    /// The document of a session as GraphQL source text, with its declared variables.
    pub async fn get_current_query(&self, session_id: &str) -> Result<CurrentQuery, QueryBuilderError> {
        let (_, state) = self.load(session_id).await?;
        let document = QueryDocument::from(&state);
        let mut warnings = Vec::new();
        if document.is_empty() {
            warnings.push("Query is empty: select at least one field first".to_string());
        }
        warnings.extend(unused_variables(&state));
        Ok(CurrentQuery {
            query_string: build_document(&document),
            variables_schema: state.variables_schema,
            warnings,
        })
    }

    pub async fn analyze_complexity(
        &self,
        session_id: &str,
    ) -> Result<ComplexityReport, QueryBuilderError> {
        let (_, state) = self.load(session_id).await?;
        Ok(analyze(&state.query_structure, &self.configuration.limits))
    }

    /// Validate the document of a session.
    ///
    /// Checks run in layers and the first layer reporting errors ends validation: structure
    /// (empty document, missing required arguments, complexity), then GraphQL validation
    /// against the schema, then the values given for variables.
    pub async fn validate_query(&self, session_id: &str) -> Result<QueryValidation, QueryBuilderError> {
        let (session_id, state) = self.load(session_id).await?;
        let mut warnings = Vec::new();
        let schema = self.schema_for(&state.headers, &mut warnings).await?;
        let document = QueryDocument::from(&state);
        let query = build_document(&document);
        let complexity = analyze(&state.query_structure, &self.configuration.limits);
        warnings.extend(complexity.warnings.iter().cloned());
        warnings.extend(unused_variables(&state));

        let errors = if document.is_empty() {
            vec!["Query is empty: select at least one field first".to_string()]
        } else {
            let mut errors = complexity.errors.clone();
            if let Some(schema) = &schema {
                errors.extend(missing_required_arguments(schema, &state));
            }
            if errors.is_empty() {
                errors = document_errors(schema.as_ref(), &query);
            }
            if errors.is_empty() {
                errors = variable_errors(&state)?;
            }
            errors
        };

        tracing::debug!(session.id = %session_id, valid = errors.is_empty(), "query validated");
        Ok(QueryValidation {
            valid: errors.is_empty(),
            errors,
            warnings,
            query,
            complexity: Some(complexity),
        })
    }

    /// Send the document of a session to the endpoint with the values set for its variables.
    ///
    /// Runs within the default timeout, or the expensive one when `expensive` is set.
    pub async fn execute_query(
        &self,
        session_id: &str,
        expensive: bool,
    ) -> Result<Value, QueryBuilderError> {
        let (session_id, state) = self.load(session_id).await?;
        if state.query_structure.is_empty() {
            return Err(QueryBuilderError::EmptyQuery);
        }
        let document = QueryDocument::from(&state);
        let executor = self
            .executor
            .as_ref()
            .ok_or(QueryBuilderError::MissingEndpoint("query execution"))?;
        let variables: Map<String, Value> = state
            .variables_values
            .iter()
            .map(|(name, value)| (name.trim_start_matches('$').to_string(), value.clone()))
            .collect();
        let request = GraphQLRequest {
            query: build_document(&document),
            variables,
            operation_name: state.operation_name.clone(),
        };
        let timeouts = &self.configuration.timeouts;
        let timeout = if expensive {
            timeouts.expensive
        } else {
            timeouts.default
        };
        tracing::debug!(session.id = %session_id, expensive, "executing query");
        with_timeout(
            "Query execution",
            timeout,
            executor.execute(request, &state.headers),
        )
        .await
    }
}

fn unused_variables(state: &SessionState) -> Vec<String> {
    let referenced = state.referenced_variables();
    state
        .variables_schema
        .keys()
        .filter(|name| !referenced.contains(name.as_str()))
        .map(|name| format!("Variable '{name}' is declared but never used"))
        .collect()
}

/// Non-null arguments without a default that a selected field does not set.
fn missing_required_arguments(schema: &SchemaHandle, state: &SessionState) -> Vec<String> {
    let mut errors = Vec::new();
    required_arguments_in(
        schema,
        &state.operation_type_name,
        &state.query_structure,
        &SelectionPath::root(),
        "",
        &mut errors,
    );
    for (name, fragment) in &state.fragments {
        let location = format!(" of fragment '{name}'");
        for (key, field) in &fragment.fields {
            check_field(
                schema,
                &fragment.on_type,
                key,
                field,
                &SelectionPath::root(),
                &location,
                &mut errors,
            );
        }
    }
    errors
}

fn required_arguments_in(
    schema: &SchemaHandle,
    type_name: &str,
    node: &SelectionNode,
    path: &SelectionPath,
    location: &str,
    errors: &mut Vec<String>,
) {
    for (key, field) in &node.fields {
        check_field(schema, type_name, key, field, path, location, errors);
    }
    for fragment in &node.inline_fragments {
        for (key, field) in &fragment.selections {
            check_field(schema, &fragment.on_type, key, field, path, location, errors);
        }
    }
}

fn check_field(
    schema: &SchemaHandle,
    type_name: &str,
    key: &str,
    field: &SelectionNode,
    parent: &SelectionPath,
    location: &str,
    errors: &mut Vec<String>,
) {
    // Unknown fields are reported by GraphQL validation.
    let Ok(definition) = schema.schema().type_field(type_name, &field.field_name) else {
        return;
    };
    let path = parent.child(key);
    for argument in &definition.arguments {
        if argument.ty.is_non_null()
            && argument.default_value.is_none()
            && !field.args.contains_key(argument.name.as_str())
        {
            errors.push(format!(
                "Missing required argument '{}' of type '{}' on field '{}' at path '{path}'{location}",
                argument.name, &*argument.ty, field.field_name
            ));
        }
    }
    required_arguments_in(
        schema,
        definition.ty.inner_named_type().as_str(),
        field,
        &path,
        location,
        errors,
    );
}

/// Syntax errors, plus GraphQL validation errors when the schema is known.
fn document_errors(schema: Option<&SchemaHandle>, query: &str) -> Vec<String> {
    match schema {
        Some(schema) => {
            match ExecutableDocument::parse_and_validate(schema.schema(), query, DOCUMENT_PATH) {
                Ok(_) => Vec::new(),
                Err(invalid) => diagnostic_messages(&invalid.errors),
            }
        }
        None => match ast::Document::parse(query, DOCUMENT_PATH) {
            Ok(_) => Vec::new(),
            Err(invalid) => diagnostic_messages(&invalid.errors),
        },
    }
}

fn variable_errors(state: &SessionState) -> Result<Vec<String>, QueryBuilderError> {
    let mut errors = Vec::new();
    for (name, type_ref) in &state.variables_schema {
        let ty = parse_type_reference(type_ref)?;
        match state.variables_values.get(name) {
            Some(value) => {
                if let Err(error) = validate_value_against_type(value, &ty) {
                    errors.push(format!("Variable '{name}': {error}"));
                }
            }
            None if ty.is_non_null() && !state.variables_defaults.contains_key(name) => {
                errors.push(format!(
                    "Variable '{name}' of required type '{ty}' has no value and no default"
                ));
            }
            None => {}
        }
    }
    Ok(errors)
}
