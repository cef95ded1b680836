use apollo_query_builder::ErrorKind;
use apollo_query_builder::MutationOutcome;
use apollo_query_builder::OperationType;
use apollo_query_builder::QueryBuilderError;
use apollo_query_builder::ToolResponse;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::support::builder;
use crate::support::query;
use crate::support::squash;
use crate::support::start;

#[tokio::test]
async fn selecting_a_field_twice_changes_nothing() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "characters", None).await.unwrap();
    builder
        .select_field(&id, "characters", "results", None)
        .await
        .unwrap();
    builder
        .select_field(&id, "characters.results", "name", None)
        .await
        .unwrap();
    let before = query(&builder, &id).await;

    let outcome = builder
        .select_field(&id, "characters", "results", None)
        .await
        .unwrap();
    assert_eq!(
        outcome.message,
        "Field 'results' selected successfully at path 'characters.results'"
    );
    assert_eq!(query(&builder, &id).await, before);
}

#[tokio::test]
async fn aliases_cannot_hide_another_field() {
    let builder = builder();
    let id = start(&builder).await;
    builder
        .select_field(&id, "", "character", Some("hero"))
        .await
        .unwrap();
    let error = builder
        .select_field(&id, "", "characters", Some("hero"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert_eq!(
        error.to_string(),
        "Alias 'hero' at path '' is already used for field 'character'; it cannot also select 'characters'"
    );

    builder
        .select_field(&id, "hero", "name", None)
        .await
        .unwrap();
    assert!(squash(&query(&builder, &id).await).contains("hero: character { name }"));
}

#[tokio::test]
async fn unknown_names_come_with_suggestions() {
    let builder = builder();
    let id = start(&builder).await;
    let error = builder
        .select_field(&id, "", "charcters", None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(
        error.to_string(),
        "Field 'charcters' not found on type 'Query'. Did you mean 'characters'?"
    );

    let error = builder
        .select_field(&id, "characters", "results", None)
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Path segment 'characters' not found in query structure (path 'characters')"
    );

    builder.select_field(&id, "", "characters", None).await.unwrap();
    let error = builder
        .set_typed_argument(&id, "characters", "pgae", json!(1))
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Argument 'pgae' not found on field 'characters'. Did you mean 'page'?"
    );
}

#[tokio::test]
async fn selecting_several_fields_is_all_or_nothing() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "character", None).await.unwrap();
    let before = query(&builder, &id).await;

    let error = builder
        .select_multiple_fields(&id, "character", &["id", "nmae", "status"])
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Field 'nmae' not found on type 'Character'. Did you mean 'name'?"
    );
    assert_eq!(query(&builder, &id).await, before);

    let outcome = builder
        .select_multiple_fields(&id, "character", &["id", "name", "status"])
        .await
        .unwrap();
    assert_eq!(
        outcome.message,
        "Fields 'id', 'name', 'status' selected successfully at path 'character'"
    );
    assert_eq!(outcome.details["selected"], 3);
}

#[tokio::test]
async fn directive_arguments_accumulate_on_one_application() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "characters", None).await.unwrap();
    builder
        .set_field_directive(&id, "characters", "cached", Some(("ttl", json!(60))))
        .await
        .unwrap();
    let outcome = builder
        .set_field_directive(&id, "characters", "cached", Some(("scope", json!("PRIVATE"))))
        .await
        .unwrap();
    assert_eq!(
        outcome.message,
        "Directive @cached(ttl: 60, scope: PRIVATE) set on field at path 'characters'"
    );

    let document = query(&builder, &id).await;
    assert_eq!(document.matches("@cached").count(), 1);
    assert!(document.contains("characters @cached(ttl: 60, scope: PRIVATE)"));

    let error = builder
        .set_field_directive(&id, "characters", "deprecated", None)
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Directive '@deprecated' cannot be used on fields"
    );
}

#[tokio::test]
async fn operation_directives_check_their_location() {
    let builder = builder();
    let id = start(&builder).await;
    let error = builder
        .set_operation_directive(&id, "include", Some(("if", json!(true))))
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Directive '@include' cannot be used on query operations"
    );
    let outcome = builder
        .set_operation_directive(&id, "cached", None)
        .await
        .unwrap();
    assert_eq!(outcome.message, "Directive @cached set on query operation");
}

#[tokio::test]
async fn variables_must_fit_the_argument_type() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "characters", None).await.unwrap();
    builder.select_field(&id, "", "character", None).await.unwrap();

    builder
        .declare_query_variable(&id, "$page", "String", None)
        .await
        .unwrap();
    let error = builder
        .set_variable_argument(&id, "characters", "page", "$page")
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TypeMismatch);
    assert_eq!(
        error.to_string(),
        "Variable '$page' of type 'String' cannot be used for argument 'page' of type 'Int'"
    );

    builder
        .declare_query_variable(&id, "$id", "ID", None)
        .await
        .unwrap();
    assert!(matches!(
        builder
            .set_variable_argument(&id, "character", "id", "$id")
            .await,
        Err(QueryBuilderError::VariableTypeMismatch { .. })
    ));

    // A non-null default makes a nullable variable usable where a value is required.
    builder
        .declare_query_variable(&id, "$id", "ID", Some(json!("1000")))
        .await
        .unwrap();
    builder
        .set_variable_argument(&id, "character", "id", "$id")
        .await
        .unwrap();
    assert!(query(&builder, &id).await.starts_with(r#"query($page: String, $id: ID = "1000") {"#));

    let error = builder
        .set_variable_argument(&id, "characters", "first", "$missing")
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "Variable '$missing' is not defined");
}

#[tokio::test]
async fn declaring_variables() {
    let builder = builder();
    let id = start(&builder).await;

    let error = builder
        .declare_query_variable(&id, "page", "Int", None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidSyntax);

    let error = builder
        .declare_query_variable(&id, "$page", "Int!!", None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidSyntax);

    let error = builder
        .declare_query_variable(&id, "$character", "Character", None)
        .await
        .unwrap_err();
    assert!(matches!(error, QueryBuilderError::NotInputType { .. }));

    let error = builder
        .declare_query_variable(&id, "$page", "Int", Some(json!("one")))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TypeMismatch);

    let outcome = builder
        .declare_query_variable(&id, "$filter", "FilterCharacter", Some(json!({"status": "DEAD"})))
        .await
        .unwrap();
    assert_eq!(
        outcome.message,
        "Variable '$filter' declared with type 'FilterCharacter' and default value {status: DEAD}"
    );
}

#[tokio::test]
async fn variable_values_and_removal() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "characters", None).await.unwrap();

    let error = builder
        .set_query_variable_value(&id, "$nope", json!(1))
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "Variable '$nope' is not defined");

    builder
        .declare_query_variable(&id, "$page", "Int", None)
        .await
        .unwrap();
    builder
        .set_variable_argument(&id, "characters", "page", "$page")
        .await
        .unwrap();
    let error = builder
        .set_query_variable_value(&id, "$page", json!("$other"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TypeMismatch);
    let error = builder
        .set_query_variable_value(&id, "$page", json!("two"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TypeMismatch);
    builder
        .set_query_variable_value(&id, "$page", json!("2"))
        .await
        .unwrap();

    let outcome = builder
        .remove_query_variable(&id, "$page")
        .await
        .unwrap();
    assert_eq!(outcome.message, "Variable '$page' removed");
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("Variable '$page' is still referenced"));

    let error = builder
        .remove_query_variable(&id, "$page")
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "Variable '$page' is not defined");
}

#[tokio::test]
async fn enum_arguments() {
    let builder = builder();
    let id = start(&builder).await;
    builder
        .select_field(&id, "", "charactersByStatus", None)
        .await
        .unwrap();

    let error = builder
        .set_string_argument(&id, "charactersByStatus", "status", "ALIVEE", true)
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Value 'ALIVEE' is not a member of enum 'Status'. Did you mean 'ALIVE'?"
    );
    builder
        .set_string_argument(&id, "charactersByStatus", "status", "DEAD", false)
        .await
        .unwrap();
    assert!(query(&builder, &id).await.contains("charactersByStatus(status: DEAD)"));

    builder.select_field(&id, "", "search", None).await.unwrap();
    let error = builder
        .set_string_argument(&id, "search", "query", "rick", true)
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Invalid value for argument 'query': type 'String!' is not an enum"
    );
}

#[tokio::test]
async fn input_object_arguments() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "characters", None).await.unwrap();

    let outcome = builder
        .set_input_object_argument(&id, "characters", "filter", "name", json!("Rick"))
        .await
        .unwrap();
    assert_eq!(
        outcome.message,
        r#"Input field 'name' set to "Rick" on argument 'filter' at path 'characters'"#
    );
    builder
        .set_input_object_argument(&id, "characters", "filter", "status", json!("ALIVE"))
        .await
        .unwrap();
    assert!(query(&builder, &id).await.contains(r#"characters(filter: {name: "Rick", status: ALIVE})"#));

    let error = builder
        .set_input_object_argument(&id, "characters", "filter", "__proto__.polluted", json!(1))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidSyntax);
    let error = builder
        .set_input_object_argument(&id, "characters", "filter", "constructor", json!(1))
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Input field 'constructor' not found on input type 'FilterCharacter'"
    );
    let error = builder
        .set_input_object_argument(&id, "characters", "page", "from", json!(1))
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Argument 'page' has type 'Int', which is not an input object type"
    );

    builder
        .declare_query_variable(&id, "$filter", "FilterCharacter", None)
        .await
        .unwrap();
    builder
        .set_variable_argument(&id, "characters", "filter", "$filter")
        .await
        .unwrap();
    let error = builder
        .set_input_object_argument(&id, "characters", "filter", "name", json!("Morty"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn literal_arguments() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "characters", None).await.unwrap();

    builder
        .set_literal_argument(
            &id,
            "characters",
            "filter",
            json!({"name": "Rick", "range": {"from": "1", "to": 3}}),
        )
        .await
        .unwrap();
    assert!(
        query(&builder, &id)
            .await
            .contains(r#"characters(filter: {name: "Rick", range: {from: 1, to: 3}})"#)
    );

    let error = builder
        .set_literal_argument(&id, "characters", "filter", json!({"nmae": "Rick"}))
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Input field 'nmae' not found on input type 'FilterCharacter'. Did you mean 'name'?"
    );
}

#[tokio::test]
async fn fragments() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "search", None).await.unwrap();

    let error = builder
        .apply_fragment(&id, "search", "RepositoryParts")
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "Fragment 'RepositoryParts' is not defined");

    let error = builder
        .define_fragment(&id, "Names", "String", &["length"])
        .await
        .unwrap_err();
    assert!(matches!(error, QueryBuilderError::NotCompositeType { .. }));

    // Unknown fields only warn when the fragment is defined.
    let outcome = builder
        .define_fragment(&id, "RepositoryParts", "Repository", &["name", "stars"])
        .await
        .unwrap();
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("Field 'stars' not found on type 'Repository'"));

    builder
        .apply_fragment(&id, "search", "RepositoryParts")
        .await
        .unwrap();
    builder
        .apply_fragment(&id, "search", "RepositoryParts")
        .await
        .unwrap();
    let document = query(&builder, &id).await;
    assert_eq!(document.matches("...RepositoryParts").count(), 1);

    // Inline fragments on the same type condition merge.
    builder
        .apply_inline_fragment(&id, "search", "Repository", &["name"])
        .await
        .unwrap();
    builder
        .apply_inline_fragment(&id, "search", "Repository", &["stargazerCount", "name"])
        .await
        .unwrap();
    builder
        .apply_inline_fragment(&id, "search", "Character", &["name"])
        .await
        .unwrap();
    let document = squash(&query(&builder, &id).await);
    assert!(document.contains(
        "search { ...RepositoryParts ... on Repository { name stargazerCount } ... on Character { name } }"
    ));

    let error = builder
        .apply_inline_fragment(&id, "search", "Repository", &["stars"])
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn failed_edits_leave_the_session_untouched() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "characters", None).await.unwrap();
    builder
        .set_typed_argument(&id, "characters", "page", json!(2))
        .await
        .unwrap();
    let before = builder.get_current_query(&id).await.unwrap();

    assert!(builder
        .set_typed_argument(&id, "characters", "page", json!("two"))
        .await
        .is_err());
    assert!(builder
        .set_literal_argument(&id, "characters", "filter", json!({"status": "ZOMBIE"}))
        .await
        .is_err());
    assert!(builder
        .declare_query_variable(&id, "$bad", "Unknown", None)
        .await
        .is_err());

    assert_eq!(builder.get_current_query(&id).await.unwrap(), before);
}

#[tokio::test]
async fn sessions_end() {
    let builder = builder();
    let id = start(&builder).await;
    assert_eq!(id.len(), 32);

    // Identifiers are normalized before lookup.
    builder
        .select_field(&format!(" {} ", id.to_uppercase()), "", "characters", None)
        .await
        .unwrap();

    let outcome = builder.end_session(&id).await.unwrap();
    assert_eq!(outcome.details["deleted"], true);
    let result: ToolResponse<MutationOutcome> = builder
        .select_field(&id, "", "characters", None)
        .await
        .into();
    assert_eq!(
        serde_json::to_value(result).unwrap(),
        json!({"error": format!("Session '{id}' not found or expired")})
    );
}

#[tokio::test]
async fn mutations() {
    let builder = builder();
    let started = builder
        .start_session(IndexMap::new(), OperationType::Mutation, Some("Rename"))
        .await
        .unwrap();
    assert_eq!(started.operation_type_name, "Mutation");
    let id = started.session_id.to_string();

    builder.select_field(&id, "", "rename", None).await.unwrap();
    builder
        .set_string_argument(&id, "rename", "id", "42", false)
        .await
        .unwrap();
    builder
        .set_string_argument(&id, "rename", "name", "true", false)
        .await
        .unwrap();
    builder.select_field(&id, "rename", "name", None).await.unwrap();
    insta::assert_snapshot!(query(&builder, &id).await, @r#"
    mutation Rename {
      rename(id: "42", name: "true") {
        name
      }
    }
    "#);
    assert!(builder.validate_query(&id).await.unwrap().valid);
}
