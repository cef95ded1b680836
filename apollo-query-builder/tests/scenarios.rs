use apollo_query_builder::QueryBuilderError;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::support::builder;
use crate::support::query;
use crate::support::squash;
use crate::support::start;
use crate::support::start_named;

async fn select_character_names(builder: &apollo_query_builder::QueryBuilder, id: &str) {
    builder.select_field(id, "", "characters", None).await.unwrap();
    builder
        .select_field(id, "characters", "results", None)
        .await
        .unwrap();
    builder
        .select_field(id, "characters.results", "name", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn typed_arguments_render_unquoted() {
    let builder = builder();
    let id = start(&builder).await;
    select_character_names(&builder, &id).await;

    let outcome = builder
        .set_typed_argument(&id, "characters", "page", json!("1"))
        .await
        .unwrap();
    assert_eq!(
        outcome.message,
        "Argument 'page' set to 1 on field at path 'characters'"
    );
    assert_eq!(outcome.warnings, ["String '1' was coerced to Int 1"]);

    let document = query(&builder, &id).await;
    insta::assert_snapshot!(document, @r"
    query {
      characters(page: 1) {
        results {
          name
        }
      }
    }
    ");
    assert!(!document.contains(r#"page: "1""#));
}

#[tokio::test]
async fn boolean_directive_arguments_render_unquoted() {
    let builder = builder();
    let id = start(&builder).await;
    select_character_names(&builder, &id).await;

    builder
        .set_field_directive(&id, "characters", "include", Some(("if", json!(true))))
        .await
        .unwrap();
    let document = query(&builder, &id).await;
    assert!(document.contains("characters @include(if: true) {"));

    builder
        .set_field_directive(&id, "characters.results", "skip", Some(("if", json!("true"))))
        .await
        .unwrap();
    let document = query(&builder, &id).await;
    assert!(document.contains("results @skip(if: true) {"));
    assert!(!document.contains(r#""true""#));
}

#[tokio::test]
async fn directive_variables_must_be_declared() {
    let builder = builder();
    let id = start(&builder).await;
    select_character_names(&builder, &id).await;

    let error = builder
        .set_field_directive(&id, "characters", "include", Some(("if", json!("$myVar"))))
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "Variable '$myVar' is not defined");
    assert!(!query(&builder, &id).await.contains("@include"));

    builder
        .declare_query_variable(&id, "$myVar", "Boolean!", None)
        .await
        .unwrap();
    builder
        .set_field_directive(&id, "characters", "include", Some(("if", json!("$myVar"))))
        .await
        .unwrap();
    let document = query(&builder, &id).await;
    assert!(document.starts_with("query($myVar: Boolean!) {"));
    assert!(document.contains("characters @include(if: $myVar) {"));
}

#[tokio::test]
async fn variable_defaults_render_unquoted() {
    let builder = builder();
    let id = start(&builder).await;
    select_character_names(&builder, &id).await;

    let outcome = builder
        .declare_query_variable(&id, "$page", "Int", Some(json!(1)))
        .await
        .unwrap();
    assert_eq!(
        outcome.message,
        "Variable '$page' declared with type 'Int' and default value 1"
    );
    builder
        .set_variable_argument(&id, "characters", "page", "$page")
        .await
        .unwrap();

    let document = query(&builder, &id).await;
    assert!(document.starts_with("query($page: Int = 1) {"));
    assert!(document.contains("characters(page: $page) {"));
}

#[tokio::test]
async fn null_strings_become_null() {
    let builder = builder();
    let id = start(&builder).await;
    select_character_names(&builder, &id).await;
    builder.select_field(&id, "", "search", None).await.unwrap();
    builder
        .apply_inline_fragment(&id, "search", "Repository", &["name"])
        .await
        .unwrap();

    builder
        .set_typed_argument(&id, "characters", "filter", json!("NULL"))
        .await
        .unwrap();
    builder
        .set_typed_argument(&id, "search", "query", json!("nullable_field"))
        .await
        .unwrap();

    let document = query(&builder, &id).await;
    assert!(document.contains("characters(filter: null) {"));
    assert!(!document.contains(r#""null""#));
    assert!(document.contains(r#"search(query: "nullable_field") {"#));
}

#[tokio::test]
async fn inline_fragments_render_their_type_condition() {
    let builder = builder();
    let id = start(&builder).await;
    builder.select_field(&id, "", "search", None).await.unwrap();
    builder
        .set_string_argument(&id, "search", "query", "rick", false)
        .await
        .unwrap();

    let outcome = builder
        .apply_inline_fragment(&id, "search", "Repository", &["name", "stargazerCount"])
        .await
        .unwrap();
    assert_eq!(
        outcome.message,
        "Inline fragment on 'Repository' with fields 'name', 'stargazerCount' applied at path 'search'"
    );

    let document = query(&builder, &id).await;
    assert!(squash(&document).contains("... on Repository { name stargazerCount }"));
    assert!(!document.contains("undefined"));

    let validation = builder.validate_query(&id).await.unwrap();
    assert!(validation.valid, "{:?}", validation.errors);
}

#[tokio::test]
async fn operations_built_from_every_kind_of_edit_validate() {
    let builder = builder();
    let id = start_named(&builder, Some("CharacterSearch")).await;

    builder
        .declare_query_variable(&id, "$status", "Status", Some(json!("ALIVE")))
        .await
        .unwrap();
    builder
        .declare_query_variable(&id, "$withInfo", "Boolean!", None)
        .await
        .unwrap();
    builder.select_field(&id, "", "characters", None).await.unwrap();
    builder
        .set_input_object_argument(&id, "characters", "filter", "status", json!("$status"))
        .await
        .unwrap();
    builder
        .set_input_object_argument(&id, "characters", "filter", "range.from", json!(1))
        .await
        .unwrap();
    builder
        .select_multiple_fields(&id, "characters", &["info", "results"])
        .await
        .unwrap();
    builder
        .select_multiple_fields(&id, "characters.info", &["count", "pages"])
        .await
        .unwrap();
    builder
        .set_field_directive(&id, "characters.info", "include", Some(("if", json!("$withInfo"))))
        .await
        .unwrap();
    builder
        .select_field(&id, "characters.results", "id", Some("characterId"))
        .await
        .unwrap();
    builder
        .select_field(&id, "characters.results", "name", None)
        .await
        .unwrap();
    builder
        .define_fragment(&id, "CharacterParts", "Character", &["status", "name"])
        .await
        .unwrap();
    builder
        .apply_fragment(&id, "characters.results", "CharacterParts")
        .await
        .unwrap();
    builder
        .set_operation_directive(&id, "cached", Some(("ttl", json!(60))))
        .await
        .unwrap();
    let outcome = builder
        .set_query_variable_value(&id, "$withInfo", json!("true"))
        .await
        .unwrap();
    assert_eq!(outcome.message, "Value for variable '$withInfo' set to true");

    let current = builder.get_current_query(&id).await.unwrap();
    assert!(current.warnings.is_empty(), "{:?}", current.warnings);
    insta::assert_snapshot!(current.query_string, @r"
    query CharacterSearch($status: Status = ALIVE, $withInfo: Boolean!) @cached(ttl: 60) {
      characters(filter: {status: $status, range: {from: 1}}) {
        info @include(if: $withInfo) {
          count
          pages
        }
        results {
          characterId: id
          name
          ...CharacterParts
        }
      }
    }

    fragment CharacterParts on Character {
      status
      name
    }
    ");

    let validation = builder.validate_query(&id).await.unwrap();
    assert_eq!(validation.errors, Vec::<String>::new());
    assert!(validation.valid);
    assert_eq!(validation.query, current.query_string);
    let complexity = validation.complexity.unwrap();
    assert_eq!(complexity.depth, 3);
    assert_eq!(complexity.field_count, 8);
}

#[tokio::test]
async fn validation_reports_one_layer_at_a_time() {
    let builder = builder();
    let id = start(&builder).await;

    let validation = builder.validate_query(&id).await.unwrap();
    assert!(!validation.valid);
    assert_eq!(
        validation.errors,
        ["Query is empty: select at least one field first"]
    );

    // Missing required argument and missing subselection: only the structural layer reports.
    builder.select_field(&id, "", "character", None).await.unwrap();
    let validation = builder.validate_query(&id).await.unwrap();
    assert_eq!(
        validation.errors,
        ["Missing required argument 'id' of type 'ID!' on field 'character' at path 'character'"]
    );

    builder
        .set_typed_argument(&id, "character", "id", json!(1000))
        .await
        .unwrap();
    let validation = builder.validate_query(&id).await.unwrap();
    assert!(!validation.valid);
    assert!(!validation.errors.is_empty());
    assert!(
        validation.errors.iter().all(|error| !error.starts_with("Variable")),
        "{:?}",
        validation.errors
    );

    builder
        .select_field(&id, "character", "name", None)
        .await
        .unwrap();
    builder
        .declare_query_variable(&id, "$first", "Int!", None)
        .await
        .unwrap();
    builder
        .select_field(&id, "character", "friends", None)
        .await
        .unwrap();
    builder
        .set_variable_argument(&id, "character.friends", "first", "$first")
        .await
        .unwrap();
    builder
        .select_field(&id, "character.friends", "name", None)
        .await
        .unwrap();
    let validation = builder.validate_query(&id).await.unwrap();
    assert_eq!(
        validation.errors,
        ["Variable '$first' of required type 'Int!' has no value and no default"]
    );

    builder
        .set_query_variable_value(&id, "$first", json!(5))
        .await
        .unwrap();
    assert!(builder.validate_query(&id).await.unwrap().valid);
}

#[tokio::test]
async fn executing_without_an_endpoint() {
    let builder = builder();
    let id = start(&builder).await;
    assert_eq!(
        builder.execute_query(&id, false).await.unwrap_err(),
        QueryBuilderError::EmptyQuery
    );
    select_character_names(&builder, &id).await;
    assert_eq!(
        builder.execute_query(&id, false).await.unwrap_err().to_string(),
        "No GraphQL endpoint is configured for query execution"
    );
}
