use std::sync::Arc;

use apollo_query_builder::Configuration;
use apollo_query_builder::OperationType;
use apollo_query_builder::QueryBuilder;
use apollo_query_builder::schema::SdlSchemaSource;
use indexmap::IndexMap;

pub(crate) const SCHEMA: &str = r#"
    directive @cached(ttl: Int, scope: CacheScope = PUBLIC) on QUERY | FIELD

    enum CacheScope { PUBLIC PRIVATE }

    enum Status { ALIVE DEAD UNKNOWN }

    input FilterCharacter {
        name: String
        status: Status
        range: Range
    }

    input Range {
        from: Int
        to: Int
    }

    type Query {
        characters(page: Int, first: Int, filter: FilterCharacter): Characters
        charactersByStatus(status: Status!): [Character]
        character(id: ID!): Character
        search(query: String!, first: Int): [SearchResult!]!
    }

    type Mutation {
        rename(id: ID!, name: String!): Character
    }

    interface Node {
        id: ID!
    }

    type Characters {
        info: Info
        results: [Character]
    }

    type Info {
        count: Int
        pages: Int
    }

    type Character implements Node {
        id: ID!
        name: String
        status: Status
        friends(first: Int): [Character]
    }

    type Repository {
        name: String!
        stargazerCount: Int!
        owner: Character
    }

    union SearchResult = Repository | Character
"#;

pub(crate) fn builder() -> QueryBuilder {
    builder_with(Configuration::default())
}

pub(crate) fn builder_with(configuration: Configuration) -> QueryBuilder {
    QueryBuilder::new(
        configuration,
        Arc::new(SdlSchemaSource::new("rick-and-morty", SCHEMA)),
    )
}

pub(crate) async fn start(builder: &QueryBuilder) -> String {
    start_named(builder, None).await
}

pub(crate) async fn start_named(builder: &QueryBuilder, operation_name: Option<&str>) -> String {
    builder
        .start_session(IndexMap::new(), OperationType::Query, operation_name)
        .await
        .unwrap()
        .session_id
        .to_string()
}

pub(crate) async fn query(builder: &QueryBuilder, session_id: &str) -> String {
    builder
        .get_current_query(session_id)
        .await
        .unwrap()
        .query_string
}

/// The document with every run of whitespace collapsed to one space.
pub(crate) fn squash(document: &str) -> String {
    document.split_whitespace().collect::<Vec<_>>().join(" ")
}
