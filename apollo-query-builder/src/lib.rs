//! Incremental, schema-aware construction of GraphQL operations.
//!
//! A [`QueryBuilder`] keeps one session per operation under construction. Each edit (select a
//! field, set an argument, declare a variable, apply a fragment, ...) is validated against the
//! schema of the configured endpoint before it is saved, and the session renders back to
//! GraphQL source text on demand:
//!
//! ```ignore
//! let builder = QueryBuilder::from_configuration(configuration)?;
//! let session = builder
//!     .start_session(IndexMap::new(), OperationType::Query, None)
//!     .await?;
//! let id = session.session_id.as_str();
//! builder.select_field(id, "", "characters", None).await?;
//! builder
//!     .set_typed_argument(id, "characters", "page", json!(1))
//!     .await?;
//! builder.select_field(id, "characters", "name", None).await?;
//! let query = builder.get_current_query(id).await?;
//! assert_eq!(query.query_string, "query {\n  characters(page: 1) {\n    name\n  }\n}");
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_patterns,
    unused,
    while_true,
    unconditional_panic,
    clippy::all
)]

mod builder;
pub mod complexity;
pub mod configuration;
mod display_helpers;
pub mod error;
pub mod execution;
pub mod response;
pub mod schema;
pub mod serializer;
pub mod session;
pub mod structure;
mod timeout;
mod transport;
pub mod value;

pub use crate::builder::QueryBuilder;
pub use crate::complexity::ComplexityReport;
pub use crate::configuration::Configuration;
pub use crate::configuration::SchemaValidation;
pub use crate::error::ErrorKind;
pub use crate::error::QueryBuilderError;
pub use crate::response::CurrentQuery;
pub use crate::response::MutationOutcome;
pub use crate::response::QueryValidation;
pub use crate::response::SessionStarted;
pub use crate::response::ToolResponse;
pub use crate::schema::SchemaCache;
pub use crate::schema::SchemaHandle;
pub use crate::schema::SchemaSource;
pub use crate::session::SessionId;
pub use crate::session::SessionStore;
pub use crate::structure::OperationType;
