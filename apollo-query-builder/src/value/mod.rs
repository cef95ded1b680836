//! Pure helpers for names, scalar values and GraphQL literals.

mod coercion;
mod guard;
mod literal;
mod names;
mod suggestion;

pub use coercion::CoercedScalar;
pub use coercion::StringCoercion;
pub use coercion::coerce_string_value;
pub use coercion::coerce_to_boolean;
pub use coercion::coerce_to_float;
pub use coercion::coerce_to_integer;
pub(crate) use coercion::kind_of;
pub use coercion::validate_value_against_type;
pub use guard::validate_input_complexity;
pub use guard::validate_literal_keys;
pub use guard::validate_string;
pub use literal::literal_to_json;
pub use literal::parse_graphql_literal;
pub(crate) use literal::parse_number;
pub use literal::quote_string;
pub use literal::serialize_graphql_value;
pub use names::is_valid_name;
pub(crate) use names::is_variable_reference;
pub use names::validate_name;
pub use names::validate_variable_name;
pub use suggestion::find_similar_name;
