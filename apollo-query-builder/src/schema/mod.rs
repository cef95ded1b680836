//! Schema lookups used while validating edits.
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast::DirectiveDefinition;
use apollo_compiler::ast::FieldDefinition;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::ast::Type;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldLookupError;
use apollo_compiler::validation::Valid;

use crate::error::QueryBuilderError;
use crate::error::format_diagnostics;
use crate::structure::OperationType;
use crate::value::find_similar_name;
use crate::value::is_valid_name;

mod cache;
pub(crate) mod introspection;
mod source;

pub use cache::SchemaCache;
pub use source::IntrospectionSchemaSource;
pub use source::SchemaSource;
pub use source::SdlSchemaSource;

/// A validated schema, cheap to clone and share between sessions.
#[derive(Debug, Clone)]
pub struct SchemaHandle {
    schema: Arc<Valid<Schema>>,
}

impl From<Valid<Schema>> for SchemaHandle {
    fn from(schema: Valid<Schema>) -> Self {
        Self {
            schema: Arc::new(schema),
        }
    }
}

impl SchemaHandle {
    /// Parse and validate SDL.
    pub fn parse(sdl: &str) -> Result<Self, QueryBuilderError> {
        Schema::parse_and_validate(sdl, "schema.graphql")
            .map(Self::from)
            .map_err(|invalid| QueryBuilderError::InvalidSchema(format_diagnostics(&invalid.errors)))
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    pub fn root_type_name(&self, operation_type: OperationType) -> Result<&str, QueryBuilderError> {
        self.schema
            .root_operation(operation_type.into())
            .map(Name::as_str)
            .ok_or_else(|| QueryBuilderError::MissingRootType {
                operation_type: operation_type.to_string(),
            })
    }

    pub fn type_definition(&self, type_name: &str) -> Result<&ExtendedType, QueryBuilderError> {
        self.schema
            .types
            .get(type_name)
            .ok_or_else(|| QueryBuilderError::UnknownType {
                type_name: type_name.to_string(),
                suggestion: find_similar_name(
                    type_name,
                    self.schema
                        .types
                        .keys()
                        .map(Name::as_str)
                        .filter(|name| !name.starts_with("__")),
                )
                .into(),
            })
    }

    /// The definition of `field_name` on an object or interface type, meta-fields included.
    pub fn field(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Result<&FieldDefinition, QueryBuilderError> {
        match self.schema.type_field(type_name, field_name) {
            Ok(field) => Ok(field),
            Err(FieldLookupError::NoSuchType) => Err(QueryBuilderError::UnknownType {
                type_name: type_name.to_string(),
                suggestion: Default::default(),
            }),
            Err(_) => Err(QueryBuilderError::UnknownField {
                field: field_name.to_string(),
                type_name: type_name.to_string(),
                suggestion: find_similar_name(field_name, self.field_names(type_name)).into(),
            }),
        }
    }

    fn field_names(&self, type_name: &str) -> Vec<&str> {
        match self.schema.types.get(type_name) {
            Some(ExtendedType::Object(object)) => object.fields.keys().map(Name::as_str).collect(),
            Some(ExtendedType::Interface(interface)) => {
                interface.fields.keys().map(Name::as_str).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn field_argument<'s>(
        &self,
        field: &'s FieldDefinition,
        argument: &str,
    ) -> Result<&'s InputValueDefinition, QueryBuilderError> {
        find_argument(&field.arguments, argument).ok_or_else(|| {
            QueryBuilderError::UnknownArgument {
                argument: argument.to_string(),
                field: field.name.to_string(),
                suggestion: find_similar_name(
                    argument,
                    field.arguments.iter().map(|argument| argument.name.as_str()),
                )
                .into(),
            }
        })
    }

    pub fn directive(&self, name: &str) -> Result<&DirectiveDefinition, QueryBuilderError> {
        match self.schema.directive_definitions.get(name) {
            Some(definition) => Ok(definition),
            None => Err(QueryBuilderError::UnknownDirective {
                directive: name.to_string(),
                suggestion: find_similar_name(
                    name,
                    self.schema.directive_definitions.keys().map(Name::as_str),
                )
                .into(),
            }),
        }
    }

    pub fn directive_argument<'s>(
        &self,
        directive: &'s DirectiveDefinition,
        argument: &str,
    ) -> Result<&'s InputValueDefinition, QueryBuilderError> {
        find_argument(&directive.arguments, argument).ok_or_else(|| {
            QueryBuilderError::UnknownDirectiveArgument {
                argument: argument.to_string(),
                directive: directive.name.to_string(),
                suggestion: find_similar_name(
                    argument,
                    directive.arguments.iter().map(|argument| argument.name.as_str()),
                )
                .into(),
            }
        })
    }

    /// The definition of `field` on the input object type `type_name`.
    pub fn input_field(
        &self,
        type_name: &str,
        field: &str,
    ) -> Result<&InputValueDefinition, QueryBuilderError> {
        let Some(ExtendedType::InputObject(input_object)) = self.schema.types.get(type_name) else {
            return Err(QueryBuilderError::NotInputObject {
                argument: field.to_string(),
                type_name: type_name.to_string(),
            });
        };
        match input_object.fields.get(field) {
            Some(definition) => Ok(definition),
            None => Err(QueryBuilderError::UnknownInputField {
                field: field.to_string(),
                type_name: type_name.to_string(),
                suggestion: find_similar_name(field, input_object.fields.keys().map(Name::as_str))
                    .into(),
            }),
        }
    }

    /// Check that `value` is a member of the enum type `type_name`.
    pub fn check_enum_value(&self, type_name: &str, value: &str) -> Result<(), QueryBuilderError> {
        let Some(ExtendedType::Enum(enum_type)) = self.schema.types.get(type_name) else {
            return Ok(());
        };
        if enum_type.values.contains_key(value) {
            return Ok(());
        }
        Err(QueryBuilderError::UnknownEnumValue {
            value: value.to_string(),
            type_name: type_name.to_string(),
            suggestion: find_similar_name(value, enum_type.values.keys().map(Name::as_str)).into(),
        })
    }

    /// Parse a variable type such as `[ID!]!` and check that its named type is an input type of
    /// this schema.
    pub fn resolve_input_type(&self, type_ref: &str) -> Result<Type, QueryBuilderError> {
        let ty = parse_type_reference(type_ref)?;
        let definition = self.type_definition(ty.inner_named_type().as_str())?;
        if !is_input_type(definition) {
            return Err(QueryBuilderError::NotInputType {
                type_name: ty.inner_named_type().to_string(),
                usage: "a variable",
            });
        }
        Ok(ty)
    }

    /// Check that `type_name` exists and can be a fragment type condition.
    pub fn check_composite_type(&self, type_name: &str) -> Result<(), QueryBuilderError> {
        match self.type_definition(type_name)? {
            ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_) => Ok(()),
            _ => Err(QueryBuilderError::NotCompositeType {
                type_name: type_name.to_string(),
            }),
        }
    }
}

fn find_argument<'s>(
    arguments: &'s [apollo_compiler::Node<InputValueDefinition>],
    name: &str,
) -> Option<&'s InputValueDefinition> {
    arguments
        .iter()
        .find(|argument| argument.name.as_str() == name)
        .map(|argument| &**argument)
}

pub(crate) fn is_input_type(definition: &ExtendedType) -> bool {
    matches!(
        definition,
        ExtendedType::Scalar(_) | ExtendedType::Enum(_) | ExtendedType::InputObject(_)
    )
}

/// Parse a GraphQL type reference such as `Int`, `[String]` or `[ID!]!`.
pub fn parse_type_reference(type_ref: &str) -> Result<Type, QueryBuilderError> {
    parse_type(type_ref.trim()).map_err(|reason| QueryBuilderError::InvalidTypeReference {
        type_ref: type_ref.to_string(),
        reason,
    })
}

fn parse_type(text: &str) -> Result<Type, String> {
    let (inner, non_null) = match text.strip_suffix('!') {
        Some(inner) => (inner.trim_end(), true),
        None => (text, false),
    };
    if let Some(item) = inner.strip_prefix('[') {
        let item = item
            .strip_suffix(']')
            .ok_or_else(|| "unbalanced list brackets".to_string())?;
        let item = Box::new(parse_type(item.trim())?);
        return Ok(if non_null {
            Type::NonNullList(item)
        } else {
            Type::List(item)
        });
    }
    if !is_valid_name(inner) {
        return Err(format!("'{inner}' is not a valid type name"));
    }
    let name = Name::new(inner).map_err(|error| error.to_string())?;
    Ok(if non_null {
        Type::NonNullNamed(name)
    } else {
        Type::Named(name)
    })
}

fn nullable(ty: &Type) -> Type {
    match ty {
        Type::NonNullNamed(name) => Type::Named(name.clone()),
        Type::NonNullList(item) => Type::List(item.clone()),
        other => other.clone(),
    }
}

/// Whether a value of type `sub` can be used where `target` is expected.
pub fn is_sub_type(sub: &Type, target: &Type) -> bool {
    match (sub, target) {
        (_, Type::NonNullNamed(_) | Type::NonNullList(_)) => {
            sub.is_non_null() && is_sub_type(&nullable(sub), &nullable(target))
        }
        (Type::NonNullNamed(_) | Type::NonNullList(_), _) => is_sub_type(&nullable(sub), target),
        (Type::List(sub_item), Type::List(target_item)) => is_sub_type(sub_item, target_item),
        (Type::Named(sub_name), Type::Named(target_name)) => sub_name == target_name,
        _ => false,
    }
}

/// Whether a variable declared as `variable_type` may be used in a slot of type `location_type`.
///
/// A nullable variable with a non-null default value may fill a non-null slot.
pub fn variable_usage_allowed(
    variable_type: &Type,
    has_non_null_default: bool,
    location_type: &Type,
) -> bool {
    if location_type.is_non_null() && !variable_type.is_non_null() {
        return has_non_null_default && is_sub_type(variable_type, &nullable(location_type));
    }
    is_sub_type(variable_type, location_type)
}
