//! Conversion of an introspection response to SDL.
use std::fmt;

use serde::Deserialize;

use crate::display_helpers::State;
use crate::display_helpers::write_block;
use crate::value::quote_string;

pub(crate) const INTROSPECTION_QUERY: &str = r#"query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types { ...FullType }
    directives {
      name
      locations
      isRepeatable
      args { ...InputValue }
    }
  }
}

fragment FullType on __Type {
  kind
  name
  fields(includeDeprecated: true) {
    name
    args { ...InputValue }
    type { ...TypeRef }
    isDeprecated
    deprecationReason
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) {
    name
    isDeprecated
    deprecationReason
  }
  possibleTypes { ...TypeRef }
}

fragment InputValue on __InputValue {
  name
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType { kind name }
            }
          }
        }
      }
    }
  }
}"#;

const BUILT_IN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];
const BUILT_IN_DIRECTIVES: [&str; 5] = ["skip", "include", "deprecated", "specifiedBy", "oneOf"];

#[derive(Debug, Deserialize)]
pub(crate) struct IntrospectionResponse {
    pub(crate) data: Option<IntrospectionData>,
    #[serde(default)]
    pub(crate) errors: Vec<IntrospectionError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IntrospectionError {
    pub(crate) message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IntrospectionData {
    #[serde(rename = "__schema")]
    pub(crate) schema: IntrospectedSchema,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IntrospectedSchema {
    query_type: Option<NamedRef>,
    mutation_type: Option<NamedRef>,
    subscription_type: Option<NamedRef>,
    types: Vec<FullType>,
    #[serde(default)]
    directives: Vec<IntrospectedDirective>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullType {
    kind: TypeKind,
    name: String,
    fields: Option<Vec<IntrospectedField>>,
    input_fields: Option<Vec<InputValue>>,
    interfaces: Option<Vec<TypeRef>>,
    enum_values: Option<Vec<EnumValue>>,
    possible_types: Option<Vec<TypeRef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectedField {
    name: String,
    #[serde(default)]
    args: Vec<InputValue>,
    #[serde(rename = "type")]
    ty: TypeRef,
    #[serde(default)]
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputValue {
    name: String,
    #[serde(rename = "type")]
    ty: TypeRef,
    default_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnumValue {
    name: String,
    #[serde(default)]
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeRef {
    kind: TypeKind,
    name: Option<String>,
    of_type: Option<Box<TypeRef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectedDirective {
    name: String,
    locations: Vec<String>,
    #[serde(default)]
    is_repeatable: bool,
    #[serde(default)]
    args: Vec<InputValue>,
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.of_type) {
            (TypeKind::NonNull, Some(inner)) => write!(f, "{inner}!"),
            (TypeKind::List, Some(inner)) => write!(f, "[{inner}]"),
            _ => f.write_str(self.name.as_deref().unwrap_or_default()),
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)?;
        if let Some(default_value) = &self.default_value {
            write!(f, " = {default_value}")?;
        }
        Ok(())
    }
}

fn write_arguments(state: &mut State<'_, '_>, arguments: &[InputValue]) -> fmt::Result {
    if arguments.is_empty() {
        return Ok(());
    }
    state.write("(")?;
    for (index, argument) in arguments.iter().enumerate() {
        if index > 0 {
            state.write(", ")?;
        }
        state.write(argument)?;
    }
    state.write(")")
}

fn write_deprecation(
    state: &mut State<'_, '_>,
    is_deprecated: bool,
    reason: Option<&str>,
) -> fmt::Result {
    match (is_deprecated, reason) {
        (false, _) => Ok(()),
        (true, Some(reason)) => write!(state, " @deprecated(reason: {})", quote_string(reason)),
        (true, None) => state.write(" @deprecated"),
    }
}

/// Renders an introspected schema as SDL.
impl fmt::Display for IntrospectedSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = &mut State::new(f);
        let roots = [
            ("query", &self.query_type),
            ("mutation", &self.mutation_type),
            ("subscription", &self.subscription_type),
        ];
        state.write("schema ")?;
        write_block(
            state,
            roots
                .iter()
                .filter_map(|(operation, root)| Some((operation, root.as_ref()?))),
            |state, (operation, root)| write!(state, "{operation}: {}", root.name),
        )?;

        for directive in &self.directives {
            if BUILT_IN_DIRECTIVES.contains(&directive.name.as_str()) {
                continue;
            }
            state.new_line()?;
            state.new_line()?;
            write!(state, "directive @{}", directive.name)?;
            write_arguments(state, &directive.args)?;
            if directive.is_repeatable {
                state.write(" repeatable")?;
            }
            write!(state, " on {}", directive.locations.join(" | "))?;
        }

        for ty in &self.types {
            if ty.name.starts_with("__") || BUILT_IN_SCALARS.contains(&ty.name.as_str()) {
                continue;
            }
            state.new_line()?;
            state.new_line()?;
            write_type(state, ty)?;
        }
        Ok(())
    }
}

fn write_type(state: &mut State<'_, '_>, ty: &FullType) -> fmt::Result {
    match ty.kind {
        TypeKind::Scalar => write!(state, "scalar {}", ty.name),
        TypeKind::Object | TypeKind::Interface => {
            let keyword = if ty.kind == TypeKind::Object {
                "type"
            } else {
                "interface"
            };
            write!(state, "{keyword} {}", ty.name)?;
            let interfaces = ty.interfaces.as_deref().unwrap_or_default();
            for (index, interface) in interfaces.iter().enumerate() {
                state.write(if index == 0 { " implements " } else { " & " })?;
                state.write(interface)?;
            }
            state.write(" ")?;
            write_block(
                state,
                ty.fields.as_deref().unwrap_or_default(),
                |state, field| {
                    state.write(&field.name)?;
                    write_arguments(state, &field.args)?;
                    write!(state, ": {}", field.ty)?;
                    write_deprecation(
                        state,
                        field.is_deprecated,
                        field.deprecation_reason.as_deref(),
                    )
                },
            )
        }
        TypeKind::Union => {
            let members = ty
                .possible_types
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            write!(state, "union {} = {}", ty.name, members.join(" | "))
        }
        TypeKind::Enum => {
            write!(state, "enum {} ", ty.name)?;
            write_block(
                state,
                ty.enum_values.as_deref().unwrap_or_default(),
                |state, value| {
                    state.write(&value.name)?;
                    write_deprecation(
                        state,
                        value.is_deprecated,
                        value.deprecation_reason.as_deref(),
                    )
                },
            )
        }
        TypeKind::InputObject => {
            write!(state, "input {} ", ty.name)?;
            write_block(
                state,
                ty.input_fields.as_deref().unwrap_or_default(),
                |state, field| state.write(field),
            )
        }
        TypeKind::List | TypeKind::NonNull => Ok(()),
    }
}
