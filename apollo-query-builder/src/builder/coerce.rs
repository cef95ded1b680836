//! Type-directed conversion of caller supplied JSON into argument values.
use apollo_compiler::ast::Type;
use apollo_compiler::schema::ExtendedType;
use indexmap::IndexMap;
use serde_json::Number;
use serde_json::Value;

use crate::configuration::Limits;
use crate::error::QueryBuilderError;
use crate::schema::SchemaHandle;
use crate::schema::parse_type_reference;
use crate::schema::variable_usage_allowed;
use crate::structure::ArgumentValue;
use crate::structure::SessionState;
use crate::value::coerce_string_value;
use crate::value::coerce_to_boolean;
use crate::value::coerce_to_float;
use crate::value::coerce_to_integer;
use crate::value::is_valid_name;
use crate::value::is_variable_reference;
use crate::value::kind_of;
use crate::value::literal_to_json;
use crate::value::parse_graphql_literal;
use crate::value::validate_input_complexity;
use crate::value::validate_string;
use crate::value::validate_value_against_type;

/// Converts values for one slot, e.g. `argument 'page'`.
///
/// Without a schema (advisory validation) types are unknown: strings go through the lenient
/// scalar ladder and everything else is kept as given.
pub(super) struct Coercion<'a> {
    schema: Option<&'a SchemaHandle>,
    state: &'a SessionState,
    limits: &'a Limits,
    target: String,
    allow_variables: bool,
    pub(super) warnings: Vec<String>,
}

impl<'a> Coercion<'a> {
    pub(super) fn new(
        schema: Option<&'a SchemaHandle>,
        state: &'a SessionState,
        limits: &'a Limits,
        target: String,
    ) -> Self {
        Self {
            schema,
            state,
            limits,
            target,
            allow_variables: true,
            warnings: Vec::new(),
        }
    }

    /// Treat `$name` strings as plain strings or errors instead of variable references.
    pub(super) fn without_variables(mut self) -> Self {
        self.allow_variables = false;
        self
    }

    /// Convert `value` for a slot of type `ty`. `has_default` tells whether the slot declares
    /// a default value, which lets a nullable variable fill it even when it is non-null.
    pub(super) fn value(
        &mut self,
        value: &Value,
        ty: Option<&Type>,
        has_default: bool,
    ) -> Result<ArgumentValue, QueryBuilderError> {
        if let Value::String(text) = value {
            if self.allow_variables && is_variable_reference(text) {
                return self.variable(text, ty, has_default);
            }
        }
        match ty {
            Some(ty) => self.typed(value, ty),
            None => self.untyped(value),
        }
    }

    /// Bind the declared variable `name` to a slot of type `ty`.
    pub(super) fn variable(
        &mut self,
        name: &str,
        ty: Option<&Type>,
        has_default: bool,
    ) -> Result<ArgumentValue, QueryBuilderError> {
        if !self.allow_variables {
            return Err(self.invalid(format!(
                "variable '{name}' cannot be used here"
            )));
        }
        let Some(declared) = self.state.variables_schema.get(name) else {
            return Err(QueryBuilderError::UndefinedVariable {
                name: name.to_string(),
            });
        };
        if let Some(expected) = ty {
            let variable_type = parse_type_reference(declared)?;
            let has_non_null_default = self
                .state
                .variables_defaults
                .get(name)
                .and_then(ArgumentValue::to_json)
                .is_some_and(|default| !default.is_null());
            if !variable_usage_allowed(&variable_type, has_non_null_default || has_default, expected)
            {
                return Err(QueryBuilderError::VariableTypeMismatch {
                    variable: name.to_string(),
                    variable_type: declared.clone(),
                    target: self.target.clone(),
                    expected_type: expected.to_string(),
                });
            }
        }
        Ok(ArgumentValue::Variable(name.to_string()))
    }

    fn untyped(&mut self, value: &Value) -> Result<ArgumentValue, QueryBuilderError> {
        Ok(match value {
            Value::String(text) => {
                self.check_string(text)?;
                let coercion = coerce_string_value(text);
                self.warnings.extend(coercion.warning);
                if coercion.coerced {
                    ArgumentValue::Typed(coercion.value)
                } else {
                    ArgumentValue::MarkedString(text.clone())
                }
            }
            Value::Array(items) => ArgumentValue::List(
                items
                    .iter()
                    .map(|item| self.value(item, None, false))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(fields) => ArgumentValue::Object(
                fields
                    .iter()
                    .map(|(name, item)| {
                        self.check_key(name)?;
                        Ok((name.clone(), self.value(item, None, false)?))
                    })
                    .collect::<Result<_, QueryBuilderError>>()?,
            ),
            scalar => ArgumentValue::Typed(scalar.clone()),
        })
    }

    fn typed(&mut self, value: &Value, ty: &Type) -> Result<ArgumentValue, QueryBuilderError> {
        if value.is_null() {
            if ty.is_non_null() {
                return Err(self.invalid(format!(
                    "Expected non-nullable type '{ty}' but received null"
                )));
            }
            return Ok(ArgumentValue::Typed(Value::Null));
        }
        match ty {
            Type::List(item) | Type::NonNullList(item) => match value {
                Value::Array(items) => Ok(ArgumentValue::List(
                    items
                        .iter()
                        .map(|element| self.value(element, Some(&**item), false))
                        .collect::<Result<_, _>>()?,
                )),
                // Text that does not parse as a list literal is a single item, e.g. "[draft] title".
                Value::String(text) if text.trim_start().starts_with('[') => {
                    match self.parse_list_literal(text)? {
                        Some(parsed) => self.typed(&parsed, ty),
                        None => self.value(value, Some(&**item), false),
                    }
                }
                // A single value is coerced to a list of one.
                single => self.value(single, Some(&**item), false),
            },
            Type::Named(name) | Type::NonNullNamed(name) => self.named(value, name.as_str(), ty),
        }
    }

    fn named(
        &mut self,
        value: &Value,
        type_name: &str,
        ty: &Type,
    ) -> Result<ArgumentValue, QueryBuilderError> {
        match type_name {
            "Int" => {
                let integer = coerce_to_integer(value).ok_or_else(|| self.mismatch(value, ty))?;
                self.note_coercion(value, type_name, integer);
                Ok(ArgumentValue::Typed(Value::from(integer)))
            }
            "Float" => {
                let float = coerce_to_float(value)
                    .and_then(Number::from_f64)
                    .ok_or_else(|| self.mismatch(value, ty))?;
                self.note_coercion(value, type_name, &float);
                // Keep integral numbers as given, `1` and not `1.0`.
                Ok(ArgumentValue::Typed(match value {
                    Value::Number(number) => Value::Number(number.clone()),
                    _ => Value::Number(float),
                }))
            }
            "Boolean" => {
                let boolean = coerce_to_boolean(value).ok_or_else(|| self.mismatch(value, ty))?;
                self.note_coercion(value, type_name, boolean);
                Ok(ArgumentValue::Typed(Value::Bool(boolean)))
            }
            "String" => match value {
                Value::String(text) => {
                    self.check_string(text)?;
                    Ok(ArgumentValue::MarkedString(text.clone()))
                }
                _ => Err(self.mismatch(value, ty)),
            },
            "ID" => match value {
                Value::String(text) => {
                    self.check_string(text)?;
                    Ok(ArgumentValue::MarkedString(text.clone()))
                }
                // Integer ids stay bare.
                Value::Number(_) if coerce_to_integer(value).is_some() => {
                    Ok(ArgumentValue::Typed(value.clone()))
                }
                _ => Err(self.mismatch(value, ty)),
            },
            _ => match self.schema {
                Some(schema) => self.schema_type(schema, value, type_name, ty),
                None => self.untyped(value),
            },
        }
    }

    fn schema_type(
        &mut self,
        schema: &SchemaHandle,
        value: &Value,
        type_name: &str,
        ty: &Type,
    ) -> Result<ArgumentValue, QueryBuilderError> {
        match schema.type_definition(type_name)? {
            ExtendedType::Enum(_) => match value {
                Value::String(text) if is_valid_name(text) => {
                    schema.check_enum_value(type_name, text)?;
                    Ok(ArgumentValue::Enum(text.clone()))
                }
                _ => Err(self.invalid(format!(
                    "Enum '{type_name}' cannot represent {} value {value}",
                    kind_of(value)
                ))),
            },
            ExtendedType::InputObject(_) => match value {
                Value::Object(fields) => {
                    let mut coerced = IndexMap::with_capacity(fields.len());
                    for (name, item) in fields {
                        let definition = schema.input_field(type_name, name)?;
                        let item = self.value(
                            item,
                            Some(&*definition.ty),
                            definition.default_value.is_some(),
                        )?;
                        coerced.insert(name.clone(), item);
                    }
                    Ok(ArgumentValue::Object(coerced))
                }
                Value::String(text) if text.trim_start().starts_with('{') => {
                    let parsed = self.parse_literal(text)?;
                    self.typed(&parsed, ty)
                }
                _ => Err(self.invalid(format!(
                    "Input type '{type_name}' cannot represent {} value {value}",
                    kind_of(value)
                ))),
            },
            ExtendedType::Scalar(_) => match value {
                Value::String(text) => {
                    self.check_string(text)?;
                    let coercion = coerce_string_value(text);
                    self.warnings.extend(coercion.warning);
                    Ok(if coercion.coerced {
                        ArgumentValue::Typed(coercion.value)
                    } else {
                        ArgumentValue::MarkedString(text.clone())
                    })
                }
                Value::Array(_) | Value::Object(_) => {
                    self.check_literal(value)?;
                    Ok(ArgumentValue::Literal(value.clone()))
                }
                scalar => Ok(ArgumentValue::Typed(scalar.clone())),
            },
            _ => Err(QueryBuilderError::NotInputType {
                type_name: type_name.to_string(),
                usage: "an argument value",
            }),
        }
    }

    /// Parse GraphQL literal text given where a list or input object is expected.
    fn parse_literal(&self, text: &str) -> Result<Value, QueryBuilderError> {
        let parsed = literal_to_json(&parse_graphql_literal(text)?)?;
        validate_input_complexity(&parsed, &self.label(), self.limits)?;
        Ok(parsed)
    }

    /// Parse list literal text. `None` when the text is not a list literal.
    fn parse_list_literal(&self, text: &str) -> Result<Option<Value>, QueryBuilderError> {
        let parsed = match parse_graphql_literal(text).and_then(|literal| literal_to_json(&literal)) {
            Ok(parsed @ Value::Array(_)) => parsed,
            _ => return Ok(None),
        };
        validate_input_complexity(&parsed, &self.label(), self.limits)?;
        Ok(Some(parsed))
    }

    /// Raw literals render their strings bare when they look like variables.
    fn check_literal(&self, value: &Value) -> Result<(), QueryBuilderError> {
        match value {
            Value::String(text) if is_variable_reference(text) => {
                if !self.allow_variables {
                    return Err(self.invalid(format!("variable '{text}' cannot be used here")));
                }
                if !self.state.variables_schema.contains_key(text.as_str()) {
                    return Err(QueryBuilderError::UndefinedVariable { name: text.clone() });
                }
                Ok(())
            }
            Value::Array(items) => items.iter().try_for_each(|item| self.check_literal(item)),
            Value::Object(fields) => fields.iter().try_for_each(|(name, item)| {
                self.check_key(name)?;
                self.check_literal(item)
            }),
            _ => Ok(()),
        }
    }

    fn check_key(&self, key: &str) -> Result<(), QueryBuilderError> {
        if is_valid_name(key) {
            Ok(())
        } else {
            Err(QueryBuilderError::InvalidLiteral(format!(
                "{} has key '{key}', which is not a valid GraphQL name",
                self.label()
            )))
        }
    }

    fn check_string(&self, text: &str) -> Result<(), QueryBuilderError> {
        validate_string(text, &self.label(), self.limits)
    }

    fn note_coercion(&mut self, value: &Value, type_name: &str, coerced: impl std::fmt::Display) {
        if let Value::String(text) = value {
            self.warnings
                .push(format!("String '{text}' was coerced to {type_name} {coerced}"));
        }
    }

    fn mismatch(&self, value: &Value, ty: &Type) -> QueryBuilderError {
        let reason = validate_value_against_type(value, ty).err().unwrap_or_else(|| {
            format!(
                "Type '{}' cannot represent {} value {value}",
                ty.inner_named_type(),
                kind_of(value)
            )
        });
        self.invalid(reason)
    }

    fn invalid(&self, reason: String) -> QueryBuilderError {
        QueryBuilderError::InvalidValue {
            target: self.target.clone(),
            reason,
        }
    }

    /// The target with a leading capital, for messages that start with it.
    fn label(&self) -> String {
        let mut chars = self.target.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}
