//! The persisted model of an operation under construction.
//!
//! A [`SessionState`] owns one operation: its selection tree, variable declarations, operation
//! directives and named fragments. Every map is an [`IndexMap`] so the rendered document keeps
//! the order in which things were added, across any number of load/save round trips.

use std::fmt;
use std::time::SystemTime;

use apollo_compiler::ast;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::display_helpers::DisplayCommaSeparated;
use crate::error::QueryBuilderError;
use crate::value::is_variable_reference;
use crate::value::quote_string;
use crate::value::serialize_graphql_value;

mod path;

pub use path::SelectionPath;

/// The kind of operation a session builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        }
    }

    /// Root type name a schema uses when it does not declare one explicitly.
    pub const fn default_type_name(self) -> &'static str {
        match self {
            OperationType::Query => "Query",
            OperationType::Mutation => "Mutation",
            OperationType::Subscription => "Subscription",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OperationType> for ast::OperationType {
    fn from(operation_type: OperationType) -> Self {
        match operation_type {
            OperationType::Query => ast::OperationType::Query,
            OperationType::Mutation => ast::OperationType::Mutation,
            OperationType::Subscription => ast::OperationType::Subscription,
        }
    }
}

/// The value held by an argument, directive argument, input object field or variable default.
///
/// Each variant renders differently; see the [`fmt::Display`] implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentValue {
    /// A raw JSON value rendered with generic literal serialization.
    Literal(Value),
    /// A reference to a declared variable, including its `$` prefix. Never quoted.
    Variable(String),
    /// A value coerced against its schema type. Numbers, booleans and null render bare.
    Typed(Value),
    /// A string that must render quoted even when it looks like a number or boolean.
    MarkedString(String),
    /// An enum value. Always renders bare.
    Enum(String),
    /// An input object whose fields keep their own representation.
    Object(IndexMap<String, ArgumentValue>),
    /// A list whose items keep their own representation.
    List(Vec<ArgumentValue>),
}

impl ArgumentValue {
    /// The numeric value, if this renders as a number.
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            ArgumentValue::Literal(Value::Number(number))
            | ArgumentValue::Typed(Value::Number(number)) => number.as_f64(),
            _ => None,
        }
    }

    /// The JSON value a GraphQL server would coerce this literal to.
    ///
    /// Returns `None` for values containing a variable reference.
    pub fn to_json(&self) -> Option<Value> {
        Some(match self {
            ArgumentValue::Literal(value) | ArgumentValue::Typed(value) => value.clone(),
            ArgumentValue::Variable(_) => return None,
            ArgumentValue::MarkedString(text) | ArgumentValue::Enum(text) => {
                Value::String(text.clone())
            }
            ArgumentValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| Some((name.clone(), value.to_json()?)))
                    .collect::<Option<_>>()?,
            ),
            ArgumentValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(ArgumentValue::to_json)
                    .collect::<Option<_>>()?,
            ),
        })
    }

    pub(crate) fn collect_variables<'a>(&'a self, variables: &mut IndexSet<&'a str>) {
        match self {
            ArgumentValue::Variable(name) => {
                variables.insert(name);
            }
            ArgumentValue::Literal(value) => collect_json_variables(value, variables),
            ArgumentValue::Typed(_) | ArgumentValue::MarkedString(_) | ArgumentValue::Enum(_) => {}
            ArgumentValue::Object(fields) => fields
                .values()
                .for_each(|value| value.collect_variables(variables)),
            ArgumentValue::List(items) => items
                .iter()
                .for_each(|value| value.collect_variables(variables)),
        }
    }
}

fn collect_json_variables<'a>(value: &'a Value, variables: &mut IndexSet<&'a str>) {
    match value {
        Value::String(text) if is_variable_reference(text) => {
            variables.insert(text);
        }
        Value::Array(items) => items
            .iter()
            .for_each(|item| collect_json_variables(item, variables)),
        Value::Object(fields) => fields
            .values()
            .for_each(|item| collect_json_variables(item, variables)),
        _ => {}
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Literal(value) => f.write_str(&serialize_graphql_value(value)),
            ArgumentValue::Variable(name) | ArgumentValue::Enum(name) => f.write_str(name),
            ArgumentValue::Typed(Value::String(text)) | ArgumentValue::MarkedString(text) => {
                f.write_str(&quote_string(text))
            }
            ArgumentValue::Typed(value) => f.write_str(&serialize_graphql_value(value)),
            ArgumentValue::Object(fields) => {
                f.write_str("{")?;
                for (index, (name, value)) in fields.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
            ArgumentValue::List(items) => write!(f, "[{}]", DisplayCommaSeparated(items)),
        }
    }
}

/// A directive argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveArgument {
    pub name: String,
    pub value: ArgumentValue,
}

impl fmt::Display for DirectiveArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// One application of a directive, e.g. `@include(if: $withName)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<DirectiveArgument>,
}

impl DirectiveCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    /// Replace the argument named `name`, or append it.
    pub fn set_argument(&mut self, name: &str, value: ArgumentValue) {
        match self.arguments.iter_mut().find(|argument| argument.name == name) {
            Some(argument) => argument.value = value,
            None => self.arguments.push(DirectiveArgument {
                name: name.to_string(),
                value,
            }),
        }
    }
}

impl fmt::Display for DirectiveCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.arguments.is_empty() {
            write!(f, "({})", DisplayCommaSeparated(&self.arguments))?;
        }
        Ok(())
    }
}

/// The directive named `name` in `directives`, appended first if absent.
pub(crate) fn directive_entry<'a>(
    directives: &'a mut Vec<DirectiveCall>,
    name: &str,
) -> &'a mut DirectiveCall {
    let index = match directives.iter().position(|directive| directive.name == name) {
        Some(index) => index,
        None => {
            directives.push(DirectiveCall::new(name));
            directives.len() - 1
        }
    };
    &mut directives[index]
}

/// A `... on Type { ... }` selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineFragment {
    pub on_type: String,
    #[serde(default)]
    pub selections: IndexMap<String, SelectionNode>,
}

/// A node of the selection tree.
///
/// The operation root is a node with an empty `field_name`. Children are keyed by alias when
/// one was given, else by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionNode {
    pub field_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub args: IndexMap<String, ArgumentValue>,
    pub fields: IndexMap<String, SelectionNode>,
    pub directives: Vec<DirectiveCall>,
    pub fragment_spreads: Vec<String>,
    pub inline_fragments: Vec<InlineFragment>,
}

impl SelectionNode {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Default::default()
        }
    }

    /// Whether this node selects nothing at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.fragment_spreads.is_empty() && self.inline_fragments.is_empty()
    }

    pub fn descendant(&self, path: &SelectionPath) -> Result<&SelectionNode, QueryBuilderError> {
        path.segments().iter().try_fold(self, |node, segment| {
            node.fields
                .get(segment)
                .ok_or_else(|| path_not_found(path, segment))
        })
    }

    pub fn descendant_mut(
        &mut self,
        path: &SelectionPath,
    ) -> Result<&mut SelectionNode, QueryBuilderError> {
        path.segments().iter().try_fold(self, |node, segment| {
            node.fields
                .get_mut(segment)
                .ok_or_else(|| path_not_found(path, segment))
        })
    }

    pub(crate) fn collect_variables<'a>(&'a self, variables: &mut IndexSet<&'a str>) {
        self.args
            .values()
            .for_each(|value| value.collect_variables(variables));
        for directive in &self.directives {
            directive
                .arguments
                .iter()
                .for_each(|argument| argument.value.collect_variables(variables));
        }
        self.fields
            .values()
            .for_each(|field| field.collect_variables(variables));
        for fragment in &self.inline_fragments {
            fragment
                .selections
                .values()
                .for_each(|field| field.collect_variables(variables));
        }
    }
}

fn path_not_found(path: &SelectionPath, segment: &str) -> QueryBuilderError {
    QueryBuilderError::PathNotFound {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

/// A named fragment definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentDefinition {
    pub on_type: String,
    #[serde(default)]
    pub fields: IndexMap<String, SelectionNode>,
}

/// Everything persisted for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Headers sent to the endpoint for this session.
    pub headers: IndexMap<String, String>,
    pub operation_type: OperationType,
    /// Root type of the operation in the schema, e.g. `Query`.
    pub operation_type_name: String,
    pub operation_name: Option<String>,
    pub query_structure: SelectionNode,
    #[serde(default)]
    pub fragments: IndexMap<String, FragmentDefinition>,
    /// Declared variables, `$name` to GraphQL type.
    #[serde(default)]
    pub variables_schema: IndexMap<String, String>,
    #[serde(default)]
    pub variables_defaults: IndexMap<String, ArgumentValue>,
    #[serde(default)]
    pub variables_values: IndexMap<String, Value>,
    #[serde(default)]
    pub operation_directives: Vec<DirectiveCall>,
    pub created_at: SystemTime,
    /// Incremented by the session store on every save.
    #[serde(default)]
    pub revision: u64,
}

impl SessionState {
    pub fn new(
        headers: IndexMap<String, String>,
        operation_type: OperationType,
        operation_type_name: impl Into<String>,
        operation_name: Option<String>,
    ) -> Self {
        Self {
            headers,
            operation_type,
            operation_type_name: operation_type_name.into(),
            operation_name,
            query_structure: SelectionNode::default(),
            fragments: IndexMap::new(),
            variables_schema: IndexMap::new(),
            variables_defaults: IndexMap::new(),
            variables_values: IndexMap::new(),
            operation_directives: Vec::new(),
            created_at: SystemTime::now(),
            revision: 0,
        }
    }

    /// Every variable referenced anywhere in the operation or its fragments.
    pub fn referenced_variables(&self) -> IndexSet<&str> {
        let mut variables = IndexSet::new();
        self.query_structure.collect_variables(&mut variables);
        for fragment in self.fragments.values() {
            fragment
                .fields
                .values()
                .for_each(|field| field.collect_variables(&mut variables));
        }
        for directive in &self.operation_directives {
            directive
                .arguments
                .iter()
                .for_each(|argument| argument.value.collect_variables(&mut variables));
        }
        variables
    }
}
