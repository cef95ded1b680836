//! Rendering of a session into GraphQL document text.
use std::fmt;

use indexmap::IndexMap;

use crate::display_helpers::State;
use crate::display_helpers::write_block;
use crate::structure::ArgumentValue;
use crate::structure::DirectiveCall;
use crate::structure::FragmentDefinition;
use crate::structure::InlineFragment;
use crate::structure::OperationType;
use crate::structure::SelectionNode;
use crate::structure::SessionState;

/// The parts of a session that make up its document.
#[derive(Debug, Clone, Copy)]
pub struct QueryDocument<'a> {
    pub operation_type: OperationType,
    pub operation_name: Option<&'a str>,
    pub structure: &'a SelectionNode,
    pub variables_schema: &'a IndexMap<String, String>,
    pub variables_defaults: &'a IndexMap<String, ArgumentValue>,
    pub fragments: &'a IndexMap<String, FragmentDefinition>,
    pub operation_directives: &'a [DirectiveCall],
}

impl<'a> From<&'a SessionState> for QueryDocument<'a> {
    fn from(state: &'a SessionState) -> Self {
        Self {
            operation_type: state.operation_type,
            operation_name: state.operation_name.as_deref(),
            structure: &state.query_structure,
            variables_schema: &state.variables_schema,
            variables_defaults: &state.variables_defaults,
            fragments: &state.fragments,
            operation_directives: &state.operation_directives,
        }
    }
}

impl QueryDocument<'_> {
    /// Whether there is nothing to render.
    pub fn is_empty(&self) -> bool {
        self.structure.is_empty() && self.fragments.is_empty()
    }
}

/// Render a document. Returns an empty string when there is nothing to render.
pub fn build_document(document: &QueryDocument<'_>) -> String {
    document.to_string()
}

impl fmt::Display for QueryDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = &mut State::new(f);
        let mut first = true;
        if !self.structure.is_empty() {
            first = false;
            self.write_operation_header(state)?;
            write_selection_set(state, self.structure)?;
        }
        for (name, fragment) in self.fragments {
            if !first {
                state.new_line()?;
                state.new_line()?;
            }
            first = false;
            write!(state, "fragment {name} on {} ", fragment.on_type)?;
            write_block(state, &fragment.fields, |state, (key, field)| {
                write_field(state, key, field)
            })?;
        }
        Ok(())
    }
}

impl QueryDocument<'_> {
    fn write_operation_header(&self, state: &mut State<'_, '_>) -> fmt::Result {
        state.write(self.operation_type)?;
        if let Some(name) = self.operation_name {
            write!(state, " {name}")?;
        }
        if !self.variables_schema.is_empty() {
            state.write("(")?;
            for (index, (name, ty)) in self.variables_schema.iter().enumerate() {
                if index > 0 {
                    state.write(", ")?;
                }
                write!(state, "{name}: {ty}")?;
                if let Some(default) = self.variables_defaults.get(name) {
                    write!(state, " = {default}")?;
                }
            }
            state.write(")")?;
        }
        for directive in self.operation_directives {
            write!(state, " {directive}")?;
        }
        state.write(" ")
    }
}

enum Selection<'a> {
    Field(&'a str, &'a SelectionNode),
    FragmentSpread(&'a str),
    InlineFragment(&'a InlineFragment),
}

fn write_selection_set(state: &mut State<'_, '_>, node: &SelectionNode) -> fmt::Result {
    let selections = node
        .fields
        .iter()
        .map(|(key, field)| Selection::Field(key, field))
        .chain(
            node.fragment_spreads
                .iter()
                .map(|name| Selection::FragmentSpread(name)),
        )
        .chain(node.inline_fragments.iter().map(Selection::InlineFragment));
    write_block(state, selections, |state, selection| match selection {
        Selection::Field(key, field) => write_field(state, key, field),
        Selection::FragmentSpread(name) => write!(state, "...{name}"),
        Selection::InlineFragment(fragment) => {
            write!(state, "... on {} ", fragment.on_type)?;
            write_block(state, &fragment.selections, |state, (key, field)| {
                write_field(state, key, field)
            })
        }
    })
}

fn write_field(state: &mut State<'_, '_>, key: &str, field: &SelectionNode) -> fmt::Result {
    if key != field.field_name {
        write!(state, "{key}: ")?;
    }
    state.write(&field.field_name)?;
    if !field.args.is_empty() {
        state.write("(")?;
        for (index, (name, value)) in field.args.iter().enumerate() {
            if index > 0 {
                state.write(", ")?;
            }
            write!(state, "{name}: {value}")?;
        }
        state.write(")")?;
    }
    if !field.directives.is_empty() {
        write!(state, " {}", DisplaySpaceSeparated(&field.directives))?;
    }
    if !field.is_empty() {
        state.write(" ")?;
        write_selection_set(state, field)?;
    }
    Ok(())
}

struct DisplaySpaceSeparated<'a>(&'a [DirectiveCall]);

impl fmt::Display for DisplaySpaceSeparated<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut directives = self.0.iter();
        if let Some(first) = directives.next() {
            write!(f, "{first}")?;
        }
        directives.try_for_each(|directive| write!(f, " {directive}"))
    }
}
