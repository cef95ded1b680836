use std::fmt;
use std::fmt::Display;

/// Indentation-aware writer used to render GraphQL documents.
pub(crate) struct State<'fmt, 'fmt2> {
    indent_level: usize,
    output: &'fmt mut fmt::Formatter<'fmt2>,
}

impl<'a, 'b> State<'a, 'b> {
    pub(crate) fn new(output: &'a mut fmt::Formatter<'b>) -> State<'a, 'b> {
        Self {
            indent_level: 0,
            output,
        }
    }

    pub(crate) fn write<T: fmt::Display>(&mut self, value: T) -> fmt::Result {
        write!(self.output, "{}", value)
    }

    pub(crate) fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.output.write_fmt(args)
    }

    pub(crate) fn new_line(&mut self) -> fmt::Result {
        self.write("\n")?;
        for _ in 0..self.indent_level {
            self.write("  ")?
        }
        Ok(())
    }

    pub(crate) fn indent_no_new_line(&mut self) {
        self.indent_level += 1;
    }

    pub(crate) fn dedent(&mut self) -> fmt::Result {
        self.indent_level = self.indent_level.saturating_sub(1);
        self.new_line()
    }
}

/// Writes `open`, then each item on its own indented line, then `close` on a dedented line.
pub(crate) fn write_block<T>(
    state: &mut State<'_, '_>,
    items: impl IntoIterator<Item = T>,
    mut write_line: impl FnMut(&mut State<'_, '_>, T) -> fmt::Result,
) -> fmt::Result {
    state.write("{")?;
    state.indent_no_new_line();
    for item in items {
        state.new_line()?;
        write_line(state, item)?;
    }
    state.dedent()?;
    state.write("}")
}

/// Displays items separated by `", "`, e.g. the inside of an argument list.
pub(crate) struct DisplayCommaSeparated<'a, T>(pub(crate) &'a [T]);

impl<T: Display> Display for DisplayCommaSeparated<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.0.iter();
        if let Some(item) = iter.next() {
            write!(f, "{item}")?;
        }
        iter.try_for_each(|item| write!(f, ", {item}"))
    }
}
