use crate::error::QueryBuilderError;

/// Whether `name` matches `/^[_A-Za-z][_0-9A-Za-z]*$/`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Check the syntax of a field, argument, directive, type or fragment name.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), QueryBuilderError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(QueryBuilderError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Check that `name` is `$` followed by a valid name.
pub fn validate_variable_name(name: &str) -> Result<(), QueryBuilderError> {
    match name.strip_prefix('$') {
        Some(rest) if is_valid_name(rest) => Ok(()),
        _ => Err(QueryBuilderError::InvalidVariableName {
            name: name.to_string(),
        }),
    }
}

/// Whether `value` looks like a variable reference, i.e. passes [`validate_variable_name`].
pub(crate) fn is_variable_reference(value: &str) -> bool {
    value.strip_prefix('$').is_some_and(is_valid_name)
}
