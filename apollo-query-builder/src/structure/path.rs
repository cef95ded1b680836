use std::fmt;
use std::str::FromStr;

use crate::error::QueryBuilderError;
use crate::value::is_valid_name;

/// A dot-separated address of a node in the selection tree, e.g. `characters.results`.
///
/// Each segment is a selection key: the alias when the field was selected under one, else the
/// field name. The empty path addresses the operation root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SelectionPath {
    segments: Vec<String>,
}

impl SelectionPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, or `None` for the root.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The path of the parent node, or `None` for the root.
    pub fn parent(&self) -> Option<SelectionPath> {
        let (_, parent) = self.segments.split_last()?;
        Some(Self {
            segments: parent.to_vec(),
        })
    }

    pub fn child(&self, key: &str) -> SelectionPath {
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Self { segments }
    }
}

impl FromStr for SelectionPath {
    type Err = QueryBuilderError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let segments = trimmed
            .split('.')
            .map(|segment| {
                if is_valid_name(segment) {
                    Ok(segment.to_string())
                } else if segment.is_empty() {
                    Err(QueryBuilderError::InvalidPath {
                        path: path.to_string(),
                        reason: "empty path segment".to_string(),
                    })
                } else {
                    Err(QueryBuilderError::InvalidPath {
                        path: path.to_string(),
                        reason: format!("'{segment}' is not a valid GraphQL name"),
                    })
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { segments })
    }
}

impl fmt::Display for SelectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
