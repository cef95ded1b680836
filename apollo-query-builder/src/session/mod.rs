//! Session identifiers and storage.
use std::fmt;

use serde::Serialize;

mod store;

pub use store::InMemorySessionStore;
pub use store::SessionStore;

/// Opaque session identifier: lower-case hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// A new identifier made of 16 random bytes.
    pub fn generate() -> Self {
        Self(hex::encode(rand::random::<[u8; 16]>()))
    }

    /// Normalize a caller supplied identifier: non-hex characters are dropped and the rest
    /// lower-cased. Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(char::is_ascii_hexdigit)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        (!normalized.is_empty()).then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
