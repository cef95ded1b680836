use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use super::SchemaHandle;
use super::SchemaSource;
use crate::error::QueryBuilderError;
use crate::timeout::with_timeout;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    endpoint: String,
    /// Lower-cased names, sorted.
    headers: Vec<(String, String)>,
}

impl CacheKey {
    fn new(endpoint: &str, headers: &IndexMap<String, String>) -> Self {
        let mut headers: Vec<_> = headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        headers.sort();
        Self {
            endpoint: endpoint.to_string(),
            headers,
        }
    }
}

/// Process-wide cache of fetched schemas, keyed by endpoint and header set.
///
/// Each key is fetched at most once: concurrent first requests share one fetch, and a failed
/// fetch leaves the key empty so the next request tries again. Entries live until the cache
/// is dropped.
#[derive(Default)]
pub struct SchemaCache {
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<SchemaHandle>>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch(
        &self,
        source: &dyn SchemaSource,
        headers: &IndexMap<String, String>,
        timeout: Duration,
    ) -> Result<SchemaHandle, QueryBuilderError> {
        let key = CacheKey::new(source.endpoint(), headers);
        let cell = self.entries.lock().entry(key).or_default().clone();
        cell.get_or_try_init(|| async {
            tracing::debug!(endpoint = source.endpoint(), "fetching schema");
            with_timeout(
                "Schema introspection",
                timeout,
                source.fetch_schema(headers),
            )
            .await
        })
        .await
        .cloned()
    }

    /// Number of schemas held.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
