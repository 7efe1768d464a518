//! Query cache keyed by `(endpoint, params)`.
//!
//! The cache is a plain value handed to whoever needs it (usually behind an
//! `Arc`). Entries only leave through explicit invalidation.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    endpoint: String,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter; a `None` value is left out of the key.
    pub fn param(mut self, name: &str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.params.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Parameters as `(name, value)` pairs for a query string.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn under(&self, prefix: &str) -> bool {
        self.endpoint == prefix
            || self
                .endpoint
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[derive(Debug, Clone)]
pub struct CachedValue {
    pub value: Value,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CachedValue>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> anyhow::Result<Option<T>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(cached) => Ok(Some(serde_json::from_value(cached.value.clone())?)),
            None => Ok(None),
        }
    }

    pub async fn insert<T: Serialize>(&self, key: QueryKey, value: &T) -> anyhow::Result<()> {
        let cached = CachedValue {
            value: serde_json::to_value(value)?,
            fetched_at: Utc::now(),
        };
        self.entries.write().await.insert(key, cached);
        Ok(())
    }

    /// Returns the cached value or runs `fetch` and stores its result. A
    /// failed fetch stores nothing.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<anyhow::Error>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(&key).await? {
            return Ok(hit);
        }

        let fresh = fetch().await?;
        self.insert(key, &fresh).await?;
        Ok(fresh)
    }

    pub async fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|cached| cached.fetched_at)
    }

    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Drops every key whose endpoint is `prefix` or lives below it, e.g.
    /// `/api/payroll` also drops `/api/payroll/12/additions`.
    pub async fn invalidate_endpoint(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.under(prefix));
        let removed = before - entries.len();
        debug!("invalidated {removed} cached queries under {prefix}");
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
