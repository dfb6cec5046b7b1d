//! # Dataset Cache
//! Keeps the normalized dataset per retrieval key for the process lifetime.
//!
//! The first `load` for a key fetches and normalizes; later loads return the
//! stored dataset without touching the row source. Entries never expire on
//! their own: a changed upstream stays invisible until `invalidate`/`clear`
//! is called or a different key is used.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use tokio::sync::Mutex;

use crate::ingest::types::{Dataset, RetrievalError, RetrievalKey, RowSource};
use crate::ingest::{ensure_metrics_described, fetch_and_normalize};

pub struct DatasetCache {
    source: Arc<dyn RowSource>,
    // Held across the fetch so concurrent loads of one key fetch once.
    entries: Mutex<HashMap<RetrievalKey, Dataset>>,
}

impl DatasetCache {
    pub fn new(source: Arc<dyn RowSource>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached dataset for `key`, fetching it on first use.
    /// Failures are not cached; the next load retries the fetch.
    pub async fn load(&self, key: &RetrievalKey) -> Result<Dataset, RetrievalError> {
        ensure_metrics_described();

        let mut entries = self.entries.lock().await;
        if let Some(ds) = entries.get(key) {
            counter!("cache_hits_total").increment(1);
            return Ok(ds.clone());
        }

        counter!("cache_misses_total").increment(1);
        let ds = fetch_and_normalize(self.source.as_ref(), key).await?;
        entries.insert(key.clone(), ds.clone());
        tracing::info!(target: "cache", %key, rows = ds.len(), "dataset cached");
        Ok(ds)
    }

    /// Drop the entry for `key`; returns whether one was present.
    pub async fn invalidate(&self, key: &RetrievalKey) -> bool {
        let removed = self.entries.lock().await.remove(key).is_some();
        tracing::info!(target: "cache", %key, removed, "dataset invalidated");
        removed
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn contains(&self, key: &RetrievalKey) -> bool {
        self.entries.lock().await.contains_key(key)
    }
}
