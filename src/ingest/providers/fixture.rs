// src/ingest/providers/fixture.rs
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ingest::rows_from_csv;
use crate::ingest::types::{RawRow, RetrievalError, RetrievalKey, RowSource};

/// In-memory delimited text, for tests and offline runs. The key is ignored.
pub struct StaticCsvSource {
    content: String,
    fetches: AtomicUsize,
}

impl StaticCsvSource {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            content: content.to_string(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// How many times `fetch` has been invoked.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowSource for StaticCsvSource {
    async fn fetch(&self, _key: &RetrievalKey) -> Result<Vec<RawRow>, RetrievalError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        rows_from_csv(self.content.as_bytes())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
