// src/ingest/providers/csv_http.rs
use async_trait::async_trait;
use std::time::Instant;

use crate::ingest::rows_from_csv;
use crate::ingest::types::{RawRow, RetrievalError, RetrievalKey, RowSource};

/// Fetches a delimited-text export over HTTP(S). The retrieval key is the URL.
#[derive(Clone)]
pub struct HttpCsvSource {
    client: reqwest::Client,
}

impl HttpCsvSource {
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RowSource for HttpCsvSource {
    async fn fetch(&self, key: &RetrievalKey) -> Result<Vec<RawRow>, RetrievalError> {
        let t0 = Instant::now();

        let body = self
            .client
            .get(key.as_str())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let rows = rows_from_csv(body.as_ref())?;
        tracing::debug!(
            target: "ingest",
            url = %key,
            rows = rows.len(),
            ms = t0.elapsed().as_millis() as u64,
            "feed fetched"
        );
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "http-csv"
    }
}
