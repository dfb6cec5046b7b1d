// src/lib.rs
// Public library surface for the service binary, the CLI and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod export;
pub mod filter;
pub mod ingest;
pub mod metrics;
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::AggregationResult;
pub use crate::api::{router, AppState};
pub use crate::filter::{select, DateRange, FilterCriteria, FilteredView};
pub use crate::ingest::cache::DatasetCache;
pub use crate::ingest::types::{Dataset, Mention, RetrievalError, RetrievalKey, RowSource, Tonality};
pub use crate::notify::{NotificationDispatcher, SendError};
