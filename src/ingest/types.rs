// src/ingest/types.rs
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// One raw feed row: column name -> raw cell text.
pub type RawRow = HashMap<String, String>;

/// Publication time with the offset it was written in.
pub type Timestamp = DateTime<FixedOffset>;

/// Columns a feed must carry; `summary` and `link` are optional.
pub const REQUIRED_COLUMNS: [&str; 4] = ["published", "source", "tonality", "title"];

/// Sentiment classification of a mention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tonality {
    Positive,
    Neutral,
    Negative,
    /// Any other raw value, kept verbatim.
    Other(String),
}

impl Tonality {
    pub const KNOWN: [Tonality; 3] = [Tonality::Positive, Tonality::Neutral, Tonality::Negative];

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Positive" => Tonality::Positive,
            "Neutral" => Tonality::Neutral,
            "Negative" => Tonality::Negative,
            _ => Tonality::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Tonality::Positive => "Positive",
            Tonality::Neutral => "Neutral",
            Tonality::Negative => "Negative",
            Tonality::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Tonality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Tonality {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Tonality {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Tonality::parse(&raw))
    }
}

/// A normalized media mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub published: Option<Timestamp>,
    pub source: String,
    pub tonality: Tonality,
    pub title: String,
    pub summary: String,
    pub link: String,
}

impl Mention {
    /// Calendar date of `published` in its own offset, if known.
    pub fn published_date(&self) -> Option<NaiveDate> {
        self.published.map(|ts| ts.date_naive())
    }
}

/// Immutable, cheaply clonable sequence of mentions in feed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    mentions: Arc<[Mention]>,
}

impl Dataset {
    pub fn new(mentions: Vec<Mention>) -> Self {
        Self {
            mentions: mentions.into(),
        }
    }

    pub fn mentions(&self) -> &[Mention] {
        &self.mentions
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    /// Sorted, de-duplicated source names.
    pub fn distinct_sources(&self) -> Vec<String> {
        self.mentions
            .iter()
            .map(|m| m.source.as_str())
            .filter(|s| !s.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Earliest and latest known publication dates.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.mentions.iter().filter_map(Mention::published_date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

impl From<Vec<Mention>> for Dataset {
    fn from(v: Vec<Mention>) -> Self {
        Dataset::new(v)
    }
}

/// Retrieval parameters a dataset is cached under (e.g. the feed URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RetrievalKey(String);

impl RetrievalKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RetrievalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("feed request failed: {0}")]
    Http(String),
    #[error("feed returned HTTP {0}")]
    Status(u16),
    #[error("feed is not valid delimited text: {0}")]
    Csv(String),
    #[error("feed is missing required column `{0}`")]
    MissingColumn(&'static str),
    #[error("feed returned no data")]
    Empty,
}

impl From<csv::Error> for RetrievalError {
    fn from(e: csv::Error) -> Self {
        RetrievalError::Csv(e.to_string())
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => RetrievalError::Status(status.as_u16()),
            None => RetrievalError::Http(e.to_string()),
        }
    }
}

/// Anything that can produce raw feed rows for a retrieval key.
#[async_trait::async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch(&self, key: &RetrievalKey) -> Result<Vec<RawRow>, RetrievalError>;
    fn name(&self) -> &'static str;
}
