// src/ingest/mod.rs
pub mod cache;
pub mod providers;
pub mod types;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::ingest::types::{
    Dataset, Mention, RawRow, RetrievalError, RetrievalKey, RowSource, Timestamp, Tonality,
    REQUIRED_COLUMNS,
};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_rows_total", "Rows normalized into mentions.");
        describe_counter!(
            "ingest_unparsed_published_total",
            "Rows whose `published` value could not be parsed (kept with a null date)."
        );
        describe_counter!(
            "ingest_fetch_errors_total",
            "Row source fetch/parse failures."
        );
        describe_counter!("cache_hits_total", "Dataset cache hits.");
        describe_counter!("cache_misses_total", "Dataset cache misses (fetches).");
        describe_counter!("notify_sent_total", "Reports accepted by the mail server.");
        describe_counter!("notify_failed_total", "Report send attempts that failed.");
    });
}

const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Lenient timestamp parse. Unknown or empty input yields `None`, never an error.
/// An explicit offset is kept as written; values without one get `+00:00`.
pub fn parse_published(raw: &str) -> Option<Timestamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc().fixed_offset());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc().fixed_offset());
        }
    }
    None
}

fn cell(row: &RawRow, column: &str) -> String {
    row.get(column).cloned().unwrap_or_default()
}

/// Turn one raw row into a mention. Only `published` is interpreted; a bad value becomes `None`.
pub fn normalize_row(row: &RawRow) -> Mention {
    Mention {
        published: row.get("published").and_then(|v| parse_published(v)),
        source: cell(row, "source"),
        tonality: Tonality::parse(&cell(row, "tonality")),
        title: cell(row, "title"),
        summary: cell(row, "summary"),
        link: cell(row, "link"),
    }
}

/// Normalize rows into a dataset, preserving feed order. Rows are never dropped.
pub fn normalize_rows(rows: &[RawRow]) -> Dataset {
    ensure_metrics_described();

    let mentions: Vec<Mention> = rows.iter().map(normalize_row).collect();
    let unparsed = rows
        .iter()
        .zip(&mentions)
        .filter(|(row, m)| {
            m.published.is_none() && row.get("published").is_some_and(|v| !v.trim().is_empty())
        })
        .count();

    counter!("ingest_rows_total").increment(mentions.len() as u64);
    counter!("ingest_unparsed_published_total").increment(unparsed as u64);
    if unparsed > 0 {
        tracing::debug!(target: "ingest", unparsed, "rows with unparseable published timestamp");
    }

    Dataset::new(mentions)
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

/// Read delimited text with a header row into raw rows. Cells that are not
/// valid UTF-8 are decoded lossily rather than failing the feed.
///
/// Fails if a required column is absent from the header or the table has no data rows.
pub fn rows_from_csv<R: std::io::Read>(reader: R) -> Result<Vec<RawRow>, RetrievalError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = rdr.byte_headers()?.iter().map(lossy).collect();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(RetrievalError::MissingColumn(col));
        }
    }

    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), lossy(v)))
            .collect();
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(RetrievalError::Empty);
    }
    Ok(rows)
}

/// Fetch rows for `key` and normalize them. A fetch failure yields no partial dataset.
pub async fn fetch_and_normalize(
    source: &dyn RowSource,
    key: &RetrievalKey,
) -> Result<Dataset, RetrievalError> {
    ensure_metrics_described();

    let rows = match source.fetch(key).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(target: "ingest", error = %e, source = source.name(), %key, "row source error");
            counter!("ingest_fetch_errors_total").increment(1);
            return Err(e);
        }
    };

    let dataset = normalize_rows(&rows);
    tracing::info!(
        target: "ingest",
        source = source.name(),
        rows = dataset.len(),
        "dataset normalized"
    );
    Ok(dataset)
}
