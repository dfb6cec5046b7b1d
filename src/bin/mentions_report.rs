//! Offline report: summarize a local mentions CSV and optionally write the filtered export.
//!
//! Usage: `mentions_report <feed.csv> [start YYYY-MM-DD] [end YYYY-MM-DD] [out.csv]`

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use mention_analytics::aggregate::AggregationResult;
use mention_analytics::config::AppConfig;
use mention_analytics::export::to_delimited;
use mention_analytics::ingest::providers::fixture::StaticCsvSource;
use mention_analytics::{select, DatasetCache, DateRange, FilterCriteria, RetrievalKey};

fn parse_arg_date(arg: Option<&String>) -> Result<Option<NaiveDate>> {
    arg.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date `{s}`")))
        .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let path = args
        .first()
        .context("usage: mentions_report <feed.csv> [start] [end] [out.csv]")?;
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let config = AppConfig::load_default()?;

    let cache = DatasetCache::new(Arc::new(StaticCsvSource::from_fixture(&content)));
    let dataset = cache.load(&RetrievalKey::new(path.clone())).await?;

    let fallback = DateRange::default_for(&dataset, Utc::now().date_naive());
    let range = DateRange::new(
        parse_arg_date(args.get(1))?.unwrap_or(fallback.start),
        parse_arg_date(args.get(2))?.unwrap_or(fallback.end),
    );
    let view = select(&dataset, &FilterCriteria::new(range));

    let summary = AggregationResult::compute(&view, config.top_n, config.recent_n);
    if summary.no_data {
        tracing::warn!(start = %range.start, end = %range.end, "no data for this selection");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(out) = args.get(3) {
        std::fs::write(out, to_delimited(&view)?).with_context(|| format!("writing {out}"))?;
        tracing::info!(out = %out, rows = view.len(), "export written");
    }
    Ok(())
}
