//! # Aggregation Engine
//! Read-only summaries over a [`FilteredView`]: mentions per day, per-source and
//! per-tonality counts with percentages, top-N sources and recent-N mentions.
//!
//! Nothing here fails. An empty view produces empty results, which callers
//! report as "no data for this selection".

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::filter::FilteredView;
use crate::ingest::types::{Mention, Timestamp, Tonality};

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_RECENT_N: usize = 5;

/// One bucket of a categorical breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub label: String,
    pub count: usize,
    /// `100 * count / total` of the filtered view.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Trimmed mention for "latest coverage" lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentMention {
    pub published: Option<Timestamp>,
    pub title: String,
    pub source: String,
}

/// Mentions per calendar date, ascending. Undated mentions are skipped.
pub fn time_series(view: &FilteredView<'_>) -> Vec<DailyCount> {
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in view.iter().filter_map(Mention::published_date) {
        *by_day.entry(date).or_default() += 1;
    }
    by_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Count by `key`, ordered by count desc then label asc.
fn breakdown<'a, F>(view: &FilteredView<'a>, key: F) -> Vec<CategoryShare>
where
    F: Fn(&'a Mention) -> &'a str,
{
    let total = view.len();
    if total == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for m in view.iter() {
        *counts.entry(key(m)).or_default() += 1;
    }

    let mut out: Vec<CategoryShare> = counts
        .into_iter()
        .map(|(label, count)| CategoryShare {
            label: label.to_string(),
            count,
            percent: 100.0 * count as f64 / total as f64,
        })
        .collect();
    out.sort_by(rank_order);
    out
}

fn rank_order(a: &CategoryShare, b: &CategoryShare) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label))
}

pub fn source_breakdown(view: &FilteredView<'_>) -> Vec<CategoryShare> {
    breakdown(view, |m| m.source.as_str())
}

pub fn tonality_breakdown(view: &FilteredView<'_>) -> Vec<CategoryShare> {
    breakdown(view, |m| m.tonality.as_str())
}

/// The `n` most frequent sources; ties go to the lexicographically smaller name.
pub fn top_sources(view: &FilteredView<'_>, n: usize) -> Vec<CategoryShare> {
    let mut ranked = source_breakdown(view);
    ranked.truncate(n);
    ranked
}

/// Newest-first ordering with undated mentions last.
fn newest_first(a: &Mention, b: &Mention) -> Ordering {
    match (a.published, b.published) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort mentions newest first (stable; undated at the end).
pub(crate) fn sorted_newest_first<'a>(view: &FilteredView<'a>) -> Vec<&'a Mention> {
    let mut out: Vec<&Mention> = view.iter().collect();
    out.sort_by(|a, b| newest_first(a, b));
    out
}

/// Latest `n` mentions with the given tonality.
pub fn recent_mentions(view: &FilteredView<'_>, tonality: &Tonality, n: usize) -> Vec<RecentMention> {
    let mut matching: Vec<&Mention> = view.iter().filter(|m| &m.tonality == tonality).collect();
    matching.sort_by(|a, b| newest_first(a, b));
    matching
        .into_iter()
        .take(n)
        .map(|m| RecentMention {
            published: m.published,
            title: m.title.clone(),
            source: m.source.clone(),
        })
        .collect()
}

/// Every summary the dashboard shows, computed once from one filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub total: usize,
    pub no_data: bool,
    pub time_series: Vec<DailyCount>,
    pub sources: Vec<CategoryShare>,
    pub tonalities: Vec<CategoryShare>,
    pub top_sources: Vec<CategoryShare>,
    /// Keyed by tonality label (`Positive`, `Neutral`, `Negative`).
    pub recent: BTreeMap<String, Vec<RecentMention>>,
}

impl AggregationResult {
    pub fn compute(view: &FilteredView<'_>, top_n: usize, recent_n: usize) -> Self {
        let recent = Tonality::KNOWN
            .iter()
            .map(|t| (t.to_string(), recent_mentions(view, t, recent_n)))
            .collect();

        Self {
            total: view.len(),
            no_data: view.is_empty(),
            time_series: time_series(view),
            sources: source_breakdown(view),
            tonalities: tonality_breakdown(view),
            top_sources: top_sources(view, top_n),
            recent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn mention(source: &str, tonality: Tonality, ts: Option<(u32, u32)>) -> Mention {
        Mention {
            published: ts.map(|(day, hour)| Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap().fixed_offset()),
            source: source.into(),
            tonality,
            title: format!("{source}{ts:?}"),
            summary: String::new(),
            link: String::new(),
        }
    }

    #[test]
    fn breakdown_orders_by_count_then_label() {
        let ms = vec![
            mention("C", Tonality::Neutral, None),
            mention("B", Tonality::Neutral, None),
            mention("A", Tonality::Neutral, None),
            mention("C", Tonality::Neutral, None),
        ];
        let view: FilteredView = ms.iter().collect();
        let labels: Vec<_> = source_breakdown(&view).into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["C", "A", "B"]);
    }

    #[test]
    fn empty_view_yields_empty_results() {
        let view = FilteredView::default();
        let r = AggregationResult::compute(&view, 5, 5);
        assert!(r.no_data);
        assert_eq!(r.total, 0);
        assert!(r.time_series.is_empty());
        assert!(r.sources.is_empty());
        assert!(r.tonalities.is_empty());
        assert!(r.top_sources.is_empty());
        assert!(r.recent.values().all(Vec::is_empty));
    }

    #[test]
    fn time_series_buckets_by_date_not_timestamp() {
        let ms = vec![
            mention("A", Tonality::Neutral, Some((2, 8))),
            mention("A", Tonality::Neutral, Some((1, 9))),
            mention("A", Tonality::Neutral, Some((2, 23))),
            mention("A", Tonality::Neutral, None),
        ];
        let view: FilteredView = ms.iter().collect();
        let ts = time_series(&view);
        assert_eq!(ts.len(), 2);
        assert_eq!(ts[0].count, 1);
        assert_eq!(ts[1].count, 2);
        assert!(ts[0].date < ts[1].date);
    }

    #[test]
    fn time_series_buckets_offset_timestamps_by_their_own_date() {
        let plus3 = FixedOffset::east_opt(3 * 3600).unwrap();
        let mut early = mention("A", Tonality::Neutral, None);
        early.published = Some(plus3.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap());
        let ms = vec![early, mention("A", Tonality::Neutral, Some((2, 12)))];
        let view: FilteredView = ms.iter().collect();
        let ts = time_series(&view);
        assert_eq!(
            ts,
            vec![DailyCount {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                count: 2,
            }]
        );
    }

    #[test]
    fn recent_puts_undated_last_and_limits() {
        let ms = vec![
            mention("A", Tonality::Positive, None),
            mention("B", Tonality::Positive, Some((1, 0))),
            mention("C", Tonality::Positive, Some((3, 0))),
            mention("D", Tonality::Negative, Some((4, 0))),
        ];
        let view: FilteredView = ms.iter().collect();
        let r = recent_mentions(&view, &Tonality::Positive, 5);
        let srcs: Vec<_> = r.iter().map(|m| m.source.as_str()).collect();
        assert_eq!(srcs, vec!["C", "B", "A"]);

        assert_eq!(recent_mentions(&view, &Tonality::Positive, 1).len(), 1);
    }
}
