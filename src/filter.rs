//! # Filter Engine
//! Independent predicates (date range, source set, tonality set) combined by AND.
//!
//! A record with an unknown `published` date never passes the date predicate.
//! Empty source/tonality sets mean "no restriction".

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ingest::types::{Dataset, Mention, Tonality};

/// Inclusive calendar-date range. `start > end` selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Dataset's own date span, or the year up to `today` when nothing is dated.
    pub fn default_for(dataset: &Dataset, today: NaiveDate) -> Self {
        match dataset.date_bounds() {
            Some((start, end)) => Self { start, end },
            None => Self {
                start: today - Duration::days(365),
                end: today,
            },
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub date_range: DateRange,
    pub sources: BTreeSet<String>,
    pub tonalities: BTreeSet<Tonality>,
}

impl FilterCriteria {
    pub fn new(date_range: DateRange) -> Self {
        Self {
            date_range,
            sources: BTreeSet::new(),
            tonalities: BTreeSet::new(),
        }
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tonalities<I: IntoIterator<Item = Tonality>>(mut self, tonalities: I) -> Self {
        self.tonalities = tonalities.into_iter().collect();
        self
    }

    pub fn matches(&self, m: &Mention) -> bool {
        date_predicate(&self.date_range, m)
            && source_predicate(&self.sources, m)
            && tonality_predicate(&self.tonalities, m)
    }
}

pub fn date_predicate(range: &DateRange, m: &Mention) -> bool {
    m.published_date().is_some_and(|d| range.contains(d))
}

pub fn source_predicate(sources: &BTreeSet<String>, m: &Mention) -> bool {
    sources.is_empty() || sources.contains(&m.source)
}

pub fn tonality_predicate(tonalities: &BTreeSet<Tonality>, m: &Mention) -> bool {
    tonalities.is_empty() || tonalities.contains(&m.tonality)
}

/// Ordered subsequence of a dataset that passed a filter.
#[derive(Debug, Clone, Default)]
pub struct FilteredView<'a> {
    mentions: Vec<&'a Mention>,
}

impl<'a> FilteredView<'a> {
    /// The unfiltered view over a whole dataset.
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            mentions: dataset.mentions().iter().collect(),
        }
    }

    pub fn mentions(&self) -> &[&'a Mention] {
        &self.mentions
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Mention> + '_ {
        self.mentions.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }
}

impl<'a> FromIterator<&'a Mention> for FilteredView<'a> {
    fn from_iter<T: IntoIterator<Item = &'a Mention>>(iter: T) -> Self {
        Self {
            mentions: iter.into_iter().collect(),
        }
    }
}

/// Keep the mentions matching `criteria`, in dataset order.
pub fn select<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> FilteredView<'a> {
    if criteria.date_range.start > criteria.date_range.end {
        return FilteredView::default();
    }
    dataset
        .mentions()
        .iter()
        .filter(|m| criteria.matches(m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn mention(source: &str, tonality: Tonality, day: Option<u32>) -> Mention {
        Mention {
            published: day.map(|x| Utc.with_ymd_and_hms(2024, 1, x, 12, 0, 0).unwrap().fixed_offset()),
            source: source.into(),
            tonality,
            title: format!("{source}-{day:?}"),
            summary: String::new(),
            link: String::new(),
        }
    }

    #[test]
    fn date_predicate_is_inclusive_and_rejects_unknown() {
        let r = DateRange::new(d(2024, 1, 1), d(2024, 1, 2));
        assert!(date_predicate(&r, &mention("A", Tonality::Neutral, Some(1))));
        assert!(date_predicate(&r, &mention("A", Tonality::Neutral, Some(2))));
        assert!(!date_predicate(&r, &mention("A", Tonality::Neutral, Some(3))));
        assert!(!date_predicate(&r, &mention("A", Tonality::Neutral, None)));
    }

    #[test]
    fn date_range_uses_the_local_date_of_offset_timestamps() {
        let plus3 = FixedOffset::east_opt(3 * 3600).unwrap();
        let mut m = mention("A", Tonality::Neutral, None);
        m.published = Some(plus3.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap());
        let ds = Dataset::new(vec![m]);

        let jan2 = FilterCriteria::new(DateRange::new(d(2024, 1, 2), d(2024, 1, 2)));
        assert_eq!(select(&ds, &jan2).len(), 1);
        let jan1 = FilterCriteria::new(DateRange::new(d(2024, 1, 1), d(2024, 1, 1)));
        assert!(select(&ds, &jan1).is_empty());
    }

    #[test]
    fn empty_sets_do_not_restrict() {
        let m = mention("A", Tonality::Other("mixed".into()), Some(1));
        assert!(source_predicate(&BTreeSet::new(), &m));
        assert!(tonality_predicate(&BTreeSet::new(), &m));

        let known: BTreeSet<Tonality> = Tonality::KNOWN.into_iter().collect();
        assert!(!tonality_predicate(&known, &m));
    }

    #[test]
    fn reversed_range_selects_nothing() {
        let ds = Dataset::new(vec![mention("A", Tonality::Positive, Some(1))]);
        let c = FilterCriteria::new(DateRange::new(d(2025, 1, 1), d(2024, 1, 1)));
        assert!(select(&ds, &c).is_empty());
    }

    #[test]
    fn default_range_spans_dataset_or_last_year() {
        let ds = Dataset::new(vec![
            mention("A", Tonality::Positive, Some(5)),
            mention("A", Tonality::Positive, Some(2)),
        ]);
        let today = d(2026, 6, 1);
        assert_eq!(
            DateRange::default_for(&ds, today),
            DateRange::new(d(2024, 1, 2), d(2024, 1, 5))
        );
        let undated = Dataset::new(vec![mention("A", Tonality::Positive, None)]);
        assert_eq!(
            DateRange::default_for(&undated, today),
            DateRange::new(d(2025, 6, 1), today)
        );
    }

    #[test]
    fn select_preserves_order() {
        let ds = Dataset::new(vec![
            mention("B", Tonality::Negative, Some(3)),
            mention("A", Tonality::Positive, Some(1)),
            mention("B", Tonality::Positive, Some(2)),
        ]);
        let c = FilterCriteria::new(DateRange::new(d(2024, 1, 1), d(2024, 1, 31)))
            .with_sources(["B"]);
        let view = select(&ds, &c);
        let titles: Vec<_> = view.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["B-Some(3)", "B-Some(2)"]);
    }
}
