//! # Report Exporter
//! Serializes a filtered view as UTF-8 CSV, newest first.


use crate::aggregate::sorted_newest_first;
use crate::filter::FilteredView;
use crate::ingest::types::Timestamp;

pub const EXPORT_HEADER: [&str; 6] = ["published", "source", "tonality", "title", "summary", "link"];

/// Timestamp layout used in exports; re-ingestible by the normalizer.
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

fn format_published(ts: Option<Timestamp>) -> String {
    ts.map(|t| t.format(EXPORT_TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// CSV bytes for `view` with a fixed header row. Fields containing the
/// delimiter, quotes or line breaks are quoted.
pub fn to_delimited(view: &FilteredView<'_>) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    wtr.write_record(EXPORT_HEADER)?;
    for m in sorted_newest_first(view) {
        let published = format_published(m.published);
        wtr.write_record([
            published.as_str(),
            m.source.as_str(),
            m.tonality.as_str(),
            m.title.as_str(),
            m.summary.as_str(),
            m.link.as_str(),
        ])?;
    }

    wtr.into_inner().map_err(|e| e.into_error().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{Mention, Tonality};
    use chrono::{TimeZone, Utc};

    fn mention(title: &str, day: Option<u32>) -> Mention {
        Mention {
            published: day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 7, 5, 0).unwrap().fixed_offset()),
            source: "Daily".into(),
            tonality: Tonality::Neutral,
            title: title.into(),
            summary: String::new(),
            link: String::new(),
        }
    }

    #[test]
    fn header_only_for_empty_view() {
        let out = to_delimited(&FilteredView::default()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "published,source,tonality,title,summary,link\n"
        );
    }

    #[test]
    fn rows_newest_first_with_blank_unknown_date() {
        let ms = vec![mention("old", Some(1)), mention("undated", None), mention("new", Some(9))];
        let view: FilteredView = ms.iter().collect();
        let text = String::from_utf8(to_delimited(&view).unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[1], "2024-01-09 07:05:00+00:00,Daily,Neutral,new,,");
        assert_eq!(lines[2], "2024-01-01 07:05:00+00:00,Daily,Neutral,old,,");
        assert_eq!(lines[3], ",Daily,Neutral,undated,,");
    }

    #[test]
    fn quotes_commas_and_newlines() {
        let ms = vec![mention("a, \"b\"\nc", Some(1))];
        let view: FilteredView = ms.iter().collect();
        let text = String::from_utf8(to_delimited(&view).unwrap()).unwrap();
        assert!(text.contains("\"a, \"\"b\"\"\nc\""));
    }
}
