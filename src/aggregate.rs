use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::{self, DomainLabel};
use crate::error::AggregateError;
use crate::record;
use crate::stats::{DerivedTable, DomainRecord, SkippedLine, Summary};
use crate::timestamp::{parse_visit_count, parse_visit_date};

const EXCERPT_LEN: usize = 100;

/// Output of [`aggregate`]: the summary plus every line that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub summary: Summary,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Default)]
struct Fold {
    groups: BTreeMap<(DomainLabel, NaiveDate), u64>,
    skipped: Vec<SkippedLine>,
}

/// Summarizes a raw `URL,Last Visited,Visit Count` export into visits per
/// domain per day.
///
/// The first line is a header and is ignored. Lines that cannot be split into
/// three fields are skipped; unreadable visit counts count as zero; an
/// unreadable visit time aborts the whole call.
pub fn aggregate(raw_text: &str) -> Result<Aggregation, AggregateError> {
    let start_time = Instant::now();
    let lines: Vec<&str> = raw_text.trim().lines().collect();

    if lines.len() < 2 {
        info!(
            action = "skip",
            component = "aggregation",
            line_count = lines.len(),
            "No data lines to aggregate"
        );
        return Ok(Aggregation {
            summary: Summary::Empty,
            skipped: Vec::new(),
        });
    }

    let fold = lines
        .iter()
        .enumerate()
        .skip(1)
        .try_fold(Fold::default(), |mut acc, (index, line)| {
            let line_number = index + 1;
            let Some(fields) = record::recover(line) else {
                warn!(
                    action = "skip",
                    component = "aggregation",
                    line_number,
                    "Line ignored, expected URL, visit time and visit count"
                );
                acc.skipped.push(SkippedLine {
                    line: line_number,
                    excerpt: line.chars().take(EXCERPT_LEN).collect(),
                });
                return Ok(acc);
            };

            let visits = parse_visit_count(fields.visit_count).unwrap_or(0);
            let visit_date = parse_visit_date(fields.last_visited).ok_or_else(|| {
                AggregateError::InvalidTimestamp {
                    line: line_number,
                    value: fields.last_visited.to_string(),
                }
            })?;
            let domain = domain::extract(fields.url);

            let total = acc.groups.entry((domain, visit_date)).or_insert(0);
            *total = total.saturating_add(visits);
            Ok::<_, AggregateError>(acc)
        })?;

    let data_lines = lines.len() - 1;
    let records: Vec<DomainRecord> = fold
        .groups
        .into_iter()
        .map(|((domain, visit_date), total_visits)| DomainRecord {
            domain,
            visit_date,
            total_visits,
        })
        .collect();

    let summary = if records.is_empty() {
        Summary::Empty
    } else {
        Summary::Table(DerivedTable::new(records))
    };

    info!(
        action = "complete",
        component = "aggregation",
        data_lines,
        skipped_lines = fold.skipped.len(),
        summary_rows = summary.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "History aggregated"
    );

    Ok(Aggregation {
        summary,
        skipped: fold.skipped,
    })
}

/// Convenience wrapper returning the serialized summary text.
pub fn summarize(raw_text: &str) -> Result<String, AggregateError> {
    Ok(aggregate(raw_text)?.summary.to_csv()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "URL,Last Visited,Visit Count";

    fn export(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn same_day_visits_are_summed() {
        let raw = export(&[
            "https://a.com,2024-01-01T10:00:00,3",
            "https://a.com,2024-01-01T22:00:00,5",
        ]);
        assert_eq!(
            summarize(&raw).unwrap(),
            "URL,Date,Visit Count\nhttps://a.com,2024-01-01,8\n"
        );
    }

    #[test]
    fn newest_day_comes_first() {
        let raw = export(&[
            "https://big.com,2024-01-01T09:00:00,100",
            "https://small.com,2024-01-02T09:00:00,1",
        ]);
        assert_eq!(
            summarize(&raw).unwrap(),
            "URL,Date,Visit Count\nhttps://small.com,2024-01-02,1\nhttps://big.com,2024-01-01,100\n"
        );
    }

    #[test]
    fn urls_with_commas_are_grouped_by_host() {
        let raw = export(&[
            "https://example.com/a,b,c,2024-01-01T10:00:00,2",
            "https://example.com/?q=x,y,2024-01-01T11:00:00,1",
        ]);
        let aggregation = aggregate(&raw).unwrap();
        let table = aggregation.summary.table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].total_visits, 3);
        assert!(aggregation.skipped.is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped_and_reported() {
        let raw = export(&[
            "no commas here",
            "https://a.com,2024-01-01T10:00:00,3",
            "only,one",
            "https://b.com,2024-01-01T10:00:00,1",
        ]);
        let aggregation = aggregate(&raw).unwrap();
        assert_eq!(aggregation.summary.len(), 2);
        let lines: Vec<usize> = aggregation.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, [2, 4]);
        assert_eq!(aggregation.skipped[0].excerpt, "no commas here");
    }

    #[test]
    fn bad_counts_become_zero() {
        let raw = export(&[
            "https://a.com,2024-01-01T10:00:00,lots",
            "https://a.com,2024-01-01T11:00:00,",
            "https://a.com,2024-01-01T12:00:00,2",
        ]);
        let aggregation = aggregate(&raw).unwrap();
        let table = aggregation.summary.table().unwrap();
        assert_eq!(table.records()[0].total_visits, 2);
    }

    #[test]
    fn bad_timestamp_aborts() {
        let raw = export(&[
            "https://a.com,2024-01-01T10:00:00,1",
            "https://a.com,not a time,1",
        ]);
        match aggregate(&raw) {
            Err(AggregateError::InvalidTimestamp { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "not a time");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn local_and_invalid_urls() {
        let raw = export(&[
            "file:///home/user/index.html,2024-01-01T10:00:00,2",
            "file:///home/user/other.html,2024-01-01T11:00:00,2",
            "chrome-extension-garbage,2024-01-01T10:00:00,1",
        ]);
        assert_eq!(
            summarize(&raw).unwrap(),
            "URL,Date,Visit Count\nlocal_files,2024-01-01,4\nhttps://invalid_or_other,2024-01-01,1\n"
        );
    }

    #[test]
    fn row_order_does_not_change_sentinel_groups() {
        let host_first = export(&[
            "http://local_files/x,2024-01-01T10:00:00,1",
            "file:///a.html,2024-01-01T11:00:00,2",
        ]);
        let file_first = export(&[
            "file:///a.html,2024-01-01T11:00:00,2",
            "http://local_files/x,2024-01-01T10:00:00,1",
        ]);
        let expected = "URL,Date,Visit Count\nlocal_files,2024-01-01,3\n";
        assert_eq!(summarize(&host_first).unwrap(), expected);
        assert_eq!(summarize(&file_first).unwrap(), expected);
    }

    #[test]
    fn degenerate_inputs_are_empty() {
        for raw in ["", "   \n", HEADER, "URL,Last Visited,Visit Count\n"] {
            let aggregation = aggregate(raw).unwrap();
            assert_eq!(aggregation.summary, Summary::Empty);
            assert_eq!(summarize(raw).unwrap(), "");
        }
    }

    #[test]
    fn all_lines_skipped_is_empty() {
        let raw = export(&["garbage", "more garbage"]);
        let aggregation = aggregate(&raw).unwrap();
        assert_eq!(aggregation.summary, Summary::Empty);
        assert_eq!(aggregation.skipped.len(), 2);
    }

    #[test]
    fn crlf_line_endings() {
        let raw = "URL,Last Visited,Visit Count\r\nhttps://a.com,2024-01-01T10:00:00,3\r\n";
        assert_eq!(
            summarize(raw).unwrap(),
            "URL,Date,Visit Count\nhttps://a.com,2024-01-01,3\n"
        );
    }

    #[test]
    fn visit_totals_per_domain_are_preserved() {
        let raw = export(&[
            "https://a.com/1,2024-01-01T10:00:00,3",
            "https://a.com/2,2024-01-02T10:00:00,4",
            "https://b.com,2024-01-02T10:00:00,9",
            "https://a.com/3,2024-01-02T18:00:00,1",
        ]);
        let aggregation = aggregate(&raw).unwrap();
        let table = aggregation.summary.table().unwrap();
        assert_eq!(table.len(), 3);
        let a_total: u64 = table
            .records()
            .iter()
            .filter(|r| r.domain.as_str() == "a.com")
            .map(|r| r.total_visits)
            .sum();
        assert_eq!(a_total, 8);
    }
}
