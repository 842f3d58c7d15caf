use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::DomainLabel;

pub const SUMMARY_HEADER: [&str; 3] = ["URL", "Date", "Visit Count"];
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Total visits to one domain on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    pub domain: DomainLabel,
    pub visit_date: NaiveDate,
    pub total_visits: u64,
}

/// Row of the serialized summary.
#[derive(Debug, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Visit Count")]
    pub visit_count: u64,
}

impl From<&DomainRecord> for SummaryRow {
    fn from(record: &DomainRecord) -> Self {
        SummaryRow {
            url: record.domain.summary_url(),
            date: record.visit_date.format(DATE_FORMAT).to_string(),
            visit_count: record.total_visits,
        }
    }
}

/// Domain/day records, newest day first and busiest domain first within a day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedTable {
    records: Vec<DomainRecord>,
}

impl DerivedTable {
    /// Sorts `records` into table order. Equal dates and counts fall back to
    /// the domain text so output is reproducible.
    pub fn new(mut records: Vec<DomainRecord>) -> Self {
        records.sort_by(|a, b| {
            b.visit_date
                .cmp(&a.visit_date)
                .then_with(|| b.total_visits.cmp(&a.total_visits))
                .then_with(|| a.domain.cmp(&b.domain))
        });
        DerivedTable { records }
    }

    pub fn records(&self) -> &[DomainRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = SummaryRow> + '_ {
        self.records.iter().map(SummaryRow::from)
    }

    /// Visits per domain across every day, busiest first.
    pub fn domain_totals(&self) -> Vec<(&DomainLabel, u64)> {
        let mut by_domain: HashMap<&DomainLabel, u64> = HashMap::new();
        for record in &self.records {
            let total = by_domain.entry(&record.domain).or_insert(0);
            *total = total.saturating_add(record.total_visits);
        }
        let mut totals: Vec<(&DomainLabel, u64)> = by_domain.into_iter().collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        totals
    }

    /// Earliest and latest day in the table.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let latest = self.records.first()?.visit_date;
        let earliest = self.records.last()?.visit_date;
        Some((earliest, latest))
    }

    /// Writes the table as `URL,Date,Visit Count` text.
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(SUMMARY_HEADER)?;
        for row in self.rows() {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

/// Result of a successful aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// The input held no usable data lines.
    Empty,
    Table(DerivedTable),
}

impl Summary {
    pub fn table(&self) -> Option<&DerivedTable> {
        match self {
            Summary::Empty => None,
            Summary::Table(table) => Some(table),
        }
    }

    pub fn len(&self) -> usize {
        self.table().map_or(0, DerivedTable::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialized table, or an empty string for [`Summary::Empty`].
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        match self {
            Summary::Empty => Ok(String::new()),
            Summary::Table(table) => table.to_csv(),
        }
    }
}

/// A data line that could not be split into its three fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-based, counting the header.
    pub line: usize,
    pub excerpt: String,
}
