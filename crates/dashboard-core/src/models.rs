use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single meter measurement read from one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Building identifier, taken from the file name without extension.
    pub source_id: String,
    /// UTC instant of the measurement.
    pub timestamp: DateTime<Utc>,
    /// Measured energy, typically kWh.
    pub value: f64,
}

impl Reading {
    pub fn new(source_id: impl Into<String>, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            source_id: source_id.into(),
            timestamp,
            value,
        }
    }
}

/// The merged collection of valid readings for one run.
///
/// Order is file-discovery order, then row order within each file. Every
/// reading has a parsed timestamp and a numeric value; the collection itself
/// may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    readings: Vec<Reading>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append all readings from one source, keeping their order.
    pub fn append(&mut self, readings: Vec<Reading>) {
        self.readings.extend(readings);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }

    /// Sum of `value` across every reading.
    pub fn total_consumption(&self) -> f64 {
        self.readings.iter().map(|r| r.value).sum()
    }

    /// Earliest and latest timestamps, or `None` when empty.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.readings.first()?.timestamp;
        Some(self.readings.iter().fold((first, first), |(lo, hi), r| {
            (lo.min(r.timestamp), hi.max(r.timestamp))
        }))
    }
}

impl From<Vec<Reading>> for Dataset {
    fn from(readings: Vec<Reading>) -> Self {
        Self { readings }
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

/// Combined consumption within one calendar bucket (day or week).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucketTotal {
    /// Start of the bucket as a UTC instant.
    pub bucket_start: DateTime<Utc>,
    /// Sum of all readings falling inside the bucket, across sources.
    pub total_value: f64,
}

/// Descriptive statistics for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source_id: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

/// Why a candidate source file contributed no readings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The file could not be opened or its bytes could not be decoded.
    #[error("unreadable: {0}")]
    Unreadable(String),
    /// The file's tabular structure is broken.
    #[error("malformed: {0}")]
    Malformed(String),
    /// The header row lacks a required column.
    #[error("missing column \"{0}\"")]
    MissingColumn(String),
    /// Every row was dropped during parsing.
    #[error("no valid rows")]
    NoValidRows,
}

/// A source file that was left out of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    pub source_id: String,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: SkipReason,
}

fn serialize_reason<S: serde::Serializer>(reason: &SkipReason, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_dataset_preserves_append_order() {
        let mut ds = Dataset::new();
        ds.append(vec![Reading::new("B", ts(2, 0), 1.0)]);
        ds.append(vec![
            Reading::new("A", ts(1, 0), 2.0),
            Reading::new("A", ts(3, 0), 3.0),
        ]);

        let ids: Vec<&str> = ds.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "A"]);
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_dataset_total_consumption() {
        let ds = Dataset::from(vec![
            Reading::new("A", ts(1, 0), 10.0),
            Reading::new("A", ts(1, 1), 5.0),
            Reading::new("B", ts(2, 0), 20.0),
        ]);
        assert!((ds.total_consumption() - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_dataset_time_range_unsorted_input() {
        let ds = Dataset::from(vec![
            Reading::new("A", ts(5, 0), 1.0),
            Reading::new("A", ts(2, 6), 1.0),
            Reading::new("B", ts(9, 23), 1.0),
        ]);
        assert_eq!(ds.time_range(), Some((ts(2, 6), ts(9, 23))));
    }

    #[test]
    fn test_empty_dataset() {
        let ds = Dataset::new();
        assert!(ds.is_empty());
        assert_eq!(ds.total_consumption(), 0.0);
        assert!(ds.time_range().is_none());
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::NoValidRows.to_string(), "no valid rows");
        assert_eq!(
            SkipReason::MissingColumn("kwh".into()).to_string(),
            "missing column \"kwh\""
        );
        assert_eq!(
            SkipReason::Malformed("found record with 3 fields".into()).to_string(),
            "malformed: found record with 3 fields"
        );
    }

    #[test]
    fn test_skipped_source_serializes_reason_as_text() {
        let skipped = SkippedSource {
            source_id: "gym".into(),
            reason: SkipReason::NoValidRows,
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["source_id"], "gym");
        assert_eq!(json["reason"], "no valid rows");
    }
}
