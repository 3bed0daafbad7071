//! Parsing of a single meter file into [`Reading`]s.
//!
//! Rows with an unparseable timestamp or a missing/non-numeric value are
//! dropped silently. Structural problems (undecodable bytes, missing header
//! columns, rows wider than the header) reject the whole file.

use std::io::Read;
use std::path::Path;

use chrono_tz::Tz;
use dashboard_core::models::{Reading, SkipReason};
use dashboard_core::time_utils::TimestampProcessor;
use tracing::debug;

use crate::reader::delimiter_for;

/// Readings retained from one file plus row accounting for logs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub readings: Vec<Reading>,
    /// Data rows seen, excluding the header and blank lines.
    pub rows_read: usize,
    /// Rows dropped for a bad timestamp or value.
    pub rows_dropped: usize,
}

/// Converts delimited meter files into typed readings.
#[derive(Debug, Clone)]
pub struct RecordParser {
    timestamp_column: String,
    value_column: String,
    timestamps: TimestampProcessor,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new("timestamp", "kwh", Tz::UTC)
    }
}

impl RecordParser {
    /// Column names are matched case-insensitively after trimming.
    pub fn new(timestamp_column: impl Into<String>, value_column: impl Into<String>, tz: Tz) -> Self {
        Self {
            timestamp_column: timestamp_column.into().trim().to_string(),
            value_column: value_column.into().trim().to_string(),
            timestamps: TimestampProcessor::new(tz),
        }
    }

    /// Parse the file at `path`, tagging every reading with `source_id`.
    ///
    /// A single read attempt is made. Any failure is reported as a
    /// [`SkipReason`]; no partial result is returned for a rejected file.
    pub fn parse_file(&self, path: &Path, source_id: &str) -> Result<ParsedFile, SkipReason> {
        let delimiter = delimiter_for(path).unwrap_or(b',');
        let file = std::fs::File::open(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
        self.parse_reader(file, delimiter, source_id)
    }

    /// Parse delimited text from any reader.
    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        delimiter: u8,
        source_id: &str,
    ) -> Result<ParsedFile, SkipReason> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers().map_err(classify)?.clone();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(SkipReason::Malformed("no header row".to_string()));
        }

        let ts_idx = find_column(&headers, &self.timestamp_column)
            .ok_or_else(|| SkipReason::MissingColumn(self.timestamp_column.clone()))?;
        let value_idx = find_column(&headers, &self.value_column)
            .ok_or_else(|| SkipReason::MissingColumn(self.value_column.clone()))?;

        let mut parsed = ParsedFile::default();

        for record in rdr.records() {
            let record = record.map_err(classify)?;
            parsed.rows_read += 1;

            if record.len() > headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(SkipReason::Malformed(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    headers.len(),
                    record.len()
                )));
            }

            let timestamp = record.get(ts_idx).and_then(|s| self.timestamps.parse(s));
            let value = record.get(value_idx).and_then(parse_value);

            match (timestamp, value) {
                (Some(timestamp), Some(value)) => {
                    parsed
                        .readings
                        .push(Reading::new(source_id, timestamp, value));
                }
                _ => parsed.rows_dropped += 1,
            }
        }

        debug!(
            "Source {}: {} rows read, {} dropped, {} kept",
            source_id,
            parsed.rows_read,
            parsed.rows_dropped,
            parsed.readings.len()
        );

        Ok(parsed)
    }
}

/// Index of the header matching `name`, ignoring case, surrounding
/// whitespace and a leading byte-order mark.
fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(name))
}

/// A numeric, non-NaN value; blanks and text are treated as missing.
fn parse_value(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn classify(err: csv::Error) -> SkipReason {
    match err.kind() {
        csv::ErrorKind::Io(_) | csv::ErrorKind::Utf8 { .. } => SkipReason::Unreadable(err.to_string()),
        _ => SkipReason::Malformed(err.to_string()),
    }
}
