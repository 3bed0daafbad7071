//! Merging of every meter file in a directory into one [`Dataset`].
//!
//! A file that cannot be parsed, or that yields no valid rows, is recorded
//! in the skip list and the remaining files are still loaded.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{Dataset, SkipReason, SkippedSource};
use tracing::{debug, error, info, warn};

use crate::parser::RecordParser;
use crate::reader::{find_source_files, source_id_for};

/// Row counts for a file that contributed readings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSource {
    pub source_id: String,
    pub path: PathBuf,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

/// The merged dataset plus an account of every candidate file.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub dataset: Dataset,
    /// Files that contributed readings, in discovery order.
    pub loaded: Vec<LoadedSource>,
    /// Files left out, in discovery order.
    pub skipped: Vec<SkippedSource>,
}

impl BuildOutcome {
    /// Number of candidate files considered.
    pub fn candidates(&self) -> usize {
        self.loaded.len() + self.skipped.len()
    }
}

/// Runs [`RecordParser`] over each candidate file and concatenates results.
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    parser: RecordParser,
}

impl DatasetBuilder {
    pub fn new(parser: RecordParser) -> Self {
        Self { parser }
    }

    /// Load every meter file directly inside `data_path`.
    ///
    /// # Errors
    ///
    /// [`DashboardError::EmptyDataset`] when no reading was retained, either
    /// because there were no candidate files or because every file was
    /// skipped.
    pub fn build(&self, data_path: &Path) -> Result<BuildOutcome> {
        let files = find_source_files(data_path);
        if files.is_empty() {
            warn!("No meter files found in {}", data_path.display());
        }
        self.build_from_files(&files)
    }

    /// Load `files` in the given order.
    pub fn build_from_files(&self, files: &[PathBuf]) -> Result<BuildOutcome> {
        let mut outcome = BuildOutcome {
            dataset: Dataset::new(),
            loaded: Vec::new(),
            skipped: Vec::new(),
        };
        let mut seen_ids: HashSet<String> = HashSet::new();

        for path in files {
            let source_id = source_id_for(path);
            if !seen_ids.insert(source_id.clone()) {
                warn!(
                    "Source id {} appears in more than one file; readings will be merged",
                    source_id
                );
            }

            let parsed = match self.parser.parse_file(path, &source_id) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    error!("Corrupted file skipped: {} ({})", path.display(), reason);
                    outcome.skipped.push(SkippedSource { source_id, reason });
                    continue;
                }
            };

            if parsed.readings.is_empty() {
                warn!(
                    "File skipped: {} ({} rows, none valid)",
                    path.display(),
                    parsed.rows_read
                );
                outcome.skipped.push(SkippedSource {
                    source_id,
                    reason: SkipReason::NoValidRows,
                });
                continue;
            }

            info!(
                "File loaded: {} ({} readings, {} rows dropped)",
                path.display(),
                parsed.readings.len(),
                parsed.rows_dropped
            );
            outcome.loaded.push(LoadedSource {
                source_id,
                path: path.clone(),
                rows_kept: parsed.readings.len(),
                rows_dropped: parsed.rows_dropped,
            });
            outcome.dataset.append(parsed.readings);
        }

        debug!(
            "Merged {} readings from {} of {} files",
            outcome.dataset.len(),
            outcome.loaded.len(),
            files.len()
        );

        if outcome.dataset.is_empty() {
            return Err(DashboardError::EmptyDataset {
                candidates: files.len(),
                skipped: outcome.skipped.len(),
            });
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn valid_body(rows: &[(&str, f64)]) -> String {
        let mut body = String::from("timestamp,kwh\n");
        for (ts, v) in rows {
            body.push_str(&format!("{},{}\n", ts, v));
        }
        body
    }

    #[test]
    fn test_build_merges_in_discovery_then_row_order() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "b_hostel.csv",
            &valid_body(&[("2024-01-02 00:00:00", 3.0), ("2024-01-01 00:00:00", 4.0)]),
        );
        write_file(
            dir.path(),
            "a_library.csv",
            &valid_body(&[("2024-01-03 00:00:00", 1.0), ("2024-01-01 00:00:00", 2.0)]),
        );

        let outcome = DatasetBuilder::default().build(dir.path()).unwrap();

        let got: Vec<(&str, f64)> = outcome
            .dataset
            .iter()
            .map(|r| (r.source_id.as_str(), r.value))
            .collect();
        assert_eq!(
            got,
            vec![
                ("a_library", 1.0),
                ("a_library", 2.0),
                ("b_hostel", 3.0),
                ("b_hostel", 4.0)
            ]
        );
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.candidates(), 2);
    }

    #[test]
    fn test_size_equals_sum_of_valid_rows() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "a.csv",
            "timestamp,kwh\n2024-01-01 00:00:00,1\nbad,2\n2024-01-01 01:00:00,3\n",
        );
        write_file(
            dir.path(),
            "b.csv",
            &valid_body(&[("2024-01-01 00:00:00", 5.0)]),
        );

        let outcome = DatasetBuilder::default().build(dir.path()).unwrap();
        assert_eq!(outcome.dataset.len(), 3);
        let kept: usize = outcome.loaded.iter().map(|l| l.rows_kept).sum();
        assert_eq!(kept, outcome.dataset.len());
        assert_eq!(outcome.loaded[0].rows_dropped, 1);
    }

    #[test]
    fn test_corrupt_file_does_not_affect_others() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "broken.csv", "timestamp,kwh\n2024-01-01 00:00:00,1,2,3\n");
        write_file(
            dir.path(),
            "library.csv",
            &valid_body(&[("2024-01-01 00:00:00", 10.0)]),
        );
        write_file(
            dir.path(),
            "lab.csv",
            &valid_body(&[("2024-01-01 00:00:00", 5.0), ("2024-01-02 00:00:00", 6.0)]),
        );

        let outcome = DatasetBuilder::default().build(dir.path()).unwrap();

        assert_eq!(outcome.dataset.len(), 3);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].source_id, "broken");
        assert!(matches!(outcome.skipped[0].reason, SkipReason::Malformed(_)));
    }

    #[test]
    fn test_one_corrupt_one_valid_single_row() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("corrupt.csv"), b"\xff\xfe\x00garbage").unwrap();
        write_file(
            dir.path(),
            "valid.csv",
            &valid_body(&[("2024-01-01 08:00:00", 1.5)]),
        );

        let outcome = DatasetBuilder::default().build(dir.path()).unwrap();
        assert_eq!(outcome.dataset.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].source_id, "corrupt");
    }

    #[test]
    fn test_file_without_valid_rows_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "empty_rows.csv", "timestamp,kwh\nnope,1\n");
        write_file(dir.path(), "ok.csv", &valid_body(&[("2024-01-01 00:00:00", 1.0)]));

        let outcome = DatasetBuilder::default().build(dir.path()).unwrap();
        assert_eq!(
            outcome.skipped,
            vec![SkippedSource {
                source_id: "empty_rows".to_string(),
                reason: SkipReason::NoValidRows,
            }]
        );
    }

    #[test]
    fn test_missing_column_recorded_as_reason() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "weather.csv", "timestamp,temp\n2024-01-01 00:00:00,4\n");
        write_file(dir.path(), "ok.csv", &valid_body(&[("2024-01-01 00:00:00", 1.0)]));

        let outcome = DatasetBuilder::default().build(dir.path()).unwrap();
        assert_eq!(
            outcome.skipped[0].reason,
            SkipReason::MissingColumn("kwh".to_string())
        );
    }

    #[test]
    fn test_all_files_corrupt_is_empty_dataset() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", "");
        write_file(dir.path(), "b.csv", "timestamp,kwh\nbad,bad\n");

        let err = DatasetBuilder::default().build(dir.path()).unwrap_err();
        match err {
            DashboardError::EmptyDataset {
                candidates,
                skipped,
            } => {
                assert_eq!(candidates, 2);
                assert_eq!(skipped, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_directory_is_empty_dataset() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "notes.txt", "not a meter file");

        let err = DatasetBuilder::default().build(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::EmptyDataset {
                candidates: 0,
                skipped: 0
            }
        ));
    }

    #[test]
    fn test_build_from_files_respects_given_order() {
        let dir = TempDir::new().unwrap();
        let z = write_file(dir.path(), "z.csv", &valid_body(&[("2024-01-01 00:00:00", 1.0)]));
        let a = write_file(dir.path(), "a.csv", &valid_body(&[("2024-01-01 00:00:00", 2.0)]));

        let outcome = DatasetBuilder::default().build_from_files(&[z, a]).unwrap();
        let ids: Vec<&str> = outcome.dataset.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
    }
}
