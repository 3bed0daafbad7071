//! Batch pipeline for one dashboard run.
//!
//! Loads every meter file, aggregates the merged dataset and exports the
//! report artifacts, strictly in that order. An empty dataset stops the run
//! before aggregation, and before the output directory is touched.

use std::path::PathBuf;
use std::time::Instant;

use chrono_tz::Tz;
use dashboard_core::error::Result;
use dashboard_core::models::Dataset;
use dashboard_core::settings::Settings;
use dashboard_core::time_utils::parse_timezone;
use dashboard_data::aggregator::{Aggregates, Aggregator};
use dashboard_data::builder::{BuildOutcome, DatasetBuilder};
use dashboard_data::parser::RecordParser;
use dashboard_report::charts::ChartRenderer;
use dashboard_report::exporter::{ExportReport, ReportExporter, ReportInput};
use tracing::{debug, error, info};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Resolved inputs for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub timestamp_column: String,
    pub value_column: String,
    /// Reference calendar for naive timestamps and bucket boundaries.
    pub timezone: Tz,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("."),
            timestamp_column: "timestamp".to_string(),
            value_column: "kwh".to_string(),
            timezone: Tz::UTC,
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            data_dir: settings.data_dir.clone(),
            output_dir: settings.output_dir.clone(),
            timestamp_column: settings.timestamp_column.clone(),
            value_column: settings.value_column.clone(),
            timezone: parse_timezone(&settings.timezone)?,
        })
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Pipeline stage, reported to progress observers before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Aggregating,
    Exporting,
}

/// Timing and volume figures for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineMetadata {
    pub files_considered: usize,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub readings: usize,
    pub load_time_seconds: f64,
    pub aggregate_time_seconds: f64,
    pub export_time_seconds: f64,
}

impl PipelineMetadata {
    pub fn total_time_seconds(&self) -> f64 {
        self.load_time_seconds + self.aggregate_time_seconds + self.export_time_seconds
    }
}

/// The complete output of a successful run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub build: BuildOutcome,
    pub aggregates: Aggregates,
    pub export: ExportReport,
    pub metadata: PipelineMetadata,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Merge every meter file in the data directory.
    pub fn load(&self) -> Result<BuildOutcome> {
        let parser = RecordParser::new(
            self.config.timestamp_column.as_str(),
            self.config.value_column.as_str(),
            self.config.timezone,
        );
        DatasetBuilder::new(parser).build(&self.config.data_dir)
    }

    pub fn aggregate(&self, dataset: &Dataset) -> Aggregates {
        Aggregator::new(self.config.timezone).aggregate(dataset)
    }

    /// Write every artifact into the output directory, creating it first.
    pub fn export(&self, renderer: &dyn ChartRenderer, input: &ReportInput<'_>) -> ExportReport {
        if let Err(e) = std::fs::create_dir_all(&self.config.output_dir) {
            // Each artifact will report its own write failure.
            error!(
                "Could not create output directory {}: {}",
                self.config.output_dir.display(),
                e
            );
        }
        ReportExporter::new(&self.config.output_dir, renderer).export(input)
    }

    /// Run load → aggregate → export.
    pub fn run(&self, renderer: &dyn ChartRenderer) -> Result<PipelineOutcome> {
        self.run_with_progress(renderer, |_| {})
    }

    /// Same as [`Pipeline::run`], calling `progress` as each stage begins.
    ///
    /// # Errors
    ///
    /// [`dashboard_core::DashboardError::EmptyDataset`] when nothing was
    /// loaded; no aggregation or export happens in that case. Export
    /// failures are not errors here; see [`PipelineOutcome::export`].
    pub fn run_with_progress(
        &self,
        renderer: &dyn ChartRenderer,
        mut progress: impl FnMut(Stage),
    ) -> Result<PipelineOutcome> {
        info!("Loading meter files from {}", self.config.data_dir.display());
        progress(Stage::Loading);
        let load_start = Instant::now();
        let build = self.load().map_err(|e| {
            error!("Failed to load dataset: {}", e);
            e
        })?;
        let load_time = load_start.elapsed().as_secs_f64();

        progress(Stage::Aggregating);
        let aggregate_start = Instant::now();
        let aggregates = self.aggregate(&build.dataset);
        let aggregate_time = aggregate_start.elapsed().as_secs_f64();

        progress(Stage::Exporting);
        let export_start = Instant::now();
        let export = self.export(
            renderer,
            &ReportInput {
                dataset: &build.dataset,
                aggregates: &aggregates,
                skipped: &build.skipped,
            },
        );
        let export_time = export_start.elapsed().as_secs_f64();

        let metadata = PipelineMetadata {
            files_considered: build.candidates(),
            files_loaded: build.loaded.len(),
            files_skipped: build.skipped.len(),
            readings: build.dataset.len(),
            load_time_seconds: load_time,
            aggregate_time_seconds: aggregate_time,
            export_time_seconds: export_time,
        };
        debug!("Pipeline metadata: {:?}", metadata);

        Ok(PipelineOutcome {
            build,
            aggregates,
            export,
            metadata,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::error::DashboardError;
    use dashboard_report::charts::{ChartDataWriter, CHART_DATA_FILE};
    use dashboard_report::exporter::{
        highest_consumer, CLEANED_DATA_FILE, SUMMARY_TABLE_FILE, TEXT_REPORT_FILE,
    };
    use std::path::Path;
    use tempfile::TempDir;

    struct Dirs {
        _root: TempDir,
        data: PathBuf,
        out: PathBuf,
    }

    fn dirs() -> Dirs {
        let root = TempDir::new().unwrap();
        let data = root.path().join("data");
        let out = root.path().join("out");
        std::fs::create_dir_all(&data).unwrap();
        Dirs {
            _root: root,
            data,
            out,
        }
    }

    fn config(d: &Dirs) -> PipelineConfig {
        PipelineConfig {
            data_dir: d.data.clone(),
            output_dir: d.out.clone(),
            ..PipelineConfig::default()
        }
    }

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_run_two_building_scenario() {
        let d = dirs();
        write(
            &d.data,
            "A.csv",
            "timestamp,kwh\n2024-03-04 09:00:00,10\n2024-03-04 09:00:00,5\n",
        );
        write(&d.data, "B.csv", "timestamp,kwh\n2024-03-05 09:00:00,20\n");

        let renderer = ChartDataWriter::in_dir(&d.out);
        let outcome = Pipeline::new(config(&d)).run(&renderer).unwrap();

        assert_eq!(outcome.build.dataset.len(), 3);
        assert_eq!(outcome.aggregates.daily.len(), 2);
        assert_eq!(outcome.aggregates.daily[0].total_value, 15.0);
        assert_eq!(outcome.aggregates.daily[1].total_value, 20.0);
        assert_eq!(outcome.aggregates.total_consumption, 35.0);
        assert_eq!(
            highest_consumer(&outcome.aggregates.summaries).unwrap().source_id,
            "B"
        );
        assert!(outcome.export.all_ok());

        for name in [CLEANED_DATA_FILE, SUMMARY_TABLE_FILE, TEXT_REPORT_FILE, CHART_DATA_FILE] {
            assert!(d.out.join(name).is_file(), "{name} missing");
        }
        let report = std::fs::read_to_string(d.out.join(TEXT_REPORT_FILE)).unwrap();
        assert!(report.contains("Total Campus Consumption: 35.00 kWh"));
        assert!(report.contains("Highest Consuming Building: B"));
    }

    #[test]
    fn test_run_one_corrupt_one_valid() {
        let d = dirs();
        write(&d.data, "corrupt.csv", "timestamp,kwh\n2024-01-01,1,2,3,4\n");
        write(&d.data, "valid.csv", "timestamp,kwh\n2024-01-01 10:00:00,4.5\n");

        let renderer = ChartDataWriter::in_dir(&d.out);
        let outcome = Pipeline::new(config(&d)).run(&renderer).unwrap();

        assert_eq!(outcome.build.dataset.len(), 1);
        assert_eq!(outcome.build.skipped.len(), 1);
        assert_eq!(outcome.metadata.files_considered, 2);
        assert_eq!(outcome.metadata.files_loaded, 1);
        assert_eq!(outcome.metadata.files_skipped, 1);
        assert_eq!(outcome.metadata.readings, 1);

        let m = &outcome.metadata;
        assert!(m.load_time_seconds >= 0.0);
        assert!(m.aggregate_time_seconds >= 0.0);
        assert!(m.export_time_seconds >= 0.0);
        assert_eq!(
            m.total_time_seconds(),
            m.load_time_seconds + m.aggregate_time_seconds + m.export_time_seconds
        );
    }

    #[test]
    fn test_run_empty_directory_writes_nothing() {
        let d = dirs();
        let renderer = ChartDataWriter::in_dir(&d.out);
        let mut stages = Vec::new();

        let err = Pipeline::new(config(&d))
            .run_with_progress(&renderer, |s| stages.push(s))
            .unwrap_err();

        assert!(matches!(err, DashboardError::EmptyDataset { .. }));
        assert_eq!(stages, vec![Stage::Loading]);
        assert!(!d.out.exists(), "no artifacts may be written");
    }

    #[test]
    fn test_run_all_corrupt_is_empty_dataset() {
        let d = dirs();
        write(&d.data, "a.csv", "volts,amps\n1,2\n");
        write(&d.data, "b.csv", "timestamp,kwh\nyesterday,lots\n");

        let renderer = ChartDataWriter::in_dir(&d.out);
        let err = Pipeline::new(config(&d)).run(&renderer).unwrap_err();

        assert!(matches!(
            err,
            DashboardError::EmptyDataset {
                candidates: 2,
                skipped: 2
            }
        ));
        assert!(!d.out.exists());
    }

    #[test]
    fn test_run_reports_stages_in_order() {
        let d = dirs();
        write(&d.data, "a.csv", "timestamp,kwh\n2024-01-01 00:00:00,1\n");

        let renderer = ChartDataWriter::in_dir(&d.out);
        let mut stages = Vec::new();
        Pipeline::new(config(&d))
            .run_with_progress(&renderer, |s| stages.push(s))
            .unwrap();

        assert_eq!(
            stages,
            vec![Stage::Loading, Stage::Aggregating, Stage::Exporting]
        );
    }

    #[test]
    fn test_run_uses_configured_columns_and_timezone() {
        let d = dirs();
        write(
            &d.data,
            "hall.csv",
            "time,energy\n2024-01-01 23:30:00,1\n2024-01-02 00:30:00,2\n",
        );

        let cfg = PipelineConfig {
            timestamp_column: "time".into(),
            value_column: "energy".into(),
            timezone: Tz::Asia__Kolkata,
            ..config(&d)
        };
        let renderer = ChartDataWriter::in_dir(&d.out);
        let outcome = Pipeline::new(cfg).run(&renderer).unwrap();

        // Both naive times are local to Kolkata, so they land on two local days.
        assert_eq!(outcome.aggregates.daily.len(), 2);
        assert_eq!(outcome.build.dataset.len(), 2);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings::load_from_args(
            ["energy-dashboard", "--data-dir", "meters", "--timezone", "Europe/Paris"]
                .into_iter()
                .map(std::ffi::OsString::from)
                .collect(),
        )
        .unwrap();

        let cfg = PipelineConfig::from_settings(&settings).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("meters"));
        assert_eq!(cfg.timezone, Tz::Europe__Paris);
        assert_eq!(cfg.value_column, "kwh");
    }
}
