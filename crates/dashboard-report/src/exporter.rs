//! Export of the cleaned dataset, the summary table and the text report.
//!
//! Every artifact is attempted independently; a failure is logged and
//! recorded in the [`ExportReport`] while the remaining artifacts are still
//! written.

use std::fmt::Write as _;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::formatting::{format_energy, format_number, percentage};
use dashboard_core::models::{Dataset, SkippedSource, SourceSummary};
use dashboard_data::aggregator::Aggregates;
use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::charts::{ChartRenderer, ChartRequest};

pub const CLEANED_DATA_FILE: &str = "cleaned_energy_data.csv";
pub const SUMMARY_TABLE_FILE: &str = "building_summary.csv";
pub const TEXT_REPORT_FILE: &str = "summary.txt";

// ── Report input / outcome ────────────────────────────────────────────────────

/// Everything the exporter reads. Nothing here is mutated.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub dataset: &'a Dataset,
    pub aggregates: &'a Aggregates,
    /// Files left out during loading, listed in the text report.
    pub skipped: &'a [SkippedSource],
}

/// Result of producing one artifact.
#[derive(Debug)]
pub struct ArtifactOutcome {
    /// File path, or the renderer's label for the chart hand-off.
    pub artifact: String,
    pub result: Result<()>,
}

impl ArtifactOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-artifact results of one export pass, in the order attempted.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub outcomes: Vec<ArtifactOutcome>,
}

impl ExportReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| o.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(ArtifactOutcome::is_ok)
    }

    fn record(&mut self, artifact: String, result: Result<()>) {
        match &result {
            Ok(()) => info!("Exported {}", artifact),
            Err(e) => error!("Export failed for {}: {}", artifact, e),
        }
        let result = result.map_err(|e| e.for_artifact(artifact.clone()));
        self.outcomes.push(ArtifactOutcome { artifact, result });
    }
}

// ── ReportExporter ────────────────────────────────────────────────────────────

/// Writes the report artifacts into one output directory and hands the
/// chart set to a [`ChartRenderer`].
pub struct ReportExporter<'r> {
    output_dir: PathBuf,
    renderer: &'r dyn ChartRenderer,
}

impl<'r> ReportExporter<'r> {
    pub fn new(output_dir: impl Into<PathBuf>, renderer: &'r dyn ChartRenderer) -> Self {
        Self {
            output_dir: output_dir.into(),
            renderer,
        }
    }

    /// Produce every artifact. Never fails as a whole; inspect the returned
    /// [`ExportReport`] for per-artifact errors.
    pub fn export(&self, input: &ReportInput<'_>) -> ExportReport {
        let mut report = ExportReport::default();

        let path = self.output_dir.join(CLEANED_DATA_FILE);
        let result = write_file(&path, |w| write_cleaned_dataset(input.dataset, w));
        report.record(path.display().to_string(), result);

        let path = self.output_dir.join(SUMMARY_TABLE_FILE);
        let result = write_file(&path, |w| {
            write_summary_table(&input.aggregates.summaries, w)
        });
        report.record(path.display().to_string(), result);

        let path = self.output_dir.join(TEXT_REPORT_FILE);
        let result = render_text_report(input).and_then(|text| {
            write_file(&path, |w| {
                w.write_all(text.as_bytes())?;
                Ok(())
            })
        });
        report.record(path.display().to_string(), result);

        let request = ChartRequest {
            daily: &input.aggregates.daily,
            weekly: &input.aggregates.weekly,
            readings: input.dataset,
        };
        report.record(self.renderer.label(), self.renderer.render(&request));

        report
    }
}

// ── Artifact writers ──────────────────────────────────────────────────────────

/// Stream an artifact into a temporary file beside `path`, then rename it
/// into place. A failed write leaves any previous `path` untouched.
pub(crate) fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<NamedTempFile>) -> Result<()>,
{
    let write_err = |source: io::Error| DashboardError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    let mut out = BufWriter::new(tmp);
    write(&mut out)?;
    let tmp = out.into_inner().map_err(|e| write_err(e.into_error()))?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Write the merged dataset as CSV: `source_id,timestamp,value`, one row per
/// reading in dataset order, timestamps in RFC 3339.
pub fn write_cleaned_dataset(dataset: &Dataset, writer: impl io::Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(["source_id", "timestamp", "value"])?;
    for reading in dataset {
        wtr.serialize(reading)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the per-source summary as CSV: `source_id,mean,min,max,sum`.
pub fn write_summary_table(summaries: &[SourceSummary], writer: impl io::Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(["source_id", "mean", "min", "max", "sum"])?;
    for summary in summaries {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;
    Ok(())
}

/// The source with the largest `sum`. Ties go to the first in iteration
/// order.
///
/// # Errors
///
/// [`DashboardError::NoSummaryData`] when `summaries` is empty.
pub fn highest_consumer(summaries: &[SourceSummary]) -> Result<&SourceSummary> {
    let (first, rest) = summaries.split_first().ok_or(DashboardError::NoSummaryData)?;
    Ok(rest
        .iter()
        .fold(first, |best, s| if s.sum > best.sum { s } else { best }))
}

/// Build the plain-text summary report.
///
/// # Errors
///
/// [`DashboardError::NoSummaryData`] when the summary table is empty.
pub fn render_text_report(input: &ReportInput<'_>) -> Result<String> {
    let summaries = &input.aggregates.summaries;
    let top = highest_consumer(summaries)?;
    let total = input.aggregates.total_consumption;

    let mut out = String::new();
    writeln!(out, "Campus Energy Use Summary")?;
    writeln!(out)?;
    writeln!(out, "Total Campus Consumption: {}", format_energy(total))?;
    writeln!(
        out,
        "Highest Consuming Building: {} ({})",
        top.source_id,
        format_energy(top.sum)
    )?;
    writeln!(
        out,
        "Readings: {} from {} building(s)",
        input.dataset.len(),
        summaries.len()
    )?;
    if let Some((start, end)) = input.dataset.time_range() {
        let tz = input.aggregates.timezone;
        writeln!(
            out,
            "Period: {} to {}",
            start.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
            end.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z")
        )?;
    }

    let width = summaries
        .iter()
        .map(|s| s.source_id.chars().count())
        .max()
        .unwrap_or(0)
        .max("Building".len());

    writeln!(out)?;
    writeln!(out, "Building-wise Summary:")?;
    writeln!(
        out,
        "{:<width$}  {:>12}  {:>12}  {:>12}  {:>14}  {:>6}",
        "Building", "Mean", "Min", "Max", "Sum", "Share"
    )?;
    for s in summaries {
        writeln!(
            out,
            "{:<width$}  {:>12}  {:>12}  {:>12}  {:>14}  {:>5.1}%",
            s.source_id,
            format_number(s.mean, 2),
            format_number(s.min, 2),
            format_number(s.max, 2),
            format_number(s.sum, 2),
            percentage(s.sum, total)
        )?;
    }

    if !input.skipped.is_empty() {
        writeln!(out)?;
        writeln!(out, "Skipped Files:")?;
        for skipped in input.skipped {
            writeln!(out, "  {}: {}", skipped.source_id, skipped.reason)?;
        }
    }

    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
