//! Hand-off of the standard chart set to a rendering collaborator.
//!
//! The dashboard never draws images itself. It builds a [`ChartRequest`]
//! (daily line, weekly bar, scatter of raw readings) and passes it to a
//! [`ChartRenderer`]. [`ChartDataWriter`] is the default collaborator: it
//! writes the three series as JSON for an external plotting tool.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dashboard_core::error::Result;
use dashboard_core::models::{Dataset, TimeBucketTotal};
use serde::Serialize;

use crate::exporter::write_file;

/// Default file name written by [`ChartDataWriter`].
pub const CHART_DATA_FILE: &str = "dashboard.json";

/// Data for the standard chart set.
#[derive(Debug, Clone, Copy)]
pub struct ChartRequest<'a> {
    pub daily: &'a [TimeBucketTotal],
    pub weekly: &'a [TimeBucketTotal],
    pub readings: &'a Dataset,
}

/// External collaborator that turns a [`ChartRequest`] into image or data
/// artifacts.
pub trait ChartRenderer {
    /// Short label for logs and the export summary.
    fn label(&self) -> String;

    fn render(&self, request: &ChartRequest<'_>) -> Result<()>;
}

// ── Chart specification ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: DateTime<Utc>,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    pub charts: Vec<ChartSpec>,
}

impl ChartSet {
    /// Lay out the three dashboard panels from `request`.
    pub fn from_request(request: &ChartRequest<'_>) -> Self {
        Self {
            charts: vec![
                ChartSpec {
                    kind: ChartKind::Line,
                    title: "Daily Energy Consumption",
                    x_label: "Date",
                    y_label: "kWh",
                    points: bucket_points(request.daily),
                },
                ChartSpec {
                    kind: ChartKind::Bar,
                    title: "Weekly Total Energy Usage",
                    x_label: "Week starting",
                    y_label: "kWh",
                    points: bucket_points(request.weekly),
                },
                ChartSpec {
                    kind: ChartKind::Scatter,
                    title: "Scatter Plot - Peak Consumption",
                    x_label: "Time",
                    y_label: "kWh",
                    points: request
                        .readings
                        .iter()
                        .map(|r| ChartPoint {
                            x: r.timestamp,
                            y: r.value,
                        })
                        .collect(),
                },
            ],
        }
    }
}

fn bucket_points(buckets: &[TimeBucketTotal]) -> Vec<ChartPoint> {
    buckets
        .iter()
        .map(|b| ChartPoint {
            x: b.bucket_start,
            y: b.total_value,
        })
        .collect()
}

// ── ChartDataWriter ───────────────────────────────────────────────────────────

/// Writes the chart set as pretty-printed JSON to a fixed path.
#[derive(Debug, Clone)]
pub struct ChartDataWriter {
    path: PathBuf,
}

impl ChartDataWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writer targeting [`CHART_DATA_FILE`] inside `output_dir`.
    pub fn in_dir(output_dir: &Path) -> Self {
        Self::new(output_dir.join(CHART_DATA_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChartRenderer for ChartDataWriter {
    fn label(&self) -> String {
        self.path.display().to_string()
    }

    fn render(&self, request: &ChartRequest<'_>) -> Result<()> {
        write_file(&self.path, |out| {
            serde_json::to_writer_pretty(out, &ChartSet::from_request(request))?;
            Ok(())
        })
    }
}
