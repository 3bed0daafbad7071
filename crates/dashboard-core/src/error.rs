use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the energy dashboard.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output file could not be created or written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A delimited file could not be decoded or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed or serialised.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A timezone name is not a recognised IANA identifier.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// No readings survived loading, so nothing can be aggregated.
    #[error("No valid dataset found: {candidates} candidate file(s), {skipped} skipped")]
    EmptyDataset { candidates: usize, skipped: usize },

    /// The per-source summary table is empty.
    #[error("No summary data available")]
    NoSummaryData,

    /// One output artifact could not be produced.
    #[error("Failed to export {artifact}: {source}")]
    Export {
        artifact: String,
        #[source]
        source: Box<DashboardError>,
    },

    /// Text could not be formatted into a report.
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DashboardError {
    /// Wrap `self` as the failure of the named output artifact.
    pub fn for_artifact(self, artifact: impl Into<String>) -> Self {
        DashboardError::Export {
            artifact: artifact.into(),
            source: Box::new(self),
        }
    }
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashboardError>;
