use clap::{CommandFactory, Parser};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{DashboardError, Result};

const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Campus energy dashboard: merge per-building meter files and export reports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "energy-dashboard",
    about = "Merge per-building meter files and export consumption reports",
    version
)]
pub struct Settings {
    /// Directory containing one meter file per building
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory receiving the exported artifacts
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Name of the timestamp column in meter files
    #[arg(long, default_value = "timestamp")]
    pub timestamp_column: String,

    /// Name of the numeric reading column in meter files
    #[arg(long, default_value = "kwh")]
    pub value_column: String,

    /// Reference timezone for naive timestamps and day/week boundaries
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path (stderr when omitted)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// JSON file supplying defaults for any of the options above
    #[arg(long)]
    pub config: Option<PathBuf>,
}

// ── FileConfig ─────────────────────────────────────────────────────────────────

/// Optional JSON configuration file. Every key mirrors a CLI option.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub timestamp_column: Option<String>,
    pub value_column: Option<String>,
    pub timezone: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub debug: Option<bool>,
}

impl FileConfig {
    /// Read and parse the configuration file at `path`. A missing file is a
    /// configuration error, not an I/O one.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => {
                DashboardError::Config(format!("config file not found: {}", path.display()))
            }
            _ => DashboardError::FileRead {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and merge the optional config file.
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Result<Self> {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if let Some(path) = settings.config.clone() {
            let file = FileConfig::load_from(&path)?;
            settings.merge_file_config(file, &matches);
        }

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Apply `file` values to every field that was not given on the command
    /// line (CLI always wins).
    fn merge_file_config(&mut self, file: FileConfig, matches: &clap::ArgMatches) {
        if !is_arg_explicitly_set(matches, "data_dir") {
            if let Some(v) = file.data_dir {
                self.data_dir = v;
            }
        }
        if !is_arg_explicitly_set(matches, "output_dir") {
            if let Some(v) = file.output_dir {
                self.output_dir = v;
            }
        }
        if !is_arg_explicitly_set(matches, "timestamp_column") {
            if let Some(v) = file.timestamp_column {
                self.timestamp_column = v;
            }
        }
        if !is_arg_explicitly_set(matches, "value_column") {
            if let Some(v) = file.value_column {
                self.value_column = v;
            }
        }
        if !is_arg_explicitly_set(matches, "timezone") {
            if let Some(v) = file.timezone {
                self.timezone = v;
            }
        }
        if !is_arg_explicitly_set(matches, "log_level") {
            if let Some(v) = file.log_level {
                self.log_level = v.to_uppercase();
            }
        }
        if !is_arg_explicitly_set(matches, "log_file") && self.log_file.is_none() {
            self.log_file = file.log_file;
        }
        if !is_arg_explicitly_set(matches, "debug") {
            if let Some(v) = file.debug {
                self.debug = v;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(DashboardError::Config(format!(
                "unknown log level \"{}\"",
                self.log_level
            )));
        }
        if self.timestamp_column.trim().is_empty() || self.value_column.trim().is_empty() {
            return Err(DashboardError::Config(
                "column names must not be empty".to_string(),
            ));
        }
        crate::time_utils::parse_timezone(&self.timezone)?;
        Ok(())
    }
}

// ── Helper: check if an arg was explicitly set on the command line ─────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
