//! Meter file discovery.
//!
//! Lists the delimited files in the data directory and derives each file's
//! source identifier from its name.

use std::path::{Path, PathBuf};

use tracing::warn;

/// File extensions treated as meter files, with their field delimiter.
const SUPPORTED_EXTENSIONS: &[(&str, u8)] = &[("csv", b','), ("tsv", b'\t')];

/// Field delimiter for `path`, or `None` when the extension is not a
/// supported tabular format. Matching is case-insensitive.
pub fn delimiter_for(path: &Path) -> Option<u8> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, delimiter)| *delimiter)
}

/// Source identifier for a meter file: its name with the extension stripped.
pub fn source_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Find the meter files directly inside `data_path`, sorted by path.
///
/// Subdirectories are not descended into and unsupported files are ignored.
/// A missing directory yields an empty list.
pub fn find_source_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && delimiter_for(entry.path()).is_some())
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}
