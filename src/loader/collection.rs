// ABOUTME: Enumerates YAML task units under a directory
// ABOUTME: Skips hidden and underscore-prefixed entries; missing locations yield nothing

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::error::{LoaderError, Result};

const UNIT_EXTENSIONS: &[&str] = &["yaml", "yml"];

fn is_internal(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name.starts_with('_'))
        .unwrap_or(true)
}

fn is_unit(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| UNIT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Unit files under `location`, sorted by file name at each level.
///
/// A location that does not exist is an empty collection; any other IO fault
/// is returned.
pub fn enumerate_units(location: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    match std::fs::metadata(location) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Task location {} does not exist", location.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(LoaderError::Io {
                path: location.to_path_buf(),
                source,
            })
        }
    }

    let mut walker = WalkDir::new(location).follow_links(true).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut units = Vec::new();
    // The root is whatever the caller named, even a temp dir like `.tmpXYZ`
    for entry in walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_internal(e))
    {
        let entry = entry.map_err(|e| LoaderError::Io {
            path: e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| location.to_path_buf()),
            source: e.into(),
        })?;

        if entry.file_type().is_file() && is_unit(entry.path()) {
            units.push(entry.into_path());
        }
    }

    debug!(
        "Found {} task units under {}",
        units.len(),
        location.display()
    );
    Ok(units)
}
