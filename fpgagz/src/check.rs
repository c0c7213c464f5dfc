//! Batch check of gzip files already on disk.
//!
//! Used to validate a directory of device outputs collected earlier, for
//! example from a simulation run, without talking to the device.

use {
    crate::{
        error::{Error, Result},
        verify::gunzip,
    },
    log::{debug, warn},
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Outcome for a single file.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FileCheck {
    /// Path of the checked file.
    pub path: PathBuf,
    /// Size of the file on disk.
    pub compressed_len: u64,
    /// Decompressed size, when decompression succeeded.
    pub decompressed_len: Option<usize>,
    /// Failure description, when it did not.
    pub error: Option<String>,
}

impl FileCheck {
    /// Whether the file decompressed cleanly.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Totals over a directory.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CheckSummary {
    /// Per-file results, sorted by path.
    pub files: Vec<FileCheck>,
    /// Number of files that failed to decompress.
    pub failed: usize,
    /// Total on-disk size of the files that decompressed.
    pub compressed_size: u64,
    /// Total decompressed size.
    pub decompressed_size: u64,
}

impl CheckSummary {
    /// Number of files checked.
    pub fn total(&self) -> usize {
        self.files.len()
    }

    /// Whether no `.gz` files were found.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether every file decompressed.
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }

    /// Compressed size as a percentage of the decompressed size.
    ///
    /// Both sides are offset by one so empty inputs don't divide by zero.
    pub fn ratio(&self) -> f64 {
        100.0 * (self.compressed_size as f64 + 1.0) / (self.decompressed_size as f64 + 1.0)
    }
}

/// Decompress every `*.gz` file directly inside `dir`.
///
/// Subdirectories are not visited. Per-file failures are recorded in the
/// summary; only an unreadable directory is an error.
pub fn check_directory<P: AsRef<Path>>(dir: P) -> Result<CheckSummary> {
    let dir = dir.as_ref();
    let file_io = |source| Error::FileIo {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(file_io)? {
        let path = entry.map_err(file_io)?.path();
        let is_gz = path
            .extension()
            .is_some_and(|ext| ext == "gz");
        if is_gz && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    debug!("Found {} .gz files in {}", paths.len(), dir.display());

    let mut summary = CheckSummary::default();
    for path in paths {
        let check = check_file(path);
        match (&check.error, check.decompressed_len) {
            (None, Some(len)) => {
                summary.compressed_size += check.compressed_len;
                summary.decompressed_size += len as u64;
            },
            (Some(e), _) => {
                warn!("{} decompress failed: {e}", check.path.display());
                summary.failed += 1;
            },
            (None, None) => {},
        }
        summary.files.push(check);
    }

    Ok(summary)
}

fn check_file(path: PathBuf) -> FileCheck {
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            return FileCheck {
                path,
                compressed_len: 0,
                decompressed_len: None,
                error: Some(e.to_string()),
            };
        },
    };

    let compressed_len = data.len() as u64;
    match gunzip(&data) {
        Ok(out) => FileCheck {
            path,
            compressed_len,
            decompressed_len: Some(out.len()),
            error: None,
        },
        Err(e) => FileCheck {
            path,
            compressed_len,
            decompressed_len: None,
            error: Some(e.to_string()),
        },
    }
}
