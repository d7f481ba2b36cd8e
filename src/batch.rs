//! Decoding `.eml` files from disk, one at a time or a directory at once.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{QuoteChainError, Result};
use crate::model::thread::Thread;
use crate::parser::header::decode_raw_bytes;
use crate::thread::assemble_thread;

/// Outcome for one file of a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    pub result: Result<Thread>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Read and decode a single `.eml` file.
pub fn decode_file(path: &Path, config: &Config) -> Result<Thread> {
    let bytes = std::fs::read(path).map_err(|e| QuoteChainError::io(path, e))?;
    let raw = decode_raw_bytes(&bytes);
    Ok(assemble_thread(&raw, config))
}

/// Decode every `.eml` file in `dir` (not recursive), in file-name order.
///
/// A file that cannot be read is reported in its own [`BatchItem`]; the rest
/// of the batch continues. `progress` is called with `(done, total)` after
/// each file.
pub fn decode_directory(
    dir: &Path,
    config: &Config,
    progress: Option<&dyn Fn(usize, usize)>,
) -> Result<Vec<BatchItem>> {
    if !dir.is_dir() {
        return Err(QuoteChainError::InvalidInput(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let files = list_eml_files(dir)?;
    let total = files.len();
    info!(dir = %dir.display(), total, "Decoding directory");

    let mut items = Vec::with_capacity(total);
    for (done, path) in files.into_iter().enumerate() {
        let result = decode_file(&path, config);
        if let Err(ref e) = result {
            warn!(path = %path.display(), error = %e, "Skipping unreadable file");
        }
        items.push(BatchItem { path, result });
        if let Some(report) = progress {
            report(done + 1, total);
        }
    }

    Ok(items)
}

/// `.eml` files directly inside `dir`, sorted by path.
fn list_eml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| QuoteChainError::io(dir, e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
        })
        .collect();
    files.sort();
    Ok(files)
}
