//! File-based storage for survey data
//!
//! Everything lives under one data directory:
//! - `questions.json` - The question catalog, seeded on first start
//! - `users.json` - Registered accounts
//! - `evaluations/` - One JSON document per evaluation, header and responses together
//! - `.ai-survey.lock` - Held by the running server process

pub mod evaluations;
pub mod questions;
pub mod users;

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::utils::{evaluations_dir, lock_path, ResultExt};

pub use evaluations::FileEvaluationStore;
pub use questions::QuestionCatalog;
pub use users::UserStore;

/// Common file operations result type
pub type FileResult<T> = Result<T, String>;

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> FileResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| format!("Failed to create directory {:?}: {}", path, e))?;
    }
    Ok(())
}

/// Write data to a file atomically (temp file + rename)
pub fn atomic_write(path: &Path, content: &str) -> FileResult<()> {
    let temp_path = path.with_extension("tmp");

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    fs::write(&temp_path, content)
        .map_err(|e| format!("Failed to write temp file {:?}: {}", temp_path, e))?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(format!(
            "Failed to rename {:?} to {:?}: {}",
            temp_path, path, e
        ));
    }

    Ok(())
}

/// Read a JSON file and deserialize it
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> FileResult<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read file {:?}: {}", path, e))?;

    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse JSON from {:?}: {}", path, e))
}

/// Write data as pretty-printed JSON atomically
pub fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> FileResult<()> {
    let content =
        serde_json::to_string_pretty(data).with_context("Failed to serialize to JSON")?;

    atomic_write(path, &content)
}

/// Create the data directory layout
pub fn init_data_dir(data_dir: &Path) -> FileResult<PathBuf> {
    ensure_dir(data_dir)?;
    ensure_dir(&evaluations_dir(data_dir))?;
    Ok(data_dir.to_path_buf())
}

/// Exclusive lock on a data directory, released on drop
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    /// Take the lock without blocking; fails if another process holds it
    pub fn acquire(data_dir: &Path) -> FileResult<Self> {
        ensure_dir(data_dir)?;
        let path = lock_path(data_dir);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| format!("Failed to open lock file {:?}: {}", path, e))?;

        file.try_lock_exclusive().map_err(|e| {
            format!(
                "Data directory {:?} is already in use by another process: {}",
                data_dir, e
            )
        })?;

        log::debug!("Acquired data directory lock {:?}", path);
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly
    pub fn release(self) -> FileResult<()> {
        self.file
            .unlock()
            .map_err(|e| format!("Failed to release lock {:?}: {}", self.path, e))
    }
}

/// Whether a directory can currently be written to
pub fn is_writable(dir: &Path) -> bool {
    let marker = dir.join(".health-check");
    match fs::write(&marker, b"ok") {
        Ok(()) => {
            let _ = fs::remove_file(&marker);
            true
        }
        Err(e) => {
            log::warn!("Data directory {:?} is not writable: {}", dir, e);
            false
        }
    }
}
