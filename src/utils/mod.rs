// Utility functions

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

// =============================================================================
// Path Helpers - Layout of the data directory
// =============================================================================

/// Directory holding one JSON document per evaluation.
#[inline]
pub fn evaluations_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("evaluations")
}

/// Question catalog file.
#[inline]
pub fn questions_path(data_dir: &Path) -> PathBuf {
    data_dir.join("questions.json")
}

/// Registered accounts file.
#[inline]
pub fn users_path(data_dir: &Path) -> PathBuf {
    data_dir.join("users.json")
}

/// Lock file guarding the data directory against a second server process.
#[inline]
pub fn lock_path(data_dir: &Path) -> PathBuf {
    data_dir.join(".ai-survey.lock")
}

/// Extension trait for Result that provides convenient error context methods.
/// Converts any error to a String with a descriptive message prefix.
///
/// # Example
/// ```ignore
/// use crate::utils::ResultExt;
///
/// let content = std::fs::read_to_string(&path)
///     .with_context("Failed to read question catalog")?;
/// ```
pub trait ResultExt<T> {
    /// Converts the error to a String with context message.
    fn with_context(self, msg: &str) -> Result<T, String>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn with_context(self, msg: &str) -> Result<T, String> {
        self.map_err(|e| format!("{}: {}", msg, e))
    }
}

/// Safely acquire a mutex lock, recovering from poisoning by returning the guard.
/// This is useful when you want to continue even if a previous thread panicked.
/// The mutex state may be inconsistent, so use with caution.
pub fn lock_mutex_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Mutex was poisoned, recovering: {}", poisoned);
            poisoned.into_inner()
        }
    }
}

/// Generate a new record id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
