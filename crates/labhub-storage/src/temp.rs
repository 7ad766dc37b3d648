//! Per-request temporary file staging.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rand::Rng;
use tokio::fs;
use tracing::debug;

use labhub_core::error::{AppError, ErrorKind};
use labhub_core::result::AppResult;

/// Length of the random part of a staged file name.
const NAME_LENGTH: usize = 25;

/// Staging store for uploaded files awaiting conversion.
///
/// Each request owns exactly one staged file, from creation until the
/// converter deletes it. Names are random, so concurrent requests cannot
/// collide.
#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    /// Create a store rooted at the given directory, creating it if
    /// missing.
    pub async fn new(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create upload directory: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// The staging directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write uploaded bytes to a freshly named staging file and return its
    /// path. The file name is 25 random uppercase-alphanumeric characters
    /// plus the lowercased extension.
    pub async fn stage(&self, extension: &str, data: &[u8]) -> AppResult<PathBuf> {
        let name = format!("{}.{}", random_name(), extension.to_lowercase());
        let path = self.root.join(name);

        fs::write(&path, data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to stage upload: {}", path.display()),
                e,
            )
        })?;

        debug!(path = %path.display(), bytes = data.len(), "staged upload");
        Ok(path)
    }

    /// Delete every staged file older than `max_age`. Returns the number
    /// of files removed. Per-file failures are logged and skipped so one
    /// stuck file cannot stall the sweep.
    pub async fn sweep_stale(&self, max_age: Duration) -> AppResult<usize> {
        let cutoff = SystemTime::now() - max_age;
        let mut removed = 0usize;

        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read upload directory: {}", self.root.display()),
                e,
            )
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(AppError::from)? {
            let path = entry.path();
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            if modified <= cutoff {
                match fs::remove_file(&path).await {
                    Ok(()) => {
                        debug!(path = %path.display(), "swept stale upload");
                        removed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to sweep stale upload");
                    }
                }
            }
        }

        Ok(removed)
    }
}

/// Random uppercase-alphanumeric staging name.
fn random_name() -> String {
    let mut rng = rand::thread_rng();
    (0..NAME_LENGTH)
        .map(|_| {
            let c = rng.sample(rand::distributions::Alphanumeric) as char;
            c.to_ascii_uppercase()
        })
        .collect()
}
