//! Temporary upload storage configuration.

use serde::{Deserialize, Serialize};

/// Settings for the per-request temporary upload store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStorageConfig {
    /// Directory where decompressed uploads are staged for conversion.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Maximum accepted upload size in bytes (default 256 MB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Age in minutes after which an orphaned upload is swept. Converters
    /// delete their input on success; the sweep catches abandoned requests.
    #[serde(default = "default_sweep_after")]
    pub sweep_after_minutes: u64,
    /// Interval in minutes between sweep runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_minutes: u64,
}

impl Default for UploadStorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_size_bytes: default_max_upload(),
            sweep_after_minutes: default_sweep_after(),
            sweep_interval_minutes: default_sweep_interval(),
        }
    }
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_max_upload() -> u64 {
    268_435_456 // 256 MB
}

fn default_sweep_after() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    15
}
