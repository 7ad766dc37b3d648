//! Converter configuration.

use serde::{Deserialize, Serialize};

/// Settings consumed by the format converters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Command used to export tables from Access-format cycler files
    /// (Arbin `.res`). Must be on PATH or an absolute path.
    #[serde(default = "default_mdb_export")]
    pub mdb_export_command: String,
    /// Timeout in seconds for external export commands.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,
    /// Column separator assumed for cycler text exports when the request
    /// does not carry an explicit `sep` option.
    #[serde(default = "default_separator")]
    pub default_separator: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            mdb_export_command: default_mdb_export(),
            command_timeout_seconds: default_command_timeout(),
            default_separator: default_separator(),
        }
    }
}

fn default_mdb_export() -> String {
    "mdb-export".to_string()
}

fn default_command_timeout() -> u64 {
    120
}

fn default_separator() -> String {
    "\t".to_string()
}
