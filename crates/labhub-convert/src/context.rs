//! Conversion request context and the converter failure type.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use labhub_core::error::{AppError, ErrorKind};
use labhub_registry::{FileExtension, Instrument, TestType};

/// Named context parameters handed to a converter along with the staged
/// file. The combination tokens are already validated; `model_override`
/// carries the request's explicit `data_format_model` field, and
/// `options` carries parser-specific extras such as a column separator.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    /// Validated instrument token.
    pub instrument: Instrument,
    /// Validated test-type token.
    pub test_type: TestType,
    /// Validated extension token.
    pub extension: FileExtension,
    /// Explicit layout-profile override from the request, if any.
    pub model_override: Option<String>,
    /// Parser-specific options (e.g. `sep`).
    pub options: HashMap<String, String>,
}

impl ConversionContext {
    /// Create a context with no override and no extra options.
    pub fn new(instrument: Instrument, test_type: TestType, extension: FileExtension) -> Self {
        Self {
            instrument,
            test_type,
            extension,
            model_override: None,
            options: HashMap::new(),
        }
    }

    /// Set the layout-profile override.
    pub fn with_model_override(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    /// Set a parser option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// A converter ran but could not produce an envelope.
///
/// The underlying decoder error is kept as an opaque source for server-side
/// logging; callers render a generic message and never see decoder
/// internals.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConversionError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConversionError {
    /// Create a failure with a diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a decoder error.
    pub fn decode(source: anyhow::Error) -> Self {
        Self {
            message: "decoder failed".to_string(),
            source: Some(source.into()),
        }
    }

    /// The diagnostic message (for logs, not for callers).
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for ConversionError {
    fn from(err: std::io::Error) -> Self {
        Self {
            message: format!("failed to read input file: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        // The cause stays in the source chain for logging; the caller-facing
        // message is generic.
        AppError::with_source(
            ErrorKind::Conversion,
            "Unknown error while transforming file",
            err,
        )
    }
}

/// Delete a converter's input file after a successful conversion.
///
/// Cleanup is best-effort: a failure is logged and suppressed.
pub(crate) async fn remove_input(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::debug!(path = %path.display(), error = %e, "error while deleting input file");
    }
}

/// Convert an `f64` to a JSON value, mapping non-finite values to null.
pub(crate) fn json_num(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_error_maps_to_generic_message() {
        let err = ConversionError::decode(anyhow::anyhow!("unexpected column id 97"));
        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::Conversion);
        assert_eq!(app.message, "Unknown error while transforming file");
        // The decoder detail survives in the source chain for logging.
        assert!(app.source.is_some());
    }

    #[test]
    fn test_json_num_handles_non_finite() {
        assert_eq!(json_num(1.5), serde_json::json!(1.5));
        assert_eq!(json_num(f64::NAN), serde_json::Value::Null);
        assert_eq!(json_num(f64::INFINITY), serde_json::Value::Null);
    }
}
