//! Combination validation: is this (extension, test type, instrument)
//! triple accepted, and which converter handles it?

use std::sync::Arc;

use thiserror::Error;

use labhub_core::error::AppError;

use crate::registry::CapabilityRegistry;
use crate::tokens::{ConverterId, FileExtension, Instrument, TestType};

/// A denied combination, with enough context to render the user message.
///
/// Token-level variants carry the supported list; combination-level
/// variants carry the known tokens whose conjunction is not registered.
/// A missing test-type row and a missing extension row are the same
/// failure ([`ValidationError::UnsupportedTestForExtension`]); a missing
/// instrument cell under a present test-type row is reported separately.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The extension token is outside the known universe.
    #[error(
        "{extension} extension not yet supported, currently we support the following files {supported:?}"
    )]
    UnsupportedExtension {
        /// The rejected token.
        extension: String,
        /// Accepted extensions, in listing order.
        supported: Vec<String>,
    },
    /// The test-type token is outside the known universe.
    #[error(
        "{test_type} test not yet supported, currently we support the following tests {supported:?}"
    )]
    UnsupportedTestType {
        /// The rejected token.
        test_type: String,
        /// Accepted test types, in listing order.
        supported: Vec<String>,
    },
    /// The instrument token is outside the known universe.
    #[error(
        "{instrument} not yet supported, currently we support the following instruments {supported:?}"
    )]
    UnsupportedInstrument {
        /// The rejected token.
        instrument: String,
        /// Accepted instruments, in listing order.
        supported: Vec<String>,
    },
    /// The test type is not registered under this extension.
    #[error("{test_type} test is not supported in {extension} files.")]
    UnsupportedTestForExtension {
        /// The known-but-unregistered test type.
        test_type: TestType,
        /// The extension whose row lacks it.
        extension: FileExtension,
    },
    /// The instrument is not registered under this (extension, test type).
    #[error("{instrument} {test_type} tests are not supported in {extension} files")]
    UnsupportedInstrumentForCombination {
        /// The known-but-unregistered instrument.
        instrument: Instrument,
        /// The test type of the combination.
        test_type: TestType,
        /// The extension of the combination.
        extension: FileExtension,
    },
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

/// Validates candidate combinations against an injected registry.
///
/// Pure over the registry tables: no state, no side effects beyond
/// diagnostic logging.
#[derive(Debug, Clone)]
pub struct CombinationValidator {
    registry: Arc<CapabilityRegistry>,
}

impl CombinationValidator {
    /// Create a validator over the given registry.
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this validator decides against.
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Validate a normalized (uppercased) combination.
    ///
    /// Token membership is checked first — extension, then test type, then
    /// instrument — so an unknown token is always reported as such, never
    /// as an unsupported combination. Known tokens then walk the nested
    /// table; the first absent level decides the error.
    pub fn validate(
        &self,
        extension: &str,
        test_type: &str,
        instrument: &str,
    ) -> Result<ConverterId, ValidationError> {
        tracing::debug!(extension, test_type, instrument, "validating combination");

        let ext = FileExtension::parse(extension)
            .filter(|e| self.registry.extensions().contains(e))
            .ok_or_else(|| ValidationError::UnsupportedExtension {
                extension: extension.to_string(),
                supported: self.supported_extensions(),
            })?;

        let test = TestType::parse(test_type)
            .filter(|t| self.registry.test_types().contains(t))
            .ok_or_else(|| ValidationError::UnsupportedTestType {
                test_type: test_type.to_string(),
                supported: self.supported_test_types(),
            })?;

        let inst = Instrument::parse(instrument)
            .filter(|i| self.registry.instruments().contains(i))
            .ok_or_else(|| ValidationError::UnsupportedInstrument {
                instrument: instrument.to_string(),
                supported: self.supported_instruments(),
            })?;

        let instruments = self
            .registry
            .tests_for(ext)
            .and_then(|tests| tests.get(&test))
            .ok_or_else(|| {
                tracing::debug!(%ext, %test, "rejected: test type not registered for extension");
                ValidationError::UnsupportedTestForExtension {
                    test_type: test,
                    extension: ext,
                }
            })?;

        let converter = instruments.get(&inst).copied().ok_or_else(|| {
            tracing::debug!(%ext, %test, %inst, "rejected: instrument not registered for combination");
            ValidationError::UnsupportedInstrumentForCombination {
                instrument: inst,
                test_type: test,
                extension: ext,
            }
        })?;

        tracing::debug!(%ext, %test, %inst, %converter, "combination accepted");
        Ok(converter)
    }

    fn supported_extensions(&self) -> Vec<String> {
        self.registry
            .extensions()
            .iter()
            .map(|e| e.as_str().to_string())
            .collect()
    }

    fn supported_test_types(&self) -> Vec<String> {
        self.registry
            .test_types()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect()
    }

    fn supported_instruments(&self) -> Vec<String> {
        self.registry
            .instruments()
            .iter()
            .map(|i| i.as_str().to_string())
            .collect()
    }
}
