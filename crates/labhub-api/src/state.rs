//! Application state shared across all handlers.

use std::sync::Arc;

use labhub_convert::ConverterDispatch;
use labhub_core::config::AppConfig;
use labhub_registry::CombinationValidator;
use labhub_storage::TempStore;

/// Shared immutable state threaded through the router.
///
/// Everything here is read-only after startup, so cloning the state per
/// request is a handful of `Arc` bumps.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Combination validator (holds the capability registry).
    pub validator: Arc<CombinationValidator>,
    /// Converter dispatch table.
    pub dispatch: Arc<ConverterDispatch>,
    /// Temporary upload store.
    pub temp_store: Arc<TempStore>,
}
