//! # labhub-registry
//!
//! The decision tables of LabHub: which (extension, test type, instrument)
//! combinations are accepted, which converter handles an accepted
//! combination, and which decoder profile the cycler converter should use
//! for a given instrument.
//!
//! All tables are immutable values constructed at startup and shared
//! read-only across requests.

pub mod registry;
pub mod resolver;
pub mod tokens;
pub mod validator;

pub use registry::CapabilityRegistry;
pub use resolver::{DriverId, FormatVariant, InstrumentModelResolver, ModelHint};
pub use tokens::{ConverterId, FileExtension, Instrument, TestType};
pub use validator::{CombinationValidator, ValidationError};
