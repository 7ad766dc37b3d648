//! # labhub-convert
//!
//! The converter side of LabHub: the dispatch table from converter
//! identifier to implementation, the contract every converter satisfies,
//! and the three converters — BioLogic MPR (galvani), cycler RES/TXT
//! (cellpy), and diffraction text (xrd_custom).
//!
//! Converters own their input file: on success they delete it from the
//! staging area (best-effort; failures are logged, never propagated).

pub mod cellpy;
pub mod context;
pub mod dispatch;
pub mod galvani;
pub mod xrd;

pub use context::{ConversionContext, ConversionError};
pub use dispatch::{ConverterDispatch, FileConverter};
