//! # labhub-api
//!
//! HTTP API layer for LabHub. Owns the caller boundary: multipart field
//! parsing, gzip decompression, token normalization (uppercasing, test
//! type composition, brand-model joining), and the mapping from domain
//! errors to HTTP responses.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
