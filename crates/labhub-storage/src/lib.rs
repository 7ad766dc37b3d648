//! # labhub-storage
//!
//! Temporary staging area for uploaded instrument files. One randomly
//! named file per request; the owning converter deletes it after a
//! successful conversion, and a periodic sweep catches files abandoned by
//! failed or interrupted requests.

pub mod temp;

pub use temp::TempStore;
