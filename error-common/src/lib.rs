//! Process-level error handling shared by the Clinical Copilot crates.
//!
//! Library crates keep their own `thiserror` enums (database, transcription,
//! diagnosis, documents). This crate holds the error type the server binary
//! reports when startup or serving fails, so configuration problems surface
//! as a single readable message instead of a panic.

pub mod types;

pub use types::*;
