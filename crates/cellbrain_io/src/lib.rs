//! # Cellbrain IO
//!
//! I/O layer for cellbrain.
//!
//! This crate provides:
//! - Structured error handling with custom error types
//! - JSON and TOML serialization helpers
//! - Descriptor loading and model construction from files
//! - Raw state snapshots of automata

/// Error types and result aliases for I/O operations
pub mod error;
/// Descriptor files and the models built from them
pub mod descriptor;
/// Validated serialization helpers for JSON and TOML
pub mod serialization;
/// Raw state snapshots
pub mod snapshot;

pub use descriptor::{load_descriptor, load_model, model_from_json, save_descriptor};
pub use error::{IoError, Result};
pub use serialization::{from_json, from_toml, read_json_file, to_json, to_json_pretty, write_json_file};
pub use snapshot::{AutomatonState, StateSnapshot};
