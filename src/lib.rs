//! # Cellbrain
//!
//! Headless driver for populations of cellular automaton brains.
//!
//! A [`Runner`] builds one simulator stack from an [`AppConfig`], binds a
//! façade to a slot for every entity and advances them together, one
//! simulator update per tick.

pub mod runner;

pub use cellbrain_core::config::AppConfig;
pub use runner::{analyze_model, demo_descriptor, load_config, RunSummary, Runner};
