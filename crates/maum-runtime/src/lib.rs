//! Maum Runtime — the session batch orchestrator.

pub mod orchestrator;

pub use orchestrator::{BatchReport, Orchestrator};
