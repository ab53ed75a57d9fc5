//! Maum Analyzer — LLM-driven emotion analysis with a deterministic tail.
//!
//! The only nondeterministic step is the completion call; everything after
//! the response bytes (parse, repair, normalize, derive, tag) is a pure
//! function and unit-tested as one.

pub mod analyzer;
pub mod derive;
pub mod gate;
pub mod prompt;
pub mod repair;
pub mod tags;

pub use analyzer::{build_result, EmotionAnalyzer};
pub use gate::{gate, GateDecision};
