//! Maum Core — emotion taxonomy, shared result types, configuration.

pub mod config;
pub mod error;
pub mod taxonomy;
pub mod types;

pub use config::{DataPaths, MaumConfig};
pub use error::{Error, Result};
pub use taxonomy::{EmotionDef, EmotionGroup, EMOTION_COUNT, TAXONOMY, TAXONOMY_VERSION};
pub use types::{
    AnalysisResult, DistributionEntry, PrimaryEmotion, RiskLevel, SecondaryEmotion, Sentiment,
    ServiceSignals,
};
