//! Configuration module

mod settings;

pub use settings::{ModelSettings, ScoringSettings, ServerSettings, Settings};
