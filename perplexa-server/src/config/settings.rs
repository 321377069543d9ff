//! Settings configuration
//!
//! Manages user-configurable settings for the server and CLI.
//! Default values are defined in `config/default.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default configuration TOML embedded from config/default.toml
const DEFAULT_CONFIG_TOML: &str = include_str!("../../config/default.toml");

/// Configuration settings for perplexa
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP listener settings
    pub server: ServerSettings,
    /// Which model to load and how
    pub model: ModelSettings,
    /// Perplexity scoring settings
    pub scoring: ScoringSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body in bytes
    pub body_limit_bytes: usize,
    /// Load the model at startup instead of on the first request
    pub preload: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Registry variant id (optional, defaults to registry default)
    pub variant: Option<String>,
    /// Local GGUF file, used together with `tokenizer_path`
    pub gguf_path: Option<PathBuf>,
    /// Local tokenizer.json, used together with `gguf_path`
    pub tokenizer_path: Option<PathBuf>,
    /// Number of threads for llama.cpp inference (0 = all cores, llama.cpp default)
    pub n_threads: u32,
    /// Context window per forward pass (0 = model's training context)
    pub n_ctx: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Step between sliding-window starts, in tokens
    pub stride: usize,
    /// Minimum trimmed text length, in characters
    pub min_text_chars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("embedded default.toml must be valid")
    }
}

/// Recursively merge `overlay` TOML values on top of `base`.
fn merge_toml(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(key) {
                    merge_toml(base_value, value);
                } else {
                    base_table.insert(key.clone(), value.clone());
                }
            }
        }
        (base, _) => {
            *base = overlay.clone();
        }
    }
}

/// Parse user TOML content merged on top of default.toml.
fn parse_with_defaults(user_content: &str) -> Result<Settings> {
    let mut base: toml::Value = toml::from_str(DEFAULT_CONFIG_TOML)?;
    let user: toml::Value = toml::from_str(user_content)?;
    merge_toml(&mut base, &user);
    let settings: Settings = base.try_into()?;
    settings.validate()?;
    Ok(settings)
}

/// Get the project directories for perplexa.
fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "perplexa", "perplexa")
}

impl Settings {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    ///
    /// Default: `~/.config/perplexa/config.toml`
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load settings from the default configuration file.
    /// Falls back to embedded default.toml if the config file does not exist.
    pub fn load() -> Result<Self> {
        let Some(config_file) = Self::config_file() else {
            warn!("Could not determine config directory, using defaults");
            return Ok(Self::default());
        };

        if !config_file.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        debug!("Loading config from {:?}", config_file);
        let content = fs::read_to_string(&config_file)?;
        parse_with_defaults(&content)
    }

    /// Load settings from a specific file, merged on top of defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        parse_with_defaults(&content)
    }

    /// Reject settings that cannot produce a working scorer.
    pub fn validate(&self) -> Result<()> {
        if self.scoring.stride == 0 {
            bail!("scoring.stride must be positive");
        }
        if self.model.gguf_path.is_some() != self.model.tokenizer_path.is_some() {
            bail!("model.gguf_path and model.tokenizer_path must be set together");
        }
        Ok(())
    }
}
