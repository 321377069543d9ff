//! Model file resolution and loading

use super::error::ModelError;
use super::hf_download::{get_tokenizer_path, get_variant_path};
use super::llamacpp::LlamaCppModel;
use super::model_config::{ModelFamily, VariantConfig, registry};
use std::path::{Path, PathBuf};

type Result<T> = super::error::Result<T>;

/// Runtime options applied when a model is loaded
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Context window override (0 = model's training context)
    pub n_ctx: u32,
    /// Number of inference threads (0 = llama.cpp default)
    pub n_threads: u32,
}

fn variant_display_name(variant: &VariantConfig) -> String {
    format!("{} ({})", variant.display_name, variant.id)
}

/// Inference backend configuration (llama.cpp GGUF format with external tokenizer)
#[derive(Debug, Clone)]
pub struct Backend {
    gguf_path: PathBuf,
    tokenizer_json_path: PathBuf,
    /// "<variant display name> (<variant id>)" for registry models, "custom" for local files
    display_name: String,
}

impl Backend {
    /// Create a backend from a `(ModelFamily, VariantConfig)` pair.
    ///
    /// Downloads the GGUF and the external tokenizer from HuggingFace.
    pub fn from_variant(family: &ModelFamily, variant: &VariantConfig) -> Result<Self> {
        tracing::info!("Resolving {} variant '{}'", family.display_name, variant.id);
        let gguf_path = get_variant_path(family, variant)?;
        let tokenizer_json_path = get_tokenizer_path(family)?;
        Ok(Backend {
            gguf_path,
            tokenizer_json_path,
            display_name: variant_display_name(variant),
        })
    }

    /// Create a backend by looking up a variant id in the global registry.
    ///
    /// E.g. `Backend::from_variant_id("gpt2-q8")`
    pub fn from_variant_id(variant_id: &str) -> Result<Self> {
        let (family, variant) = registry()
            .find_variant(variant_id)
            .ok_or_else(|| ModelError::UnknownVariant(variant_id.to_string()))?;
        Self::from_variant(family, variant)
    }

    /// Create a backend from local files. Nothing is downloaded.
    pub fn from_paths<P: AsRef<Path>, T: AsRef<Path>>(gguf_path: P, tokenizer_json: T) -> Self {
        Backend {
            gguf_path: gguf_path.as_ref().to_path_buf(),
            tokenizer_json_path: tokenizer_json.as_ref().to_path_buf(),
            display_name: "custom".to_string(),
        }
    }

    /// Model name for logs and health output
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Load the model into memory.
    pub fn load(&self, options: &LoadOptions) -> Result<LlamaCppModel> {
        tracing::info!(
            "Loading model '{}' from {}",
            self.display_name,
            self.gguf_path.display()
        );
        let mut model = LlamaCppModel::from_file_with_n_ctx(
            &self.gguf_path,
            &self.tokenizer_json_path,
            options.n_ctx,
        )?;
        model.set_n_threads(options.n_threads);
        model.set_display_name(self.display_name.clone());
        Ok(model)
    }
}
