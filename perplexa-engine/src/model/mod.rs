//! Causal language models used for perplexity scoring

mod backend;
pub mod error;
pub mod hf_download;
pub mod llamacpp;
pub mod model_config;

pub use backend::{Backend, LoadOptions};
pub use error::{ModelError, Result};
pub use hf_download::{download_file, get_tokenizer_path, get_variant_path};
pub use llamacpp::LlamaCppModel;
pub use model_config::{ModelFamily, ModelRegistry, VariantConfig, registry};

/// A pretrained causal language model together with its tokenizer.
///
/// Implementations are shared read-only between requests once loaded.
pub trait LanguageModel: Send + Sync {
    /// Convert text to token ids. No BOS/EOS tokens are added.
    fn tokenize(&self, text: &str) -> Result<Vec<u32>>;

    /// Maximum number of tokens a single forward pass accepts.
    fn max_context(&self) -> usize;

    /// Run one forward pass over `input_ids` and return the mean negative
    /// log-likelihood over the unmasked targets.
    ///
    /// `targets` has the same length as `input_ids`; `None` masks a position
    /// out of the loss. Target `i` is predicted from `input_ids[..i]`, so
    /// position 0 never contributes.
    fn mean_nll(&self, input_ids: &[u32], targets: &[Option<u32>]) -> Result<f64>;

    /// Human-readable model name
    fn display_name(&self) -> &str {
        "custom"
    }
}
