//! perplexa-engine: perplexity-based scoring of machine-generated text
//!
//! A causal language model (GGUF via llama.cpp) scores text in sliding
//! windows; the resulting perplexity maps to a 0–5 score and a label.

pub mod assessment;
pub mod model;
pub mod perplexity;

pub use assessment::{Assessment, Label};
pub use model::{Backend, LanguageModel, LlamaCppModel, LoadOptions, ModelError};
pub use perplexity::{DEFAULT_STRIDE, MIN_TOKENS, PerplexityScorer, compute_perplexity};
