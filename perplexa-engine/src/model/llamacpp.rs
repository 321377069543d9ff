//! llama.cpp based GGUF inference for perplexity scoring
//!
//! Forward passes run through llama.cpp's inference engine via the llama-cpp-2
//! crate. Tokenization goes through an external HuggingFace `tokenizer.json`
//! so token ids match the reference tokenizer exactly.

use super::LanguageModel;
use super::error::ModelError;
type Result<T> = super::error::Result<T>;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::LlamaModel;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::token::LlamaToken;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::OnceLock;

/// Global llama.cpp backend (can only be initialized once)
static LLAMA_BACKEND: OnceLock<std::result::Result<LlamaBackend, String>> = OnceLock::new();

/// Get or initialize the global llama.cpp backend
fn get_backend() -> Result<&'static LlamaBackend> {
    let result = LLAMA_BACKEND.get_or_init(|| {
        let mut backend = LlamaBackend::init().map_err(|e| e.to_string())?;
        backend.void_logs();
        Ok(backend)
    });
    match result {
        Ok(backend) => Ok(backend),
        Err(e) => Err(ModelError::ModelLoad(
            format!("Failed to initialize llama.cpp backend: {}", e).into(),
        )),
    }
}

/// Load and configure an external HuggingFace tokenizer from a `tokenizer.json` file.
fn load_tokenizer<P: AsRef<Path>>(path: P) -> Result<tokenizers::Tokenizer> {
    let mut tokenizer =
        tokenizers::Tokenizer::from_file(path.as_ref()).map_err(ModelError::TokenizerLoad)?;
    // Windowing is done by the scorer; padding or truncation would shift positions.
    tokenizer.with_padding(None);
    tokenizer.with_truncation(None).ok();
    Ok(tokenizer)
}

/// Negative log-probability of `target` under the softmax of `logits`.
///
/// Returns `None` when `target` is outside the vocabulary.
pub(crate) fn token_nll(logits: &[f32], target: usize) -> Option<f64> {
    let target_logit = f64::from(*logits.get(target)?);
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max) as f64;
    let log_sum_exp = logits
        .iter()
        .map(|&x| (f64::from(x) - max_logit).exp())
        .sum::<f64>()
        .ln()
        + max_logit;
    Some(log_sum_exp - target_logit)
}

/// llama.cpp based causal language model for GGUF inference
pub struct LlamaCppModel {
    model: LlamaModel,
    /// Context window used for each forward pass
    n_ctx: NonZeroU32,
    /// External HuggingFace tokenizer (always required).
    external_tokenizer: tokenizers::Tokenizer,
    /// Number of threads for inference (0 = use llama.cpp default)
    n_threads: u32,
    vocab_size: usize,
    display_name: String,
}

impl LlamaCppModel {
    /// Load a GGUF model using llama.cpp with an external tokenizer.
    ///
    /// `n_ctx` of 0 uses the model's training context. Larger values are
    /// capped to it, since positions beyond it were never trained.
    pub fn from_file_with_n_ctx<P: AsRef<Path>, T: AsRef<Path>>(
        path: P,
        tokenizer_json: T,
        n_ctx: u32,
    ) -> Result<Self> {
        let backend = get_backend()?;

        // GPT-2 has Metal issues, use CPU
        let model_params = LlamaModelParams::default().with_n_gpu_layers(0);

        let model = LlamaModel::load_from_file(backend, path.as_ref(), &model_params)
            .map_err(|e| ModelError::ModelLoad(e.into()))?;
        let external_tokenizer = load_tokenizer(tokenizer_json)?;

        let n_ctx_train = model.n_ctx_train();
        let n_ctx = match n_ctx {
            0 => n_ctx_train,
            n => n.min(n_ctx_train),
        };
        let n_ctx = NonZeroU32::new(n_ctx)
            .ok_or_else(|| ModelError::ModelLoad("model reports a zero context length".into()))?;
        let vocab_size = model.n_vocab() as usize;

        tracing::debug!(
            "Loaded GGUF model: n_ctx={}, n_ctx_train={}, n_vocab={}",
            n_ctx,
            n_ctx_train,
            vocab_size
        );

        Ok(Self {
            model,
            n_ctx,
            external_tokenizer,
            n_threads: 0,
            vocab_size,
            display_name: path
                .as_ref()
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "custom".to_string()),
        })
    }

    /// Set the number of threads for inference.
    /// 0 means use llama.cpp default (typically all cores).
    pub fn set_n_threads(&mut self, n: u32) {
        self.n_threads = n;
    }

    /// Set the name reported by [`LanguageModel::display_name`].
    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Build LlamaContextParams sized so a full window decodes in one batch
    fn context_params(&self) -> LlamaContextParams {
        let params = LlamaContextParams::default()
            .with_n_ctx(Some(self.n_ctx))
            .with_n_batch(self.n_ctx.get())
            .with_n_ubatch(self.n_ctx.get());
        if self.n_threads > 0 {
            params
                .with_n_threads(self.n_threads as i32)
                .with_n_threads_batch(self.n_threads as i32)
        } else {
            params
        }
    }

    /// Vocabulary size reported by the GGUF metadata
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }
}

impl LanguageModel for LlamaCppModel {
    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .external_tokenizer
            .encode(text, false)
            .map_err(ModelError::Inference)?;
        Ok(encoding.get_ids().to_vec())
    }

    fn max_context(&self) -> usize {
        self.n_ctx.get() as usize
    }

    /// Creates a fresh context for each call so concurrent requests never
    /// share a KV cache.
    fn mean_nll(&self, input_ids: &[u32], targets: &[Option<u32>]) -> Result<f64> {
        if input_ids.len() != targets.len() {
            return Err(ModelError::InvalidArgument(format!(
                "{} input ids but {} targets",
                input_ids.len(),
                targets.len()
            )));
        }
        if input_ids.is_empty() || input_ids.len() > self.max_context() {
            return Err(ModelError::InvalidArgument(format!(
                "window of {} tokens does not fit context of {}",
                input_ids.len(),
                self.max_context()
            )));
        }

        let backend = get_backend()?;
        let mut ctx = self
            .model
            .new_context(backend, self.context_params())
            .map_err(|e| ModelError::Inference(e.into()))?;

        let tokens: Vec<LlamaToken> = input_ids.iter().map(|&id| LlamaToken(id as i32)).collect();
        let mut batch = LlamaBatch::new(tokens.len(), 1);
        batch
            .add_sequence(&tokens, 0, true)
            .map_err(|e| ModelError::Inference(e.into()))?;
        ctx.decode(&mut batch)
            .map_err(|e| ModelError::Inference(e.into()))?;

        let mut total_nll = 0.0f64;
        let mut n_scored = 0usize;

        for (pos, target) in targets.iter().enumerate().skip(1) {
            let Some(target) = *target else {
                continue;
            };
            let logits = ctx.get_logits_ith((pos - 1) as i32);
            let logits = &logits[..logits.len().min(self.vocab_size)];
            let nll = token_nll(logits, target as usize).ok_or_else(|| {
                ModelError::Inference(
                    format!("target token {} outside vocabulary", target).into(),
                )
            })?;
            total_nll += nll;
            n_scored += 1;
        }

        if n_scored == 0 {
            return Err(ModelError::Inference(
                "window has no scorable target positions".into(),
            ));
        }

        Ok(total_nll / n_scored as f64)
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
