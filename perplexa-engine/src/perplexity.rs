//! Sliding-window perplexity
//!
//! Sequences longer than the model's context are scored in overlapping
//! windows. Each window only scores the tokens not already scored by the
//! previous one; the overlap serves as left context.

use std::sync::Arc;

use crate::assessment::Assessment;
use crate::model::{LanguageModel, ModelError, Result};

/// Stride between window starts when none is configured
pub const DEFAULT_STRIDE: usize = 512;

/// A contiguous token range `[begin, end)` fed to one forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub begin: usize,
    pub end: usize,
    /// Number of trailing positions in the window that are scored
    pub target_len: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// Plan the windows covering a sequence of `seq_len` tokens.
///
/// A `stride` larger than `max_len` is clamped to `max_len` so every token is
/// scored. The last window always ends at `seq_len`.
pub fn plan_windows(seq_len: usize, max_len: usize, stride: usize) -> Result<Vec<Window>> {
    if stride == 0 {
        return Err(ModelError::InvalidArgument("stride must be positive".into()));
    }
    if max_len == 0 {
        return Err(ModelError::InvalidArgument(
            "model context length must be positive".into(),
        ));
    }
    let stride = stride.min(max_len);

    let mut windows = Vec::with_capacity(seq_len.div_ceil(stride));
    let mut prev_end = 0;
    for begin in (0..seq_len).step_by(stride) {
        let end = (begin + max_len).min(seq_len);
        windows.push(Window {
            begin,
            end,
            target_len: end - prev_end,
        });
        prev_end = end;
        if end == seq_len {
            break;
        }
    }
    Ok(windows)
}

/// Fewest tokens a text can have and still be scored
pub const MIN_TOKENS: usize = 2;

/// Targets for a window: everything except the last `target_len` ids is masked.
pub fn mask_targets(input_ids: &[u32], target_len: usize) -> Vec<Option<u32>> {
    let masked = input_ids.len().saturating_sub(target_len);
    input_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (i >= masked).then_some(id))
        .collect()
}

/// Compute the perplexity of `text` under `model`.
///
/// Per-window mean losses are weighted by the number of newly scored tokens,
/// summed, and normalized by the end of the final window.
///
/// The first token is never predicted, so text must tokenize to at least
/// [`MIN_TOKENS`] ids.
pub fn compute_perplexity<M: LanguageModel + ?Sized>(
    model: &M,
    text: &str,
    stride: usize,
) -> Result<f64> {
    tracing::info!(
        "Calculating perplexity for input text of length {}",
        text.chars().count()
    );

    let input_ids = model.tokenize(text)?;
    if input_ids.len() < MIN_TOKENS {
        return Err(ModelError::InvalidArgument(format!(
            "text produced {} token(s); at least {} are needed to score",
            input_ids.len(),
            MIN_TOKENS
        )));
    }

    let seq_len = input_ids.len();
    let windows = plan_windows(seq_len, model.max_context(), stride)?;

    let mut nlls = Vec::with_capacity(windows.len());
    let mut end = 0;
    for window in &windows {
        let window_ids = &input_ids[window.begin..window.end];
        let targets = mask_targets(window_ids, window.target_len);
        let loss = model.mean_nll(window_ids, &targets)?;
        if !loss.is_finite() {
            return Err(ModelError::Inference(
                format!("non-finite loss {} for window {:?}", loss, window).into(),
            ));
        }
        tracing::debug!(
            "window [{}, {}) target_len={} loss={:.4}",
            window.begin,
            window.end,
            window.target_len,
            loss
        );
        nlls.push(loss * window.target_len as f64);
        end = window.end;
    }

    let ppl = (nlls.iter().sum::<f64>() / end as f64).exp();
    tracing::info!(
        "Perplexity calculated: {:.4} ({} tokens, {} windows)",
        ppl,
        seq_len,
        windows.len()
    );
    Ok(ppl)
}

/// Scores text with a shared language model.
#[derive(Clone)]
pub struct PerplexityScorer {
    model: Arc<dyn LanguageModel>,
    stride: usize,
}

impl PerplexityScorer {
    /// Create a scorer with the default stride of 512 tokens.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self::with_stride(model, DEFAULT_STRIDE)
    }

    pub fn with_stride(model: Arc<dyn LanguageModel>, stride: usize) -> Self {
        Self { model, stride }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn model(&self) -> &dyn LanguageModel {
        self.model.as_ref()
    }

    /// Perplexity of `text`
    pub fn perplexity(&self, text: &str) -> Result<f64> {
        compute_perplexity(self.model.as_ref(), text, self.stride)
    }

    /// Perplexity of `text` mapped to a score and label
    pub fn assess(&self, text: &str) -> Result<Assessment> {
        let assessment = Assessment::from_perplexity(self.perplexity(text)?);
        tracing::info!(
            "Returning score: {:.4}, label: {}",
            assessment.score,
            assessment.label
        );
        Ok(assessment)
    }
}
