//! Integration tests for windowed perplexity
//!
//! These tests use small in-process models so no download is needed.

use std::sync::{Arc, Mutex};

use perplexa_engine::model::{LanguageModel, ModelError, Result};
use perplexa_engine::{Label, PerplexityScorer, compute_perplexity};

// ============================================================================
// Helper models
// ============================================================================

/// Tokenizes one id per character and reports a fixed mean loss.
/// Records `(window_len, unmasked_count)` for every forward pass.
struct ConstantLossModel {
    max_context: usize,
    loss: f64,
    calls: Mutex<Vec<(usize, usize)>>,
}

impl ConstantLossModel {
    fn new(max_context: usize, loss: f64) -> Self {
        Self {
            max_context,
            loss,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

fn char_ids(text: &str) -> Vec<u32> {
    text.chars().map(|c| c as u32).collect()
}

impl LanguageModel for ConstantLossModel {
    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        Ok(char_ids(text))
    }

    fn max_context(&self) -> usize {
        self.max_context
    }

    fn mean_nll(&self, input_ids: &[u32], targets: &[Option<u32>]) -> Result<f64> {
        assert_eq!(input_ids.len(), targets.len());
        assert!(input_ids.len() <= self.max_context);
        let unmasked = targets.iter().flatten().count();
        self.calls.lock().unwrap().push((input_ids.len(), unmasked));
        Ok(self.loss)
    }
}

/// Each scored token contributes `id / 100` nats; position 0 is never scored.
struct PerTokenLossModel {
    max_context: usize,
}

impl LanguageModel for PerTokenLossModel {
    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.bytes().map(u32::from).collect())
    }

    fn max_context(&self) -> usize {
        self.max_context
    }

    fn mean_nll(&self, _input_ids: &[u32], targets: &[Option<u32>]) -> Result<f64> {
        let scored: Vec<f64> = targets
            .iter()
            .skip(1)
            .flatten()
            .map(|&id| f64::from(id) / 100.0)
            .collect();
        Ok(scored.iter().sum::<f64>() / scored.len() as f64)
    }
}

struct FailingModel;

impl LanguageModel for FailingModel {
    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        Ok(char_ids(text))
    }

    fn max_context(&self) -> usize {
        1024
    }

    fn mean_nll(&self, _input_ids: &[u32], _targets: &[Option<u32>]) -> Result<f64> {
        Err(ModelError::Inference("CUDA out of memory".into()))
    }
}

// ============================================================================
// compute_perplexity
// ============================================================================

#[test]
fn test_single_window_is_exp_of_loss() {
    let model = ConstantLossModel::new(1024, 3.5);
    let ppl = compute_perplexity(&model, "The quick brown fox jumps over", 512).unwrap();
    assert!((ppl - 3.5f64.exp()).abs() < 1e-9, "ppl = {}", ppl);
    assert_eq!(model.calls(), vec![(30, 30)]);
}

#[test]
fn test_constant_loss_is_stride_independent() {
    let text = "a".repeat(100);
    for stride in [1, 3, 8, 16, 50] {
        let model = ConstantLossModel::new(16, 2.0f64.ln());
        let ppl = compute_perplexity(&model, &text, stride).unwrap();
        assert!((ppl - 2.0).abs() < 1e-9, "stride {} -> ppl {}", stride, ppl);
    }
}

#[test]
fn test_multi_window_masks_overlap() {
    let model = ConstantLossModel::new(8, 1.0);
    compute_perplexity(&model, &"x".repeat(20), 4).unwrap();
    // [0,8) all scored, then [4,12) [8,16) [12,20) score 4 new tokens each.
    assert_eq!(model.calls(), vec![(8, 8), (8, 4), (8, 4), (8, 4)]);
}

#[test]
fn test_loss_weighted_by_new_tokens() {
    // bytes: 'a' = 97, 'b' = 98
    let text = format!("{}{}", "a".repeat(6), "b".repeat(6));
    let model = PerTokenLossModel { max_context: 8 };
    let ppl = compute_perplexity(&model, &text, 4).unwrap();

    // Window [0,8): mean over positions 1..8 (5 a's, 2 b's) times 8 tokens.
    let first = (5.0 * 0.97 + 2.0 * 0.98) / 7.0 * 8.0;
    // Window [4,12): 4 new b's, all scored.
    let second = 4.0 * 0.98;
    let expected = ((first + second) / 12.0).exp();
    assert!((ppl - expected).abs() < 1e-9, "{} vs {}", ppl, expected);
}

#[test]
fn test_deterministic() {
    let model = PerTokenLossModel { max_context: 16 };
    let text = "Deterministic scoring over repeated calls, with several windows.";
    let a = compute_perplexity(&model, text, 5).unwrap();
    let b = compute_perplexity(&model, text, 5).unwrap();
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn test_forward_failure_propagates() {
    let err = compute_perplexity(&FailingModel, "some reasonably long text", 512).unwrap_err();
    assert!(matches!(err, ModelError::Inference(_)));
}

#[test]
fn test_empty_text_rejected() {
    let model = ConstantLossModel::new(1024, 1.0);
    let err = compute_perplexity(&model, "", 512).unwrap_err();
    assert!(matches!(err, ModelError::InvalidArgument(_)));
    assert!(model.calls().is_empty());
}

#[test]
fn test_single_token_text_rejected() {
    let model = ConstantLossModel::new(1024, 1.0);
    let err = compute_perplexity(&model, "x", 512).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid argument: text produced 1 token(s); at least 2 are needed to score"
    );
    assert!(model.calls().is_empty());

    let ppl = compute_perplexity(&model, "xy", 512).unwrap();
    assert!((ppl - 1f64.exp()).abs() < 1e-9);
}

#[test]
fn test_non_finite_loss_rejected() {
    let model = ConstantLossModel::new(1024, f64::NAN);
    let err = compute_perplexity(&model, "text that yields nan", 512).unwrap_err();
    assert!(matches!(err, ModelError::Inference(_)));
}

// ============================================================================
// PerplexityScorer
// ============================================================================

#[test]
fn test_scorer_low_perplexity_is_ai() {
    let scorer = PerplexityScorer::new(Arc::new(ConstantLossModel::new(1024, 20.0f64.ln())));
    let assessment = scorer.assess("aaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
    assert!((assessment.perplexity - 20.0).abs() < 1e-9);
    assert_eq!(assessment.score, 5.0);
    assert_eq!(assessment.label, Label::AiGenerated);
}

#[test]
fn test_scorer_mid_perplexity() {
    let scorer =
        PerplexityScorer::with_stride(Arc::new(ConstantLossModel::new(8, 70.0f64.ln())), 4);
    let assessment = scorer.assess(&"mid range text ".repeat(4)).unwrap();
    assert!((assessment.score - 2.5).abs() < 1e-9);
    assert_eq!(assessment.label, Label::PossiblyAiGenerated);
    assert_eq!(scorer.stride(), 4);
}

#[test]
fn test_scorer_high_perplexity_is_human() {
    let scorer = PerplexityScorer::new(Arc::new(ConstantLossModel::new(1024, 150.0f64.ln())));
    let assessment = scorer.assess("an idiosyncratic human sentence").unwrap();
    assert_eq!(assessment.score, 0.0);
    assert_eq!(assessment.label, Label::HumanWritten);
}
