//! Error types for model loading and scoring

/// Errors that can occur while loading a model or computing perplexity.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unknown model variant: '{0}'")]
    UnknownVariant(String),

    #[error("download failed")]
    Download(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("model load failed")]
    ModelLoad(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("tokenizer load failed")]
    TokenizerLoad(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("inference failed")]
    Inference(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_inference_error_keeps_source() {
        let err = ModelError::Inference("out of memory".into());
        assert_eq!(err.to_string(), "inference failed");
        let source = err.source().expect("source must be attached");
        assert_eq!(source.to_string(), "out of memory");
    }

    #[test]
    fn test_unknown_variant_message() {
        let err = ModelError::UnknownVariant("gpt5".to_string());
        assert_eq!(err.to_string(), "unknown model variant: 'gpt5'");
    }
}
