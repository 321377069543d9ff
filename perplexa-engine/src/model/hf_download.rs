//! Fetching model files from HuggingFace Hub
//!
//! Files land in the shared HuggingFace cache (~/.cache/huggingface/hub/) and
//! are reused on later runs. Set `HF_TOKEN` for private or gated repositories.

use super::error::ModelError;
use super::model_config::{ModelFamily, VariantConfig};
type Result<T> = super::error::Result<T>;
use hf_hub::{Repo, RepoType, api::sync::ApiBuilder};
use std::path::PathBuf;

/// Return the cached path of `filename` in the model repo `repo_id`, downloading it first if needed.
pub fn download_file(repo_id: &str, filename: &str) -> Result<PathBuf> {
    let token = std::env::var("HF_TOKEN").ok();
    let api = ApiBuilder::new()
        .with_token(token)
        .build()
        .map_err(|e| ModelError::Download(e.into()))?;

    tracing::info!("Fetching {} from {}", filename, repo_id);
    let path = api
        .repo(Repo::new(repo_id.to_string(), RepoType::Model))
        .get(filename)
        .map_err(|e| ModelError::Download(e.into()))?;
    tracing::debug!("{} cached at {:?}", filename, path);

    Ok(path)
}

/// GGUF weights for `variant`
pub fn get_variant_path(family: &ModelFamily, variant: &VariantConfig) -> Result<PathBuf> {
    download_file(&family.repo_id, &variant.filename)
}

/// `tokenizer.json` for a model family
pub fn get_tokenizer_path(family: &ModelFamily) -> Result<PathBuf> {
    download_file(family.tokenizer_repo(), "tokenizer.json")
}
