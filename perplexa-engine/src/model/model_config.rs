//! TOML-based model configuration
//!
//! All supported GGUF models are defined in `models.toml` at the crate root.
//! This module deserializes that file and provides a global registry for lookup.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Top-level config parsed from `models.toml`
#[derive(Debug, Deserialize)]
pub struct ModelRegistry {
    /// Default variant id (e.g. "gpt2-q8")
    pub default_model: String,
    /// Model families keyed by short name (e.g. "gpt2")
    pub models: HashMap<String, ModelFamily>,
}

/// A model family (one HuggingFace repo, multiple quantisation variants)
#[derive(Debug, Deserialize)]
pub struct ModelFamily {
    pub repo_id: String,
    /// Family name logged when a variant is fetched
    pub display_name: String,
    /// Repo holding `tokenizer.json` when the GGUF repo does not ship one
    #[serde(default)]
    pub tokenizer_repo_id: Option<String>,
    /// Quantisation variants keyed by short name (e.g. "q8", "q4")
    pub variants: HashMap<String, VariantConfig>,
}

impl ModelFamily {
    /// Repo to fetch `tokenizer.json` from.
    pub fn tokenizer_repo(&self) -> &str {
        self.tokenizer_repo_id.as_deref().unwrap_or(&self.repo_id)
    }
}

/// A single downloadable GGUF variant
#[derive(Debug, Deserialize)]
pub struct VariantConfig {
    /// Unique variant id (e.g. "gpt2-q8")
    pub id: String,
    /// GGUF filename in the HuggingFace repo
    pub filename: String,
    /// Human-readable name, reported as the loaded model's name
    pub display_name: String,
}

static REGISTRY: OnceLock<ModelRegistry> = OnceLock::new();

/// Return the global model registry, parsed once from the embedded `models.toml`.
pub fn registry() -> &'static ModelRegistry {
    REGISTRY.get_or_init(|| {
        let toml_str = include_str!("../../models.toml");
        toml::from_str(toml_str).expect("Failed to parse models.toml")
    })
}

impl ModelRegistry {
    /// Look up a variant by its unique id (e.g. "gpt2-q8").
    ///
    /// Returns `(family, variant)` if found.
    pub fn find_variant(&self, variant_id: &str) -> Option<(&ModelFamily, &VariantConfig)> {
        self.iter_variants().find(|(_, variant)| variant.id == variant_id)
    }

    /// Iterate over all `(family, variant)` pairs.
    pub fn iter_variants(&self) -> impl Iterator<Item = (&ModelFamily, &VariantConfig)> {
        self.models
            .values()
            .flat_map(|f| f.variants.values().map(move |v| (f, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_registry() {
        let reg = registry();
        assert_eq!(reg.default_model, "gpt2-q8");
        assert_eq!(reg.models.len(), 2, "Expected exactly 2 model families");
    }

    #[test]
    fn test_default_model_is_registered() {
        let reg = registry();
        let (family, variant) = reg
            .find_variant(&reg.default_model)
            .expect("default model must be a registered variant");
        assert_eq!(family.display_name, "GPT-2 (124M)");
        assert_eq!(variant.filename, "gpt2.Q8_0.gguf");
    }

    #[test]
    fn test_find_variant() {
        let reg = registry();
        let (family, variant) = reg.find_variant("gpt2-q4").expect("variant not found");
        assert_eq!(family.repo_id, "QuantFactory/gpt2-GGUF");
        assert_eq!(variant.filename, "gpt2.Q4_K_M.gguf");
        assert_eq!(variant.display_name, "GPT-2 Q4_K_M");
    }

    #[test]
    fn test_tokenizer_repo_falls_back_to_gguf_repo() {
        let family = ModelFamily {
            repo_id: "someone/model-GGUF".to_string(),
            display_name: "Model".to_string(),
            tokenizer_repo_id: None,
            variants: HashMap::new(),
        };
        assert_eq!(family.tokenizer_repo(), "someone/model-GGUF");

        let (gpt2, _) = registry().find_variant("gpt2-q8").expect("variant not found");
        assert_eq!(gpt2.tokenizer_repo(), "openai-community/gpt2");
    }

    #[test]
    fn test_unknown_variant_returns_none() {
        let reg = registry();
        assert!(reg.find_variant("nonexistent-model").is_none());
    }

    #[test]
    fn test_variant_ids_unique() {
        let ids: Vec<&str> = registry().iter_variants().map(|(_, v)| v.id.as_str()).collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 3, "Expected exactly 3 variants, got {}", ids.len());
        assert_eq!(ids.len(), unique.len(), "Duplicate variant ids found");
    }
}
