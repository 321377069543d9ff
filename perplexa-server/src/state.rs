//! Shared application state and the lazily loaded model

use std::sync::Arc;

use anyhow::Context;
use perplexa_engine::model::{Backend, LanguageModel, LoadOptions, registry};
use tokio::sync::OnceCell;

use crate::config::{ModelSettings, ScoringSettings};

/// Blocking function that loads the language model.
pub type ModelLoader = Arc<dyn Fn() -> anyhow::Result<Arc<dyn LanguageModel>> + Send + Sync>;

/// Holds the model once it has been loaded.
///
/// Concurrent callers of [`ModelSlot::get`] wait on a single load. A failed
/// load leaves the slot empty, so the next caller tries again.
pub struct ModelSlot {
    cell: OnceCell<Arc<dyn LanguageModel>>,
    loader: ModelLoader,
}

impl ModelSlot {
    pub fn new(loader: ModelLoader) -> Self {
        Self {
            cell: OnceCell::new(),
            loader,
        }
    }

    /// Slot that already holds `model`.
    pub fn preloaded(model: Arc<dyn LanguageModel>) -> Self {
        let loaded = Arc::clone(&model);
        Self {
            cell: OnceCell::new_with(Some(model)),
            loader: Arc::new(move || Ok(Arc::clone(&loaded))),
        }
    }

    /// Return the model, loading it on the blocking pool if needed.
    pub async fn get(&self) -> anyhow::Result<Arc<dyn LanguageModel>> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                tracing::info!("Loading language model");
                let loader = Arc::clone(&self.loader);
                let model = tokio::task::spawn_blocking(move || loader())
                    .await
                    .context("model loader panicked")??;
                tracing::info!("Language model '{}' loaded", model.display_name());
                Ok::<_, anyhow::Error>(model)
            })
            .await?;
        Ok(Arc::clone(model))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Display name of the loaded model, if any.
    pub fn loaded_model_name(&self) -> Option<String> {
        self.cell.get().map(|model| model.display_name().to_string())
    }
}

/// Build a loader that resolves and loads the model described by `settings`.
///
/// Registry variants are downloaded from HuggingFace on first use.
pub fn model_loader(settings: &ModelSettings) -> ModelLoader {
    let settings = settings.clone();
    Arc::new(move || {
        let backend = resolve_backend(&settings)?;
        let options = LoadOptions {
            n_ctx: settings.n_ctx,
            n_threads: settings.n_threads,
        };
        let model = backend
            .load(&options)
            .with_context(|| format!("failed to load model '{}'", backend.display_name()))?;
        Ok(Arc::new(model) as Arc<dyn LanguageModel>)
    })
}

fn resolve_backend(settings: &ModelSettings) -> anyhow::Result<Backend> {
    if let (Some(gguf), Some(tokenizer)) = (&settings.gguf_path, &settings.tokenizer_path) {
        return Ok(Backend::from_paths(gguf, tokenizer));
    }
    let variant_id = settings
        .variant
        .clone()
        .unwrap_or_else(|| registry().default_model.clone());
    Backend::from_variant_id(&variant_id)
        .with_context(|| format!("failed to fetch model '{}'", variant_id))
}

/// State shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelSlot>,
    pub scoring: ScoringSettings,
}

impl AppState {
    pub fn new(model: ModelSlot, scoring: ScoringSettings) -> Self {
        Self {
            model: Arc::new(model),
            scoring,
        }
    }
}
