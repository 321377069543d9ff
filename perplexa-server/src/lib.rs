//! perplexa-server: HTTP function scoring text for AI-generated-ness
//!
//! `POST /api/score` with `{"text": "..."}` answers `{"score": 0..5, "label": "..."}`.
//! The language model is loaded on the first request and shared afterwards.

pub mod api;
pub mod config;
pub mod error;
pub mod state;

pub use api::{SCORE_PATH, ScoreResponse, router};
pub use config::Settings;
pub use error::ApiError;
pub use state::{AppState, ModelLoader, ModelSlot, model_loader};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise info level, or debug with `verbose`.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "perplexa_server=debug,perplexa_engine=debug,tower_http=debug"
    } else {
        "perplexa_server=info,perplexa_engine=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
