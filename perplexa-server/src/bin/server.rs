use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use perplexa_server::{AppState, ModelSlot, Settings, model_loader, router};

/// Perplexity-based AI text scoring server
#[derive(Parser, Debug)]
#[command(name = "perplexa-server")]
#[command(about = "HTTP function scoring text for AI-generated-ness", long_about = None)]
struct Args {
    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,

    /// Settings file (defaults to the user config file, then built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Model variant id from the registry
    #[arg(short, long)]
    model: Option<String>,

    /// Load the model before accepting requests
    #[arg(long)]
    preload: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    perplexa_server::init_tracing(args.verbose);

    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load().context("failed to load settings")?,
    };
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(model) = args.model {
        settings.model.variant = Some(model);
    }
    settings.server.preload |= args.preload;

    let state = AppState::new(
        ModelSlot::new(model_loader(&settings.model)),
        settings.scoring.clone(),
    );

    if settings.server.preload {
        state.model.get().await.context("failed to preload model")?;
    } else {
        tracing::info!("Model will be loaded on the first request");
    }

    let app = router(state, settings.server.body_limit_bytes);

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("failed to run server")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
