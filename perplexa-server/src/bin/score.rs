use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use perplexa_engine::PerplexityScorer;
use perplexa_server::{Settings, model_loader};

/// Score text for AI-generated-ness from the command line
#[derive(Parser, Debug)]
#[command(name = "perplexa-score")]
#[command(about = "Compute perplexity, score and label for a piece of text", long_about = None)]
struct Args {
    /// Text to score (reads --file or stdin when omitted)
    text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Settings file (defaults to the user config file, then built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model variant id from the registry
    #[arg(short, long)]
    model: Option<String>,

    /// Step between window starts, in tokens
    #[arg(long)]
    stride: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,
}

fn read_input(args: &Args) -> anyhow::Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    Ok(text)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    perplexa_server::init_tracing(args.verbose);

    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load().context("failed to load settings")?,
    };
    if let Some(model) = &args.model {
        settings.model.variant = Some(model.clone());
    }
    if let Some(stride) = args.stride {
        settings.scoring.stride = stride;
    }
    settings.validate()?;

    let text = read_input(&args)?;
    let min_chars = settings.scoring.min_text_chars;
    if text.trim().chars().count() < min_chars {
        bail!("text must be at least {} characters after trimming", min_chars);
    }

    let model = model_loader(&settings.model)()?;
    let scorer = PerplexityScorer::with_stride(model, settings.scoring.stride);
    let assessment = scorer.assess(&text)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        println!("model:      {}", scorer.model().display_name());
        println!("perplexity: {:.3}", assessment.perplexity);
        println!("score:      {:.3}", assessment.score);
        println!("label:      {}", assessment.label);
    }
    Ok(())
}
