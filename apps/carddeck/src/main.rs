mod config;
mod deck;
mod errors;
mod layout;
mod models;
mod pdf;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{normalize_base_url, Config};
use crate::deck::{load_catalog, render_deck, CategoryPalette, DeckOptions, PrintMode};
use crate::errors::AppError;
use crate::layout::{DeckSize, SizeProfile};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a printable PDF deck of threat cards")]
struct Args {
    /// Output file name, relative to the output directory
    #[arg(default_value = "deck.pdf")]
    output: PathBuf,

    /// Card format: A4 or A6
    #[arg(default_value = "A6")]
    size: String,

    /// Sides to print: Fronts, Backs or FrontAndBack
    #[arg(default_value = "FrontAndBack")]
    mode: String,

    /// Threat catalog JSON (overrides DECK_PATH)
    #[arg(long)]
    deck: Option<PathBuf>,

    /// Output directory (overrides OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Site the QR codes link to (overrides QR_BASE_URL)
    #[arg(long)]
    qr_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    let args = Args::parse();

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting carddeck v{}", env!("CARGO_PKG_VERSION"));

    let size: DeckSize = args.size.parse()?;
    let profile = SizeProfile::for_size(size);
    let options = DeckOptions {
        mode: PrintMode::parse_or_default(&args.mode),
        qr_base_url: args
            .qr_base_url
            .as_deref()
            .map(normalize_base_url)
            .unwrap_or_else(|| config.qr_base_url.clone()),
        generated_on: chrono::Local::now().date_naive(),
    };
    info!(size = %size, mode = %options.mode, "Deck settings");

    let deck_path = args.deck.unwrap_or_else(|| config.deck_path.clone());
    let catalog = load_catalog(&deck_path, &CategoryPalette::builtin()).await?;

    // Layout and PDF serialization are CPU-bound
    let title = format!("PLOT4ai ({size})");
    let (bytes, summary) = tokio::task::spawn_blocking(move || {
        let deck = render_deck(&catalog, &profile, &options)?;
        let bytes = pdf::write_pdf(&deck.pages, &profile, &title)?;
        Ok::<_, AppError>((bytes, deck.summary))
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Render task panicked: {e}")))??;

    let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir.clone());
    tokio::fs::create_dir_all(&output_dir).await?;
    let output_path = output_dir.join(&args.output);
    tokio::fs::write(&output_path, &bytes).await?;

    info!(
        path = %output_path.display(),
        pages = summary.pages,
        cards = summary.cards,
        bytes = bytes.len(),
        "Deck written"
    );
    Ok(())
}
