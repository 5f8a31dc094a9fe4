use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use termsheet_analyzer::extract::{extract, mime_type_for_path};
use termsheet_analyzer::{Config, TermSheetAnalyzer};

#[derive(Parser)]
#[command(name = "termsheet-analyzer", version, author = "TigreRoll")]
#[command(about = "Analyze term sheets for control, economics and payoff terms")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a PDF, DOCX or plain-text term sheet
    Analyze {
        /// Document to analyze
        file: PathBuf,

        /// Write the JSON result here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Also write it as TOML to this path
        #[arg(long, value_name = "FILE")]
        write: Option<PathBuf>,
    },

    /// Serve the HTTP upload endpoint
    #[cfg(feature = "api")]
    Serve {
        /// Listening port (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Populate the environment before configuration reads it
    let env_loaded = dotenvy::from_filename(".env.local").is_ok();

    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        Config::from_env()
    });

    let default_filter = if cli.verbose {
        "termsheet_analyzer=debug,info".to_string()
    } else {
        format!("termsheet_analyzer={},warn", config.output.log_level)
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    if env_loaded {
        info!("Loaded environment variables from .env.local");
    }

    config.validate()?;

    match cli.command {
        Commands::Analyze { file, output } => run_analyze(&config, &file, output.as_deref()).await,
        Commands::Config { write } => {
            println!("{}", config.summary());
            if let Some(path) = write {
                config.save(&path.to_string_lossy())?;
            }
            Ok(())
        }
        #[cfg(feature = "api")]
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let analyzer = TermSheetAnalyzer::from_config(&config).await?;
            termsheet_analyzer::api::ApiServer::new(analyzer, config, port)
                .start()
                .await
        }
    }
}

async fn run_analyze(config: &Config, file: &Path, output: Option<&Path>) -> Result<()> {
    info!("🚀 Term Sheet Analyzer starting...");
    info!("📁 Input file: {}", file.display());

    let text = read_document(file).await?;
    if text.trim().is_empty() {
        error!("No text could be read from {}", file.display());
        return Err(anyhow!("The input document is empty"));
    }

    if !config.gemini.has_api_key() {
        warn!("GOOGLE_API_KEY is not set; the analysis will be empty");
    }

    let analyzer = TermSheetAnalyzer::from_config(config).await?;

    let start_time = std::time::Instant::now();
    let result = analyzer.analyze(&text).await;
    info!("🎉 Analysis completed in {:.2}s", start_time.elapsed().as_secs_f64());

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            info!("💾 Result saved to: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn read_document(file: &Path) -> Result<String> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read file at {}", file.display()))?;

    match mime_type_for_path(file) {
        // PDF parsing is CPU bound and may panic on malformed input
        Some(mime_type) => tokio::task::spawn_blocking(move || extract(&bytes, mime_type))
            .await
            .map_err(|e| anyhow!("Text extraction failed for {}: {}", file.display(), e))?
            .map_err(Into::into),
        None => String::from_utf8(bytes)
            .with_context(|| format!("{} is neither PDF, DOCX nor UTF-8 text", file.display())),
    }
}
