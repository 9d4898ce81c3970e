//! Karat command-line tool.
//!
//! Output is JSON on stdout; logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use karat_core::lifecycle::Document;
use karat_core::returns::{Return, compute_remaining};
use karat_core::valuation::ValuationEngine;
use karat_shared::AppConfig;
use karat_shared::config::{LoggingConfig, ValuationConfig};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Jewellery back office valuation and returns tool.
#[derive(Parser, Debug)]
#[command(name = "karat", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Value a job card, invoice or purchase.
    Value {
        /// Document JSON file.
        document: PathBuf,
    },
    /// Remaining returnable balance per line of a source document.
    Remaining {
        /// Source document JSON file.
        source: PathBuf,
        /// JSON array of returns against the source.
        returns: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let output = run(cli.command, &config.valuation)?;
    println!("{output}");
    Ok(())
}

fn run(command: Command, config: &ValuationConfig) -> anyhow::Result<String> {
    let engine = ValuationEngine::new(config.precision);

    let output = match command {
        Command::Value { document } => {
            let document: Document = read_json(&document)?;
            let valuation = document
                .valuation(&engine)
                .with_context(|| format!("document {} failed to value", document.id))?;
            info!(
                document_id = %document.id,
                grand_total = %valuation.grand_total,
                currency = %config.currency_code,
                "Document valued"
            );
            serde_json::to_string_pretty(&valuation)?
        }
        Command::Remaining { source, returns } => {
            let source: Document = read_json(&source)?;
            let returns: Vec<Return> = read_json(&returns)?;
            let remaining = compute_remaining(&source, &returns, None, &engine)
                .with_context(|| format!("document {} failed to value", source.id))?;
            info!(
                document_id = %source.id,
                returns = returns.len(),
                lines = remaining.len(),
                "Remaining balance computed"
            );
            serde_json::to_string_pretty(&remaining)?
        }
    };
    Ok(output)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
