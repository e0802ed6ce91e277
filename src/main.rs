//! snaplabel - on-device photo classification
//!
//! Classifies a photo with a local ONNX model and prints the top labels
//! as integer percentages that sum to 100.

mod app;
mod classify;
mod config;
mod dirs;
mod models;
mod ranking;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::Phase;
use crate::classify::{ClassifyError, OnnxClassifier};
use crate::config::AppConfig;
use crate::models::{ModelKind, ModelManager};
use crate::ranking::{rank_for_display, RankedLabel};

/// snaplabel - classify photos with an on-device model
#[derive(Parser, Debug)]
#[command(name = "snaplabel")]
#[command(about = "Classify a photo and print percentage-ranked labels")]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify an image file
    Classify {
        /// Path to the image
        image: PathBuf,

        /// Number of labels to show
        #[arg(short, long)]
        top: Option<usize>,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the cached model files
    Models {
        #[command(subcommand)]
        command: ModelsCommand,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file if none exists
    Init,
}

#[derive(Subcommand, Debug)]
enum ModelsCommand {
    /// Show which model files are cached
    Status,
    /// Download any missing model files
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "snaplabel=debug"
    } else {
        "snaplabel=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::load_or_default();
    let manager = model_manager(&config)?;

    match args.command {
        Command::Classify { image, top, json } => {
            run_classify(&config, manager, image, top, json).await
        }
        Command::Models { command } => match command {
            ModelsCommand::Status => {
                print_model_status(&manager);
                Ok(())
            }
            ModelsCommand::Download => {
                manager.ensure_all().await?;
                println!("All model files are ready in {:?}", manager.models_dir());
                Ok(())
            }
        },
        Command::Config { command } => match command {
            ConfigCommand::Init => {
                let path = dirs::get_config_dir()?.join("config.toml");
                if path.exists() {
                    println!("Config already exists at {:?}", path);
                } else {
                    config::save_config(&AppConfig::default(), &path)?;
                    println!("Wrote default config to {:?}", path);
                }
                Ok(())
            }
        },
    }
}

fn model_manager(config: &AppConfig) -> Result<ModelManager> {
    match &config.model.models_dir {
        Some(dir) => ModelManager::with_dir(dir.clone()),
        None => ModelManager::new(),
    }
}

async fn run_classify(
    config: &AppConfig,
    manager: ModelManager,
    image: PathBuf,
    top: Option<usize>,
    json: bool,
) -> Result<()> {
    let intra_threads = config.model.intra_threads;

    let phase = app::classify_photo(
        || async move {
            let network = manager
                .ensure(ModelKind::Network)
                .await
                .map_err(ClassifyError::ModelLoad)?;
            let labels = manager
                .ensure(ModelKind::Labels)
                .await
                .map_err(ClassifyError::ModelLoad)?;

            OnnxClassifier::load(&network, &labels, intra_threads)
        },
        &image,
    )
    .await;

    match phase {
        Phase::Done(results) => {
            let top_n = top.unwrap_or(config.display.top_n);
            let ranked = select_for_display(results, top_n, config.display.hide_zero);

            if json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else {
                for result in &ranked {
                    println!("{:>3}%  {}", result.percentage, result.label);
                }
            }
            Ok(())
        }
        Phase::Failed(failure) => anyhow::bail!("{}", failure),
        phase => anyhow::bail!("classification ended in non-terminal phase {:?}", phase),
    }
}

/// Apply the display contract: sort descending, optionally drop 0% entries,
/// keep the top N.
fn select_for_display(results: Vec<RankedLabel>, top_n: usize, hide_zero: bool) -> Vec<RankedLabel> {
    if hide_zero {
        rank_for_display(results, top_n)
    } else {
        let mut results = results;
        results.sort_by(|a, b| b.percentage.cmp(&a.percentage));
        results.truncate(top_n);
        results
    }
}

fn print_model_status(manager: &ModelManager) {
    info!("Model cache: {:?}", manager.models_dir());
    println!("Model files in {:?}:", manager.models_dir());
    for status in manager.status() {
        let size = status
            .size_bytes
            .map(|bytes| format!("{:.2} MB", bytes as f64 / 1_000_000.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:24} {:10} {}",
            status.kind.display_name(),
            if status.available { "ready" } else { "missing" },
            size
        );
    }
    println!(
        "Ready to classify: {}",
        if manager.all_available() { "yes" } else { "no (run `snaplabel models download`)" }
    );
}
