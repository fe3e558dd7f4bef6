mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sbert_service::client::SbertClient;
use sbert_service::config::SbertConfig;
use sbert_service::server;

#[derive(Parser)]
#[command(name = "sbert", version, about = "Sentence-embedding service and dataset precompute tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP embedding service
    Serve {
        /// Load the model at startup instead of on the first request
        #[arg(long)]
        preload: bool,
    },
    /// Embed every record of a microcontents JSON file and rewrite it in place
    Precompute {
        /// Dataset file with a top-level `microcontents` array
        file: PathBuf,
        /// Only embed records that are not yet marked `embeddingCalculated`
        #[arg(long)]
        missing_only: bool,
    },
    /// Show how many records of a dataset already have embeddings
    Stats {
        file: PathBuf,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Query a running service
    Client {
        /// Service base URL (defaults to SBERT_SERVICE_URL or http://localhost:3005)
        #[arg(long)]
        url: Option<String>,
        #[command(subcommand)]
        action: ClientAction,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ClientAction {
    /// Check that the service is up
    Health,
    /// Print the embedding of a text
    Embed { text: String },
    /// Print the cosine similarity of two texts
    Similarity { text1: String, text2: String },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.sbert/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SbertConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { preload } => {
            server::serve(config, preload).await?;
        }
        Command::Precompute { file, missing_only } => {
            cli::precompute::precompute(&config, file, missing_only).await?;
        }
        Command::Stats { file, json } => {
            cli::stats::stats(&file, json)?;
        }
        Command::Client { url, action } => {
            let client = SbertClient::new(url.unwrap_or(config.client.service_url));
            match action {
                ClientAction::Health => cli::query::health(&client).await?,
                ClientAction::Embed { text } => cli::query::embedding(&client, &text).await?,
                ClientAction::Similarity { text1, text2 } => {
                    cli::query::similarity(&client, &text1, &text2).await?
                }
            }
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
