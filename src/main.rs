use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use studymate::config::Config;
use studymate::embedder::download::{default_model_dir, download_model_files};
use studymate::server::{self, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "studymate", version, about = "Study assistant backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Path to the JSON config file
        #[arg(long, default_value = "")]
        config: String,
    },
    /// Fetch the ONNX embedding model files
    DownloadModel {
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("studymate=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve {
        config: String::new(),
    }) {
        Command::Serve { config } => {
            info!("Starting StudyMate v{}", env!("CARGO_PKG_VERSION"));
            let config = Config::load(&config)?;
            let state = AppState::from_config(config).await?;
            server::serve(state).await
        }
        Command::DownloadModel { model_dir } => {
            let dir = model_dir.unwrap_or_else(default_model_dir);
            tokio::task::spawn_blocking(move || download_model_files(&dir))
                .await
                .context("download task failed")?
        }
    }
}
