//! HaruFilm uploader entry point.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use harufilm_uploader::UploadMode;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "harufilm-upload", version)]
#[command(about = "Upload HaruFilm diary videos")]
#[command(
    after_help = "Environment:\n  HARUFILM_API_URL        API base URL override\n  HARUFILM_ACCESS_TOKEN   Bearer token override\n  RUST_LOG                Log filter (default: info)"
)]
struct Cli {
    /// Config file (default: ~/.config/harufilm/uploader.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, overriding config and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a video with its thumbnail.
    Upload {
        #[arg(long)]
        video: PathBuf,
        #[arg(long)]
        thumbnail: PathBuf,
        /// Inline JSON array or path to a JSON file.
        #[arg(long)]
        timestamps: Option<String>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Extra attempts after a failed upload.
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Inspect stored upload sessions.
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
}

#[derive(Subcommand)]
enum SessionsCommand {
    List,
    ClearExpired,
    Remove { file_key: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Resumable,
    Batch,
}

impl From<ModeArg> for UploadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Resumable => UploadMode::Resumable,
            ModeArg::Batch => UploadMode::Batch,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting HaruFilm uploader"
    );

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => CliConfig::load_from(path)?,
        None => CliConfig::load()?,
    };
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    match cli.command {
        Command::Upload {
            video,
            thumbnail,
            timestamps,
            mode,
            retries,
        } => {
            let args = commands::UploadArgs {
                video: &video,
                thumbnail: &thumbnail,
                timestamps: timestamps.as_deref(),
                mode: mode.map(UploadMode::from).unwrap_or(config.mode),
                retries,
            };
            commands::upload(&config, args).await
        }
        Command::Sessions { command } => match command {
            SessionsCommand::List => commands::list_sessions(&config),
            SessionsCommand::ClearExpired => commands::clear_expired(&config),
            SessionsCommand::Remove { file_key } => commands::remove_session(&config, &file_key),
        },
    }
}
