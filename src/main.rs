//! uploadgram - upload to Telegram from the terminal
//!
//! Usage:
//!   uploadgram <chat_id> <dir_path> [--delete_on_success] [--fd] [--t <thumb>]
//!              [--caption <text>] [--progress] [--topic <id>]

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uploadgram::{
    config::Config,
    prompt::ask,
    signal::{ctrl_c, until_interrupted},
    telegram::{AccountInfo, TelegramBackend},
    upload::{run_upload, UploadOptions, UploadRequest},
};

#[derive(Parser)]
#[command(name = "uploadgram")]
#[command(author = "uploadgram Contributors")]
#[command(version)]
#[command(about = "Upload to Telegram from the terminal")]
struct Cli {
    /// Target chat ID or username
    chat_id: Option<String>,

    /// Path to file or directory to upload
    dir_path: Option<PathBuf>,

    /// Delete file after successful upload
    #[arg(long = "delete_on_success")]
    delete_on_success: bool,

    /// Force uploading as documents
    #[arg(long = "fd")]
    fd: bool,

    /// Path to custom thumbnail
    #[arg(long = "t", value_name = "PATH")]
    t: Option<PathBuf>,

    /// Custom caption for the files
    #[arg(long)]
    caption: Option<String>,

    /// Show upload progress in terminal
    #[arg(long)]
    progress: bool,

    /// Forum topic ID
    #[arg(long)]
    topic: Option<i32>,

    /// Configuration file path
    #[arg(short, long, default_value = "~/.config/uploadgram/config.json")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("uploadgram={}", level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();

    let config_path = expand_tilde(&cli.config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("An error occurred: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(cli, &config_path));
    // An interrupted prompt may still sit in a stdin read
    runtime.shutdown_background();

    if let Err(e) = result {
        error!("An error occurred: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load_or_env(config_path).context("Failed to load configuration")?;
    config.ensure_directories()?;

    let backend = TelegramBackend::new(config.telegram.clone());
    let result = match until_interrupted(session(&backend, &config, cli), ctrl_c()).await {
        Some(result) => result,
        None => {
            info!("Interrupted, stopping");
            Ok(())
        }
    };
    backend.stop().await;
    result
}

async fn session(backend: &TelegramBackend, config: &Config, cli: Cli) -> anyhow::Result<()> {
    let account = backend
        .start()
        .await
        .context("Failed to start Telegram client")?;

    let request = build_request(backend, cli).await?;
    upload(backend, &account, config, &request).await
}

async fn upload(
    backend: &TelegramBackend,
    account: &AccountInfo,
    config: &Config,
    request: &UploadRequest,
) -> anyhow::Result<()> {
    let report = run_upload(backend, account, &config.upload, request).await?;
    if report.is_none() {
        info!("Nothing to upload at {:?}", request.path);
    }
    Ok(())
}

/// Fill in anything missing from the command line by asking
async fn build_request(backend: &TelegramBackend, cli: Cli) -> anyhow::Result<UploadRequest> {
    let chat = match cli.chat_id {
        Some(chat) => chat,
        None => ask("Enter chat_id to send the files to: ").await?,
    };
    let chat_id = backend
        .resolve_chat(&chat)
        .await
        .with_context(|| format!("Cannot send to {:?}", chat))?;

    let mut path = match cli.dir_path {
        Some(path) => path,
        None => PathBuf::from(ask("Enter path to upload to Telegram: ").await?),
    };
    while !path.exists() {
        println!(
            "Path does not exist. Current directory contents: {:?}",
            current_dir_listing()
        );
        path = PathBuf::from(ask("Please enter valid path to upload: ").await?);
    }

    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()?.join(path)
    };

    Ok(UploadRequest {
        chat_id,
        path,
        topic: cli.topic,
        options: UploadOptions {
            delete_on_success: cli.delete_on_success,
            force_document: cli.fd,
            thumbnail: cli.t,
            caption: cli.caption,
            console_progress: cli.progress,
        },
    })
}

fn current_dir_listing() -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(".")
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Expand ~ to home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
