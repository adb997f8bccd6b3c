//! GuangYuYun command-line client.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use guangyuyun_client::{
    Client, ClientConfig, DownloadOptions, ProgressCallback, TokenRequest, TransferProgress,
    UploadOptions,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "guangyuyun", version, about = "GuangYuYun storage gateway client")]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the gateway base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Auth token for file operations.
    #[arg(long, global = true, env = "GUANGYUYUN_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Issue a new auth token.
    Token {
        #[arg(long)]
        account: String,
        #[arg(long)]
        api_key: String,
        /// Token lifetime in seconds.
        #[arg(long, default_value_t = 7200)]
        ttl_secs: i64,
    },
    /// Upload a file in resumable chunks.
    Upload {
        path: PathBuf,
        /// Chunk size in bytes (1 MiB to 10 MiB).
        #[arg(long)]
        chunk_size: Option<u64>,
        /// URL the gateway calls when the file is assembled.
        #[arg(long)]
        notify: Option<String>,
    },
    /// Upload a file of at most 100 MiB in one request.
    UploadSmall { path: PathBuf },
    /// Download a file, resuming a partial output.
    Download {
        file_id: String,
        output: PathBuf,
        /// Chunk size in bytes (64 KiB to 10 MiB).
        #[arg(long)]
        chunk_size: Option<u64>,
        /// Start over instead of resuming.
        #[arg(long)]
        no_resume: bool,
    },
    /// Print the size of a stored file.
    Size { file_id: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let rt = tokio::runtime::Runtime::new()?;
    if let Err(e) = rt.block_on(run(cli, config)) {
        tracing::error!(error = %e, "command failed");
        return Err(e);
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(guangyuyun_client::default_path);
    let mut config = ClientConfig::load(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;

    if let Some(url) = &cli.base_url {
        config.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(token) = &cli.token {
        config.auth_token = Some(token.clone());
    }
    Ok(config)
}

async fn run(cli: Cli, config: ClientConfig) -> anyhow::Result<()> {
    let client = Client::new(config)?;

    match cli.command {
        Command::Token {
            account,
            api_key,
            ttl_secs,
        } => {
            let expire_time = expiry_from_now(ttl_secs);
            let resp = client
                .create_token(&TokenRequest::new(account, api_key, expire_time))
                .await?;
            let token = resp.token().context("server returned no token")?;
            println!("{token}");
        }
        Command::Upload {
            path,
            chunk_size,
            notify,
        } => {
            let options = UploadOptions {
                chunk_size,
                notification_link: notify,
                progress: Some(log_progress()),
            };
            let outcome = client.upload_large_file(&path, options, None).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::UploadSmall { path } => {
            let resp = client.upload_small_file(&path, None).await?;
            println!("{}", resp.file_id().unwrap_or_default());
        }
        Command::Download {
            file_id,
            output,
            chunk_size,
            no_resume,
        } => {
            let options = DownloadOptions {
                chunk_size,
                resume: no_resume.then_some(false),
                progress: Some(log_progress()),
                ..DownloadOptions::default()
            };
            let outcome = client
                .download_file(&file_id, &output, options, None)
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Size { file_id } => {
            let size = client.get_file_size(&file_id, None).await?;
            println!("{size}");
        }
    }
    Ok(())
}

/// Unix timestamp `ttl_secs` from now.
fn expiry_from_now(ttl_secs: i64) -> i64 {
    (chrono::Utc::now() + chrono::Duration::seconds(ttl_secs)).timestamp()
}

fn log_progress() -> ProgressCallback {
    Box::new(|p: TransferProgress| {
        let percent = (p.fraction() * 1000.0).round() / 10.0;
        let kib_per_sec = (p.bytes_per_second / 1024.0).round();
        tracing::info!(
            direction = ?p.direction,
            chunk = p.chunk_number,
            transferred = p.transferred,
            total = p.total,
            percent,
            kib_per_sec,
            eta_secs = ?p.eta_secs,
            "progress"
        );
    })
}
