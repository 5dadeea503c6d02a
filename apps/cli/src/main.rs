//! boxreg command-line entry point.

mod app;
mod config;
mod progress;

use std::path::PathBuf;

use boxreg_protocol::ChecksumType;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "boxreg")]
#[command(about = "Resumable, content-addressed box uploads")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config location)
    #[arg(long, global = true, env = "BOXREG_CONFIG")]
    config: Option<PathBuf>,

    /// Registry API root, e.g. https://registry.example/api/v1
    #[arg(long, global = true, env = "BOXREG_API_ROOT")]
    api_root: Option<String>,

    /// API token
    #[arg(long, global = true, env = "BOXREG_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a box, resuming any earlier partial upload of the same file
    Upload(UploadArgs),
    /// Print the checksum the registry would key the box under
    Hash(HashArgs),
}

#[derive(Args)]
pub struct UploadArgs {
    /// Path to the .box file
    pub file: PathBuf,

    /// Box tag
    #[arg(long = "box", value_name = "OWNER/NAME")]
    pub box_tag: String,

    #[arg(long)]
    pub version: String,

    /// Provider name, e.g. virtualbox
    #[arg(long)]
    pub provider: String,

    /// Refuse to upload unless the file has this checksum
    #[arg(long, value_name = "HEX")]
    pub expect_checksum: Option<String>,

    /// Override the configured chunk size (bytes)
    #[arg(long)]
    pub chunk_size: Option<u64>,
}

#[derive(Args)]
pub struct HashArgs {
    /// Path to the file
    pub file: PathBuf,

    /// Hashing window (bytes)
    #[arg(long)]
    pub window: Option<usize>,

    #[arg(long, default_value = "md5")]
    pub checksum_type: ChecksumType,
}

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info,boxreg=debug";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load(cli.config.as_deref())?
        .with_overrides(cli.api_root, cli.token);

    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Command::Upload(args) => rt.block_on(app::upload(args, config)),
        Command::Hash(args) => rt.block_on(app::hash(args, config)),
    }
}
