use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pastebin_lite::commands::{migrate, serve};
use pastebin_lite::config::Config;
use pastebin_lite::App;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(version, about = "Share text with an expiry time or view limit")]
struct Cli {
    /// Path to the config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create the paste table and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // try to load .env, ignoring any errors
    _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pastebin_lite=info,tower_http=info")),
        )
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let app = App::connect(config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve::run(app).await,
        Command::Migrate => migrate::run(app).await,
    }
}
