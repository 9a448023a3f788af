use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use git_autosync::config::Config;
use git_autosync::run::{self, EXIT_CONFIG_ERROR};
use git_autosync::GitCommand;

#[derive(Parser)]
#[command(name = "git-autosync")]
#[command(about = "Merge upstream branches into local working copies during work hours")]
#[command(version)]
struct Cli {
    /// Run even outside the configured work days and schedule
    #[arg(long)]
    force: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;
    info!("Starting git-autosync v{}", env!("CARGO_PKG_VERSION"));

    let code = match Config::default_config_path() {
        Ok(config_path) => run::run(GitCommand::new(), &config_path, cli.force).await,
        Err(e) => {
            tracing::error!("{:#}", e);
            EXIT_CONFIG_ERROR
        }
    };

    std::process::exit(code);
}

/// Initialize logging; `RUST_LOG` overrides the default `info` level
fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}
