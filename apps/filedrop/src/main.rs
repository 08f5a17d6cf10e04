//! filedrop command-line client entry point.

mod app;
mod cli;
mod config;
mod render;

use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse(std::env::args().skip(1))?;
    if cli.command == Command::Help {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    let config = config::Config::load()?;

    // RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let server = cli.server.clone().unwrap_or_else(|| config.server_url.clone());
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        server = %server,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, &server, cli.command))
}
