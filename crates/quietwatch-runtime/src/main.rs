//! quietwatch: shared audio quietness watcher binary.
//! Single-process binary wiring the simulated capture stack to the
//! composite status broadcaster.

use clap::Parser;

mod cli;
mod cmd_ping;
mod cmd_watch;
mod sim;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // stdout carries the status feed; logs go to stderr.
    let filter = std::env::var("QUIETWATCH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        cli::Command::Watch(opts) => cmd_watch::cmd_watch(opts).await?,
        cli::Command::Ping(opts) => cmd_ping::cmd_ping(opts).await?,
    }

    Ok(())
}
