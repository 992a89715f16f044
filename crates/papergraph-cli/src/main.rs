//! Papergraph CLI - extract, ingest and query a knowledge graph of AI papers.

use clap::Parser;
use papergraph_cli::commands;
use papergraph_cli::{AppConfig, Cli, Command, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> papergraph_cli::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;

    let format = cli.format.map(Into::into).unwrap_or(config.output.format);
    let color_enabled = !cli.no_color && config.output.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        None => commands::execute_chat(Default::default(), &config, &formatter).await?,
        Some(Command::Chat(args)) => commands::execute_chat(args, &config, &formatter).await?,
        Some(Command::Extract(args)) => commands::execute_extract(args, &config, &formatter).await?,
        Some(Command::Ingest(args)) => commands::execute_ingest(args, &config, &formatter).await?,
        Some(Command::Ask(args)) => commands::execute_ask(args, &config, &formatter).await?,
        Some(Command::Providers) => commands::execute_providers(&config, &formatter)?,
        Some(Command::Stats(args)) => commands::execute_stats(args, &config, &formatter).await?,
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
