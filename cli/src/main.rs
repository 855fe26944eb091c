mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.debug);

    let config_path = cli.config.as_deref();
    let output = commands::Output::new(cli.quiet, cli.debug);

    match cli.command {
        Commands::Index(args) => commands::handle_index(args, config_path, &output)?,
        Commands::Unpack(args) => commands::handle_unpack(args, &output)?,
        Commands::Update(args) => commands::handle_update(args, &output)?,
        Commands::Search(args) => commands::handle_search(args)?,
        Commands::Status(args) => commands::handle_status(args)?,
    }

    Ok(())
}

/// `RUST_LOG` wins over `-q` / `-d`.
fn init_tracing(quiet: bool, debug: bool) {
    let level = if quiet {
        "error"
    } else if debug {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
