//! Dockhand CLI - operator interface for the registry tool bridge.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries tool output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dockhand=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Credentials(args) => commands::credentials::run(args).await,
        Commands::Tools(args) => commands::tools::run(&args),
        Commands::Call(args) => commands::call::run(args).await,
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Keygen(args) => {
            commands::keygen::run(&args);
            Ok(())
        }
        Commands::Version => {
            println!("dockhand {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
