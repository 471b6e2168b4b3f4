//! tldw CLI entry point.

use clap::Parser;
use std::path::PathBuf;
use tldw::cli::{commands, Cli, Commands, Output};
use tldw::config::Settings;
use tldw::TldwError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("tldw={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        Output::error(&format!("{:#}", e));
        let code = e
            .downcast_ref::<TldwError>()
            .map(TldwError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);

    // Execute command
    match &cli.command {
        Commands::Run { limit, resume, ids } => {
            let settings = Settings::load_from(Some(&config_path))?;
            commands::run_batch(*limit, *resume, ids.as_deref(), settings).await?;
        }

        Commands::Chunks { limit, ids } => {
            let settings = Settings::load_from(Some(&config_path))?;
            commands::run_chunks(*limit, ids.as_deref(), settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &config_path)?;
        }
    }

    Ok(())
}
