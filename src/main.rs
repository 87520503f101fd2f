use std::path::PathBuf;
use std::process::exit;

use arena_bot::announce::{self, LogChannel};
use arena_bot::{achievements, lifecycle, logger, Config, State};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match Config::from_file(&args.config).await {
        Ok(config) => config.with_environment(),
        Err(err) => {
            eprintln!("Failed to load config from {}: {}", args.config.display(), err);
            exit(1);
        }
    };

    logger::init(config.loglevel);

    log::info!("Using config: {:?}", config);

    let announcer = announce::spawn(LogChannel);

    let state = State::new(config, announcer)?;

    state.store.create_tables().await?;
    achievements::install_defaults(&state).await?;

    lifecycle::spawn_sweeper(state.clone());

    tokio::signal::ctrl_c().await?;

    log::info!("Shutting down");

    Ok(())
}
