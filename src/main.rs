use clap::Parser;

use dirwatch::Settings;
use dirwatch::cli::commands::{init, watch};
use dirwatch::cli::{Cli, Commands};
use dirwatch::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init_with_config(&settings.logging);

    let result = match cli.command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(&settings),
        Commands::Watch { dir, pattern, list } => {
            let config = watch::resolve_watch_config(&settings, dir, pattern);
            watch::run_watch(&config, list).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
