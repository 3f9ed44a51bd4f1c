// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use nexus_client::ClientConfig;

mod cli;
mod commands;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        match e.field_errors() {
            Some(errors) => {
                for error in errors {
                    log::error!("{error}");
                }
            }
            None => log::error!("{}", e),
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    let config = ClientConfig::from_env();
    let config = match &args.api_url {
        Some(url) => ClientConfig::new(url)?.with_timeout(config.timeout),
        None => config,
    };

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::Register(register) => commands::register(&config, register).await?,
        Commands::Entries {
            credentials,
            action,
        } => commands::entries(&config, &credentials, action).await?,
        Commands::Insights { credentials } => commands::insights(&config, &credentials).await?,
    }

    Ok(())
}
