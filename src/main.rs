//! gasprice - Dutch fuel station prices from price-board images
//!
//! Serves the HTTP API, or resolves stations once from the command line.

use std::sync::Arc;

use clap::Parser;
use futures::future::join_all;

use gasprice::api;
use gasprice::cli::{Cli, Command};
use gasprice::logging::init_logging;
use gasprice::resolver::Resolver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    init_logging(&settings.log_level);
    let resolver = Arc::new(Resolver::from_settings(&settings)?);

    match cli.command {
        Command::Serve { .. } => {
            api::serve(&settings.server_address(), resolver).await?;
        }
        Command::Lookup { station_ids, fuel } => {
            // Resolve all stations concurrently
            let results = join_all(
                station_ids
                    .iter()
                    .map(|id| resolver.resolve(id, fuel.as_deref())),
            )
            .await;
            let views = results.into_iter().collect::<Result<Vec<_>, _>>()?;

            let json = match views.as_slice() {
                [single] => serde_json::to_string_pretty(single)?,
                _ => serde_json::to_string_pretty(&views)?,
            };
            println!("{}", json);
        }
    }

    Ok(())
}
