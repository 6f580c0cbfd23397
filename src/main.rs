use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use paperforge::cli::{Cli, Command, commands};
use paperforge::store::{JsonFileStore, Store};
use tracing_subscriber::{EnvFilter, fmt};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "paperforge=debug"
    } else {
        "paperforge=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt().with_env_filter(env_filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.to_config()?;
    init_tracing(config.verbose);

    let store: Arc<dyn Store> = Arc::new(JsonFileStore::open(&config.store.data_dir).await?);

    match &cli.command {
        Command::Run(args) => commands::run(config, args, store).await,
        Command::Status { project_id } => commands::status(project_id, store).await,
        Command::Ask(args) => commands::ask(config, args, store).await,
    }
}
