mod batch;
mod lookup;
mod validate;

use std::sync::Arc;

use cnpjx_core::{LookupConfig, LookupOrchestrator, MemoryProfileStore, ProfileStore};
use cnpjx_warehouse::{ProfileWarehouse, WarehouseConfig};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// JSON payload to print plus how many of its records are failures.
pub struct CommandOutput {
    pub data: Value,
    pub failures: usize,
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    match &cli.command {
        Command::Validate(args) => validate::run(args),
        Command::Lookup(args) => {
            let config = load_config(cli)?;
            let orchestrator = build_orchestrator(cli, config)?;
            lookup::run(args, &orchestrator).await
        }
        Command::Batch(args) => {
            let config = load_config(cli)?;
            let delay = config.batch.delay();
            let orchestrator = Arc::new(build_orchestrator(cli, config)?);
            batch::run(args, orchestrator, delay).await
        }
    }
}

fn load_config(cli: &Cli) -> Result<LookupConfig, CliError> {
    match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            Ok(LookupConfig::load(path)?)
        }
        None => Ok(LookupConfig::default()),
    }
}

fn build_orchestrator(cli: &Cli, config: LookupConfig) -> Result<LookupOrchestrator, CliError> {
    let store: Arc<dyn ProfileStore> = if cli.memory_cache {
        Arc::new(MemoryProfileStore::new())
    } else {
        let warehouse_config = match &config.cache.db_path {
            Some(path) => WarehouseConfig::with_db_path(path.clone()),
            None => WarehouseConfig::default(),
        };
        let warehouse = ProfileWarehouse::open(warehouse_config)?;
        debug!(path = %warehouse.db_path().display(), "using duckdb lookup cache");
        Arc::new(warehouse)
    };

    Ok(LookupOrchestrator::builder()
        .with_config(config)
        .with_real_clients()
        .with_store(store)
        .build()?)
}
