use std::sync::Arc;
use std::time::Duration;

use cnpjx_core::{
    BatchDriver, BatchObserver, BatchProgress, LookupOptions, LookupOrchestrator, RegistryRecord,
};
use tracing::{info, warn};

use crate::cli::BatchArgs;
use crate::error::CliError;

use super::CommandOutput;

/// Logs progress to the tracing subscriber.
struct LogObserver;

impl BatchObserver for LogObserver {
    fn on_progress(&mut self, progress: &BatchProgress) {
        info!(
            item = progress.index + 1,
            total = progress.total,
            registry_id = progress.registry_id.as_str(),
            "resolving"
        );
    }

    fn on_complete(&mut self, records: &[RegistryRecord]) {
        let failures = records.iter().filter(|record| record.is_failure()).count();
        info!(total = records.len(), failures, "batch complete");
    }
}

pub async fn run(
    args: &BatchArgs,
    orchestrator: Arc<LookupOrchestrator>,
    configured_delay: Duration,
) -> Result<CommandOutput, CliError> {
    let content = std::fs::read_to_string(&args.file)?;
    let ids = parse_id_lines(&content);
    if ids.is_empty() {
        return Err(CliError::EmptyInput(args.file.display().to_string()));
    }

    let delay = args
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or(configured_delay);
    let options = LookupOptions {
        use_cache: !args.no_cache,
        allow_fallback: true,
    };
    let driver = BatchDriver::new(orchestrator)
        .with_delay(delay)
        .with_options(options);

    let stop = driver.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current item");
            stop.stop();
        }
    });

    let report = driver.run(ids, &mut LogObserver).await;
    interrupt.abort();

    let failures = report.failure_count();
    Ok(CommandOutput {
        data: serde_json::to_value(&report)?,
        failures,
    })
}

/// One identifier per line; blank lines and `#` comments are skipped.
fn parse_id_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}
