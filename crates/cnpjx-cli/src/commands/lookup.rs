use cnpjx_core::{LookupOptions, LookupOrchestrator, ProviderId, RegistryRecord};
use serde::Serialize;

use crate::cli::LookupArgs;
use crate::error::CliError;

use super::CommandOutput;

#[derive(Debug, Serialize)]
struct LookupReport {
    input: String,
    record: RegistryRecord,
    source_chain: Vec<ProviderId>,
    cache_hit: bool,
    latency_ms: u64,
}

pub async fn run(
    args: &LookupArgs,
    orchestrator: &LookupOrchestrator,
) -> Result<CommandOutput, CliError> {
    let options = LookupOptions {
        use_cache: !args.no_cache,
        allow_fallback: !args.no_fallback,
    };

    let mut reports = Vec::with_capacity(args.ids.len());
    for raw in &args.ids {
        let resolution = orchestrator.resolve(raw, options).await;
        reports.push(LookupReport {
            input: raw.clone(),
            record: resolution.record,
            source_chain: resolution.source_chain,
            cache_hit: resolution.cache_hit,
            latency_ms: resolution.latency_ms,
        });
    }

    let failures = reports
        .iter()
        .filter(|report| report.record.is_failure())
        .count();
    Ok(CommandOutput {
        data: serde_json::to_value(reports)?,
        failures,
    })
}
