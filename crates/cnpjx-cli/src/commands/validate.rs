use cnpjx_core::RegistryId;
use serde::Serialize;

use crate::cli::ValidateArgs;
use crate::error::CliError;

use super::CommandOutput;

#[derive(Debug, Serialize)]
struct ValidationReport {
    input: String,
    cleaned: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: &ValidateArgs) -> Result<CommandOutput, CliError> {
    let reports: Vec<ValidationReport> = args.ids.iter().map(|raw| report(raw)).collect();
    let failures = reports.iter().filter(|report| !report.valid).count();

    Ok(CommandOutput {
        data: serde_json::to_value(reports)?,
        failures,
    })
}

fn report(raw: &str) -> ValidationReport {
    let cleaned = RegistryId::clean(raw);
    match RegistryId::parse(raw) {
        Ok(registry_id) => ValidationReport {
            input: raw.to_owned(),
            cleaned,
            valid: true,
            formatted: Some(registry_id.formatted()),
            error: None,
        },
        Err(error) => ValidationReport {
            input: raw.to_owned(),
            cleaned,
            valid: false,
            formatted: None,
            error: Some(error.to_string()),
        },
    }
}
