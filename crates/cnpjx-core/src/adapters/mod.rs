mod opencnpj;
mod receitaws;

pub use opencnpj::{OpenCnpjActivity, OpenCnpjAdapter, OpenCnpjPayload};
pub use receitaws::{
    ReceitaWsActivity, ReceitaWsAdapter, ReceitaWsPartner, ReceitaWsPayload, ReceitaWsRegime,
};

use crate::data_source::{ProviderPayload, RawProfile};
use crate::CompanyProfile;

/// Normalizes `raw` according to its payload schema, tagging the profile with `source`.
pub(crate) fn normalize_raw(raw: RawProfile, source: &str) -> CompanyProfile {
    match raw.payload {
        ProviderPayload::ReceitaWs(payload) => {
            receitaws::normalize(raw.registry_id, *payload, source)
        }
        ProviderPayload::OpenCnpj(payload) => opencnpj::normalize(raw.registry_id, *payload, source),
    }
}

/// Trimmed copy of an optional upstream string.
fn text(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_owned()
}

/// Joins the non-empty parts with `", "`.
fn join_non_empty<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reads a monetary amount.
///
/// Input carrying the `R$` marker follows Brazilian notation (`.` groups
/// thousands, `,` marks cents). Otherwise the rightmost separator is the
/// decimal point, unless every group after it has exactly three digits, as in
/// `5.000` or `1,234`.
fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = if raw.contains("R$") {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        match (cleaned.rfind('.'), cleaned.rfind(',')) {
            (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
            (Some(_), Some(_)) => cleaned.replace(',', ""),
            (Some(_), None) if is_digit_grouped(&cleaned, '.') => cleaned.replace('.', ""),
            (None, Some(_)) if is_digit_grouped(&cleaned, ',') => cleaned.replace(',', ""),
            (None, Some(_)) => cleaned.replace(',', "."),
            _ => cleaned,
        }
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// True when `separator` only splits off three-digit groups.
fn is_digit_grouped(amount: &str, separator: char) -> bool {
    amount.matches(separator).count() > 1
        || amount
            .split(separator)
            .skip(1)
            .all(|group| group.len() == 3)
}

/// Amount carried either as a JSON number or a formatted string.
fn amount_from_value(value: Option<&serde_json::Value>) -> f64 {
    match value {
        Some(serde_json::Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(raw)) => parse_amount(raw),
        _ => 0.0,
    }
}
