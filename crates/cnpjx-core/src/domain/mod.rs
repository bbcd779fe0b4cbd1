//! # Domain Models
//!
//! Canonical types shared by every provider adapter.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RegistryId`] | Validated 14-digit registry identifier |
//! | [`CompanyProfile`] | Normalized company profile |
//! | [`RegistryRecord`] | Profile or terminal failure for one lookup |
//! | [`FailureKind`] | Error taxonomy carried by failure records |
//! | [`RiskAssessment`] | Score and tier attached during enrichment |
//! | [`UtcDateTime`] | UTC timestamp with lenient parsing |

mod record;
mod registry_id;
mod timestamp;

use time::macros::format_description;
use time::Date;

pub use record::{
    Activity, CompanyProfile, FailureKind, LookupFailure, Partner, PendingIssues, RegistryRecord,
    RiskAssessment, RiskTier, TaxRegime,
};
pub use registry_id::RegistryId;
pub use timestamp::UtcDateTime;

/// Reads a registry date written either as `dd/mm/yyyy` or ISO `yyyy-mm-dd`.
pub fn parse_registry_date(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    Date::parse(trimmed, format_description!("[day]/[month]/[year]"))
        .or_else(|_| Date::parse(trimmed, format_description!("[year]-[month]-[day]")))
        .ok()
}

/// ISO form of a registry date, or the trimmed input when it is not a date.
pub fn normalize_registry_date(raw: &str) -> String {
    match parse_registry_date(raw) {
        Some(date) => format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        ),
        None => raw.trim().to_owned(),
    }
}
