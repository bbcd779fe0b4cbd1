use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{RegistryId, UtcDateTime};

/// Economic activity code and description (CNAE).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub code: String,
    pub description: String,
}

/// Partner or administrator listed in the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub name: String,
    pub role: String,
    pub country: String,
    pub document: String,
}

/// Enrollment in a simplified tax regime (Simples Nacional or MEI).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRegime {
    pub enrolled: bool,
    pub enrolled_on: String,
    pub excluded_on: String,
}

/// Derived risk signals attached during enrichment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingIssues {
    pub financial: u32,
    pub fiscal: u32,
    pub labor: u32,
    pub baseline_score: u16,
}

/// Risk band derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Moderate,
    Medium,
    High,
    VeryHigh,
    /// Reserved for records that could not be scored.
    Unrated,
}

impl RiskTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low risk",
            Self::Moderate => "moderate risk",
            Self::Medium => "medium risk",
            Self::High => "high risk",
            Self::VeryHigh => "very high risk",
            Self::Unrated => "unrated",
        }
    }
}

impl Display for RiskTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u16,
    pub tier: RiskTier,
}

impl RiskAssessment {
    /// Sentinel used for failure records.
    pub const fn unrated() -> Self {
        Self {
            score: 0,
            tier: RiskTier::Unrated,
        }
    }
}

/// Provider-independent company profile.
///
/// Every field is always present; adapters fill what the upstream omits with
/// empty strings, empty collections, `false` or `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub registry_id: RegistryId,
    pub legal_name: String,
    pub trade_name: String,
    pub status: String,
    /// ISO `YYYY-MM-DD` when the upstream date could be read, raw text otherwise.
    pub founded_on: String,
    pub size_class: String,
    pub legal_nature: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub primary_activity: Activity,
    pub secondary_activities: Vec<Activity>,
    pub partners: Vec<Partner>,
    pub simples: TaxRegime,
    pub mei: TaxRegime,
    pub share_capital: f64,
    pub last_updated: String,
    /// Which provider produced the profile.
    pub source: String,
    pub fetched_at: UtcDateTime,
    pub pending_issues: Option<PendingIssues>,
    pub risk: Option<RiskAssessment>,
}

impl CompanyProfile {
    /// Empty profile for `registry_id`; adapters populate it field by field.
    pub fn blank(registry_id: RegistryId, source: impl Into<String>) -> Self {
        Self {
            registry_id,
            legal_name: String::new(),
            trade_name: String::new(),
            status: String::new(),
            founded_on: String::new(),
            size_class: String::new(),
            legal_nature: String::new(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            primary_activity: Activity::default(),
            secondary_activities: Vec::new(),
            partners: Vec::new(),
            simples: TaxRegime::default(),
            mei: TaxRegime::default(),
            share_capital: 0.0,
            last_updated: String::new(),
            source: source.into(),
            fetched_at: UtcDateTime::now(),
            pending_issues: None,
            risk: None,
        }
    }

    pub fn is_active(&self) -> bool {
        let status = self.status.trim();
        status.eq_ignore_ascii_case("ativa") || status.eq_ignore_ascii_case("active")
    }

    /// Founding year read from `founded_on`, if it holds a date.
    pub fn founding_year(&self) -> Option<i32> {
        crate::domain::parse_registry_date(&self.founded_on).map(|date| date.year())
    }
}

/// Classification of a lookup that produced no profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    RateLimited,
    TransportTimeout,
    TransportError,
    UpstreamTimeout,
    UpstreamSoftFailure,
    UpstreamHardFailure,
    AllSourcesFailed,
    /// Batch item skipped after a stop request.
    Cancelled,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::RateLimited => "rate_limited",
            Self::TransportTimeout => "transport_timeout",
            Self::TransportError => "transport_error",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::UpstreamSoftFailure => "upstream_soft_failure",
            Self::UpstreamHardFailure => "upstream_hard_failure",
            Self::AllSourcesFailed => "all_sources_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl LookupFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Result of resolving one identifier: a profile or a terminal failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegistryRecord {
    Profile(Box<CompanyProfile>),
    Failure(LookupFailure),
}

impl RegistryRecord {
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failure(LookupFailure::new(kind, detail))
    }

    pub fn profile(&self) -> Option<&CompanyProfile> {
        match self {
            Self::Profile(profile) => Some(profile),
            Self::Failure(_) => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Profile(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl From<CompanyProfile> for RegistryRecord {
    fn from(value: CompanyProfile) -> Self {
        Self::Profile(Box::new(value))
    }
}
