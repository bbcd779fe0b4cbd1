use std::time::Duration;

use crate::ProviderId;

/// Per-provider transport limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub timeout: Duration,
    /// Sliding-window quota enforced before calling this provider, if any.
    pub quota: Option<QuotaPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub window: Duration,
    pub max_calls: u32,
}

impl ProviderPolicy {
    /// Commercial tier: 3 calls per minute, generous timeout.
    pub fn receitaws_default() -> Self {
        Self {
            provider_id: ProviderId::ReceitaWs,
            timeout: Duration::from_secs(15),
            quota: Some(QuotaPolicy {
                window: Duration::from_secs(60),
                max_calls: 3,
            }),
        }
    }

    pub fn opencnpj_default() -> Self {
        Self {
            provider_id: ProviderId::OpenCnpj,
            timeout: Duration::from_secs(10),
            quota: None,
        }
    }

    pub fn receitaws_public_default() -> Self {
        Self {
            provider_id: ProviderId::ReceitaWsPublic,
            timeout: Duration::from_secs(10),
            quota: None,
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::ReceitaWs => Self::receitaws_default(),
            ProviderId::OpenCnpj => Self::opencnpj_default(),
            ProviderId::ReceitaWsPublic => Self::receitaws_public_default(),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
