//! Lookup configuration.
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! yields the reference behaviour: 3 primary calls per 60 s, 30-day cache,
//! 15 s / 10 s timeouts and a 1 s pause between batch items.
//!
//! ```toml
//! [rate_limit]
//! max_calls = 3
//! window_secs = 60
//!
//! [cache]
//! ttl_days = 30
//! db_path = "/var/lib/cnpjx/lookups.duckdb"
//!
//! [timeouts]
//! primary_ms = 15000
//! secondary_ms = 10000
//!
//! [fallback]
//! rate_limit_cooldown_ms = 2000
//!
//! [batch]
//! delay_ms = 1000
//!
//! [issues]
//! seed = 7
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider_policy::{ProviderPolicy, QuotaPolicy};
use crate::{CoreError, ProviderId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub issues: IssuesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_calls")]
    pub max_calls: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u64,
    /// DuckDB file; `None` uses `$CNPJX_HOME/cache/lookups.duckdb`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_primary_ms")]
    pub primary_ms: u64,
    #[serde(default = "default_secondary_ms")]
    pub secondary_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Pause after the primary answers 429, before trying the fallbacks.
    #[serde(default = "default_cooldown_ms")]
    pub rate_limit_cooldown_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_batch_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuesConfig {
    /// Fixed seed for the simulated pending-issues generator.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
            db_path: None,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            primary_ms: default_primary_ms(),
            secondary_ms: default_secondary_ms(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            rate_limit_cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_batch_delay_ms(),
        }
    }
}

impl LookupConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Policy for `provider`, with this configuration's timeouts and quota applied.
    pub fn policy_for(&self, provider: ProviderId) -> ProviderPolicy {
        let mut policy = ProviderPolicy::default_for(provider);
        match provider {
            ProviderId::ReceitaWs => {
                policy.timeout = Duration::from_millis(self.timeouts.primary_ms);
                policy.quota = Some(self.rate_limit.quota());
            }
            ProviderId::OpenCnpj | ProviderId::ReceitaWsPublic => {
                policy.timeout = Duration::from_millis(self.timeouts.secondary_ms);
            }
        }
        policy
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn quota(&self) -> QuotaPolicy {
        QuotaPolicy {
            window: self.window(),
            max_calls: self.max_calls,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_days.saturating_mul(24 * 60 * 60))
    }
}

impl FallbackConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }
}

impl BatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_max_calls() -> u32 {
    3
}

fn default_window_secs() -> u64 {
    60
}

fn default_ttl_days() -> u64 {
    30
}

fn default_primary_ms() -> u64 {
    15_000
}

fn default_secondary_ms() -> u64 {
    10_000
}

fn default_cooldown_ms() -> u64 {
    2_000
}

fn default_batch_delay_ms() -> u64 {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_reference_defaults() {
        let config = LookupConfig::from_toml_str("").expect("empty config parses");

        assert_eq!(config, LookupConfig::default());
        assert_eq!(config.rate_limit.max_calls, 3);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.cache.ttl(), Duration::from_secs(30 * 86_400));
        assert_eq!(config.batch.delay(), Duration::from_secs(1));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = LookupConfig::from_toml_str(
            r#"
[rate_limit]
max_calls = 10

[timeouts]
secondary_ms = 4000
"#,
        )
        .expect("partial config parses");

        assert_eq!(config.rate_limit.max_calls, 10);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.timeouts.primary_ms, 15_000);

        let fallback = config.policy_for(ProviderId::OpenCnpj);
        assert_eq!(fallback.timeout, Duration::from_secs(4));
        assert!(fallback.quota.is_none());

        let primary = config.policy_for(ProviderId::ReceitaWs);
        assert_eq!(primary.quota.map(|quota| quota.max_calls), Some(10));
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = LookupConfig::from_toml_str("[rate_limit]\nmax_calls = \"many\"")
            .expect_err("must fail");
        assert!(matches!(err, CoreError::Config(_)));
    }
}
