//! Lookup orchestration: validation, cache, admission control, provider
//! fallback and enrichment.
//!
//! A lookup walks an explicit [`Stage`] machine:
//!
//! ```text
//! Validate ─▶ CacheProbe ─▶ Admission ─▶ Primary ─┬─▶ Enrich ─▶ Done
//!    │            │                               │      ▲
//!    ▼            ▼                               ▼      │
//!   Done         Done                  Fallback(A) ─▶ Fallback(B) ─▶ Done
//! ```
//!
//! Fallback only ever moves forward from A to B, so a lookup makes at most
//! three provider calls whatever the input.

use std::env;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::adapters::{OpenCnpjAdapter, ReceitaWsAdapter};
use crate::cache::{MemoryProfileStore, ProfileStore, ResultCache};
use crate::clock::{Clock, SystemClock};
use crate::config::LookupConfig;
use crate::data_source::{RegistrySource, SourceError, SourceErrorKind};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::issues::{IssueSource, SimulatedIssues};
use crate::risk::RiskScorer;
use crate::throttling::SlidingWindowLimiter;
use crate::{
    CompanyProfile, CoreError, FailureKind, ProviderId, RegistryId, RegistryRecord,
};

/// Per-call switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    /// Consult the cache before any network call. Successful results are
    /// written back regardless.
    pub use_cache: bool,
    /// Try the secondary sources when the primary fails.
    pub allow_fallback: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            allow_fallback: true,
        }
    }
}

impl LookupOptions {
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn without_fallback(mut self) -> Self {
        self.allow_fallback = false;
        self
    }
}

/// Outcome of one lookup with its attempt trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub record: RegistryRecord,
    /// Providers called, in order.
    pub source_chain: Vec<ProviderId>,
    pub cache_hit: bool,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackStep {
    SecondaryA,
    SecondaryB,
}

enum Stage {
    Validate,
    CacheProbe(RegistryId),
    Admission(RegistryId),
    Primary(RegistryId),
    Fallback {
        registry_id: RegistryId,
        step: FallbackStep,
        errors: Vec<(ProviderId, SourceError)>,
    },
    Enrich(RegistryId, CompanyProfile),
    Done(RegistryRecord),
}

/// Resolves registry identifiers into profiles.
///
/// Safe to share behind an `Arc`: the limiter and cache guard their own state.
pub struct LookupOrchestrator {
    primary: Arc<dyn RegistrySource>,
    secondary_a: Arc<dyn RegistrySource>,
    secondary_b: Arc<dyn RegistrySource>,
    cache: ResultCache,
    limiter: SlidingWindowLimiter,
    issues: Arc<dyn IssueSource>,
    scorer: RiskScorer,
    clock: Arc<dyn Clock>,
    rate_limit_cooldown: Duration,
}

impl LookupOrchestrator {
    pub fn builder() -> LookupOrchestratorBuilder {
        LookupOrchestratorBuilder::new()
    }

    /// Looks up `raw` with the cache enabled and fallback allowed.
    pub async fn lookup(&self, raw: &str) -> RegistryRecord {
        self.lookup_with(raw, LookupOptions::default()).await
    }

    pub async fn lookup_with(&self, raw: &str, options: LookupOptions) -> RegistryRecord {
        self.resolve(raw, options).await.record
    }

    pub async fn resolve(&self, raw: &str, options: LookupOptions) -> Resolution {
        let started = Instant::now();
        let mut source_chain = Vec::with_capacity(3);
        let mut cache_hit = false;
        let mut stage = Stage::Validate;

        let record = loop {
            stage = match stage {
                Stage::Validate => match RegistryId::parse(raw) {
                    Ok(registry_id) if options.use_cache => Stage::CacheProbe(registry_id),
                    Ok(registry_id) => Stage::Admission(registry_id),
                    Err(error) => {
                        debug!(input = raw, %error, "rejected registry id");
                        Stage::Done(RegistryRecord::failure(
                            FailureKind::InvalidInput,
                            error.to_string(),
                        ))
                    }
                },
                Stage::CacheProbe(registry_id) => match self.cache.fetch(&registry_id).await {
                    Some(profile) => {
                        cache_hit = true;
                        Stage::Done(RegistryRecord::from(profile))
                    }
                    None => Stage::Admission(registry_id),
                },
                Stage::Admission(registry_id) => {
                    self.limiter.acquire().await;
                    Stage::Primary(registry_id)
                }
                Stage::Primary(registry_id) => {
                    let provider = self.primary.id();
                    source_chain.push(provider);
                    match self.primary.fetch(&registry_id).await {
                        Ok(raw_profile) => {
                            let profile = self.primary.normalize(raw_profile);
                            Stage::Enrich(registry_id, profile)
                        }
                        Err(error) if !options.allow_fallback => {
                            warn!(%provider, registry_id = registry_id.as_str(), %error, "primary source failed, fallback disabled");
                            Stage::Done(RegistryRecord::failure(
                                error.failure_kind(),
                                error.to_string(),
                            ))
                        }
                        Err(error) => {
                            warn!(%provider, registry_id = registry_id.as_str(), %error, "primary source failed, falling back");
                            if error.kind() == SourceErrorKind::RateLimited {
                                info!(
                                    cooldown_ms = duration_ms(self.rate_limit_cooldown),
                                    "primary source is rate limited, cooling down"
                                );
                                self.clock.sleep(self.rate_limit_cooldown).await;
                            }
                            Stage::Fallback {
                                registry_id,
                                step: FallbackStep::SecondaryA,
                                errors: vec![(provider, error)],
                            }
                        }
                    }
                }
                Stage::Fallback {
                    registry_id,
                    step,
                    mut errors,
                } => {
                    let source = match step {
                        FallbackStep::SecondaryA => &self.secondary_a,
                        FallbackStep::SecondaryB => &self.secondary_b,
                    };
                    let provider = source.id();
                    source_chain.push(provider);
                    match source.fetch(&registry_id).await {
                        Ok(raw_profile) => {
                            info!(%provider, registry_id = registry_id.as_str(), "fallback source succeeded");
                            let profile = source.normalize(raw_profile);
                            Stage::Enrich(registry_id, profile)
                        }
                        Err(error) => {
                            warn!(%provider, registry_id = registry_id.as_str(), %error, "fallback source failed");
                            errors.push((provider, error));
                            match step {
                                FallbackStep::SecondaryA => Stage::Fallback {
                                    registry_id,
                                    step: FallbackStep::SecondaryB,
                                    errors,
                                },
                                FallbackStep::SecondaryB => Stage::Done(RegistryRecord::failure(
                                    FailureKind::AllSourcesFailed,
                                    describe_errors(&errors),
                                )),
                            }
                        }
                    }
                }
                Stage::Enrich(registry_id, mut profile) => {
                    profile.fetched_at = self.clock.now();
                    profile.pending_issues = Some(self.issues.assess(&registry_id));
                    profile.risk = Some(self.scorer.assess(&profile));
                    self.cache.store(&registry_id, &profile).await;
                    Stage::Done(RegistryRecord::from(profile))
                }
                Stage::Done(record) => break record,
            };
        };

        let latency_ms = duration_ms(started.elapsed());
        match &record {
            RegistryRecord::Profile(profile) => info!(
                registry_id = profile.registry_id.as_str(),
                source = profile.source.as_str(),
                cache_hit,
                latency_ms,
                "lookup resolved"
            ),
            RegistryRecord::Failure(failure) => info!(
                input = raw,
                kind = failure.kind.as_str(),
                latency_ms,
                "lookup failed"
            ),
        }

        Resolution {
            record,
            source_chain,
            cache_hit,
            latency_ms,
        }
    }

    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

fn describe_errors(errors: &[(ProviderId, SourceError)]) -> String {
    let mut detail = String::from("every source failed");
    for (index, (provider, error)) in errors.iter().enumerate() {
        let separator = if index == 0 { ": " } else { "; " };
        let _ = write!(detail, "{separator}{provider}: {error}");
    }
    detail
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`LookupOrchestrator`].
///
/// Without explicit sources the builder wires the production adapters over
/// [`ReqwestHttpClient`]. The commercial token is read from the environment by
/// [`with_real_clients`](Self::with_real_clients):
///
/// | Variable | Fallback |
/// |----------|----------|
/// | `CNPJX_RECEITAWS_TOKEN` | `RECEITAWS_TOKEN` |
#[derive(Default)]
pub struct LookupOrchestratorBuilder {
    config: LookupConfig,
    receitaws_token: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    sources: Option<[Arc<dyn RegistrySource>; 3]>,
    store: Option<Arc<dyn ProfileStore>>,
    clock: Option<Arc<dyn Clock>>,
    issues: Option<Arc<dyn IssueSource>>,
    rate_limit_cooldown: Option<Duration>,
}

impl LookupOrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: LookupConfig) -> Self {
        self.config = config;
        self
    }

    /// Reads the commercial token from the environment. Without one the
    /// primary source is queried anonymously and [`build`](Self::build) warns.
    pub fn with_real_clients(mut self) -> Self {
        self.receitaws_token = env::var("CNPJX_RECEITAWS_TOKEN")
            .or_else(|_| env::var("RECEITAWS_TOKEN"))
            .ok()
            .filter(|token| !token.trim().is_empty());
        self
    }

    pub fn with_receitaws_token(mut self, token: impl Into<String>) -> Self {
        self.receitaws_token = Some(token.into());
        self
    }

    /// Transport for the default adapters.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Replaces the default adapters: `primary`, then the two fallbacks in order.
    pub fn with_sources(
        mut self,
        primary: Arc<dyn RegistrySource>,
        secondary_a: Arc<dyn RegistrySource>,
        secondary_b: Arc<dyn RegistrySource>,
    ) -> Self {
        self.sources = Some([primary, secondary_a, secondary_b]);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_issue_source(mut self, issues: Arc<dyn IssueSource>) -> Self {
        self.issues = Some(issues);
        self
    }

    pub fn with_rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.rate_limit_cooldown = Some(cooldown);
        self
    }

    pub fn build(self) -> Result<LookupOrchestrator, CoreError> {
        let config = self.config;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let primary_policy = config.policy_for(ProviderId::ReceitaWs);

        let [primary, secondary_a, secondary_b] = match self.sources {
            Some(sources) => sources,
            None => {
                let http_client = self
                    .http_client
                    .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
                let token = match self
                    .receitaws_token
                    .filter(|token| !token.trim().is_empty())
                {
                    Some(token) => token,
                    None => {
                        warn!("no receitaws token configured, the primary source will be queried anonymously");
                        String::new()
                    }
                };
                [
                    Arc::new(
                        ReceitaWsAdapter::commercial(http_client.clone(), token)
                            .with_policy(primary_policy.clone()),
                    ) as Arc<dyn RegistrySource>,
                    Arc::new(
                        OpenCnpjAdapter::new(http_client.clone())
                            .with_policy(config.policy_for(ProviderId::OpenCnpj)),
                    ),
                    Arc::new(
                        ReceitaWsAdapter::public(http_client)
                            .with_policy(config.policy_for(ProviderId::ReceitaWsPublic)),
                    ),
                ]
            }
        };

        let quota = primary_policy
            .quota
            .unwrap_or_else(|| config.rate_limit.quota());
        let limiter = SlidingWindowLimiter::from_quota(quota, clock.clone())?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryProfileStore::new()));
        let cache = ResultCache::new(store, config.cache.ttl(), clock.clone());
        let issues = self.issues.unwrap_or_else(|| match config.issues.seed {
            Some(seed) => Arc::new(SimulatedIssues::with_seed(seed)),
            None => Arc::new(SimulatedIssues::new()),
        });

        Ok(LookupOrchestrator {
            primary,
            secondary_a,
            secondary_b,
            cache,
            limiter,
            issues,
            scorer: RiskScorer::new(),
            clock,
            rate_limit_cooldown: self
                .rate_limit_cooldown
                .unwrap_or_else(|| config.fallback.cooldown()),
        })
    }
}
