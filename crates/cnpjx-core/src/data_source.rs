//! Registry source contract and adapter error types.
//!
//! Every upstream provider implements [`RegistrySource`]: `fetch` performs the
//! network call and returns the provider's own payload, `normalize` maps that
//! payload onto the shared [`CompanyProfile`] shape.
//!
//! | Provider | Payload | Credentials |
//! |----------|---------|-------------|
//! | `receitaws` | [`ReceitaWsPayload`] | bearer token |
//! | `opencnpj` | [`OpenCnpjPayload`] | none |
//! | `receitaws_public` | [`ReceitaWsPayload`] | none |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::adapters::{OpenCnpjPayload, ReceitaWsPayload};
use crate::http_client::{HttpError, HttpErrorKind};
use crate::{CompanyProfile, FailureKind, ProviderId, RegistryId};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Upstream answered 429.
    RateLimited,
    /// Upstream answered 504.
    UpstreamTimeout,
    /// No response before the request deadline.
    TransportTimeout,
    /// Connection refused, DNS failure and other transport problems.
    TransportError,
    /// Upstream answered 200 but reported an error in the body.
    SoftFailure,
    /// Any other non-success status.
    HardFailure,
}

/// Structured source error consumed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    status: Option<u16>,
}

impl SourceError {
    fn new(kind: SourceErrorKind, message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message, Some(429))
    }

    pub fn upstream_timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::UpstreamTimeout, message, Some(504))
    }

    pub fn transport_timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::TransportTimeout, message, None)
    }

    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::TransportError, message, None)
    }

    pub fn soft_failure(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::SoftFailure, message, Some(200))
    }

    pub fn hard_failure(status: u16, message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::HardFailure, message, Some(status))
    }

    /// Classifies a transport error that produced no HTTP response.
    pub fn from_http(provider: ProviderId, error: &HttpError) -> Self {
        match error.kind() {
            HttpErrorKind::Timeout => {
                Self::transport_timeout(format!("{provider} timed out: {}", error.message()))
            }
            HttpErrorKind::Connect | HttpErrorKind::Other => {
                Self::transport_error(format!("{provider} transport failure: {}", error.message()))
            }
        }
    }

    /// Classifies a non-200 status.
    pub fn from_status(provider: ProviderId, status: u16) -> Self {
        match status {
            429 => Self::rate_limited(format!("{provider} rate limit exceeded")),
            504 => Self::upstream_timeout(format!("{provider} gateway timeout")),
            other => Self::hard_failure(other, format!("{provider} returned HTTP {other}")),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub const fn failure_kind(&self) -> FailureKind {
        match self.kind {
            SourceErrorKind::RateLimited => FailureKind::RateLimited,
            SourceErrorKind::UpstreamTimeout => FailureKind::UpstreamTimeout,
            SourceErrorKind::TransportTimeout => FailureKind::TransportTimeout,
            SourceErrorKind::TransportError => FailureKind::TransportError,
            SourceErrorKind::SoftFailure => FailureKind::UpstreamSoftFailure,
            SourceErrorKind::HardFailure => FailureKind::UpstreamHardFailure,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::UpstreamTimeout => "source.upstream_timeout",
            SourceErrorKind::TransportTimeout => "source.transport_timeout",
            SourceErrorKind::TransportError => "source.transport_error",
            SourceErrorKind::SoftFailure => "source.soft_failure",
            SourceErrorKind::HardFailure => "source.hard_failure",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Provider-specific payload, tagged by schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    ReceitaWs(Box<ReceitaWsPayload>),
    OpenCnpj(Box<OpenCnpjPayload>),
}

/// Raw upstream answer for one identifier, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProfile {
    pub registry_id: RegistryId,
    pub payload: ProviderPayload,
}

pub type SourceFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawProfile, SourceError>> + Send + 'a>>;

/// Registry provider contract.
///
/// Implementations must be `Send + Sync`; one orchestrator may be shared
/// between a batch task and interactive callers.
pub trait RegistrySource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetches the raw profile for `registry_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] for every non-success outcome; adapters never
    /// panic and never surface raw transport errors.
    fn fetch<'a>(&'a self, registry_id: &'a RegistryId) -> SourceFuture<'a>;

    /// Maps a payload produced by [`fetch`](RegistrySource::fetch) onto the
    /// full profile shape.
    fn normalize(&self, raw: RawProfile) -> CompanyProfile;
}
