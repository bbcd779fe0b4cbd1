//! # cnpjx Core
//!
//! Resolves Brazilian business-registry identifiers (CNPJ) into normalized
//! company profiles.
//!
//! ## Overview
//!
//! - **Validation** of the 14-digit identifier and its two check digits
//! - **Sliding-window admission control** in front of the primary provider
//! - **Time-bounded result cache** over a pluggable store
//! - **Provider fallback** across three upstream sources with one record shape
//! - **Risk scoring** of every resolved profile
//! - **Batch driver** with progress notifications, pacing and a stop signal
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | ReceitaWS (commercial and public) and OpenCNPJ adapters |
//! | [`batch`] | Sequential batch runs |
//! | [`cache`] | Result cache and storage collaborators |
//! | [`clock`] | Injectable time source |
//! | [`config`] | TOML configuration |
//! | [`data_source`] | Provider contract and adapter errors |
//! | [`domain`] | Identifier, profile and record types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`issues`] | Pending-issues collaborators |
//! | [`orchestrator`] | Lookup state machine |
//! | [`provider_policy`] | Per-provider timeouts and quotas |
//! | [`risk`] | Risk scoring |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Sliding-window rate limiter |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cnpjx_core::LookupOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = LookupOrchestrator::builder().with_real_clients().build()?;
//!
//!     let record = orchestrator.lookup("11.222.333/0001-81").await;
//!     if let Some(profile) = record.profile() {
//!         println!("{} ({:?})", profile.legal_name, profile.risk);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  BatchDriver    │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Orchestrator   │────▶│ Cache / Limiter  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ RegistrySource  │────▶│ HttpClient       │
//! │ (adapter trait) │     │ (reqwest)        │
//! └─────────────────┘     └──────────────────┘
//! ```

pub mod adapters;
pub mod batch;
pub mod cache;
pub mod clock;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod issues;
pub mod orchestrator;
pub mod provider_policy;
pub mod risk;
pub mod source;
pub mod throttling;

pub use adapters::{OpenCnpjAdapter, ReceitaWsAdapter};
pub use batch::{BatchDriver, BatchEvent, BatchObserver, BatchProgress, BatchReport, StopHandle};
pub use cache::{MemoryProfileStore, ProfileStore, ResultCache, StoredProfile};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LookupConfig;
pub use data_source::{
    ProviderPayload, RawProfile, RegistrySource, SourceError, SourceErrorKind, SourceFuture,
};
pub use domain::*;
pub use error::{CoreError, ValidationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use issues::{FixedIssues, IssueSource, NoIssues, SimulatedIssues};
pub use orchestrator::{LookupOptions, LookupOrchestrator, LookupOrchestratorBuilder, Resolution};
pub use provider_policy::{ProviderPolicy, QuotaPolicy};
pub use risk::RiskScorer;
pub use source::ProviderId;
pub use throttling::SlidingWindowLimiter;
