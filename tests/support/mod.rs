//! Shared fixtures for the integration suites: a scripted transport that
//! routes by provider and an orchestrator wired to a manual clock.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use cnpjx_core::http_client::HttpFuture;
use cnpjx_core::{
    FixedIssues, HttpClient, HttpError, HttpRequest, HttpResponse, LookupConfig,
    LookupOrchestrator, ManualClock, MemoryProfileStore, PendingIssues, ProfileStore, ProviderId,
    UtcDateTime,
};

/// Transport double that answers from per-provider reply queues.
///
/// Requests are attributed by URL and credentials: OpenCNPJ by host, the
/// commercial ReceitaWS endpoint by its bearer token, everything else to the
/// public ReceitaWS endpoint. Unscripted calls answer HTTP 500.
#[derive(Default)]
pub struct ScriptedHttp {
    replies: Mutex<HashMap<ProviderId, VecDeque<Result<HttpResponse, HttpError>>>>,
    calls: Mutex<Vec<ProviderId>>,
}

impl ScriptedHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, provider: ProviderId, replies: Vec<Result<HttpResponse, HttpError>>) {
        self.replies
            .lock()
            .expect("lock")
            .entry(provider)
            .or_default()
            .extend(replies);
    }

    pub fn calls(&self) -> Vec<ProviderId> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn calls_to(&self, provider: ProviderId) -> usize {
        self.calls().into_iter().filter(|call| *call == provider).count()
    }

    fn provider_for(request: &HttpRequest) -> ProviderId {
        if request.url.contains("opencnpj") {
            ProviderId::OpenCnpj
        } else if request.headers.contains_key("authorization") {
            ProviderId::ReceitaWs
        } else {
            ProviderId::ReceitaWsPublic
        }
    }
}

impl HttpClient for ScriptedHttp {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        let provider = Self::provider_for(&request);
        self.calls.lock().expect("lock").push(provider);
        let reply = self
            .replies
            .lock()
            .expect("lock")
            .get_mut(&provider)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(HttpResponse::new(500, "unscripted")));
        Box::pin(async move { reply })
    }
}

pub fn receitaws_ok(legal_name: &str) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::ok_json(
        serde_json::json!({
            "status": "OK",
            "nome": legal_name,
            "situacao": "ATIVA",
            "abertura": "05/03/2008",
            "simples": {"optante": true, "data_opcao": "01/01/2010"},
            "capital_social": "50000.00"
        })
        .to_string(),
    ))
}

pub fn opencnpj_ok(legal_name: &str) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::ok_json(
        serde_json::json!({
            "razao_social": legal_name,
            "situacao_cadastral": "ATIVA",
            "data_abertura": "2012-07-19",
            "capital_social": "R$ 10.000,00",
            "simples": false
        })
        .to_string(),
    ))
}

pub fn status(code: u16) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::new(code, ""))
}

/// One pending issue of each kind: -120 on the risk score.
pub const ISSUES: PendingIssues = PendingIssues {
    financial: 1,
    fiscal: 1,
    labor: 1,
    baseline_score: 550,
};

pub struct Harness {
    pub http: Arc<ScriptedHttp>,
    pub clock: Arc<ManualClock>,
    pub orchestrator: Arc<LookupOrchestrator>,
}

pub fn start_time() -> UtcDateTime {
    UtcDateTime::parse("2026-05-04T09:30:00Z").expect("valid timestamp")
}

pub fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryProfileStore::new()), Arc::new(ManualClock::new(start_time())))
}

pub fn harness_with_store(store: Arc<dyn ProfileStore>, clock: Arc<ManualClock>) -> Harness {
    let http = ScriptedHttp::new();
    let orchestrator = LookupOrchestrator::builder()
        .with_config(LookupConfig::default())
        .with_receitaws_token("test-token")
        .with_http_client(http.clone())
        .with_store(store)
        .with_clock(clock.clone())
        .with_issue_source(Arc::new(FixedIssues(ISSUES)))
        .build()
        .expect("orchestrator builds");

    Harness {
        http,
        clock,
        orchestrator: Arc::new(orchestrator),
    }
}
