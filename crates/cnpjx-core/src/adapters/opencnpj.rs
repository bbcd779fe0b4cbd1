use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{amount_from_value, text};
use crate::data_source::{ProviderPayload, RawProfile, RegistrySource, SourceError, SourceFuture};
use crate::domain::normalize_registry_date;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::{Activity, CompanyProfile, ProviderId, RegistryId, TaxRegime};

const OPENCNPJ_BASE_URL: &str = "https://api.opencnpj.org";

/// OpenCNPJ aggregator adapter, first fallback after the primary source.
#[derive(Clone)]
pub struct OpenCnpjAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    policy: ProviderPolicy,
}

impl OpenCnpjAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(OPENCNPJ_BASE_URL),
            policy: ProviderPolicy::opencnpj_default(),
        }
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    async fn fetch_payload(&self, registry_id: &RegistryId) -> Result<RawProfile, SourceError> {
        let provider = ProviderId::OpenCnpj;
        let endpoint = format!("{}/{}", self.base_url, registry_id.as_str());
        let request = HttpRequest::get(endpoint)
            .with_header("accept", "application/json")
            .with_timeout_ms(self.policy.timeout_ms());

        debug!(%provider, registry_id = registry_id.as_str(), "requesting opencnpj profile");
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| SourceError::from_http(provider, &e))?;

        if response.status != 200 {
            return Err(SourceError::from_status(provider, response.status));
        }

        let payload: OpenCnpjPayload = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::soft_failure(format!("{provider} returned an unreadable body: {e}"))
        })?;

        if payload.error.unwrap_or(false) {
            let message = payload.message.as_deref().unwrap_or("no message");
            return Err(SourceError::soft_failure(format!(
                "{provider} flagged the lookup as failed: {message}"
            )));
        }

        Ok(RawProfile {
            registry_id: registry_id.clone(),
            payload: ProviderPayload::OpenCnpj(Box::new(payload)),
        })
    }
}

impl RegistrySource for OpenCnpjAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenCnpj
    }

    fn fetch<'a>(&'a self, registry_id: &'a RegistryId) -> SourceFuture<'a> {
        Box::pin(self.fetch_payload(registry_id))
    }

    fn normalize(&self, raw: RawProfile) -> CompanyProfile {
        super::normalize_raw(raw, ProviderId::OpenCnpj.as_str())
    }
}

/// OpenCNPJ response body: flat, one activity, capital as a formatted string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenCnpjPayload {
    pub error: Option<bool>,
    pub message: Option<String>,
    pub razao_social: Option<String>,
    pub nome_fantasia: Option<String>,
    pub situacao_cadastral: Option<String>,
    pub data_abertura: Option<String>,
    pub porte: Option<String>,
    pub natureza_juridica: Option<String>,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub endereco: Option<String>,
    pub cnae_principal: Option<OpenCnpjActivity>,
    pub capital_social: Option<serde_json::Value>,
    pub simples: Option<bool>,
    pub mei: Option<bool>,
    pub data_atualizacao: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenCnpjActivity {
    pub codigo: Option<String>,
    pub descricao: Option<String>,
}

pub(super) fn normalize(
    registry_id: RegistryId,
    payload: OpenCnpjPayload,
    source: &str,
) -> CompanyProfile {
    let mut profile = CompanyProfile::blank(registry_id, source);

    profile.legal_name = text(payload.razao_social.as_deref());
    profile.trade_name = text(payload.nome_fantasia.as_deref());
    profile.status = text(payload.situacao_cadastral.as_deref());
    profile.founded_on =
        normalize_registry_date(payload.data_abertura.as_deref().unwrap_or_default());
    profile.size_class = text(payload.porte.as_deref());
    profile.legal_nature = text(payload.natureza_juridica.as_deref());
    profile.phone = text(payload.telefone.as_deref());
    profile.email = text(payload.email.as_deref());
    profile.address = text(payload.endereco.as_deref());

    let activity = payload.cnae_principal.unwrap_or_default();
    profile.primary_activity = Activity {
        code: text(activity.codigo.as_deref()),
        description: text(activity.descricao.as_deref()),
    };

    profile.simples = TaxRegime {
        enrolled: payload.simples.unwrap_or(false),
        ..TaxRegime::default()
    };
    profile.mei = TaxRegime {
        enrolled: payload.mei.unwrap_or(false),
        ..TaxRegime::default()
    };
    profile.share_capital = amount_from_value(payload.capital_social.as_ref());
    profile.last_updated = text(payload.data_atualizacao.as_deref());
    profile
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::http_client::{HttpError, HttpFuture, HttpResponse};
    use crate::FailureKind;

    struct FixedHttpClient {
        status: u16,
        body: &'static str,
        calls: AtomicUsize,
    }

    impl FixedHttpClient {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl HttpClient for FixedHttpClient {
        fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.url, "https://api.opencnpj.org/11222333000181");
            assert_eq!(request.timeout_ms, 10_000);
            let response: Result<HttpResponse, HttpError> =
                Ok(HttpResponse::new(self.status, self.body));
            Box::pin(async move { response })
        }
    }

    fn registry_id() -> RegistryId {
        RegistryId::parse("11222333000181").expect("valid id")
    }

    #[tokio::test]
    async fn normalizes_the_flat_schema() {
        let http = FixedHttpClient::new(
            200,
            r#"{
                "razao_social": "ACME COMERCIO LTDA",
                "nome_fantasia": "ACME",
                "situacao_cadastral": "ATIVA",
                "data_abertura": "2012-07-19",
                "porte": "ME",
                "endereco": "RUA DAS FLORES 100, SAO PAULO/SP",
                "cnae_principal": {"codigo": "4751201", "descricao": "Comercio varejista"},
                "capital_social": "R$ 1.234,56",
                "simples": true
            }"#,
        );
        let adapter = OpenCnpjAdapter::new(http.clone());

        let raw = adapter.fetch(&registry_id()).await.expect("fetch succeeds");
        let profile = adapter.normalize(raw);

        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
        assert_eq!(profile.legal_name, "ACME COMERCIO LTDA");
        assert_eq!(profile.founded_on, "2012-07-19");
        assert_eq!(profile.primary_activity.code, "4751201");
        assert_eq!(profile.share_capital, 1234.56);
        assert!(profile.simples.enrolled);
        assert!(!profile.mei.enrolled);
        assert!(profile.secondary_activities.is_empty());
        assert!(profile.partners.is_empty());
        assert_eq!(profile.source, "opencnpj");
    }

    #[tokio::test]
    async fn payload_error_flag_is_a_failure() {
        let http = FixedHttpClient::new(200, r#"{"error": true, "message": "not found"}"#);
        let adapter = OpenCnpjAdapter::new(http);

        let err = adapter.fetch(&registry_id()).await.expect_err("must fail");
        assert_eq!(err.failure_kind(), FailureKind::UpstreamSoftFailure);
        assert!(err.message().contains("not found"));
    }

    #[tokio::test]
    async fn any_non_200_is_a_failure() {
        for status in [201, 404, 429, 500] {
            let http = FixedHttpClient::new(status, "{}");
            let adapter = OpenCnpjAdapter::new(http);

            assert!(adapter.fetch(&registry_id()).await.is_err(), "status {status}");
        }
    }
}
