use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{amount_from_value, join_non_empty, text};
use crate::data_source::{ProviderPayload, RawProfile, RegistrySource, SourceError, SourceFuture};
use crate::domain::normalize_registry_date;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::{Activity, CompanyProfile, Partner, ProviderId, RegistryId, TaxRegime};

const RECEITAWS_BASE_URL: &str = "https://receitaws.com.br/v1/cnpj";

/// ReceitaWS adapter.
///
/// The same schema is served by two endpoints: the commercial tier, which
/// expects a bearer token and is the primary source, and the public tier,
/// queried without credentials as the last resort.
#[derive(Clone)]
pub struct ReceitaWsAdapter {
    provider_id: ProviderId,
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    base_url: String,
    policy: ProviderPolicy,
}

impl ReceitaWsAdapter {
    pub fn commercial(http_client: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        let token = token.into();
        let auth = if token.trim().is_empty() {
            HttpAuth::None
        } else {
            HttpAuth::BearerToken(token)
        };
        Self {
            provider_id: ProviderId::ReceitaWs,
            http_client,
            auth,
            base_url: String::from(RECEITAWS_BASE_URL),
            policy: ProviderPolicy::receitaws_default(),
        }
    }

    pub fn public(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            provider_id: ProviderId::ReceitaWsPublic,
            http_client,
            auth: HttpAuth::None,
            base_url: String::from(RECEITAWS_BASE_URL),
            policy: ProviderPolicy::receitaws_public_default(),
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
        let provider = self.provider_id;
        let endpoint = format!("{}/{}", self.base_url, registry_id.as_str());
        let request = HttpRequest::get(endpoint)
            .with_header("accept", "application/json")
            .with_auth(&self.auth)
            .with_timeout_ms(self.policy.timeout_ms());

        debug!(%provider, registry_id = registry_id.as_str(), "requesting receitaws profile");
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| SourceError::from_http(provider, &e))?;

        if response.status != 200 {
            return Err(SourceError::from_status(provider, response.status));
        }

        let payload: ReceitaWsPayload = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::soft_failure(format!("{provider} returned an unreadable body: {e}"))
        })?;

        if !payload.status.as_deref().unwrap_or_default().eq_ignore_ascii_case("OK") {
            let message = payload
                .message
                .as_deref()
                .filter(|message| !message.trim().is_empty())
                .unwrap_or("no message");
            return Err(SourceError::soft_failure(format!(
                "{provider} rejected the lookup: {message}"
            )));
        }

        Ok(RawProfile {
            registry_id: registry_id.clone(),
            payload: ProviderPayload::ReceitaWs(Box::new(payload)),
        })
    }
}

impl RegistrySource for ReceitaWsAdapter {
    fn id(&self) -> ProviderId {
        self.provider_id
    }

    fn fetch<'a>(&'a self, registry_id: &'a RegistryId) -> SourceFuture<'a> {
        Box::pin(self.fetch_payload(registry_id))
    }

    fn normalize(&self, raw: RawProfile) -> CompanyProfile {
        super::normalize_raw(raw, self.provider_id.as_str())
    }
}

/// ReceitaWS response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceitaWsPayload {
    pub status: Option<String>,
    pub message: Option<String>,
    pub nome: Option<String>,
    pub fantasia: Option<String>,
    pub situacao: Option<String>,
    pub abertura: Option<String>,
    pub porte: Option<String>,
    pub natureza_juridica: Option<String>,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub complemento: Option<String>,
    pub bairro: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub atividade_principal: Option<Vec<ReceitaWsActivity>>,
    pub atividades_secundarias: Option<Vec<ReceitaWsActivity>>,
    pub qsa: Option<Vec<ReceitaWsPartner>>,
    pub simples: Option<ReceitaWsRegime>,
    pub simei: Option<ReceitaWsRegime>,
    pub capital_social: Option<serde_json::Value>,
    pub ultima_atualizacao: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceitaWsActivity {
    pub code: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceitaWsPartner {
    pub nome: Option<String>,
    pub qual: Option<String>,
    pub pais_origem: Option<String>,
    pub cpf_cnpj: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceitaWsRegime {
    pub optante: Option<bool>,
    pub data_opcao: Option<String>,
    pub data_exclusao: Option<String>,
}

pub(super) fn normalize(
    registry_id: RegistryId,
    payload: ReceitaWsPayload,
    source: &str,
) -> CompanyProfile {
    let mut profile = CompanyProfile::blank(registry_id, source);

    profile.legal_name = text(payload.nome.as_deref());
    profile.trade_name = text(payload.fantasia.as_deref());
    profile.status = text(payload.situacao.as_deref());
    profile.founded_on = normalize_registry_date(payload.abertura.as_deref().unwrap_or_default());
    profile.size_class = text(payload.porte.as_deref());
    profile.legal_nature = text(payload.natureza_juridica.as_deref());
    profile.phone = text(payload.telefone.as_deref());
    profile.email = text(payload.email.as_deref());

    let city = match (payload.municipio.as_deref(), payload.uf.as_deref()) {
        (Some(city), Some(state)) if !city.trim().is_empty() && !state.trim().is_empty() => {
            format!("{}/{}", city.trim(), state.trim())
        }
        (city, state) => join_non_empty([city.unwrap_or_default(), state.unwrap_or_default()]),
    };
    let postal_code = payload
        .cep
        .as_deref()
        .map(str::trim)
        .filter(|cep| !cep.is_empty())
        .map(|cep| format!("CEP {cep}"))
        .unwrap_or_default();
    profile.address = join_non_empty([
        payload.logradouro.as_deref().unwrap_or_default(),
        payload.numero.as_deref().unwrap_or_default(),
        payload.complemento.as_deref().unwrap_or_default(),
        payload.bairro.as_deref().unwrap_or_default(),
        city.as_str(),
        postal_code.as_str(),
    ]);

    let mut primary = payload.atividade_principal.unwrap_or_default().into_iter();
    profile.primary_activity = primary.next().map(activity).unwrap_or_default();
    profile.secondary_activities = payload
        .atividades_secundarias
        .unwrap_or_default()
        .into_iter()
        .map(activity)
        .filter(|activity| !activity.code.is_empty() || !activity.description.is_empty())
        .collect();
    profile.partners = payload
        .qsa
        .unwrap_or_default()
        .into_iter()
        .map(|partner| Partner {
            name: text(partner.nome.as_deref()),
            role: text(partner.qual.as_deref()),
            country: text(partner.pais_origem.as_deref()),
            document: text(partner.cpf_cnpj.as_deref()),
        })
        .collect();

    profile.simples = regime(payload.simples);
    profile.mei = regime(payload.simei);
    profile.share_capital = amount_from_value(payload.capital_social.as_ref());
    profile.last_updated = text(payload.ultima_atualizacao.as_deref());
    profile
}

fn activity(raw: ReceitaWsActivity) -> Activity {
    Activity {
        code: text(raw.code.as_deref()),
        description: text(raw.text.as_deref()),
    }
}

fn regime(raw: Option<ReceitaWsRegime>) -> TaxRegime {
    let raw = raw.unwrap_or_default();
    TaxRegime {
        enrolled: raw.optante.unwrap_or(false),
        enrolled_on: normalize_registry_date(raw.data_opcao.as_deref().unwrap_or_default()),
        excluded_on: normalize_registry_date(raw.data_exclusao.as_deref().unwrap_or_default()),
    }
}
