use std::sync::{Arc, Mutex};

use cnpjx_core::{
    FailureKind, HttpClient, HttpError, HttpRequest, HttpResponse, OpenCnpjAdapter, ProviderId,
    ReceitaWsAdapter, RegistryId, RegistrySource,
};

const RECEITAWS_OK: &str = r#"{
    "status": "OK",
    "nome": "PETROLEO BRASILEIRO S A PETROBRAS",
    "fantasia": "PETROBRAS",
    "situacao": "ATIVA",
    "abertura": "12/11/1966",
    "porte": "DEMAIS",
    "natureza_juridica": "203-8 - Sociedade de Economia Mista",
    "logradouro": "AV REPUBLICA DO CHILE",
    "numero": "65",
    "bairro": "CENTRO",
    "municipio": "RIO DE JANEIRO",
    "uf": "RJ",
    "cep": "20.031-912",
    "atividade_principal": [{"code": "06.00-0-01", "text": "Extracao de petroleo e gas natural"}],
    "atividades_secundarias": [],
    "qsa": [],
    "capital_social": "205431960490.52"
}"#;

const OPENCNPJ_OK: &str = r#"{
    "razao_social": "PETROLEO BRASILEIRO S A PETROBRAS",
    "nome_fantasia": "PETROBRAS",
    "situacao_cadastral": "ATIVA",
    "data_abertura": "1966-11-12",
    "endereco": "AV REPUBLICA DO CHILE 65, RIO DE JANEIRO/RJ",
    "cnae_principal": {"codigo": "0600001", "descricao": "Extracao de petroleo e gas natural"},
    "capital_social": "R$ 205.431.960.490,52"
}"#;

struct RecordingHttpClient {
    reply: Result<HttpResponse, HttpError>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttpClient {
    fn new(reply: Result<HttpResponse, HttpError>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }
}

impl HttpClient for RecordingHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> cnpjx_core::http_client::HttpFuture<'a> {
        self.requests.lock().expect("lock").push(request);
        let reply = self.reply.clone();
        Box::pin(async move { reply })
    }
}

struct ProviderCase {
    id: ProviderId,
    ok_body: &'static str,
    build: fn(Arc<dyn HttpClient>) -> Arc<dyn RegistrySource>,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::ReceitaWs,
            ok_body: RECEITAWS_OK,
            build: |http| Arc::new(ReceitaWsAdapter::commercial(http, "token")),
        },
        ProviderCase {
            id: ProviderId::OpenCnpj,
            ok_body: OPENCNPJ_OK,
            build: |http| Arc::new(OpenCnpjAdapter::new(http)),
        },
        ProviderCase {
            id: ProviderId::ReceitaWsPublic,
            ok_body: RECEITAWS_OK,
            build: |http| Arc::new(ReceitaWsAdapter::public(http)),
        },
    ]
}

fn registry_id() -> RegistryId {
    RegistryId::parse("33.000.167/0001-01").expect("valid id")
}

#[tokio::test]
async fn every_provider_reports_its_own_id() {
    for case in provider_cases() {
        let http = RecordingHttpClient::new(Ok(HttpResponse::ok_json(case.ok_body)));
        let source = (case.build)(http);
        assert_eq!(source.id(), case.id);
    }
}

#[tokio::test]
async fn every_provider_normalizes_to_the_same_shape() {
    for case in provider_cases() {
        let http = RecordingHttpClient::new(Ok(HttpResponse::ok_json(case.ok_body)));
        let source = (case.build)(http.clone());

        let raw = source
            .fetch(&registry_id())
            .await
            .unwrap_or_else(|error| panic!("provider '{}' fetch failed: {error}", case.id));
        let profile = source.normalize(raw);

        assert_eq!(http.request_count(), 1, "provider '{}'", case.id);
        assert_eq!(profile.registry_id, registry_id(), "provider '{}'", case.id);
        assert_eq!(
            profile.legal_name, "PETROLEO BRASILEIRO S A PETROBRAS",
            "provider '{}'",
            case.id
        );
        assert_eq!(profile.founded_on, "1966-11-12", "provider '{}'", case.id);
        assert!(profile.is_active(), "provider '{}'", case.id);
        assert!(
            (profile.share_capital - 205_431_960_490.52).abs() < 0.01,
            "provider '{}': capital {}",
            case.id,
            profile.share_capital
        );
        assert_eq!(profile.source, case.id.as_str());
        assert!(profile.partners.is_empty());
        assert!(profile.secondary_activities.is_empty());
        assert!(profile.pending_issues.is_none());
        assert!(profile.risk.is_none());

        let json = serde_json::to_value(&profile).expect("serialize");
        for field in [
            "registry_id",
            "legal_name",
            "trade_name",
            "status",
            "founded_on",
            "size_class",
            "legal_nature",
            "phone",
            "email",
            "address",
            "primary_activity",
            "secondary_activities",
            "partners",
            "simples",
            "mei",
            "share_capital",
            "last_updated",
            "source",
            "fetched_at",
        ] {
            assert!(
                json.get(field).is_some(),
                "provider '{}' is missing '{field}'",
                case.id
            );
        }
    }
}

#[tokio::test]
async fn every_provider_classifies_http_failures_the_same_way() {
    let cases = [
        (Ok(HttpResponse::new(429, "")), FailureKind::RateLimited),
        (Ok(HttpResponse::new(504, "")), FailureKind::UpstreamTimeout),
        (Ok(HttpResponse::new(500, "")), FailureKind::UpstreamHardFailure),
        (Ok(HttpResponse::ok_json("not json")), FailureKind::UpstreamSoftFailure),
        (Err(HttpError::timeout("elapsed")), FailureKind::TransportTimeout),
        (Err(HttpError::connect("refused")), FailureKind::TransportError),
    ];

    for provider in provider_cases() {
        for (reply, expected) in &cases {
            let http = RecordingHttpClient::new(reply.clone());
            let source = (provider.build)(http);

            let error = source
                .fetch(&registry_id())
                .await
                .expect_err("fetch must fail");
            assert_eq!(
                error.failure_kind(),
                *expected,
                "provider '{}': {error}",
                provider.id
            );
        }
    }
}

#[tokio::test]
async fn only_the_commercial_endpoint_sends_credentials() {
    for case in provider_cases() {
        let http = RecordingHttpClient::new(Ok(HttpResponse::ok_json(case.ok_body)));
        let source = (case.build)(http.clone());
        source.fetch(&registry_id()).await.expect("fetch succeeds");

        let requests = http.requests.lock().expect("lock");
        let has_auth = requests[0].headers.contains_key("authorization");
        assert_eq!(has_auth, case.id == ProviderId::ReceitaWs, "provider '{}'", case.id);
    }
}

#[tokio::test]
async fn opencnpj_whole_real_amounts_keep_their_thousands() {
    let body = r#"{
        "razao_social": "PADARIA BOM PAO LTDA",
        "situacao_cadastral": "ATIVA",
        "data_abertura": "2019-02-01",
        "capital_social": "R$ 5.000"
    }"#;
    let http = RecordingHttpClient::new(Ok(HttpResponse::ok_json(body)));
    let source = OpenCnpjAdapter::new(http);

    let raw = source.fetch(&registry_id()).await.expect("fetch succeeds");
    let profile = source.normalize(raw);

    assert_eq!(profile.share_capital, 5_000.0);
}
