use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Commercial ReceitaWS endpoint, authenticated with a bearer token.
    ReceitaWs,
    /// Open aggregator with a flat schema.
    OpenCnpj,
    /// Public ReceitaWS endpoint queried without credentials.
    ReceitaWsPublic,
}

impl ProviderId {
    pub const ALL: [Self; 3] = [Self::ReceitaWs, Self::OpenCnpj, Self::ReceitaWsPublic];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReceitaWs => "receitaws",
            Self::OpenCnpj => "opencnpj",
            Self::ReceitaWsPublic => "receitaws_public",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "receitaws" => Ok(Self::ReceitaWs),
            "opencnpj" => Ok(Self::OpenCnpj),
            "receitaws_public" => Ok(Self::ReceitaWsPublic),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
