use thiserror::Error;

/// Validation and contract errors exposed by `cnpjx-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("registry id must have 14 digits, found {len}")]
    RegistryIdLength { len: usize },
    #[error("registry id cannot repeat a single digit")]
    RegistryIdRepeatedDigits,
    #[error("registry id check digits do not match (expected {expected}, found {found})")]
    RegistryIdCheckDigit { expected: String, found: String },

    #[error("invalid source '{value}', expected one of receitaws, opencnpj, receitaws_public")]
    InvalidSource { value: String },

    #[error("timestamp is not in a recognised format: '{value}'")]
    InvalidTimestamp { value: String },

    #[error("rate limit needs at least one call per window")]
    ZeroRateLimit,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Warehouse(#[from] cnpjx_warehouse::WarehouseError),
}
