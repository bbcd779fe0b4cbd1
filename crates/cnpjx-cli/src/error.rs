use cnpjx_core::CoreError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] cnpjx_core::ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to open the lookup cache: {0}")]
    Warehouse(#[from] cnpjx_warehouse::WarehouseError),

    #[error("input file has no identifiers: {0}")]
    EmptyInput(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Core(CoreError::Validation(_) | CoreError::Config(_)) => 2,
            Self::Core(CoreError::Serialization(_)) => 4,
            Self::Core(CoreError::Io(_) | CoreError::Warehouse(_)) => 10,
            Self::Warehouse(_) => 10,
            Self::EmptyInput(_) => 2,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
