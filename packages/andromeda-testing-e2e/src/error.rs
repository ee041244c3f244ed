use andromeda_std::error::ContractError;
use cosmwasm_std::StdError;
use thiserror::Error;

use crate::client::ClientError;

#[derive(Error, Debug)]
pub enum TestingError {
    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("{0}")]
    Contract(#[from] ContractError),

    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("Chain not found: {0}")]
    ChainNotFound(String),

    #[error("Contract {name} not found on {chain}")]
    ContractNotFound { name: String, chain: String },

    #[error("Timed out waiting for {what} after {attempts} attempts")]
    Timeout { what: String, attempts: u32 },

    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        source: ClientError,
    },

    #[error("Invalid artifact name: {0}")]
    InvalidArtifact(String),

    #[error("Assertion failed: {0}")]
    Assertion(String),
}

impl TestingError {
    pub fn assertion(msg: impl Into<String>) -> Self {
        TestingError::Assertion(msg.into())
    }
}
