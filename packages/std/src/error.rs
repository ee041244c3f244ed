use cosmwasm_std::StdError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Malformed acknowledgement: {msg}")]
    MalformedAcknowledgement { msg: String },

    #[error("Invalid denom trace path: {path}")]
    InvalidDenomTracePath { path: String, msg: Option<String> },
}
