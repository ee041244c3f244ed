use cosmwasm_std::{from_json, to_json_binary, Addr, Binary, Coin};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::error::TestingError;

/// The classes of failure a chain client or relayer can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// The signer's account sequence is stale, usually from a concurrent broadcast
    AccountSequence,
    /// A header was requested above the counterparty's latest height
    HeightOrdering,
    Unreachable,
    Execution,
    Query,
    NotFound,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct ClientError {
    kind: ClientErrorKind,
    message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        ClientError {
            kind,
            message: message.into(),
        }
    }

    /// Classifies a raw log returned by a node or relayer.
    pub fn classify(raw_log: impl Into<String>) -> Self {
        let message = raw_log.into();
        let lower = message.to_lowercase();
        let kind = if lower.contains("incorrect account sequence")
            || lower.contains("account sequence mismatch")
        {
            ClientErrorKind::AccountSequence
        } else if lower.contains("can't be greater than max height") {
            ClientErrorKind::HeightOrdering
        } else if lower.contains("connection refused") || lower.contains("timed out") {
            ClientErrorKind::Unreachable
        } else if lower.contains("not found") {
            ClientErrorKind::NotFound
        } else {
            ClientErrorKind::Execution
        };
        ClientError { kind, message }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        ClientError::new(ClientErrorKind::Execution, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        ClientError::new(ClientErrorKind::Query, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ClientError::new(ClientErrorKind::NotFound, message)
    }

    pub fn kind(&self) -> ClientErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Errors that clear up on their own once the chains make progress
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ClientErrorKind::AccountSequence | ClientErrorKind::HeightOrdering
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResponse {
    pub transaction_hash: String,
    pub height: u64,
}

/// A signing client bound to a single chain and sender.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    fn chain_id(&self) -> &str;

    fn sender(&self) -> Addr;

    async fn upload(&self, label: &str, wasm: Vec<u8>) -> Result<u64, ClientError>;

    async fn instantiate(&self, code_id: u64, msg: Binary, label: &str) -> Result<Addr, ClientError>;

    async fn execute(
        &self,
        contract: &Addr,
        msg: Binary,
        funds: &[Coin],
    ) -> Result<TxResponse, ClientError>;

    async fn query(&self, contract: &Addr, msg: Binary) -> Result<Binary, ClientError>;

    async fn balance(&self, address: &Addr, denom: &str) -> Result<Coin, ClientError>;

    async fn send_tokens(&self, to: &Addr, amount: Vec<Coin>) -> Result<TxResponse, ClientError>;

    async fn latest_height(&self) -> Result<u64, ClientError>;

    async fn instantiate_msg<M: Serialize>(
        &self,
        code_id: u64,
        msg: &M,
        label: &str,
    ) -> Result<Addr, TestingError> {
        let msg = to_json_binary(msg)?;
        Ok(self.instantiate(code_id, msg, label).await?)
    }

    async fn execute_msg<M: Serialize>(
        &self,
        contract: &Addr,
        msg: &M,
        funds: &[Coin],
    ) -> Result<TxResponse, TestingError> {
        let msg = to_json_binary(msg)?;
        Ok(self.execute(contract, msg, funds).await?)
    }

    async fn query_msg<M: Serialize, T: DeserializeOwned>(
        &self,
        contract: &Addr,
        msg: &M,
    ) -> Result<T, TestingError> {
        let msg = to_json_binary(msg)?;
        let res = self.query(contract, msg).await?;
        Ok(from_json(res)?)
    }
}
