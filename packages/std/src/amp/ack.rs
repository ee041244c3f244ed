use cosmwasm_std::{from_json, to_json_binary, Binary, StdResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ContractError;

/// The raw acknowledgement shape written by the receiving chain.
///
/// Kept separate from [`AckResponse`] so that a packet carrying both or neither field can be
/// reported instead of silently picking one.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
struct RawAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Binary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// A decoded packet acknowledgement, exactly one of `{"result": <base64>}` or `{"error": <string>}`
#[derive(Clone, Debug, PartialEq)]
pub enum AckResponse {
    Result(Binary),
    Error(String),
}

impl AckResponse {
    /// Decodes raw acknowledgement bytes
    pub fn decode(ack: &[u8]) -> Result<AckResponse, ContractError> {
        let raw: RawAck =
            from_json(ack).map_err(|err| ContractError::MalformedAcknowledgement {
                msg: err.to_string(),
            })?;
        match (raw.result, raw.error) {
            (Some(result), None) => Ok(AckResponse::Result(result)),
            (None, Some(error)) => Ok(AckResponse::Error(error)),
            (Some(_), Some(_)) => Err(ContractError::MalformedAcknowledgement {
                msg: "both result and error are set".to_string(),
            }),
            (None, None) => Err(ContractError::MalformedAcknowledgement {
                msg: "neither result nor error is set".to_string(),
            }),
        }
    }

    /// Encodes the acknowledgement the way a receiving chain writes it
    pub fn encode(&self) -> StdResult<Binary> {
        let raw = match self {
            AckResponse::Result(result) => RawAck {
                result: Some(result.clone()),
                error: None,
            },
            AckResponse::Error(error) => RawAck {
                result: None,
                error: Some(error.clone()),
            },
        };
        to_json_binary(&raw)
    }

    pub fn success<T: Serialize>(result: &T) -> StdResult<AckResponse> {
        Ok(AckResponse::Result(to_json_binary(result)?))
    }

    pub fn error(err: impl Into<String>) -> AckResponse {
        AckResponse::Error(err.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AckResponse::Result(_))
    }
}

/// Decodes raw acknowledgement bytes, failing on anything but exactly one of `result`/`error`
pub fn decode_ack(ack: &[u8]) -> Result<AckResponse, ContractError> {
    AckResponse::decode(ack)
}

/// Decodes a successful acknowledgement and parses its `result` payload as JSON
pub fn parse_ack_success<T: DeserializeOwned>(ack: &[u8]) -> Result<T, ContractError> {
    match AckResponse::decode(ack)? {
        AckResponse::Result(result) => Ok(from_json(&result)?),
        AckResponse::Error(error) => Err(ContractError::MalformedAcknowledgement {
            msg: format!("expected a result, got error: {error}"),
        }),
    }
}
