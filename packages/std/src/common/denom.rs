use cosmwasm_schema::cw_serde;
use sha2::{Digest, Sha256};

use crate::error::ContractError;

pub const IBC_DENOM_PREFIX: &str = "ibc/";

/// Hashes a full denom trace (`port/channel/.../base_denom`) into its `ibc/<HASH>` form.
///
/// The trace may contain any number of hops, callers are expected to compose it themselves.
pub fn ibc_denom_from_trace(trace: &str) -> String {
    let hash = Sha256::digest(trace.as_bytes());
    format!("{IBC_DENOM_PREFIX}{}", hex::encode_upper(hash))
}

/// The denom a token of `base_denom` receives after crossing `port/channel` once.
pub fn get_ibc_denom(port: &str, channel: &str, base_denom: &str) -> String {
    ibc_denom_from_trace(&format!("{port}/{channel}/{base_denom}"))
}

#[cw_serde]
pub struct Hop {
    pub port_id: String,
    pub channel_id: String,
}

/// The path a token has travelled along with its original denom
#[cw_serde]
pub struct DenomTrace {
    /// `port/channel` pairs joined by `/`, most recent hop first
    pub path: String,
    pub base_denom: String,
}

impl DenomTrace {
    /// A trace for a native token that has not crossed any channel
    pub fn native(base_denom: impl Into<String>) -> DenomTrace {
        DenomTrace {
            path: String::new(),
            base_denom: base_denom.into(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.path.is_empty()
    }

    pub fn hops(&self) -> Result<Vec<Hop>, ContractError> {
        path_to_hops(&self.path)
    }

    /// Records the token arriving over `port/channel`
    pub fn with_hop(&self, port: &str, channel: &str) -> DenomTrace {
        let path = if self.path.is_empty() {
            format!("{port}/{channel}")
        } else {
            format!("{port}/{channel}/{}", self.path)
        };
        DenomTrace {
            path,
            base_denom: self.base_denom.clone(),
        }
    }

    /// Removes the most recent hop if it went through `port/channel`, i.e. the token is being sent
    /// back the way it came. Returns `None` when the token did not arrive over that channel.
    pub fn without_hop(&self, port: &str, channel: &str) -> Result<Option<DenomTrace>, ContractError> {
        let mut hops = self.hops()?;
        match hops.first() {
            Some(hop) if hop.port_id == port && hop.channel_id == channel => {
                hops.remove(0);
                Ok(Some(DenomTrace {
                    path: hops_to_path(&hops),
                    base_denom: self.base_denom.clone(),
                }))
            }
            _ => Ok(None),
        }
    }

    /// The full trace string that is hashed into the IBC denom
    pub fn full_path(&self) -> String {
        if self.path.is_empty() {
            self.base_denom.clone()
        } else {
            format!("{}/{}", self.path, self.base_denom)
        }
    }

    /// The on-chain denom, the base denom for native tokens and `ibc/<HASH>` otherwise
    pub fn get_ibc_denom(&self) -> String {
        if self.is_native() {
            self.base_denom.clone()
        } else {
            ibc_denom_from_trace(&self.full_path())
        }
    }
}

fn path_to_hops(path: &str) -> Result<Vec<Hop>, ContractError> {
    if path.is_empty() {
        return Ok(vec![]);
    }
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() % 2 != 0 || parts.iter().any(|part| part.is_empty()) {
        return Err(ContractError::InvalidDenomTracePath {
            path: path.to_string(),
            msg: Some("Expected port/channel pairs".to_string()),
        });
    }
    Ok(parts
        .chunks(2)
        .map(|pair| Hop {
            port_id: pair[0].to_string(),
            channel_id: pair[1].to_string(),
        })
        .collect())
}

fn hops_to_path(hops: &[Hop]) -> String {
    hops.iter()
        .map(|hop| format!("{}/{}", hop.port_id, hop.channel_id))
        .collect::<Vec<_>>()
        .join("/")
}
