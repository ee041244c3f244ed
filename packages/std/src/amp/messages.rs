use crate::error::ContractError;
use crate::os::kernel::ExecuteMsg as KernelExecuteMsg;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{from_json, to_json_binary, Binary, Coin, ReplyOn, StdResult};
use serde::{de::DeserializeOwned, Serialize};

use super::addresses::AndrAddr;

#[cw_serde]
#[derive(Default)]
pub struct IBCConfig {
    pub recovery_addr: Option<AndrAddr>,
}

impl IBCConfig {
    #[inline]
    pub fn new(recovery_addr: Option<AndrAddr>) -> IBCConfig {
        IBCConfig { recovery_addr }
    }
}

/// The configuration of the message to be sent.
///
/// Used when a sub message is generated for the given AMP Msg (only used in the case of Wasm Messages).
#[cw_serde]
pub struct AMPMsgConfig {
    /// When the message should reply, defaults to Always
    pub reply_on: ReplyOn,
    /// Determines whether the operation should terminate or proceed upon a failed message
    pub exit_at_error: bool,
    /// An optional imposed gas limit for the message
    pub gas_limit: Option<u64>,
    /// Whether to send the message directly to the given recipient
    pub direct: bool,
    pub ibc_config: Option<IBCConfig>,
}

impl AMPMsgConfig {
    /// The configuration attached to every message the test harness sends.
    ///
    /// A failing message replies on error without unwinding the rest of the packet, which is
    /// what allows failed funds to be recorded as recoveries downstream.
    #[inline]
    pub fn direct(ibc_config: Option<IBCConfig>) -> AMPMsgConfig {
        AMPMsgConfig {
            reply_on: ReplyOn::Error,
            exit_at_error: false,
            gas_limit: None,
            direct: true,
            ibc_config,
        }
    }
}

impl Default for AMPMsgConfig {
    #[inline]
    fn default() -> AMPMsgConfig {
        AMPMsgConfig {
            reply_on: ReplyOn::Always,
            exit_at_error: true,
            gas_limit: None,
            direct: false,
            ibc_config: None,
        }
    }
}

#[cw_serde]
/// This struct defines how the kernel parses and relays messages between ADOs
/// If the desired recipient is via IBC then namespacing must be employed
/// The attached message must be a binary encoded execute message for the receiving ADO
/// Funds can be attached for an individual message and will be attached accordingly
pub struct AMPMsg {
    /// The message recipient, can be a contract/wallet address or a namespaced URI
    pub recipient: AndrAddr,
    /// The message to be sent to the recipient, empty for a plain transfer of funds
    pub message: Binary,
    /// Any funds to be attached to the message, defaults to an empty vector
    pub funds: Vec<Coin>,
    pub config: AMPMsgConfig,
}

impl AMPMsg {
    /// Creates a new AMPMsg
    pub fn new(recipient: impl Into<String>, message: Binary, funds: Option<Vec<Coin>>) -> AMPMsg {
        AMPMsg {
            recipient: AndrAddr::from_string(recipient),
            message,
            funds: funds.unwrap_or_default(),
            config: AMPMsgConfig::default(),
        }
    }

    /// A direct message carrying only funds, no sub-call is made on the recipient
    pub fn transfer(recipient: impl Into<String>, funds: Vec<Coin>) -> AMPMsg {
        create_amp_msg(recipient, None, funds, None)
    }

    /// A direct message executing `body` on the recipient
    pub fn from_body<T: Serialize>(
        recipient: impl Into<String>,
        body: &T,
        funds: Vec<Coin>,
    ) -> StdResult<AMPMsg> {
        Ok(create_amp_msg(
            recipient,
            Some(to_json_binary(body)?),
            funds,
            None,
        ))
    }

    pub fn with_config(&self, config: AMPMsgConfig) -> AMPMsg {
        AMPMsg {
            config,
            ..self.clone()
        }
    }

    /// Adds an IBC recovery address to the message
    pub fn with_ibc_recovery(&self, recovery_addr: Option<AndrAddr>) -> AMPMsg {
        let mut msg = self.clone();
        match (msg.config.ibc_config.as_mut(), recovery_addr) {
            (Some(ibc_config), recovery_addr) => ibc_config.recovery_addr = recovery_addr,
            (None, Some(recovery_addr)) => {
                msg.config.ibc_config = Some(IBCConfig::new(Some(recovery_addr)))
            }
            (None, None) => {}
        }
        msg
    }

    /// The configured recovery address, if any
    pub fn recovery_addr(&self) -> Option<&AndrAddr> {
        self.config
            .ibc_config
            .as_ref()
            .and_then(|config| config.recovery_addr.as_ref())
    }

    /// Whether the message carries a sub-call for the recipient
    pub fn has_message(&self) -> bool {
        !self.message.is_empty()
    }

    /// Decodes the attached JSON message, `None` for a plain transfer
    pub fn decode_message<T: DeserializeOwned>(&self) -> Result<Option<T>, ContractError> {
        if !self.has_message() {
            return Ok(None);
        }
        Ok(Some(from_json(&self.message)?))
    }

    /// Wraps the message in a kernel `send` message
    pub fn into_kernel_send(self) -> KernelExecuteMsg {
        KernelExecuteMsg::Send { message: self }
    }
}

/// Builds the AMP message used throughout the interchain tests.
///
/// An absent or empty `body` produces an empty `message`, i.e. a pure value transfer.
pub fn create_amp_msg(
    recipient: impl Into<String>,
    body: Option<Binary>,
    funds: Vec<Coin>,
    ibc_config: Option<IBCConfig>,
) -> AMPMsg {
    AMPMsg {
        recipient: AndrAddr::from_string(recipient),
        message: body.unwrap_or_default(),
        funds,
        config: AMPMsgConfig::direct(ibc_config),
    }
}

#[cw_serde]
pub struct AMPCtx {
    origin: String,
    pub previous_sender: String,
    pub id: u64,
}

impl AMPCtx {
    #[inline]
    pub fn new(origin: impl Into<String>, previous_sender: impl Into<String>, id: u64) -> AMPCtx {
        AMPCtx {
            origin: origin.into(),
            previous_sender: previous_sender.into(),
            id,
        }
    }

    /// Gets the original sender of a message
    pub fn get_origin(&self) -> String {
        self.origin.clone()
    }

    /// Gets the previous sender of a message
    pub fn get_previous_sender(&self) -> String {
        self.previous_sender.clone()
    }
}

#[cw_serde]
/// An Andromeda packet contains all message protocol related data, this is what is sent between ADOs when communicating
/// It contains an original sender, if used for authorisation the sender must be authorised
/// The previous sender is the one who sent the message
/// A packet may contain several messages which allows for message batching
pub struct AMPPkt {
    /// Any messages associated with the packet
    pub messages: Vec<AMPMsg>,
    pub ctx: AMPCtx,
}

impl AMPPkt {
    /// Creates a new AMP Packet
    pub fn new(
        origin: impl Into<String>,
        previous_sender: impl Into<String>,
        messages: Vec<AMPMsg>,
    ) -> AMPPkt {
        AMPPkt {
            messages,
            ctx: AMPCtx::new(origin, previous_sender, 0),
        }
    }

    /// Gets all unique recipients for messages
    pub fn get_unique_recipients(&self) -> Vec<String> {
        let mut recipients: Vec<String> = self
            .messages
            .iter()
            .map(|msg| msg.recipient.to_string())
            .collect();
        recipients.sort_unstable();
        recipients.dedup();
        recipients
    }

    /// The total funds attached across all messages, merged per denom
    pub fn total_funds(&self) -> Vec<Coin> {
        let mut total: Vec<Coin> = vec![];
        for coin in self.messages.iter().flat_map(|msg| msg.funds.iter()) {
            match total.iter_mut().find(|c| c.denom == coin.denom) {
                Some(existing) => existing.amount += coin.amount,
                None => total.push(coin.clone()),
            }
        }
        total
    }

    /// Wraps the packet in a kernel `amp_receive` message
    pub fn into_kernel_receive(self) -> KernelExecuteMsg {
        KernelExecuteMsg::AMPReceive(self)
    }
}

/// Builds a packet originating from `sender`, who is also the previous sender.
pub fn create_amp_pkt(sender: impl Into<String>, messages: Vec<AMPMsg>) -> AMPPkt {
    let sender = sender.into();
    AMPPkt::new(sender.clone(), sender, messages)
}
