use super::addresses::AndrAddr;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::Binary;

/// A simple struct used for inter-contract communication. The struct can be used in two ways:
///
/// 1. Simply just providing an `AndrAddr` which will treat the communication as a transfer of any related funds
/// 2. Providing an `AndrAddr` and a `Binary` message which will be sent to the contract at the resolved address
///
/// Cross-chain recipients may name an `ibc_recovery_address` that receives the funds if delivery fails.
#[cw_serde]
pub struct Recipient {
    pub address: AndrAddr,
    pub msg: Option<Binary>,
    pub ibc_recovery_address: Option<AndrAddr>,
}

impl Recipient {
    pub fn new(addr: impl Into<String>, msg: Option<Binary>) -> Recipient {
        Recipient {
            address: AndrAddr::from_string(addr),
            msg,
            ibc_recovery_address: None,
        }
    }

    /// Creates a Recipient from the given string with no attached message
    pub fn from_string(addr: impl Into<String>) -> Recipient {
        Recipient::new(addr, None)
    }

    pub fn with_ibc_recovery(self, addr: impl Into<String>) -> Self {
        Recipient {
            ibc_recovery_address: Some(AndrAddr::from_string(addr)),
            ..self
        }
    }
}
