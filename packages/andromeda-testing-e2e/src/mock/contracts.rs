use std::collections::BTreeMap;

use andromeda_std::{
    amp::{AMPCtx, AndrAddr},
    common::DenomTrace,
    finance::splitter::AddressPercent,
    os::kernel::ChannelInfoResponse,
};
use cosmwasm_std::{Addr, Binary, Coin, Decimal};

use crate::client::ClientError;

/// The contracts the simulated chains know how to run, keyed by the bytes uploaded for them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Kernel,
    Adodb,
    Vfs,
    Economics,
    Splitter,
    /// Any other code, it can be instantiated but rejects every message
    Inert,
}

impl ContractKind {
    pub fn from_wasm(wasm: &[u8]) -> ContractKind {
        match std::str::from_utf8(wasm).map(str::trim) {
            Ok("kernel") => ContractKind::Kernel,
            Ok("adodb") => ContractKind::Adodb,
            Ok("vfs") => ContractKind::Vfs,
            Ok("economics") => ContractKind::Economics,
            Ok("splitter") => ContractKind::Splitter,
            _ => ContractKind::Inert,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KernelState {
    pub owner: Addr,
    pub chain_name: String,
    pub key_addresses: BTreeMap<String, Addr>,
    pub channels: BTreeMap<String, ChannelInfoResponse>,
    pub recoveries: BTreeMap<Addr, Vec<Coin>>,
}

impl KernelState {
    pub fn ensure_owner(&self, sender: &Addr) -> Result<(), ClientError> {
        if *sender != self.owner {
            return Err(ClientError::execution("Unauthorized"));
        }
        Ok(())
    }

    pub fn add_recovery(&mut self, addr: Addr, coin: Coin) {
        let entry = self.recoveries.entry(addr).or_default();
        match entry.iter_mut().find(|c| c.denom == coin.denom) {
            Some(existing) => existing.amount += coin.amount,
            None => entry.push(coin),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdodbState {
    pub code_ids: BTreeMap<String, u64>,
    pub ado_types: BTreeMap<u64, String>,
    pub versions: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct SplitterState {
    pub kernel_address: Addr,
    pub recipients: Vec<AddressPercent>,
}

impl SplitterState {
    pub fn validate(recipients: &[AddressPercent]) -> Result<(), ClientError> {
        if recipients.is_empty() {
            return Err(ClientError::execution("Empty recipient list"));
        }
        let total = recipients
            .iter()
            .try_fold(Decimal::zero(), |acc, r| acc.checked_add(r.percent))
            .map_err(|err| ClientError::execution(err.to_string()))?;
        if total > Decimal::one() {
            return Err(ClientError::execution("Amount sent exceeds 100%"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum Contract {
    Kernel(KernelState),
    Adodb(AdodbState),
    Module {
        kind: ContractKind,
    },
    Splitter(SplitterState),
    Inert,
}

/// A token leaving the chain inside a packet
#[derive(Debug, Clone)]
pub struct TransferCoin {
    /// The trace as known on the sending chain
    pub trace: DenomTrace,
    pub local_denom: String,
    pub amount: u128,
    /// Burned rather than escrowed, the token is returning towards its origin
    pub burned: bool,
}

#[derive(Debug, Clone)]
pub struct PacketData {
    pub source_kernel: Addr,
    /// The kernel on the receiving chain that handles the packet
    pub kernel: Addr,
    pub recipient: AndrAddr,
    pub message: Binary,
    pub funds: Vec<TransferCoin>,
    pub ctx: AMPCtx,
    /// Where refunds are recorded on the sending chain if the packet fails
    pub recovery_addr: Addr,
}

#[derive(Debug, Clone)]
pub struct Packet {
    pub sequence: u64,
    pub src_chain: String,
    pub src_port: String,
    pub src_channel: String,
    pub dest_chain: String,
    pub dest_port: String,
    pub dest_channel: String,
    pub data: PacketData,
}

#[cfg(test)]
mod tests {
    use andromeda_std::amp::Recipient;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"kernel", ContractKind::Kernel)]
    #[case(b"splitter\n", ContractKind::Splitter)]
    #[case(b"\0asm", ContractKind::Inert)]
    fn test_kind_from_wasm(#[case] wasm: &[u8], #[case] expected: ContractKind) {
        assert_eq!(ContractKind::from_wasm(wasm), expected);
    }

    #[test]
    fn test_validate_recipients() {
        let half = |addr: &str| AddressPercent::new(Recipient::from_string(addr), Decimal::percent(50));
        assert!(SplitterState::validate(&[half("osmo1a"), half("osmo1b")]).is_ok());
        assert!(SplitterState::validate(&[half("osmo1a"), half("osmo1b"), half("osmo1c")]).is_err());
        assert!(SplitterState::validate(&[]).is_err());
    }

    #[test]
    fn test_add_recovery_merges_denoms() {
        let mut kernel = KernelState {
            owner: Addr::unchecked("owner"),
            chain_name: "osmo-a".to_string(),
            key_addresses: BTreeMap::new(),
            channels: BTreeMap::new(),
            recoveries: BTreeMap::new(),
        };
        let user = Addr::unchecked("user");
        kernel.add_recovery(user.clone(), cosmwasm_std::coin(100, "uosmo"));
        kernel.add_recovery(user.clone(), cosmwasm_std::coin(50, "uosmo"));
        kernel.add_recovery(user.clone(), cosmwasm_std::coin(1, "uandr"));
        assert_eq!(
            kernel.recoveries[&user],
            vec![cosmwasm_std::coin(150, "uosmo"), cosmwasm_std::coin(1, "uandr")]
        );
    }
}
