use std::collections::BTreeMap;

use cosmwasm_std::{Addr, Coin};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    chains::ChainDefinition,
    client::{ChainClient, TxResponse},
    error::TestingError,
};

/// A deployed contract on a single chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    pub address: Addr,
    pub code_id: Option<u64>,
}

impl ContractHandle {
    pub fn from_address(address: Addr) -> Self {
        ContractHandle {
            address,
            code_id: None,
        }
    }

    /// Instantiates a new contract from an uploaded code id
    pub async fn from_code_id<C: ChainClient, M: Serialize>(
        client: &C,
        code_id: u64,
        msg: &M,
        label: &str,
    ) -> Result<Self, TestingError> {
        let address = client.instantiate_msg(code_id, msg, label).await?;
        Ok(ContractHandle {
            address,
            code_id: Some(code_id),
        })
    }

    pub async fn execute<C: ChainClient, M: Serialize>(
        &self,
        client: &C,
        msg: &M,
        funds: &[Coin],
    ) -> Result<TxResponse, TestingError> {
        client.execute_msg(&self.address, msg, funds).await
    }

    pub async fn query<C: ChainClient, M: Serialize, T: DeserializeOwned>(
        &self,
        client: &C,
        msg: &M,
    ) -> Result<T, TestingError> {
        client.query_msg(&self.address, msg).await
    }
}

/// Everything the harness knows about one chain during a run
pub struct ChainEndpoint<C> {
    pub client: C,
    pub definition: &'static ChainDefinition,
    pub name: String,
    pub contracts: BTreeMap<String, ContractHandle>,
    pub ics20_channel: String,
    pub direct_channel: Option<String>,
    /// The denom this chain's native fee token has on the counterparty
    pub ibc_denom: String,
}

impl<C: ChainClient> ChainEndpoint<C> {
    pub fn new(client: C, definition: &'static ChainDefinition, ics20_channel: &str) -> Self {
        ChainEndpoint {
            client,
            definition,
            name: definition.chain_name.to_string(),
            contracts: BTreeMap::new(),
            ics20_channel: ics20_channel.to_string(),
            direct_channel: None,
            ibc_denom: String::new(),
        }
    }

    pub fn contract(&self, name: &str) -> Result<&ContractHandle, TestingError> {
        self.contracts
            .get(name)
            .ok_or_else(|| TestingError::ContractNotFound {
                name: name.to_string(),
                chain: self.name.clone(),
            })
    }

    pub fn kernel(&self) -> Result<&ContractHandle, TestingError> {
        self.contract(andromeda_std::amp::KERNEL_KEY)
    }

    pub fn adodb(&self) -> Result<&ContractHandle, TestingError> {
        self.contract(andromeda_std::amp::ADO_DB_KEY)
    }

    /// Replaces the contract table with a freshly bootstrapped or cached set of addresses
    pub fn set_contracts(&mut self, addresses: BTreeMap<String, Addr>) {
        self.contracts = addresses
            .into_iter()
            .map(|(name, address)| (name, ContractHandle::from_address(address)))
            .collect();
    }

    pub fn addresses(&self) -> BTreeMap<String, Addr> {
        self.contracts
            .iter()
            .map(|(name, handle)| (name.clone(), handle.address.clone()))
            .collect()
    }
}
