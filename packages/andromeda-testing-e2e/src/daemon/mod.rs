//! Clients and a relayer for real local chains, driven through cw-orch.
//!
//! The cw-orch daemons are synchronous and block on their own runtime handle, every call is
//! therefore wrapped in [`tokio::task::block_in_place`]. That requires a multi-threaded tokio
//! runtime.
mod interchain;

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use cosmrs::{cosmwasm::MsgStoreCode, AccountId};
use cosmwasm_std::{coin, from_json, to_json_binary, Addr, Binary, Coin};
use cw_orch::prelude::*;
use cw_orch_daemon::{CosmTxResponse, Daemon};
use cw_orch_interchain::{daemon::DaemonInterchain as DaemonInterchainEnv, prelude::*};
use log::debug;
use serde_json::Value;

use crate::{
    chains::ChainDefinition,
    client::{ChainClient, ClientError, TxResponse},
    error::TestingError,
};

pub use interchain::{InterchainLink, InterchainRelayer};

fn client_err(err: impl ToString) -> ClientError {
    ClientError::classify(err.to_string())
}

fn blocking<T>(f: impl FnOnce() -> T) -> T {
    tokio::task::block_in_place(f)
}

/// A transaction that may have sent packets, kept until a link follows them
#[derive(Clone)]
pub(crate) struct SentTx {
    pub chain_id: String,
    pub response: CosmTxResponse,
}

/// Transactions broadcast by every client of a [`DaemonNetwork`], in order
#[derive(Clone, Default)]
pub(crate) struct TxLog(Arc<Mutex<Vec<SentTx>>>);

impl TxLog {
    fn lock(&self) -> MutexGuard<'_, Vec<SentTx>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, chain_id: &str, response: CosmTxResponse) {
        self.lock().push(SentTx {
            chain_id: chain_id.to_string(),
            response,
        });
    }

    /// Removes and returns the transactions sent on any of `chain_ids`
    pub fn take(&self, chain_ids: &[&str]) -> Vec<SentTx> {
        let mut log = self.lock();
        let (taken, rest) = std::mem::take(&mut *log)
            .into_iter()
            .partition(|tx| chain_ids.contains(&tx.chain_id.as_str()));
        *log = rest;
        taken
    }

    /// Puts transactions back at the front of the log
    pub fn restore(&self, txs: Vec<SentTx>) {
        let mut log = self.lock();
        let rest = std::mem::take(&mut *log);
        *log = txs.into_iter().chain(rest).collect();
    }
}

/// A set of local chains reachable from `host`, sharing one interchain environment
#[derive(Clone)]
pub struct DaemonNetwork {
    interchain: Arc<DaemonInterchainEnv>,
    chains: BTreeMap<String, &'static ChainDefinition>,
    log: TxLog,
}

impl DaemonNetwork {
    /// Connects to every chain in `definitions`, signing with `mnemonic`
    pub fn connect(
        definitions: &[&'static ChainDefinition],
        host: &str,
        mnemonic: &str,
    ) -> Result<Self, TestingError> {
        let chains = definitions
            .iter()
            .map(|definition| (definition.chain_info(host), Some(mnemonic.to_string())))
            .collect::<Vec<_>>();
        let interchain = blocking(|| DaemonInterchainEnv::new(chains, &ChannelCreationValidator))
            .map_err(client_err)?;
        Ok(DaemonNetwork {
            interchain: Arc::new(interchain),
            chains: definitions
                .iter()
                .map(|definition| (definition.chain_id.to_string(), *definition))
                .collect(),
            log: TxLog::default(),
        })
    }

    fn daemon(&self, chain_id: &str) -> Result<Daemon, TestingError> {
        if !self.chains.contains_key(chain_id) {
            return Err(TestingError::ChainNotFound(chain_id.to_string()));
        }
        Ok(self.interchain.get_chain(chain_id).map_err(client_err)?)
    }

    /// A client signing with the network's mnemonic
    pub fn client(&self, definition: &'static ChainDefinition) -> Result<DaemonClient, TestingError> {
        let daemon = self.daemon(definition.chain_id)?;
        Ok(DaemonClient::new(daemon, definition, self.log.clone()))
    }

    /// A client signing as the chain's genesis faucet
    pub fn faucet(&self, definition: &'static ChainDefinition) -> Result<DaemonClient, TestingError> {
        self.client_with_mnemonic(definition, definition.faucet.mnemonic)
    }

    pub fn client_with_mnemonic(
        &self,
        definition: &'static ChainDefinition,
        mnemonic: &str,
    ) -> Result<DaemonClient, TestingError> {
        let daemon = self.daemon(definition.chain_id)?;
        let daemon = blocking(|| daemon.rebuild().mnemonic(mnemonic).build()).map_err(client_err)?;
        Ok(DaemonClient::new(daemon, definition, self.log.clone()))
    }

    pub fn relayer(&self) -> InterchainRelayer {
        InterchainRelayer::new(
            self.interchain.clone(),
            self.chains.keys().cloned().collect(),
            self.log.clone(),
        )
    }
}

/// A [`ChainClient`] backed by a cw-orch [`Daemon`]
#[derive(Clone)]
pub struct DaemonClient {
    daemon: Daemon,
    chain_id: String,
    sender: Addr,
    log: TxLog,
}

impl DaemonClient {
    fn new(daemon: Daemon, definition: &ChainDefinition, log: TxLog) -> Self {
        let sender = daemon.sender_addr();
        DaemonClient {
            daemon,
            chain_id: definition.chain_id.to_string(),
            sender,
            log,
        }
    }

    pub fn daemon(&self) -> &Daemon {
        &self.daemon
    }
}

/// Contract messages travel as raw JSON, cw-orch serializes them again
fn json_msg(msg: &Binary) -> Result<Value, ClientError> {
    from_json(msg).map_err(|err| ClientError::execution(err.to_string()))
}

impl ChainClient for DaemonClient {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn sender(&self) -> Addr {
        self.sender.clone()
    }

    async fn upload(&self, label: &str, wasm: Vec<u8>) -> Result<u64, ClientError> {
        let sender: AccountId = self.sender.as_str().parse().map_err(client_err)?;
        let msg = MsgStoreCode {
            sender,
            wasm_byte_code: wasm,
            instantiate_permission: None,
        };
        let res = blocking(|| {
            self.daemon
                .rt_handle
                .block_on(self.daemon.sender().commit_tx(vec![msg], None))
        })
        .map_err(client_err)?;
        let code_id = res.uploaded_code_id().map_err(client_err)?;
        debug!("Uploaded {label} as code {code_id} on {}", self.chain_id);
        Ok(code_id)
    }

    async fn instantiate(&self, code_id: u64, msg: Binary, label: &str) -> Result<Addr, ClientError> {
        let msg = json_msg(&msg)?;
        let res = blocking(|| {
            self.daemon
                .instantiate(code_id, &msg, Some(label), Some(&self.sender), &[])
        })
        .map_err(client_err)?;
        let addr = res.instantiated_contract_address().map_err(client_err)?;
        debug!("Instantiated {label} at {addr} on {}", self.chain_id);
        Ok(addr)
    }

    async fn execute(
        &self,
        contract: &Addr,
        msg: Binary,
        funds: &[Coin],
    ) -> Result<TxResponse, ClientError> {
        let msg = json_msg(&msg)?;
        let res = blocking(|| self.daemon.execute(&msg, funds, contract)).map_err(client_err)?;
        let tx = TxResponse {
            transaction_hash: res.txhash.clone(),
            height: res.height,
        };
        self.log.push(&self.chain_id, res);
        Ok(tx)
    }

    async fn query(&self, contract: &Addr, msg: Binary) -> Result<Binary, ClientError> {
        let msg = json_msg(&msg)?;
        let res: Value = blocking(|| self.daemon.query(&msg, contract))
            .map_err(|err| ClientError::query(err.to_string()))?;
        to_json_binary(&res).map_err(|err| ClientError::query(err.to_string()))
    }

    async fn balance(&self, address: &Addr, denom: &str) -> Result<Coin, ClientError> {
        let balances = blocking(|| self.daemon.balance(address, Some(denom.to_string())))
            .map_err(|err| ClientError::query(err.to_string()))?;
        Ok(balances
            .into_iter()
            .find(|balance| balance.denom == denom)
            .unwrap_or_else(|| coin(0, denom)))
    }

    async fn send_tokens(&self, to: &Addr, amount: Vec<Coin>) -> Result<TxResponse, ClientError> {
        let res = blocking(|| {
            self.daemon
                .rt_handle
                .block_on(self.daemon.sender().bank_send(to, amount))
        })
        .map_err(client_err)?;
        Ok(TxResponse {
            transaction_hash: res.txhash,
            height: res.height,
        })
    }

    async fn latest_height(&self) -> Result<u64, ClientError> {
        let block = blocking(|| self.daemon.block_info()).map_err(client_err)?;
        Ok(block.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(chain_id: &str, txhash: &str) -> SentTx {
        SentTx {
            chain_id: chain_id.to_string(),
            response: CosmTxResponse {
                txhash: txhash.to_string(),
                ..Default::default()
            },
        }
    }

    fn hashes(txs: &[SentTx]) -> Vec<&str> {
        txs.iter().map(|tx| tx.response.txhash.as_str()).collect()
    }

    #[test]
    fn test_tx_log_take_and_restore() {
        let log = TxLog::default();
        log.lock().extend([
            sent("localosmosis-1", "A1"),
            sent("localjuno-1", "J1"),
            sent("localosmosis-2", "B1"),
        ]);

        let taken = log.take(&["localosmosis-1", "localosmosis-2"]);
        assert_eq!(hashes(&taken), vec!["A1", "B1"]);
        assert_eq!(hashes(&log.lock()), vec!["J1"]);

        log.restore(taken);
        assert_eq!(hashes(&log.lock()), vec!["A1", "B1", "J1"]);
    }

    #[test]
    fn test_json_msg() {
        let msg = to_json_binary(&serde_json::json!({ "send": {} })).unwrap();
        assert_eq!(json_msg(&msg).unwrap(), serde_json::json!({ "send": {} }));
        assert!(json_msg(&Binary::from(b"not json".to_vec())).is_err());
    }
}
