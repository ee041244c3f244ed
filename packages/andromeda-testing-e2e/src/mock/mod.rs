//! An in-memory network of chains and a relayer between them.
//!
//! Contracts are identified by the bytes uploaded for them (`b"kernel"`, `b"adodb"`, `b"vfs"`,
//! `b"economics"`, `b"splitter"`), every other upload produces an inert contract. Transactions
//! are atomic, packets only move when a link is relayed.
mod chain;
mod contracts;
mod relayer;

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use cosmwasm_std::{coin, Addr, Binary, Coin};

use crate::{
    address::derived_address,
    chains::ChainDefinition,
    client::{ChainClient, ClientError, TxResponse},
    error::TestingError,
};

use chain::{ChainState, ChannelState};
pub use contracts::ContractKind;
use contracts::Packet;
pub use relayer::{MockLink, MockRelayer};

/// The balance every faucet starts with
pub const FAUCET_BALANCE: u128 = 1_000_000_000_000_000;

#[derive(Debug, Clone)]
struct Connection {
    chain_a: String,
    connection_a: String,
    chain_b: String,
    connection_b: String,
}

#[derive(Debug, Default)]
struct NetworkState {
    chains: BTreeMap<String, ChainState>,
    connections: Vec<Connection>,
    pending: Vec<Packet>,
    relay_failures: VecDeque<ClientError>,
    instantiate_failures: BTreeMap<String, VecDeque<ClientError>>,
    handshake_failures: VecDeque<ClientError>,
    relayer_ready: bool,
}

impl NetworkState {
    fn chain(&self, chain_id: &str) -> Result<&ChainState, ClientError> {
        self.chains
            .get(chain_id)
            .ok_or_else(|| ClientError::not_found(format!("chain {chain_id}: not found")))
    }

    fn chain_mut(&mut self, chain_id: &str) -> Result<&mut ChainState, ClientError> {
        self.chains
            .get_mut(chain_id)
            .ok_or_else(|| ClientError::not_found(format!("chain {chain_id}: not found")))
    }

    /// Runs `f` against a chain as one transaction, rolling back the chain and any queued
    /// packets if it fails
    fn transact<T>(
        &mut self,
        chain_id: &str,
        f: impl FnOnce(&mut ChainState, &mut Vec<Packet>) -> Result<T, ClientError>,
    ) -> Result<(T, TxResponse), ClientError> {
        let mut outbox = vec![];
        let chain = self.chain_mut(chain_id)?;
        let snapshot = chain.clone();
        match f(chain, &mut outbox) {
            Ok(res) => {
                let transaction_hash = chain.commit();
                let height = chain.height;
                self.pending.extend(outbox);
                Ok((
                    res,
                    TxResponse {
                        transaction_hash,
                        height,
                    },
                ))
            }
            Err(err) => {
                *chain = snapshot;
                Err(err)
            }
        }
    }

    fn open_channel(
        &mut self,
        chain_id: &str,
        connection_id: &str,
        port_id: &str,
        counterparty: (&str, &str, &str),
        version: &str,
    ) -> Result<String, ClientError> {
        let chain = self.chain_mut(chain_id)?;
        let channel_id = format!("channel-{}", chain.next_channel);
        chain.next_channel += 1;
        let (counterparty_chain, counterparty_port, counterparty_channel) = counterparty;
        chain.channels.insert(
            channel_id.clone(),
            ChannelState {
                port_id: port_id.to_string(),
                connection_id: connection_id.to_string(),
                counterparty_chain: counterparty_chain.to_string(),
                counterparty_port: counterparty_port.to_string(),
                counterparty_channel: counterparty_channel.to_string(),
                version: version.to_string(),
            },
        );
        Ok(channel_id)
    }

    fn connect(&mut self, a: &str, b: &str) -> Result<(String, String), ClientError> {
        let mut next_connection = |chain_id: &str| -> Result<String, ClientError> {
            let chain = self.chain_mut(chain_id)?;
            chain.next_connection += 1;
            Ok(format!("connection-{}", chain.next_connection - 1))
        };
        let connection_a = next_connection(a)?;
        let connection_b = next_connection(b)?;

        let transfer = andromeda_std::os::TRANSFER_PORT;
        let version = andromeda_std::os::ICS20_VERSION;
        let channel_b = self.next_channel_id(b)?;
        let channel_a =
            self.open_channel(a, &connection_a, transfer, (b, transfer, &channel_b), version)?;
        self.open_channel(b, &connection_b, transfer, (a, transfer, &channel_a), version)?;
        self.connections.push(Connection {
            chain_a: a.to_string(),
            connection_a: connection_a.clone(),
            chain_b: b.to_string(),
            connection_b: connection_b.clone(),
        });
        Ok((connection_a, connection_b))
    }

    fn has_connection(&self, a: &str, b: &str, connection_a: &str, connection_b: &str) -> bool {
        self.connections.iter().any(|conn| {
            (conn.chain_a == a
                && conn.connection_a == connection_a
                && conn.chain_b == b
                && conn.connection_b == connection_b)
                || (conn.chain_a == b
                    && conn.connection_a == connection_b
                    && conn.chain_b == a
                    && conn.connection_b == connection_a)
        })
    }

    fn next_channel_id(&self, chain_id: &str) -> Result<String, ClientError> {
        Ok(format!("channel-{}", self.chain(chain_id)?.next_channel))
    }
}

/// A handle to the shared network, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        let network = MockNetwork::default();
        network.state().relayer_ready = true;
        network
    }

    fn state(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a chain with a funded faucet
    pub fn add_chain(&self, definition: &'static ChainDefinition) {
        let mut state = self.state();
        let mut chain = ChainState::new(definition);
        chain.mint(
            &Addr::unchecked(definition.faucet.address),
            definition.denom_fee,
            FAUCET_BALANCE,
        );
        state.chains.insert(definition.chain_id.to_string(), chain);
    }

    /// Connects two chains and opens the ICS-20 transfer channel between them, the way a local
    /// testnet comes up with its genesis channels. Returns the connection ids on each side.
    pub fn connect(&self, a: &str, b: &str) -> Result<(String, String), TestingError> {
        Ok(self.state().connect(a, b)?)
    }

    /// A client signing as the account derived from `mnemonic`
    pub fn client(
        &self,
        definition: &'static ChainDefinition,
        mnemonic: &str,
    ) -> Result<MockChain, TestingError> {
        let sender = derived_address(definition.prefix, mnemonic)?;
        Ok(self.client_for(definition, sender))
    }

    pub fn client_for(&self, definition: &'static ChainDefinition, sender: Addr) -> MockChain {
        MockChain {
            network: self.clone(),
            chain_id: definition.chain_id.to_string(),
            sender,
        }
    }

    /// A client signing as the chain's genesis faucet
    pub fn faucet(&self, definition: &'static ChainDefinition) -> MockChain {
        self.client_for(definition, Addr::unchecked(definition.faucet.address))
    }

    pub fn relayer(&self) -> MockRelayer {
        MockRelayer::new(self.clone())
    }

    /// Errors returned by the next relay sweeps, in order
    pub fn fail_next_relays(&self, errors: impl IntoIterator<Item = ClientError>) {
        self.state().relay_failures.extend(errors);
    }

    /// Errors returned by the next channel handshakes, in order
    pub fn fail_next_handshakes(&self, errors: impl IntoIterator<Item = ClientError>) {
        self.state().handshake_failures.extend(errors);
    }

    /// Errors returned by the next instantiations on `chain_id`, in order
    pub fn fail_next_instantiations(
        &self,
        chain_id: &str,
        errors: impl IntoIterator<Item = ClientError>,
    ) -> Result<(), TestingError> {
        let mut state = self.state();
        state.chain(chain_id)?;
        state
            .instantiate_failures
            .entry(chain_id.to_string())
            .or_default()
            .extend(errors);
        Ok(())
    }

    pub fn set_relayer_ready(&self, ready: bool) {
        self.state().relayer_ready = ready;
    }

    pub fn uploads(&self, chain_id: &str) -> usize {
        self.state().chain(chain_id).map_or(0, |chain| chain.uploads)
    }

    pub fn instantiations(&self, chain_id: &str) -> usize {
        self.state()
            .chain(chain_id)
            .map_or(0, |chain| chain.instantiations)
    }

    /// Packets sent but not yet relayed
    pub fn pending_packets(&self) -> usize {
        self.state().pending.len()
    }
}

/// A [`ChainClient`] for one chain of a [`MockNetwork`]
#[derive(Debug, Clone)]
pub struct MockChain {
    network: MockNetwork,
    chain_id: String,
    sender: Addr,
}

impl MockChain {
    /// The same chain, signing as `sender`
    pub fn with_sender(&self, sender: Addr) -> MockChain {
        MockChain {
            sender,
            ..self.clone()
        }
    }

    pub fn network(&self) -> &MockNetwork {
        &self.network
    }
}

impl ChainClient for MockChain {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn sender(&self) -> Addr {
        self.sender.clone()
    }

    async fn upload(&self, label: &str, wasm: Vec<u8>) -> Result<u64, ClientError> {
        let mut state = self.network.state();
        let (code_id, _) = state.transact(&self.chain_id, |chain, _| Ok(chain.upload(&wasm)))?;
        log::debug!("Uploaded {label} as code {code_id} on {}", self.chain_id);
        Ok(code_id)
    }

    async fn instantiate(&self, code_id: u64, msg: Binary, label: &str) -> Result<Addr, ClientError> {
        let mut state = self.network.state();
        let injected = state
            .instantiate_failures
            .get_mut(&self.chain_id)
            .and_then(VecDeque::pop_front);
        if let Some(err) = injected {
            return Err(err);
        }
        let (addr, _) = state.transact(&self.chain_id, |chain, _| {
            chain.instantiate(&self.sender, code_id, &msg)
        })?;
        log::debug!("Instantiated {label} at {addr} on {}", self.chain_id);
        Ok(addr)
    }

    async fn execute(
        &self,
        contract: &Addr,
        msg: Binary,
        funds: &[Coin],
    ) -> Result<TxResponse, ClientError> {
        let mut state = self.network.state();
        let (_, res) = state.transact(&self.chain_id, |chain, outbox| {
            chain.execute(outbox, &self.sender, contract, &msg, funds, None)
        })?;
        Ok(res)
    }

    async fn query(&self, contract: &Addr, msg: Binary) -> Result<Binary, ClientError> {
        self.network.state().chain(&self.chain_id)?.query(contract, &msg)
    }

    async fn balance(&self, address: &Addr, denom: &str) -> Result<Coin, ClientError> {
        let amount = self
            .network
            .state()
            .chain(&self.chain_id)?
            .balance(address, denom);
        Ok(coin(amount, denom))
    }

    async fn send_tokens(&self, to: &Addr, amount: Vec<Coin>) -> Result<TxResponse, ClientError> {
        let mut state = self.network.state();
        let (_, res) = state.transact(&self.chain_id, |chain, _| {
            chain.transfer(&self.sender, to, &amount)
        })?;
        Ok(res)
    }

    async fn latest_height(&self) -> Result<u64, ClientError> {
        Ok(self.network.state().chain(&self.chain_id)?.height)
    }
}

#[cfg(test)]
mod tests {
    use andromeda_std::os::{kernel, ModuleInstantiateMsg};

    use super::*;
    use crate::chains::{LOCAL_OSMO_A, LOCAL_OSMO_B};

    fn network() -> MockNetwork {
        let network = MockNetwork::new();
        network.add_chain(&LOCAL_OSMO_A);
        network.add_chain(&LOCAL_OSMO_B);
        network
    }

    #[tokio::test]
    async fn test_faucet_and_transfer() {
        let network = network();
        let faucet = network.faucet(&LOCAL_OSMO_A);
        let user = network.client(&LOCAL_OSMO_A, "user").unwrap();

        faucet
            .send_tokens(&user.sender(), vec![coin(1000, "uosmo")])
            .await
            .unwrap();
        assert_eq!(
            user.balance(&user.sender(), "uosmo").await.unwrap(),
            coin(1000, "uosmo")
        );
        // Balances are per chain
        let user_b = network.client(&LOCAL_OSMO_B, "user").unwrap();
        assert_eq!(
            user_b.balance(&user.sender(), "uosmo").await.unwrap(),
            coin(0, "uosmo")
        );

        let err = user
            .send_tokens(&faucet.sender(), vec![coin(1001, "uosmo")])
            .await
            .unwrap_err();
        assert!(err.message().contains("insufficient funds"));
        assert_eq!(
            user.balance(&user.sender(), "uosmo").await.unwrap(),
            coin(1000, "uosmo")
        );
    }

    #[tokio::test]
    async fn test_failed_transaction_rolls_back() {
        let network = network();
        let client = network.faucet(&LOCAL_OSMO_A);
        let kernel_code = client.upload("kernel", b"kernel".to_vec()).await.unwrap();
        let kernel = client
            .instantiate_msg(
                kernel_code,
                &kernel::InstantiateMsg {
                    owner: None,
                    chain_name: "osmo-a".to_string(),
                },
                "kernel",
            )
            .await
            .unwrap();

        // Not a valid kernel message, the attached funds stay with the sender
        let height = client.latest_height().await.unwrap();
        let res = client
            .execute(&kernel, Binary::from(b"{\"unknown\":{}}".to_vec()), &[coin(5, "uosmo")])
            .await;
        assert!(res.is_err());
        assert_eq!(client.latest_height().await.unwrap(), height);
        assert_eq!(
            client.balance(&kernel, "uosmo").await.unwrap(),
            coin(0, "uosmo")
        );
    }

    #[tokio::test]
    async fn test_instantiate_failure_injection() {
        let network = network();
        let client = network.faucet(&LOCAL_OSMO_A);
        let kernel_code = client.upload("kernel", b"kernel".to_vec()).await.unwrap();
        let vfs_code = client.upload("vfs", b"vfs".to_vec()).await.unwrap();
        assert_eq!(network.uploads("localosmosis-1"), 2);

        // The vfs requires an existing kernel
        let res = client
            .instantiate_msg(
                vfs_code,
                &ModuleInstantiateMsg {
                    kernel_address: "osmo1missing".to_string(),
                    owner: None,
                },
                "vfs",
            )
            .await;
        assert!(res.is_err());

        network
            .fail_next_instantiations("localosmosis-1", [ClientError::execution("out of gas")])
            .unwrap();
        let msg = kernel::InstantiateMsg {
            owner: None,
            chain_name: "osmo-a".to_string(),
        };
        assert!(client.instantiate_msg(kernel_code, &msg, "kernel").await.is_err());
        assert!(client.instantiate_msg(kernel_code, &msg, "kernel").await.is_ok());
        assert_eq!(network.instantiations("localosmosis-1"), 1);
    }

    #[test]
    fn test_connect_opens_transfer_channel() {
        let network = network();
        let (conn_a, conn_b) = network.connect("localosmosis-1", "localosmosis-2").unwrap();
        assert_eq!(conn_a, "connection-0");
        assert_eq!(conn_b, "connection-0");
        let state = network.state();
        let channel = &state.chain("localosmosis-1").unwrap().channels["channel-0"];
        assert_eq!(channel.port_id, "transfer");
        assert_eq!(channel.counterparty_channel, "channel-0");
        assert_eq!(channel.counterparty_chain, "localosmosis-2");
    }
}
