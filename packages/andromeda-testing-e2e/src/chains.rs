use std::time::Duration;

use cw_orch::{
    environment::{ChainKind, NetworkInfoOwned},
    prelude::ChainInfoOwned,
};

use crate::error::TestingError;

#[derive(Debug)]
pub struct FaucetInfo {
    pub mnemonic: &'static str,
    pub address: &'static str,
}

#[derive(Debug)]
pub struct ChainDefinition {
    pub chain_id: &'static str,
    /// The name the kernel uses to address this chain, as in `ibc://<chain_name>/...`
    pub chain_name: &'static str,
    pub prefix: &'static str,
    pub denom_fee: &'static str,
    pub denom_staking: &'static str,
    pub min_gas_price: f64,
    pub coin_type: u32,
    pub rpc_port: u16,
    pub rest_port: u16,
    pub grpc_port: u16,
    pub ics20_port: &'static str,
    pub block_time: Duration,
    pub faucet: FaucetInfo,
}

impl ChainDefinition {
    pub fn rpc_url(&self, host: &str) -> String {
        format!("http://{host}:{}", self.rpc_port)
    }

    pub fn ws_url(&self, host: &str) -> String {
        format!("ws://{host}:{}", self.rpc_port)
    }

    pub fn rest_url(&self, host: &str) -> String {
        format!("http://{host}:{}", self.rest_port)
    }

    pub fn grpc_url(&self, host: &str) -> String {
        format!("http://{host}:{}", self.grpc_port)
    }

    pub fn min_fee(&self) -> String {
        format!("{}{}", self.min_gas_price, self.denom_fee)
    }

    /// The local chain as seen by a daemon connecting to `host`
    pub fn chain_info(&self, host: &str) -> ChainInfoOwned {
        ChainInfoOwned {
            kind: ChainKind::Local,
            chain_id: self.chain_id.to_string(),
            gas_denom: self.denom_fee.to_string(),
            gas_price: self.min_gas_price,
            grpc_urls: vec![self.grpc_url(host)],
            network_info: NetworkInfoOwned {
                chain_name: self.chain_name.to_string(),
                pub_address_prefix: self.prefix.to_string(),
                coin_type: self.coin_type,
            },
            lcd_url: Some(self.rest_url(host)),
            fcd_url: None,
        }
    }
}

const BLOCK_TIME: Duration = Duration::from_millis(5000);

pub const OSMO_FAUCET: FaucetInfo = FaucetInfo {
    mnemonic: "notice oak worry limit wrap speak medal online prefer cluster roof addict wrist behave treat actual wasp year salad speed social layer crew genius",
    address: "osmo19wpkq20hq9r08qht3qhrvya7fm00cflvrhu6s3",
};

const GENESIS_MNEMONIC: &str =
    "enlist hip relief stomach skate base shallow young switch frequent cry park";

pub const LOCAL_OSMO_A: ChainDefinition = ChainDefinition {
    chain_id: "localosmosis-1",
    chain_name: "osmo-a",
    prefix: "osmo",
    denom_fee: "uosmo",
    denom_staking: "stake",
    min_gas_price: 0.25,
    coin_type: 118,
    rpc_port: 20121,
    rest_port: 20221,
    grpc_port: 20321,
    ics20_port: "transfer",
    block_time: BLOCK_TIME,
    faucet: OSMO_FAUCET,
};

pub const LOCAL_OSMO_B: ChainDefinition = ChainDefinition {
    chain_id: "localosmosis-2",
    chain_name: "osmo-b",
    prefix: "osmo",
    denom_fee: "uosmo",
    denom_staking: "stake",
    min_gas_price: 0.25,
    coin_type: 118,
    rpc_port: 20122,
    rest_port: 20222,
    grpc_port: 20322,
    ics20_port: "transfer",
    block_time: BLOCK_TIME,
    faucet: OSMO_FAUCET,
};

pub const LOCAL_ANDR: ChainDefinition = ChainDefinition {
    chain_id: "localandromeda-1",
    chain_name: "andromeda",
    prefix: "andr",
    denom_fee: "uandr",
    denom_staking: "stake",
    min_gas_price: 0.25,
    coin_type: 118,
    rpc_port: 20111,
    rest_port: 20211,
    grpc_port: 20311,
    ics20_port: "transfer",
    block_time: BLOCK_TIME,
    faucet: FaucetInfo {
        mnemonic: GENESIS_MNEMONIC,
        address: "andr14qemq0vw6y3gc3u3e0aty2e764u4gs5lndxgyk",
    },
};

pub const LOCAL_TERRA: ChainDefinition = ChainDefinition {
    chain_id: "localterra-1",
    chain_name: "terra",
    prefix: "terra",
    denom_fee: "uluna",
    denom_staking: "stake",
    min_gas_price: 0.25,
    coin_type: 330,
    rpc_port: 20131,
    rest_port: 20231,
    grpc_port: 20331,
    ics20_port: "transfer",
    block_time: BLOCK_TIME,
    faucet: FaucetInfo {
        mnemonic: GENESIS_MNEMONIC,
        address: "terra14qemq0vw6y3gc3u3e0aty2e764u4gs5lndxgyk",
    },
};

pub const LOCAL_JUNO_A: ChainDefinition = ChainDefinition {
    chain_id: "localjuno-1",
    chain_name: "juno-a",
    prefix: "juno",
    denom_fee: "ujunox",
    denom_staking: "stake",
    min_gas_price: 2.0,
    coin_type: 118,
    rpc_port: 20141,
    rest_port: 20241,
    grpc_port: 20341,
    ics20_port: "transfer",
    block_time: BLOCK_TIME,
    faucet: FaucetInfo {
        mnemonic: GENESIS_MNEMONIC,
        address: "juno14qemq0vw6y3gc3u3e0aty2e764u4gs5lndxgyk",
    },
};

pub const LOCAL_JUNO_B: ChainDefinition = ChainDefinition {
    chain_id: "localjuno-2",
    chain_name: "juno-b",
    prefix: "juno",
    denom_fee: "ujunox",
    denom_staking: "stake",
    min_gas_price: 2.0,
    coin_type: 118,
    rpc_port: 20142,
    rest_port: 20242,
    grpc_port: 20342,
    ics20_port: "transfer",
    block_time: BLOCK_TIME,
    faucet: FaucetInfo {
        mnemonic: GENESIS_MNEMONIC,
        address: "juno14qemq0vw6y3gc3u3e0aty2e764u4gs5lndxgyk",
    },
};

pub const ALL_CHAINS: &[ChainDefinition] = &[
    LOCAL_OSMO_A,
    LOCAL_OSMO_B,
    LOCAL_ANDR,
    LOCAL_TERRA,
    LOCAL_JUNO_A,
    LOCAL_JUNO_B,
];

/// The mnemonic the harness signs with on every chain
pub const TESTNET_MNEMONIC: &str = "notice oak worry limit wrap speak medal online prefer cluster roof addict wrist behave treat actual wasp year salad speed social layer crew genius";

/// Looks a chain up by chain id or chain name
pub fn get_chain(id_or_name: &str) -> Result<&'static ChainDefinition, TestingError> {
    ALL_CHAINS
        .iter()
        .find(|chain| chain.chain_id == id_or_name || chain.chain_name == id_or_name)
        .ok_or_else(|| TestingError::ChainNotFound(id_or_name.to_string()))
}
