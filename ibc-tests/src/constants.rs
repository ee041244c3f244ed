use andromeda_testing_e2e::chains::{ChainDefinition, LOCAL_OSMO_A, LOCAL_OSMO_B};

pub const CHAIN_A: &ChainDefinition = &LOCAL_OSMO_A;
pub const CHAIN_B: &ChainDefinition = &LOCAL_OSMO_B;

/// The genesis transfer channel on both test chains
pub const ICS20_CHANNEL: &str = "channel-0";
/// The connection both test chains come up with
pub const GENESIS_CONNECTION: &str = "connection-0";

/// Fee tokens the user is funded with on each chain
pub const FUND_AMOUNT: u128 = 10_000_000_000;
pub const TRANSFER_AMOUNT: u128 = 100;

pub const SPLITTER: &str = "splitter";
pub const SPLITTER_VERSION: &str = "2.3.0";
