//! Interchain testing utilities for the Andromeda operating system.
//!
//! Chains and relayers are reached through the [`client::ChainClient`] and
//! [`relayer::IbcRelayer`] traits. [`daemon`] implements both over cw-orch for local chains, the
//! `mock` feature adds an in-memory network for offline tests.
pub mod address;
pub mod adodb;
pub mod cache;
pub mod chains;
pub mod client;
pub mod context;
pub mod daemon;
pub mod endpoint;
pub mod error;
pub mod faucet;
pub mod link;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod os;
pub mod relay;
pub mod relayer;
pub mod verify;
pub mod wait;

pub use context::TestContext;
pub use endpoint::{ChainEndpoint, ContractHandle};
pub use error::TestingError;
