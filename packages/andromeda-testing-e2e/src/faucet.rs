use cosmwasm_std::{coins, Addr};
use log::info;

use crate::{
    chains::ChainDefinition,
    client::{ChainClient, TxResponse},
    error::TestingError,
};

/// Sends `amount` of the chain's fee token from the faucet to `recipient`
pub async fn fund<C: ChainClient>(
    faucet: &C,
    definition: &ChainDefinition,
    recipient: &Addr,
    amount: u128,
) -> Result<TxResponse, TestingError> {
    let res = faucet
        .send_tokens(recipient, coins(amount, definition.denom_fee))
        .await?;
    info!(
        "Funded {recipient} with {amount}{} on {}",
        definition.denom_fee, definition.chain_id
    );
    Ok(res)
}
