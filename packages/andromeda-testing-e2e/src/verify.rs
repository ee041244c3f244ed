use andromeda_std::{
    amp::{ack::decode_ack, AckResponse},
    os::kernel,
};
use cosmwasm_std::{Addr, Coin};
use log::warn;

use crate::{
    client::ChainClient,
    endpoint::ChainEndpoint,
    error::TestingError,
    relay::RelayOutcome,
    relayer::RelayInfo,
};

/// Which chain sent the packets being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    FromA,
    FromB,
}

/// Checks the packet and acknowledgement counts of a sweep in one direction, and that every ack
/// is a success or an error as expected
pub fn assert_directional(
    info: &RelayInfo,
    expected: usize,
    expect_success: bool,
    direction: Direction,
) -> Result<(), TestingError> {
    let (packets, acks) = match direction {
        Direction::FromA => (info.packets_from_a, &info.acks_from_b),
        Direction::FromB => (info.packets_from_b, &info.acks_from_a),
    };
    if packets != expected {
        return Err(TestingError::assertion(format!(
            "expected {expected} packets {direction:?}, relayed {packets}"
        )));
    }
    if acks.len() != expected {
        return Err(TestingError::assertion(format!(
            "expected {expected} acks for packets {direction:?}, got {}",
            acks.len()
        )));
    }

    for ack in acks {
        match (decode_ack(&ack.acknowledgement)?, expect_success) {
            (AckResponse::Result(result), true) if result.is_empty() => {
                return Err(TestingError::assertion("ack result is empty"))
            }
            (AckResponse::Error(err), true) => {
                return Err(TestingError::assertion(format!(
                    "unexpected error ack for packet {}: {err}",
                    ack.original_packet.sequence
                )))
            }
            (AckResponse::Result(_), false) => {
                return Err(TestingError::assertion(format!(
                    "expected an error ack for packet {}",
                    ack.original_packet.sequence
                )))
            }
            (AckResponse::Error(err), false) if err.is_empty() => {
                return Err(TestingError::assertion("error ack carries no message"))
            }
            _ => {}
        }
    }
    Ok(())
}

pub fn assert_packets_from_a(
    info: &RelayInfo,
    expected: usize,
    expect_success: bool,
) -> Result<(), TestingError> {
    assert_directional(info, expected, expect_success, Direction::FromA)
}

pub fn assert_packets_from_b(
    info: &RelayInfo,
    expected: usize,
    expect_success: bool,
) -> Result<(), TestingError> {
    assert_directional(info, expected, expect_success, Direction::FromB)
}

/// Like [`assert_directional`], but skipped when the relay needed retries since the counts of a
/// single sweep are not meaningful then
pub fn assert_relay(
    outcome: &RelayOutcome,
    expected: usize,
    expect_success: bool,
    direction: Direction,
) -> Result<(), TestingError> {
    if !outcome.is_first_attempt {
        warn!("Relay was retried, skipping packet assertions {direction:?}");
        return Ok(());
    }
    assert_directional(&outcome.info, expected, expect_success, direction)
}

pub async fn assert_balance<C: ChainClient>(
    client: &C,
    address: &Addr,
    expected: &Coin,
) -> Result<(), TestingError> {
    let balance = client.balance(address, &expected.denom).await?;
    if balance.amount != expected.amount {
        return Err(TestingError::assertion(format!(
            "{address} holds {balance} on {}, expected {expected}",
            client.chain_id()
        )));
    }
    Ok(())
}

pub async fn query_recoveries<C: ChainClient>(
    endpoint: &ChainEndpoint<C>,
    addr: &Addr,
) -> Result<Vec<Coin>, TestingError> {
    endpoint
        .kernel()?
        .query(
            &endpoint.client,
            &kernel::QueryMsg::Recoveries { addr: addr.clone() },
        )
        .await
}

/// The kernel must hold exactly one recovery for `addr`, matching `expected`
pub async fn assert_single_recovery<C: ChainClient>(
    endpoint: &ChainEndpoint<C>,
    addr: &Addr,
    expected: &Coin,
) -> Result<(), TestingError> {
    let recoveries = query_recoveries(endpoint, addr).await?;
    match recoveries.as_slice() {
        [recovery] if recovery == expected => Ok(()),
        _ => Err(TestingError::assertion(format!(
            "expected a single recovery of {expected} for {addr} on {}, found {recoveries:?}",
            endpoint.name
        ))),
    }
}
