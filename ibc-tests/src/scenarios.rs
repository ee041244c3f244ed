//! The kernel scenarios run against a pair of connected chains.
//!
//! Every scenario sends [`TRANSFER_AMOUNT`] of the sending chain's fee token to a fresh random
//! address so balances start from zero.
use andromeda_std::{
    amp::{
        messages::{create_amp_msg, create_amp_pkt},
        AMPMsg, AndrAddr, IBCConfig, Recipient,
    },
    finance::splitter,
    os::kernel,
};
use andromeda_testing_e2e::{
    adodb::query_code_id,
    address::random_address,
    client::ChainClient,
    relayer::IbcLink,
    verify::{assert_balance, assert_relay, assert_single_recovery, Direction},
    ChainEndpoint, ContractHandle, TestContext,
};
use cosmwasm_std::{coin, to_json_binary, Addr, Coin, Decimal};
use log::info;
use serde::Serialize;

use crate::constants::{SPLITTER, TRANSFER_AMOUNT};

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum InvalidMsg {
    NotAValidMessage {},
}

fn transfer_coin<C>(endpoint: &ChainEndpoint<C>) -> Coin {
    coin(TRANSFER_AMOUNT, endpoint.definition.denom_fee)
}

/// Sender and receiver of a scenario travelling in `direction`
fn endpoints<C, L>(
    ctx: &TestContext<C, L>,
    direction: Direction,
) -> (&ChainEndpoint<C>, &ChainEndpoint<C>) {
    match direction {
        Direction::FromA => (&ctx.a, &ctx.b),
        Direction::FromB => (&ctx.b, &ctx.a),
    }
}

/// Sends `message` through the kernel of `endpoint` with the message's funds attached
async fn kernel_send<C: ChainClient>(
    endpoint: &ChainEndpoint<C>,
    message: AMPMsg,
) -> anyhow::Result<()> {
    let funds = message.funds.clone();
    let res = endpoint
        .kernel()?
        .execute(&endpoint.client, &message.into_kernel_send(), &funds)
        .await?;
    anyhow::ensure!(!res.transaction_hash.is_empty(), "missing transaction hash");
    Ok(())
}

/// Instantiates a splitter on `endpoint` sending everything to `recipient`
async fn instantiate_splitter<C: ChainClient>(
    endpoint: &ChainEndpoint<C>,
    recipient: Recipient,
) -> anyhow::Result<ContractHandle> {
    let code_id = query_code_id(endpoint, SPLITTER).await?;
    let msg = splitter::InstantiateMsg {
        recipients: vec![splitter::AddressPercent::new(recipient, Decimal::one())],
        kernel_address: endpoint.kernel()?.address.to_string(),
        owner: None,
    };
    Ok(ContractHandle::from_code_id(&endpoint.client, code_id, &msg, SPLITTER).await?)
}

/// Claims every recovery of the sender on `endpoint`
async fn recover<C: ChainClient>(endpoint: &ChainEndpoint<C>) -> anyhow::Result<()> {
    let res = endpoint
        .kernel()?
        .execute(&endpoint.client, &kernel::ExecuteMsg::Recover {}, &[])
        .await?;
    anyhow::ensure!(!res.transaction_hash.is_empty(), "missing transaction hash");
    Ok(())
}

/// Funds sent to a local path arrive on the same chain without a packet
pub async fn send_local<C: ChainClient>(endpoint: &ChainEndpoint<C>) -> anyhow::Result<()> {
    let receiver = random_address(endpoint.definition.prefix)?;
    let funds = transfer_coin(endpoint);
    kernel_send(endpoint, AMPMsg::transfer(format!("/{receiver}"), vec![funds.clone()])).await?;
    assert_balance(&endpoint.client, &receiver, &funds).await?;
    info!("Local transfer on {} succeeded", endpoint.name);
    Ok(())
}

/// Funds sent to `ibc://<counterparty>/<receiver>` arrive as the counterparty's voucher
pub async fn send_remote<C: ChainClient, L: IbcLink>(
    ctx: &TestContext<C, L>,
    direction: Direction,
) -> anyhow::Result<()> {
    let (from, to) = endpoints(ctx, direction);
    let receiver = random_address(to.definition.prefix)?;
    let recipient = AndrAddr::cross_chain(&to.name, receiver.as_str());
    kernel_send(from, AMPMsg::transfer(recipient.as_str(), vec![transfer_coin(from)])).await?;

    let outcome = ctx.relay().await?;
    assert_relay(&outcome, 1, true, direction)?;
    assert_balance(&to.client, &receiver, &coin(TRANSFER_AMOUNT, &from.ibc_denom)).await?;
    info!("Transfer {} -> {} succeeded", from.name, to.name);
    Ok(())
}

/// A packet built by the sender and handed straight to its kernel's `amp_receive` is routed
/// like one the kernel built itself
pub async fn send_packet_direct<C: ChainClient, L: IbcLink>(
    ctx: &TestContext<C, L>,
    direction: Direction,
) -> anyhow::Result<()> {
    let (from, to) = endpoints(ctx, direction);
    let receiver = random_address(to.definition.prefix)?;
    let funds = vec![transfer_coin(from)];
    let message = AMPMsg::transfer(
        AndrAddr::cross_chain(&to.name, receiver.as_str()).into_string(),
        funds.clone(),
    );
    let packet = create_amp_pkt(from.client.sender(), vec![message]);
    let res = from
        .kernel()?
        .execute(&from.client, &packet.into_kernel_receive(), &funds)
        .await?;
    anyhow::ensure!(!res.transaction_hash.is_empty(), "missing transaction hash");

    let outcome = ctx.relay().await?;
    assert_relay(&outcome, 1, true, direction)?;
    assert_balance(&to.client, &receiver, &coin(TRANSFER_AMOUNT, &from.ibc_denom)).await?;
    info!("Direct packet {} -> {} succeeded", from.name, to.name);
    Ok(())
}

/// Funds sent from A to a splitter on B are forwarded back to A and arrive in A's native denom
pub async fn round_trip_via_splitter<C: ChainClient, L: IbcLink>(
    ctx: &TestContext<C, L>,
) -> anyhow::Result<()> {
    let receiver = random_address(ctx.a.definition.prefix)?;
    let splitter = instantiate_splitter(
        &ctx.b,
        Recipient::from_string(AndrAddr::cross_chain(&ctx.a.name, receiver.as_str()).into_string()),
    )
    .await?;

    let message = AMPMsg::from_body(
        AndrAddr::cross_chain(&ctx.b.name, splitter.address.as_str()).into_string(),
        &splitter::ExecuteMsg::Send {},
        vec![transfer_coin(&ctx.a)],
    )?;
    kernel_send(&ctx.a, message).await?;

    let outcome = ctx.relay().await?;
    assert_relay(&outcome, 1, true, Direction::FromA)?;
    let outcome = ctx.relay().await?;
    assert_relay(&outcome, 1, true, Direction::FromB)?;
    assert_balance(&ctx.a.client, &receiver, &transfer_coin(&ctx.a)).await?;
    info!("Round trip via splitter succeeded");
    Ok(())
}

/// An invalid message for a remote splitter fails on B and the funds are recorded for the
/// explicit recovery address on A
pub async fn recover_failed_remote_call<C: ChainClient, L: IbcLink>(
    ctx: &TestContext<C, L>,
) -> anyhow::Result<()> {
    let receiver = random_address(ctx.a.definition.prefix)?;
    let recovery_addr = ctx.a.client.sender();
    let splitter = instantiate_splitter(
        &ctx.b,
        Recipient::from_string(AndrAddr::cross_chain(&ctx.a.name, receiver.as_str()).into_string()),
    )
    .await?;

    let message = create_amp_msg(
        AndrAddr::cross_chain(&ctx.b.name, splitter.address.as_str()).into_string(),
        Some(to_json_binary(&InvalidMsg::NotAValidMessage {})?),
        vec![transfer_coin(&ctx.a)],
        Some(IBCConfig::new(Some(AndrAddr::from_string(recovery_addr.as_str())))),
    );
    kernel_send(&ctx.a, message).await?;

    let outcome = ctx.relay().await?;
    assert_relay(&outcome, 1, false, Direction::FromA)?;
    assert_balance(&ctx.b.client, &splitter.address, &coin(0, &ctx.a.ibc_denom)).await?;
    assert_single_recovery(&ctx.a, &recovery_addr, &transfer_coin(&ctx.a)).await?;
    recover(&ctx.a).await?;
    info!("Recovered funds of a failed remote call on {}", ctx.a.name);
    Ok(())
}

/// The splitter on B forwards to a non-contract on A with a message attached. The return hop
/// fails and the funds are recorded on B, in the voucher denom, for the recipient's recovery
/// address.
pub async fn recover_failed_return_hop<C: ChainClient, L: IbcLink>(
    ctx: &TestContext<C, L>,
) -> anyhow::Result<()> {
    let receiver = random_address(ctx.a.definition.prefix)?;
    let recovery_addr = ctx.b.client.sender();
    let splitter = instantiate_splitter(
        &ctx.b,
        Recipient::new(
            AndrAddr::cross_chain(&ctx.a.name, receiver.as_str()).into_string(),
            Some(to_json_binary(&splitter::ExecuteMsg::Send {})?),
        )
        .with_ibc_recovery(recovery_addr.as_str()),
    )
    .await?;

    let message = AMPMsg::from_body(
        AndrAddr::cross_chain(&ctx.b.name, splitter.address.as_str()).into_string(),
        &splitter::ExecuteMsg::Send {},
        vec![transfer_coin(&ctx.a)],
    )?
    .with_ibc_recovery(Some(AndrAddr::from_string(recovery_addr.as_str())));
    kernel_send(&ctx.a, message).await?;

    let outcome = ctx.relay().await?;
    assert_relay(&outcome, 1, true, Direction::FromA)?;
    let outcome = ctx.relay().await?;
    assert_relay(&outcome, 1, false, Direction::FromB)?;
    assert_balance(&ctx.a.client, &receiver, &coin(0, ctx.a.definition.denom_fee)).await?;
    assert_single_recovery(&ctx.b, &recovery_addr, &coin(TRANSFER_AMOUNT, &ctx.a.ibc_denom))
        .await?;
    recover(&ctx.b).await?;
    info!("Recovered funds of a failed return hop on {}", ctx.b.name);
    Ok(())
}

/// Without an explicit recovery address the original sender on B is credited
pub async fn default_recovery_address<C: ChainClient, L: IbcLink>(
    ctx: &TestContext<C, L>,
) -> anyhow::Result<()> {
    let receiver = random_address(ctx.a.definition.prefix)?;
    let sender: Addr = ctx.b.client.sender();
    let splitter = instantiate_splitter(
        &ctx.b,
        Recipient::new(
            AndrAddr::cross_chain(&ctx.a.name, receiver.as_str()).into_string(),
            Some(to_json_binary(&splitter::ExecuteMsg::Send {})?),
        ),
    )
    .await?;

    let message = AMPMsg::from_body(
        splitter.address.as_str(),
        &splitter::ExecuteMsg::Send {},
        vec![transfer_coin(&ctx.b)],
    )?;
    kernel_send(&ctx.b, message).await?;

    let outcome = ctx.relay().await?;
    assert_relay(&outcome, 1, false, Direction::FromB)?;
    assert_single_recovery(&ctx.b, &sender, &transfer_coin(&ctx.b)).await?;
    recover(&ctx.b).await?;
    info!("Recovered funds for the original sender on {}", ctx.b.name);
    Ok(())
}

/// Runs every scenario in order against the same pair of chains
pub async fn run_all<C: ChainClient, L: IbcLink>(ctx: &TestContext<C, L>) -> anyhow::Result<()> {
    send_local(&ctx.a).await?;
    send_local(&ctx.b).await?;
    send_remote(ctx, Direction::FromA).await?;
    send_remote(ctx, Direction::FromB).await?;
    send_packet_direct(ctx, Direction::FromB).await?;
    round_trip_via_splitter(ctx).await?;
    recover_failed_remote_call(ctx).await?;
    recover_failed_return_hop(ctx).await?;
    default_recovery_address(ctx).await?;
    Ok(())
}
