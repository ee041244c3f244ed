use andromeda_std::os::kernel;
use andromeda_testing_e2e::{
    adodb::query_code_id,
    client::{ChainClient, ClientError},
    verify::{query_recoveries, Direction},
};
use cosmwasm_std::coin;
use ibc_tests::{
    constants::{FUND_AMOUNT, SPLITTER, TRANSFER_AMOUNT},
    network::installations,
    scenarios,
};
use rstest::rstest;

mod common;

use common::{setup, SimulatedContext};

async fn context() -> SimulatedContext {
    let (_network, ctx) = setup().await.unwrap();
    ctx
}

#[tokio::test]
async fn test_setup() {
    let ctx = context().await;
    let config = installations(&ctx).unwrap();
    assert_eq!(
        config.get_installation("osmo-a").unwrap(),
        &ctx.a.kernel().unwrap().address
    );
    assert!(config.get_installation("osmo-b").is_ok());

    let channel = ctx.channel.as_ref().unwrap();
    assert_eq!(ctx.a.direct_channel.as_ref(), Some(&channel.src.channel_id));
    assert_eq!(ctx.b.direct_channel.as_ref(), Some(&channel.dest.channel_id));

    assert_eq!(
        query_code_id(&ctx.a, SPLITTER).await.unwrap(),
        query_code_id(&ctx.b, SPLITTER).await.unwrap()
    );
    assert_eq!(
        ctx.a
            .client
            .balance(&ctx.a.client.sender(), "uosmo")
            .await
            .unwrap(),
        coin(FUND_AMOUNT, "uosmo")
    );
}

#[tokio::test]
async fn test_local_transfers() {
    let ctx = context().await;
    scenarios::send_local(&ctx.a).await.unwrap();
    scenarios::send_local(&ctx.b).await.unwrap();
}

#[rstest]
#[case::a_to_b(Direction::FromA)]
#[case::b_to_a(Direction::FromB)]
#[tokio::test]
async fn test_remote_transfer(#[case] direction: Direction) {
    let ctx = context().await;
    scenarios::send_remote(&ctx, direction).await.unwrap();
}

#[rstest]
#[case::a_to_b(Direction::FromA)]
#[case::b_to_a(Direction::FromB)]
#[tokio::test]
async fn test_packet_sent_directly_to_kernel(#[case] direction: Direction) {
    let ctx = context().await;
    let sender = match direction {
        Direction::FromA => &ctx.a,
        Direction::FromB => &ctx.b,
    };
    let denom = sender.definition.denom_fee;
    scenarios::send_packet_direct(&ctx, direction).await.unwrap();

    // The attached funds left the sender and nothing stayed with its kernel
    assert_eq!(
        sender
            .client
            .balance(&sender.client.sender(), denom)
            .await
            .unwrap(),
        coin(FUND_AMOUNT - TRANSFER_AMOUNT, denom)
    );
    assert_eq!(
        sender
            .client
            .balance(&sender.kernel().unwrap().address, denom)
            .await
            .unwrap(),
        coin(0, denom)
    );
}

#[tokio::test]
async fn test_round_trip_via_splitter() {
    let ctx = context().await;
    scenarios::round_trip_via_splitter(&ctx).await.unwrap();
}

#[tokio::test]
async fn test_recover_failed_remote_call() {
    let ctx = context().await;
    let sender = ctx.a.client.sender();
    scenarios::recover_failed_remote_call(&ctx).await.unwrap();

    // The recovery was paid out and can not be claimed twice
    assert!(query_recoveries(&ctx.a, &sender).await.unwrap().is_empty());
    assert_eq!(
        ctx.a.client.balance(&sender, "uosmo").await.unwrap(),
        coin(FUND_AMOUNT, "uosmo")
    );
    let res = ctx
        .a
        .kernel()
        .unwrap()
        .execute(&ctx.a.client, &kernel::ExecuteMsg::Recover {}, &[])
        .await;
    assert!(res.is_err());
}

#[tokio::test]
async fn test_recover_failed_return_hop() {
    let ctx = context().await;
    scenarios::recover_failed_return_hop(&ctx).await.unwrap();

    let sender = ctx.b.client.sender();
    assert_eq!(
        ctx.b.client.balance(&sender, &ctx.a.ibc_denom).await.unwrap(),
        coin(TRANSFER_AMOUNT, &ctx.a.ibc_denom)
    );
}

#[tokio::test]
async fn test_default_recovery_address() {
    let ctx = context().await;
    scenarios::default_recovery_address(&ctx).await.unwrap();
    assert_eq!(
        ctx.b
            .client
            .balance(&ctx.b.client.sender(), "uosmo")
            .await
            .unwrap(),
        coin(FUND_AMOUNT, "uosmo")
    );
}

#[tokio::test(start_paused = true)]
async fn test_retried_relay_still_delivers() {
    let (network, ctx) = setup().await.unwrap();
    network.fail_next_relays([
        ClientError::classify("account sequence mismatch, expected 7, got 6"),
        ClientError::classify("header height can't be greater than max height"),
    ]);
    scenarios::send_remote(&ctx, Direction::FromA).await.unwrap();
    assert_eq!(network.pending_packets(), 0);
}

#[tokio::test]
async fn test_all_scenarios() {
    let ctx = context().await;
    scenarios::run_all(&ctx).await.unwrap();
}
