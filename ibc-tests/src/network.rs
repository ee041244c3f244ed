use andromeda_testing_e2e::{
    adodb::load_artifacts,
    cache::CacheStore,
    chains::TESTNET_MNEMONIC,
    client::ChainClient,
    daemon::{DaemonClient, DaemonNetwork, InterchainLink},
    faucet::fund,
    link::establish_link,
    os::os_contracts_in,
    wait::{wait_for_chain, wait_for_relayer, PollPolicy},
    ChainEndpoint, TestContext,
};
use log::info;

use crate::{
    config::{Config, Settings},
    constants::{CHAIN_A, CHAIN_B, FUND_AMOUNT, GENESIS_CONNECTION, ICS20_CHANNEL},
};

pub type LiveContext = TestContext<DaemonClient, InterchainLink>;

/// The two local chains reached on `settings.host`, with a funded user, the OS deployed on both,
/// the kernels connected and every ADO in the artifacts directory published.
///
/// Deployments found in `cache` are reused.
pub async fn setup(settings: &Settings, cache: Option<&CacheStore>) -> anyhow::Result<LiveContext> {
    for definition in [CHAIN_A, CHAIN_B] {
        info!(
            "Connecting to {} at {}",
            definition.chain_id,
            definition.grpc_url(&settings.host)
        );
    }
    let network = DaemonNetwork::connect(&[CHAIN_A, CHAIN_B], &settings.host, TESTNET_MNEMONIC)?;

    let poll = PollPolicy::default();
    let client_a = network.client(CHAIN_A)?;
    let client_b = network.client(CHAIN_B)?;
    tokio::try_join!(
        wait_for_chain(&client_a, &poll),
        wait_for_chain(&client_b, &poll)
    )?;
    let relayer = network.relayer();
    wait_for_relayer(&relayer, &poll).await?;

    let faucet_a = network.faucet(CHAIN_A)?;
    let faucet_b = network.faucet(CHAIN_B)?;
    let sender_a = client_a.sender();
    let sender_b = client_b.sender();
    tokio::try_join!(
        fund(&faucet_a, CHAIN_A, &sender_a, FUND_AMOUNT),
        fund(&faucet_b, CHAIN_B, &sender_b, FUND_AMOUNT)
    )?;

    let link = establish_link(
        &relayer,
        CHAIN_A,
        CHAIN_B,
        Some((GENESIS_CONNECTION, GENESIS_CONNECTION)),
    )
    .await?;

    let mut ctx = TestContext::new(
        ChainEndpoint::new(client_a, CHAIN_A, ICS20_CHANNEL),
        ChainEndpoint::new(client_b, CHAIN_B, ICS20_CHANNEL),
        link,
    );
    ctx.bootstrap(&os_contracts_in(&settings.artifacts_dir), cache)
        .await?;
    ctx.connect_kernels().await?;
    ctx.publish_ados(&load_artifacts(&settings.artifacts_dir)?, cache)
        .await?;
    Ok(ctx)
}

/// The kernel addresses of both chains, keyed by chain name
pub fn installations<C: ChainClient, L>(ctx: &TestContext<C, L>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    for endpoint in [&ctx.a, &ctx.b] {
        config
            .installations
            .insert(endpoint.name.clone(), endpoint.kernel()?.address.clone());
    }
    Ok(config)
}
