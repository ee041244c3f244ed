use andromeda_testing_e2e::{
    adodb::AdoArtifact,
    chains::TESTNET_MNEMONIC,
    client::ChainClient,
    faucet::fund,
    link::establish_link,
    mock::{MockChain, MockLink, MockNetwork},
    os::{OsContract, OS_CONTRACTS},
    wait::{wait_for_chain, wait_for_relayer, PollPolicy},
    ChainEndpoint, TestContext,
};
use ibc_tests::constants::{
    CHAIN_A, CHAIN_B, FUND_AMOUNT, GENESIS_CONNECTION, ICS20_CHANNEL, SPLITTER, SPLITTER_VERSION,
};

pub type SimulatedContext = TestContext<MockChain, MockLink>;

/// The OS contracts as understood by the simulated chains
pub fn os_contracts() -> Vec<OsContract> {
    OS_CONTRACTS
        .iter()
        .map(|name| OsContract::from_bytes(*name, name.as_bytes()))
        .collect()
}

pub fn ado_artifacts() -> Vec<AdoArtifact> {
    vec![AdoArtifact::from_bytes(SPLITTER, SPLITTER_VERSION, SPLITTER)]
}

/// Two simulated chains brought up the same way the runner brings up the local ones, starting
/// from genesis every time
pub async fn setup() -> anyhow::Result<(MockNetwork, SimulatedContext)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let network = MockNetwork::new();
    network.add_chain(CHAIN_A);
    network.add_chain(CHAIN_B);
    network.connect(CHAIN_A.chain_id, CHAIN_B.chain_id)?;

    let poll = PollPolicy::default();
    let client_a = network.client(CHAIN_A, TESTNET_MNEMONIC)?;
    let client_b = network.client(CHAIN_B, TESTNET_MNEMONIC)?;
    tokio::try_join!(
        wait_for_chain(&client_a, &poll),
        wait_for_chain(&client_b, &poll)
    )?;
    let relayer = network.relayer();
    wait_for_relayer(&relayer, &poll).await?;

    let faucet_a = network.faucet(CHAIN_A);
    let faucet_b = network.faucet(CHAIN_B);
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
    ctx.bootstrap(&os_contracts(), None).await?;
    ctx.connect_kernels().await?;
    ctx.publish_ados(&ado_artifacts(), None).await?;
    Ok((network, ctx))
}
