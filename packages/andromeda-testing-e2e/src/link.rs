use std::time::Duration;

use andromeda_std::os::{kernel, IBC_VERSION};
use cosmwasm_std::Addr;
use log::{info, warn};

use crate::{
    chains::ChainDefinition,
    client::ChainClient,
    endpoint::ChainEndpoint,
    error::TestingError,
    relayer::{ChannelPair, IbcLink, IbcRelayer, Order, Side},
};

/// How often a channel handshake is attempted before giving up
#[derive(Debug, Clone)]
pub struct ChannelPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for ChannelPolicy {
    fn default() -> Self {
        ChannelPolicy {
            attempts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

/// The IBC port bound by a contract
pub fn kernel_port(kernel: &Addr) -> String {
    format!("wasm.{kernel}")
}

/// Links two chains, reusing the given connections when present
pub async fn establish_link<R: IbcRelayer>(
    relayer: &R,
    a: &ChainDefinition,
    b: &ChainDefinition,
    connections: Option<(&str, &str)>,
) -> Result<R::Link, TestingError> {
    let link = match connections {
        Some((connection_a, connection_b)) => {
            relayer
                .create_with_existing_connections(a, b, connection_a, connection_b)
                .await?
        }
        None => relayer.create_with_new_connections(a, b).await?,
    };
    let (connection_a, connection_b) = link.connections();
    info!(
        "Linked {} ({connection_a}) <-> {} ({connection_b})",
        a.chain_id, b.chain_id
    );
    Ok(link)
}

/// Opens a channel, retrying the whole handshake on failure
pub async fn create_channel<L: IbcLink>(
    link: &L,
    side: Side,
    ports: (&str, &str),
    order: Order,
    version: &str,
    policy: &ChannelPolicy,
) -> Result<ChannelPair, TestingError> {
    let (port_a, port_b) = ports;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match link
            .create_channel(side, port_a, port_b, order, version)
            .await
        {
            Ok(pair) => {
                info!(
                    "Created channel {}:{} <-> {}:{}",
                    pair.src.port_id, pair.src.channel_id, pair.dest.port_id, pair.dest.channel_id
                );
                return Ok(pair);
            }
            Err(err) if attempt >= policy.attempts => {
                return Err(TestingError::RetriesExhausted {
                    operation: format!("channel handshake {port_a} <-> {port_b}"),
                    attempts: attempt,
                    source: err,
                })
            }
            Err(err) => {
                warn!(
                    "Channel handshake attempt {attempt}/{} failed: {err}",
                    policy.attempts
                );
                tokio::time::sleep(policy.backoff).await;
            }
        }
    }
}

/// Opens the unordered channel between the kernels of both chains, initiated from side A
pub async fn create_kernel_channel<C: ChainClient, L: IbcLink>(
    link: &L,
    a: &ChainEndpoint<C>,
    b: &ChainEndpoint<C>,
    policy: &ChannelPolicy,
) -> Result<ChannelPair, TestingError> {
    let port_a = kernel_port(&a.kernel()?.address);
    let port_b = kernel_port(&b.kernel()?.address);
    create_channel(
        link,
        Side::A,
        (&port_a, &port_b),
        Order::Unordered,
        IBC_VERSION,
        policy,
    )
    .await
}

/// Registers the counterparty's channels and kernel with each kernel, then reads them back.
///
/// `channel` must have been opened from side A, so `src` is on `a`.
pub async fn assign_channels<C: ChainClient>(
    a: &mut ChainEndpoint<C>,
    b: &mut ChainEndpoint<C>,
    channel: &ChannelPair,
) -> Result<(), TestingError> {
    let kernel_a = a.kernel()?.address.clone();
    let kernel_b = b.kernel()?.address.clone();

    assign(a, &channel.src.channel_id, &b.name, &kernel_b).await?;
    assign(b, &channel.dest.channel_id, &a.name, &kernel_a).await?;
    a.direct_channel = Some(channel.src.channel_id.clone());
    b.direct_channel = Some(channel.dest.channel_id.clone());
    Ok(())
}

async fn assign<C: ChainClient>(
    endpoint: &ChainEndpoint<C>,
    direct_channel: &str,
    counterparty: &str,
    counterparty_kernel: &Addr,
) -> Result<(), TestingError> {
    let kernel = endpoint.kernel()?;
    kernel
        .execute(
            &endpoint.client,
            &kernel::ExecuteMsg::AssignChannels {
                ics20_channel_id: Some(endpoint.ics20_channel.clone()),
                direct_channel_id: Some(direct_channel.to_string()),
                chain: counterparty.to_string(),
                kernel_address: counterparty_kernel.to_string(),
            },
            &[],
        )
        .await?;

    let info: Option<kernel::ChannelInfoResponse> = kernel
        .query(
            &endpoint.client,
            &kernel::QueryMsg::ChannelInfo {
                chain: counterparty.to_string(),
            },
        )
        .await?;
    let info = info.ok_or_else(|| {
        TestingError::assertion(format!(
            "{} has no channel info for {counterparty}",
            endpoint.name
        ))
    })?;
    if info.ics20.as_deref() != Some(endpoint.ics20_channel.as_str())
        || info.direct.as_deref() != Some(direct_channel)
    {
        return Err(TestingError::assertion(format!(
            "{} stored channels {:?}/{:?} for {counterparty}, expected {}/{direct_channel}",
            endpoint.name, info.ics20, info.direct, endpoint.ics20_channel
        )));
    }
    info!(
        "Assigned channels {}/{direct_channel} for {counterparty} on {}",
        endpoint.ics20_channel, endpoint.name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use andromeda_std::os::{ICS20_VERSION, TRANSFER_PORT};

    use super::*;
    use crate::{
        chains::{LOCAL_OSMO_A, LOCAL_OSMO_B},
        client::ClientError,
        mock::{MockChain, MockLink, MockNetwork},
        os::{setup_os, OsContract, OS_CONTRACTS},
    };

    async fn deployed(
        network: &MockNetwork,
        definition: &'static ChainDefinition,
    ) -> ChainEndpoint<MockChain> {
        let client = network.faucet(definition);
        let contracts: Vec<OsContract> = OS_CONTRACTS
            .iter()
            .map(|name| OsContract::from_bytes(*name, name.as_bytes()))
            .collect();
        let addresses = setup_os(&client, definition.chain_name, &contracts, None)
            .await
            .unwrap();
        let mut endpoint = ChainEndpoint::new(client, definition, "channel-0");
        endpoint.set_contracts(addresses);
        endpoint
    }

    async fn linked() -> (MockNetwork, MockLink) {
        let network = MockNetwork::new();
        network.add_chain(&LOCAL_OSMO_A);
        network.add_chain(&LOCAL_OSMO_B);
        network
            .connect(LOCAL_OSMO_A.chain_id, LOCAL_OSMO_B.chain_id)
            .unwrap();
        let link = establish_link(
            &network.relayer(),
            &LOCAL_OSMO_A,
            &LOCAL_OSMO_B,
            Some(("connection-0", "connection-0")),
        )
        .await
        .unwrap();
        (network, link)
    }

    #[test]
    fn test_kernel_port() {
        assert_eq!(
            kernel_port(&Addr::unchecked("osmo1kernel")),
            "wasm.osmo1kernel"
        );
    }

    #[tokio::test]
    async fn test_establish_link_missing_connection() {
        let network = MockNetwork::new();
        network.add_chain(&LOCAL_OSMO_A);
        network.add_chain(&LOCAL_OSMO_B);
        let res = establish_link(
            &network.relayer(),
            &LOCAL_OSMO_A,
            &LOCAL_OSMO_B,
            Some(("connection-0", "connection-0")),
        )
        .await;
        assert!(matches!(res, Err(TestingError::Client(_))));

        let link = establish_link(&network.relayer(), &LOCAL_OSMO_A, &LOCAL_OSMO_B, None)
            .await
            .unwrap();
        assert_eq!(
            link.connections(),
            ("connection-0".to_string(), "connection-0".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_channel_retries() {
        let (network, link) = linked().await;
        network.fail_next_handshakes([
            ClientError::execution("handshake timed out"),
            ClientError::execution("handshake timed out"),
        ]);
        let pair = create_channel(
            &link,
            Side::A,
            (TRANSFER_PORT, TRANSFER_PORT),
            Order::Unordered,
            ICS20_VERSION,
            &ChannelPolicy::default(),
        )
        .await
        .unwrap();
        assert_eq!(pair.src.channel_id, "channel-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_channel_gives_up() {
        let (network, link) = linked().await;
        network.fail_next_handshakes(
            (0..5).map(|_| ClientError::execution("handshake timed out")),
        );
        let err = create_channel(
            &link,
            Side::A,
            (TRANSFER_PORT, TRANSFER_PORT),
            Order::Unordered,
            ICS20_VERSION,
            &ChannelPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TestingError::RetriesExhausted { attempts: 5, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_kernel_channel_and_assignment() {
        let (network, link) = linked().await;
        let mut a = deployed(&network, &LOCAL_OSMO_A).await;
        let mut b = deployed(&network, &LOCAL_OSMO_B).await;

        let channel = create_kernel_channel(&link, &a, &b, &ChannelPolicy::default())
            .await
            .unwrap();
        assert_eq!(channel.src.port_id, kernel_port(&a.kernel().unwrap().address));
        assert_eq!(channel.dest.port_id, kernel_port(&b.kernel().unwrap().address));

        assign_channels(&mut a, &mut b, &channel).await.unwrap();
        assert_eq!(a.direct_channel.as_deref(), Some(channel.src.channel_id.as_str()));

        let info: Option<kernel::ChannelInfoResponse> = b
            .kernel()
            .unwrap()
            .query(
                &b.client,
                &kernel::QueryMsg::ChannelInfo {
                    chain: "osmo-a".to_string(),
                },
            )
            .await
            .unwrap();
        let info = info.unwrap();
        assert_eq!(info.ics20.as_deref(), Some("channel-0"));
        assert_eq!(info.direct, Some(channel.dest.channel_id.clone()));
        assert_eq!(info.kernel_address, a.kernel().unwrap().address.to_string());
    }

    #[tokio::test]
    async fn test_assign_channels_requires_owner() {
        let (network, _) = linked().await;
        let mut a = deployed(&network, &LOCAL_OSMO_A).await;
        let mut b = deployed(&network, &LOCAL_OSMO_B).await;
        a.client = a.client.with_sender(Addr::unchecked("osmo1intruder"));

        let channel = ChannelPair {
            src: crate::relayer::ChannelEnd {
                port_id: "wasm.a".to_string(),
                channel_id: "channel-1".to_string(),
            },
            dest: crate::relayer::ChannelEnd {
                port_id: "wasm.b".to_string(),
                channel_id: "channel-1".to_string(),
            },
        };
        assert!(assign_channels(&mut a, &mut b, &channel).await.is_err());
        assert!(a.direct_channel.is_none());
    }
}
