use std::collections::BTreeMap;

use andromeda_std::common::get_ibc_denom;
use log::info;

use crate::{
    adodb::{publish_ados, verify_code_ids_match, AdoArtifact},
    cache::CacheStore,
    client::ChainClient,
    endpoint::ChainEndpoint,
    error::TestingError,
    link::{assign_channels, create_kernel_channel, ChannelPolicy},
    os::{setup_os, verify_key_addresses, OsContract},
    relay::{relay_all, RelayOutcome, RelayPolicy},
    relayer::{ChannelPair, IbcLink},
};

/// Two chains with the operating system deployed on both and a link between them
pub struct TestContext<C, L> {
    pub a: ChainEndpoint<C>,
    pub b: ChainEndpoint<C>,
    pub link: L,
    /// The kernel to kernel channel, once opened
    pub channel: Option<ChannelPair>,
    pub relay_policy: RelayPolicy,
    pub channel_policy: ChannelPolicy,
}

impl<C: ChainClient, L: IbcLink> TestContext<C, L> {
    pub fn new(a: ChainEndpoint<C>, b: ChainEndpoint<C>, link: L) -> Self {
        let mut ctx = TestContext {
            a,
            b,
            link,
            channel: None,
            relay_policy: RelayPolicy::default(),
            channel_policy: ChannelPolicy::default(),
        };
        ctx.derive_ibc_denoms();
        ctx
    }

    /// Each chain's fee token as it arrives on the counterparty over the transfer channel
    fn derive_ibc_denoms(&mut self) {
        self.a.ibc_denom = get_ibc_denom(
            self.b.definition.ics20_port,
            &self.b.ics20_channel,
            self.a.definition.denom_fee,
        );
        self.b.ibc_denom = get_ibc_denom(
            self.a.definition.ics20_port,
            &self.a.ics20_channel,
            self.b.definition.denom_fee,
        );
    }

    /// Deploys the operating system on both chains concurrently
    pub async fn bootstrap(
        &mut self,
        contracts: &[OsContract],
        cache: Option<&CacheStore>,
    ) -> Result<(), TestingError> {
        let (addresses_a, addresses_b) = tokio::try_join!(
            setup_os(&self.a.client, &self.a.name, contracts, cache),
            setup_os(&self.b.client, &self.b.name, contracts, cache),
        )?;
        self.a.set_contracts(addresses_a);
        self.b.set_contracts(addresses_b);
        tokio::try_join!(verify_key_addresses(&self.a), verify_key_addresses(&self.b))?;
        Ok(())
    }

    /// Opens the kernel channel and registers it with both kernels
    pub async fn connect_kernels(&mut self) -> Result<&ChannelPair, TestingError> {
        let channel =
            create_kernel_channel(&self.link, &self.a, &self.b, &self.channel_policy).await?;
        assign_channels(&mut self.a, &mut self.b, &channel).await?;
        info!(
            "Kernels connected over {} <-> {}",
            channel.src.channel_id, channel.dest.channel_id
        );
        Ok(self.channel.insert(channel))
    }

    /// Publishes the ADOs on both chains and checks both ended up with the same code ids
    pub async fn publish_ados(
        &mut self,
        artifacts: &[AdoArtifact],
        cache: Option<&CacheStore>,
    ) -> Result<BTreeMap<String, u64>, TestingError> {
        let (code_ids, _) = tokio::try_join!(
            publish_ados(&self.a, artifacts, cache),
            publish_ados(&self.b, artifacts, cache),
        )?;
        let ado_types: Vec<String> = code_ids.keys().cloned().collect();
        verify_code_ids_match(&self.a, &self.b, &ado_types).await?;
        Ok(code_ids)
    }

    pub async fn relay(&self) -> Result<RelayOutcome, TestingError> {
        relay_all(&self.link, &self.relay_policy).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use andromeda_std::os::kernel;

    use super::*;
    use crate::{
        cache::tests::temp_store,
        chains::{LOCAL_OSMO_A, LOCAL_OSMO_B},
        link::establish_link,
        mock::{MockChain, MockLink, MockNetwork},
        os::OS_CONTRACTS,
    };

    async fn context() -> TestContext<MockChain, MockLink> {
        let network = MockNetwork::new();
        network.add_chain(&LOCAL_OSMO_A);
        network.add_chain(&LOCAL_OSMO_B);
        let (connection_a, connection_b) = network
            .connect(LOCAL_OSMO_A.chain_id, LOCAL_OSMO_B.chain_id)
            .unwrap();
        let link = establish_link(
            &network.relayer(),
            &LOCAL_OSMO_A,
            &LOCAL_OSMO_B,
            Some((connection_a.as_str(), connection_b.as_str())),
        )
        .await
        .unwrap();
        TestContext::new(
            ChainEndpoint::new(network.faucet(&LOCAL_OSMO_A), &LOCAL_OSMO_A, "channel-0"),
            ChainEndpoint::new(network.faucet(&LOCAL_OSMO_B), &LOCAL_OSMO_B, "channel-0"),
            link,
        )
    }

    fn contracts() -> Vec<OsContract> {
        OS_CONTRACTS
            .iter()
            .map(|name| OsContract::from_bytes(*name, name.as_bytes()))
            .collect()
    }

    /// Both chains with the OS deployed and the kernels connected
    pub(crate) async fn connected() -> TestContext<MockChain, MockLink> {
        let mut ctx = context().await;
        ctx.bootstrap(&contracts(), None).await.unwrap();
        ctx.connect_kernels().await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_ibc_denoms() {
        let ctx = context().await;
        assert_eq!(
            ctx.a.ibc_denom,
            get_ibc_denom("transfer", "channel-0", "uosmo")
        );
        assert!(ctx.a.ibc_denom.starts_with("ibc/"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_setup() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ctx = context().await;
        let store = temp_store("context");
        ctx.bootstrap(&contracts(), Some(&store)).await.unwrap();
        assert!(store.load(LOCAL_OSMO_A.chain_id).is_some());
        assert!(store.load(LOCAL_OSMO_B.chain_id).is_some());

        let channel = ctx.connect_kernels().await.unwrap().clone();
        assert_eq!(ctx.b.direct_channel, Some(channel.dest.channel_id));

        let artifacts = vec![AdoArtifact::from_bytes("splitter", "2.3.0", "splitter")];
        let code_ids = ctx.publish_ados(&artifacts, Some(&store)).await.unwrap();
        assert!(code_ids.contains_key("splitter"));

        let info: Option<kernel::ChannelInfoResponse> = ctx
            .a
            .kernel()
            .unwrap()
            .query(
                &ctx.a.client,
                &kernel::QueryMsg::ChannelInfo {
                    chain: "osmo-b".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(info.is_some());

        let outcome = ctx.relay().await.unwrap();
        assert!(outcome.is_first_attempt);
    }
}
