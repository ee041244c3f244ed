use std::time::Duration;

use log::debug;

use crate::{
    error::TestingError,
    relayer::{IbcLink, RelayInfo},
};

/// A relay sweep is retried until the failures have used up the budget. Transient failures
/// cost one unit and any other failure two.
#[derive(Debug, Clone)]
pub struct RelayPolicy {
    pub budget: u32,
    pub delay: Duration,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        RelayPolicy {
            budget: 6,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    /// Whether the first sweep succeeded. Packet counts are only exact when it did, an earlier
    /// failed sweep may already have delivered some of them.
    pub is_first_attempt: bool,
    pub info: RelayInfo,
}

pub async fn relay_all<L: IbcLink>(
    link: &L,
    policy: &RelayPolicy,
) -> Result<RelayOutcome, TestingError> {
    let mut spent = 0;
    let mut attempts = 0;
    loop {
        attempts += 1;
        match link.relay_all().await {
            Ok(info) => {
                debug!(
                    "Relayed {} packets from A and {} from B",
                    info.packets_from_a, info.packets_from_b
                );
                return Ok(RelayOutcome {
                    is_first_attempt: attempts == 1,
                    info,
                });
            }
            Err(err) => {
                spent += if err.is_transient() { 1 } else { 2 };
                if spent >= policy.budget {
                    return Err(TestingError::RetriesExhausted {
                        operation: "relay".to_string(),
                        attempts,
                        source: err,
                    });
                }
                debug!(
                    "Relay attempt {attempts} failed ({spent}/{} of budget used): {err}",
                    policy.budget
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use andromeda_std::amp::AMPMsg;
    use cosmwasm_std::coins;

    use super::*;
    use crate::{
        address::random_address,
        chains::{LOCAL_OSMO_A, LOCAL_OSMO_B},
        client::ClientError,
        context::tests::connected,
        mock::{MockLink, MockNetwork},
        relayer::IbcRelayer,
        verify::assert_packets_from_a,
    };

    async fn linked() -> (MockNetwork, MockLink) {
        let network = MockNetwork::new();
        network.add_chain(&LOCAL_OSMO_A);
        network.add_chain(&LOCAL_OSMO_B);
        let link = network
            .relayer()
            .create_with_new_connections(&LOCAL_OSMO_A, &LOCAL_OSMO_B)
            .await
            .unwrap();
        (network, link)
    }

    fn sequence_mismatch() -> ClientError {
        ClientError::classify("account sequence mismatch, expected 12, got 11")
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt() {
        let (_, link) = linked().await;
        let outcome = relay_all(&link, &RelayPolicy::default()).await.unwrap();
        assert!(outcome.is_first_attempt);
        assert_eq!(outcome.info, RelayInfo::default());
    }

    #[rstest]
    #[case::transient(vec![sequence_mismatch(); 5])]
    #[case::mixed(vec![sequence_mismatch(), ClientError::execution("relayer crashed"), sequence_mismatch()])]
    #[case::fatal(vec![ClientError::execution("relayer crashed"); 2])]
    #[tokio::test(start_paused = true)]
    async fn test_retried_within_budget(#[case] failures: Vec<ClientError>) {
        let ctx = connected().await;
        let receiver = random_address("osmo").unwrap();
        let funds = coins(100, "uosmo");
        let msg = AMPMsg::transfer(format!("ibc://osmo-b/{receiver}"), funds.clone());
        ctx.a
            .kernel()
            .unwrap()
            .execute(&ctx.a.client, &msg.into_kernel_send(), &funds)
            .await
            .unwrap();

        ctx.a.client.network().fail_next_relays(failures);
        let outcome = relay_all(&ctx.link, &RelayPolicy::default()).await.unwrap();
        assert!(!outcome.is_first_attempt);
        // The failed sweeps left the packet in place for the one that succeeded
        assert_eq!(outcome.info.packets_from_a, 1);
        assert_eq!(outcome.info.packets_from_b, 0);
        assert!(outcome.info.acks_from_a.is_empty());
        assert_packets_from_a(&outcome.info, 1, true).unwrap();
        assert_eq!(ctx.a.client.network().pending_packets(), 0);
    }

    #[rstest]
    #[case::transient(vec![sequence_mismatch(); 6], 6)]
    #[case::fatal(vec![ClientError::execution("relayer crashed"); 3], 3)]
    #[case::mixed(vec![sequence_mismatch(), sequence_mismatch(), ClientError::execution("relayer crashed"), ClientError::execution("relayer crashed")], 4)]
    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted(#[case] failures: Vec<ClientError>, #[case] expected: u32) {
        let (network, link) = linked().await;
        network.fail_next_relays(failures);
        let err = relay_all(&link, &RelayPolicy::default()).await.unwrap_err();
        assert!(matches!(
            err,
            TestingError::RetriesExhausted { attempts, .. } if attempts == expected
        ));
    }
}
