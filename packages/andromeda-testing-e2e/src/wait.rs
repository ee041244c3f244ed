use std::{future::Future, time::Duration};

use log::debug;

use crate::{client::ChainClient, error::TestingError, relayer::IbcRelayer};

#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            attempts: 30,
            interval: Duration::from_secs(1),
        }
    }
}

/// Calls `check` until it returns true, sleeping between attempts
pub async fn poll_until<F, Fut>(
    what: &str,
    policy: &PollPolicy,
    mut check: F,
) -> Result<(), TestingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=policy.attempts {
        if check().await {
            return Ok(());
        }
        debug!("{what} not ready ({attempt}/{})", policy.attempts);
        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Err(TestingError::Timeout {
        what: what.to_string(),
        attempts: policy.attempts,
    })
}

/// Waits until the chain is producing blocks
pub async fn wait_for_chain<C: ChainClient>(
    client: &C,
    policy: &PollPolicy,
) -> Result<(), TestingError> {
    let what = format!("chain {}", client.chain_id());
    poll_until(&what, policy, move || async move {
        match client.latest_height().await {
            Ok(height) => height > 0,
            Err(err) => {
                debug!("{} unreachable: {err}", client.chain_id());
                false
            }
        }
    })
    .await
}

pub async fn wait_for_relayer<R: IbcRelayer>(
    relayer: &R,
    policy: &PollPolicy,
) -> Result<(), TestingError> {
    poll_until("relayer", policy, move || async move {
        relayer.is_ready().await.unwrap_or(false)
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::{chains::LOCAL_OSMO_A, mock::MockNetwork};

    #[tokio::test(start_paused = true)]
    async fn test_poll_until() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        poll_until("counter", &PollPolicy::default(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst) >= 2
        })
        .await
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_times_out() {
        let policy = PollPolicy {
            attempts: 4,
            interval: Duration::from_millis(500),
        };
        let err = poll_until("nothing", &policy, || async { false })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TestingError::Timeout { attempts: 4, ref what } if what == "nothing"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_chain_and_relayer() {
        let network = MockNetwork::new();
        network.add_chain(&LOCAL_OSMO_A);
        wait_for_chain(&network.faucet(&LOCAL_OSMO_A), &PollPolicy::default())
            .await
            .unwrap();

        network.set_relayer_ready(false);
        let policy = PollPolicy {
            attempts: 3,
            interval: Duration::from_secs(1),
        };
        assert!(wait_for_relayer(&network.relayer(), &policy).await.is_err());
        network.set_relayer_ready(true);
        wait_for_relayer(&network.relayer(), &policy).await.unwrap();
    }
}
