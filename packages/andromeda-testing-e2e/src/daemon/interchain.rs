use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{Arc, Mutex},
};

use cw_orch::prelude::*;
use cw_orch_daemon::Daemon;
use cw_orch_interchain::{
    core::NestedPacketsFlow as IbcTxAnalysis, daemon::DaemonInterchain as DaemonInterchainEnv,
    prelude::*,
};
use log::{debug, warn};

use super::{blocking, client_err, TxLog};
use crate::{
    chains::ChainDefinition,
    client::ClientError,
    relayer::{
        AckWithMetadata, ChannelEnd, ChannelPair, IbcLink, IbcRelayer, Order, PacketMetadata,
        RelayInfo, Side,
    },
};

/// Follows packets between daemons of one interchain environment. Channel handshakes are left to
/// the relayer running next to the chains and validated once done.
#[derive(Clone)]
pub struct InterchainRelayer {
    interchain: Arc<DaemonInterchainEnv>,
    chain_ids: Vec<String>,
    log: TxLog,
}

impl InterchainRelayer {
    pub(crate) fn new(
        interchain: Arc<DaemonInterchainEnv>,
        chain_ids: Vec<String>,
        log: TxLog,
    ) -> Self {
        InterchainRelayer {
            interchain,
            chain_ids,
            log,
        }
    }

    fn link(
        &self,
        a: &ChainDefinition,
        b: &ChainDefinition,
        connection_a: String,
        connection_b: String,
    ) -> InterchainLink {
        InterchainLink {
            interchain: self.interchain.clone(),
            log: self.log.clone(),
            chain_a: a.chain_id.to_string(),
            chain_b: b.chain_id.to_string(),
            connection_a,
            connection_b,
            deferred: Arc::new(Mutex::new(VecDeque::new())),
        }
    }
}

impl IbcRelayer for InterchainRelayer {
    type Link = InterchainLink;

    async fn create_with_new_connections(
        &self,
        a: &ChainDefinition,
        b: &ChainDefinition,
    ) -> Result<InterchainLink, ClientError> {
        Err(ClientError::execution(format!(
            "{} <-> {}: new connections must be opened by the chains' relayer",
            a.chain_id, b.chain_id
        )))
    }

    async fn create_with_existing_connections(
        &self,
        a: &ChainDefinition,
        b: &ChainDefinition,
        connection_a: &str,
        connection_b: &str,
    ) -> Result<InterchainLink, ClientError> {
        for chain_id in [a.chain_id, b.chain_id] {
            self.interchain.get_chain(chain_id).map_err(client_err)?;
        }
        debug!(
            "Following {}:{connection_a} <-> {}:{connection_b}",
            a.chain_id, b.chain_id
        );
        Ok(self.link(a, b, connection_a.to_string(), connection_b.to_string()))
    }

    /// Ready once every chain answers block queries
    async fn is_ready(&self) -> Result<bool, ClientError> {
        Ok(blocking(|| {
            self.chain_ids.iter().all(|chain_id| {
                self.interchain
                    .get_chain(chain_id)
                    .is_ok_and(|daemon: Daemon| daemon.block_info().is_ok())
            })
        }))
    }
}

/// A link between two daemons. Packets sent by any client of the network are followed until
/// acknowledged.
#[derive(Clone)]
pub struct InterchainLink {
    interchain: Arc<DaemonInterchainEnv>,
    log: TxLog,
    chain_a: String,
    chain_b: String,
    connection_a: String,
    connection_b: String,
    /// Packets sent while receiving an earlier hop, reported by later sweeps
    deferred: Arc<Mutex<VecDeque<RelayInfo>>>,
}

fn port_id(port: &str) -> Result<PortId, ClientError> {
    PortId::from_str(port).map_err(|err| ClientError::execution(err.to_string()))
}

fn channel_id(channel: Option<impl ToString>) -> Result<String, ClientError> {
    channel
        .map(|id| id.to_string())
        .ok_or_else(|| ClientError::not_found("channel id: not found"))
}

fn event_attr(tx: &IbcTxAnalysis<Daemon>, attr: &str) -> String {
    tx.tx_id
        .response
        .event_attr_value("recv_packet", attr)
        .unwrap_or_default()
}

/// The packet a receive transaction handled, as far as its events tell
fn received_packet(receive_tx: &IbcTxAnalysis<Daemon>) -> PacketMetadata {
    PacketMetadata {
        sequence: event_attr(receive_tx, "packet_sequence").parse().unwrap_or_default(),
        source_port: event_attr(receive_tx, "packet_src_port"),
        source_channel: event_attr(receive_tx, "packet_src_channel"),
        destination_port: event_attr(receive_tx, "packet_dst_port"),
        destination_channel: event_attr(receive_tx, "packet_dst_channel"),
    }
}

impl InterchainLink {
    fn counterparty(&self, chain_id: &str) -> &str {
        if chain_id == self.chain_a {
            &self.chain_b
        } else {
            &self.chain_a
        }
    }

    /// Adds the packets of `tx`, sent on `chain_id`, to the sweep `depth` hops from now
    fn collect(
        &self,
        tx: &IbcTxAnalysis<Daemon>,
        chain_id: &str,
        depth: usize,
        sweeps: &mut VecDeque<RelayInfo>,
    ) {
        for packet in &tx.packets {
            while sweeps.len() <= depth {
                sweeps.push_back(RelayInfo::default());
            }
            let from_a = chain_id == self.chain_a;
            let info = &mut sweeps[depth];
            if from_a {
                info.packets_from_a += 1;
            } else {
                info.packets_from_b += 1;
            }

            match packet {
                IbcPacketOutcome::Success {
                    receive_tx, ack, ..
                } => {
                    let ack = AckWithMetadata {
                        acknowledgement: ack.to_vec(),
                        original_packet: received_packet(receive_tx),
                        height: receive_tx.tx_id.response.height,
                    };
                    if from_a {
                        info.acks_from_b.push(ack);
                    } else {
                        info.acks_from_a.push(ack);
                    }
                    self.collect(receive_tx, self.counterparty(chain_id), depth + 1, sweeps);
                }
                IbcPacketOutcome::Timeout { .. } => {
                    warn!("Packet sent on {chain_id} timed out");
                }
            }
        }
    }
}

impl IbcLink for InterchainLink {
    fn connections(&self) -> (String, String) {
        (self.connection_a.clone(), self.connection_b.clone())
    }

    async fn create_channel(
        &self,
        side: Side,
        port_a: &str,
        port_b: &str,
        order: Order,
        version: &str,
    ) -> Result<ChannelPair, ClientError> {
        if order == Order::Ordered {
            return Err(ClientError::execution("Only unordered channels are supported"));
        }
        let (src_chain, src_port, dest_chain, dest_port) = match side {
            Side::A => (&self.chain_a, port_a, &self.chain_b, port_b),
            Side::B => (&self.chain_b, port_b, &self.chain_a, port_a),
        };
        let (src_port_id, dest_port_id) = (port_id(src_port)?, port_id(dest_port)?);

        let (src, dest) = blocking(|| {
            let receipt = self
                .interchain
                .create_channel(src_chain, dest_chain, &src_port_id, &dest_port_id, version, None)
                .map_err(client_err)?;
            receipt
                .interchain_channel
                .get_ordered_ports_from(src_chain)
                .map_err(client_err)
        })?;

        Ok(ChannelPair {
            src: ChannelEnd {
                port_id: src_port.to_string(),
                channel_id: channel_id(src.channel)?,
            },
            dest: ChannelEnd {
                port_id: dest_port.to_string(),
                channel_id: channel_id(dest.channel)?,
            },
        })
    }

    async fn relay_all(&self) -> Result<RelayInfo, ClientError> {
        let sent = self.log.take(&[&self.chain_a, &self.chain_b]);
        let mut deferred = self
            .deferred
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut sent = sent.into_iter();
        while let Some(tx) = sent.next() {
            let res = blocking(|| {
                self.interchain
                    .await_packets(&tx.chain_id, tx.response.clone())
            });
            match res {
                Ok(analysis) => self.collect(&analysis, &tx.chain_id, 0, &mut deferred),
                Err(err) => {
                    // Transactions not followed yet are picked up by the next sweep
                    self.log.restore(std::iter::once(tx).chain(sent).collect());
                    return Err(client_err(err));
                }
            }
        }
        Ok(deferred.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("transfer", true)]
    #[case("wasm.osmo1kernel", true)]
    #[case("", false)]
    #[case("not a port", false)]
    fn test_port_id(#[case] port: &str, #[case] valid: bool) {
        assert_eq!(port_id(port).is_ok(), valid);
    }
}
