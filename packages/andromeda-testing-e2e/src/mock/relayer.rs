use andromeda_std::os::TRANSFER_PORT;
use log::debug;

use super::{contracts::Packet, MockNetwork, NetworkState};
use crate::{
    chains::ChainDefinition,
    client::ClientError,
    relayer::{
        AckWithMetadata, ChannelEnd, ChannelPair, IbcLink, IbcRelayer, Order, PacketMetadata,
        RelayInfo, Side,
    },
};

#[derive(Debug, Clone)]
pub struct MockRelayer {
    network: MockNetwork,
}

impl MockRelayer {
    pub fn new(network: MockNetwork) -> Self {
        MockRelayer { network }
    }
}

impl IbcRelayer for MockRelayer {
    type Link = MockLink;

    async fn create_with_new_connections(
        &self,
        a: &ChainDefinition,
        b: &ChainDefinition,
    ) -> Result<MockLink, ClientError> {
        let (connection_a, connection_b) = self.network.state().connect(a.chain_id, b.chain_id)?;
        Ok(MockLink {
            network: self.network.clone(),
            chain_a: a.chain_id.to_string(),
            chain_b: b.chain_id.to_string(),
            connection_a,
            connection_b,
        })
    }

    async fn create_with_existing_connections(
        &self,
        a: &ChainDefinition,
        b: &ChainDefinition,
        connection_a: &str,
        connection_b: &str,
    ) -> Result<MockLink, ClientError> {
        let state = self.network.state();
        if !state.has_connection(a.chain_id, b.chain_id, connection_a, connection_b) {
            return Err(ClientError::not_found(format!(
                "connection {connection_a} <-> {connection_b}: not found"
            )));
        }
        Ok(MockLink {
            network: self.network.clone(),
            chain_a: a.chain_id.to_string(),
            chain_b: b.chain_id.to_string(),
            connection_a: connection_a.to_string(),
            connection_b: connection_b.to_string(),
        })
    }

    async fn is_ready(&self) -> Result<bool, ClientError> {
        Ok(self.network.state().relayer_ready)
    }
}

/// A link between two chains of a [`MockNetwork`]
#[derive(Debug, Clone)]
pub struct MockLink {
    network: MockNetwork,
    chain_a: String,
    chain_b: String,
    connection_a: String,
    connection_b: String,
}

impl MockLink {
    /// Whether `packet` travels over one of this link's channels
    fn carries(&self, state: &NetworkState, packet: &Packet) -> bool {
        let connection = if packet.src_chain == self.chain_a && packet.dest_chain == self.chain_b {
            &self.connection_a
        } else if packet.src_chain == self.chain_b && packet.dest_chain == self.chain_a {
            &self.connection_b
        } else {
            return false;
        };
        state
            .chain(&packet.src_chain)
            .ok()
            .and_then(|chain| chain.channels.get(&packet.src_channel))
            .is_some_and(|channel| channel.connection_id == *connection)
    }
}

impl MockLink {
    /// Receives `packet` on its destination and settles the acknowledgement on its source. Leaves
    /// both chains untouched if it fails.
    fn deliver(
        &self,
        state: &mut NetworkState,
        packet: &Packet,
    ) -> Result<AckWithMetadata, ClientError> {
        let mut outbox = vec![];
        let mut dest = state.chain(&packet.dest_chain)?.clone();
        let ack = dest.receive(&mut outbox, packet);
        let acknowledgement = ack
            .encode()
            .map_err(|err| ClientError::execution(err.to_string()))?
            .to_vec();

        if ack.is_success() {
            state.chain_mut(&packet.src_chain)?.commit();
        } else {
            state.transact(&packet.src_chain, |chain, _| chain.refund(packet))?;
        }
        dest.commit();
        let height = dest.height;
        *state.chain_mut(&packet.dest_chain)? = dest;
        state.pending.extend(outbox);

        Ok(AckWithMetadata {
            acknowledgement,
            original_packet: PacketMetadata {
                sequence: packet.sequence,
                source_port: packet.src_port.clone(),
                source_channel: packet.src_channel.clone(),
                destination_port: packet.dest_port.clone(),
                destination_channel: packet.dest_channel.clone(),
            },
            height,
        })
    }
}

impl IbcLink for MockLink {
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
        let mut state = self.network.state();
        if let Some(err) = state.handshake_failures.pop_front() {
            return Err(err);
        }
        state.chain(&self.chain_a)?.validate_port(port_a, version)?;
        state.chain(&self.chain_b)?.validate_port(port_b, version)?;
        let is_transfer = port_a == TRANSFER_PORT && port_b == TRANSFER_PORT;
        if !is_transfer && order == Order::Ordered {
            return Err(ClientError::execution("Only unordered channels are supported"));
        }

        let (src, dest) = match side {
            Side::A => (
                (self.chain_a.as_str(), self.connection_a.as_str(), port_a),
                (self.chain_b.as_str(), self.connection_b.as_str(), port_b),
            ),
            Side::B => (
                (self.chain_b.as_str(), self.connection_b.as_str(), port_b),
                (self.chain_a.as_str(), self.connection_a.as_str(), port_a),
            ),
        };
        let dest_channel = state.next_channel_id(dest.0)?;
        let src_channel =
            state.open_channel(src.0, src.1, src.2, (dest.0, dest.2, &dest_channel), version)?;
        state.open_channel(dest.0, dest.1, dest.2, (src.0, src.2, &src_channel), version)?;
        debug!(
            "Opened channel {}:{src_channel} <-> {}:{dest_channel}",
            src.0, dest.0
        );

        Ok(ChannelPair {
            src: ChannelEnd {
                port_id: src.2.to_string(),
                channel_id: src_channel,
            },
            dest: ChannelEnd {
                port_id: dest.2.to_string(),
                channel_id: dest_channel,
            },
        })
    }

    async fn relay_all(&self) -> Result<RelayInfo, ClientError> {
        let mut state = self.network.state();
        if let Some(err) = state.relay_failures.pop_front() {
            return Err(err);
        }

        // Only packets pending when the sweep starts are relayed, packets sent while handling
        // them wait for the next sweep
        let pending = std::mem::take(&mut state.pending);
        let (batch, rest): (Vec<Packet>, Vec<Packet>) = pending
            .into_iter()
            .partition(|packet| self.carries(&state, packet));
        state.pending = rest;

        let mut info = RelayInfo::default();
        let mut batch = batch.into_iter();
        while let Some(packet) = batch.next() {
            let ack = match self.deliver(&mut state, &packet) {
                Ok(ack) => ack,
                Err(err) => {
                    // Undelivered packets go back to the queue for the next sweep
                    let mut undelivered: Vec<Packet> =
                        std::iter::once(packet).chain(batch).collect();
                    undelivered.append(&mut state.pending);
                    state.pending = undelivered;
                    return Err(err);
                }
            };
            if packet.src_chain == self.chain_a {
                info.packets_from_a += 1;
                info.acks_from_b.push(ack);
            } else {
                info.packets_from_b += 1;
                info.acks_from_a.push(ack);
            }
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{LOCAL_OSMO_A, LOCAL_OSMO_B};

    fn network() -> MockNetwork {
        let network = MockNetwork::new();
        network.add_chain(&LOCAL_OSMO_A);
        network.add_chain(&LOCAL_OSMO_B);
        network
    }

    #[tokio::test]
    async fn test_existing_connections() {
        let network = network();
        let relayer = network.relayer();
        assert!(relayer
            .create_with_existing_connections(&LOCAL_OSMO_A, &LOCAL_OSMO_B, "connection-0", "connection-0")
            .await
            .is_err());

        network.connect(LOCAL_OSMO_A.chain_id, LOCAL_OSMO_B.chain_id).unwrap();
        let link = relayer
            .create_with_existing_connections(&LOCAL_OSMO_A, &LOCAL_OSMO_B, "connection-0", "connection-0")
            .await
            .unwrap();
        assert_eq!(
            link.connections(),
            ("connection-0".to_string(), "connection-0".to_string())
        );
    }

    #[tokio::test]
    async fn test_create_channel_from_either_side() {
        let network = network();
        let link = network
            .relayer()
            .create_with_new_connections(&LOCAL_OSMO_A, &LOCAL_OSMO_B)
            .await
            .unwrap();

        // channel-0 is the genesis transfer channel
        let pair = link
            .create_channel(Side::B, "transfer", "transfer", Order::Unordered, "ics20-1")
            .await
            .unwrap();
        assert_eq!(pair.src.channel_id, "channel-1");
        assert_eq!(pair.dest.channel_id, "channel-1");

        // Unbound wasm ports are rejected
        let err = link
            .create_channel(Side::A, "wasm.osmo1nokernel", "transfer", Order::Unordered, "andr-kernel-1")
            .await
            .unwrap_err();
        assert!(err.message().contains("not bound"));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let network = network();
        let link = network
            .relayer()
            .create_with_new_connections(&LOCAL_OSMO_A, &LOCAL_OSMO_B)
            .await
            .unwrap();
        network.fail_next_relays([ClientError::classify("incorrect account sequence")]);
        network.fail_next_handshakes([ClientError::execution("handshake timed out")]);

        let err = link.relay_all().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(link.relay_all().await.unwrap(), RelayInfo::default());

        assert!(link
            .create_channel(Side::A, "transfer", "transfer", Order::Unordered, "ics20-1")
            .await
            .is_err());
        assert!(link
            .create_channel(Side::A, "transfer", "transfer", Order::Unordered, "ics20-1")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_failed_sweep_keeps_undelivered_packets() {
        use andromeda_std::{
            amp::{AMPCtx, AndrAddr},
            common::DenomTrace,
        };
        use cosmwasm_std::{Addr, Binary};

        use crate::mock::contracts::{PacketData, TransferCoin};

        let network = network();
        let link = network
            .relayer()
            .create_with_new_connections(&LOCAL_OSMO_A, &LOCAL_OSMO_B)
            .await
            .unwrap();
        // Neither kernel exists, the packet fails on B and its refund fails on A
        let packet = |sequence| Packet {
            sequence,
            src_chain: LOCAL_OSMO_A.chain_id.to_string(),
            src_port: TRANSFER_PORT.to_string(),
            src_channel: "channel-0".to_string(),
            dest_chain: LOCAL_OSMO_B.chain_id.to_string(),
            dest_port: TRANSFER_PORT.to_string(),
            dest_channel: "channel-0".to_string(),
            data: PacketData {
                source_kernel: Addr::unchecked("osmo1nokernel"),
                kernel: Addr::unchecked("osmo1nokernel"),
                recipient: AndrAddr::from_string("osmo1receiver"),
                message: Binary::default(),
                funds: vec![TransferCoin {
                    trace: DenomTrace::native("uosmo"),
                    local_denom: "uosmo".to_string(),
                    amount: 10,
                    burned: true,
                }],
                ctx: AMPCtx::new("osmo1sender", "osmo1sender", 0),
                recovery_addr: Addr::unchecked("osmo1sender"),
            },
        };
        network.state().pending.extend([packet(1), packet(2)]);
        let height_b = network.state().chain(LOCAL_OSMO_B.chain_id).unwrap().height;

        assert!(link.relay_all().await.is_err());
        assert_eq!(network.pending_packets(), 2);
        let state = network.state();
        let sequences: Vec<u64> = state.pending.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert_eq!(state.chain(LOCAL_OSMO_B.chain_id).unwrap().height, height_b);
    }
}
