use crate::{chains::ChainDefinition, client::ClientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Unordered,
    Ordered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEnd {
    pub port_id: String,
    pub channel_id: String,
}

/// Both ends of an open channel, `src` is on the side that initiated the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPair {
    pub src: ChannelEnd,
    pub dest: ChannelEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketMetadata {
    pub sequence: u64,
    pub source_port: String,
    pub source_channel: String,
    pub destination_port: String,
    pub destination_channel: String,
}

/// An acknowledgement written by the receiving chain, still in its raw JSON form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckWithMetadata {
    pub acknowledgement: Vec<u8>,
    pub original_packet: PacketMetadata,
    pub height: u64,
}

/// The result of a single relay sweep.
///
/// `acks_from_b` are the acknowledgements chain B wrote for packets sent from A, and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayInfo {
    pub packets_from_a: usize,
    pub packets_from_b: usize,
    pub acks_from_a: Vec<AckWithMetadata>,
    pub acks_from_b: Vec<AckWithMetadata>,
}

/// Creates links between two chains
#[allow(async_fn_in_trait)]
pub trait IbcRelayer {
    type Link: IbcLink;

    async fn create_with_new_connections(
        &self,
        a: &ChainDefinition,
        b: &ChainDefinition,
    ) -> Result<Self::Link, ClientError>;

    async fn create_with_existing_connections(
        &self,
        a: &ChainDefinition,
        b: &ChainDefinition,
        connection_a: &str,
        connection_b: &str,
    ) -> Result<Self::Link, ClientError>;

    async fn is_ready(&self) -> Result<bool, ClientError>;
}

/// An established connection between two chains
#[allow(async_fn_in_trait)]
pub trait IbcLink {
    /// The connection ids on side A and side B
    fn connections(&self) -> (String, String);

    async fn create_channel(
        &self,
        side: Side,
        port_a: &str,
        port_b: &str,
        order: Order,
        version: &str,
    ) -> Result<ChannelPair, ClientError>;

    async fn relay_all(&self) -> Result<RelayInfo, ClientError>;
}
