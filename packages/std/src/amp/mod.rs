pub mod ack;
pub mod addresses;
pub mod messages;
pub mod recipient;

pub const KERNEL_KEY: &str = "kernel";
pub const ADO_DB_KEY: &str = "adodb";
pub const VFS_KEY: &str = "vfs";
pub const ECONOMICS_KEY: &str = "economics";

/// The protocol prefix used to address a recipient on another chain
pub const IBC_PROTOCOL: &str = "ibc";

pub use ack::AckResponse;
pub use addresses::AndrAddr;
pub use messages::{AMPCtx, AMPMsg, AMPMsgConfig, AMPPkt, IBCConfig};
pub use recipient::Recipient;
