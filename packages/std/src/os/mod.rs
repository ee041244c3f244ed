pub mod adodb;
pub mod kernel;

use cosmwasm_schema::cw_serde;

// IBC transfer port
pub const TRANSFER_PORT: &str = "transfer";
pub const IBC_VERSION: &str = "andr-kernel-1";
pub const ICS20_VERSION: &str = "ics20-1";

/// Instantiation message shared by every OS module that only depends on the kernel
#[cw_serde]
pub struct ModuleInstantiateMsg {
    pub kernel_address: String,
    pub owner: Option<String>,
}
