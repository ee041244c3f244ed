pub mod denom;

pub use denom::{get_ibc_denom, ibc_denom_from_trace, DenomTrace};
