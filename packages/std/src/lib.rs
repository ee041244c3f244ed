pub mod amp;
pub mod common;
pub mod error;
pub mod finance;
pub mod os;
