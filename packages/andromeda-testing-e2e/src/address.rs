use bech32::{ToBase32, Variant};
use cosmwasm_std::Addr;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::TestingError;

fn encode(prefix: &str, bytes: &[u8]) -> Result<Addr, TestingError> {
    bech32::encode(prefix, bytes.to_base32(), Variant::Bech32)
        .map(Addr::unchecked)
        .map_err(|err| TestingError::assertion(format!("bech32 encoding failed: {err}")))
}

/// A fresh account address that has never been seen on chain
pub fn random_address(prefix: &str) -> Result<Addr, TestingError> {
    let bytes: [u8; 20] = rand::thread_rng().gen();
    encode(prefix, &bytes)
}

/// A deterministic 32 byte address derived from `seed`, the format CosmWasm uses for contracts
pub fn derived_address(prefix: &str, seed: &str) -> Result<Addr, TestingError> {
    let hash = Sha256::digest(seed.as_bytes());
    encode(prefix, &hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_address() {
        let a = random_address("osmo").unwrap();
        let b = random_address("osmo").unwrap();
        assert!(a.as_str().starts_with("osmo1"));
        // 20 bytes of data plus the checksum
        assert_eq!(a.as_str().len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_derived_address() {
        let a = derived_address("osmo", "localosmosis-1/1").unwrap();
        assert_eq!(a, derived_address("osmo", "localosmosis-1/1").unwrap());
        assert_ne!(a, derived_address("osmo", "localosmosis-2/1").unwrap());
        assert_eq!(a.as_str().len(), 63);
    }
}
