use std::fmt::{Display, Formatter, Result as FMTResult};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::IBC_PROTOCOL;

/// An address that can be used within the Andromeda ecosystem.
///
/// This address can be one of two things:
/// 1. A valid human readable address e.g. `osmo1...`
/// 2. A VFS style path e.g. `/osmo1...` or `/home/user/app/component`
///
/// Paths may carry a protocol for cross chain communication, structured as so:
///
/// `<protocol>://<chain>/<path>` e.g. `ibc://osmo-b/osmo1...`
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
pub struct AndrAddr(String);

impl AndrAddr {
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }

    #[inline]
    pub fn from_string(addr: impl Into<String>) -> AndrAddr {
        AndrAddr(addr.into())
    }

    /// Builds a cross chain address of the form `ibc://<chain>/<path>`
    pub fn cross_chain(chain: &str, path: &str) -> AndrAddr {
        AndrAddr(format!(
            "{IBC_PROTOCOL}://{chain}/{}",
            path.trim_start_matches('/')
        ))
    }

    /// Whether the provided address is local to the app
    pub fn is_local_path(&self) -> bool {
        self.0.starts_with("./")
    }

    /// Whether the provided address is a VFS path
    pub fn is_vfs_path(&self) -> bool {
        self.is_local_path()
            || self.0.starts_with('/')
            || self.0.split("://").count() > 1
            || self.0.split('/').count() > 1
    }

    /// Whether the address designates a recipient on another chain
    pub fn is_cross_chain(&self) -> bool {
        self.get_protocol() == Some(IBC_PROTOCOL)
    }

    /// Gets the protocol for a given AndrAddr if it exists
    pub fn get_protocol(&self) -> Option<&str> {
        if !self.is_vfs_path() {
            return None;
        }
        self.0.split_once("://").map(|(protocol, _)| protocol)
    }

    /// Gets the chain for a given AndrAddr if it exists
    pub fn get_chain(&self) -> Option<&str> {
        self.get_protocol()?;
        let (_, rest) = self.0.split_once("://")?;
        Some(rest.split_once('/').map_or(rest, |(chain, _)| chain))
    }

    /// Gets the raw path for a given AndrAddr by stripping away any protocols or chain declarations.
    ///
    /// E.g. `ibc://cosmoshub-4/user/app/component` would return `/user/app/component`
    ///
    /// Returns the human readable address if the address is not a VFS path.
    pub fn get_raw_path(&self) -> &str {
        if self.get_protocol().is_none() {
            return self.0.as_str();
        }
        match self.0.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("", |idx| &rest[idx..]),
            None => self.0.as_str(),
        }
    }

    /// Strips the protocol, chain and leading slash, leaving the final address or path segment
    pub fn get_raw_address(&self) -> &str {
        self.get_raw_path().trim_start_matches('/')
    }
}

impl Display for AndrAddr {
    fn fmt(&self, f: &mut Formatter) -> FMTResult {
        write!(f, "{}", &self.0)
    }
}

impl AsRef<str> for AndrAddr {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<&str> for AndrAddr {
    fn eq(&self, rhs: &&str) -> bool {
        self.0 == *rhs
    }
}

impl PartialEq<String> for AndrAddr {
    fn eq(&self, rhs: &String) -> bool {
        &self.0 == rhs
    }
}

impl From<AndrAddr> for String {
    fn from(addr: AndrAddr) -> Self {
        addr.0
    }
}

impl From<&str> for AndrAddr {
    fn from(addr: &str) -> Self {
        AndrAddr::from_string(addr)
    }
}

impl From<String> for AndrAddr {
    fn from(addr: String) -> Self {
        AndrAddr(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_is_vfs() {
        let addr = AndrAddr("/home/user/app/component".to_string());
        assert!(addr.is_vfs_path());

        let addr = AndrAddr("ibc://home/user/app/component".to_string());
        assert!(addr.is_vfs_path());

        let addr = AndrAddr("osmo1...".to_string());
        assert!(!addr.is_vfs_path());
    }

    #[test]
    fn test_is_local_path() {
        let addr = AndrAddr("./component".to_string());
        assert!(addr.is_local_path());
        assert!(addr.is_vfs_path());
    }

    #[rstest]
    #[case("osmo1...", None, None, "osmo1...")]
    #[case("/osmo1abc", None, None, "/osmo1abc")]
    #[case(
        "ibc://chain/user/app/component",
        Some("ibc"),
        Some("chain"),
        "/user/app/component"
    )]
    #[case("ibc://osmo-b/osmo1abc", Some("ibc"), Some("osmo-b"), "/osmo1abc")]
    #[case("ibc://osmo-b", Some("ibc"), Some("osmo-b"), "")]
    fn test_address_parts(
        #[case] raw: &str,
        #[case] protocol: Option<&str>,
        #[case] chain: Option<&str>,
        #[case] path: &str,
    ) {
        let addr = AndrAddr::from_string(raw);
        assert_eq!(addr.get_protocol(), protocol);
        assert_eq!(addr.get_chain(), chain);
        assert_eq!(addr.get_raw_path(), path);
    }

    #[test]
    fn test_cross_chain() {
        let addr = AndrAddr::cross_chain("osmo-b", "/osmo1abc");
        assert_eq!(addr, "ibc://osmo-b/osmo1abc");
        assert!(addr.is_cross_chain());
        assert_eq!(addr.get_raw_address(), "osmo1abc");

        let local = AndrAddr::from_string("/osmo1abc");
        assert!(!local.is_cross_chain());
        assert_eq!(local.get_raw_address(), "osmo1abc");
    }
}
