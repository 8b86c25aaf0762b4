//! Host identity attached to every point as the `pi_name` tag.
//!
//! A Pi's hostname is usually the stock `raspberrypi`, so the identity is
//! derived from the hardware address of a network interface instead:
//! `b8:27:eb:12:34:56` on `eth0` becomes `pi-b827eb123456`.

use std::fmt;
use std::path::PathBuf;

use crate::collector::{CollectError, FileSystem};

/// Tag key carrying the host identity.
pub const PI_NAME_TAG: &str = "pi_name";

/// Stable name of this host, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity(String);

impl HostIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Builds `pi-<mac>` from a colon-separated MAC address.
    ///
    /// Returns `None` unless `mac` is six hex octets.
    pub fn from_mac(mac: &str) -> Option<Self> {
        let octets: Vec<&str> = mac.trim().split(':').collect();
        if octets.len() != 6
            || octets
                .iter()
                .any(|o| o.len() != 2 || !o.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return None;
        }
        Some(Self(format!("pi-{}", octets.concat().to_ascii_lowercase())))
    }

    /// Reads `<sys_path>/class/net/<interface>/address` and derives the name.
    pub fn from_interface<F: FileSystem>(
        fs: &F,
        sys_path: &str,
        interface: &str,
    ) -> Result<Self, CollectError> {
        let path = PathBuf::from(format!("{}/class/net/{}/address", sys_path, interface));
        let content = fs
            .read_to_string(&path)
            .map_err(|e| CollectError::io(&path, e))?;
        Self::from_mac(&content).ok_or_else(|| {
            CollectError::parse(&path, format!("invalid hardware address {:?}", content.trim()))
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    #[test]
    fn from_mac_strips_colons() {
        let id = HostIdentity::from_mac("B8:27:EB:12:34:56\n").unwrap();
        assert_eq!(id.as_str(), "pi-b827eb123456");
    }

    #[test]
    fn from_mac_rejects_garbage() {
        assert!(HostIdentity::from_mac("").is_none());
        assert!(HostIdentity::from_mac("b8:27:eb:12:34").is_none());
        assert!(HostIdentity::from_mac("b8:27:eb:12:34:zz").is_none());
        assert!(HostIdentity::from_mac("b827eb123456").is_none());
    }

    #[test]
    fn from_interface_reads_sysfs() {
        let fs = MockFs::raspberry_pi();
        let eth = HostIdentity::from_interface(&fs, "/sys", "eth0").unwrap();
        let wlan = HostIdentity::from_interface(&fs, "/sys", "wlan0").unwrap();

        assert_eq!(eth.to_string(), "pi-b827eb123456");
        assert_eq!(wlan.to_string(), "pi-b827ebabcdef");
    }

    #[test]
    fn from_interface_missing() {
        let fs = MockFs::raspberry_pi();
        let err = HostIdentity::from_interface(&fs, "/sys", "usb0").unwrap_err();
        assert!(matches!(err, CollectError::Io { .. }));
    }
}
