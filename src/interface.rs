//! Tunnel interface address lookup
//!
//! Reads the addresses assigned to the VPN interface using the ip command.

use crate::error::{VpnError, VpnResult};
use crate::validation;
use async_trait::async_trait;
use std::net::IpAddr;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Enumerates the addresses of a network interface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Addresses currently assigned to `interface`
    ///
    /// An interface that does not exist yields an empty list. Failure to
    /// enumerate at all is reported as [`VpnError::TransientLookup`].
    async fn addresses(&self, interface: &str) -> VpnResult<Vec<IpAddr>>;
}

/// Interface controller
pub struct InterfaceController {}

impl InterfaceController {
    pub fn new() -> Self {
        Self {}
    }

    /// Check if an interface exists
    pub fn exists(&self, interface: &str) -> bool {
        Path::new(&format!("/sys/class/net/{}", interface)).exists()
    }

    async fn get_addresses(&self, interface: &str) -> VpnResult<Vec<IpAddr>> {
        validation::validate_interface_name(interface)?;

        if !self.exists(interface) {
            debug!("Interface {} not present", interface);
            return Ok(Vec::new());
        }

        let output = Command::new("ip")
            .args(["-json", "addr", "show", interface])
            .output()
            .await
            .map_err(|e| VpnError::TransientLookup(format!("ip -json addr show {}: {}", interface, e)))?;

        if !output.status.success() {
            return Err(VpnError::TransientLookup(format!(
                "ip -json addr show {} failed: {}",
                interface,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| VpnError::TransientLookup(format!("invalid ip output: {}", e)))?;

        Ok(parse_addr_json(&json))
    }
}

impl Default for InterfaceController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AddressLookup for InterfaceController {
    async fn addresses(&self, interface: &str) -> VpnResult<Vec<IpAddr>> {
        self.get_addresses(interface).await
    }
}

/// Extract addresses from `ip -json addr show` output
fn parse_addr_json(json: &serde_json::Value) -> Vec<IpAddr> {
    let mut addresses = Vec::new();

    if let Some(iface) = json.as_array().and_then(|arr| arr.first()) {
        if let Some(addr_info) = iface.get("addr_info").and_then(|v| v.as_array()) {
            for addr in addr_info {
                if let Some(local) = addr.get("local").and_then(|v| v.as_str()) {
                    // Link-local IPv6 may carry a zone suffix
                    let local = local.split('%').next().unwrap_or(local);
                    match local.parse::<IpAddr>() {
                        Ok(ip) => addresses.push(ip),
                        Err(_) => debug!("Skipping unparsable address {}", local),
                    }
                }
            }
        }
    }

    addresses
}
