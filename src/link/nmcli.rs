//! # NetworkManager Wireless Interface
//!
//! Production [`WifiInterface`](super::WifiInterface) that drives the
//! platform's NetworkManager through `nmcli`. Association is started
//! fire-and-forget (`--wait 0`) so the state machine keeps ownership of
//! the polling cadence.

use std::net::Ipv4Addr;
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::WifiInterface;
use crate::error::{EcuNodeError, Result};

/// `nmcli`-backed wireless interface handle
#[derive(Debug)]
pub struct NetworkManagerWifi {
    /// Interface name, e.g. "wlan0"
    interface: String,
}

impl NetworkManagerWifi {
    /// Create a handle for the given interface name
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    async fn nmcli(args: &[&str]) -> Result<Output> {
        let output = Command::new("nmcli")
            .args(args)
            .output()
            .await
            .map_err(|e| EcuNodeError::Link(format!("failed to run nmcli: {}", e)))?;
        Ok(output)
    }

    /// Query a single `-g` field of `device show`
    async fn device_field(&self, field: &str) -> Option<String> {
        let output = Self::nmcli(&["-g", field, "device", "show", &self.interface])
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        text.lines().next().map(|line| line.trim().to_string())
    }
}

#[async_trait]
impl WifiInterface for NetworkManagerWifi {
    async fn begin_associate(&mut self, ssid: &str, psk: &str) -> Result<()> {
        // Drop any existing association; a failure here just means there
        // was nothing to drop.
        let down = Self::nmcli(&["device", "disconnect", &self.interface]).await?;
        if !down.status.success() {
            debug!("No existing association to drop on {}", self.interface);
        }

        let up = Self::nmcli(&[
            "--wait",
            "0",
            "device",
            "wifi",
            "connect",
            ssid,
            "password",
            psk,
            "ifname",
            &self.interface,
        ])
        .await?;

        if !up.status.success() {
            let stderr = String::from_utf8_lossy(&up.stderr);
            warn!("nmcli connect request failed: {}", stderr.trim());
            return Err(EcuNodeError::Link(format!(
                "association request rejected: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn is_connected(&mut self) -> bool {
        match self.device_field("GENERAL.STATE").await {
            Some(state) => parse_device_state(&state),
            None => false,
        }
    }

    async fn ifconfig(&mut self) -> Option<(Ipv4Addr, Ipv4Addr)> {
        let cidr = self.device_field("IP4.ADDRESS").await?;
        parse_cidr(&cidr)
    }
}

/// True if a `GENERAL.STATE` value means fully connected
///
/// NetworkManager reports device state as `<code> (<label>)`; code 100 is
/// "connected".
fn parse_device_state(state: &str) -> bool {
    state
        .split_whitespace()
        .next()
        .and_then(|code| code.parse::<u32>().ok())
        .map(|code| code == 100)
        .unwrap_or(false)
}

/// Parse an `IP4.ADDRESS` value (`a.b.c.d/prefix`) into address + netmask
fn parse_cidr(cidr: &str) -> Option<(Ipv4Addr, Ipv4Addr)> {
    let (addr_part, prefix_part) = cidr.split_once('/')?;
    let addr: Ipv4Addr = addr_part.trim().parse().ok()?;
    let prefix: u32 = prefix_part.trim().parse().ok()?;
    if prefix > 32 {
        return None;
    }
    Some((addr, prefix_to_netmask(prefix)))
}

/// Convert a prefix length to a dotted netmask
fn prefix_to_netmask(prefix: u32) -> Ipv4Addr {
    let bits = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    };
    Ipv4Addr::from(bits)
}
