//! # Link State Machine
//!
//! Manages the wireless link the upload path depends on: connect,
//! bounded-poll association, lazy loss detection, and derivation of the
//! collector's address from the DHCP-assigned local address.
//!
//! The state machine itself never retries: a failed connect cycle ends in
//! `Disconnected` and the error is returned to the caller. Retry cadence
//! belongs to the scheduler loop, which attempts one connect cycle per
//! upload period while offline.

pub mod nmcli;

pub use nmcli::NetworkManagerWifi;

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::NetworkConfig;
use crate::error::{EcuNodeError, Result};

/// Wireless link states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No association; uploads are gated off
    Disconnected,
    /// Association started, polling for completion
    Connecting,
    /// Associated with an address; uploads may proceed
    Connected,
}

/// Trait for the wireless association boundary
///
/// Credential handling and the mechanics of joining a network live behind
/// this trait; the state machine only triggers association and polls the
/// outcome.
#[async_trait]
pub trait WifiInterface: Send {
    /// Tear down any existing association and start a fresh one
    ///
    /// Must not block waiting for the association to complete; completion
    /// is observed by polling [`is_connected`](Self::is_connected).
    async fn begin_associate(&mut self, ssid: &str, psk: &str) -> Result<()>;

    /// True if the interface is currently associated with an address
    async fn is_connected(&mut self) -> bool;

    /// Assigned local address and netmask, once associated
    async fn ifconfig(&mut self) -> Option<(Ipv4Addr, Ipv4Addr)>;
}

/// Derive the collector's address from the assigned local address
///
/// For every address octet whose netmask octet is zero, substitute the
/// fixed placeholder octet: a "same subnet, host replaced" convention.
///
/// This is a deployment-specific convention, not general networking
/// practice: it assumes the collector always sits at the placeholder host
/// number on octet-aligned subnets, and it is brittle outside the exact
/// topology it was designed for. It is preserved verbatim for
/// compatibility with deployed collectors.
///
/// # Arguments
///
/// * `local` - DHCP-assigned local address
/// * `netmask` - Assigned network mask
/// * `placeholder` - Host octet where the collector lives (e.g. 77)
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use ecu_node::link::derive_collector_addr;
///
/// let addr = derive_collector_addr(
///     Ipv4Addr::new(192, 168, 1, 42),
///     Ipv4Addr::new(255, 255, 255, 0),
///     77,
/// );
/// assert_eq!(addr, Ipv4Addr::new(192, 168, 1, 77));
/// ```
pub fn derive_collector_addr(local: Ipv4Addr, netmask: Ipv4Addr, placeholder: u8) -> Ipv4Addr {
    let ip = local.octets();
    let mask = netmask.octets();

    let mut out = [0u8; 4];
    for (i, (&octet, &mask_octet)) in ip.iter().zip(mask.iter()).enumerate() {
        out[i] = if mask_octet != 0 { octet } else { placeholder };
    }
    Ipv4Addr::from(out)
}

/// Wireless link state machine
///
/// Owns the interface handle and the volatile link session (state plus
/// derived collector address, rebuilt on every reconnect). The upload
/// cycle reads the session; only the state machine mutates it.
pub struct LinkManager {
    wifi: Box<dyn WifiInterface>,
    state: LinkState,
    collector_addr: Option<Ipv4Addr>,
    ssid: String,
    psk: String,
    poll_interval: Duration,
    attempts: u32,
    placeholder_octet: u8,
}

impl LinkManager {
    /// Create the state machine in `Disconnected`
    ///
    /// # Arguments
    ///
    /// * `wifi` - Association boundary implementation
    /// * `config` - Network section of the node configuration
    pub fn new(wifi: Box<dyn WifiInterface>, config: &NetworkConfig) -> Self {
        Self {
            wifi,
            state: LinkState::Disconnected,
            collector_addr: None,
            ssid: config.ssid.clone(),
            psk: config.password.clone(),
            poll_interval: Duration::from_millis(config.connect_poll_ms),
            attempts: config.connect_attempts,
            placeholder_octet: config.placeholder_octet,
        }
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Derived collector address, valid only while `Connected`
    pub fn collector_addr(&self) -> Option<Ipv4Addr> {
        self.collector_addr
    }

    /// Run one bounded connect cycle
    ///
    /// Starts a fresh association, then polls link status every
    /// `connect_poll_ms` for up to `connect_attempts` polls. On success the
    /// collector address is derived from the assigned address and the state
    /// becomes `Connected`; on exhaustion the state returns to
    /// `Disconnected` and the error is handed to the caller; no retry
    /// happens inside this routine.
    ///
    /// # Errors
    ///
    /// Returns `Link` error if association fails to start, the attempt
    /// budget is exhausted, or no address information is available after
    /// association.
    pub async fn connect(&mut self) -> Result<()> {
        self.state = LinkState::Connecting;
        self.collector_addr = None;

        info!("Connecting to \"{}\"...", self.ssid);
        self.wifi.begin_associate(&self.ssid, &self.psk).await?;

        for attempt in 1..=self.attempts {
            tokio::time::sleep(self.poll_interval).await;

            if self.wifi.is_connected().await {
                let Some((local, netmask)) = self.wifi.ifconfig().await else {
                    self.state = LinkState::Disconnected;
                    return Err(EcuNodeError::Link(
                        "associated but no address information available".to_string(),
                    ));
                };

                let collector = derive_collector_addr(local, netmask, self.placeholder_octet);
                self.collector_addr = Some(collector);
                self.state = LinkState::Connected;
                info!(
                    "Link up after {} poll(s): local {} / {} -> collector {}",
                    attempt, local, netmask, collector
                );
                return Ok(());
            }

            debug!("Link not up yet (poll {}/{})", attempt, self.attempts);
        }

        self.state = LinkState::Disconnected;
        warn!(
            "Association with \"{}\" timed out after {} polls",
            self.ssid, self.attempts
        );
        Err(EcuNodeError::Link(format!(
            "association timed out after {} polls",
            self.attempts
        )))
    }

    /// Lazily verify a `Connected` link, downgrading on loss
    ///
    /// Called by the upload cycle before it relies on the link. Returns
    /// true if the link is (still) usable.
    pub async fn check_link(&mut self) -> bool {
        if self.state != LinkState::Connected {
            return false;
        }

        if self.wifi.is_connected().await {
            true
        } else {
            warn!("Link lost, marking disconnected");
            self.state = LinkState::Disconnected;
            self.collector_addr = None;
            false
        }
    }
}

impl std::fmt::Debug for LinkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkManager")
            .field("state", &self.state)
            .field("collector_addr", &self.collector_addr)
            .field("ssid", &self.ssid)
            .finish_non_exhaustive()
    }
}
