//! Bridge configuration parameters
//!
//! All tunable parameters for the NexBridge firmware. Injected into the
//! bridge at construction — nothing here is read from persistent storage.

use serde::{Deserialize, Serialize};

/// Which physical channel faces the host controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostTransport {
    /// USB-serial bridge on UART0.
    Wired,
    /// HC-05-style serial module on its own UART.
    Wireless,
}

/// Core bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    // --- Mount link ---
    /// Baud rate of the mount's hand-control port
    pub mount_baud: u32,
    /// Cooldown between reconnection attempts while NotConnected (milliseconds)
    pub reconnect_cooldown_ms: u32,
    /// Interval between keep-alive probes on an established link (milliseconds)
    pub keepalive_interval_ms: u32,
    /// Quiet time on the host→mount path before maintenance traffic may run (milliseconds)
    pub idle_threshold_ms: u32,
    /// Deadline for a mount reply before the exchange is failed (milliseconds)
    pub reply_deadline_ms: u32,

    // --- Time sync ---
    /// Timezone offset sent to the mount (whole hours, signed)
    pub timezone_offset_hours: i8,
    /// Daylight-saving flag sent to the mount
    pub dst: bool,

    // --- Host side ---
    /// Which transport faces the host controller
    pub host_transport: HostTransport,

    // --- Timing ---
    /// Polling loop interval (milliseconds)
    pub poll_interval_ms: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // Mount link
            mount_baud: 9600,
            reconnect_cooldown_ms: 2500,
            keepalive_interval_ms: 30_000,
            idle_threshold_ms: 30_000,
            reply_deadline_ms: 2000,

            // Time sync — the mount wants local time; UTC plus no offset
            // is what the hand controller displays by default.
            timezone_offset_hours: 0,
            dst: false,

            // Host side
            host_transport: HostTransport::Wireless,

            // Timing
            poll_interval_ms: 10,
        }
    }
}
