//! NexBridge Firmware — Main Entry Point
//!
//! Hexagonal architecture around a single cooperative polling loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UartLink(mount)   UartLink(host)   WirelessLink   LogEventSink│
//! │  (DuplexPort)      (DuplexPort)     (DuplexPort)   (EventSink) │
//! │  GpsReceiver       SystemRtc        Uptime                     │
//! │  (GpsSource)       (ClockSource)    (monotonic ms)             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │               Bridge (pure logic)                      │    │
//! │  │  keep-alive · time/location sync · pass-through        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop body never blocks on I/O: it sleeps one poll interval,
//! pumps the GPS, disciplines the RTC, and ticks the bridge.
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use nexbridge::adapters::gps::GpsReceiver;
use nexbridge::adapters::log_sink::LogEventSink;
use nexbridge::adapters::rtc::{SystemRtc, Uptime};
use nexbridge::adapters::serial::UartLink;
use nexbridge::adapters::wireless::WirelessLink;
use nexbridge::app::ports::DuplexPort;
use nexbridge::bridge::{Bridge, ConnectionState};
use nexbridge::config::{BridgeConfig, HostTransport};
use nexbridge::pins;

/// Pairing name the wireless module advertises.
const DEVICE_NAME: &str = "NexBridge-GPS";
/// Pairing PIN. The mount side carries no secrets; this only gates the
/// serial bridge itself.
const DEVICE_PIN: &str = "1234";

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  NexBridge v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = BridgeConfig::default();

    // ── 2. Construct adapters ─────────────────────────────────
    let mut mount = UartLink::new(
        "mount",
        pins::MOUNT_UART_NUM,
        pins::MOUNT_UART_TX_GPIO,
        pins::MOUNT_UART_RX_GPIO,
    );

    let mut gps = GpsReceiver::new(UartLink::new(
        "gps",
        pins::GPS_UART_NUM,
        pins::GPS_UART_TX_GPIO,
        pins::GPS_UART_RX_GPIO,
    ));
    gps.begin()?;

    let rtc = SystemRtc::new();

    // ── 3. Host transport selection ───────────────────────────
    // Both transports exist; wiring decides which one faces the host.
    // The bridge only ever sees the DuplexPort trait, so swapping here
    // (or at runtime) cannot disturb protocol state.
    let mut wired = UartLink::new(
        "host",
        pins::HOST_UART_NUM,
        pins::HOST_UART_TX_GPIO,
        pins::HOST_UART_RX_GPIO,
    );
    let mut wireless = WirelessLink::new(UartLink::new(
        "bt",
        pins::WIRELESS_UART_NUM,
        pins::WIRELESS_UART_TX_GPIO,
        pins::WIRELESS_UART_RX_GPIO,
    ));

    let mut host: &mut dyn DuplexPort = match config.host_transport {
        HostTransport::Wired => {
            wired.open(pins::HOST_BAUD)?;
            &mut wired
        }
        HostTransport::Wireless => {
            // One-time pairing setup; a module provisioned on an earlier
            // boot keeps its settings, so failure here is not fatal.
            if let Err(e) = wireless.provision(DEVICE_NAME, DEVICE_PIN) {
                warn!("wireless provisioning failed: {e}");
            }
            wireless.power_on(pins::WIRELESS_DATA_BAUD)?;
            &mut wireless
        }
    };

    // ── 4. Construct the bridge ───────────────────────────────
    let mut sink = LogEventSink::new();
    let uptime = Uptime::new();
    let mut bridge = Bridge::new(config.clone(), rtc, gps);
    bridge.start(&mut sink);

    info!("System ready. Entering poll loop.");

    // ── 5. Poll loop ──────────────────────────────────────────
    let mut prev_state = bridge.state();

    loop {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(
            config.poll_interval_ms,
        )));
        let now_ms = uptime.millis();

        // Device housekeeping outside the bridge tick: pump NMEA bytes
        // and adopt GPS time while the backup clock is implausible.
        {
            let (rtc, gps) = bridge.devices_mut();
            gps.poll();
            let _ = rtc.discipline_from(gps);
        }

        bridge.tick(now_ms, &mut mount, &mut host, &mut sink);

        // GPS power management follows the sync state: once the location
        // is in the mount the receiver has nothing left to contribute.
        let state = bridge.state();
        if state != prev_state {
            let (_, gps) = bridge.devices_mut();
            match state {
                ConnectionState::LocationSynced => gps.sleep(),
                ConnectionState::NotConnected => gps.resume(),
                _ => {}
            }
            prev_state = state;
        }
    }
}
