//! Wireless serial-module adapter (HC-05-style Bluetooth SPP bridge).
//!
//! The module rides on its own UART plus two GPIOs: a power rail switch
//! and an AT-mode strap. Provisioning (pairing name and PIN) is a
//! one-time boot sequence in AT command mode at 38 400 baud; afterwards
//! the module runs in transparent data mode at 9600 baud and behaves as
//! a plain [`DuplexPort`] host transport.
//!
//! Provisioning happens before the bridge loop starts and is the only
//! place in the firmware allowed to sleep.

use log::{debug, info, warn};

use crate::app::ports::{ChannelError, DuplexPort};
use crate::error::Error;
use crate::pins;

use super::serial::UartLink;

/// How long to wait for a reply to one AT command.
const AT_REPLY_TIMEOUT_MS: u32 = 1000;
/// Module power-rail settle time before the UART is usable.
const POWER_SETTLE_MS: u32 = 200;

pub struct WirelessLink {
    link: UartLink,
    powered: bool,

    #[cfg(not(target_os = "espidf"))]
    pub(crate) sim_at_log: Vec<String>,
}

impl WirelessLink {
    pub fn new(link: UartLink) -> Self {
        Self {
            link,
            powered: false,
            #[cfg(not(target_os = "espidf"))]
            sim_at_log: Vec::new(),
        }
    }

    /// One-time pairing setup: name and PIN, then reset into data mode.
    ///
    /// Failures are logged and returned but are not fatal — a module that
    /// was provisioned on a previous boot keeps its stored settings.
    pub fn provision(&mut self, name: &str, pin: &str) -> crate::Result<()> {
        info!("[BT] provisioning module as '{name}'");
        self.set_at_mode(true);
        self.power_on(pins::WIRELESS_AT_BAUD)?;

        self.send_at_command("AT")?;
        let mut cmd = heapless::String::<64>::new();
        core::fmt::Write::write_fmt(&mut cmd, format_args!("AT+NAME=\"{name}\""))
            .map_err(|_| Error::Provisioning("name too long"))?;
        self.send_at_command(&cmd)?;
        cmd.clear();
        core::fmt::Write::write_fmt(&mut cmd, format_args!("AT+PSWD=\"{pin}\""))
            .map_err(|_| Error::Provisioning("pin too long"))?;
        self.send_at_command(&cmd)?;

        self.set_at_mode(false);
        self.send_at_command("AT+RESET")?;
        self.power_off();
        info!("[BT] provisioning complete");
        Ok(())
    }

    /// Switch the module on in data mode. Idempotent.
    pub fn power_on(&mut self, baud: u32) -> crate::Result<()> {
        if self.powered {
            return Ok(());
        }
        self.set_power(true);
        sleep_ms(POWER_SETTLE_MS);
        self.link.open(baud)?;
        self.powered = true;
        Ok(())
    }

    pub fn power_off(&mut self) {
        if !self.powered {
            return;
        }
        self.link.close();
        self.set_power(false);
        self.powered = false;
    }

    // ── AT command exchange (boot-time only) ──────────────────

    fn send_at_command(&mut self, command: &str) -> crate::Result<()> {
        debug!("[BT] >>> {command}");
        #[cfg(not(target_os = "espidf"))]
        self.sim_at_log.push(command.to_string());

        self.link.write_bytes(command.as_bytes())?;
        self.link.write_bytes(b"\r\n")?;

        let mut waited: u32 = 0;
        while self.link.bytes_available() == 0 && waited < AT_REPLY_TIMEOUT_MS {
            sleep_ms(10);
            waited += 10;
        }
        let mut reply = heapless::Vec::<u8, 64>::new();
        while let Some(byte) = self.link.read_byte() {
            let _ = reply.push(byte);
        }
        if reply.is_empty() {
            warn!("[BT] no reply to '{command}'");
        } else {
            debug!("[BT] <<< {:?}", core::str::from_utf8(&reply).unwrap_or("<binary>"));
        }
        Ok(())
    }

    // ── GPIO control ──────────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn set_power(&mut self, on: bool) {
        use esp_idf_svc::sys::*;
        // SAFETY: output-only pin, driven solely from the main thread.
        unsafe {
            let _ = gpio_set_direction(pins::WIRELESS_POWER_GPIO, gpio_mode_t_GPIO_MODE_OUTPUT);
            let _ = gpio_set_level(pins::WIRELESS_POWER_GPIO, u32::from(on));
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_power(&mut self, on: bool) {
        debug!("[BT](sim) power {}", if on { "on" } else { "off" });
    }

    #[cfg(target_os = "espidf")]
    fn set_at_mode(&mut self, on: bool) {
        use esp_idf_svc::sys::*;
        // SAFETY: output-only pin, driven solely from the main thread.
        unsafe {
            let _ = gpio_set_direction(pins::WIRELESS_AT_MODE_GPIO, gpio_mode_t_GPIO_MODE_OUTPUT);
            let _ = gpio_set_level(pins::WIRELESS_AT_MODE_GPIO, u32::from(on));
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_at_mode(&mut self, on: bool) {
        debug!("[BT](sim) AT mode {}", if on { "on" } else { "off" });
    }
}

/// Boot-time-only sleep; the steady-state bridge never calls this.
fn sleep_ms(ms: u32) {
    #[cfg(target_os = "espidf")]
    std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    #[cfg(not(target_os = "espidf"))]
    let _ = ms; // host tests run the sequence without real delays
}

impl DuplexPort for WirelessLink {
    fn bytes_available(&self) -> usize {
        self.link.bytes_available()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.link.read_byte()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.link.write_bytes(bytes)
    }

    fn open(&mut self, baud: u32) -> Result<(), ChannelError> {
        self.link.open(baud)
    }

    fn close(&mut self) {
        self.link.close();
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    fn make_link() -> WirelessLink {
        WirelessLink::new(UartLink::new(
            "bt",
            pins::WIRELESS_UART_NUM,
            pins::WIRELESS_UART_TX_GPIO,
            pins::WIRELESS_UART_RX_GPIO,
        ))
    }

    #[test]
    fn provisioning_sends_full_at_sequence() {
        let mut bt = make_link();
        bt.provision("NexBridge-GPS", "1234").unwrap();
        assert_eq!(
            bt.sim_at_log,
            vec![
                "AT",
                "AT+NAME=\"NexBridge-GPS\"",
                "AT+PSWD=\"1234\"",
                "AT+RESET",
            ]
        );
        assert!(!bt.powered, "module is left powered off after provisioning");
    }

    #[test]
    fn power_on_is_idempotent() {
        let mut bt = make_link();
        bt.power_on(9600).unwrap();
        bt.power_on(9600).unwrap();
        assert!(bt.powered);
        bt.power_off();
        assert!(!bt.powered);
    }
}
