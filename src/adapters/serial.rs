//! UART-backed [`DuplexPort`] adapter.
//!
//! One struct serves every serial role (mount link, wired host link,
//! wireless module data path) — the role is just a port number, a pin
//! pair, and a label for log lines.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: raw ESP-IDF UART driver calls
//!   (install / read / write / buffered-length / delete).
//! - **all other targets**: loopback simulation buffers for host-side
//!   tests.

use log::{debug, info};

use crate::app::ports::{ChannelError, DuplexPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Driver-side RX/TX ring buffer sizes (bytes).
#[cfg(target_os = "espidf")]
const UART_BUF_SIZE: i32 = 512;

/// A byte channel over one hardware UART.
pub struct UartLink {
    label: &'static str,
    port: i32,
    tx_gpio: i32,
    rx_gpio: i32,
    open: bool,

    #[cfg(not(target_os = "espidf"))]
    pub(crate) sim_rx: std::collections::VecDeque<u8>,
    #[cfg(not(target_os = "espidf"))]
    pub(crate) sim_tx: Vec<u8>,
}

impl UartLink {
    pub fn new(label: &'static str, port: i32, tx_gpio: i32, rx_gpio: i32) -> Self {
        Self {
            label,
            port,
            tx_gpio,
            rx_gpio,
            open: false,
            #[cfg(not(target_os = "espidf"))]
            sim_rx: std::collections::VecDeque::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_tx: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Change the baud rate on an open link (AT mode ↔ data mode).
    pub fn set_baud(&mut self, baud: u32) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::NotOpen);
        }
        self.platform_set_baud(baud)
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_open(&mut self, baud: u32) -> Result<(), ChannelError> {
        let config = uart_config_t {
            baud_rate: baud as i32,
            data_bits: uart_word_length_t_UART_DATA_8_BITS,
            parity: uart_parity_t_UART_PARITY_DISABLE,
            stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
            flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
            ..Default::default()
        };
        // SAFETY: single-threaded poll loop; each UART is owned by exactly
        // one UartLink.
        unsafe {
            let ret = uart_param_config(self.port, &config);
            if ret != ESP_OK as i32 {
                return Err(ChannelError::OpenFailed);
            }
            // -1 = leave RTS/CTS unrouted.
            let ret = uart_set_pin(self.port, self.tx_gpio, self.rx_gpio, -1, -1);
            if ret != ESP_OK as i32 {
                return Err(ChannelError::OpenFailed);
            }
            if !uart_is_driver_installed(self.port) {
                let ret = uart_driver_install(
                    self.port,
                    UART_BUF_SIZE,
                    UART_BUF_SIZE,
                    0,
                    core::ptr::null_mut(),
                    0,
                );
                if ret != ESP_OK as i32 {
                    return Err(ChannelError::OpenFailed);
                }
            }
            // Stale bytes from before the (re)open must not leak into the
            // first exchange.
            let _ = uart_flush_input(self.port);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_open(&mut self, _baud: u32) -> Result<(), ChannelError> {
        self.sim_rx.clear();
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_close(&mut self) {
        // SAFETY: see platform_open.
        unsafe {
            if uart_is_driver_installed(self.port) {
                let _ = uart_driver_delete(self.port);
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_close(&mut self) {
        self.sim_rx.clear();
    }

    #[cfg(target_os = "espidf")]
    fn platform_set_baud(&mut self, baud: u32) -> Result<(), ChannelError> {
        // SAFETY: see platform_open.
        let ret = unsafe { uart_set_baudrate(self.port, baud) };
        if ret != ESP_OK as i32 {
            return Err(ChannelError::OpenFailed);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_set_baud(&mut self, _baud: u32) -> Result<(), ChannelError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_available(&self) -> usize {
        let mut len: usize = 0;
        // SAFETY: see platform_open.
        let ret = unsafe { uart_get_buffered_data_len(self.port, &mut len) };
        if ret != ESP_OK as i32 { 0 } else { len }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_available(&self) -> usize {
        self.sim_rx.len()
    }

    #[cfg(target_os = "espidf")]
    fn platform_read_byte(&mut self) -> Option<u8> {
        let mut byte: u8 = 0;
        // Timeout 0 ticks: return immediately with whatever is buffered.
        // SAFETY: see platform_open.
        let n = unsafe {
            uart_read_bytes(self.port, (&raw mut byte).cast(), 1, 0)
        };
        if n == 1 { Some(byte) } else { None }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_read_byte(&mut self) -> Option<u8> {
        self.sim_rx.pop_front()
    }

    #[cfg(target_os = "espidf")]
    fn platform_write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        // SAFETY: see platform_open.
        let n = unsafe {
            uart_write_bytes(self.port, bytes.as_ptr().cast(), bytes.len())
        };
        if n < 0 || n as usize != bytes.len() {
            return Err(ChannelError::WriteFailed);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.sim_tx.extend_from_slice(bytes);
        Ok(())
    }
}

impl DuplexPort for UartLink {
    fn bytes_available(&self) -> usize {
        if !self.open {
            return 0;
        }
        self.platform_available()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if !self.open {
            return None;
        }
        self.platform_read_byte()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::NotOpen);
        }
        self.platform_write(bytes)
    }

    fn open(&mut self, baud: u32) -> Result<(), ChannelError> {
        self.platform_open(baud)?;
        self.open = true;
        info!("[{}] UART{} open at {} baud", self.label, self.port, baud);
        Ok(())
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.platform_close();
        self.open = false;
        debug!("[{}] UART{} closed", self.label, self.port);
    }
}
