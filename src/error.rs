#![allow(dead_code)] // Error variants reserved for future adapter typed returns

//! Unified error types for the NexBridge firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level polling loop's error handling uniform. All variants are `Copy`
//! so they can be passed around without allocation.

use core::fmt;

use crate::app::ports::ChannelError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A serial channel operation failed.
    Channel(ChannelError),
    /// A GPS receiver operation failed.
    Gps(GpsError),
    /// Wireless-module provisioning failed.
    Provisioning(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Gps(e) => write!(f, "gps: {e}"),
            Self::Provisioning(msg) => write!(f, "provisioning: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

// ---------------------------------------------------------------------------
// GPS errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsError {
    /// UART read from the receiver failed.
    UartReadFailed,
    /// Power-management frame could not be sent.
    PowerCommandFailed,
}

impl fmt::Display for GpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UartReadFailed => write!(f, "UART read failed"),
            Self::PowerCommandFailed => write!(f, "power command failed"),
        }
    }
}

impl From<GpsError> for Error {
    fn from(e: GpsError) -> Self {
        Self::Gps(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
