//! Port traits — the hexagonal boundary between the protocol core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Bridge (domain)
//! ```
//!
//! Driven adapters (UARTs, the wireless module, the GPS receiver, the
//! battery-backed clock, event sinks) implement these traits. The
//! [`Bridge`](crate::bridge::Bridge) consumes them via generics, so the
//! protocol core never touches hardware directly — and every collaborator
//! is injected explicitly, never reached through a global.

use crate::app::events::BridgeEvent;
use core::fmt;

// ───────────────────────────────────────────────────────────────
// Duplex serial channel (mount link, host transports)
// ───────────────────────────────────────────────────────────────

/// A non-blocking byte channel.
///
/// Two instances exist at runtime: the fixed channel to the mount, and a
/// swappable channel representing whichever transport currently faces the
/// host. Swapping the host transport must not disturb the bridge — the
/// bridge only ever sees the trait.
///
/// No method may block: `read_byte` returns `None` when nothing is
/// buffered, and waiting is expressed as "try again next tick".
pub trait DuplexPort {
    /// Number of bytes currently buffered for reading.
    fn bytes_available(&self) -> usize;

    /// Pop one buffered byte, or `None` when the channel is empty.
    fn read_byte(&mut self) -> Option<u8>;

    /// Queue `bytes` for transmission.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ChannelError>;

    /// (Re)open the channel at the given baud rate.
    fn open(&mut self, baud: u32) -> Result<(), ChannelError>;

    /// Close the channel. Closing an already-closed channel is a no-op.
    fn close(&mut self);
}

// The host side is selected at runtime (wired vs. wireless), so the main
// loop holds it behind `&mut dyn DuplexPort`.
impl<T: DuplexPort + ?Sized> DuplexPort for &mut T {
    fn bytes_available(&self) -> usize {
        (**self).bytes_available()
    }
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        (**self).write_bytes(bytes)
    }
    fn open(&mut self, baud: u32) -> Result<(), ChannelError> {
        (**self).open(baud)
    }
    fn close(&mut self) {
        (**self).close();
    }
}

// ───────────────────────────────────────────────────────────────
// Battery-backed clock
// ───────────────────────────────────────────────────────────────

/// Read side of the battery-backed clock.
pub trait ClockSource {
    /// Whether the clock currently holds a plausible value.
    fn is_valid(&self) -> bool;

    /// Current UTC time as a Unix timestamp.
    fn utc_seconds(&self) -> i64;
}

// ───────────────────────────────────────────────────────────────
// GPS receiver
// ───────────────────────────────────────────────────────────────

/// Read side of the GPS receiver.
///
/// Position and date/time validity are independent: a receiver often has
/// a decoded date/time long before it converges on a position fix.
pub trait GpsSource {
    /// Whether the receiver holds a valid position fix.
    fn has_fix(&self) -> bool;

    /// Latitude in decimal degrees, positive north.
    fn latitude(&self) -> f64;

    /// Longitude in decimal degrees, positive east.
    fn longitude(&self) -> f64;

    /// Whether the receiver holds a plausible UTC date and time.
    fn has_datetime(&self) -> bool;

    /// Decoded UTC date/time as a Unix timestamp, when available.
    fn datetime_utc_seconds(&self) -> Option<i64>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The bridge emits structured [`BridgeEvent`]s through this port.
/// Adapters decide where they go (serial log, host notification, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &BridgeEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`DuplexPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The underlying device could not be opened.
    OpenFailed,
    /// A read from the device failed (not "no data" — a hard fault).
    ReadFailed,
    /// A write to the device failed or was truncated.
    WriteFailed,
    /// Operation on a channel that is not open.
    NotOpen,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed => write!(f, "open failed"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::NotOpen => write!(f, "channel not open"),
        }
    }
}

impl core::error::Error for ChannelError {}
