//! Application core boundary — ports and events, zero I/O.
//!
//! All interaction between the protocol core and hardware happens through
//! the **port traits** defined in [`ports`], keeping the bridge fully
//! testable without real peripherals.

pub mod events;
pub mod ports;
