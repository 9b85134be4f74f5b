//! Outbound bridge events.
//!
//! The [`Bridge`](crate::bridge::Bridge) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them — log to serial, forward to the host, etc.

use crate::bridge::ConnectionState;

/// Structured events emitted by the protocol core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The connection state machine moved.
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// A request/response exchange with the mount resolved.
    ExchangeResolved {
        /// Diagnostic description configured on the request.
        what: &'static str,
        success: bool,
    },

    /// The mount channel was closed after a failed exchange.
    MountChannelClosed,

    /// The bridge started (carries initial state).
    Started(ConnectionState),
}
