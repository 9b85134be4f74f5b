//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured bridge events to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production). A future
//! host-notification adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::BridgeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`BridgeEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &BridgeEvent) {
        match event {
            BridgeEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            BridgeEvent::ExchangeResolved { what, success } => {
                if *success {
                    info!("MOUNT | {}", what);
                } else {
                    warn!("MOUNT | {}", what);
                }
            }
            BridgeEvent::MountChannelClosed => {
                info!("MOUNT | channel closed, awaiting reconnect");
            }
            BridgeEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
        }
    }
}
