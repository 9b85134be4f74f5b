//! Non-blocking protocol bridge state machine.
//!
//! The bridge multiplexes three concerns over the single half-duplex
//! serial line to the mount:
//!
//! 1. connectivity keep-alive (`Kx` → `x#` echo probes),
//! 2. time/location sync commands fed from the clock and GPS collaborators,
//! 3. transparent pass-through of host traffic.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  host port ───▶ │            Bridge            │ ───▶ mount port
//!  (swappable)    │  resolve pending → act →     │      (fixed)
//!                 │  relay (one per tick)        │
//!  ClockSource ──▶│                              │───▶ EventSink
//!  GpsSource  ──▶ └──────────────────────────────┘
//! ```
//!
//! Each [`tick`](Bridge::tick) does exactly one of: resolve the pending
//! exchange, issue a new maintenance command, or relay user bytes — never
//! two of them. The mount channel is a single-consumer resource and
//! protocol maintenance has priority, but maintenance is itself gated on
//! the idle predicate so a user actively slewing the mount never has a
//! sync frame injected mid-stream.
//!
//! All waiting is "not yet, try again next tick": timestamps are `u32`
//! milliseconds from a monotonic clock that is assumed to wrap and is
//! only ever compared with wrapping subtraction.

pub mod codec;
pub mod pending;

use log::{debug, info, warn};

use crate::app::events::BridgeEvent;
use crate::app::ports::{ClockSource, DuplexPort, EventSink, GpsSource};
use crate::config::BridgeConfig;
use pending::{Outcome, PendingRequest};

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Mount link state.
///
/// Not a total order of progress: keep-alive failure from *any* state
/// resets to `NotConnected`, and a successful keep-alive never advances
/// sync state. Sync state is not remembered across a reconnection — it is
/// re-earned through the full `Connected → TimeSynced → LocationSynced`
/// climb every time the link is re-established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NotConnected,
    Connected,
    TimeSynced,
    LocationSynced,
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// The protocol bridge.
///
/// Clock and GPS collaborators are injected at construction; the two
/// serial channels are handed to every [`tick`](Self::tick) call, so the
/// host transport can be swapped for a different concrete type at any
/// moment without disturbing connection state or a pending exchange.
pub struct Bridge<C, G> {
    config: BridgeConfig,
    state: ConnectionState,
    clock: C,
    gps: G,
    /// At most one outstanding exchange with the mount.
    pending: Option<PendingRequest>,
    /// When the last probe (or reconnect attempt) was issued.
    last_probe_ms: Option<u32>,
    /// When the last byte was forwarded toward the mount.
    last_forward_ms: Option<u32>,
}

impl<C: ClockSource, G: GpsSource> Bridge<C, G> {
    pub fn new(config: BridgeConfig, clock: C, gps: G) -> Self {
        Self {
            config,
            state: ConnectionState::NotConnected,
            clock,
            gps,
            pending: None,
            last_probe_ms: None,
            last_forward_ms: None,
        }
    }

    /// Announce the initial state. Call once before the first `tick()`.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        info!("[Mount] bridge starting, state {:?}", self.state);
        sink.emit(&BridgeEvent::Started(self.state));
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether an exchange with the mount is outstanding.
    pub fn exchange_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Split borrow of the owned collaborators, for the outer loop's
    /// device housekeeping (NMEA pumping, RTC discipline, GPS power).
    pub fn devices_mut(&mut self) -> (&mut C, &mut G) {
        (&mut self.clock, &mut self.gps)
    }

    /// True when no exchange is pending and the host→mount path has been
    /// quiet for longer than the idle threshold. Maintenance traffic only
    /// runs while this holds.
    pub fn is_idle(&self, now_ms: u32) -> bool {
        self.pending.is_none()
            && elapsed_over(self.last_forward_ms, now_ms, self.config.idle_threshold_ms)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Advance the bridge by one polling step.
    ///
    /// 1. If an exchange is pending, attempt to resolve it and end the
    ///    tick — the channel may just have been closed or repurposed, so
    ///    neither a new action nor relay runs in the same tick.
    /// 2. Otherwise dispatch on [`ConnectionState`]: reconnect,
    ///    keep-alive, time sync, or location sync.
    /// 3. If nothing was issued, relay pass-through traffic.
    pub fn tick(
        &mut self,
        now_ms: u32,
        mount: &mut impl DuplexPort,
        host: &mut impl DuplexPort,
        sink: &mut impl EventSink,
    ) {
        if self.pending.is_some() {
            self.resolve_pending(now_ms, mount, sink);
            return;
        }

        let acted = match self.state {
            ConnectionState::NotConnected => self.try_reconnect(now_ms, mount, sink),
            ConnectionState::Connected => {
                self.try_keepalive(now_ms, mount, sink)
                    || self.try_time_sync(now_ms, mount, sink)
            }
            ConnectionState::TimeSynced => {
                self.try_keepalive(now_ms, mount, sink)
                    || self.try_location_sync(now_ms, mount, sink)
            }
            ConnectionState::LocationSynced => self.try_keepalive(now_ms, mount, sink),
        };

        if !acted {
            self.relay(now_ms, mount, host);
        }
    }

    // ── Pending-request resolution ────────────────────────────

    fn resolve_pending(
        &mut self,
        now_ms: u32,
        mount: &mut impl DuplexPort,
        sink: &mut impl EventSink,
    ) {
        let outcome = match self.pending.as_mut() {
            Some(req) => req.poll(now_ms, mount),
            None => return,
        };
        let Some(outcome) = outcome else { return };

        // Resolution happens exactly once: the request is destroyed here.
        let Some(req) = self.pending.take() else { return };

        if outcome.is_success() {
            info!("[Mount] {}", req.success_desc);
            sink.emit(&BridgeEvent::ExchangeResolved {
                what: req.success_desc,
                success: true,
            });
            self.transition(req.on_success, sink);
        } else {
            match outcome {
                Outcome::TimedOut => warn!("[Mount] {}: no reply", req.failure_desc),
                _ => warn!(
                    "[Mount] {}: unexpected reply {:?}",
                    req.failure_desc,
                    req.reply_bytes()
                ),
            }
            sink.emit(&BridgeEvent::ExchangeResolved {
                what: req.failure_desc,
                success: false,
            });
            if req.close_on_failure {
                mount.close();
                sink.emit(&BridgeEvent::MountChannelClosed);
            }
            self.transition(req.on_failure, sink);
        }
    }

    fn transition(&mut self, to: ConnectionState, sink: &mut impl EventSink) {
        if self.state != to {
            info!("[Mount] {:?} -> {:?}", self.state, to);
            sink.emit(&BridgeEvent::StateChanged {
                from: self.state,
                to,
            });
            self.state = to;
        }
    }

    // ── State-driven actions ──────────────────────────────────

    /// `NotConnected`: after the cooldown, reopen the channel and probe.
    fn try_reconnect(
        &mut self,
        now_ms: u32,
        mount: &mut impl DuplexPort,
        sink: &mut impl EventSink,
    ) -> bool {
        if !elapsed_over(self.last_probe_ms, now_ms, self.config.reconnect_cooldown_ms) {
            return false;
        }
        self.last_probe_ms = Some(now_ms);

        if let Err(e) = mount.open(self.config.mount_baud) {
            // Not fatal: stay NotConnected and retry after the cooldown.
            warn!("[Mount] open failed: {e}");
            return true;
        }
        self.issue(
            now_ms,
            mount,
            sink,
            codec::KEEPALIVE_PROBE,
            codec::KEEPALIVE_REPLY,
            ConnectionState::Connected,
            ConnectionState::NotConnected,
            true,
            "connection established",
            "mount unreachable",
        );
        true
    }

    /// Established link: re-validate with an echo probe once the
    /// keep-alive interval has elapsed and the line is idle. Failure from
    /// any state fails safe to `NotConnected` and closes the channel.
    fn try_keepalive(
        &mut self,
        now_ms: u32,
        mount: &mut impl DuplexPort,
        sink: &mut impl EventSink,
    ) -> bool {
        if !self.is_idle(now_ms)
            || !elapsed_over(self.last_probe_ms, now_ms, self.config.keepalive_interval_ms)
        {
            return false;
        }
        self.last_probe_ms = Some(now_ms);
        self.issue(
            now_ms,
            mount,
            sink,
            codec::KEEPALIVE_PROBE,
            codec::KEEPALIVE_REPLY,
            self.state,
            ConnectionState::NotConnected,
            true,
            "mount alive",
            "keep-alive lost",
        );
        true
    }

    fn try_time_sync(
        &mut self,
        now_ms: u32,
        mount: &mut impl DuplexPort,
        sink: &mut impl EventSink,
    ) -> bool {
        if !self.is_idle(now_ms) || !self.clock.is_valid() {
            return false;
        }
        let Some(frame) = codec::encode_time(
            self.clock.utc_seconds(),
            self.config.timezone_offset_hours,
            self.config.dst,
        ) else {
            // Timestamp outside the wire range — same as an invalid clock.
            return false;
        };
        debug!("[Mount] syncing time: {frame:02x?}");
        self.issue(
            now_ms,
            mount,
            sink,
            &frame,
            codec::ACK_REPLY,
            ConnectionState::TimeSynced,
            self.state,
            false,
            "time synced",
            "time sync rejected",
        );
        true
    }

    fn try_location_sync(
        &mut self,
        now_ms: u32,
        mount: &mut impl DuplexPort,
        sink: &mut impl EventSink,
    ) -> bool {
        if !self.is_idle(now_ms) || !self.gps.has_fix() {
            return false;
        }
        let frame = codec::encode_location(self.gps.latitude(), self.gps.longitude());
        debug!("[Mount] syncing location: {frame:02x?}");
        self.issue(
            now_ms,
            mount,
            sink,
            &frame,
            codec::ACK_REPLY,
            ConnectionState::LocationSynced,
            self.state,
            false,
            "location synced",
            "location sync rejected",
        );
        true
    }

    /// Write a command and arm the pending exchange for its reply.
    #[allow(clippy::too_many_arguments)]
    fn issue(
        &mut self,
        now_ms: u32,
        mount: &mut impl DuplexPort,
        sink: &mut impl EventSink,
        command: &[u8],
        expected: &'static [u8],
        on_success: ConnectionState,
        on_failure: ConnectionState,
        close_on_failure: bool,
        success_desc: &'static str,
        failure_desc: &'static str,
    ) {
        if let Err(e) = mount.write_bytes(command) {
            // A dead line is handled like a failed exchange, minus the
            // wait: apply the failure target immediately.
            warn!("[Mount] {failure_desc}: write failed ({e})");
            if close_on_failure {
                mount.close();
                sink.emit(&BridgeEvent::MountChannelClosed);
            }
            self.transition(on_failure, sink);
            return;
        }
        self.pending = Some(PendingRequest::new(
            now_ms,
            self.config.reply_deadline_ms,
            expected,
            on_success,
            on_failure,
            close_on_failure,
            success_desc,
            failure_desc,
        ));
    }

    // ── Pass-through relay ────────────────────────────────────

    /// Move host bytes to the mount and mount bytes back to the host.
    /// Forwarding toward the mount stamps the idle marker.
    fn relay(&mut self, now_ms: u32, mount: &mut impl DuplexPort, host: &mut impl DuplexPort) {
        while let Some(byte) = host.read_byte() {
            self.last_forward_ms = Some(now_ms);
            if let Err(e) = mount.write_bytes(&[byte]) {
                debug!("[Bridge] host byte dropped: {e}");
                break;
            }
        }
        while let Some(byte) = mount.read_byte() {
            if let Err(e) = host.write_bytes(&[byte]) {
                debug!("[Bridge] mount byte dropped: {e}");
                break;
            }
        }
    }
}

/// Wraparound-safe "more than `threshold_ms` since `marker`". A marker
/// that never happened compares as "long enough ago".
fn elapsed_over(marker: Option<u32>, now_ms: u32, threshold_ms: u32) -> bool {
    marker.is_none_or(|t| now_ms.wrapping_sub(t) > threshold_ms)
}
