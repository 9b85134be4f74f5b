//! Property tests for the wire codec and the bridge state machine.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32
//! targets. On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use proptest::prelude::*;

use nexbridge::app::events::BridgeEvent;
use nexbridge::app::ports::{ChannelError, ClockSource, DuplexPort, EventSink, GpsSource};
use nexbridge::bridge::codec::{encode_location, encode_time, SIGN_NEGATIVE, SIGN_POSITIVE};
use nexbridge::bridge::{Bridge, ConnectionState};
use nexbridge::config::BridgeConfig;

// ── Wire codec purity ─────────────────────────────────────────

proptest! {
    /// Identical inputs always produce identical frames, and every field
    /// stays inside its calendar range.
    #[test]
    fn encode_time_is_pure_and_in_range(
        // 2000-01-01T00:00:00Z ..= 2255-12-31 (one-byte year range)
        ts in 946_684_800i64..9_000_000_000,
        tz in -12i8..=14,
        dst: bool,
    ) {
        let a = encode_time(ts, tz, dst);
        let b = encode_time(ts, tz, dst);
        prop_assert_eq!(a, b, "codec must be deterministic");

        let frame = a.expect("timestamp inside the encodable range");
        prop_assert_eq!(frame[0], b'H');
        prop_assert!(frame[1] < 24, "hour");
        prop_assert!(frame[2] < 60, "minute");
        prop_assert!(frame[3] < 60, "second");
        prop_assert!((1..=12).contains(&frame[4]), "month");
        prop_assert!((1..=31).contains(&frame[5]), "day");
        prop_assert_eq!(frame[7] as i8, tz, "timezone survives the 256's-complement");
        prop_assert_eq!(frame[8], u8::from(dst));
    }

    /// The location frame is deterministic, truncated, and sign-correct.
    #[test]
    fn encode_location_is_pure_and_in_range(
        lat in -90.0f64..=90.0,
        lng in -180.0f64..=180.0,
    ) {
        let a = encode_location(lat, lng);
        prop_assert_eq!(a, encode_location(lat, lng));

        prop_assert_eq!(a[0], b'W');
        for (value, group) in [(lat, &a[1..5]), (lng, &a[5..9])] {
            prop_assert!(f64::from(group[0]) <= value.abs() + 1.0, "degrees truncated");
            prop_assert!(group[1] < 60, "minutes");
            prop_assert!(group[2] < 60, "seconds");
            let expected_sign = if value < 0.0 { SIGN_NEGATIVE } else { SIGN_POSITIVE };
            prop_assert_eq!(group[3], expected_sign);
        }
    }
}

// ── Bridge state machine ──────────────────────────────────────

#[derive(Default)]
struct ScriptPort {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    closes: u32,
}

impl DuplexPort for ScriptPort {
    fn bytes_available(&self) -> usize {
        self.rx.len()
    }
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.tx.extend_from_slice(bytes);
        Ok(())
    }
    fn open(&mut self, _baud: u32) -> Result<(), ChannelError> {
        Ok(())
    }
    fn close(&mut self) {
        self.closes += 1;
    }
}

struct FlagClock(Rc<Cell<bool>>);

impl ClockSource for FlagClock {
    fn is_valid(&self) -> bool {
        self.0.get()
    }
    fn utc_seconds(&self) -> i64 {
        1_691_582_400
    }
}

struct FlagGps(Rc<Cell<bool>>);

impl GpsSource for FlagGps {
    fn has_fix(&self) -> bool {
        self.0.get()
    }
    fn latitude(&self) -> f64 {
        45.5
    }
    fn longitude(&self) -> f64 {
        -122.25
    }
    fn has_datetime(&self) -> bool {
        false
    }
    fn datetime_utc_seconds(&self) -> Option<i64> {
        None
    }
}

struct CountingSink {
    resolved: u32,
    states: Vec<ConnectionState>,
}

impl EventSink for CountingSink {
    fn emit(&mut self, event: &BridgeEvent) {
        match event {
            BridgeEvent::ExchangeResolved { .. } => self.resolved += 1,
            BridgeEvent::StateChanged { to, .. } => self.states.push(*to),
            _ => {}
        }
    }
}

/// One scripted step: let some time pass, maybe feed mount bytes, maybe
/// feed host bytes, maybe flip collaborator validity.
#[derive(Debug, Clone)]
struct Step {
    advance_ms: u32,
    mount_bytes: Vec<u8>,
    host_bytes: Vec<u8>,
    clock_valid: bool,
    gps_fix: bool,
}

fn arb_step() -> impl Strategy<Value = Step> {
    (
        0u32..5_000,
        proptest::collection::vec(any::<u8>(), 0..8),
        proptest::collection::vec(any::<u8>(), 0..4),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(advance_ms, mount_bytes, host_bytes, clock_valid, gps_fix)| Step {
            advance_ms,
            mount_bytes,
            host_bytes,
            clock_valid,
            gps_fix,
        })
}

proptest! {
    /// Under arbitrary byte garbage, time jumps, and collaborator flaps:
    /// the bridge never tracks more than one exchange, every exchange
    /// resolves at most once, and failures that close the channel always
    /// land in NotConnected.
    #[test]
    fn bridge_survives_arbitrary_schedules(steps in proptest::collection::vec(arb_step(), 1..60)) {
        let clock_flag = Rc::new(Cell::new(false));
        let gps_flag = Rc::new(Cell::new(false));
        let mut bridge = Bridge::new(
            BridgeConfig::default(),
            FlagClock(clock_flag.clone()),
            FlagGps(gps_flag.clone()),
        );
        let mut mount = ScriptPort::default();
        let mut host = ScriptPort::default();
        let mut sink = CountingSink { resolved: 0, states: Vec::new() };

        let mut now: u32 = 0;
        let mut pending_seen: u32 = 0;

        for step in steps {
            now = now.wrapping_add(step.advance_ms);
            clock_flag.set(step.clock_valid);
            gps_flag.set(step.gps_fix);
            mount.rx.extend(&step.mount_bytes);
            host.rx.extend(&step.host_bytes);

            let was_pending = bridge.exchange_pending();
            bridge.tick(now, &mut mount, &mut host, &mut sink);
            if !was_pending && bridge.exchange_pending() {
                pending_seen += 1;
            }

            // At most one exchange can be in flight; each issued exchange
            // resolves at most once.
            prop_assert!(sink.resolved <= pending_seen);
            prop_assert!(pending_seen <= sink.resolved + 1);
        }

        // Every transition into NotConnected was a failure that closed
        // the mount channel.
        let disconnects = sink
            .states
            .iter()
            .filter(|s| **s == ConnectionState::NotConnected)
            .count() as u32;
        prop_assert!(mount.closes >= disconnects);
    }

    /// A mount that never answers always drives the bridge back to
    /// NotConnected, no matter when the probe went out.
    #[test]
    fn silence_always_fails_safe(start in 0u32..100_000, gap in 2_001u32..60_000) {
        let mut bridge = Bridge::new(
            BridgeConfig::default(),
            FlagClock(Rc::new(Cell::new(false))),
            FlagGps(Rc::new(Cell::new(false))),
        );
        let mut mount = ScriptPort::default();
        let mut host = ScriptPort::default();
        let mut sink = CountingSink { resolved: 0, states: Vec::new() };

        bridge.tick(start, &mut mount, &mut host, &mut sink);
        prop_assert!(bridge.exchange_pending());
        bridge.tick(start.wrapping_add(gap), &mut mount, &mut host, &mut sink);
        prop_assert!(!bridge.exchange_pending());
        prop_assert_eq!(bridge.state(), ConnectionState::NotConnected);
        prop_assert_eq!(mount.closes, 1);
    }
}
