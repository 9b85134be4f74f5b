//! The single in-flight request/response exchange with the mount.
//!
//! The mount channel is a single-consumer resource shared between protocol
//! maintenance and user pass-through, so at most one [`PendingRequest`]
//! exists at any time — the bridge holds it in an `Option` and clears it
//! the instant a resolution is reached.
//!
//! Replies arrive as a byte trickle over multiple polling ticks. The
//! [`ReplyCollector`] accumulates them into a bounded buffer until the `#`
//! sentinel is seen or the buffer fills; the deadline is checked with
//! wraparound-safe subtraction on a `u32` millisecond clock.

use heapless::Vec;

use crate::app::ports::DuplexPort;
use crate::bridge::codec::REPLY_TERMINATOR;
use crate::bridge::ConnectionState;

/// Reply buffer capacity. Bytes beyond this are silently dropped, which
/// can desynchronize reply framing — a documented limitation, not a crash
/// condition.
pub const REPLY_CAPACITY: usize = 256;

// ───────────────────────────────────────────────────────────────
// Reply collector
// ───────────────────────────────────────────────────────────────

/// Accumulates mount bytes until the sentinel or capacity.
#[derive(Debug, Default)]
pub struct ReplyCollector {
    buf: Vec<u8, REPLY_CAPACITY>,
    complete: bool,
}

impl ReplyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns `true` once the reply is complete — either
    /// the terminator was stored or the buffer is full.
    pub fn feed(&mut self, byte: u8) -> bool {
        if self.complete {
            return true;
        }
        if self.buf.push(byte).is_err() {
            // Capacity reached: the byte is dropped and collection stops.
            self.complete = true;
        } else if byte == REPLY_TERMINATOR {
            self.complete = true;
        }
        self.complete
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Raw bytes collected so far, terminator included.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Exact length-and-content match against an expected reply.
    pub fn matches(&self, expected: &[u8]) -> bool {
        self.buf.as_slice() == expected
    }
}

// ───────────────────────────────────────────────────────────────
// Pending request
// ───────────────────────────────────────────────────────────────

/// How a pending exchange resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The collected reply equals the expected bytes.
    Success,
    /// A reply arrived but does not equal the expected bytes.
    Mismatch,
    /// No complete reply within the response deadline.
    TimedOut,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The one outstanding request/response exchange with the mount.
pub struct PendingRequest {
    issued_at_ms: u32,
    deadline_ms: u32,
    expected: &'static [u8],
    /// State applied when the reply matches.
    pub on_success: ConnectionState,
    /// State applied on mismatch or timeout.
    pub on_failure: ConnectionState,
    /// Close the mount channel when the exchange fails.
    pub close_on_failure: bool,
    /// Diagnostic description on success ("connection established", …).
    pub success_desc: &'static str,
    /// Diagnostic description on failure ("keep-alive lost", …).
    pub failure_desc: &'static str,
    collector: ReplyCollector,
}

impl PendingRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        now_ms: u32,
        deadline_ms: u32,
        expected: &'static [u8],
        on_success: ConnectionState,
        on_failure: ConnectionState,
        close_on_failure: bool,
        success_desc: &'static str,
        failure_desc: &'static str,
    ) -> Self {
        Self {
            issued_at_ms: now_ms,
            deadline_ms,
            expected,
            on_success,
            on_failure,
            close_on_failure,
            success_desc,
            failure_desc,
            collector: ReplyCollector::new(),
        }
    }

    /// Advance the exchange by one tick.
    ///
    /// Drains whatever bytes the mount channel holds right now — never
    /// waiting for more — and returns `Some` exactly once, when the reply
    /// completed or the deadline passed. `None` means "try again next
    /// tick".
    pub fn poll(&mut self, now_ms: u32, mount: &mut impl DuplexPort) -> Option<Outcome> {
        if mount.bytes_available() == 0 {
            if self.deadline_passed(now_ms) {
                return Some(Outcome::TimedOut);
            }
            return None;
        }

        while let Some(byte) = mount.read_byte() {
            if self.collector.feed(byte) {
                break;
            }
        }

        if self.collector.is_complete() {
            if self.collector.matches(self.expected) {
                Some(Outcome::Success)
            } else {
                Some(Outcome::Mismatch)
            }
        } else if self.deadline_passed(now_ms) {
            // A trickle that never terminates still fails at the deadline.
            Some(Outcome::TimedOut)
        } else {
            None
        }
    }

    /// Bytes collected so far (for failure diagnostics).
    pub fn reply_bytes(&self) -> &[u8] {
        self.collector.bytes()
    }

    fn deadline_passed(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.issued_at_ms) > self.deadline_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::codec::KEEPALIVE_REPLY;

    /// Minimal scripted channel: `rx` is what the mount will send us.
    #[derive(Default)]
    struct ScriptedPort {
        rx: std::collections::VecDeque<u8>,
    }

    impl ScriptedPort {
        fn push(&mut self, bytes: &[u8]) {
            self.rx.extend(bytes);
        }
    }

    impl DuplexPort for ScriptedPort {
        fn bytes_available(&self) -> usize {
            self.rx.len()
        }
        fn read_byte(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
        fn write_bytes(&mut self, _bytes: &[u8]) -> Result<(), crate::app::ports::ChannelError> {
            Ok(())
        }
        fn open(&mut self, _baud: u32) -> Result<(), crate::app::ports::ChannelError> {
            Ok(())
        }
        fn close(&mut self) {}
    }

    fn probe_request(now_ms: u32) -> PendingRequest {
        PendingRequest::new(
            now_ms,
            2000,
            KEEPALIVE_REPLY,
            ConnectionState::Connected,
            ConnectionState::NotConnected,
            true,
            "ok",
            "err",
        )
    }

    #[test]
    fn resolves_on_exact_reply() {
        let mut port = ScriptedPort::default();
        let mut req = probe_request(0);
        port.push(b"x#");
        assert_eq!(req.poll(1, &mut port), Some(Outcome::Success));
    }

    #[test]
    fn mismatch_on_wrong_reply() {
        let mut port = ScriptedPort::default();
        let mut req = probe_request(0);
        port.push(b"y#");
        assert_eq!(req.poll(1, &mut port), Some(Outcome::Mismatch));
    }

    #[test]
    fn accumulates_across_ticks() {
        let mut port = ScriptedPort::default();
        let mut req = probe_request(0);

        port.push(b"x");
        assert_eq!(req.poll(10, &mut port), None, "partial reply must stay pending");
        assert_eq!(req.poll(20, &mut port), None, "silent tick must stay pending");

        port.push(b"#");
        assert_eq!(req.poll(30, &mut port), Some(Outcome::Success));
    }

    #[test]
    fn times_out_on_silence() {
        let mut port = ScriptedPort::default();
        let mut req = probe_request(0);
        assert_eq!(req.poll(2000, &mut port), None, "deadline is exclusive");
        assert_eq!(req.poll(2001, &mut port), Some(Outcome::TimedOut));
    }

    #[test]
    fn times_out_on_endless_trickle() {
        let mut port = ScriptedPort::default();
        let mut req = probe_request(0);
        port.push(b"x");
        assert_eq!(req.poll(100, &mut port), None);
        port.push(b"x");
        assert_eq!(req.poll(2500, &mut port), Some(Outcome::TimedOut));
    }

    #[test]
    fn deadline_check_is_wraparound_safe() {
        let mut port = ScriptedPort::default();
        let mut req = probe_request(u32::MAX - 100);
        assert_eq!(req.poll(u32::MAX, &mut port), None);
        // 1901 ms after issue, across the u32 wrap.
        assert_eq!(req.poll(1800, &mut port), None);
        // 2101 ms after issue.
        assert_eq!(req.poll(2000, &mut port), Some(Outcome::TimedOut));
    }

    #[test]
    fn overflow_completes_without_terminator() {
        let mut port = ScriptedPort::default();
        let mut req = probe_request(0);
        let flood = [b'z'; REPLY_CAPACITY + 40];
        port.push(&flood);
        assert_eq!(req.poll(1, &mut port), Some(Outcome::Mismatch));
        assert_eq!(req.reply_bytes().len(), REPLY_CAPACITY);
    }

    #[test]
    fn collector_drops_overflow_silently() {
        let mut c = ReplyCollector::new();
        for _ in 0..REPLY_CAPACITY {
            assert!(!c.is_complete());
            c.feed(b'a');
        }
        assert!(c.feed(b'b'), "feed past capacity reports completion");
        assert_eq!(c.bytes().len(), REPLY_CAPACITY);
        assert!(c.bytes().iter().all(|&b| b == b'a'));
    }
}
