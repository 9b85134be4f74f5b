//! Battery-backed clock adapter.
//!
//! - **`target_os = "espidf"`** — the ESP32 system clock
//!   (`gettimeofday`/`settimeofday`), whose RTC domain is kept alive by
//!   the backup supercap across power cycles.
//! - **`not(target_os = "espidf")`** — an in-memory clock for host-side
//!   tests and simulation.
//!
//! A stored value is only *valid* when it is after 2019-01-01 UTC — a
//! drained backup supply resets the RTC domain to the Unix epoch, and
//! that must never be pushed into the mount.

use log::info;

use crate::app::ports::{ClockSource, GpsSource};

/// 2019-01-01T00:00:00Z. Anything earlier is a dead backup battery.
pub const REFERENCE_UTC_SECONDS: i64 = 1_546_300_800;

// ───────────────────────────────────────────────────────────────
// Wall clock
// ───────────────────────────────────────────────────────────────

pub struct SystemRtc {
    #[cfg(not(target_os = "espidf"))]
    sim_utc: i64,
}

impl Default for SystemRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRtc {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            sim_utc: 0,
        }
    }

    /// Set the clock (GPS discipline, host command).
    #[cfg(target_os = "espidf")]
    pub fn set_utc(&mut self, utc_seconds: i64) {
        let tv = esp_idf_svc::sys::timeval {
            tv_sec: utc_seconds as esp_idf_svc::sys::time_t,
            tv_usec: 0,
        };
        // SAFETY: plain libc call; tv outlives the call.
        let _ = unsafe { esp_idf_svc::sys::settimeofday(&tv, core::ptr::null()) };
    }

    /// Set the clock (GPS discipline, host command).
    #[cfg(not(target_os = "espidf"))]
    pub fn set_utc(&mut self, utc_seconds: i64) {
        self.sim_utc = utc_seconds;
    }

    /// One-shot GPS discipline: while the stored value is implausible,
    /// adopt the receiver's decoded date/time as soon as it appears.
    /// Returns `true` when the clock was set.
    pub fn discipline_from(&mut self, gps: &impl GpsSource) -> bool {
        if self.is_valid() {
            return false;
        }
        let Some(utc) = gps.datetime_utc_seconds() else {
            return false;
        };
        self.set_utc(utc);
        info!("[RTC] set from GPS ({utc})");
        true
    }
}

impl ClockSource for SystemRtc {
    fn is_valid(&self) -> bool {
        self.utc_seconds() > REFERENCE_UTC_SECONDS
    }

    #[cfg(target_os = "espidf")]
    fn utc_seconds(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: plain libc call; tv outlives the call.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        i64::from(tv.tv_sec)
    }

    #[cfg(not(target_os = "espidf"))]
    fn utc_seconds(&self) -> i64 {
        self.sim_utc
    }
}

// ───────────────────────────────────────────────────────────────
// Monotonic uptime
// ───────────────────────────────────────────────────────────────

/// Millisecond uptime source for the polling loop.
///
/// The value is truncated to `u32` and wraps after ~49.7 days; every
/// consumer compares with wrapping subtraction, so the wrap is harmless.
pub struct Uptime {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Uptime {
    fn default() -> Self {
        Self::new()
    }
}

impl Uptime {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot (monotonic, wraps at `u32::MAX`).
    #[cfg(target_os = "espidf")]
    pub fn millis(&self) -> u32 {
        ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1000) as u32
    }

    /// Milliseconds since boot (monotonic, wraps at `u32::MAX`).
    #[cfg(not(target_os = "espidf"))]
    pub fn millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
