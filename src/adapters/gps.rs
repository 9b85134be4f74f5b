//! GPS receiver adapter (u-blox module, NMEA over UART).
//!
//! Pumps the NMEA byte stream through an incremental parser each loop
//! iteration and merges GGA (position) and RMC (date/time) sentences
//! into one snapshot. Implements [`GpsSource`] for the bridge and the
//! RTC-discipline path.
//!
//! Date/time is only reported as valid for years ≥ 2019 — modules that
//! have not decoded a single satellite frame yet emit a default epoch
//! date that must not be trusted.

use log::{debug, info, warn};
use nmea0183::{ParseResult, Parser};

use crate::app::ports::{DuplexPort, GpsSource};
use crate::pins;

use super::serial::UartLink;

/// First year a decoded GPS date is considered plausible.
const MIN_PLAUSIBLE_YEAR: u16 = 2019;

/// u-blox UBX RXM-PMREQ: put the receiver into backup mode.
const UBX_SLEEP_FRAME: [u8; 16] = [
    0xB5, 0x62, 0x02, 0x41, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x4D,
    0x3B,
];
/// Any traffic wakes the receiver; a burst of 0xFF is the documented way.
const WAKE_PADDING: [u8; 10] = [0xFF; 10];

/// Receiver convergence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FixStatus {
    /// Nothing decoded yet.
    NoFix,
    /// Date/time decoded, no position yet.
    TimeFix,
    /// Full position fix.
    Fix,
}

pub struct GpsReceiver {
    link: UartLink,
    parser: Parser,
    latitude: f64,
    longitude: f64,
    has_fix: bool,
    /// Decoded UTC date/time, unix seconds. Only plausible values land here.
    datetime: Option<i64>,
    suspended: bool,
}

impl GpsReceiver {
    pub fn new(link: UartLink) -> Self {
        Self {
            link,
            parser: Parser::new(),
            latitude: 0.0,
            longitude: 0.0,
            has_fix: false,
            datetime: None,
            suspended: false,
        }
    }

    /// Open the receiver UART at the module's default baud rate.
    pub fn begin(&mut self) -> crate::Result<()> {
        info!("[GPS] initialising receiver");
        self.link.open(pins::GPS_BAUD)?;
        Ok(())
    }

    /// Drain the UART and feed every byte through the NMEA parser.
    /// Call once per loop iteration; never blocks.
    pub fn poll(&mut self) {
        while let Some(byte) = self.link.read_byte() {
            let Some(result) = self.parser.parse_from_byte(byte) else {
                continue;
            };
            match result {
                Ok(ParseResult::GGA(Some(gga))) => {
                    self.latitude = gga.latitude.as_f64();
                    self.longitude = gga.longitude.as_f64();
                    if !self.has_fix {
                        info!(
                            "[GPS] position fix: {:.5}, {:.5}",
                            self.latitude, self.longitude
                        );
                    }
                    self.has_fix = true;
                }
                Ok(ParseResult::GGA(None)) => {
                    self.has_fix = false;
                }
                Ok(ParseResult::RMC(Some(rmc))) => {
                    self.update_datetime(&rmc.datetime);
                }
                Ok(_) => {}
                Err(e) => debug!("[GPS] unparsable sentence: {e}"),
            }
        }
    }

    pub fn status(&self) -> FixStatus {
        if self.has_fix {
            FixStatus::Fix
        } else if self.datetime.is_some() {
            FixStatus::TimeFix
        } else {
            FixStatus::NoFix
        }
    }

    /// Put the receiver into backup mode once it is no longer needed.
    pub fn sleep(&mut self) {
        if self.suspended {
            return;
        }
        debug!("[GPS] suspending receiver");
        if self.link.write_bytes(&UBX_SLEEP_FRAME).is_err() {
            warn!("[GPS] sleep command not sent");
            return;
        }
        self.suspended = true;
    }

    /// Wake a suspended receiver.
    pub fn resume(&mut self) {
        if !self.suspended {
            return;
        }
        debug!("[GPS] resuming receiver");
        if self.link.write_bytes(&WAKE_PADDING).is_err() {
            warn!("[GPS] wake padding not sent");
        }
        self.suspended = false;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn update_datetime(&mut self, dt: &nmea0183::datetime::DateTime) {
        if dt.date.year < MIN_PLAUSIBLE_YEAR {
            return;
        }
        let date = chrono::NaiveDate::from_ymd_opt(
            i32::from(dt.date.year),
            u32::from(dt.date.month),
            u32::from(dt.date.day),
        );
        let time = chrono::NaiveTime::from_hms_opt(
            u32::from(dt.time.hours),
            u32::from(dt.time.minutes),
            dt.time.seconds as u32,
        );
        if let (Some(date), Some(time)) = (date, time) {
            if self.datetime.is_none() {
                info!(
                    "[GPS] date/time acquired: {:04}-{:02}-{:02}T{:02}:{:02}",
                    dt.date.year, dt.date.month, dt.date.day, dt.time.hours, dt.time.minutes
                );
            }
            self.datetime = Some(date.and_time(time).and_utc().timestamp());
        }
    }
}

impl GpsSource for GpsReceiver {
    fn has_fix(&self) -> bool {
        self.has_fix
    }

    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }

    fn has_datetime(&self) -> bool {
        self.datetime.is_some()
    }

    fn datetime_utc_seconds(&self) -> Option<i64> {
        self.datetime
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    fn make_gps() -> GpsReceiver {
        let mut gps = GpsReceiver::new(UartLink::new(
            "gps",
            pins::GPS_UART_NUM,
            pins::GPS_UART_TX_GPIO,
            pins::GPS_UART_RX_GPIO,
        ));
        gps.begin().unwrap();
        gps
    }

    fn feed(gps: &mut GpsReceiver, sentence: &str) {
        gps.link.sim_rx.extend(sentence.as_bytes());
        gps.poll();
    }

    #[test]
    fn starts_with_nothing() {
        let gps = make_gps();
        assert_eq!(gps.status(), FixStatus::NoFix);
        assert!(!gps.has_fix());
        assert!(!gps.has_datetime());
    }

    #[test]
    fn gga_sentence_yields_position_fix() {
        let mut gps = make_gps();
        feed(
            &mut gps,
            "$GPGGA,145045,4835.038,N,01129.000,E,1,08,0.9,545.4,M,46.9,M,,*43\r\n",
        );
        assert!(gps.has_fix());
        assert_eq!(gps.status(), FixStatus::Fix);
        assert!((gps.latitude() - 48.5840).abs() < 0.001);
        assert!((gps.longitude() - 11.4833).abs() < 0.001);
    }

    #[test]
    fn rmc_sentence_yields_plausible_datetime() {
        let mut gps = make_gps();
        feed(
            &mut gps,
            "$GPRMC,145045,A,4835.038,N,01129.000,E,022.4,084.4,150823,003.1,W*6C\r\n",
        );
        assert!(gps.has_datetime());
        // 2023-08-15T14:50:45Z
        assert_eq!(gps.datetime_utc_seconds(), Some(1_692_111_045));
    }

    #[test]
    fn sentence_split_across_polls_still_parses() {
        let mut gps = make_gps();
        let sentence = "$GPGGA,145045,4835.038,N,01129.000,E,1,08,0.9,545.4,M,46.9,M,,*43\r\n";
        let (a, b) = sentence.split_at(20);
        feed(&mut gps, a);
        assert!(!gps.has_fix());
        feed(&mut gps, b);
        assert!(gps.has_fix());
    }

    #[test]
    fn sleep_resume_toggle() {
        let mut gps = make_gps();
        gps.sleep();
        assert!(gps.is_suspended());
        gps.sleep(); // idempotent
        gps.resume();
        assert!(!gps.is_suspended());
        assert!(gps.link.sim_tx.starts_with(&UBX_SLEEP_FRAME));
    }
}
