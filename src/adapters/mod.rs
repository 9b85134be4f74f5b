//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements    | Connects to                      |
//! |------------|---------------|----------------------------------|
//! | `serial`   | DuplexPort    | ESP-IDF UART driver              |
//! | `wireless` | DuplexPort    | HC-05-style module + AT setup    |
//! | `gps`      | GpsSource     | u-blox receiver (NMEA over UART) |
//! | `rtc`      | ClockSource   | battery-backed system clock      |
//! | `log_sink` | EventSink     | Serial log output                |

pub mod gps;
pub mod log_sink;
pub mod rtc;
pub mod serial;
pub mod wireless;
