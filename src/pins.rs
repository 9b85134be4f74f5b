//! GPIO / peripheral pin assignments for the NexBridge dongle board.
//!
//! Single source of truth — every adapter references this module rather
//! than hard-coding pin numbers. Change a pin here and it propagates
//! everywhere.

// ---------------------------------------------------------------------------
// Mount link (UART1 → hand-control port, RS-232 level shifter)
// ---------------------------------------------------------------------------

pub const MOUNT_UART_NUM: i32 = 1;
pub const MOUNT_UART_TX_GPIO: i32 = 17;
pub const MOUNT_UART_RX_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// GPS receiver (UART2 → u-blox module)
// ---------------------------------------------------------------------------

pub const GPS_UART_NUM: i32 = 2;
pub const GPS_UART_TX_GPIO: i32 = 5;
pub const GPS_UART_RX_GPIO: i32 = 6;
/// u-blox modules talk NMEA at 9600 out of the box.
pub const GPS_BAUD: u32 = 9600;

// ---------------------------------------------------------------------------
// Wireless serial module (UART0 when fitted; jumper-selected vs. USB)
// ---------------------------------------------------------------------------

pub const WIRELESS_UART_NUM: i32 = 0;
pub const WIRELESS_UART_TX_GPIO: i32 = 43;
pub const WIRELESS_UART_RX_GPIO: i32 = 44;
/// Digital output: module power rail (active HIGH via P-FET).
pub const WIRELESS_POWER_GPIO: i32 = 7;
/// Digital output: HIGH holds the module in AT command mode.
pub const WIRELESS_AT_MODE_GPIO: i32 = 8;
/// AT command mode baud rate (fixed by the module firmware).
pub const WIRELESS_AT_BAUD: u32 = 38_400;
/// Data mode baud rate.
pub const WIRELESS_DATA_BAUD: u32 = 9600;

// ---------------------------------------------------------------------------
// Wired host link (UART0 through the on-board USB-serial bridge)
// ---------------------------------------------------------------------------

pub const HOST_UART_NUM: i32 = 0;
pub const HOST_UART_TX_GPIO: i32 = 43;
pub const HOST_UART_RX_GPIO: i32 = 44;
pub const HOST_BAUD: u32 = 9600;
