//! Protocol constants
//!
//! These constants define the wire framing bytes, the radix, and the
//! sub-command codes used by the hexadecimal serial protocol. Everything on
//! the wire is either a single raw command byte or a terminator-delimited
//! ASCII payload built from these values.

// ============================================================================
// Wire type aliases
// ============================================================================

/// Commands are always single bytes.
pub type Command = u8;
/// Channels qualify a command for one of several targets on a device.
pub type Channel = i8;
/// Array lengths and indices travel as 16-bit counts.
pub type WireSize = u16;

// ============================================================================
// Framing
// ============================================================================

/// Every encoded value ends in this byte (ASCII EOT).
pub const TERM: u8 = 0x04;
/// Negative-acknowledge sentinel (ASCII NAK) sent in place of a command echo.
pub const ERROR: u8 = 0x15;
/// Values travel as hexadecimal text.
pub const RADIX: u32 = 16;
/// Maximum hex digits for a 32-bit value, plus a possible leading `-` and
/// one byte of slack for the terminator.
pub const HEX_BUF_SIZE: usize = 2 * core::mem::size_of::<u32>() + 2;

// ============================================================================
// Array sub-commands
// ============================================================================

/// Size query: the maximum capacity on set, the current length on get.
pub const SUBCMD_ARRAY_SIZE: Command = 0x01;
/// Get only: announces that the initiator is about to read the array.
pub const SUBCMD_ARRAY_STARTING: Command = 0x02;
/// Transfers one element at an explicit index.
pub const SUBCMD_ARRAY_ELEMENT: Command = 0x03;
/// Set only: carries the final length and closes the transfer.
pub const SUBCMD_ARRAY_FINISHED: Command = 0x04;

// ============================================================================
// Text-mode floats
// ============================================================================

/// Digits after the decimal point in text-mode float payloads. Seven places
/// are enough to represent a 23-bit mantissa.
#[cfg(feature = "text-float")]
pub const FLOAT_TEXT_PRECISION: usize = 7;
/// Payload bound for text-mode floats: sign, digit, point, precision,
/// exponent, and slack.
#[cfg(feature = "text-float")]
pub const FLOAT_TEXT_BUF_SIZE: usize = 3 + FLOAT_TEXT_PRECISION + 5 + 4;
