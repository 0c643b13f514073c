//! Serial line parameters for the host side.
//!
//! The link itself is fixed at 8 data bits, no parity, one stop bit, no
//! handshaking; only the baud rate and the timing knobs vary per setup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default answer timeout applied when a session starts.
pub const DEFAULT_ANSWER_TIMEOUT_MS: u64 = 500;
/// Default delay between transmitted characters.
pub const DEFAULT_INTER_CHAR_DELAY_MS: u64 = 0;
/// Quiescent wait after opening the port, before the first exchange. The
/// bootloader listens for firmware uploads during roughly the first second
/// after the port opens.
pub const DEFAULT_POST_OPEN_WAIT_MS: u64 = 2000;

/// Port parameters applied when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Baud rate, which must match the firmware's configuration.
    pub baud_rate: u32,
    /// Answer timeout bounding every terminator-delimited read.
    pub answer_timeout_ms: u64,
    /// Delay between transmitted characters.
    pub inter_char_delay_ms: u64,
    /// Quiescent wait after opening the port.
    pub post_open_wait_ms: u64,
}

impl SerialSettings {
    /// Settings at the given baud rate with default timing.
    pub fn new(baud_rate: u32) -> Self {
        SerialSettings {
            baud_rate,
            answer_timeout_ms: DEFAULT_ANSWER_TIMEOUT_MS,
            inter_char_delay_ms: DEFAULT_INTER_CHAR_DELAY_MS,
            post_open_wait_ms: DEFAULT_POST_OPEN_WAIT_MS,
        }
    }

    /// The answer timeout as a [`Duration`].
    pub fn answer_timeout(&self) -> Duration {
        Duration::from_millis(self.answer_timeout_ms)
    }

    /// The post-open quiescent wait as a [`Duration`].
    pub fn post_open_wait(&self) -> Duration {
        Duration::from_millis(self.post_open_wait_ms)
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings::new(115_200)
    }
}
