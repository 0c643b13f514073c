//! Host-side glue for the hexlink serial protocol.
//!
//! A microscopy device adapter uses this crate to bind the protocol core to
//! a physical serial port: fixed 8-N-1 port settings with the standard
//! timing defaults, a [`SerialTransport`] over the port, the
//! [`probe::try_stream`] detection flow, and string-sequence marshalling
//! for sequenceable properties.

pub mod probe;
pub mod seq;
pub mod serial;
pub mod settings;

pub use probe::{check_firmware, try_stream, DetectionStatus};
pub use seq::{set_channel_sequence, set_sequence, SequenceError};
pub use serial::SerialTransport;
pub use settings::SerialSettings;
