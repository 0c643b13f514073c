//! serialport-backed transport.
//!
//! Wraps a blocking serial port handle behind the protocol's transport
//! contract. The port is always opened 8-N-1 with handshaking off; the
//! settings' answer timeout bounds every terminator-delimited read.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use hexlink_protocol::Transport;

use crate::settings::SerialSettings;

/// A protocol transport over a physical serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `path` with the fixed 8-N-1 framing and the settings' baud and
    /// answer timeout.
    pub fn open(path: &str, settings: &SerialSettings) -> serialport::Result<Self> {
        let port = serialport::new(path, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.answer_timeout())
            .open()?;
        Ok(SerialTransport { port })
    }

    /// Wrap an already-open port.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        SerialTransport { port }
    }

    /// The current answer timeout.
    pub fn answer_timeout(&self) -> Duration {
        self.port.timeout()
    }

    /// Change the answer timeout, returning the previous one so a caller
    /// can restore it later.
    pub fn set_answer_timeout(&mut self, timeout: Duration) -> serialport::Result<Duration> {
        let previous = self.port.timeout();
        self.port.set_timeout(timeout)?;
        Ok(previous)
    }

    /// Discard anything buffered in either direction.
    pub fn purge(&mut self) -> serialport::Result<()> {
        self.port.clear(ClearBuffer::All)
    }

    /// One blocking single-byte read against the port timeout.
    fn read_one(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            Ok(_) => None,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::TimedOut {
                    tracing::debug!(error = %err, "serial read failed");
                }
                None
            }
        }
    }

    fn read_delimited(&mut self, max: Option<usize>, term: u8) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            match self.read_one() {
                Some(b) if b == term => return Some(out),
                Some(b) => {
                    out.push(b);
                    if max.is_some_and(|m| out.len() >= m) {
                        return Some(out);
                    }
                }
                None => return None,
            }
        }
    }
}

impl Transport for SerialTransport {
    fn write_byte(&mut self, b: u8) -> bool {
        self.write_all(&[b]) == 1
    }

    fn write_all(&mut self, buf: &[u8]) -> usize {
        match self.port.write_all(buf).and_then(|()| self.port.flush()) {
            Ok(()) => buf.len(),
            Err(err) => {
                tracing::debug!(error = %err, "serial write failed");
                0
            }
        }
    }

    fn read_until_terminator(&mut self, max: usize, term: u8) -> Option<Vec<u8>> {
        self.read_delimited(Some(max), term)
    }

    fn read_string_until_terminator(&mut self, term: u8) -> Option<Vec<u8>> {
        self.read_delimited(None, term)
    }

    fn has_byte(&mut self) -> bool {
        self.port.bytes_to_read().map(|n| n > 0).unwrap_or(false)
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.read_one()
    }
}
