//! TCP-exposed UART transport.
//!
//! Bench rigs and simulators expose a firmware UART as a plain TCP byte
//! stream; this transport lets either protocol role run over such a
//! socket. Reads are bounded by a read timeout standing in for the serial
//! answer timeout.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use hexlink_protocol::{Transport, DEFAULT_ANSWER_TIMEOUT};

/// A protocol transport over a TCP byte stream.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to a UART bridge and apply the default answer timeout.
    pub fn connect(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        TcpTransport::from_stream(stream)
    }

    /// Wrap an accepted connection (the firmware end of the bridge).
    pub fn from_stream(stream: TcpStream) -> std::io::Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(DEFAULT_ANSWER_TIMEOUT))?;
        Ok(TcpTransport { stream })
    }

    /// Change the answer timeout.
    pub fn set_answer_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.stream.set_read_timeout(Some(timeout))
    }

    fn read_one(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            Ok(_) => None,
            Err(err) => {
                if err.kind() != ErrorKind::WouldBlock && err.kind() != ErrorKind::TimedOut {
                    tracing::debug!(error = %err, "uart bridge read failed");
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

impl Transport for TcpTransport {
    fn write_byte(&mut self, b: u8) -> bool {
        self.write_all(&[b]) == 1
    }

    fn write_all(&mut self, buf: &[u8]) -> usize {
        match self.stream.write_all(buf).and_then(|()| self.stream.flush()) {
            Ok(()) => buf.len(),
            Err(err) => {
                tracing::debug!(error = %err, "uart bridge write failed");
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
        // Peek without consuming; WouldBlock means the buffer is empty.
        let mut byte = [0u8; 1];
        if self.stream.set_nonblocking(true).is_err() {
            return false;
        }
        let ready = matches!(self.stream.peek(&mut byte), Ok(n) if n > 0);
        let _ = self.stream.set_nonblocking(false);
        ready
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.read_one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn connected_pair() -> (TcpTransport, TcpTransport) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let client = TcpTransport::connect(addr).expect("connect");
        let (server, _) = listener.accept().expect("accept");
        let server = TcpTransport::from_stream(server).expect("wrap");
        (client, server)
    }

    #[test]
    fn test_bridge_carries_terminated_payloads() {
        let (mut client, mut server) = connected_pair();

        assert!(client.write_byte(0x4d));
        assert_eq!(client.write_all(b"1f\x04"), 3);

        assert_eq!(server.read_byte(), Some(0x4d));
        assert_eq!(server.read_until_terminator(9, 0x04), Some(b"1f".to_vec()));
    }

    #[test]
    fn test_has_byte_does_not_consume() {
        let (mut client, mut server) = connected_pair();
        client.write_byte(0x41);

        // Peeking leaves the byte readable.
        while !server.has_byte() {
            std::thread::yield_now();
        }
        assert!(server.has_byte());
        assert_eq!(server.read_byte(), Some(0x41));
    }

    #[test]
    fn test_read_times_out_when_silent() {
        let (_client, mut server) = connected_pair();
        server
            .set_answer_timeout(Duration::from_millis(10))
            .expect("set timeout");
        assert_eq!(server.read_until_terminator(9, 0x04), None);
    }
}
