//! Byte-transport abstraction over the serial link.
//!
//! The protocol needs very little from the underlying stream: byte and
//! buffer writes, a blocking read-until-terminator bounded by the link's
//! answer timeout, and (on the responder role only) a non-blocking byte
//! probe. Failure is reported as `false`/`None`; the engine maps those to
//! protocol errors.

use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

/// Answer timeout applied to a transport until the owner overrides it.
pub const DEFAULT_ANSWER_TIMEOUT: Duration = Duration::from_millis(500);

/// A bidirectional byte stream with terminator-aware blocking reads.
pub trait Transport {
    /// Deliver exactly one byte.
    fn write_byte(&mut self, b: u8) -> bool;

    /// Write a buffer, returning the number of bytes delivered. Callers
    /// treat short writes as failures.
    fn write_all(&mut self, buf: &[u8]) -> usize;

    /// Block until `term` is observed (and discarded), `max` payload bytes
    /// have been read, or the answer timeout elapses. Returns the payload
    /// without the terminator; a lone terminator yields an empty payload.
    /// `None` means the timeout elapsed with nothing read; bytes consumed
    /// before a mid-payload timeout are dropped (the link is already
    /// desynchronised at that point).
    fn read_until_terminator(&mut self, max: usize, term: u8) -> Option<Vec<u8>>;

    /// Arbitrary-length variant of [`Transport::read_until_terminator`].
    fn read_string_until_terminator(&mut self, term: u8) -> Option<Vec<u8>>;

    /// Non-blocking probe: is at least one byte waiting? Only the responder
    /// role needs this.
    fn has_byte(&mut self) -> bool;

    /// Block for one byte, bounded by the answer timeout.
    fn read_byte(&mut self) -> Option<u8>;
}

// ============================================================================
// In-memory transport pair
// ============================================================================

/// One end of an in-memory serial pair.
///
/// Data written on one end arrives as byte chunks on the other, where a
/// reassembly buffer serves the terminator-aware reads. Used by tests and
/// bench rigs in place of a physical UART.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    pending: BytesMut,
    timeout: Duration,
}

impl ChannelTransport {
    /// Create a connected pair with the default answer timeout.
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (a_tx, a_rx) = bounded(256);
        let (b_tx, b_rx) = bounded(256);
        (
            ChannelTransport::new(a_tx, b_rx),
            ChannelTransport::new(b_tx, a_rx),
        )
    }

    fn new(tx: Sender<Vec<u8>>, rx: Receiver<Vec<u8>>) -> Self {
        ChannelTransport {
            tx,
            rx,
            pending: BytesMut::new(),
            timeout: DEFAULT_ANSWER_TIMEOUT,
        }
    }

    /// Override the answer timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn pop_pending(&mut self) -> Option<u8> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.pending.get_u8())
    }

    /// Pull one chunk into the reassembly buffer, waiting at most until
    /// `deadline`.
    fn fill_pending(&mut self, deadline: Instant) -> bool {
        match self.rx.recv_deadline(deadline) {
            Ok(chunk) => {
                self.pending.extend_from_slice(&chunk);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn read_delimited(&mut self, max: Option<usize>, term: u8) -> Option<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let mut out = Vec::new();
        loop {
            while let Some(b) = self.pop_pending() {
                if b == term {
                    return Some(out);
                }
                out.push(b);
                if max.is_some_and(|m| out.len() >= m) {
                    return Some(out);
                }
            }
            if !self.fill_pending(deadline) {
                return None;
            }
        }
    }
}

impl Transport for ChannelTransport {
    fn write_byte(&mut self, b: u8) -> bool {
        self.tx.send(vec![b]).is_ok()
    }

    fn write_all(&mut self, buf: &[u8]) -> usize {
        if self.tx.send(buf.to_vec()).is_ok() {
            buf.len()
        } else {
            0
        }
    }

    fn read_until_terminator(&mut self, max: usize, term: u8) -> Option<Vec<u8>> {
        self.read_delimited(Some(max), term)
    }

    fn read_string_until_terminator(&mut self, term: u8) -> Option<Vec<u8>> {
        self.read_delimited(None, term)
    }

    fn has_byte(&mut self) -> bool {
        if !self.pending.is_empty() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(chunk) => {
                self.pending.extend_from_slice(&chunk);
                !self.pending.is_empty()
            }
            Err(_) => false,
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(b) = self.pop_pending() {
                return Some(b);
            }
            if !self.fill_pending(deadline) {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_carries_bytes_both_ways() {
        let (mut a, mut b) = ChannelTransport::pair();

        assert!(a.write_byte(0x4d));
        assert_eq!(b.read_byte(), Some(0x4d));

        assert_eq!(b.write_all(b"1f\x04"), 3);
        assert_eq!(a.read_until_terminator(9, 0x04), Some(b"1f".to_vec()));
    }

    #[test]
    fn test_read_until_terminator_empty_payload() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.write_byte(0x04);
        assert_eq!(b.read_until_terminator(9, 0x04), Some(Vec::new()));
    }

    #[test]
    fn test_read_until_terminator_times_out() {
        let (_a, mut b) = ChannelTransport::pair();
        b.set_timeout(Duration::from_millis(10));
        assert_eq!(b.read_until_terminator(9, 0x04), None);
        assert_eq!(b.read_byte(), None);
    }

    #[test]
    fn test_read_stops_at_max_without_consuming_terminator() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.write_all(b"abcdef\x04");
        assert_eq!(b.read_until_terminator(3, 0x04), Some(b"abc".to_vec()));
        // The remainder is still buffered for the next read.
        assert_eq!(b.read_until_terminator(9, 0x04), Some(b"def".to_vec()));
    }

    #[test]
    fn test_has_byte_is_non_blocking() {
        let (mut a, mut b) = ChannelTransport::pair();
        assert!(!b.has_byte());
        a.write_byte(0x41);
        assert!(b.has_byte());
        assert_eq!(b.read_byte(), Some(0x41));
        assert!(!b.has_byte());
    }

    #[test]
    fn test_reads_span_chunk_boundaries() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.write_all(b"1");
        a.write_all(b"f");
        a.write_byte(0x04);
        assert_eq!(b.read_until_terminator(9, 0x04), Some(b"1f".to_vec()));
    }
}
