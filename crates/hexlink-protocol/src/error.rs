//! Protocol error types.

use thiserror::Error;

use crate::constants::Command;

/// Errors surfaced by protocol exchanges.
///
/// Transport primitives report failure as `false`/`None`; the engine and the
/// dispatch layer translate those into these kinds. The responder never
/// propagates them across the wire: every internal failure becomes a single
/// error reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// An I/O operation ran before `start` or after `end`.
    #[error("protocol not started")]
    NotStarted,

    /// The transport reported a short write, an empty read, or a timeout.
    #[error("transport failure: {0}")]
    Io(IoKind),

    /// A reply read that did not match the expected command byte. Reading
    /// the error sentinel lands here as well.
    #[error("bad reply for command 0x{expected:02x}: got 0x{actual:02x}")]
    Framing {
        /// The command byte the initiator dispatched.
        expected: Command,
        /// The value the responder actually echoed.
        actual: Command,
    },

    /// A responder bounds check failed.
    #[error("argument out of range: index {index}, limit {limit}")]
    ArgOutOfRange {
        /// The offending index.
        index: usize,
        /// The first out-of-range value.
        limit: usize,
    },

    /// An array set whose length exceeds what the remote side will accept,
    /// or an array get larger than the caller's buffer.
    #[error("payload too large: {len} elements, limit {limit}")]
    PayloadTooLarge {
        /// Number of elements in the transfer.
        len: usize,
        /// Largest acceptable length.
        limit: usize,
    },

    /// A hex payload that exceeds the target type's width, or a payload the
    /// codec could not interpret at all.
    #[error("payload does not fit the target type")]
    DecodeOverflow,
}

/// What the transport reported when an I/O operation failed.
///
/// The responder cares about the distinction: a mid-argument timeout means
/// the initiator is gone and no reply should be emitted, while every other
/// failure earns the error sentinel.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoKind {
    /// Fewer bytes were accepted than written.
    #[error("short write")]
    ShortWrite,

    /// The answer timeout elapsed with nothing read.
    #[error("read timeout")]
    Timeout,

    /// A terminated payload arrived with no content where a number was
    /// required.
    #[error("empty payload")]
    EmptyPayload,

    /// A string contained the terminator byte and cannot be framed.
    #[error("embedded terminator")]
    EmbeddedTerminator,
}

/// Errors from the pure value codec. These never cross a crate boundary on
/// their own; [`ProtocolError::from`] folds them into the protocol kinds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric payload with no hex digits.
    #[error("empty numeric payload")]
    Empty,

    /// More than 32 bits of hex digits, or a value that does not fit the
    /// target width.
    #[error("hex payload exceeds target width")]
    Overflow,

    /// A payload the codec could not interpret (text-mode floats).
    #[error("malformed payload")]
    Malformed,

    /// Strings may not contain the terminator byte.
    #[error("payload contains the terminator byte")]
    EmbeddedTerminator,
}

impl From<ValueError> for ProtocolError {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::Empty => ProtocolError::Io(IoKind::EmptyPayload),
            ValueError::Overflow | ValueError::Malformed => ProtocolError::DecodeOverflow,
            ValueError::EmbeddedTerminator => ProtocolError::Io(IoKind::EmbeddedTerminator),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = ProtocolError> = core::result::Result<T, E>;
