//! Hexadecimal Serial Protocol
//!
//! This crate implements the symmetric request/response protocol a
//! microscopy control host uses to talk to embedded firmware over a
//! byte-oriented serial link. Commands are single raw bytes; every other
//! value is a hex-encoded, terminator-delimited ASCII payload.
//!
//! # Protocol Overview
//!
//! - **Initiator** (host): sends a command byte, optional arguments, then
//!   waits for the responder to echo the command through the unsigned
//!   codec. Any mismatch, or the `ERROR` sentinel, fails the exchange.
//! - **Responder** (firmware): polls for a command byte, reads the
//!   arguments, runs the registered callback, and answers with exactly one
//!   echo or error reply.
//! - Arrays stream one element per exchange under sub-commands; a set
//!   always closes with the finished marker, a get always opens with the
//!   starting marker.
//!
//! # Example
//!
//! ```rust,ignore
//! use hexlink_protocol::{ChannelTransport, CommandTable, HexProtocol, Session};
//!
//! const SET_EXPOSURE: u8 = 0x4d;
//!
//! // Host side: one guarded exchange.
//! let session = Session::started(transport);
//! let mut txn = session.transaction();
//! txn.dispatch_set(SET_EXPOSURE, &31u16)?;
//!
//! // Firmware side: register handlers and poll.
//! let mut table = CommandTable::new();
//! table.on_set(SET_EXPOSURE, |ms: u16| { exposure.set(ms); true });
//! while running {
//!     table.poll_once(&mut proto);
//! }
//! ```

mod constants;
mod dispatch;
mod engine;
mod error;
mod log;
mod process;
mod registry;
mod session;
mod transport;
mod value;

pub use constants::*;
pub use engine::HexProtocol;
pub use error::{IoKind, ProtocolError, Result, ValueError};
pub use log::TransactionLog;
pub use process::ArrayStore;
pub use registry::{shared_store, CommandTable, SharedArrayStore};
pub use session::{Session, Transaction};
pub use transport::{ChannelTransport, Transport, DEFAULT_ANSWER_TIMEOUT};
pub use value::WireValue;
