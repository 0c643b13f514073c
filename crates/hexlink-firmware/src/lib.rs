//! Firmware-side glue for the hexlink serial protocol.
//!
//! The embedded main loop registers its command handlers in a
//! [`hexlink_protocol::CommandTable`] and hands it to a
//! [`ResponderService`], which polls the line cooperatively and completes
//! one exchange at a time. [`TcpTransport`] carries the protocol over the
//! TCP UART bridges that simulators and bench rigs expose.

pub mod service;
pub mod tcp;

pub use service::{ResponderService, DEFAULT_IDLE_SLEEP};
pub use tcp::TcpTransport;
