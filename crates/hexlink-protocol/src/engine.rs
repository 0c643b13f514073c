//! The protocol engine shared by both roles.
//!
//! [`HexProtocol`] binds a transport to the session lifecycle and layers the
//! terminator framing and the command/reply frame operations on top of it.
//! The initiator chains live in [`crate::dispatch`], the responder handlers
//! in [`crate::process`]; both are built from the operations here.

use crate::constants::{Channel, Command, ERROR, HEX_BUF_SIZE, TERM};
use crate::error::{IoKind, ProtocolError, Result};
use crate::log::TransactionLog;
use crate::transport::Transport;
use crate::value::{encode_str, WireValue};

/// A protocol session over one transport.
///
/// Created unstarted; every I/O operation fails with
/// [`ProtocolError::NotStarted`] until [`HexProtocol::start`] binds a
/// transport, and again after [`HexProtocol::end`] releases it.
#[derive(Debug)]
pub struct HexProtocol<T> {
    transport: Option<T>,
    log: TransactionLog,
}

impl<T> Default for HexProtocol<T> {
    fn default() -> Self {
        HexProtocol::new()
    }
}

impl<T> HexProtocol<T> {
    /// An unstarted session.
    pub fn new() -> Self {
        HexProtocol {
            transport: None,
            log: TransactionLog::new(),
        }
    }

    /// Bind the transport and begin the session.
    pub fn start(&mut self, transport: T) {
        self.transport = Some(transport);
    }

    /// End the session, handing the transport back for reconfiguration or
    /// shutdown.
    pub fn end(&mut self) -> Option<T> {
        self.transport.take()
    }

    /// Whether [`HexProtocol::start`] has been called.
    pub fn has_started(&self) -> bool {
        self.transport.is_some()
    }

    /// Direct access to the bound transport (timeout changes, purging).
    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    /// The per-transaction wire log.
    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Mutable log access for the transaction guard.
    pub fn log_mut(&mut self) -> &mut TransactionLog {
        &mut self.log
    }

    fn parts(&mut self) -> Result<(&mut T, &mut TransactionLog)> {
        match self.transport.as_mut() {
            Some(t) => Ok((t, &mut self.log)),
            None => Err(ProtocolError::NotStarted),
        }
    }
}

impl<T: Transport> HexProtocol<T> {
    // ------------------------------------------------------------------
    // Terminator-framed payload I/O
    // ------------------------------------------------------------------

    /// Write a payload followed by the terminator.
    fn put_payload(&mut self, payload: &[u8]) -> Result<()> {
        let (transport, log) = self.parts()?;
        let mut buf = Vec::with_capacity(payload.len() + 1);
        buf.extend_from_slice(payload);
        buf.push(TERM);
        if transport.write_all(&buf) != buf.len() {
            return Err(ProtocolError::Io(IoKind::ShortWrite));
        }
        log.send(&buf);
        Ok(())
    }

    /// Read one payload up to the next terminator. `max` bounds the payload
    /// length for fixed-size values; `None` reads arbitrary lengths.
    fn get_payload(&mut self, max: Option<usize>) -> Result<Vec<u8>> {
        let (transport, log) = self.parts()?;
        let payload = match max {
            Some(max) => transport.read_until_terminator(max, TERM),
            None => transport.read_string_until_terminator(TERM),
        };
        match payload {
            Some(payload) => {
                log.recv(&payload, TERM);
                Ok(payload)
            }
            None => {
                log.recv_empty();
                Err(ProtocolError::Io(IoKind::Timeout))
            }
        }
    }

    /// Encode and send one typed value.
    pub fn put_value<V: WireValue>(&mut self, value: &V) -> Result<()> {
        let mut payload = Vec::with_capacity(HEX_BUF_SIZE);
        value.encode(&mut payload)?;
        self.put_payload(&payload)
    }

    /// Receive and decode one typed value.
    pub fn get_value<V: WireValue>(&mut self) -> Result<V> {
        let payload = self.get_payload(V::MAX_PAYLOAD)?;
        Ok(V::decode(&payload)?)
    }

    /// Send a string payload. An empty string still emits its terminator.
    pub fn put_string(&mut self, s: &str) -> Result<()> {
        let mut payload = Vec::with_capacity(s.len());
        encode_str(s, &mut payload)?;
        self.put_payload(&payload)
    }

    /// Receive an arbitrary-length string.
    pub fn get_string(&mut self) -> Result<String> {
        self.get_value()
    }

    /// Receive a string with a caller-imposed length bound.
    pub fn get_string_bounded(&mut self, max: usize) -> Result<String> {
        let payload = self.get_payload(Some(max))?;
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    // ------------------------------------------------------------------
    // Frame layer
    // ------------------------------------------------------------------

    /// Send a command as a single raw byte, the only unterminated
    /// transmission in the protocol.
    pub fn put_command(&mut self, cmd: Command) -> Result<()> {
        let (transport, log) = self.parts()?;
        log.command(cmd);
        if transport.write_byte(cmd) {
            Ok(())
        } else {
            Err(ProtocolError::Io(IoKind::ShortWrite))
        }
    }

    /// Send a command byte immediately followed by the channel it applies
    /// to (signed-8 codec, terminated).
    pub fn put_channel_command(&mut self, cmd: Command, chan: Channel) -> Result<()> {
        self.put_command(cmd)?;
        self.put_value(&chan)
    }

    /// Echo a command through the unsigned codec to acknowledge success.
    /// The echo is hex-encoded and terminated, never a raw byte.
    pub fn reply(&mut self, cmd: Command) -> Result<()> {
        self.put_value(&cmd)
    }

    /// Send the error sentinel where an echo would appear. Always reports
    /// failure so responder branches can `return proto.reply_error()`.
    pub fn reply_error(&mut self) -> bool {
        let _ = self.put_value(&ERROR);
        false
    }

    /// Read one command-coded value and require it to equal `cmd`. Reading
    /// the error sentinel or any other value is a framing failure.
    pub fn check_reply(&mut self, cmd: Command) -> Result<()> {
        let answer: Command = self.get_value()?;
        if answer == cmd {
            Ok(())
        } else {
            Err(ProtocolError::Framing {
                expected: cmd,
                actual: answer,
            })
        }
    }

    /// Non-blocking probe for an incoming command byte (responder role).
    pub fn has_command(&mut self) -> bool {
        match self.transport.as_mut() {
            Some(t) => t.has_byte(),
            None => false,
        }
    }

    /// Blocking read of one raw command byte.
    pub fn get_command(&mut self) -> Result<Command> {
        let (transport, _) = self.parts()?;
        transport
            .read_byte()
            .ok_or(ProtocolError::Io(IoKind::Timeout))
    }
}
