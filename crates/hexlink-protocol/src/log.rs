//! Per-transaction wire log.
//!
//! Every initiator exchange can be captured in a compact notation: the
//! command byte as `M=0x4d: `, sends as `[..]`, receives as `{..}`, failed
//! reads as `{empty}`, with `@` separating command sequences. Brackets and
//! the hex annotation are never transmitted; they exist only in the log.
//! The transaction guard resets the buffer when an exchange begins and
//! commits it when the exchange ends, so the last committed log is readable
//! between exchanges.

/// Accumulates the wire traffic of the exchange in progress and keeps the
/// last committed exchange around for inspection.
#[derive(Debug, Default)]
pub struct TransactionLog {
    disabled: bool,
    current: String,
    last: String,
}

impl TransactionLog {
    /// A new, enabled log.
    pub fn new() -> Self {
        TransactionLog::default()
    }

    /// Turn capture on or off. Disabling also clears both buffers.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.disabled = !enabled;
        if self.disabled {
            self.current.clear();
            self.last.clear();
        }
    }

    /// Start a fresh transaction.
    pub fn begin(&mut self) {
        self.current.clear();
    }

    /// Finish the transaction, making its capture readable via
    /// [`TransactionLog::last`].
    pub fn commit(&mut self) {
        if !self.disabled {
            self.last.clear();
            self.last.push_str(&self.current);
        }
    }

    /// The last committed transaction.
    pub fn last(&self) -> &str {
        &self.last
    }

    /// Record an outgoing command byte.
    pub fn command(&mut self, cmd: u8) {
        if self.disabled {
            return;
        }
        if !self.current.is_empty() {
            self.current.push_str("@ ");
        }
        self.current.push(char::from(cmd));
        self.current.push_str(&format!("=0x{cmd:x}: "));
    }

    /// Record an outgoing buffer (terminator included).
    pub fn send(&mut self, bytes: &[u8]) {
        if self.disabled {
            return;
        }
        self.current.push('[');
        self.current.push_str(&String::from_utf8_lossy(bytes));
        self.current.push_str("] ");
    }

    /// Record an incoming payload plus the terminator that closed it.
    pub fn recv(&mut self, payload: &[u8], term: u8) {
        if self.disabled {
            return;
        }
        self.current.push('{');
        self.current.push_str(&String::from_utf8_lossy(payload));
        self.current.push(char::from(term));
        self.current.push_str("} ");
    }

    /// Record a read that produced nothing before the timeout.
    pub fn recv_empty(&mut self) {
        if self.disabled {
            return;
        }
        self.current.push_str("{empty} ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_exchange_notation() {
        let mut log = TransactionLog::new();
        log.begin();
        log.command(0x4d);
        log.send(b"1f\x04");
        log.recv(b"4d", 0x04);
        log.commit();
        assert_eq!(log.last(), "M=0x4d: [1f\x04] {4d\x04} ");
    }

    #[test]
    fn test_command_sequences_are_separated() {
        let mut log = TransactionLog::new();
        log.begin();
        log.command(0x4d);
        log.send(b"1\x04");
        log.recv(b"4d", 0x04);
        log.command(0x4d);
        log.recv_empty();
        log.commit();
        assert_eq!(log.last(), "M=0x4d: [1\x04] {4d\x04} @ M=0x4d: {empty} ");
    }

    #[test]
    fn test_begin_resets_and_commit_publishes() {
        let mut log = TransactionLog::new();
        log.begin();
        log.command(0x41);
        log.commit();
        log.begin();
        assert_eq!(log.last(), "A=0x41: ");
        log.command(0x42);
        log.commit();
        assert_eq!(log.last(), "B=0x42: ");
    }

    #[test]
    fn test_disabled_log_captures_nothing() {
        let mut log = TransactionLog::new();
        log.set_enabled(false);
        log.begin();
        log.command(0x4d);
        log.commit();
        assert_eq!(log.last(), "");
    }
}
