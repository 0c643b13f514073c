//! Session ownership and the transaction guard.
//!
//! Host threads share one [`Session`] per serial link. Every exchange runs
//! inside a [`Transaction`]: acquiring it locks the session's stream and
//! resets the wire log, dropping it releases the lock and commits the log,
//! on every exit path including unwinding. Exchanges on one session can
//! therefore never interleave on the wire.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::engine::HexProtocol;
use crate::transport::Transport;

/// A shared protocol session guarded by a stream lock.
#[derive(Debug)]
pub struct Session<T> {
    inner: Mutex<HexProtocol<T>>,
}

impl<T: Transport> Session<T> {
    /// Wrap an engine (started or not) for shared use.
    pub fn new(proto: HexProtocol<T>) -> Self {
        Session {
            inner: Mutex::new(proto),
        }
    }

    /// Convenience constructor: a session started on `transport`.
    pub fn started(transport: T) -> Self {
        let mut proto = HexProtocol::new();
        proto.start(transport);
        Session::new(proto)
    }

    /// Begin an exchange: lock the stream and reset the wire log. The lock
    /// is held until the returned guard drops.
    pub fn transaction(&self) -> Transaction<'_, T> {
        let mut guard = self.lock();
        guard.log_mut().begin();
        Transaction { guard }
    }

    /// The wire log of the last completed exchange. Only meaningful
    /// between exchanges.
    pub fn last_log(&self) -> String {
        self.lock().log().last().to_string()
    }

    /// End the underlying session, handing back the transport.
    pub fn end(&self) -> Option<T> {
        self.lock().end()
    }

    /// Consume the session and recover the engine.
    pub fn into_inner(self) -> HexProtocol<T> {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // A panicked exchange must not wedge the link for every other thread,
    // so poisoning is ignored and the lock recovered.
    fn lock(&self) -> MutexGuard<'_, HexProtocol<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped ownership of one exchange on a session.
///
/// Derefs to the engine so dispatch chains run directly on the guard.
#[derive(Debug)]
pub struct Transaction<'a, T: Transport> {
    guard: MutexGuard<'a, HexProtocol<T>>,
}

impl<T: Transport> Deref for Transaction<'_, T> {
    type Target = HexProtocol<T>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T: Transport> DerefMut for Transaction<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T: Transport> Drop for Transaction<'_, T> {
    fn drop(&mut self) {
        self.guard.log_mut().commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;

    #[test]
    fn test_transaction_commits_log_on_drop() {
        let (near, mut far) = ChannelTransport::pair();
        let session = Session::started(near);

        far.write_all(b"4d\x04");
        {
            let mut txn = session.transaction();
            txn.dispatch_set(0x4d, &0x1fu16).expect("exchange succeeds");
        }
        assert_eq!(session.last_log(), "M=0x4d: [1f\x04] {4d\x04} ");
    }

    #[test]
    fn test_next_transaction_resets_log() {
        let (near, mut far) = ChannelTransport::pair();
        let session = Session::started(near);

        far.write_all(b"41\x04");
        {
            let mut txn = session.transaction();
            txn.dispatch_task(0x41).expect("exchange succeeds");
        }
        far.write_all(b"42\x04");
        {
            let mut txn = session.transaction();
            txn.dispatch_task(0x42).expect("exchange succeeds");
        }
        assert_eq!(session.last_log(), "B=0x42: {42\x04} ");
    }

    #[test]
    fn test_log_commits_even_when_exchange_fails() {
        let (mut near, _far) = ChannelTransport::pair();
        near.set_timeout(std::time::Duration::from_millis(10));
        let session = Session::started(near);
        {
            let mut txn = session.transaction();
            assert!(txn.dispatch_task(0x41).is_err());
        }
        assert_eq!(session.last_log(), "A=0x41: {empty} ");
    }

    #[test]
    fn test_exchanges_serialise_across_threads() {
        let (near, mut far) = ChannelTransport::pair();
        let session = std::sync::Arc::new(Session::started(near));

        // Echo every command the two initiator threads will send.
        let echo = std::thread::spawn(move || {
            for _ in 0..20 {
                let cmd = far.read_byte().expect("command byte");
                let payload = far
                    .read_until_terminator(9, crate::constants::TERM)
                    .expect("value payload");
                assert!(!payload.is_empty());
                far.write_all(format!("{cmd:x}\x04").as_bytes());
            }
        });

        let mut workers = Vec::new();
        for _ in 0..2 {
            let session = std::sync::Arc::clone(&session);
            workers.push(std::thread::spawn(move || {
                for _ in 0..10 {
                    let mut txn = session.transaction();
                    txn.dispatch_set(0x4d, &7u16).expect("exchange succeeds");
                }
            }));
        }
        for worker in workers {
            worker.join().expect("worker finishes");
        }
        echo.join().expect("echo finishes");
    }
}
