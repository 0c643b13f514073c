//! The cooperative responder service.
//!
//! Firmware main loops call [`ResponderService::poll`] once per iteration:
//! it never blocks while the line is idle, and once a command byte is
//! accepted it completes that exchange synchronously. [`ResponderService::run`]
//! wraps the same polling in a loop with an idle sleep for hosted targets
//! and bench rigs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hexlink_protocol::{CommandTable, HexProtocol, Transport};

/// Idle sleep between polls when nothing is pending.
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(1);

/// A protocol engine bound to a command table, polled cooperatively.
pub struct ResponderService<T> {
    proto: HexProtocol<T>,
    table: CommandTable<T>,
    idle_sleep: Duration,
}

impl<T: Transport> ResponderService<T> {
    /// A service answering on `transport` with the given handlers.
    pub fn new(transport: T, table: CommandTable<T>) -> Self {
        let mut proto = HexProtocol::new();
        proto.start(transport);
        ResponderService {
            proto,
            table,
            idle_sleep: DEFAULT_IDLE_SLEEP,
        }
    }

    /// Override the idle sleep used by [`ResponderService::run`].
    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    /// The underlying engine, for tests and shutdown plumbing.
    pub fn proto_mut(&mut self) -> &mut HexProtocol<T> {
        &mut self.proto
    }

    /// Handle at most one pending command. `None` means the line was idle.
    pub fn poll(&mut self) -> Option<bool> {
        let outcome = self.table.poll_once(&mut self.proto);
        if let Some(replied_ok) = outcome {
            if replied_ok {
                tracing::trace!("command handled");
            } else {
                tracing::debug!("command answered with error reply");
            }
        }
        outcome
    }

    /// Poll until `shutdown` is set, sleeping while idle.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            if self.poll().is_none() {
                thread::sleep(self.idle_sleep);
            }
        }
    }

    /// Spawn the service on its own thread. Returns the shutdown flag and
    /// the join handle.
    pub fn spawn(mut self) -> (Arc<AtomicBool>, thread::JoinHandle<()>)
    where
        T: Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || self.run(&flag));
        (shutdown, handle)
    }
}
