//! Command registration for the responder role.
//!
//! A [`CommandTable`] maps each command byte to a boxed handler closure.
//! The `on_*` registrars wrap the typed `process_*` operations so device
//! code registers plain callbacks; the poll entry point reads one pending
//! command byte and dispatches it, answering unregistered commands with the
//! error sentinel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::constants::{Channel, Command};
use crate::engine::HexProtocol;
use crate::process::ArrayStore;
use crate::transport::Transport;
use crate::value::WireValue;

type Handler<T> = Box<dyn FnMut(&mut HexProtocol<T>, Command) -> bool + Send>;

/// Shared array storage a registered handler and the device logic can both
/// reach. The mutex tolerates poisoning: a panicked holder must not wedge
/// the responder loop.
pub type SharedArrayStore<V> = Arc<Mutex<ArrayStore<V>>>;

/// Wrap a store for registration.
pub fn shared_store<V>(store: ArrayStore<V>) -> SharedArrayStore<V> {
    Arc::new(Mutex::new(store))
}

fn lock_store<V>(store: &SharedArrayStore<V>) -> std::sync::MutexGuard<'_, ArrayStore<V>> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The responder's command-to-handler mapping.
pub struct CommandTable<T> {
    handlers: HashMap<Command, Handler<T>>,
}

impl<T> Default for CommandTable<T> {
    fn default() -> Self {
        CommandTable::new()
    }
}

impl<T> CommandTable<T> {
    /// An empty table.
    pub fn new() -> Self {
        CommandTable {
            handlers: HashMap::new(),
        }
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T: Transport> CommandTable<T> {
    /// Register a raw handler for `cmd`, replacing any previous one.
    pub fn register(
        &mut self,
        cmd: Command,
        handler: impl FnMut(&mut HexProtocol<T>, Command) -> bool + Send + 'static,
    ) {
        self.handlers.insert(cmd, Box::new(handler));
    }

    /// Register a task callback.
    pub fn on_task(&mut self, cmd: Command, mut task: impl FnMut() -> bool + Send + 'static) {
        self.register(cmd, move |proto, c| proto.process_task(c, &mut task));
    }

    /// Register a channel task callback.
    pub fn on_channel_task(
        &mut self,
        cmd: Command,
        mut task: impl FnMut(Channel) -> bool + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| proto.process_channel_task(c, &mut task));
    }

    /// Register a single-value set callback.
    pub fn on_set<V: WireValue>(
        &mut self,
        cmd: Command,
        mut set: impl FnMut(V) -> bool + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| proto.process_set(c, &mut set));
    }

    /// Register a two-value set callback.
    pub fn on_set2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        mut set: impl FnMut(V, U) -> bool + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_set2(c, |v, u| set(v, u))
        });
    }

    /// Register a channel single-value set callback.
    pub fn on_channel_set<V: WireValue>(
        &mut self,
        cmd: Command,
        mut set: impl FnMut(Channel, V) -> bool + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_channel_set(c, |chan, v| set(chan, v))
        });
    }

    /// Register a channel two-value set callback.
    pub fn on_channel_set2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        mut set: impl FnMut(Channel, V, U) -> bool + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_channel_set2(c, |chan, v, u| set(chan, v, u))
        });
    }

    /// Register a single-value get callback.
    pub fn on_get<V: WireValue>(
        &mut self,
        cmd: Command,
        mut get: impl FnMut() -> Option<V> + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| proto.process_get(c, &mut get));
    }

    /// Register a two-value get callback.
    pub fn on_get2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        mut get: impl FnMut() -> Option<(V, U)> + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| proto.process_get2(c, &mut get));
    }

    /// Register a channel single-value get callback.
    pub fn on_channel_get<V: WireValue>(
        &mut self,
        cmd: Command,
        mut get: impl FnMut(Channel) -> Option<V> + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_channel_get(c, |chan| get(chan))
        });
    }

    /// Register a channel two-value get callback.
    pub fn on_channel_get2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        mut get: impl FnMut(Channel) -> Option<(V, U)> + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_channel_get2(c, |chan| get(chan))
        });
    }

    /// Register a set-string callback with a length bound.
    pub fn on_set_string(
        &mut self,
        cmd: Command,
        max_len: usize,
        mut set: impl FnMut(String) -> bool + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_set_string(c, max_len, &mut set)
        });
    }

    /// Register a get-string callback.
    pub fn on_get_string(
        &mut self,
        cmd: Command,
        mut get: impl FnMut() -> Option<String> + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| proto.process_get_string(c, &mut get));
    }

    /// Register a channel set-string callback.
    pub fn on_channel_set_string(
        &mut self,
        cmd: Command,
        max_len: usize,
        mut set: impl FnMut(Channel, String) -> bool + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_channel_set_string(c, max_len, |chan, s| set(chan, s))
        });
    }

    /// Register a channel get-string callback.
    pub fn on_channel_get_string(
        &mut self,
        cmd: Command,
        mut get: impl FnMut(Channel) -> Option<String> + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_channel_get_string(c, |chan| get(chan))
        });
    }

    /// Register a set-array stream against a shared store.
    pub fn on_set_array<V: WireValue + Default + Send + 'static>(
        &mut self,
        cmd: Command,
        store: SharedArrayStore<V>,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_set_array(c, &mut *lock_store(&store), None)
        });
    }

    /// Register a set-array stream with an after-set task that runs when
    /// the finished marker arrives.
    pub fn on_set_array_with<V: WireValue + Default + Send + 'static>(
        &mut self,
        cmd: Command,
        store: SharedArrayStore<V>,
        mut after_set: impl FnMut() -> bool + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_set_array(c, &mut *lock_store(&store), Some(&mut after_set))
        });
    }

    /// Register a get-array stream against a shared store.
    pub fn on_get_array<V: WireValue + Send + 'static>(
        &mut self,
        cmd: Command,
        store: SharedArrayStore<V>,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_get_array(c, &*lock_store(&store), None)
        });
    }

    /// Register a get-array stream with a before-get task that runs when
    /// the starting marker arrives.
    pub fn on_get_array_with<V: WireValue + Send + 'static>(
        &mut self,
        cmd: Command,
        store: SharedArrayStore<V>,
        mut before_get: impl FnMut() -> bool + Send + 'static,
    ) {
        self.register(cmd, move |proto, c| {
            proto.process_get_array(c, &*lock_store(&store), Some(&mut before_get))
        });
    }

    /// Dispatch one pending command, if any. `None` means no byte was
    /// waiting; `Some(replied_ok)` reports whether the handler echoed the
    /// command or answered with the error sentinel.
    pub fn poll_once(&mut self, proto: &mut HexProtocol<T>) -> Option<bool> {
        if !proto.has_command() {
            return None;
        }
        let cmd = match proto.get_command() {
            Ok(cmd) => cmd,
            Err(_) => return Some(false),
        };
        match self.handlers.get_mut(&cmd) {
            Some(handler) => Some(handler(proto, cmd)),
            None => Some(proto.reply_error()),
        }
    }
}
