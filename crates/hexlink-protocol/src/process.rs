//! Responder-side command handling.
//!
//! Each `process_*` operation consumes the arguments of one accepted
//! command byte, invokes the device callback, and terminates in exactly one
//! reply: the command echo on success or the error sentinel on any internal
//! failure. The return value reports which reply went out; nothing else
//! crosses the wire. The one exception is a transport timeout mid-argument:
//! the branch returns to idle without replying at all, leaving the
//! initiator's reply check to time out.

use crate::constants::{
    Channel, Command, WireSize, SUBCMD_ARRAY_ELEMENT, SUBCMD_ARRAY_FINISHED, SUBCMD_ARRAY_SIZE,
    SUBCMD_ARRAY_STARTING,
};
use crate::engine::HexProtocol;
use crate::error::{IoKind, ProtocolError};
use crate::transport::Transport;
use crate::value::WireValue;

/// Element storage behind the array sub-command streams.
///
/// One store backs one array command. It survives across the individual
/// exchanges of a transfer: the capacity answers the size query on set, the
/// element branch writes bounds-checked slots, and the finished branch
/// records the final length. On get, the current elements are served.
#[derive(Debug, Clone)]
pub struct ArrayStore<V> {
    elems: Vec<V>,
    capacity: usize,
}

impl<V: Default> ArrayStore<V> {
    /// An empty store advertising `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        ArrayStore {
            elems: Vec::new(),
            capacity,
        }
    }
}

impl<V> ArrayStore<V> {
    /// A store pre-loaded with elements to serve on get.
    pub fn with_elems(capacity: usize, elems: Vec<V>) -> Self {
        ArrayStore { elems, capacity }
    }

    /// Advertised maximum number of elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of elements.
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// Whether the store currently holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// The stored elements.
    pub fn as_slice(&self) -> &[V] {
        &self.elems
    }
}

impl<V: Default> ArrayStore<V> {
    /// Store `elem` at `index`, growing intermediate slots with defaults.
    /// Fails when the index is at or beyond the capacity.
    pub fn set_element(&mut self, index: usize, elem: V) -> bool {
        if index >= self.capacity {
            return false;
        }
        if index >= self.elems.len() {
            self.elems.resize_with(index + 1, V::default);
        }
        self.elems[index] = elem;
        true
    }

    /// Record the final length of a completed set transfer.
    pub fn finish(&mut self, len: usize) -> bool {
        if len > self.capacity {
            return false;
        }
        if len < self.elems.len() {
            self.elems.truncate(len);
        } else {
            self.elems.resize_with(len, V::default);
        }
        true
    }
}

impl<T: Transport> HexProtocol<T> {
    /// Consume one argument payload. A timeout aborts the branch silently;
    /// any other failure earns the error reply. The `Err` value is what
    /// the calling `process_*` should return.
    fn get_arg<V: WireValue>(&mut self) -> Result<V, bool> {
        match self.get_value::<V>() {
            Ok(value) => Ok(value),
            Err(ProtocolError::Io(IoKind::Timeout)) => Err(false),
            Err(_) => Err(self.reply_error()),
        }
    }

    /// Bounded-string variant of [`HexProtocol::get_arg`].
    fn get_string_arg(&mut self, max_len: usize) -> Result<String, bool> {
        match self.get_string_bounded(max_len) {
            Ok(s) => Ok(s),
            Err(ProtocolError::Io(IoKind::Timeout)) => Err(false),
            Err(_) => Err(self.reply_error()),
        }
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Handle a task command.
    pub fn process_task(&mut self, cmd: Command, task: impl FnOnce() -> bool) -> bool {
        if task() {
            self.reply(cmd).is_ok()
        } else {
            self.reply_error()
        }
    }

    /// Handle a task command addressed to a channel.
    pub fn process_channel_task(
        &mut self,
        cmd: Command,
        task: impl FnOnce(Channel) -> bool,
    ) -> bool {
        let chan = match self.get_arg::<Channel>() {
            Ok(c) => c,
            Err(out) => return out,
        };
        self.process_task(cmd, || task(chan))
    }

    // ------------------------------------------------------------------
    // Single and paired values
    // ------------------------------------------------------------------

    /// Handle a set command: one argument in, callback, echo.
    pub fn process_set<V: WireValue>(&mut self, cmd: Command, set: impl FnOnce(V) -> bool) -> bool {
        let value = match self.get_arg::<V>() {
            Ok(v) => v,
            Err(out) => return out,
        };
        if set(value) {
            self.reply(cmd).is_ok()
        } else {
            self.reply_error()
        }
    }

    /// Handle a two-argument set command.
    pub fn process_set2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        set: impl FnOnce(V, U) -> bool,
    ) -> bool {
        let first = match self.get_arg::<V>() {
            Ok(v) => v,
            Err(out) => return out,
        };
        self.process_set(cmd, |second| set(first, second))
    }

    /// Handle a channel set command.
    pub fn process_channel_set<V: WireValue>(
        &mut self,
        cmd: Command,
        set: impl FnOnce(Channel, V) -> bool,
    ) -> bool {
        let chan = match self.get_arg::<Channel>() {
            Ok(c) => c,
            Err(out) => return out,
        };
        self.process_set(cmd, |value| set(chan, value))
    }

    /// Handle a channel two-argument set command.
    pub fn process_channel_set2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        set: impl FnOnce(Channel, V, U) -> bool,
    ) -> bool {
        let chan = match self.get_arg::<Channel>() {
            Ok(c) => c,
            Err(out) => return out,
        };
        self.process_set2(cmd, |first, second| set(chan, first, second))
    }

    /// Handle a get command: callback produces the value, echo precedes it.
    pub fn process_get<V: WireValue>(
        &mut self,
        cmd: Command,
        get: impl FnOnce() -> Option<V>,
    ) -> bool {
        match get() {
            Some(value) => self.reply(cmd).is_ok() && self.put_value(&value).is_ok(),
            None => self.reply_error(),
        }
    }

    /// Handle a two-value get command.
    pub fn process_get2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        get: impl FnOnce() -> Option<(V, U)>,
    ) -> bool {
        match get() {
            Some((first, second)) => {
                self.reply(cmd).is_ok()
                    && self.put_value(&first).is_ok()
                    && self.put_value(&second).is_ok()
            }
            None => self.reply_error(),
        }
    }

    /// Handle a channel get command.
    pub fn process_channel_get<V: WireValue>(
        &mut self,
        cmd: Command,
        get: impl FnOnce(Channel) -> Option<V>,
    ) -> bool {
        let chan = match self.get_arg::<Channel>() {
            Ok(c) => c,
            Err(out) => return out,
        };
        self.process_get(cmd, || get(chan))
    }

    /// Handle a channel two-value get command.
    pub fn process_channel_get2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        get: impl FnOnce(Channel) -> Option<(V, U)>,
    ) -> bool {
        let chan = match self.get_arg::<Channel>() {
            Ok(c) => c,
            Err(out) => return out,
        };
        self.process_get2(cmd, || get(chan))
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Handle a set-string command with a caller-imposed length bound.
    pub fn process_set_string(
        &mut self,
        cmd: Command,
        max_len: usize,
        set: impl FnOnce(String) -> bool,
    ) -> bool {
        let s = match self.get_string_arg(max_len) {
            Ok(s) => s,
            Err(out) => return out,
        };
        if set(s) {
            self.reply(cmd).is_ok()
        } else {
            self.reply_error()
        }
    }

    /// Handle a channel set-string command.
    pub fn process_channel_set_string(
        &mut self,
        cmd: Command,
        max_len: usize,
        set: impl FnOnce(Channel, String) -> bool,
    ) -> bool {
        let chan = match self.get_arg::<Channel>() {
            Ok(c) => c,
            Err(out) => return out,
        };
        self.process_set_string(cmd, max_len, |s| set(chan, s))
    }

    /// Handle a get-string command.
    pub fn process_get_string(
        &mut self,
        cmd: Command,
        get: impl FnOnce() -> Option<String>,
    ) -> bool {
        match get() {
            Some(s) => self.reply(cmd).is_ok() && self.put_string(&s).is_ok(),
            None => self.reply_error(),
        }
    }

    /// Handle a channel get-string command.
    pub fn process_channel_get_string(
        &mut self,
        cmd: Command,
        get: impl FnOnce(Channel) -> Option<String>,
    ) -> bool {
        let chan = match self.get_arg::<Channel>() {
            Ok(c) => c,
            Err(out) => return out,
        };
        self.process_get_string(cmd, || get(chan))
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    /// Handle one exchange of a set-array stream, branching on the
    /// sub-command. The optional `after_set` task runs when the finished
    /// marker arrives, before the echo.
    pub fn process_set_array<V: WireValue + Default>(
        &mut self,
        cmd: Command,
        store: &mut ArrayStore<V>,
        after_set: Option<&mut dyn FnMut() -> bool>,
    ) -> bool {
        let sub = match self.get_arg::<Command>() {
            Ok(s) => s,
            Err(out) => return out,
        };
        match sub {
            SUBCMD_ARRAY_SIZE => {
                self.reply(cmd).is_ok() && self.put_value(&(store.capacity() as WireSize)).is_ok()
            }
            SUBCMD_ARRAY_ELEMENT => {
                let index = match self.get_arg::<WireSize>() {
                    Ok(i) => i,
                    Err(out) => return out,
                };
                let elem = match self.get_arg::<V>() {
                    Ok(e) => e,
                    Err(out) => return out,
                };
                if store.set_element(usize::from(index), elem) {
                    self.reply(cmd).is_ok()
                } else {
                    self.reply_error()
                }
            }
            SUBCMD_ARRAY_FINISHED => {
                let len = match self.get_arg::<WireSize>() {
                    Ok(n) => n,
                    Err(out) => return out,
                };
                if !store.finish(usize::from(len)) {
                    return self.reply_error();
                }
                if let Some(task) = after_set {
                    if !task() {
                        return self.reply_error();
                    }
                }
                self.reply(cmd).is_ok()
            }
            _ => self.reply_error(),
        }
    }

    /// Handle one exchange of a get-array stream. The optional
    /// `before_get` task runs when the starting marker arrives, before the
    /// echo.
    pub fn process_get_array<V: WireValue>(
        &mut self,
        cmd: Command,
        store: &ArrayStore<V>,
        before_get: Option<&mut dyn FnMut() -> bool>,
    ) -> bool {
        let sub = match self.get_arg::<Command>() {
            Ok(s) => s,
            Err(out) => return out,
        };
        match sub {
            SUBCMD_ARRAY_STARTING => {
                if let Some(task) = before_get {
                    if !task() {
                        return self.reply_error();
                    }
                }
                self.reply(cmd).is_ok()
            }
            SUBCMD_ARRAY_SIZE => {
                self.reply(cmd).is_ok() && self.put_value(&(store.len() as WireSize)).is_ok()
            }
            SUBCMD_ARRAY_ELEMENT => {
                let index = match self.get_arg::<WireSize>() {
                    Ok(i) => i,
                    Err(out) => return out,
                };
                match store.as_slice().get(usize::from(index)) {
                    Some(elem) => self.reply(cmd).is_ok() && self.put_value(elem).is_ok(),
                    None => self.reply_error(),
                }
            }
            _ => self.reply_error(),
        }
    }

    /// Channel variant of [`HexProtocol::process_set_array`]: the channel
    /// selects one store from the slice.
    pub fn process_channel_set_array<V: WireValue + Default>(
        &mut self,
        cmd: Command,
        stores: &mut [ArrayStore<V>],
        after_set: Option<&mut dyn FnMut() -> bool>,
    ) -> bool {
        let chan = match self.get_arg::<Channel>() {
            Ok(c) => c,
            Err(out) => return out,
        };
        match usize::try_from(chan).ok().and_then(|i| stores.get_mut(i)) {
            Some(store) => self.process_set_array(cmd, store, after_set),
            None => self.reply_error(),
        }
    }

    /// Channel variant of [`HexProtocol::process_get_array`].
    pub fn process_channel_get_array<V: WireValue>(
        &mut self,
        cmd: Command,
        stores: &[ArrayStore<V>],
        before_get: Option<&mut dyn FnMut() -> bool>,
    ) -> bool {
        let chan = match self.get_arg::<Channel>() {
            Ok(c) => c,
            Err(out) => return out,
        };
        match usize::try_from(chan).ok().and_then(|i| stores.get(i)) {
            Some(store) => self.process_get_array(cmd, store, before_get),
            None => self.reply_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_bounds_checked_writes() {
        let mut store: ArrayStore<u16> = ArrayStore::new(2);
        assert!(store.set_element(0, 10));
        assert!(store.set_element(1, 20));
        assert!(!store.set_element(2, 30));
        assert_eq!(store.as_slice(), &[10, 20]);
    }

    #[test]
    fn test_store_grows_through_gaps_with_defaults() {
        let mut store: ArrayStore<u16> = ArrayStore::new(4);
        assert!(store.set_element(2, 99));
        assert_eq!(store.as_slice(), &[0, 0, 99]);
    }

    #[test]
    fn test_store_finish_truncates_and_rejects_excess() {
        let mut store: ArrayStore<u16> = ArrayStore::new(4);
        store.set_element(0, 1);
        store.set_element(1, 2);
        store.set_element(2, 3);
        assert!(store.finish(2));
        assert_eq!(store.as_slice(), &[1, 2]);
        assert!(!store.finish(5));
    }
}
