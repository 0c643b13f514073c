//! Initiator-side exchange chains.
//!
//! Every exchange is a strict left-to-right chain: command byte out,
//! arguments out, reply echo back, results back. The `?` operator carries
//! the original short-circuit discipline: the first failing step aborts the
//! chain and nothing after it touches the wire. Callers are expected to run
//! each dispatch inside a [`crate::session::Transaction`] guard.

use crate::constants::{
    Channel, Command, WireSize, SUBCMD_ARRAY_ELEMENT, SUBCMD_ARRAY_FINISHED, SUBCMD_ARRAY_SIZE,
    SUBCMD_ARRAY_STARTING,
};
use crate::engine::HexProtocol;
use crate::error::{ProtocolError, Result};
use crate::transport::Transport;
use crate::value::WireValue;

impl<T: Transport> HexProtocol<T> {
    /// Open an exchange: the command byte, optionally followed by the
    /// channel it addresses.
    fn open(&mut self, cmd: Command, chan: Option<Channel>) -> Result<()> {
        match chan {
            Some(chan) => self.put_channel_command(cmd, chan),
            None => self.put_command(cmd),
        }
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Run a remote task with no arguments or results.
    pub fn dispatch_task(&mut self, cmd: Command) -> Result<()> {
        self.put_command(cmd)?;
        self.check_reply(cmd)
    }

    /// Run a remote task on a specific channel.
    pub fn dispatch_channel_task(&mut self, cmd: Command, chan: Channel) -> Result<()> {
        self.put_channel_command(cmd, chan)?;
        self.check_reply(cmd)
    }

    // ------------------------------------------------------------------
    // Single and paired values
    // ------------------------------------------------------------------

    /// Fetch one value.
    pub fn dispatch_get<V: WireValue>(&mut self, cmd: Command) -> Result<V> {
        self.put_command(cmd)?;
        self.check_reply(cmd)?;
        self.get_value()
    }

    /// Fetch two values.
    pub fn dispatch_get2<V: WireValue, U: WireValue>(&mut self, cmd: Command) -> Result<(V, U)> {
        self.put_command(cmd)?;
        self.check_reply(cmd)?;
        let first = self.get_value()?;
        let second = self.get_value()?;
        Ok((first, second))
    }

    /// Fetch a string. The responder echoes first, then sends the payload.
    pub fn dispatch_get_string(&mut self, cmd: Command) -> Result<String> {
        self.put_command(cmd)?;
        self.check_reply(cmd)?;
        self.get_string()
    }

    /// Send one value.
    pub fn dispatch_set<V: WireValue>(&mut self, cmd: Command, value: &V) -> Result<()> {
        self.put_command(cmd)?;
        self.put_value(value)?;
        self.check_reply(cmd)
    }

    /// Send two values.
    pub fn dispatch_set2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        first: &V,
        second: &U,
    ) -> Result<()> {
        self.put_command(cmd)?;
        self.put_value(first)?;
        self.put_value(second)?;
        self.check_reply(cmd)
    }

    /// Send a string.
    pub fn dispatch_set_string(&mut self, cmd: Command, s: &str) -> Result<()> {
        self.put_command(cmd)?;
        self.put_string(s)?;
        self.check_reply(cmd)
    }

    /// Channel variant of [`HexProtocol::dispatch_get`].
    pub fn dispatch_channel_get<V: WireValue>(
        &mut self,
        cmd: Command,
        chan: Channel,
    ) -> Result<V> {
        self.put_channel_command(cmd, chan)?;
        self.check_reply(cmd)?;
        self.get_value()
    }

    /// Channel variant of [`HexProtocol::dispatch_get2`].
    pub fn dispatch_channel_get2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        chan: Channel,
    ) -> Result<(V, U)> {
        self.put_channel_command(cmd, chan)?;
        self.check_reply(cmd)?;
        let first = self.get_value()?;
        let second = self.get_value()?;
        Ok((first, second))
    }

    /// Channel variant of [`HexProtocol::dispatch_get_string`].
    pub fn dispatch_channel_get_string(&mut self, cmd: Command, chan: Channel) -> Result<String> {
        self.put_channel_command(cmd, chan)?;
        self.check_reply(cmd)?;
        self.get_string()
    }

    /// Channel variant of [`HexProtocol::dispatch_set`].
    pub fn dispatch_channel_set<V: WireValue>(
        &mut self,
        cmd: Command,
        chan: Channel,
        value: &V,
    ) -> Result<()> {
        self.put_channel_command(cmd, chan)?;
        self.put_value(value)?;
        self.check_reply(cmd)
    }

    /// Channel variant of [`HexProtocol::dispatch_set2`].
    pub fn dispatch_channel_set2<V: WireValue, U: WireValue>(
        &mut self,
        cmd: Command,
        chan: Channel,
        first: &V,
        second: &U,
    ) -> Result<()> {
        self.put_channel_command(cmd, chan)?;
        self.put_value(first)?;
        self.put_value(second)?;
        self.check_reply(cmd)
    }

    /// Channel variant of [`HexProtocol::dispatch_set_string`].
    pub fn dispatch_channel_set_string(
        &mut self,
        cmd: Command,
        chan: Channel,
        s: &str,
    ) -> Result<()> {
        self.put_channel_command(cmd, chan)?;
        self.put_string(s)?;
        self.check_reply(cmd)
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    /// Query the maximum capacity of the remote array buffer.
    pub fn dispatch_get_array_max_size(&mut self, cmd: Command) -> Result<WireSize> {
        self.array_size_query(cmd, None)
    }

    /// Query the current length of the remote array.
    pub fn dispatch_get_array_size(&mut self, cmd: Command) -> Result<WireSize> {
        self.array_size_query(cmd, None)
    }

    /// Channel variant of [`HexProtocol::dispatch_get_array_max_size`].
    pub fn dispatch_channel_get_array_max_size(
        &mut self,
        cmd: Command,
        chan: Channel,
    ) -> Result<WireSize> {
        self.array_size_query(cmd, Some(chan))
    }

    /// Channel variant of [`HexProtocol::dispatch_get_array_size`].
    pub fn dispatch_channel_get_array_size(
        &mut self,
        cmd: Command,
        chan: Channel,
    ) -> Result<WireSize> {
        self.array_size_query(cmd, Some(chan))
    }

    fn array_size_query(&mut self, cmd: Command, chan: Option<Channel>) -> Result<WireSize> {
        self.open(cmd, chan)?;
        self.put_value(&SUBCMD_ARRAY_SIZE)?;
        self.check_reply(cmd)?;
        self.get_value()
    }

    /// Stream an array to the responder, one element per exchange. The
    /// remote capacity is queried first; the transfer always closes with
    /// the finished sub-command carrying the final length.
    pub fn dispatch_set_array<V: WireValue>(&mut self, cmd: Command, elems: &[V]) -> Result<()> {
        self.set_array_inner(cmd, None, elems)
    }

    /// Channel variant of [`HexProtocol::dispatch_set_array`].
    pub fn dispatch_channel_set_array<V: WireValue>(
        &mut self,
        cmd: Command,
        chan: Channel,
        elems: &[V],
    ) -> Result<()> {
        self.set_array_inner(cmd, Some(chan), elems)
    }

    fn set_array_inner<V: WireValue>(
        &mut self,
        cmd: Command,
        chan: Option<Channel>,
        elems: &[V],
    ) -> Result<()> {
        let len = elems.len();
        let max = self.array_size_query(cmd, chan)?;
        if len > usize::from(max) {
            return Err(ProtocolError::PayloadTooLarge {
                len,
                limit: usize::from(max),
            });
        }
        for (i, elem) in elems.iter().enumerate() {
            self.open(cmd, chan)?;
            self.put_value(&SUBCMD_ARRAY_ELEMENT)?;
            self.put_value(&(i as WireSize))?;
            self.put_value(elem)?;
            self.check_reply(cmd)?;
        }
        self.open(cmd, chan)?;
        self.put_value(&SUBCMD_ARRAY_FINISHED)?;
        self.put_value(&(len as WireSize))?;
        self.check_reply(cmd)
    }

    /// Stream an array from the responder. `max_len` bounds the caller's
    /// buffer; a longer remote array fails before any element moves.
    pub fn dispatch_get_array<V: WireValue>(
        &mut self,
        cmd: Command,
        max_len: usize,
    ) -> Result<Vec<V>> {
        self.get_array_inner(cmd, None, max_len)
    }

    /// Channel variant of [`HexProtocol::dispatch_get_array`].
    pub fn dispatch_channel_get_array<V: WireValue>(
        &mut self,
        cmd: Command,
        chan: Channel,
        max_len: usize,
    ) -> Result<Vec<V>> {
        self.get_array_inner(cmd, Some(chan), max_len)
    }

    fn get_array_inner<V: WireValue>(
        &mut self,
        cmd: Command,
        chan: Option<Channel>,
        max_len: usize,
    ) -> Result<Vec<V>> {
        self.open(cmd, chan)?;
        self.put_value(&SUBCMD_ARRAY_STARTING)?;
        self.check_reply(cmd)?;

        let size = self.array_size_query(cmd, chan)?;
        if usize::from(size) > max_len {
            return Err(ProtocolError::PayloadTooLarge {
                len: usize::from(size),
                limit: max_len,
            });
        }

        let mut out = Vec::with_capacity(usize::from(size));
        for i in 0..size {
            self.open(cmd, chan)?;
            self.put_value(&SUBCMD_ARRAY_ELEMENT)?;
            self.put_value(&i)?;
            self.check_reply(cmd)?;
            out.push(self.get_value()?);
        }
        Ok(out)
    }
}
