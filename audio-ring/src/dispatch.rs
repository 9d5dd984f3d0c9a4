//! Completion-interrupt dispatch.
//!
//! Many DMA controllers raise a single shared interrupt for all channels.
//! The bring-up layer owns a [`Dispatcher`] (or a [`SharedDispatcher`] when
//! registration and dispatch happen in different contexts), calls
//! [`dispatch_pending`](Dispatcher::dispatch_pending) from that vector, and
//! each ring registers its transfer agent under the channel it claimed.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::constants::MAX_CHANNELS;
use crate::hal::ChannelId;

/// Something that must run once per hardware completion event.
pub trait CompletionHandler {
    fn on_complete(&mut self);
}

/// Table from channel handle to the handler that owns it.
pub trait Registry<H> {
    /// Install `handler` for `channel`. Returns the handler back if the slot
    /// is taken or out of range.
    fn register(&mut self, channel: ChannelId, handler: H) -> Result<(), H>;

    /// Remove and return the handler for `channel`.
    fn deregister(&mut self, channel: ChannelId) -> Option<H>;

    /// Run `f` on the handler registered for `channel`, if any.
    fn with_handler<T>(&mut self, channel: ChannelId, f: impl FnOnce(&mut H) -> T) -> Option<T>;
}

impl<H, R: Registry<H>> Registry<H> for &mut R {
    fn register(&mut self, channel: ChannelId, handler: H) -> Result<(), H> {
        (**self).register(channel, handler)
    }

    fn deregister(&mut self, channel: ChannelId) -> Option<H> {
        (**self).deregister(channel)
    }

    fn with_handler<T>(&mut self, channel: ChannelId, f: impl FnOnce(&mut H) -> T) -> Option<T> {
        (**self).with_handler(channel, f)
    }
}

/// Fixed-size channel → handler map, indexed directly by channel number.
pub struct Dispatcher<H, const N: usize = MAX_CHANNELS> {
    slots: [Option<H>; N],
}

impl<H, const N: usize> Dispatcher<H, N> {
    pub const fn new() -> Self {
        Dispatcher {
            slots: [const { None }; N],
        }
    }

    pub fn is_registered(&self, channel: ChannelId) -> bool {
        matches!(self.slots.get(channel.index()), Some(Some(_)))
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the handler registered for `channel`.
    pub fn get_mut(&mut self, channel: ChannelId) -> Option<&mut H> {
        self.slots.get_mut(channel.index())?.as_mut()
    }
}

impl<H: CompletionHandler, const N: usize> Dispatcher<H, N> {
    /// Run the handler for `channel`. Returns `false` if none is registered.
    pub fn dispatch(&mut self, channel: ChannelId) -> bool {
        match self.get_mut(channel) {
            Some(handler) => {
                handler.on_complete();
                true
            }
            None => false,
        }
    }

    /// Scan every channel with a registered handler and run those whose
    /// completion flag is raised. Returns how many handlers ran.
    pub fn dispatch_pending(&mut self, mut is_pending: impl FnMut(ChannelId) -> bool) -> usize {
        let mut ran = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(handler) = slot {
                if is_pending(ChannelId(index as u8)) {
                    handler.on_complete();
                    ran += 1;
                }
            }
        }
        ran
    }
}

impl<H, const N: usize> Registry<H> for Dispatcher<H, N> {
    fn register(&mut self, channel: ChannelId, handler: H) -> Result<(), H> {
        match self.slots.get_mut(channel.index()) {
            Some(slot @ None) => {
                *slot = Some(handler);
                Ok(())
            }
            _ => Err(handler),
        }
    }

    fn deregister(&mut self, channel: ChannelId) -> Option<H> {
        self.slots.get_mut(channel.index())?.take()
    }

    fn with_handler<T>(&mut self, channel: ChannelId, f: impl FnOnce(&mut H) -> T) -> Option<T> {
        self.get_mut(channel).map(f)
    }
}

impl<H, const N: usize> Default for Dispatcher<H, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`Dispatcher`] behind a critical section, usable from a `static`.
///
/// Registration from task context and dispatch from the interrupt both take
/// the critical section, so a handler is never removed while it runs.
pub struct SharedDispatcher<H, const N: usize = MAX_CHANNELS> {
    inner: Mutex<RefCell<Dispatcher<H, N>>>,
}

impl<H, const N: usize> SharedDispatcher<H, N> {
    pub const fn new() -> Self {
        SharedDispatcher {
            inner: Mutex::new(RefCell::new(Dispatcher::new())),
        }
    }

    /// Run `f` with exclusive access to the table.
    pub fn with<R>(&self, f: impl FnOnce(&mut Dispatcher<H, N>) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.inner.borrow_ref_mut(cs)))
    }

    pub fn is_registered(&self, channel: ChannelId) -> bool {
        self.with(|d| d.is_registered(channel))
    }
}

impl<H: CompletionHandler, const N: usize> SharedDispatcher<H, N> {
    /// Interrupt-side entry point for a dedicated per-channel vector.
    pub fn dispatch(&self, channel: ChannelId) -> bool {
        self.with(|d| d.dispatch(channel))
    }

    /// Interrupt-side entry point for a vector shared by all channels.
    pub fn dispatch_pending(&self, is_pending: impl FnMut(ChannelId) -> bool) -> usize {
        self.with(|d| d.dispatch_pending(is_pending))
    }
}

impl<H, const N: usize> Registry<H> for &SharedDispatcher<H, N> {
    fn register(&mut self, channel: ChannelId, handler: H) -> Result<(), H> {
        self.with(|d| d.register(channel, handler))
    }

    fn deregister(&mut self, channel: ChannelId) -> Option<H> {
        self.with(|d| d.deregister(channel))
    }

    fn with_handler<T>(&mut self, channel: ChannelId, f: impl FnOnce(&mut H) -> T) -> Option<T> {
        self.with(|d| d.with_handler(channel, f))
    }
}

impl<H, const N: usize> Default for SharedDispatcher<H, N> {
    fn default() -> Self {
        Self::new()
    }
}
