//! Interfaces consumed from the hardware bring-up layer.
//!
//! The ring never touches peripheral registers itself. A board support crate
//! implements [`TransferEngine`] for one DMA channel and [`ChannelPool`] for
//! the channel allocator, and routes the completion interrupt through a
//! [`Dispatcher`](crate::dispatch::Dispatcher).

use core::sync::atomic::AtomicU32;

use crate::config::{Direction, TransferSize};

/// Handle of one hardware transfer channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelId(pub u8);

impl ChannelId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Address of the peripheral FIFO register the engine reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortAddress(pub usize);

/// One claimed hardware transfer channel.
///
/// All methods except [`configure`](Self::configure) may be called from
/// interrupt context and must not block.
pub trait TransferEngine {
    /// Channel this engine drives; used as the dispatcher key.
    fn channel(&self) -> ChannelId;

    /// Program the fixed side of every transfer: the peripheral FIFO, the
    /// request line pacing it, the direction and the beat size.
    fn configure(
        &mut self,
        request_line: u32,
        port: PortAddress,
        direction: Direction,
        size: TransferSize,
    );

    /// Point the next transfer at `buffer` for `transfers` beats.
    ///
    /// The engine keeps using `buffer.as_ptr()` after this call returns.
    /// The ring guarantees the storage outlives the transfer by disabling
    /// the engine before it stops.
    fn arm(&mut self, buffer: &[AtomicU32], transfers: usize);

    /// Start the first armed transfer.
    fn start(&mut self);

    /// Clear the completion interrupt for this channel.
    fn acknowledge(&mut self);

    /// Abort any transfer and mask the completion interrupt.
    fn disable(&mut self);
}

/// Allocator of hardware transfer channels.
pub trait ChannelPool {
    type Engine: TransferEngine;

    /// Claim a free channel, or `None` if all are in use.
    fn claim(&mut self) -> Option<Self::Engine>;

    /// Return a previously claimed channel.
    fn release(&mut self, engine: Self::Engine);

    /// Number of channels currently free.
    fn available(&self) -> usize;
}
