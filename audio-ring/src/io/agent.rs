//! Interrupt-side half of a ring.
//!
//! [`TransferAgent`] owns the claimed [`TransferEngine`] and runs once per
//! completion interrupt. It is installed in a
//! [`Registry`](crate::dispatch::Registry) by
//! [`AudioRing::begin`](crate::AudioRing::begin) and taken back out by
//! [`AudioRing::end`](crate::AudioRing::end); user code never holds it.
//!
//! ## Usage with RTIC
//!
//! ```ignore
//! #[task(binds = DMA0_DMA16, local = [dispatcher])]
//! fn dma_complete(cx: dma_complete::Context) {
//!     cx.local.dispatcher.dispatch_pending(|ch| dma.is_interrupt(ch.index()));
//! }
//! ```

use crate::dispatch::CompletionHandler;
use crate::hal::TransferEngine;
use crate::ring::AudioRing;

/// Completion-interrupt handler for one ring.
pub struct TransferAgent<'a, E, const BUFFERS: usize, const WORDS: usize> {
    ring: &'a AudioRing<BUFFERS, WORDS>,
    engine: E,
}

impl<'a, E: TransferEngine, const BUFFERS: usize, const WORDS: usize>
    TransferAgent<'a, E, BUFFERS, WORDS>
{
    pub(crate) fn new(ring: &'a AudioRing<BUFFERS, WORDS>, engine: E) -> Self {
        TransferAgent { ring, engine }
    }

    pub(crate) fn start(&mut self) {
        self.engine.start();
    }

    pub(crate) fn into_engine(self) -> E {
        self.engine
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn ring(&self) -> &'a AudioRing<BUFFERS, WORDS> {
        self.ring
    }

    /// Handle one completion event: rotate the pool, re-arm the engine,
    /// acknowledge the interrupt and notify the configured callback.
    ///
    /// A completion that arrives after teardown only acknowledges.
    pub fn service(&mut self) {
        if !self.ring.is_running() {
            self.engine.acknowledge();
            return;
        }

        self.ring.pool().rotate(&mut self.engine, self.ring.transfers());
        self.engine.acknowledge();

        if let Some(callback) = self.ring.config().callback {
            callback();
        }
    }
}

impl<E: TransferEngine, const BUFFERS: usize, const WORDS: usize> CompletionHandler
    for TransferAgent<'_, E, BUFFERS, WORDS>
{
    fn on_complete(&mut self) {
        self.service();
    }
}
