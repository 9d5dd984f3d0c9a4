//! # audio-ring
//!
//! A `no_std`, zero-allocation ring of fixed-size DMA buffers that streams
//! 32-bit words between task code and a one-directional, interrupt-driven
//! hardware transfer engine (typically a DMA channel feeding a PIO or SAI
//! FIFO). It is the buffering layer under I2S and SPI sample ports.
//!
//! The hardware must never starve and the task must never touch a buffer
//! the hardware is transferring. Both guarantees come from two lock-free
//! hand-offs: a per-buffer `empty` flag and the hardware's `current` index,
//! all plain atomics with acquire/release ordering.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Memory | [`ring`] | Buffers, hardware position, lifecycle |
//! | I/O | [`io`] | Interrupt-side agent, task-side port, sample packing |
//! | Hardware | [`hal`] | Traits the board support layer implements |
//! | Dispatch | [`dispatch`] | Channel → handler table for shared DMA vectors |
//!
//! ## Quick start
//!
//! ```ignore
//! use audio_ring::{AudioRing, Direction, RingConfig, SharedDispatcher, TransferAgent};
//! use audio_ring::hal::PortAddress;
//!
//! static TX: AudioRing<6, 64> = AudioRing::new(RingConfig::new(Direction::Output));
//! static DMA: SharedDispatcher<TransferAgent<'static, BoardDma, 6, 64>> =
//!     SharedDispatcher::new();
//!
//! let mut port = TX.begin(&mut dma_channels, &DMA, dreq, PortAddress(fifo))?;
//! for word in samples {
//!     port.write(word, true)?;
//! }
//! port.flush()?;
//!
//! // In the DMA interrupt:
//! DMA.dispatch_pending(|ch| dma_irq_status(ch));
//! ```
//!
//! ## Timing
//!
//! With `BUFFERS` buffers of `WORDS` words, the output cursor starts one
//! full buffer ahead of the armed buffer, so a writer has one buffer period
//! of slack before the hardware falls back to silence. Missed deadlines are
//! not errors: they set a sticky flag read by
//! [`StreamPort::over_underflow`].

#![no_std]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod hal;
pub mod io;
pub mod ring;

#[cfg(test)]
mod testing;

pub use config::{Direction, RingConfig, SampleWidth, TransferSize};
pub use dispatch::{CompletionHandler, Dispatcher, Registry, SharedDispatcher};
pub use error::Error;
pub use io::{StreamPort, TransferAgent};
pub use ring::{AudioRing, DefaultRing, RingState};
