//! Task-side half of a ring.
//!
//! [`StreamPort`] is the producer (output rings) or consumer (input rings)
//! of words. It keeps a cursor (a buffer index and an offset into it)
//! that trails the hardware around the pool:
//!
//! ```text
//!  output:   cur  next  [user]  ...        user starts next + 2
//!  input:   [user] cur   next   ...        user starts cur - 1
//! ```
//!
//! The cursor only ever touches a buffer that the hardware has handed over:
//! an empty buffer for output, a full buffer for input, and never the one
//! currently transferring. Every call checks both conditions first; the
//! non-blocking form returns [`Error::WouldBlock`], the blocking form spins
//! until the completion interrupt changes them.
//!
//! The cursor itself is only touched from the task that owns the port, so
//! it needs no atomics. Everything it reads from the pool is `Acquire`.

use core::hint::spin_loop;

use crate::config::Direction;
use crate::error::Error;
use crate::ring::{AudioRing, Buffer, BufferPool, RingState};

use super::packing::{SamplePacker, SampleUnpacker};

/// Producer/consumer handle returned by [`AudioRing::begin`].
pub struct StreamPort<'a, const BUFFERS: usize, const WORDS: usize> {
    ring: &'a AudioRing<BUFFERS, WORDS>,
    /// User buffer, `None` until first use or after [`resync`](Self::resync).
    cursor: Option<usize>,
    offset: usize,
    /// Last buffer the user handed to the hardware (output only).
    committed: Option<usize>,
    packer: SamplePacker,
    unpacker: SampleUnpacker,
}

impl<'a, const BUFFERS: usize, const WORDS: usize> StreamPort<'a, BUFFERS, WORDS> {
    pub(crate) fn new(ring: &'a AudioRing<BUFFERS, WORDS>) -> Self {
        let width = ring.config().sample_width();
        StreamPort {
            ring,
            cursor: None,
            offset: 0,
            committed: None,
            packer: SamplePacker::new(width),
            unpacker: SampleUnpacker::new(width),
        }
    }

    pub fn ring(&self) -> &'a AudioRing<BUFFERS, WORDS> {
        self.ring
    }

    fn pool(&self) -> &'a BufferPool<BUFFERS, WORDS> {
        self.ring.pool()
    }

    fn direction(&self) -> Direction {
        self.pool().direction()
    }

    fn lifecycle(&self) -> Result<(), Error> {
        match self.ring.state() {
            RingState::Running => Ok(()),
            RingState::Stopped => Err(Error::Stopped),
            RingState::Uninitialized => Err(Error::NotRunning),
        }
    }

    fn check(&self, direction: Direction) -> Result<(), Error> {
        self.lifecycle()?;
        if self.direction() != direction {
            return Err(Error::WrongDirection);
        }
        Ok(())
    }

    /// Where a fresh cursor would start right now.
    fn starting_slot(&self) -> usize {
        let pool = self.pool();
        match self.direction() {
            Direction::Output => BufferPool::<BUFFERS, WORDS>::ahead(pool.next(), 2),
            Direction::Input => BufferPool::<BUFFERS, WORDS>::predecessor(pool.current()),
        }
    }

    fn cursor(&mut self) -> usize {
        match self.cursor {
            Some(slot) => slot,
            None => {
                let slot = self.starting_slot();
                self.pool().set_lead_in(slot);
                self.cursor = Some(slot);
                self.offset = 0;
                slot
            }
        }
    }

    /// `true` if the user side owns `slot` right now.
    fn owned(&self, slot: usize) -> bool {
        let pool = self.pool();
        let handed_over = match self.direction() {
            Direction::Output => pool.buffer(slot).is_empty(),
            Direction::Input => !pool.buffer(slot).is_empty(),
        };
        handed_over && slot != pool.current()
    }

    fn acquire(&self, slot: usize, sync: bool) -> Result<&'a Buffer<WORDS>, Error> {
        while !self.owned(slot) {
            if !sync {
                return Err(Error::WouldBlock);
            }
            self.lifecycle()?;
            spin_loop();
        }
        Ok(self.pool().buffer(slot))
    }

    /// Move the cursor past a finished buffer and hand it to the hardware.
    fn advance(&mut self, slot: usize, buffer: &Buffer<WORDS>) {
        match self.direction() {
            Direction::Output => {
                buffer.set_empty(false);
                self.committed = Some(slot);
            }
            Direction::Input => buffer.set_empty(true),
        }
        self.cursor = Some(BufferPool::<BUFFERS, WORDS>::successor(slot));
        self.offset = 0;
    }

    /// Queue one word for output.
    ///
    /// With `sync = false` this never waits: [`Error::WouldBlock`] means the
    /// next buffer is still owned by the hardware.
    pub fn write(&mut self, word: u32, sync: bool) -> Result<(), Error> {
        self.check(Direction::Output)?;
        let slot = self.cursor();
        let buffer = self.acquire(slot, sync)?;

        buffer.store(self.offset, word);
        self.offset += 1;
        if self.offset == WORDS {
            self.advance(slot, buffer);
        }
        Ok(())
    }

    /// Queue as many of `words` as possible, a buffer segment at a time.
    ///
    /// Returns how many words were queued. In non-blocking mode this may be
    /// fewer than `words.len()`; [`Error::WouldBlock`] only if nothing was
    /// queued. Lifecycle errors are returned even after partial progress.
    pub fn write_slice(&mut self, words: &[u32], sync: bool) -> Result<usize, Error> {
        self.check(Direction::Output)?;
        let mut written = 0;

        while written < words.len() {
            let slot = self.cursor();
            let buffer = match self.acquire(slot, sync) {
                Ok(buffer) => buffer,
                Err(Error::WouldBlock) if written > 0 => break,
                Err(e) => return Err(e),
            };

            let n = (WORDS - self.offset).min(words.len() - written);
            buffer.store_from(self.offset, &words[written..written + n]);
            written += n;
            self.offset += n;
            if self.offset == WORDS {
                self.advance(slot, buffer);
            }
        }
        Ok(written)
    }

    /// Take one word from input.
    pub fn read(&mut self, sync: bool) -> Result<u32, Error> {
        self.check(Direction::Input)?;
        let slot = self.cursor();
        let buffer = self.acquire(slot, sync)?;

        let word = buffer.load(self.offset);
        self.offset += 1;
        if self.offset == WORDS {
            self.advance(slot, buffer);
        }
        Ok(word)
    }

    /// Fill as much of `words` as possible. Same partial-progress rules as
    /// [`write_slice`](Self::write_slice).
    pub fn read_slice(&mut self, words: &mut [u32], sync: bool) -> Result<usize, Error> {
        self.check(Direction::Input)?;
        let mut read = 0;

        while read < words.len() {
            let slot = self.cursor();
            let buffer = match self.acquire(slot, sync) {
                Ok(buffer) => buffer,
                Err(Error::WouldBlock) if read > 0 => break,
                Err(e) => return Err(e),
            };

            let n = (WORDS - self.offset).min(words.len() - read);
            buffer.load_into(self.offset, &mut words[read..read + n]);
            read += n;
            self.offset += n;
            if self.offset == WORDS {
                self.advance(slot, buffer);
            }
        }
        Ok(read)
    }

    /// Words that can be written (output) or read (input) right now without
    /// blocking. Zero when the ring is not running.
    pub fn available(&self) -> usize {
        if self.lifecycle().is_err() {
            return 0;
        }

        let (start, offset) = match self.cursor {
            Some(slot) => (slot, self.offset),
            None => (self.starting_slot(), 0),
        };

        let mut avail = 0;
        for distance in 0..BUFFERS {
            let slot = BufferPool::<BUFFERS, WORDS>::ahead(start, distance);
            if !self.owned(slot) {
                break;
            }
            avail += if distance == 0 { WORDS - offset } else { WORDS };
        }
        avail
    }

    /// Read and clear the sticky over/underflow flag.
    pub fn over_underflow(&self) -> bool {
        self.pool().take_fault()
    }

    /// `true` once every buffer this port handed to the hardware has been
    /// transferred. Always `true` for input rings.
    pub fn is_drained(&self) -> bool {
        match self.committed {
            Some(slot) if self.direction() == Direction::Output => {
                self.pool().buffer(slot).is_empty()
            }
            _ => true,
        }
    }

    /// Wait until the hardware has consumed every word written so far,
    /// including the buffer the user is partway through.
    ///
    /// A partially packed sample word is written out first. A partially
    /// written buffer is committed as is; its unwritten tail already holds
    /// silence. Returns early with [`Error::Stopped`] if the ring is torn
    /// down meanwhile.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.lifecycle()?;
        if self.direction() == Direction::Input {
            return Ok(());
        }

        if let Some(word) = self.packer.take_partial() {
            self.write(word, true)?;
        }
        if let (Some(slot), true) = (self.cursor, self.offset > 0) {
            if self.owned(slot) {
                let buffer = self.pool().buffer(slot);
                self.advance(slot, buffer);
            } else {
                // Armed before it was full: the words written so far went
                // out with it. Wait for it to come back and start afresh.
                self.acquire(slot, true)?;
                self.offset = 0;
            }
        }
        while !self.is_drained() {
            self.lifecycle()?;
            spin_loop();
        }
        Ok(())
    }

    /// Drop the cursor so the next call re-places it at the standard
    /// lead/lag distance from the hardware.
    ///
    /// Use after an over/underflow to get back in step. A partially written
    /// output buffer is re-silenced; partially read input is discarded.
    pub fn resync(&mut self) {
        if let Some(slot) = self.cursor.take() {
            if self.offset > 0 && self.owned(slot) {
                let buffer = self.pool().buffer(slot);
                match self.direction() {
                    Direction::Output => buffer.fill(self.pool().silence()),
                    Direction::Input => buffer.set_empty(true),
                }
            }
        }
        self.offset = 0;
        self.packer.reset();
        self.unpacker.reset();
    }

    /// Current cursor position as `(buffer, offset)`, if placed.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.cursor.map(|slot| (slot, self.offset))
    }

    /// Queue one sample, packing narrow samples several to a word. Blocks
    /// when the ring is full.
    pub fn write_sample(&mut self, sample: i32) -> Result<(), Error> {
        self.check(Direction::Output)?;
        match self.packer.push(sample) {
            Some(word) => self.write(word, true),
            None => Ok(()),
        }
    }

    /// Queue a left/right pair.
    pub fn write_frame(&mut self, left: i32, right: i32) -> Result<(), Error> {
        self.write_sample(left)?;
        self.write_sample(right)
    }

    /// Take one sample, sign-extended from the configured width. Blocks when
    /// the ring is empty.
    pub fn read_sample(&mut self) -> Result<i32, Error> {
        self.check(Direction::Input)?;
        if self.unpacker.is_empty() {
            let word = self.read(true)?;
            self.unpacker.load(word);
        }
        // A freshly loaded word always holds at least one sample.
        Ok(self.unpacker.pop().unwrap_or_default())
    }

    /// Take a left/right pair.
    pub fn read_frame(&mut self) -> Result<(i32, i32), Error> {
        let left = self.read_sample()?;
        let right = self.read_sample()?;
        Ok((left, right))
    }
}
