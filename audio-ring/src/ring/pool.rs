use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::config::Direction;
use crate::constants::{MIN_BUFFER_COUNT, NO_SLOT};
use crate::hal::TransferEngine;

use super::buffer::Buffer;

/// Circular set of DMA buffers and the hardware's position in it.
///
/// `current` is the buffer the engine is transferring. It is the only
/// stored index: [`next`](Self::next) is derived from it, so no observer can
/// ever see the two disagree. It is written only by [`rotate`](Self::rotate),
/// which runs in the completion interrupt, and read with `Acquire` by the
/// user side.
///
/// The sticky fault flag is set when the buffer about to be armed is not
/// in the state the user side should have left it in: still empty for
/// output (underflow), still full for input (overflow).
pub struct BufferPool<const BUFFERS: usize, const WORDS: usize> {
    buffers: [Buffer<WORDS>; BUFFERS],
    current: AtomicUsize,
    fault: AtomicBool,
    /// First buffer of a freshly placed user cursor, or `NO_SLOT`. Faults
    /// on the buffers armed before it are the lead gap, not user lateness.
    lead_in: AtomicUsize,
    direction: Direction,
    silence: u32,
}

impl<const BUFFERS: usize, const WORDS: usize> BufferPool<BUFFERS, WORDS> {
    /// Create a pool with every buffer empty.
    ///
    /// # Panics
    ///
    /// Compile-time when used in a `static`: `BUFFERS` must be at least 3
    /// and `WORDS` non-zero.
    pub const fn new(direction: Direction, silence: u32) -> Self {
        assert!(
            BUFFERS >= MIN_BUFFER_COUNT,
            "ring needs at least 3 buffers (transferring, armed, user)"
        );
        assert!(WORDS > 0, "buffers must hold at least one word");

        BufferPool {
            buffers: [const { Buffer::<WORDS>::new() }; BUFFERS],
            current: AtomicUsize::new(0),
            fault: AtomicBool::new(false),
            lead_in: AtomicUsize::new(NO_SLOT),
            direction,
            silence,
        }
    }

    /// Reset to the start-of-stream state: all buffers empty, output buffers
    /// holding silence, hardware on buffer 0.
    pub(crate) fn prime(&self) {
        for buffer in &self.buffers {
            if self.direction == Direction::Output {
                buffer.fill(self.silence);
            }
            buffer.set_empty(true);
        }
        self.fault.store(false, Ordering::Release);
        self.lead_in.store(NO_SLOT, Ordering::Release);
        self.current.store(0, Ordering::Release);
    }

    /// Advance the hardware by one buffer. Completion-interrupt only.
    ///
    /// Bounded: one silence fill for output, a handful of atomic operations,
    /// and one call to [`TransferEngine::arm`].
    pub(crate) fn rotate<E: TransferEngine>(&self, engine: &mut E, transfers: usize) {
        let current = self.current.load(Ordering::Acquire);
        let next = Self::successor(current);
        let vacated = &self.buffers[current];
        let upcoming = &self.buffers[next];

        let fault = match self.direction {
            Direction::Output => {
                vacated.fill(self.silence);
                vacated.set_empty(true);
                upcoming.is_empty()
            }
            Direction::Input => {
                vacated.set_empty(false);
                !upcoming.is_empty()
            }
        };

        if !self.in_lead_gap(next) && fault {
            self.fault.store(true, Ordering::Release);
        }

        engine.arm(upcoming.words(), transfers);

        self.current.store(next, Ordering::Release);
    }

    /// `true` while `arming` lies between a fresh cursor and its first buffer.
    /// Arming the cursor's first buffer closes the gap.
    fn in_lead_gap(&self, arming: usize) -> bool {
        let first = self.lead_in.load(Ordering::Acquire);
        if first == NO_SLOT {
            return false;
        }
        if first == arming {
            // The user may have placed a new cursor meanwhile; keep that one.
            let _ = self.lead_in.compare_exchange(
                first,
                NO_SLOT,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            return false;
        }
        true
    }

    /// Record where a newly placed user cursor starts.
    pub(crate) fn set_lead_in(&self, first: usize) {
        self.lead_in.store(first, Ordering::Release);
    }

    /// Read and clear the sticky over/underflow flag.
    pub fn take_fault(&self) -> bool {
        self.fault.swap(false, Ordering::AcqRel)
    }

    /// Peek at the sticky flag without clearing it.
    pub fn has_fault(&self) -> bool {
        self.fault.load(Ordering::Acquire)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Buffer the engine will be armed with at the next completion.
    pub fn next(&self) -> usize {
        Self::successor(self.current())
    }

    pub fn buffer(&self, index: usize) -> &Buffer<WORDS> {
        &self.buffers[index]
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn silence(&self) -> u32 {
        self.silence
    }

    pub const fn len(&self) -> usize {
        BUFFERS
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    pub const fn words_per_buffer(&self) -> usize {
        WORDS
    }

    pub const fn successor(index: usize) -> usize {
        (index + 1) % BUFFERS
    }

    pub const fn predecessor(index: usize) -> usize {
        (index + BUFFERS - 1) % BUFFERS
    }

    /// Slot `distance` places after `index`.
    pub const fn ahead(index: usize, distance: usize) -> usize {
        (index + distance) % BUFFERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;

    const SILENCE: u32 = 0x8000_8000;

    fn output_pool() -> BufferPool<4, 8> {
        let pool = BufferPool::new(Direction::Output, SILENCE);
        pool.prime();
        pool
    }

    fn fill_and_commit(pool: &BufferPool<4, 8>, index: usize, value: u32) {
        pool.buffer(index).fill(value);
        pool.buffer(index).set_empty(false);
    }

    #[test]
    fn prime_fills_output_with_silence() {
        let pool = output_pool();
        assert_eq!(pool.current(), 0);
        assert_eq!(pool.next(), 1);
        for b in 0..4 {
            assert!(pool.buffer(b).is_empty());
            for w in 0..8 {
                assert_eq!(pool.buffer(b).load(w), SILENCE);
            }
        }
    }

    #[test]
    fn prime_leaves_input_words_alone() {
        let pool: BufferPool<3, 4> = BufferPool::new(Direction::Input, SILENCE);
        pool.prime();
        assert_eq!(pool.buffer(0).load(0), 0);
        assert!(pool.buffer(2).is_empty());
    }

    #[test]
    fn rotation_keeps_next_one_ahead_of_current() {
        let pool = output_pool();
        let (mut engine, _log) = MockEngine::new(0);
        for _ in 0..11 {
            pool.rotate(&mut engine, 8);
            assert_eq!(pool.next(), (pool.current() + 1) % 4);
        }
        assert_eq!(pool.current(), 11 % 4);
    }

    #[test]
    fn next_is_derived_from_the_single_hardware_index() {
        let pool = output_pool();
        let (mut engine, _log) = MockEngine::new(0);
        for _ in 0..3 {
            pool.rotate(&mut engine, 8);
        }
        assert_eq!((pool.current(), pool.next()), (3, 0));

        pool.prime();
        assert_eq!((pool.current(), pool.next()), (0, 1));
    }

    #[test]
    fn output_rotation_silences_vacated_buffer() {
        let pool = output_pool();
        let (mut engine, _log) = MockEngine::new(0);
        fill_and_commit(&pool, 0, 7);

        pool.rotate(&mut engine, 8);

        assert!(pool.buffer(0).is_empty());
        assert_eq!(pool.buffer(0).load(5), SILENCE);
    }

    #[test]
    fn output_rotation_arms_next_buffer() {
        let pool = output_pool();
        let (mut engine, log) = MockEngine::new(0);
        fill_and_commit(&pool, 1, 0x1111);

        pool.rotate(&mut engine, 8);

        let log = log.lock().unwrap();
        assert_eq!(log.arms.len(), 1);
        assert_eq!(log.arms[0].words, [0x1111; 8]);
        assert_eq!(log.arms[0].transfers, 8);
        assert_eq!(log.arms[0].addr, pool.buffer(1).words().as_ptr() as usize);
        assert!(!pool.has_fault());
    }

    #[test]
    fn output_underflow_is_sticky_until_taken() {
        let pool = output_pool();
        let (mut engine, _log) = MockEngine::new(0);

        pool.rotate(&mut engine, 8); // buffer 1 still empty
        fill_and_commit(&pool, 2, 1);
        pool.rotate(&mut engine, 8); // buffer 2 full, flag stays set

        assert!(pool.take_fault());
        assert!(!pool.take_fault());
    }

    #[test]
    fn input_rotation_marks_vacated_full() {
        let pool: BufferPool<4, 8> = BufferPool::new(Direction::Input, 0);
        pool.prime();
        let (mut engine, _log) = MockEngine::new(0);

        pool.rotate(&mut engine, 8);

        assert!(!pool.buffer(0).is_empty());
        assert!(!pool.take_fault());
    }

    #[test]
    fn input_overflow_when_full_buffer_rearmed() {
        let pool: BufferPool<3, 8> = BufferPool::new(Direction::Input, 0);
        pool.prime();
        let (mut engine, _log) = MockEngine::new(0);

        // Nobody drains: after a full lap buffer 0 comes around still full.
        pool.rotate(&mut engine, 8);
        pool.rotate(&mut engine, 8);
        assert!(!pool.has_fault());
        pool.rotate(&mut engine, 8);
        assert!(pool.take_fault());
    }

    #[test]
    fn lead_gap_forgives_until_first_user_buffer() {
        let pool = output_pool();
        let (mut engine, _log) = MockEngine::new(0);
        pool.set_lead_in(3);

        pool.rotate(&mut engine, 8); // arms 1: gap
        pool.rotate(&mut engine, 8); // arms 2: gap
        assert!(!pool.has_fault());

        pool.rotate(&mut engine, 8); // arms 3: gap closes, 3 still empty
        assert!(pool.take_fault());

        pool.rotate(&mut engine, 8); // arms 0: counted normally
        assert!(pool.take_fault());
    }

    #[test]
    fn neighbours_wrap() {
        assert_eq!(BufferPool::<4, 1>::successor(3), 0);
        assert_eq!(BufferPool::<4, 1>::predecessor(0), 3);
        assert_eq!(BufferPool::<4, 1>::ahead(3, 2), 1);
    }
}
