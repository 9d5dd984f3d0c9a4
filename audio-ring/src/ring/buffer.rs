use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// One fixed-size DMA buffer plus its hand-off flag.
///
/// Words are atomics so the hardware side (silence fill in the completion
/// interrupt) and the user side can never form a data race, even when a
/// fault lets them meet on the same buffer. `AtomicU32` has the layout of
/// `u32`, so [`words`](Self::words) is directly usable as a DMA address.
///
/// The `empty` flag is the ownership hand-off: stores use `Release` and
/// loads use `Acquire`, so the words written before a flip are visible to
/// whichever side observes the flip.
pub struct Buffer<const WORDS: usize> {
    words: [AtomicU32; WORDS],
    empty: AtomicBool,
}

impl<const WORDS: usize> Buffer<WORDS> {
    pub const fn new() -> Self {
        Buffer {
            words: [const { AtomicU32::new(0) }; WORDS],
            empty: AtomicBool::new(true),
        }
    }

    /// Storage handed to the transfer engine.
    pub fn words(&self) -> &[AtomicU32; WORDS] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.empty.load(Ordering::Acquire)
    }

    pub(crate) fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::Release);
    }

    pub fn load(&self, index: usize) -> u32 {
        self.words[index].load(Ordering::Relaxed)
    }

    pub(crate) fn store(&self, index: usize, word: u32) {
        self.words[index].store(word, Ordering::Relaxed);
    }

    pub(crate) fn fill(&self, word: u32) {
        for w in &self.words {
            w.store(word, Ordering::Relaxed);
        }
    }

    /// Copy `src` into the buffer starting at `offset`.
    pub(crate) fn store_from(&self, offset: usize, src: &[u32]) {
        for (w, &v) in self.words[offset..offset + src.len()].iter().zip(src) {
            w.store(v, Ordering::Relaxed);
        }
    }

    /// Copy words starting at `offset` into `dst`.
    pub(crate) fn load_into(&self, offset: usize, dst: &mut [u32]) {
        let len = dst.len();
        for (d, w) in dst.iter_mut().zip(&self.words[offset..offset + len]) {
            *d = w.load(Ordering::Relaxed);
        }
    }
}

impl<const WORDS: usize> Default for Buffer<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}
