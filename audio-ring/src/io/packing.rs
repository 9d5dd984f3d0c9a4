//! Sample ↔ word packing for the sample-level stream API.
//!
//! ## Word format
//!
//! Narrow samples are packed most significant first, so a stereo 16-bit
//! frame is one word with the left sample in bits 16–31 and the right in
//! bits 0–15, which is the order an I2S shifter emits them:
//!
//! ```text
//!  8-bit:  [ s0 | s1 | s2 | s3 ]
//! 16-bit:  [   s0    |    s1   ]
//! 24/32:   [          s0       ]
//! ```

use crate::config::SampleWidth;

/// Pack a stereo 16-bit frame: `(left << 16) | (right & 0xFFFF)`.
pub fn pack_frame16(left: i16, right: i16) -> u32 {
    ((left as u16 as u32) << 16) | right as u16 as u32
}

/// Split a word produced by [`pack_frame16`].
pub fn unpack_frame16(word: u32) -> (i16, i16) {
    ((word >> 16) as i16, word as i16)
}

/// Pack a stereo 8-bit frame into the low half of a word: `(left << 8) | right`.
pub fn pack_frame8(left: i8, right: i8) -> u16 {
    ((left as u8 as u16) << 8) | right as u8 as u16
}

/// Split a half word produced by [`pack_frame8`].
pub fn unpack_frame8(half: u16) -> (i8, i8) {
    ((half >> 8) as i8, half as i8)
}

/// Accumulates samples until a full word is ready.
#[derive(Debug, Clone)]
pub struct SamplePacker {
    width: SampleWidth,
    hold: u32,
    held: usize,
}

impl SamplePacker {
    pub const fn new(width: SampleWidth) -> Self {
        SamplePacker {
            width,
            hold: 0,
            held: 0,
        }
    }

    /// Add one sample. Returns the completed word once enough samples are held.
    pub fn push(&mut self, sample: i32) -> Option<u32> {
        let per_word = self.width.samples_per_word();
        if per_word == 1 {
            return Some(sample as u32);
        }

        let bits = self.width.bits();
        let mask = (1u32 << bits) - 1;
        self.hold = (self.hold << bits) | (sample as u32 & mask);
        self.held += 1;

        if self.held == per_word {
            let word = self.hold;
            self.reset();
            Some(word)
        } else {
            None
        }
    }

    /// Samples waiting for the rest of their word.
    pub fn pending(&self) -> usize {
        self.held
    }

    /// Emit a partially filled word, zero padded in the low lanes.
    pub fn take_partial(&mut self) -> Option<u32> {
        if self.held == 0 {
            return None;
        }
        let missing = (self.width.samples_per_word() - self.held) as u32;
        let word = self.hold << (self.width.bits() * missing);
        self.reset();
        Some(word)
    }

    pub fn reset(&mut self) {
        self.hold = 0;
        self.held = 0;
    }
}

/// Hands out the samples of one word at a time, sign-extended.
#[derive(Debug, Clone)]
pub struct SampleUnpacker {
    width: SampleWidth,
    hold: u32,
    remaining: usize,
}

impl SampleUnpacker {
    pub const fn new(width: SampleWidth) -> Self {
        SampleUnpacker {
            width,
            hold: 0,
            remaining: 0,
        }
    }

    /// Replace the held word. Any unread samples of the previous word are dropped.
    pub fn load(&mut self, word: u32) {
        self.hold = word;
        self.remaining = self.width.samples_per_word();
    }

    pub fn pop(&mut self) -> Option<i32> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.width {
            SampleWidth::Bits24 | SampleWidth::Bits32 => Some(self.hold as i32),
            SampleWidth::Bits8 | SampleWidth::Bits16 => {
                let bits = self.width.bits();
                // Arithmetic shift sign-extends the top lane.
                let sample = (self.hold as i32) >> (32 - bits);
                self.hold <<= bits;
                Some(sample)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    pub fn reset(&mut self) {
        self.hold = 0;
        self.remaining = 0;
    }
}
