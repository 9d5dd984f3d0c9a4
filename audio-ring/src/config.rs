//! Construction-time configuration of an [`AudioRing`](crate::AudioRing).

use crate::constants::DEFAULT_SILENCE;

/// Which way words flow between the ring and the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Memory → peripheral. The user writes, the hardware reads.
    Output,
    /// Peripheral → memory. The hardware writes, the user reads.
    Input,
}

/// Width of one logical sample as seen by the sample-level API.
///
/// 8- and 16-bit samples are packed several to a word, most significant
/// first. 24- and 32-bit samples occupy a whole word each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleWidth {
    Bits8,
    Bits16,
    Bits24,
    Bits32,
}

impl SampleWidth {
    /// Number of bits per sample.
    pub const fn bits(self) -> u32 {
        match self {
            SampleWidth::Bits8 => 8,
            SampleWidth::Bits16 => 16,
            SampleWidth::Bits24 => 24,
            SampleWidth::Bits32 => 32,
        }
    }

    /// How many samples share one 32-bit word.
    pub const fn samples_per_word(self) -> usize {
        match self {
            SampleWidth::Bits8 => 4,
            SampleWidth::Bits16 => 2,
            SampleWidth::Bits24 | SampleWidth::Bits32 => 1,
        }
    }

    /// Replicate one sample across a full word so every packed lane is silent.
    pub const fn replicate(self, sample: i32) -> u32 {
        match self {
            SampleWidth::Bits8 => {
                let a = sample as u32 & 0xFF;
                (a << 24) | (a << 16) | (a << 8) | a
            }
            SampleWidth::Bits16 => {
                let a = sample as u32 & 0xFFFF;
                (a << 16) | a
            }
            SampleWidth::Bits24 | SampleWidth::Bits32 => sample as u32,
        }
    }
}

/// Size of a single hardware transfer beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferSize {
    /// Two beats per buffer word.
    Bits16,
    /// One beat per buffer word.
    Bits32,
}

impl TransferSize {
    /// Transfer count the engine must be armed with for `words` buffer words.
    pub const fn transfers_for(self, words: usize) -> usize {
        match self {
            TransferSize::Bits16 => words * 2,
            TransferSize::Bits32 => words,
        }
    }
}

/// Ring configuration, fixed for the lifetime of the ring.
///
/// All setters are `const` so a fully configured ring can be a `static`:
///
/// ```
/// use audio_ring::{AudioRing, Direction, RingConfig, SampleWidth};
///
/// static TX: AudioRing<4, 64> = AudioRing::new(
///     RingConfig::new(Direction::Output)
///         .with_sample_width(SampleWidth::Bits16)
///         .with_silence_sample(0),
/// );
/// # let _ = &TX;
/// ```
/// Silence as configured: a raw word, or one sample to replicate across
/// the word once the sample width is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Silence {
    Word(u32),
    Sample(i32),
}

#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    pub(crate) direction: Direction,
    silence: Silence,
    pub(crate) sample_width: SampleWidth,
    pub(crate) transfer_size: TransferSize,
    pub(crate) callback: Option<fn()>,
}

impl RingConfig {
    /// 32-bit samples, 32-bit transfers, zero silence, no callback.
    pub const fn new(direction: Direction) -> Self {
        RingConfig {
            direction,
            silence: Silence::Word(DEFAULT_SILENCE),
            sample_width: SampleWidth::Bits32,
            transfer_size: TransferSize::Bits32,
            callback: None,
        }
    }

    /// Raw word the output side transmits when the user has nothing queued.
    pub const fn with_silence(mut self, word: u32) -> Self {
        self.silence = Silence::Word(word);
        self
    }

    /// Silence given as a single sample, replicated across the word for
    /// whatever sample width the finished configuration ends up with.
    pub const fn with_silence_sample(mut self, sample: i32) -> Self {
        self.silence = Silence::Sample(sample);
        self
    }

    pub const fn with_sample_width(mut self, width: SampleWidth) -> Self {
        self.sample_width = width;
        self
    }

    pub const fn with_transfer_size(mut self, size: TransferSize) -> Self {
        self.transfer_size = size;
        self
    }

    /// Function invoked from interrupt context after every buffer rotation.
    ///
    /// It runs with the completion interrupt active: keep it short and never
    /// block in it.
    pub const fn with_callback(mut self, callback: fn()) -> Self {
        self.callback = Some(callback);
        self
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// The word transmitted when the user has nothing queued.
    pub const fn silence(&self) -> u32 {
        match self.silence {
            Silence::Word(word) => word,
            Silence::Sample(sample) => self.sample_width.replicate(sample),
        }
    }

    pub const fn sample_width(&self) -> SampleWidth {
        self.sample_width
    }

    pub const fn transfer_size(&self) -> TransferSize {
        self.transfer_size
    }
}
