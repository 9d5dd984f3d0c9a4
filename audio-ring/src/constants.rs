/// Smallest usable ring: one buffer transferring, one armed, one for the user.
pub const MIN_BUFFER_COUNT: usize = 3;

/// Buffer count used by the I2S and SPI sample ports unless configured otherwise.
pub const DEFAULT_BUFFER_COUNT: usize = 6;

/// Words per buffer used by the sample ports unless configured otherwise.
pub const DEFAULT_WORDS_PER_BUFFER: usize = 16;

/// Silence word for signed PCM.
pub const DEFAULT_SILENCE: u32 = 0;

/// Number of hardware transfer channels a dispatcher tracks by default.
pub const MAX_CHANNELS: usize = 12;

/// Sentinel for "no buffer index" in atomics that hold a slot or nothing.
pub(crate) const NO_SLOT: usize = usize::MAX;
