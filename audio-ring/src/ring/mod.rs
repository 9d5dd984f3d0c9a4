//! The shared half of an audio ring: buffers, hardware position and
//! lifecycle.
//!
//! An [`AudioRing`] is `Sync` and meant to live in a `static` (in DMA-capable
//! memory). [`begin`](AudioRing::begin) splits it into the two parties that
//! touch it concurrently:
//!
//! - a [`TransferAgent`] owned by the completion interrupt (through a
//!   [`Registry`](crate::dispatch::Registry)), and
//! - a [`StreamPort`] owned by the producer or consumer task.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──begin──► Running ──end──► Stopped
//!       ▲                                    (terminal)
//!       └── begin failed (no channel)
//! ```

pub mod buffer;
pub mod pool;

use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::config::RingConfig;
use crate::constants::{DEFAULT_BUFFER_COUNT, DEFAULT_WORDS_PER_BUFFER, NO_SLOT};
use crate::dispatch::Registry;
use crate::error::Error;
use crate::hal::{ChannelId, ChannelPool, PortAddress, TransferEngine};
use crate::io::{StreamPort, TransferAgent};

pub use buffer::Buffer;
pub use pool::BufferPool;

const UNINITIALIZED: u8 = 0;
const STARTING: u8 = 1;
const RUNNING: u8 = 2;
const STOPPED: u8 = 3;

/// Observable lifecycle state of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingState {
    Uninitialized,
    Running,
    Stopped,
}

/// Ring sized the way the I2S and SPI sample ports size theirs by default.
pub type DefaultRing = AudioRing<DEFAULT_BUFFER_COUNT, DEFAULT_WORDS_PER_BUFFER>;

/// A fixed pool of `BUFFERS` buffers of `WORDS` words streaming through one
/// hardware transfer channel.
pub struct AudioRing<const BUFFERS: usize, const WORDS: usize> {
    pool: BufferPool<BUFFERS, WORDS>,
    config: RingConfig,
    state: AtomicU8,
    channel: AtomicUsize,
}

impl<const BUFFERS: usize, const WORDS: usize> AudioRing<BUFFERS, WORDS> {
    pub const fn new(config: RingConfig) -> Self {
        AudioRing {
            pool: BufferPool::new(config.direction, config.silence()),
            config,
            state: AtomicU8::new(UNINITIALIZED),
            channel: AtomicUsize::new(NO_SLOT),
        }
    }

    /// Claim a channel, prime the buffers, arm buffer 0, install the
    /// transfer agent and start the hardware.
    ///
    /// Returns the unique [`StreamPort`] for this ring. On
    /// [`Error::NoChannel`] the ring stays uninitialized and `begin` may be
    /// retried.
    pub fn begin<'a, P, R>(
        &'a self,
        channels: &mut P,
        mut registry: R,
        request_line: u32,
        port: PortAddress,
    ) -> Result<StreamPort<'a, BUFFERS, WORDS>, Error>
    where
        P: ChannelPool,
        R: Registry<TransferAgent<'a, P::Engine, BUFFERS, WORDS>>,
    {
        if let Err(state) = self.state.compare_exchange(
            UNINITIALIZED,
            STARTING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return Err(match state {
                STOPPED => Error::Stopped,
                _ => Error::AlreadyStarted,
            });
        }

        let free = channels.available();
        let claimed = if free > 0 { channels.claim() } else { None };
        let Some(mut engine) = claimed else {
            log::warn!("audio ring: no free transfer channel ({} reported free)", free);
            self.state.store(UNINITIALIZED, Ordering::Release);
            return Err(Error::NoChannel);
        };
        let channel = engine.channel();

        self.pool.prime();
        engine.configure(
            request_line,
            port,
            self.config.direction,
            self.config.transfer_size,
        );
        engine.arm(self.pool.buffer(0).words(), self.transfers());

        self.state.store(RUNNING, Ordering::Release);
        let agent = TransferAgent::new(self, engine);
        if let Err(agent) = registry.register(channel, agent) {
            log::warn!("audio ring: channel {} already has a handler", channel.0);
            self.state.store(UNINITIALIZED, Ordering::Release);
            channels.release(agent.into_engine());
            return Err(Error::NoChannel);
        }
        self.channel.store(channel.index(), Ordering::Release);

        if registry.with_handler(channel, |agent| agent.start()).is_none() {
            log::error!("audio ring: handler for channel {} vanished", channel.0);
        }

        log::debug!(
            "audio ring: started on channel {} ({} x {} words, {:?})",
            channel.0,
            BUFFERS,
            WORDS,
            self.config.direction
        );
        Ok(StreamPort::new(self))
    }

    /// Tear down: silence the completion path, take the agent back from the
    /// registry, disable the engine and release its channel.
    ///
    /// The ring cannot be restarted afterwards. Any [`StreamPort`] still held
    /// fails every call with [`Error::Stopped`].
    pub fn end<'a, P, R>(&'a self, channels: &mut P, mut registry: R) -> Result<(), Error>
    where
        P: ChannelPool,
        R: Registry<TransferAgent<'a, P::Engine, BUFFERS, WORDS>>,
    {
        match self.state.compare_exchange(RUNNING, STOPPED, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {}
            Err(STOPPED) => return Err(Error::Stopped),
            Err(_) => return Err(Error::NotRunning),
        }

        let channel = ChannelId(self.channel.swap(NO_SLOT, Ordering::AcqRel) as u8);
        match registry.deregister(channel) {
            Some(agent) => {
                let mut engine = agent.into_engine();
                engine.disable();
                channels.release(engine);
                log::info!("audio ring: stopped, channel {} released", channel.0);
            }
            None => {
                log::warn!("audio ring: no handler registered on channel {}", channel.0);
            }
        }
        Ok(())
    }

    pub fn state(&self) -> RingState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => RingState::Running,
            STOPPED => RingState::Stopped,
            _ => RingState::Uninitialized,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    /// Channel claimed at `begin`, while running.
    pub fn channel(&self) -> Option<ChannelId> {
        match self.channel.load(Ordering::Acquire) {
            NO_SLOT => None,
            index => Some(ChannelId(index as u8)),
        }
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn pool(&self) -> &BufferPool<BUFFERS, WORDS> {
        &self.pool
    }

    /// Transfer count for one buffer at the configured beat size.
    pub fn transfers(&self) -> usize {
        self.config.transfer_size.transfers_for(WORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Direction;
    use crate::dispatch::Dispatcher;
    use crate::io::TransferAgent;
    use crate::testing::{MockChannels, MockEngine};

    type Agent<'a> = TransferAgent<'a, MockEngine, 4, 8>;

    const PORT: PortAddress = PortAddress(0x5020_0010);

    #[test]
    fn new_ring_is_uninitialized() {
        let ring: AudioRing<4, 8> = AudioRing::new(RingConfig::new(Direction::Output));
        assert_eq!(ring.state(), RingState::Uninitialized);
        assert!(ring.channel().is_none());
    }

    #[test]
    fn begin_primes_arms_and_registers() {
        let ring: AudioRing<4, 8> =
            AudioRing::new(RingConfig::new(Direction::Output).with_silence(0xABCD));
        let mut channels = MockChannels::new(4);
        let mut dispatcher: Dispatcher<Agent, 4> = Dispatcher::new();

        let port = ring.begin(&mut channels, &mut dispatcher, 7, PORT);
        assert!(port.is_ok());
        assert_eq!(ring.state(), RingState::Running);
        assert_eq!(ring.channel(), Some(ChannelId(0)));
        assert!(dispatcher.is_registered(ChannelId(0)));

        let log = channels.last_log();
        let log = log.lock().unwrap();
        assert_eq!(
            log.configured,
            Some((7, PORT, Direction::Output, crate::config::TransferSize::Bits32))
        );
        assert!(log.started);
        assert_eq!(log.arms.len(), 1);
        assert_eq!(log.arms[0].addr, ring.pool().buffer(0).words().as_ptr() as usize);
        assert!(log.arms[0].words.iter().all(|&w| w == 0xABCD));
    }

    #[test]
    fn begin_without_channel_stays_uninitialized() {
        let ring: AudioRing<4, 8> = AudioRing::new(RingConfig::new(Direction::Output));
        let mut channels = MockChannels::new(0);
        let mut dispatcher: Dispatcher<Agent, 4> = Dispatcher::new();

        let result = ring.begin(&mut channels, &mut dispatcher, 0, PORT);
        assert_eq!(result.err(), Some(Error::NoChannel));
        assert_eq!(ring.state(), RingState::Uninitialized);
        assert!(dispatcher.is_empty());

        // A channel frees up: retry succeeds.
        let mut channels = MockChannels::new(1);
        assert!(ring.begin(&mut channels, &mut dispatcher, 0, PORT).is_ok());
    }

    #[test]
    fn exhausted_pool_is_not_asked_to_claim() {
        let ring: AudioRing<4, 8> = AudioRing::new(RingConfig::new(Direction::Output));
        let mut channels = MockChannels::new(0);
        let mut dispatcher: Dispatcher<Agent, 4> = Dispatcher::new();

        let result = ring.begin(&mut channels, &mut dispatcher, 0, PORT);
        assert_eq!(result.err(), Some(Error::NoChannel));
        assert_eq!(channels.claims, 0, "free count checked before claiming");
    }

    #[test]
    fn silence_sample_is_replicated_at_construction() {
        let ring: AudioRing<3, 4> = AudioRing::new(
            RingConfig::new(Direction::Output)
                .with_silence_sample(-1)
                .with_sample_width(crate::config::SampleWidth::Bits16),
        );
        let mut channels = MockChannels::new(1);
        let mut dispatcher: Dispatcher<TransferAgent<MockEngine, 3, 4>, 4> = Dispatcher::new();
        let _port = ring.begin(&mut channels, &mut dispatcher, 0, PORT).ok().unwrap();

        assert_eq!(ring.pool().silence(), 0xFFFF_FFFF);
        let log = channels.last_log();
        assert_eq!(log.lock().unwrap().arms[0].words, [0xFFFF_FFFF; 4]);
    }

    #[test]
    fn begin_twice_is_rejected() {
        let ring: AudioRing<4, 8> = AudioRing::new(RingConfig::new(Direction::Output));
        let mut channels = MockChannels::new(2);
        let mut dispatcher: Dispatcher<Agent, 4> = Dispatcher::new();

        let _port = ring.begin(&mut channels, &mut dispatcher, 0, PORT).ok().unwrap();
        let again = ring.begin(&mut channels, &mut dispatcher, 0, PORT);
        assert_eq!(again.err(), Some(Error::AlreadyStarted));
        assert_eq!(channels.available(), 1);
    }

    #[test]
    fn occupied_registry_slot_releases_channel() {
        let ring_a: AudioRing<4, 8> = AudioRing::new(RingConfig::new(Direction::Output));
        let ring_b: AudioRing<4, 8> = AudioRing::new(RingConfig::new(Direction::Output));
        let mut dispatcher: Dispatcher<Agent, 4> = Dispatcher::new();

        // Two allocators both hand out channel 0: the second registration collides.
        let mut first = MockChannels::new(1);
        let mut second = MockChannels::new(1);
        let _port = ring_a.begin(&mut first, &mut dispatcher, 0, PORT).ok().unwrap();
        let result = ring_b.begin(&mut second, &mut dispatcher, 0, PORT);

        assert_eq!(result.err(), Some(Error::NoChannel));
        assert_eq!(ring_b.state(), RingState::Uninitialized);
        assert_eq!(second.released, [0]);
    }

    #[test]
    fn end_releases_and_is_terminal() {
        let ring: AudioRing<4, 8> = AudioRing::new(RingConfig::new(Direction::Input));
        let mut channels = MockChannels::new(2);
        let mut dispatcher: Dispatcher<Agent, 4> = Dispatcher::new();

        let mut port = ring.begin(&mut channels, &mut dispatcher, 3, PORT).ok().unwrap();
        let log = channels.last_log();

        assert!(ring.end(&mut channels, &mut dispatcher).is_ok());
        assert_eq!(ring.state(), RingState::Stopped);
        assert!(log.lock().unwrap().disabled);
        assert_eq!(channels.released, [0]);
        assert!(dispatcher.is_empty());
        assert!(ring.channel().is_none());

        assert_eq!(port.read(false), Err(Error::Stopped));
        assert_eq!(
            ring.end(&mut channels, &mut dispatcher),
            Err(Error::Stopped)
        );
        assert_eq!(
            ring.begin(&mut channels, &mut dispatcher, 3, PORT).err(),
            Some(Error::Stopped)
        );
    }

    #[test]
    fn end_before_begin_is_misuse() {
        let ring: AudioRing<4, 8> = AudioRing::new(RingConfig::new(Direction::Output));
        let mut channels = MockChannels::new(1);
        let mut dispatcher: Dispatcher<Agent, 4> = Dispatcher::new();
        assert_eq!(
            ring.end(&mut channels, &mut dispatcher),
            Err(Error::NotRunning)
        );
        assert_eq!(ring.state(), RingState::Uninitialized);
    }

    #[test]
    fn default_ring_dimensions() {
        let ring = DefaultRing::new(RingConfig::new(Direction::Output));
        assert_eq!(ring.pool().len(), 6);
        assert_eq!(ring.pool().words_per_buffer(), 16);
        assert_eq!(ring.transfers(), 16);
    }

    #[test]
    fn half_word_beats_double_the_transfer_count() {
        let ring: AudioRing<3, 16> = AudioRing::new(
            RingConfig::new(Direction::Output)
                .with_transfer_size(crate::config::TransferSize::Bits16),
        );
        assert_eq!(ring.transfers(), 32);
    }
}
