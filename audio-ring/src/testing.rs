//! Software stand-ins for the hardware bring-up layer.

use std::sync::{Arc, Mutex};
use std::vec::Vec;

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::{Direction, TransferSize};
use crate::hal::{ChannelId, ChannelPool, PortAddress, TransferEngine};

/// One `arm` call as the hardware saw it.
#[derive(Debug, Clone)]
pub struct Arm {
    pub words: Vec<u32>,
    pub transfers: usize,
    pub addr: usize,
}

#[derive(Debug, Default)]
pub struct EngineLog {
    pub configured: Option<(u32, PortAddress, Direction, TransferSize)>,
    pub arms: Vec<Arm>,
    pub started: bool,
    pub acks: usize,
    pub disabled: bool,
}

pub type SharedLog = Arc<Mutex<EngineLog>>;

/// Engine that snapshots the buffer contents at every `arm`.
pub struct MockEngine {
    id: ChannelId,
    log: SharedLog,
}

impl MockEngine {
    pub fn new(id: u8) -> (Self, SharedLog) {
        let log = SharedLog::default();
        (
            MockEngine {
                id: ChannelId(id),
                log: log.clone(),
            },
            log,
        )
    }
}

impl TransferEngine for MockEngine {
    fn channel(&self) -> ChannelId {
        self.id
    }

    fn configure(
        &mut self,
        request_line: u32,
        port: PortAddress,
        direction: Direction,
        size: TransferSize,
    ) {
        self.log.lock().unwrap().configured = Some((request_line, port, direction, size));
    }

    fn arm(&mut self, buffer: &[AtomicU32], transfers: usize) {
        let words = buffer.iter().map(|w| w.load(Ordering::Relaxed)).collect();
        self.log.lock().unwrap().arms.push(Arm {
            words,
            transfers,
            addr: buffer.as_ptr() as usize,
        });
    }

    fn start(&mut self) {
        self.log.lock().unwrap().started = true;
    }

    fn acknowledge(&mut self) {
        self.log.lock().unwrap().acks += 1;
    }

    fn disable(&mut self) {
        self.log.lock().unwrap().disabled = true;
    }
}

/// Channel allocator handing out `MockEngine`s with ids `0..capacity`.
pub struct MockChannels {
    free: Vec<u8>,
    /// Number of `claim` calls, successful or not.
    pub claims: usize,
    pub logs: Vec<(u8, SharedLog)>,
    pub released: Vec<u8>,
}

impl MockChannels {
    pub fn new(capacity: u8) -> Self {
        MockChannels {
            free: (0..capacity).rev().collect(),
            claims: 0,
            logs: Vec::new(),
            released: Vec::new(),
        }
    }

    /// Log of the most recently claimed engine.
    pub fn last_log(&self) -> SharedLog {
        self.logs.last().expect("no channel claimed").1.clone()
    }
}

impl ChannelPool for MockChannels {
    type Engine = MockEngine;

    fn claim(&mut self) -> Option<MockEngine> {
        self.claims += 1;
        let id = self.free.pop()?;
        let (engine, log) = MockEngine::new(id);
        self.logs.push((id, log));
        Some(engine)
    }

    fn release(&mut self, engine: MockEngine) {
        let id = engine.channel().0;
        self.released.push(id);
        self.free.push(id);
    }

    fn available(&self) -> usize {
        self.free.len()
    }
}
