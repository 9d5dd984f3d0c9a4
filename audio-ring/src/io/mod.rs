//! The two parties that share an [`AudioRing`](crate::AudioRing).
//!
//! ## Components
//!
//! | Type | Context | Role |
//! |------|---------|------|
//! | [`TransferAgent`] | completion interrupt | rotates buffers, re-arms the engine |
//! | [`StreamPort`] | task | writes or reads words, waits on the agent |
//!
//! ## Utilities
//!
//! - [`packing`]: 8/16-bit sample packing into 32-bit words

pub mod agent;
pub mod packing;
pub mod port;

pub use agent::TransferAgent;
pub use port::StreamPort;
