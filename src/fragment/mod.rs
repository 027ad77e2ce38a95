//! Fragmentation and reassembly of oversized packets.
//!
//! This module collects the header codec, the outbound [`Splitter`], the
//! inbound [`ReassemblyBuffer`], and the [`PacketDispatcher`] that routes
//! wire packets into it. Each sub-module focuses on a single concept to keep
//! the code small and easy to audit while still providing a cohesive API at
//! the crate root.

pub mod buffer;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod header;
pub mod splitter;

pub use buffer::{PacketBufferEntry, ReassembledMessage, ReassemblyBuffer};
pub use config::{
    ConfigError,
    DEFAULT_PROTOCOL_ID,
    FragmentationConfig,
    MAX_FRAGMENT_COUNT_LIMIT,
    MAX_WINDOW_SIZE,
};
pub use dispatcher::PacketDispatcher;
pub use error::{AdmitError, FragmentStatus, HeaderError, ProcessError, SplitError};
pub use header::{DecodedPacket, FragmentHeader, HeaderCodec};
pub use splitter::{FragmentBatch, Splitter};

#[cfg(test)]
mod tests;
