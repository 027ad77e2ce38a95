#![doc(html_root_url = "https://docs.rs/wirefrag/latest")]
//! Public API for the `wirefrag` library.
//!
//! This crate splits packets that exceed a datagram budget into checksummed
//! fragments and reassembles them on the receiving side inside a bounded,
//! sequence-indexed window. It also provides the bit-level codec used for
//! packet headers, a packet factory contract, and an async UDP endpoint that
//! ties everything together.

pub mod bitstream;
pub mod checksum;
pub mod demo;
pub mod fragment;
pub mod metrics;
pub mod packet;
pub mod sequence;
pub mod transport;

pub use fragment::{
    AdmitError,
    ConfigError,
    FragmentBatch,
    FragmentHeader,
    FragmentStatus,
    FragmentationConfig,
    HeaderCodec,
    PacketDispatcher,
    ProcessError,
    ReassembledMessage,
    ReassemblyBuffer,
    SplitError,
    Splitter,
};
pub use packet::{Packet, PacketCodec, PacketFactory, PacketType};
pub use sequence::SequenceNumber;
pub use transport::{FragmentSocket, TransportError};
