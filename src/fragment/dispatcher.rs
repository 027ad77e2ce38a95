//! Inbound entry point routing wire packets into the reassembly buffer.
//!
//! [`PacketDispatcher`] decodes the packet prefix, verifies the checksum, and
//! admits the packet into its [`ReassemblyBuffer`]. Fragments contribute
//! their payload; whole packets are admitted verbatim as the only fragment of
//! a one-fragment message, so every drained message is a complete wire
//! packet regardless of how it travelled.

use tracing::debug;

use super::{
    ConfigError,
    DecodedPacket,
    FragmentStatus,
    FragmentationConfig,
    HeaderCodec,
    ProcessError,
    ReassembledMessage,
    ReassemblyBuffer,
};
use crate::{checksum, metrics};

/// Classifies inbound packets and feeds the reassembly buffer.
#[derive(Debug)]
pub struct PacketDispatcher {
    header: HeaderCodec,
    protocol_id: u32,
    buffer: ReassemblyBuffer,
}

impl PacketDispatcher {
    /// Create a dispatcher for a registry of `num_packet_types` tags.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` is invalid or the registry has
    /// fewer than two types.
    pub fn new(config: FragmentationConfig, num_packet_types: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            header: HeaderCodec::new(num_packet_types, config.max_fragment_size)?,
            protocol_id: config.protocol_id,
            buffer: ReassemblyBuffer::new(config)?,
        })
    }

    /// Borrow the reassembly buffer.
    #[must_use]
    pub const fn buffer(&self) -> &ReassemblyBuffer { &self.buffer }

    /// Mutably borrow the reassembly buffer.
    pub const fn buffer_mut(&mut self) -> &mut ReassemblyBuffer { &mut self.buffer }

    /// Validate one wire packet and admit it.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Header`] for an undecodable prefix,
    /// [`ProcessError::ChecksumMismatch`] for corrupted or foreign packets,
    /// and [`ProcessError::Admit`] when the buffer refuses the fragment.
    pub fn process_packet(&mut self, packet: &[u8]) -> Result<FragmentStatus, ProcessError> {
        let decoded = self.header.decode(packet).inspect_err(|err| {
            debug!("dropping packet: len={}, error={err}", packet.len());
            metrics::inc_rejected(ProcessError::Header(*err).reason());
        })?;

        let expected = checksum::compute(self.protocol_id, packet);
        let found = decoded.checksum();
        if expected != found {
            debug!(
                "dropping packet: sequence={}, error=checksum mismatch",
                decoded.sequence()
            );
            let err = ProcessError::ChecksumMismatch { expected, found };
            metrics::inc_rejected(err.reason());
            return Err(err);
        }

        let status = match decoded {
            DecodedPacket::Fragment { header, payload } => self.buffer.admit_fragment(
                payload,
                header.fragment_id(),
                header.fragment_count(),
                header.sequence(),
            )?,
            DecodedPacket::Whole { sequence, .. } => {
                self.buffer.admit_fragment(packet, 0, 1, sequence)?
            }
        };
        Ok(status)
    }

    /// Extract every complete message, oldest first.
    pub fn drain_completed(&mut self) -> Vec<ReassembledMessage> { self.buffer.drain_completed() }
}
