//! Packet types, the packet factory contract, and whole-packet codec.
//!
//! A whole packet is `checksum | sequence | type tag | payload`, padded with
//! zero bits to a byte boundary. The payload encoding belongs to the
//! application's [`Packet`] implementation; the [`PacketFactory`] maps type
//! tags back to empty packets ready to deserialize. Tag `0` is reserved for
//! fragments and never names an application packet.

use derive_more::{Display, From, Into};
use thiserror::Error;

use crate::{
    SequenceNumber,
    bitstream::{BitReader, BitWriter, StreamError},
    checksum,
    fragment::{ConfigError, FragmentationConfig, HeaderCodec, HeaderError},
};

/// Numeric type tag carried in every packet prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct PacketType(u32);

impl PacketType {
    /// Reserved tag marking a fragment.
    pub const FRAGMENT: Self = Self(0);

    /// Wrap a raw tag.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the raw tag.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// Whether this is the reserved fragment tag.
    #[must_use]
    pub const fn is_fragment(self) -> bool { self.0 == Self::FRAGMENT.0 }
}

/// An application message carried inside whole packets.
pub trait Packet {
    /// Tag identifying this packet's type; never [`PacketType::FRAGMENT`].
    fn packet_type(&self) -> PacketType;

    /// Write the payload fields.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] when a field is out of range or the writer
    /// is full.
    fn serialize(&self, writer: &mut BitWriter) -> Result<(), StreamError>;

    /// Read the payload fields into `self`.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] when the payload is truncated or a field is
    /// out of range.
    fn deserialize(&mut self, reader: &mut BitReader<'_>) -> Result<(), StreamError>;
}

/// Registry creating empty packets by type tag.
pub trait PacketFactory {
    /// Packet representation produced by this factory.
    type Packet: Packet;

    /// Number of type tags, the reserved fragment tag included.
    fn num_types(&self) -> u32;

    /// Create an empty packet for `packet_type`, or `None` if unregistered.
    fn create(&self, packet_type: PacketType) -> Option<Self::Packet>;
}

/// Errors produced while writing a whole packet.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum WriteError {
    /// Application packets may not use the reserved fragment tag.
    #[error("packet type 0 is reserved for fragments")]
    ReservedType,
    /// Serializing the packet failed.
    #[error("failed to serialize packet: {0}")]
    Stream(#[from] StreamError),
}

/// Errors produced while reading a whole packet.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReadError {
    /// The embedded checksum does not match.
    #[error("checksum mismatch: packet carries {found:#010x}, computed {expected:#010x}")]
    ChecksumMismatch { expected: u32, found: u32 },
    /// The packet prefix could not be decoded.
    #[error("malformed header: {0}")]
    Header(#[from] HeaderError),
    /// The packet is a fragment, not a whole packet.
    #[error("packet is a fragment")]
    Fragment,
    /// The factory does not recognise the type tag.
    #[error("no packet registered for type {0}")]
    UnknownPacketType(PacketType),
    /// The payload could not be deserialized.
    #[error("failed to deserialize payload: {0}")]
    Payload(#[source] StreamError),
    /// Bytes remained after the payload.
    #[error("{bits} unread bits after payload")]
    TrailingData { bits: usize },
}

/// Writes and reads whole packets for a packet factory.
#[derive(Debug)]
pub struct PacketCodec<F> {
    factory: F,
    header: HeaderCodec,
    protocol_id: u32,
    max_packet_size: usize,
}

impl<F: PacketFactory> PacketCodec<F> {
    /// Build a codec for `factory` under `config`.
    ///
    /// Packets may grow up to [`FragmentationConfig::max_message_size`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid or the
    /// factory registers fewer than two types.
    pub fn new(factory: F, config: &FragmentationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let header = HeaderCodec::new(factory.num_types(), config.max_fragment_size)?;
        Ok(Self {
            factory,
            header,
            protocol_id: config.protocol_id,
            max_packet_size: config.max_message_size(),
        })
    }

    /// The packet factory.
    pub fn factory(&self) -> &F { &self.factory }

    /// Header codec shared with the splitter and dispatcher.
    pub fn header(&self) -> &HeaderCodec { &self.header }

    /// Identifier seeding packet checksums.
    pub fn protocol_id(&self) -> u32 { self.protocol_id }

    /// Serialize `packet` under `sequence` and stamp its checksum.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::ReservedType`] for the fragment tag and
    /// [`WriteError::Stream`] when serialization fails, including when the
    /// packet would exceed the maximum message size.
    pub fn write(&self, packet: &F::Packet, sequence: SequenceNumber) -> Result<Vec<u8>, WriteError> {
        let packet_type = packet.packet_type();
        if packet_type.is_fragment() {
            return Err(WriteError::ReservedType);
        }
        let mut writer = BitWriter::with_capacity(self.max_packet_size);
        self.header.write_prefix(&mut writer, 0, sequence, packet_type)?;
        packet.serialize(&mut writer)?;
        writer.align()?;
        let mut bytes = writer.finish();
        checksum::stamp(self.protocol_id, &mut bytes).ok_or(StreamError::Underflow {
            requested: checksum::CHECKSUM_LEN * 8,
            remaining: bytes.len() * 8,
        })?;
        Ok(bytes)
    }

    /// Verify, decode, and deserialize a whole packet.
    ///
    /// # Errors
    ///
    /// Returns a [`ReadError`] when the checksum fails, the header is
    /// malformed or names a fragment, the type is unregistered, or the
    /// payload does not deserialize exactly.
    pub fn read(&self, bytes: &[u8]) -> Result<(SequenceNumber, F::Packet), ReadError> {
        let expected = checksum::compute(self.protocol_id, bytes);
        let found = checksum::embedded(bytes).ok_or(HeaderError::Truncated { len: bytes.len() })?;
        if expected != found {
            return Err(ReadError::ChecksumMismatch { expected, found });
        }

        let mut reader = BitReader::new(bytes);
        let (_, sequence, packet_type) = self.header.read_prefix(&mut reader)?;
        if packet_type.is_fragment() {
            return Err(ReadError::Fragment);
        }
        let mut packet = self
            .factory
            .create(packet_type)
            .ok_or(ReadError::UnknownPacketType(packet_type))?;
        packet.deserialize(&mut reader).map_err(ReadError::Payload)?;
        reader.align().map_err(ReadError::Payload)?;
        let bits = reader.bits_remaining();
        if bits != 0 {
            return Err(ReadError::TrailingData { bits });
        }
        Ok((sequence, packet))
    }
}
