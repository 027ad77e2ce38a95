//! Fixed packet prefix and fragment header codec.
//!
//! Every packet begins with `checksum (32) | sequence (16) | type tag`, where
//! the tag is a ranged integer over the registered packet types and tag `0`
//! marks a fragment. Fragments continue with `fragment_id (8) |
//! fragment_count (8)`, zero padding to a byte boundary, and the payload. The
//! payload length is never written; the decoder infers it from what remains.

use super::{ConfigError, HeaderError};
use crate::{
    SequenceNumber,
    bitstream::{BitReader, BitWriter, StreamError, bits_required},
    packet::PacketType,
};

/// Bits used by the checksum and sequence fields.
const PREFIX_FIXED_BITS: usize = 32 + 16;
/// Bits used by the fragment id and count fields.
const FRAGMENT_FIELD_BITS: usize = 8 + 8;

/// Header describing a single fragment.
///
/// # Examples
///
/// ```
/// use wirefrag::{SequenceNumber, fragment::FragmentHeader};
/// let header = FragmentHeader::new(SequenceNumber::new(7), 1, 3);
/// assert_eq!(header.sequence().get(), 7);
/// assert!(!header.is_last_fragment());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FragmentHeader {
    checksum: u32,
    sequence: SequenceNumber,
    fragment_id: u8,
    fragment_count: u8,
}

impl FragmentHeader {
    /// Create a header with a zeroed checksum.
    #[must_use]
    pub const fn new(sequence: SequenceNumber, fragment_id: u8, fragment_count: u8) -> Self {
        Self {
            checksum: 0,
            sequence,
            fragment_id,
            fragment_count,
        }
    }

    /// Checksum carried on the wire; zero before stamping.
    #[must_use]
    pub const fn checksum(&self) -> u32 { self.checksum }

    /// Sequence of the message this fragment belongs to.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber { self.sequence }

    /// Zero-based position within the message.
    #[must_use]
    pub const fn fragment_id(&self) -> u8 { self.fragment_id }

    /// Number of fragments the message was split into.
    #[must_use]
    pub const fn fragment_count(&self) -> u8 { self.fragment_count }

    /// Report whether this is the final fragment.
    #[must_use]
    pub const fn is_last_fragment(&self) -> bool {
        self.fragment_id.wrapping_add(1) == self.fragment_count
    }
}

/// A packet classified by its header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodedPacket<'a> {
    /// One fragment of a split message.
    Fragment {
        header: FragmentHeader,
        payload: &'a [u8],
    },
    /// A whole message whose payload belongs to the packet factory.
    Whole {
        checksum: u32,
        sequence: SequenceNumber,
        packet_type: PacketType,
    },
}

impl DecodedPacket<'_> {
    /// Checksum embedded in the packet.
    #[must_use]
    pub const fn checksum(&self) -> u32 {
        match self {
            Self::Fragment { header, .. } => header.checksum(),
            Self::Whole { checksum, .. } => *checksum,
        }
    }

    /// Sequence carried by the packet.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber {
        match self {
            Self::Fragment { header, .. } => header.sequence(),
            Self::Whole { sequence, .. } => *sequence,
        }
    }
}

/// Encodes and decodes packet prefixes for a fixed packet-type registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderCodec {
    max_type: i32,
    type_bits: u32,
    max_fragment_size: usize,
}

impl HeaderCodec {
    /// Build a codec for `num_packet_types` tags (the fragment tag included).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PacketTypes`] for fewer than two types or more
    /// than fit an `i32` range, and [`ConfigError::ZeroFragmentSize`] for a
    /// zero fragment size.
    pub fn new(num_packet_types: u32, max_fragment_size: usize) -> Result<Self, ConfigError> {
        if num_packet_types < 2 {
            return Err(ConfigError::PacketTypes(num_packet_types));
        }
        let max_type = i32::try_from(num_packet_types - 1)
            .map_err(|_| ConfigError::PacketTypes(num_packet_types))?;
        if max_fragment_size == 0 {
            return Err(ConfigError::ZeroFragmentSize);
        }
        Ok(Self {
            max_type,
            type_bits: bits_required(0, i64::from(max_type)),
            max_fragment_size,
        })
    }

    /// Bits occupied by the type tag.
    #[must_use]
    pub const fn type_bits(&self) -> u32 { self.type_bits }

    /// Largest fragment payload accepted by [`decode`](Self::decode).
    #[must_use]
    pub const fn max_fragment_size(&self) -> usize { self.max_fragment_size }

    /// Bytes occupied by a fragment header, padding included.
    #[must_use]
    pub const fn fragment_header_len(&self) -> usize {
        (PREFIX_FIXED_BITS + self.type_bits as usize + FRAGMENT_FIELD_BITS).div_ceil(8)
    }

    /// Largest encoded fragment packet.
    #[must_use]
    pub const fn max_fragment_packet_len(&self) -> usize {
        self.fragment_header_len() + self.max_fragment_size
    }

    /// Write `checksum | sequence | type tag`.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] if the writer is full or the tag is not
    /// registered.
    pub fn write_prefix(
        &self,
        writer: &mut BitWriter,
        checksum: u32,
        sequence: SequenceNumber,
        packet_type: PacketType,
    ) -> Result<(), StreamError> {
        let tag = i32::try_from(packet_type.get()).map_err(|_| StreamError::ValueOutOfRange {
            value: i64::from(packet_type.get()),
            min: 0,
            max: i64::from(self.max_type),
        })?;
        writer.write_bits(checksum, 32)?;
        writer.write_bits(u32::from(sequence.get()), 16)?;
        writer.write_ranged(tag, 0, self.max_type)
    }

    /// Read `checksum | sequence | type tag`.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Truncated`] when the prefix does not fit and
    /// [`HeaderError::UnknownPacketType`] for an unregistered tag.
    pub fn read_prefix(
        &self,
        reader: &mut BitReader<'_>,
    ) -> Result<(u32, SequenceNumber, PacketType), HeaderError> {
        let truncated = HeaderError::Truncated {
            len: reader.bits_remaining() / 8,
        };
        let checksum = reader.read_bits(32).map_err(|_| truncated)?;
        let sequence = reader.read_bits(16).map_err(|_| truncated)?;
        let sequence = u16::try_from(sequence).map_err(|_| truncated)?;
        let tag = reader
            .read_ranged(0, self.max_type)
            .map_err(|err| match err {
                StreamError::ValueOutOfRange { value, .. } => HeaderError::UnknownPacketType {
                    value,
                    num_types: self.num_types(),
                },
                _ => truncated,
            })?;
        let tag = u32::try_from(tag).map_err(|_| HeaderError::UnknownPacketType {
            value: i64::from(tag),
            num_types: self.num_types(),
        })?;
        Ok((checksum, SequenceNumber::new(sequence), PacketType::new(tag)))
    }

    fn num_types(&self) -> u32 { self.max_type.unsigned_abs() + 1 }

    /// Serialize a fragment header followed by its payload.
    ///
    /// The checksum field is written from `header`; callers stamp the real
    /// value afterwards with [`checksum::stamp`](crate::checksum::stamp).
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Overflow`] if the payload exceeds the maximum
    /// fragment size.
    pub fn encode_fragment(
        &self,
        header: &FragmentHeader,
        payload: &[u8],
    ) -> Result<Vec<u8>, StreamError> {
        let mut writer = BitWriter::with_capacity(self.max_fragment_packet_len());
        self.write_prefix(
            &mut writer,
            header.checksum(),
            header.sequence(),
            PacketType::FRAGMENT,
        )?;
        writer.write_bits(u32::from(header.fragment_id()), 8)?;
        writer.write_bits(u32::from(header.fragment_count()), 8)?;
        writer.align()?;
        writer.write_bytes(payload)?;
        Ok(writer.finish())
    }

    /// Classify `packet` and, for fragments, borrow its payload.
    ///
    /// # Errors
    ///
    /// Returns a [`HeaderError`] when the prefix is truncated, the tag is not
    /// registered, the fragment padding is dirty, or the inferred payload
    /// length is zero or above the maximum fragment size.
    pub fn decode<'a>(&self, packet: &'a [u8]) -> Result<DecodedPacket<'a>, HeaderError> {
        let mut reader = BitReader::new(packet);
        let (checksum, sequence, packet_type) = self.read_prefix(&mut reader)?;
        if !packet_type.is_fragment() {
            return Ok(DecodedPacket::Whole {
                checksum,
                sequence,
                packet_type,
            });
        }

        let truncated = HeaderError::Truncated { len: packet.len() };
        let fragment_id = reader.read_bits(8).map_err(|_| truncated)?;
        let fragment_count = reader.read_bits(8).map_err(|_| truncated)?;
        reader.align().map_err(|err| match err {
            StreamError::NonZeroPadding => HeaderError::NonZeroPadding,
            _ => truncated,
        })?;

        let payload_len = reader.bits_remaining() / 8;
        if payload_len == 0 {
            return Err(HeaderError::EmptyPayload);
        }
        if payload_len > self.max_fragment_size {
            return Err(HeaderError::PayloadTooLarge {
                len: payload_len,
                max: self.max_fragment_size,
            });
        }
        let payload = reader.read_bytes(payload_len).map_err(|_| truncated)?;

        let mut header = FragmentHeader::new(
            sequence,
            u8::try_from(fragment_id).map_err(|_| truncated)?,
            u8::try_from(fragment_count).map_err(|_| truncated)?,
        );
        header.checksum = checksum;
        Ok(DecodedPacket::Fragment { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    /// Codec with four packet types (two-bit tag) and 16-byte fragments.
    #[fixture]
    fn codec() -> HeaderCodec { HeaderCodec::new(4, 16).expect("valid codec") }

    #[rstest]
    fn fragment_header_len_includes_padding(codec: HeaderCodec) {
        // 32 + 16 + 2 + 8 + 8 = 66 bits, padded to 9 bytes.
        assert_eq!(codec.type_bits(), 2);
        assert_eq!(codec.fragment_header_len(), 9);
    }

    #[rstest]
    fn fragment_round_trips_with_inferred_length(codec: HeaderCodec) {
        let header = FragmentHeader::new(SequenceNumber::new(513), 2, 3);
        let encoded = codec
            .encode_fragment(&header, &[1, 2, 3, 4, 5])
            .expect("encode fragment");
        assert_eq!(encoded.len(), codec.fragment_header_len() + 5);

        let DecodedPacket::Fragment {
            header: decoded,
            payload,
        } = codec.decode(&encoded).expect("decode fragment")
        else {
            panic!("expected a fragment");
        };
        assert_eq!(decoded, header);
        assert_eq!(payload, &[1, 2, 3, 4, 5]);
        assert!(decoded.is_last_fragment());
    }

    #[rstest]
    fn whole_packets_report_their_type(codec: HeaderCodec) {
        let mut writer = BitWriter::with_capacity(16);
        codec
            .write_prefix(&mut writer, 0, SequenceNumber::new(9), PacketType::new(3))
            .expect("write prefix");
        writer.write_bits(0xAB, 8).expect("payload");
        let bytes = writer.finish();

        let decoded = codec.decode(&bytes).expect("decode whole packet");
        assert_eq!(
            decoded,
            DecodedPacket::Whole {
                checksum: 0,
                sequence: SequenceNumber::new(9),
                packet_type: PacketType::new(3),
            }
        );
    }

    #[rstest]
    fn truncated_prefix_is_rejected(codec: HeaderCodec) {
        assert!(matches!(
            codec.decode(&[0, 0, 0, 0, 1]),
            Err(HeaderError::Truncated { .. })
        ));
    }

    #[rstest]
    fn fragment_without_payload_is_rejected(codec: HeaderCodec) {
        let header = FragmentHeader::new(SequenceNumber::new(1), 0, 1);
        let encoded = codec.encode_fragment(&header, &[]).expect("encode header");
        assert_eq!(codec.decode(&encoded), Err(HeaderError::EmptyPayload));
    }

    #[rstest]
    fn oversized_fragment_payload_is_rejected(codec: HeaderCodec) {
        let header = FragmentHeader::new(SequenceNumber::new(1), 0, 1);
        let mut encoded = codec
            .encode_fragment(&header, &[7; 16])
            .expect("encode full fragment");
        encoded.push(7);
        assert_eq!(
            codec.decode(&encoded),
            Err(HeaderError::PayloadTooLarge { len: 17, max: 16 })
        );
    }

    #[rstest]
    fn dirty_padding_is_rejected(codec: HeaderCodec) {
        let header = FragmentHeader::new(SequenceNumber::new(1), 0, 1);
        let mut encoded = codec.encode_fragment(&header, &[1]).expect("encode");
        // The last header byte holds 2 bits of count and 6 padding bits.
        encoded[codec.fragment_header_len() - 1] |= 0x01;
        assert_eq!(codec.decode(&encoded), Err(HeaderError::NonZeroPadding));
    }

    #[test]
    fn unregistered_tag_is_rejected() {
        // Three types use a two-bit tag, so tag 3 is representable but unknown.
        let codec = HeaderCodec::new(3, 16).expect("valid codec");
        let bytes = [0, 0, 0, 0, 0, 1, 0b1100_0000];
        assert_eq!(
            codec.decode(&bytes),
            Err(HeaderError::UnknownPacketType {
                value: 3,
                num_types: 3
            })
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn too_few_packet_types_are_rejected(#[case] types: u32) {
        assert_eq!(
            HeaderCodec::new(types, 16),
            Err(ConfigError::PacketTypes(types))
        );
    }

    #[rstest]
    fn oversized_payload_fails_to_encode(codec: HeaderCodec) {
        let header = FragmentHeader::new(SequenceNumber::new(1), 0, 1);
        assert!(matches!(
            codec.encode_fragment(&header, &[0; 17]),
            Err(StreamError::Overflow { .. })
        ));
    }
}
