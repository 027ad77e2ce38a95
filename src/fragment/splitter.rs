//! Outbound helper that carves oversized packets into wire fragments.
//!
//! [`Splitter`] slices a serialized packet into `max_fragment_size` chunks,
//! prefixes each with a [`FragmentHeader`], and stamps a checksum over the
//! result. Every fragment is a self-contained datagram. Splitting is
//! all-or-nothing: if any fragment fails to encode, no fragments are returned.

use bytes::Bytes;

use super::{ConfigError, FragmentHeader, FragmentationConfig, HeaderCodec, SplitError};
use crate::{SequenceNumber, checksum};

/// Splits packets into checksummed fragment datagrams.
#[derive(Clone, Copy, Debug)]
pub struct Splitter {
    header: HeaderCodec,
    max_fragments_per_message: usize,
    protocol_id: u32,
}

impl Splitter {
    /// Create a splitter for a registry of `num_packet_types` tags.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` is invalid or the registry has
    /// fewer than two types.
    pub fn new(config: &FragmentationConfig, num_packet_types: u32) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            header: HeaderCodec::new(num_packet_types, config.max_fragment_size)?,
            max_fragments_per_message: config.max_fragments_per_message,
            protocol_id: config.protocol_id,
        })
    }

    /// Maximum payload bytes per fragment.
    #[must_use]
    pub const fn max_fragment_size(&self) -> usize { self.header.max_fragment_size() }

    /// Whether a packet of `len` bytes must be split before sending.
    #[must_use]
    pub const fn needs_split(&self, len: usize) -> bool { len > self.max_fragment_size() }

    /// Split `message` into fragments tagged with `sequence`.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::EmptyMessage`] for an empty message,
    /// [`SplitError::TooManyFragments`] when the message needs more fragments
    /// than allowed, and [`SplitError::Encode`] if a fragment fails to
    /// serialize.
    pub fn split(
        &self,
        sequence: SequenceNumber,
        message: impl AsRef<[u8]>,
    ) -> Result<FragmentBatch, SplitError> {
        let message = message.as_ref();
        if message.is_empty() {
            return Err(SplitError::EmptyMessage);
        }

        let count = message.len().div_ceil(self.max_fragment_size());
        let fragment_count = u8::try_from(count)
            .ok()
            .filter(|_| count <= self.max_fragments_per_message)
            .ok_or(SplitError::TooManyFragments {
                len: message.len(),
                count,
                max: self.max_fragments_per_message,
            })?;

        let fragments = message
            .chunks(self.max_fragment_size())
            .zip(0..fragment_count)
            .map(|(payload, fragment_id)| {
                self.encode(FragmentHeader::new(sequence, fragment_id, fragment_count), payload)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FragmentBatch::new(sequence, fragments))
    }

    // Chunks never exceed `max_fragment_size` and every encoded fragment is
    // longer than its checksum field, so neither error branch below fires
    // for input carved by `split`.
    fn encode(&self, header: FragmentHeader, payload: &[u8]) -> Result<Bytes, SplitError> {
        debug_assert!(
            payload.len() <= self.max_fragment_size(),
            "split chunks fit the fragment writer"
        );
        let encode_error = |source| SplitError::Encode {
            fragment_id: usize::from(header.fragment_id()),
            source,
        };
        let mut bytes = self
            .header
            .encode_fragment(&header, payload)
            .map_err(encode_error)?;
        checksum::stamp(self.protocol_id, &mut bytes).ok_or_else(|| {
            encode_error(crate::bitstream::StreamError::Underflow {
                requested: checksum::CHECKSUM_LEN * 8,
                remaining: 0,
            })
        })?;
        Ok(Bytes::from(bytes))
    }
}

/// Wire fragments produced for a single message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentBatch {
    sequence: SequenceNumber,
    fragments: Vec<Bytes>,
}

impl FragmentBatch {
    fn new(sequence: SequenceNumber, fragments: Vec<Bytes>) -> Self {
        debug_assert!(!fragments.is_empty(), "fragment batches must not be empty");
        Self {
            sequence,
            fragments,
        }
    }

    /// Sequence shared by every fragment.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber { self.sequence }

    /// The encoded fragments in `fragment_id` order.
    #[must_use]
    pub fn fragments(&self) -> &[Bytes] { self.fragments.as_slice() }

    /// Number of fragments in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.fragments.len() }

    /// Whether the message needed more than one fragment.
    #[must_use]
    pub fn is_fragmented(&self) -> bool { self.len() > 1 }
}

impl IntoIterator for FragmentBatch {
    type Item = Bytes;
    type IntoIter = std::vec::IntoIter<Bytes>;

    fn into_iter(self) -> Self::IntoIter { self.fragments.into_iter() }
}
