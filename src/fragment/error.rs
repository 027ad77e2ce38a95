//! Error and status types emitted by the fragmentation layer.
//!
//! Every rejection names the check that failed so callers can log or count
//! drops precisely. None of these errors is fatal: the offending packet is
//! simply discarded.

use thiserror::Error;

use crate::{SequenceNumber, bitstream::StreamError};

/// Outcome of admitting a fragment into the reassembly buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentStatus {
    /// The fragment was stored; the message still expects more fragments.
    Incomplete,
    /// The fragment was stored and completed its message.
    Complete,
    /// The fragment had already been received and was ignored.
    Duplicate,
}

/// Errors produced while decoding a packet prefix or fragment header.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// The packet ended before the fixed header fields.
    #[error("packet of {len} bytes is too short for its header")]
    Truncated { len: usize },
    /// The type tag does not name a registered packet type.
    #[error("packet type {value} is not one of {num_types} registered types")]
    UnknownPacketType { value: i64, num_types: u32 },
    /// The fragment header padding contained set bits.
    #[error("fragment header padding is not zero")]
    NonZeroPadding,
    /// The fragment carried no payload bytes.
    #[error("fragment payload is empty")]
    EmptyPayload,
    /// The inferred fragment payload exceeds the maximum fragment size.
    #[error("fragment payload of {len} bytes exceeds maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Errors produced while splitting an outbound message.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    /// Empty messages cannot be split.
    #[error("cannot split an empty message")]
    EmptyMessage,
    /// The message needs more fragments than a message may carry.
    #[error("message of {len} bytes needs {count} fragments; maximum is {max}")]
    TooManyFragments { len: usize, count: usize, max: usize },
    /// Serializing a fragment failed; no fragments were returned.
    #[error("failed to encode fragment {fragment_id}: {source}")]
    Encode {
        fragment_id: usize,
        #[source]
        source: StreamError,
    },
}

/// Reasons a fragment is refused by the reassembly buffer.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AdmitError {
    /// The global fragment ceiling has been reached.
    #[error("reassembly buffer holds {buffered} fragments; ceiling is {max}")]
    BufferFull { buffered: usize, max: usize },
    /// The fragment carried no bytes.
    #[error("fragment is empty")]
    EmptyFragment,
    /// The fragment exceeds the maximum fragment size.
    #[error("fragment of {len} bytes exceeds maximum of {max}")]
    FragmentTooLarge { len: usize, max: usize },
    /// The fragment count is zero or above the per-message maximum.
    #[error("fragment count {count} outside 1..={max}")]
    InvalidFragmentCount { count: u8, max: usize },
    /// The fragment id does not fall below the fragment count.
    #[error("fragment id {fragment_id} out of range for {fragment_count} fragments")]
    FragmentIdOutOfRange { fragment_id: u8, fragment_count: u8 },
    /// Only the final fragment of a message may be shorter than the maximum.
    #[error("non-terminal fragment {fragment_id} has {len} bytes; expected {expected}")]
    NonTerminalFragmentSizeMismatch {
        fragment_id: u8,
        len: usize,
        expected: usize,
    },
    /// The sequence is implausibly far from the current window.
    #[error("sequence {sequence} is {distance} away from current {current}; tolerance is {tolerance}")]
    SequenceOutOfRange {
        sequence: SequenceNumber,
        current: SequenceNumber,
        distance: u16,
        tolerance: u16,
    },
    /// The sequence has already slid out of the retained window.
    #[error("sequence {sequence} is older than the retained window starting at {oldest}")]
    StaleSequence {
        sequence: SequenceNumber,
        oldest: SequenceNumber,
    },
    /// Another message still occupies the slot for this sequence.
    #[error("slot for sequence {sequence} is held by sequence {occupant}")]
    SlotSequenceConflict {
        sequence: SequenceNumber,
        occupant: SequenceNumber,
    },
    /// The fragment disagrees with the count recorded for its message.
    #[error("fragment count {found} disagrees with recorded count {expected}")]
    FragmentCountMismatch { expected: u8, found: u8 },
}

impl AdmitError {
    /// Short, stable label for logs and metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::BufferFull { .. } => "buffer_full",
            Self::EmptyFragment => "empty_fragment",
            Self::FragmentTooLarge { .. } => "fragment_too_large",
            Self::InvalidFragmentCount { .. } => "invalid_fragment_count",
            Self::FragmentIdOutOfRange { .. } => "fragment_id_out_of_range",
            Self::NonTerminalFragmentSizeMismatch { .. } => "non_terminal_size_mismatch",
            Self::SequenceOutOfRange { .. } => "sequence_out_of_range",
            Self::StaleSequence { .. } => "stale_sequence",
            Self::SlotSequenceConflict { .. } => "slot_sequence_conflict",
            Self::FragmentCountMismatch { .. } => "fragment_count_mismatch",
        }
    }
}

/// Errors produced while dispatching an inbound wire packet.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ProcessError {
    /// The header could not be decoded.
    #[error("malformed header: {0}")]
    Header(#[from] HeaderError),
    /// The embedded checksum does not match the packet contents.
    #[error("checksum mismatch: packet carries {found:#010x}, computed {expected:#010x}")]
    ChecksumMismatch { expected: u32, found: u32 },
    /// The reassembly buffer refused the fragment.
    #[error("fragment rejected: {0}")]
    Admit(#[from] AdmitError),
}

impl ProcessError {
    /// Short, stable label for logs and metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Header(_) => "malformed_header",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
            Self::Admit(err) => err.reason(),
        }
    }
}
