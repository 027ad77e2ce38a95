//! Sliding-window buffer that stitches fragments back into messages.
//!
//! [`ReassemblyBuffer`] keeps `W` slots indexed by `sequence mod W`. Each slot
//! is either empty or holds the [`PacketBufferEntry`] of one in-flight
//! message. Entries are created lazily by the first fragment of a sequence,
//! removed when their message is drained, and evicted when the window slides
//! past them. A global ceiling bounds how many fragments may be held at once,
//! so adversarial input cannot grow memory without limit.

use std::mem;

use tracing::{debug, trace};

use super::{AdmitError, ConfigError, FragmentStatus, FragmentationConfig};
use crate::{
    SequenceNumber,
    metrics,
    packet::{PacketCodec, PacketFactory, ReadError},
};

/// State of one window slot.
#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Occupied(PacketBufferEntry),
}

/// Fragments received so far for one in-flight message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketBufferEntry {
    sequence: SequenceNumber,
    fragment_count: u8,
    received_count: u8,
    fragments: Vec<Option<Vec<u8>>>,
}

impl PacketBufferEntry {
    fn new(sequence: SequenceNumber, fragment_count: u8) -> Self {
        Self {
            sequence,
            fragment_count,
            received_count: 0,
            fragments: vec![None; usize::from(fragment_count)],
        }
    }

    /// Sequence of the message being assembled.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber { self.sequence }

    /// Number of fragments the message was split into.
    #[must_use]
    pub const fn fragment_count(&self) -> u8 { self.fragment_count }

    /// Number of distinct fragments received.
    #[must_use]
    pub const fn received_count(&self) -> u8 { self.received_count }

    /// Borrow fragment `fragment_id` if it has arrived.
    #[must_use]
    pub fn fragment(&self, fragment_id: u8) -> Option<&[u8]> {
        self.fragments.get(usize::from(fragment_id))?.as_deref()
    }

    /// Size of fragment `fragment_id`, or zero if it has not arrived.
    #[must_use]
    pub fn fragment_size(&self, fragment_id: u8) -> usize {
        self.fragment(fragment_id).map_or(0, <[u8]>::len)
    }

    /// Whether every fragment has arrived.
    #[must_use]
    pub const fn is_complete(&self) -> bool { self.received_count == self.fragment_count }

    fn has_fragment(&self, fragment_id: u8) -> bool { self.fragment(fragment_id).is_some() }

    fn store(&mut self, fragment_id: u8, bytes: &[u8]) {
        if let Some(slot) = self.fragments.get_mut(usize::from(fragment_id)) {
            debug_assert!(slot.is_none(), "fragment stored twice");
            *slot = Some(bytes.to_vec());
            self.received_count += 1;
        }
    }

    /// Concatenate fragments in `fragment_id` order, consuming the entry.
    fn into_payload(self) -> Vec<u8> {
        let len = self.fragments.iter().flatten().map(Vec::len).sum();
        let mut payload = Vec::with_capacity(len);
        for fragment in self.fragments.into_iter().flatten() {
            payload.extend_from_slice(&fragment);
        }
        payload
    }
}

/// Container for a fully reassembled message.
///
/// The payload is always a complete wire packet, whether or not it was
/// split in transit, so it can be handed straight to
/// [`PacketCodec::read`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReassembledMessage {
    sequence: SequenceNumber,
    payload: Vec<u8>,
}

impl ReassembledMessage {
    /// Construct a new [`ReassembledMessage`].
    #[must_use]
    pub fn new(sequence: SequenceNumber, payload: Vec<u8>) -> Self { Self { sequence, payload } }

    /// Sequence shared by the fragments that formed this message.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber { self.sequence }

    /// Borrow the reassembled bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { self.payload.as_slice() }

    /// Consume the message, returning the owned bytes.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> { self.payload }

    /// Decode the bytes into a packet of the codec's factory.
    ///
    /// # Errors
    ///
    /// Returns any [`ReadError`] raised while reading the packet.
    pub fn decode<F: PacketFactory>(&self, codec: &PacketCodec<F>) -> Result<F::Packet, ReadError> {
        let (_, packet) = codec.read(self.payload())?;
        Ok(packet)
    }
}

/// Fixed-capacity window of in-progress messages.
///
/// # Examples
///
/// ```
/// use wirefrag::{
///     SequenceNumber,
///     fragment::{FragmentStatus, FragmentationConfig, ReassemblyBuffer},
/// };
///
/// let config = FragmentationConfig {
///     window_size: 8,
///     max_fragment_size: 4,
///     max_fragments_per_message: 4,
///     ..FragmentationConfig::default()
/// };
/// let mut buffer = ReassemblyBuffer::new(config).expect("valid config");
/// let sequence = SequenceNumber::new(3);
///
/// let status = buffer.admit_fragment(b"ab", 1, 2, sequence).expect("admit");
/// assert_eq!(status, FragmentStatus::Incomplete);
/// let status = buffer.admit_fragment(b"wxyz", 0, 2, sequence).expect("admit");
/// assert_eq!(status, FragmentStatus::Complete);
///
/// let messages = buffer.drain_completed();
/// assert_eq!(messages[0].payload(), b"wxyzab");
/// assert_eq!(buffer.buffered_fragments(), 0);
/// ```
#[derive(Debug)]
pub struct ReassemblyBuffer {
    config: FragmentationConfig,
    window: u16,
    slots: Box<[Slot]>,
    current_sequence: SequenceNumber,
    buffered_fragments: usize,
}

impl ReassemblyBuffer {
    /// Create an empty buffer whose window ends at sequence `0`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(config: FragmentationConfig) -> Result<Self, ConfigError> {
        Self::with_starting_sequence(config, SequenceNumber::default())
    }

    /// Create an empty buffer whose window ends at `sequence`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn with_starting_sequence(
        config: FragmentationConfig,
        sequence: SequenceNumber,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let slots = (0..config.window_size).map(|_| Slot::Empty).collect();
        Ok(Self {
            window: config.window_u16(),
            config,
            slots,
            current_sequence: sequence,
            buffered_fragments: 0,
        })
    }

    /// Configuration the buffer enforces.
    #[must_use]
    pub const fn config(&self) -> &FragmentationConfig { &self.config }

    /// Highest sequence that has opened an entry.
    #[must_use]
    pub const fn current_sequence(&self) -> SequenceNumber { self.current_sequence }

    /// Oldest sequence still inside the window.
    #[must_use]
    pub const fn oldest_sequence(&self) -> SequenceNumber {
        self.current_sequence.wrapping_sub(self.window - 1)
    }

    /// Fragments currently held across all entries.
    #[must_use]
    pub const fn buffered_fragments(&self) -> usize { self.buffered_fragments }

    /// Borrow the entry for `sequence`, if one is in flight.
    #[must_use]
    pub fn entry(&self, sequence: SequenceNumber) -> Option<&PacketBufferEntry> {
        match &self.slots[self.slot_index(sequence)] {
            Slot::Occupied(entry) if entry.sequence == sequence => Some(entry),
            _ => None,
        }
    }

    /// Iterate over occupied slots as `(slot index, entry)` pairs.
    pub fn occupied_slots(&self) -> impl Iterator<Item = (usize, &PacketBufferEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(entry) => Some((index, entry)),
                Slot::Empty => None,
            })
    }

    /// Slot index that `sequence` maps to.
    #[must_use]
    pub fn slot_index(&self, sequence: SequenceNumber) -> usize {
        usize::from(sequence.get()) % self.slots.len()
    }

    /// Slide the window so it ends at `sequence`, evicting entries that fall
    /// out of it.
    ///
    /// Does nothing unless `sequence` is newer than the current sequence.
    /// Returns the sequences of evicted entries, oldest slot first.
    pub fn advance(&mut self, sequence: SequenceNumber) -> Vec<SequenceNumber> {
        if !sequence.is_newer_than(self.current_sequence) {
            return Vec::new();
        }

        let window = self.window;
        let mut evicted = Vec::new();
        for slot in &mut *self.slots {
            let stale = matches!(
                slot,
                Slot::Occupied(entry) if sequence.get().wrapping_sub(entry.sequence.get()) >= window
            );
            if !stale {
                continue;
            }
            if let Slot::Occupied(entry) = mem::take(slot) {
                trace!(
                    "evicting entry: sequence={}, received={}, expected={}",
                    entry.sequence, entry.received_count, entry.fragment_count
                );
                self.buffered_fragments -= usize::from(entry.received_count);
                evicted.push(entry.sequence);
            }
        }
        self.current_sequence = sequence;

        if !evicted.is_empty() {
            debug!(
                "window advanced: current={sequence}, evicted={}, buffered={}",
                evicted.len(),
                self.buffered_fragments
            );
            metrics::inc_evicted(evicted.len());
            metrics::set_buffered(self.buffered_fragments);
        }
        self.debug_check_accounting();
        evicted
    }

    /// Validate and store one fragment.
    ///
    /// Returns [`FragmentStatus::Complete`] when the fragment finishes its
    /// message, [`FragmentStatus::Incomplete`] while more are expected, and
    /// [`FragmentStatus::Duplicate`] if the fragment was already held.
    ///
    /// # Errors
    ///
    /// Returns an [`AdmitError`] naming the first check that failed. A
    /// rejected fragment leaves the buffer unchanged.
    pub fn admit_fragment(
        &mut self,
        bytes: &[u8],
        fragment_id: u8,
        fragment_count: u8,
        sequence: SequenceNumber,
    ) -> Result<FragmentStatus, AdmitError> {
        let result = self.try_admit(bytes, fragment_id, fragment_count, sequence);
        match result {
            Ok(FragmentStatus::Duplicate) => {
                debug!("duplicate fragment ignored: sequence={sequence}, fragment_id={fragment_id}");
                metrics::inc_duplicate();
            }
            Ok(status) => {
                trace!(
                    "fragment stored: sequence={sequence}, fragment_id={fragment_id}, \
                     fragment_count={fragment_count}, status={status:?}"
                );
                metrics::inc_admitted();
                metrics::set_buffered(self.buffered_fragments);
            }
            Err(err) => {
                debug!(
                    "fragment rejected: sequence={sequence}, fragment_id={fragment_id}, \
                     reason={}, error={err}",
                    err.reason()
                );
                metrics::inc_rejected(err.reason());
            }
        }
        self.debug_check_accounting();
        result
    }

    fn try_admit(
        &mut self,
        bytes: &[u8],
        fragment_id: u8,
        fragment_count: u8,
        sequence: SequenceNumber,
    ) -> Result<FragmentStatus, AdmitError> {
        self.check_fragment(bytes, fragment_id, fragment_count)?;
        self.check_sequence(sequence)?;

        let index = self.slot_index(sequence);
        if let Slot::Occupied(entry) = &self.slots[index] {
            if entry.sequence != sequence {
                return Err(AdmitError::SlotSequenceConflict {
                    sequence,
                    occupant: entry.sequence,
                });
            }
            if entry.fragment_count != fragment_count {
                return Err(AdmitError::FragmentCountMismatch {
                    expected: entry.fragment_count,
                    found: fragment_count,
                });
            }
            if entry.has_fragment(fragment_id) {
                return Ok(FragmentStatus::Duplicate);
            }
        } else {
            self.advance(sequence);
            trace!("opening entry: sequence={sequence}, slot={index}, fragment_count={fragment_count}");
            self.slots[index] = Slot::Occupied(PacketBufferEntry::new(sequence, fragment_count));
        }

        let Slot::Occupied(entry) = &mut self.slots[index] else {
            return Ok(FragmentStatus::Incomplete);
        };
        entry.store(fragment_id, bytes);
        self.buffered_fragments += 1;
        Ok(if entry.is_complete() {
            FragmentStatus::Complete
        } else {
            FragmentStatus::Incomplete
        })
    }

    /// Checks that depend only on the fragment and the global ceiling.
    fn check_fragment(
        &self,
        bytes: &[u8],
        fragment_id: u8,
        fragment_count: u8,
    ) -> Result<(), AdmitError> {
        let config = &self.config;
        if self.buffered_fragments >= config.max_buffered_fragments {
            return Err(AdmitError::BufferFull {
                buffered: self.buffered_fragments,
                max: config.max_buffered_fragments,
            });
        }
        if bytes.is_empty() {
            return Err(AdmitError::EmptyFragment);
        }
        if bytes.len() > config.max_fragment_size {
            return Err(AdmitError::FragmentTooLarge {
                len: bytes.len(),
                max: config.max_fragment_size,
            });
        }
        if fragment_count == 0 || usize::from(fragment_count) > config.max_fragments_per_message {
            return Err(AdmitError::InvalidFragmentCount {
                count: fragment_count,
                max: config.max_fragments_per_message,
            });
        }
        if fragment_id >= fragment_count {
            return Err(AdmitError::FragmentIdOutOfRange {
                fragment_id,
                fragment_count,
            });
        }
        if fragment_id != fragment_count - 1 && bytes.len() != config.max_fragment_size {
            return Err(AdmitError::NonTerminalFragmentSizeMismatch {
                fragment_id,
                len: bytes.len(),
                expected: config.max_fragment_size,
            });
        }
        Ok(())
    }

    /// Checks placing `sequence` relative to the window.
    fn check_sequence(&self, sequence: SequenceNumber) -> Result<(), AdmitError> {
        let current = self.current_sequence;
        let distance = sequence.distance(current);
        if distance > self.config.sequence_tolerance {
            return Err(AdmitError::SequenceOutOfRange {
                sequence,
                current,
                distance,
                tolerance: self.config.sequence_tolerance,
            });
        }
        if !sequence.is_newer_than(current) && current.get().wrapping_sub(sequence.get()) >= self.window
        {
            return Err(AdmitError::StaleSequence {
                sequence,
                oldest: self.oldest_sequence(),
            });
        }
        Ok(())
    }

    /// Extract every complete message, oldest first.
    ///
    /// Incomplete entries stay in place.
    pub fn drain_completed(&mut self) -> Vec<ReassembledMessage> {
        let oldest = self.oldest_sequence();
        let mut messages = Vec::new();
        for offset in 0..self.window {
            let sequence = oldest.wrapping_add(offset);
            let index = self.slot_index(sequence);
            let ready = matches!(
                &self.slots[index],
                Slot::Occupied(entry) if entry.sequence == sequence && entry.is_complete()
            );
            if !ready {
                continue;
            }
            if let Slot::Occupied(entry) = mem::take(&mut self.slots[index]) {
                self.buffered_fragments -= usize::from(entry.received_count);
                let payload = entry.into_payload();
                trace!("message reassembled: sequence={sequence}, len={}", payload.len());
                messages.push(ReassembledMessage::new(sequence, payload));
            }
        }

        if !messages.is_empty() {
            metrics::inc_reassembled(messages.len());
            metrics::set_buffered(self.buffered_fragments);
        }
        self.debug_check_accounting();
        messages
    }

    /// Sum of `received_count` across occupied slots.
    fn recount(&self) -> usize {
        self.occupied_slots()
            .map(|(_, entry)| usize::from(entry.received_count))
            .sum()
    }

    fn debug_check_accounting(&self) {
        debug_assert_eq!(
            self.buffered_fragments,
            self.recount(),
            "buffered fragment count drifted from slot contents"
        );
    }
}
