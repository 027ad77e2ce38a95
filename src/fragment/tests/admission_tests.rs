//! Tests for reassembly buffer admission checks and accounting.

use rstest::{fixture, rstest};

use crate::{
    SequenceNumber,
    fragment::{
        AdmitError,
        FragmentStatus,
        FragmentationConfig,
        PacketBufferEntry,
        ReassemblyBuffer,
    },
};

type Snapshot = (SequenceNumber, usize, Vec<(usize, PacketBufferEntry)>);

fn seq(value: u16) -> SequenceNumber { SequenceNumber::new(value) }

fn snapshot(buffer: &ReassemblyBuffer) -> Snapshot {
    (
        buffer.current_sequence(),
        buffer.buffered_fragments(),
        buffer
            .occupied_slots()
            .map(|(index, entry)| (index, entry.clone()))
            .collect(),
    )
}

/// Buffer with `W = 8` holding fragment 0 of a three-fragment message at
/// sequence 10.
#[fixture]
fn buffer() -> ReassemblyBuffer {
    let config = FragmentationConfig {
        window_size: 8,
        max_fragment_size: 1024,
        max_fragments_per_message: 4,
        max_buffered_fragments: 4,
        ..FragmentationConfig::default()
    };
    let mut buffer = ReassemblyBuffer::new(config).expect("valid config");
    let status = buffer
        .admit_fragment(&[0; 1024], 0, 3, seq(10))
        .expect("seed fragment");
    assert_eq!(status, FragmentStatus::Incomplete);
    buffer
}

#[rstest]
#[case::empty(0, 1, 3, 10, AdmitError::EmptyFragment)]
#[case::too_large(1025, 1, 3, 10, AdmitError::FragmentTooLarge { len: 1025, max: 1024 })]
#[case::zero_count(10, 0, 0, 11, AdmitError::InvalidFragmentCount { count: 0, max: 4 })]
#[case::count_above_max(10, 0, 5, 11, AdmitError::InvalidFragmentCount { count: 5, max: 4 })]
#[case::id_out_of_range(
    10, 3, 3, 10,
    AdmitError::FragmentIdOutOfRange { fragment_id: 3, fragment_count: 3 }
)]
#[case::short_non_terminal(
    100, 0, 2, 11,
    AdmitError::NonTerminalFragmentSizeMismatch { fragment_id: 0, len: 100, expected: 1024 }
)]
#[case::beyond_tolerance(
    10, 0, 1, 10_251,
    AdmitError::SequenceOutOfRange {
        sequence: SequenceNumber::new(10_251),
        current: SequenceNumber::new(10),
        distance: 10_241,
        tolerance: 10_240,
    }
)]
#[case::stale(
    10, 0, 1, 2,
    AdmitError::StaleSequence { sequence: SequenceNumber::new(2), oldest: SequenceNumber::new(3) }
)]
#[case::slot_conflict(
    10, 0, 1, 18,
    AdmitError::SlotSequenceConflict {
        sequence: SequenceNumber::new(18),
        occupant: SequenceNumber::new(10),
    }
)]
#[case::count_mismatch(10, 1, 2, 10, AdmitError::FragmentCountMismatch { expected: 3, found: 2 })]
fn malformed_fragments_leave_state_unchanged(
    mut buffer: ReassemblyBuffer,
    #[case] len: usize,
    #[case] fragment_id: u8,
    #[case] fragment_count: u8,
    #[case] sequence: u16,
    #[case] expected: AdmitError,
) {
    let before = snapshot(&buffer);
    let result = buffer.admit_fragment(&vec![7; len], fragment_id, fragment_count, seq(sequence));
    assert_eq!(result, Err(expected));
    assert_eq!(snapshot(&buffer), before);
}

#[rstest]
fn full_buffer_refuses_every_fragment(mut buffer: ReassemblyBuffer) {
    buffer.admit_fragment(&[1; 1024], 1, 3, seq(10)).expect("second fragment");
    buffer.admit_fragment(&[2; 1024], 0, 2, seq(11)).expect("other message");
    buffer.admit_fragment(&[3; 1024], 0, 2, seq(12)).expect("third message");
    assert_eq!(buffer.buffered_fragments(), 4);

    let before = snapshot(&buffer);
    for (fragment_id, fragment_count, sequence) in [(2, 3, 10), (1, 2, 11), (0, 1, 13)] {
        assert_eq!(
            buffer.admit_fragment(&[9; 10], fragment_id, fragment_count, seq(sequence)),
            Err(AdmitError::BufferFull {
                buffered: 4,
                max: 4
            })
        );
    }
    assert_eq!(snapshot(&buffer), before);
}

#[rstest]
fn draining_frees_room_under_the_ceiling(mut buffer: ReassemblyBuffer) {
    buffer.admit_fragment(&[1; 1024], 1, 3, seq(10)).expect("second fragment");
    buffer.admit_fragment(&[2; 5], 2, 3, seq(10)).expect("final fragment");
    buffer.admit_fragment(b"x", 0, 1, seq(11)).expect("whole message");
    assert_eq!(buffer.buffered_fragments(), 4);

    let drained = buffer.drain_completed();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].payload().len(), 2053);
    assert_eq!(buffer.buffered_fragments(), 0);
    assert_eq!(
        buffer.admit_fragment(b"y", 0, 1, seq(12)),
        Ok(FragmentStatus::Complete)
    );
}

#[rstest]
fn eviction_returns_fragments_to_the_budget(mut buffer: ReassemblyBuffer) {
    buffer.admit_fragment(&[1; 1024], 1, 3, seq(10)).expect("second fragment");
    assert_eq!(buffer.buffered_fragments(), 2);

    // Sequence 17 still retains 10; sequence 18 pushes it out of slot 2.
    assert!(buffer.advance(seq(17)).is_empty());
    assert_eq!(buffer.advance(seq(18)), vec![seq(10)]);
    assert_eq!(buffer.buffered_fragments(), 0);
    assert_eq!(
        buffer.admit_fragment(b"z", 0, 1, seq(18)),
        Ok(FragmentStatus::Complete)
    );
}

#[rstest]
fn incomplete_entries_survive_a_drain(mut buffer: ReassemblyBuffer) {
    assert!(buffer.drain_completed().is_empty());
    let entry = buffer.entry(seq(10)).expect("entry still present");
    assert_eq!(entry.received_count(), 1);
    assert_eq!(entry.fragment_count(), 3);
    assert!(!entry.is_complete());
    assert_eq!(entry.fragment_size(0), 1024);
    assert_eq!(entry.fragment_size(1), 0);
}
