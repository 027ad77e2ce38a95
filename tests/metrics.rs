#![cfg(feature = "metrics")]
//! Tests for `wirefrag` metrics.
//!
//! Counters and gauges are captured with
//! `metrics_util::debugging::DebuggingRecorder`.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;
use wirefrag::{
    PacketDispatcher,
    ReassemblyBuffer,
    SequenceNumber,
    metrics::{
        BUFFERED_FRAGMENTS,
        ENTRIES_EVICTED,
        FRAGMENTS_ADMITTED,
        FRAGMENTS_DUPLICATE,
        FRAGMENTS_REJECTED,
        MESSAGES_REASSEMBLED,
    },
};
use wirefrag_testing::{SCENARIO_TYPES, small_buffer, small_config};

type Snapshot = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn counter(snapshot: &Snapshot, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, ..)| key.key().name() == name)
        .filter(|(key, ..)| {
            label.is_none_or(|(k, v)| key.key().labels().any(|l| l.key() == k && l.value() == v))
        })
        .map(|(.., value)| match value {
            DebugValue::Counter(c) => *c,
            other => panic!("{name} is not a counter: {other:?}"),
        })
        .sum()
}

fn gauge(snapshot: &Snapshot, name: &str) -> Option<f64> {
    snapshot.iter().find_map(|(key, .., value)| match value {
        DebugValue::Gauge(g) if key.key().name() == name => Some(g.into_inner()),
        _ => None,
    })
}

fn seq(value: u16) -> SequenceNumber { SequenceNumber::new(value) }

#[rstest]
fn buffer_lifecycle_is_recorded(mut small_buffer: ReassemblyBuffer) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let full = vec![1u8; 1024];

    metrics::with_local_recorder(&recorder, || {
        small_buffer
            .admit_fragment(&full, 0, 2, seq(0))
            .expect("first fragment");
        small_buffer
            .admit_fragment(&full, 0, 2, seq(0))
            .expect("duplicate is not an error");
        small_buffer
            .admit_fragment(&full, 2, 2, seq(0))
            .expect_err("id beyond the count");
        small_buffer
            .admit_fragment(&[2; 10], 1, 2, seq(0))
            .expect("last fragment");
        assert_eq!(small_buffer.drain_completed().len(), 1);

        small_buffer
            .admit_fragment(&full, 0, 2, seq(1))
            .expect("abandoned fragment");
        assert_eq!(small_buffer.advance(seq(9)), [seq(1)]);
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter(&snapshot, FRAGMENTS_ADMITTED, None), 3);
    assert_eq!(counter(&snapshot, FRAGMENTS_DUPLICATE, None), 1);
    assert_eq!(
        counter(
            &snapshot,
            FRAGMENTS_REJECTED,
            Some(("reason", "fragment_id_out_of_range"))
        ),
        1
    );
    assert_eq!(counter(&snapshot, MESSAGES_REASSEMBLED, None), 1);
    assert_eq!(counter(&snapshot, ENTRIES_EVICTED, None), 1);
    assert_eq!(gauge(&snapshot, BUFFERED_FRAGMENTS), Some(0.0));
}

#[rstest]
#[case::truncated(vec![0, 1], "malformed_header")]
#[case::corrupted(vec![0xFF; 12], "checksum_mismatch")]
fn dropped_datagrams_are_counted_by_reason(
    small_config: wirefrag::FragmentationConfig,
    #[case] datagram: Vec<u8>,
    #[case] reason: &str,
) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let mut dispatcher = PacketDispatcher::new(small_config, SCENARIO_TYPES).expect("dispatcher");

    metrics::with_local_recorder(&recorder, || {
        dispatcher
            .process_packet(&datagram)
            .expect_err("datagram is rejected");
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter(&snapshot, FRAGMENTS_REJECTED, Some(("reason", reason))),
        1,
        "expected one {reason} rejection, got {snapshot:#?}"
    );
    assert_eq!(counter(&snapshot, FRAGMENTS_ADMITTED, None), 0);
}
