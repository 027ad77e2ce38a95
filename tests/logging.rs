//! Log output of the reassembly buffer and dispatcher.
//!
//! Records are captured through `tracing`'s `log` bridge.

use log::Level;
use rstest::rstest;
use serial_test::serial;
use wirefrag::{PacketDispatcher, ReassemblyBuffer, SequenceNumber};
use wirefrag_testing::{LoggerHandle, SCENARIO_TYPES, logger, small_buffer, small_config};

fn seq(value: u16) -> SequenceNumber { SequenceNumber::new(value) }

#[rstest]
#[serial(logging)]
fn rejections_name_their_reason(mut logger: LoggerHandle, mut small_buffer: ReassemblyBuffer) {
    small_buffer
        .admit_fragment(&[], 0, 1, seq(0))
        .expect_err("empty fragment");

    let messages = logger.drain_messages(Level::Debug);
    assert!(
        messages
            .iter()
            .any(|m| m.contains("fragment rejected") && m.contains("reason=empty_fragment")),
        "no rejection logged: {messages:?}"
    );
}

#[rstest]
#[serial(logging)]
fn duplicates_and_evictions_are_logged(
    mut logger: LoggerHandle,
    mut small_buffer: ReassemblyBuffer,
) {
    let full = vec![0u8; 1024];
    small_buffer
        .admit_fragment(&full, 0, 2, seq(3))
        .expect("first fragment");
    small_buffer
        .admit_fragment(&full, 0, 2, seq(3))
        .expect("duplicate");
    small_buffer.advance(seq(20));

    let messages = logger.drain_messages(Level::Debug);
    assert!(
        messages
            .iter()
            .any(|m| m.contains("duplicate fragment ignored: sequence=3, fragment_id=0")),
        "no duplicate logged: {messages:?}"
    );
    assert!(
        messages
            .iter()
            .any(|m| m.contains("window advanced: current=20, evicted=1, buffered=0")),
        "no eviction logged: {messages:?}"
    );
}

#[rstest]
#[serial(logging)]
fn undecodable_datagrams_are_logged(
    mut logger: LoggerHandle,
    small_config: wirefrag::FragmentationConfig,
) {
    let mut dispatcher = PacketDispatcher::new(small_config, SCENARIO_TYPES).expect("dispatcher");
    dispatcher.process_packet(&[7]).expect_err("truncated");

    let messages = logger.drain_messages(Level::Debug);
    assert!(
        messages.iter().any(|m| m.contains("dropping packet: len=1")),
        "no drop logged: {messages:?}"
    );
}
