//! End-to-end splitting and reassembly through the dispatcher and buffer.

use proptest::prelude::*;
use rstest::rstest;
use wirefrag::{
    FragmentStatus,
    FragmentationConfig,
    PacketDispatcher,
    ReassemblyBuffer,
    SequenceNumber,
};
use wirefrag_testing::{
    SCENARIO_TYPES,
    admit_chunks,
    assert_buffer_invariants,
    patterned_message,
    process_all,
    small_buffer,
    small_config,
    split_message,
};

#[rstest]
fn three_fragment_message_arrives_out_of_order(small_config: FragmentationConfig) {
    let message = patterned_message(3000);
    let sequence = SequenceNumber::new(5);
    let fragments = split_message(&small_config, sequence, &message);
    assert_eq!(fragments.len(), 3);

    let mut dispatcher = PacketDispatcher::new(small_config, SCENARIO_TYPES).expect("dispatcher");
    let statuses = process_all(
        &mut dispatcher,
        [&fragments[1], &fragments[0], &fragments[2]],
    );
    assert_eq!(
        statuses,
        [
            FragmentStatus::Incomplete,
            FragmentStatus::Incomplete,
            FragmentStatus::Complete
        ]
    );
    let entry_sizes = {
        let entry = dispatcher.buffer().entry(sequence).expect("entry in flight");
        (0..3).map(|id| entry.fragment_size(id)).collect::<Vec<_>>()
    };
    assert_eq!(entry_sizes, [1024, 1024, 952]);

    let messages = dispatcher.drain_completed();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sequence(), sequence);
    assert_eq!(messages[0].payload(), message.as_slice());
    assert_eq!(dispatcher.buffer().buffered_fragments(), 0);
}

#[rstest]
fn sequences_wrap_without_losing_messages(small_config: FragmentationConfig) {
    let mut buffer = ReassemblyBuffer::with_starting_sequence(small_config, SequenceNumber::new(65_530))
        .expect("valid config");
    let mut sequence = SequenceNumber::new(65_530);
    for len in [10usize, 1500, 4096, 1, 2048, 3000, 700, 1024, 1025, 4000, 12] {
        let message = patterned_message(len);
        let count = len.div_ceil(1024);
        let order: Vec<usize> = (0..count).rev().collect();
        let statuses = admit_chunks(&mut buffer, sequence, &message, &order);
        assert_eq!(statuses.last(), Some(&FragmentStatus::Complete));

        let drained = buffer.drain_completed();
        assert_eq!(drained.len(), 1, "sequence {sequence} did not complete");
        assert_eq!(drained[0].payload(), message.as_slice());
        assert_buffer_invariants(&buffer);
        sequence = sequence.next();
    }
    assert_eq!(buffer.current_sequence(), SequenceNumber::new(4));
}

#[rstest]
fn interleaved_messages_complete_independently(mut small_buffer: ReassemblyBuffer) {
    let first = patterned_message(2048);
    let second = patterned_message(3072);
    let (a, b) = (SequenceNumber::new(1), SequenceNumber::new(2));

    admit_chunks(&mut small_buffer, b, &second, &[2]);
    admit_chunks(&mut small_buffer, a, &first, &[1]);
    admit_chunks(&mut small_buffer, b, &second, &[0]);
    assert!(small_buffer.drain_completed().is_empty());

    admit_chunks(&mut small_buffer, a, &first, &[0]);
    admit_chunks(&mut small_buffer, b, &second, &[1]);
    let drained = small_buffer.drain_completed();
    let sequences: Vec<_> = drained.iter().map(|m| m.sequence()).collect();
    assert_eq!(sequences, [a, b]);
    assert_eq!(drained[1].payload(), second.as_slice());
}

fn message_and_order() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    proptest::collection::vec(any::<u8>(), 1..=4096).prop_flat_map(|message| {
        let count = message.len().div_ceil(1024);
        (Just(message), Just((0..count).collect::<Vec<_>>()).prop_shuffle())
    })
}

proptest! {
    #[test]
    fn any_fragment_order_reassembles(
        (message, order) in message_and_order(),
        start in any::<u16>(),
    ) {
        let start = SequenceNumber::new(start);
        let mut buffer = ReassemblyBuffer::with_starting_sequence(small_config(), start)
            .expect("valid config");
        let statuses = admit_chunks(&mut buffer, start, &message, &order);

        let (last, rest) = statuses.split_last().expect("at least one fragment");
        prop_assert_eq!(*last, FragmentStatus::Complete);
        prop_assert!(rest.iter().all(|s| *s == FragmentStatus::Incomplete));

        let drained = buffer.drain_completed();
        prop_assert_eq!(drained.len(), 1);
        prop_assert_eq!(drained[0].payload(), message.as_slice());
        prop_assert_eq!(buffer.buffered_fragments(), 0);
    }

    #[test]
    fn duplicates_are_idempotent(
        (message, order) in message_and_order(),
        sequence in 0u16..=10_240,
    ) {
        let sequence = SequenceNumber::new(sequence);
        let config = small_config();
        let fragments = split_message(&config, sequence, &message);
        let mut dispatcher = PacketDispatcher::new(config, SCENARIO_TYPES).expect("dispatcher");

        for (position, &index) in order.iter().enumerate() {
            let first = dispatcher.process_packet(&fragments[index]).expect("first copy");
            let expected = if position + 1 == order.len() {
                FragmentStatus::Complete
            } else {
                FragmentStatus::Incomplete
            };
            prop_assert_eq!(first, expected);

            let buffered = dispatcher.buffer().buffered_fragments();
            let again = dispatcher.process_packet(&fragments[index]).expect("second copy");
            prop_assert_eq!(again, FragmentStatus::Duplicate);
            prop_assert_eq!(dispatcher.buffer().buffered_fragments(), buffered);
            assert_buffer_invariants(dispatcher.buffer());
        }

        let drained = dispatcher.drain_completed();
        prop_assert_eq!(drained.len(), 1);
        prop_assert_eq!(drained[0].payload(), message.as_slice());
    }
}
