//! Helpers that push fragments into buffers and dispatchers.

use bytes::Bytes;
use wirefrag::{
    FragmentStatus,
    FragmentationConfig,
    PacketDispatcher,
    ReassemblyBuffer,
    SequenceNumber,
    Splitter,
};

use crate::{SCENARIO_TYPES, assert_buffer_invariants};

/// Split `message` into wire fragments with a scenario splitter.
///
/// # Panics
///
/// Panics if the configuration is invalid or the message cannot be split.
#[must_use]
pub fn split_message(
    config: &FragmentationConfig,
    sequence: SequenceNumber,
    message: &[u8],
) -> Vec<Bytes> {
    Splitter::new(config, SCENARIO_TYPES)
        .expect("valid splitter")
        .split(sequence, message)
        .expect("message splits")
        .into_iter()
        .collect()
}

/// Chunk `message` by the buffer's fragment size and admit the chunks in
/// `order`, checking invariants after each one.
///
/// # Panics
///
/// Panics if any chunk is rejected or an index in `order` is out of range.
pub fn admit_chunks(
    buffer: &mut ReassemblyBuffer,
    sequence: SequenceNumber,
    message: &[u8],
    order: &[usize],
) -> Vec<FragmentStatus> {
    let chunks: Vec<&[u8]> = message.chunks(buffer.config().max_fragment_size).collect();
    let count = u8::try_from(chunks.len()).expect("fragment count fits in a byte");
    order
        .iter()
        .map(|&index| {
            let id = u8::try_from(index).expect("fragment id fits in a byte");
            let status = buffer
                .admit_fragment(chunks[index], id, count, sequence)
                .expect("chunk admitted");
            assert_buffer_invariants(buffer);
            status
        })
        .collect()
}

/// Feed every datagram through `dispatcher`, checking invariants after each.
///
/// # Panics
///
/// Panics if any datagram is rejected.
pub fn process_all<'a>(
    dispatcher: &mut PacketDispatcher,
    datagrams: impl IntoIterator<Item = &'a Bytes>,
) -> Vec<FragmentStatus> {
    datagrams
        .into_iter()
        .map(|datagram| {
            let status = dispatcher
                .process_packet(datagram)
                .expect("datagram accepted");
            assert_buffer_invariants(dispatcher.buffer());
            status
        })
        .collect()
}
