//! Structural checks over a [`ReassemblyBuffer`].

use wirefrag::ReassemblyBuffer;

/// Assert every bookkeeping invariant of `buffer`.
///
/// Checks that each occupied slot matches its entry's sequence, that every
/// entry lies inside the window, that per-entry counts agree with the stored
/// fragments, and that the global fragment count equals their sum without
/// exceeding the ceiling.
///
/// # Panics
///
/// Panics with a description of the first violated invariant.
pub fn assert_buffer_invariants(buffer: &ReassemblyBuffer) {
    let config = buffer.config();
    let current = buffer.current_sequence();
    let mut total = 0usize;

    for (index, entry) in buffer.occupied_slots() {
        let sequence = entry.sequence();
        assert_eq!(
            buffer.slot_index(sequence),
            index,
            "entry {sequence} sits in the wrong slot"
        );
        let age = usize::from(current.get().wrapping_sub(sequence.get()));
        assert!(
            age < config.window_size,
            "entry {sequence} is outside the window ending at {current}"
        );
        assert!(
            entry.received_count() <= entry.fragment_count(),
            "entry {sequence} received more fragments than expected"
        );
        assert!(
            usize::from(entry.fragment_count()) <= config.max_fragments_per_message,
            "entry {sequence} expects too many fragments"
        );
        let present = (0..entry.fragment_count())
            .filter(|&id| entry.fragment(id).is_some())
            .count();
        assert_eq!(
            present,
            usize::from(entry.received_count()),
            "entry {sequence} miscounts its fragments"
        );
        total += present;
    }

    assert_eq!(
        buffer.buffered_fragments(),
        total,
        "buffered fragment count drifted"
    );
    assert!(
        total <= config.max_buffered_fragments,
        "buffer exceeds its fragment ceiling"
    );
}
