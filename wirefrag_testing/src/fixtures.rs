//! Reusable configurations and payloads.

use rstest::fixture;
use wirefrag::{FragmentationConfig, ReassemblyBuffer};

/// Packet types registered by scenario splitters and dispatchers.
pub const SCENARIO_TYPES: u32 = 4;

/// Eight-slot window, 1 KiB fragments, at most four fragments per message.
#[fixture]
pub fn small_config() -> FragmentationConfig {
    FragmentationConfig {
        window_size: 8,
        max_fragment_size: 1024,
        max_fragments_per_message: 4,
        max_buffered_fragments: 16,
        ..FragmentationConfig::default()
    }
}

/// Empty buffer built from [`small_config`].
#[fixture]
pub fn small_buffer(small_config: FragmentationConfig) -> ReassemblyBuffer {
    ReassemblyBuffer::new(small_config).expect("small config is valid")
}

/// Deterministic bytes whose value depends on position, so misplaced
/// fragments change the result.
#[must_use]
pub fn patterned_message(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| u8::try_from(i % 251).expect("remainder fits in a byte"))
        .collect()
}
