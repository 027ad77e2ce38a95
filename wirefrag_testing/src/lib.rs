//! Shared fixtures and assertions for `wirefrag` integration tests.
//!
//! The helpers build small, easily reasoned-about configurations, feed
//! fragments into buffers and dispatchers in chosen orders, and check the
//! reassembly buffer's bookkeeping after every step.
//!
//! ```rust
//! use wirefrag::SequenceNumber;
//! use wirefrag_testing::{admit_chunks, assert_buffer_invariants, small_buffer};
//!
//! let mut buffer = small_buffer(wirefrag_testing::small_config());
//! let message = wirefrag_testing::patterned_message(3000);
//! admit_chunks(&mut buffer, SequenceNumber::new(5), &message, &[1, 0, 2]);
//! assert_buffer_invariants(&buffer);
//! assert_eq!(buffer.drain_completed()[0].payload(), message.as_slice());
//! ```

pub mod feed;
pub mod fixtures;
pub mod invariants;
pub mod logging;

pub use feed::{admit_chunks, process_all, split_message};
pub use fixtures::{SCENARIO_TYPES, patterned_message, small_buffer, small_config};
pub use invariants::assert_buffer_invariants;
pub use logging::{LoggerHandle, logger};
