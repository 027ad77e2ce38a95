//! Bit-level serialization streams.
//!
//! Headers and demo payloads are packed MSB-first into bytes so that fields
//! such as the packet type tag occupy only as many bits as their range needs.
//! [`BitWriter`] enforces a byte capacity so that serializing into a
//! bounded datagram fails cleanly instead of growing without limit, and
//! [`BitReader`] never reads past the end of its slice.

mod reader;
mod writer;

use thiserror::Error;

pub use reader::BitReader;
pub use writer::BitWriter;

/// Errors produced while reading or writing a bit stream.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The write would exceed the writer's byte capacity.
    #[error("writing {bits} bits exceeds stream capacity of {capacity} bytes")]
    Overflow { bits: usize, capacity: usize },
    /// The read requested more bits than remain in the stream.
    #[error("reading {requested} bits with only {remaining} bits remaining")]
    Underflow { requested: usize, remaining: usize },
    /// A ranged value fell outside its declared bounds.
    #[error("value {value} outside range [{min}, {max}]")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },
    /// Raw bit operations accept between 1 and 32 bits.
    #[error("invalid bit count {bits}; expected 1..=32")]
    InvalidBitCount { bits: u32 },
    /// Byte-granular access requires the stream to be byte aligned.
    #[error("stream is not byte aligned at bit {bit_position}")]
    Misaligned { bit_position: usize },
    /// Alignment padding contained set bits.
    #[error("alignment padding is not zero")]
    NonZeroPadding,
}

/// Number of bits needed to encode any value in `[min, max]`.
///
/// # Examples
///
/// ```
/// use wirefrag::bitstream::bits_required;
/// assert_eq!(bits_required(0, 3), 2);
/// assert_eq!(bits_required(-10, 10), 5);
/// assert_eq!(bits_required(7, 7), 0);
/// ```
#[must_use]
pub fn bits_required(min: i64, max: i64) -> u32 {
    if max <= min {
        return 0;
    }
    let span = max.abs_diff(min);
    u64::BITS - span.leading_zeros()
}
