//! Wrapping 16-bit sequence numbers.
//!
//! Sequence numbers identify messages on the wire and double as positions in
//! the reassembly window. The space wraps at 65536, so ordering is defined by
//! the signed circular distance between two values rather than by integer
//! comparison: `0` is newer than `65535`.

use std::cmp::Ordering;

use derive_more::{Display, From, Into};

/// Half of the sequence space; distances at or beyond this are ambiguous.
const HALF_RANGE: u16 = 1 << 15;

/// Identifier of a message on the wire.
///
/// # Examples
///
/// ```
/// use wirefrag::SequenceNumber;
/// let newest = SequenceNumber::new(0);
/// let oldest = SequenceNumber::new(u16::MAX);
/// assert!(newest.is_newer_than(oldest));
/// assert_eq!(newest.distance(oldest), 1);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct SequenceNumber(u16);

impl SequenceNumber {
    /// Wrap a raw sequence value.
    #[must_use]
    pub const fn new(value: u16) -> Self { Self(value) }

    /// Return the raw sequence value.
    #[must_use]
    pub const fn get(self) -> u16 { self.0 }

    /// Step forward by `count`, wrapping at 65536.
    #[must_use]
    pub const fn wrapping_add(self, count: u16) -> Self { Self(self.0.wrapping_add(count)) }

    /// Step backward by `count`, wrapping at 65536.
    #[must_use]
    pub const fn wrapping_sub(self, count: u16) -> Self { Self(self.0.wrapping_sub(count)) }

    /// Return the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self { self.wrapping_add(1) }

    /// Whether `self` lies strictly ahead of `other` on the circle.
    ///
    /// Exactly half-way apart counts as newer for the larger raw value so the
    /// relation stays antisymmetric.
    #[must_use]
    pub const fn is_newer_than(self, other: Self) -> bool {
        let ahead = self.0.wrapping_sub(other.0);
        ahead != 0 && (ahead < HALF_RANGE || (ahead == HALF_RANGE && self.0 > other.0))
    }

    /// Whether `self` lies strictly behind `other` on the circle.
    #[must_use]
    pub const fn is_older_than(self, other: Self) -> bool { other.is_newer_than(self) }

    /// Signed circular offset from `other` to `self`, in `-32768..=32767`.
    #[must_use]
    pub fn offset_from(self, other: Self) -> i32 {
        // Reinterpreting the wrapped difference as `i16` yields the shortest
        // signed path around the circle.
        #[expect(
            clippy::cast_possible_wrap,
            reason = "two's complement reinterpretation is the point"
        )]
        let offset = self.0.wrapping_sub(other.0) as i16;
        i32::from(offset)
    }

    /// Absolute circular distance between two sequence numbers, in `0..=32768`.
    #[must_use]
    pub const fn distance(self, other: Self) -> u16 {
        let forward = self.0.wrapping_sub(other.0);
        let backward = other.0.wrapping_sub(self.0);
        if forward < backward { forward } else { backward }
    }

    /// Circular ordering relative to `other`.
    #[must_use]
    pub const fn circular_cmp(self, other: Self) -> Ordering {
        if self.0 == other.0 {
            Ordering::Equal
        } else if self.is_newer_than(other) {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }
}
