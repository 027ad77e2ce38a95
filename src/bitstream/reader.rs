//! MSB-first bit reader over a borrowed byte slice.

use super::{StreamError, bits_required};

/// Reads values packed by [`BitWriter`](super::BitWriter).
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_position: usize,
}

impl<'a> BitReader<'a> {
    /// Start reading at the first bit of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_position: 0,
        }
    }

    /// Number of bits consumed so far.
    #[must_use]
    pub const fn bit_position(&self) -> usize { self.bit_position }

    /// Number of unread bits.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize { self.data.len() * 8 - self.bit_position }

    /// Number of bytes touched so far, counting a partial byte.
    #[must_use]
    pub const fn bytes_processed(&self) -> usize { self.bit_position.div_ceil(8) }

    /// Whether the next read starts on a byte boundary.
    #[must_use]
    pub const fn is_aligned(&self) -> bool { self.bit_position % 8 == 0 }

    fn ensure_available(&self, bits: usize) -> Result<(), StreamError> {
        let remaining = self.bits_remaining();
        if bits > remaining {
            return Err(StreamError::Underflow {
                requested: bits,
                remaining,
            });
        }
        Ok(())
    }

    /// Read `bits` bits as an unsigned value.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidBitCount`] unless `bits` is in `1..=32`
    /// and [`StreamError::Underflow`] when the stream is exhausted.
    pub fn read_bits(&mut self, bits: u32) -> Result<u32, StreamError> {
        if bits == 0 || bits > 32 {
            return Err(StreamError::InvalidBitCount { bits });
        }
        self.ensure_available(bits as usize)?;

        let mut value = 0_u64;
        let mut pending = bits as usize;
        while pending > 0 {
            let Some(&byte) = self.data.get(self.bit_position / 8) else {
                return Err(StreamError::Underflow {
                    requested: pending,
                    remaining: 0,
                });
            };
            let offset = self.bit_position % 8;
            let available = 8 - offset;
            let take = available.min(pending);
            let chunk = (byte >> (available - take)) & (0xFF_u8 >> (8 - take));
            value = (value << take) | u64::from(chunk);
            self.bit_position += take;
            pending -= take;
        }

        u32::try_from(value).map_err(|_| StreamError::InvalidBitCount { bits })
    }

    /// Read a value encoded with [`BitWriter::write_ranged`](super::BitWriter::write_ranged).
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ValueOutOfRange`] if the decoded value exceeds
    /// `max` and [`StreamError::Underflow`] when the stream is exhausted.
    pub fn read_ranged(&mut self, min: i32, max: i32) -> Result<i32, StreamError> {
        let bits = bits_required(i64::from(min), i64::from(max));
        if bits == 0 {
            return Ok(min);
        }
        let offset = self.read_bits(bits)?;
        let value = i64::from(min) + i64::from(offset);
        if value > i64::from(max) {
            return Err(StreamError::ValueOutOfRange {
                value,
                min: i64::from(min),
                max: i64::from(max),
            });
        }
        i32::try_from(value).map_err(|_| StreamError::ValueOutOfRange {
            value,
            min: i64::from(min),
            max: i64::from(max),
        })
    }

    /// Read a single flag bit.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Underflow`] when the stream is exhausted.
    pub fn read_bool(&mut self) -> Result<bool, StreamError> { Ok(self.read_bits(1)? == 1) }

    /// Read raw IEEE-754 bits as an `f32`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Underflow`] when the stream is exhausted.
    pub fn read_f32(&mut self) -> Result<f32, StreamError> {
        Ok(f32::from_bits(self.read_bits(32)?))
    }

    /// Skip to the next byte boundary, requiring the skipped bits to be zero.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NonZeroPadding`] if any skipped bit is set.
    pub fn align(&mut self) -> Result<(), StreamError> {
        let padding = (8 - self.bit_position % 8) % 8;
        if padding == 0 {
            return Ok(());
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "padding is always below 8 bits"
        )]
        let pad = self.read_bits(padding as u32)?;
        if pad != 0 {
            return Err(StreamError::NonZeroPadding);
        }
        Ok(())
    }

    /// Borrow the next `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Misaligned`] unless the reader is byte aligned
    /// and [`StreamError::Underflow`] when fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], StreamError> {
        if !self.is_aligned() {
            return Err(StreamError::Misaligned {
                bit_position: self.bit_position,
            });
        }
        self.ensure_available(len.saturating_mul(8))?;
        let start = self.bit_position / 8;
        let slice = self
            .data
            .get(start..start + len)
            .ok_or(StreamError::Underflow {
                requested: len * 8,
                remaining: self.bits_remaining(),
            })?;
        self.bit_position += len * 8;
        Ok(slice)
    }
}
