//! Bounded MSB-first bit writer.

use super::{StreamError, bits_required};

/// Packs values into a byte buffer no larger than a fixed capacity.
#[derive(Debug)]
pub struct BitWriter {
    buffer: Vec<u8>,
    capacity: usize,
    scratch: u64,
    scratch_bits: u32,
    bits_written: usize,
}

impl BitWriter {
    /// Create a writer that accepts at most `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            scratch: 0,
            scratch_bits: 0,
            bits_written: 0,
        }
    }

    /// Maximum number of bytes this writer accepts.
    #[must_use]
    pub const fn capacity(&self) -> usize { self.capacity }

    /// Number of bits written so far, padding included.
    #[must_use]
    pub const fn bits_written(&self) -> usize { self.bits_written }

    /// Number of bytes touched so far, counting a partial trailing byte.
    #[must_use]
    pub const fn bytes_processed(&self) -> usize { self.bits_written.div_ceil(8) }

    /// Whether the next write starts on a byte boundary.
    #[must_use]
    pub const fn is_aligned(&self) -> bool { self.bits_written % 8 == 0 }

    fn ensure_room(&self, bits: usize) -> Result<(), StreamError> {
        let limit = self.capacity.saturating_mul(8);
        if self.bits_written.saturating_add(bits) > limit {
            return Err(StreamError::Overflow {
                bits,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Write the low `bits` bits of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidBitCount`] unless `bits` is in `1..=32`,
    /// [`StreamError::ValueOutOfRange`] when `value` does not fit, and
    /// [`StreamError::Overflow`] when the capacity would be exceeded.
    pub fn write_bits(&mut self, value: u32, bits: u32) -> Result<(), StreamError> {
        if bits == 0 || bits > 32 {
            return Err(StreamError::InvalidBitCount { bits });
        }
        if bits < 32 && value >> bits != 0 {
            return Err(StreamError::ValueOutOfRange {
                value: i64::from(value),
                min: 0,
                max: (1_i64 << bits) - 1,
            });
        }
        self.ensure_room(bits as usize)?;

        self.scratch = (self.scratch << bits) | u64::from(value);
        self.scratch_bits += bits;
        while self.scratch_bits >= 8 {
            self.scratch_bits -= 8;
            #[expect(
                clippy::cast_possible_truncation,
                reason = "the byte is masked out of the scratch word on purpose"
            )]
            let byte = (self.scratch >> self.scratch_bits) as u8;
            self.buffer.push(byte);
        }
        self.scratch &= (1_u64 << self.scratch_bits) - 1;
        self.bits_written += bits as usize;
        Ok(())
    }

    /// Write `value` using the minimum bits needed for `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ValueOutOfRange`] if `value` lies outside the
    /// range and [`StreamError::Overflow`] if the capacity is exhausted.
    pub fn write_ranged(&mut self, value: i32, min: i32, max: i32) -> Result<(), StreamError> {
        if value < min || value > max {
            return Err(StreamError::ValueOutOfRange {
                value: i64::from(value),
                min: i64::from(min),
                max: i64::from(max),
            });
        }
        let bits = bits_required(i64::from(min), i64::from(max));
        if bits == 0 {
            return Ok(());
        }
        let offset = value.abs_diff(min);
        self.write_bits(offset, bits)
    }

    /// Write a single flag bit.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Overflow`] when the capacity is exhausted.
    pub fn write_bool(&mut self, value: bool) -> Result<(), StreamError> {
        self.write_bits(u32::from(value), 1)
    }

    /// Write the raw IEEE-754 bits of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Overflow`] when the capacity is exhausted.
    pub fn write_f32(&mut self, value: f32) -> Result<(), StreamError> {
        self.write_bits(value.to_bits(), 32)
    }

    /// Pad with zero bits up to the next byte boundary.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Overflow`] when the padding does not fit.
    pub fn align(&mut self) -> Result<(), StreamError> {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "padding is always below 8 bits"
        )]
        let padding = ((8 - self.bits_written % 8) % 8) as u32;
        if padding == 0 {
            return Ok(());
        }
        self.write_bits(0, padding)
    }

    /// Copy raw bytes into the stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Misaligned`] unless the writer is byte aligned
    /// and [`StreamError::Overflow`] when the bytes do not fit. Nothing is
    /// written on failure.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        if !self.is_aligned() {
            return Err(StreamError::Misaligned {
                bit_position: self.bits_written,
            });
        }
        self.ensure_room(bytes.len().saturating_mul(8))?;
        self.buffer.extend_from_slice(bytes);
        self.bits_written += bytes.len() * 8;
        Ok(())
    }

    /// Flush any partial byte with zero padding and return the buffer.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        if self.scratch_bits > 0 {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "fewer than 8 bits remain in scratch"
            )]
            let byte = (self.scratch << (8 - self.scratch_bits)) as u8;
            self.buffer.push(byte);
        }
        self.buffer
    }
}
