//! MSB-first bit reader over a byte slice.
//!
//! The reader keeps a 32-bit window which is topped up a byte at a time. Reads past the end of the
//! slice are fed with zero bytes so that lookahead near the end of a stream always succeeds, but
//! actually consuming any of those padding bits is reported as [`FormatError::StreamExhausted`].

use crate::error::FormatError;
use likely_stable::unlikely;

/// Reads bits from a byte slice, most significant bit first.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    /// Index of the next byte to load into `bit_buf`. May run past `data.len()`.
    next_byte: usize,
    bit_buf: u32,
    bit_count: u32,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            next_byte: 0,
            bit_buf: 0,
            bit_count: 0,
        }
    }

    #[inline(always)]
    fn refill(&mut self) {
        while self.bit_count <= 24 {
            let byte = self.data.get(self.next_byte).copied().unwrap_or(0);
            self.next_byte += 1;
            self.bit_buf |= (byte as u32) << (24 - self.bit_count);
            self.bit_count += 8;
        }
    }

    /// Number of bits consumed so far.
    #[inline(always)]
    pub(crate) fn bits_consumed(&self) -> usize {
        self.next_byte * 8 - self.bit_count as usize
    }

    /// Returns the next 16 bits without consuming them.
    #[inline(always)]
    pub(crate) fn peek16(&mut self) -> u32 {
        self.refill();
        self.bit_buf >> 16
    }

    /// Drops `num_bits` (at most 16) bits that were previously peeked.
    #[inline(always)]
    pub(crate) fn consume(&mut self, num_bits: u32) -> Result<(), FormatError> {
        debug_assert!(num_bits <= 16 && num_bits <= self.bit_count);
        self.bit_buf <<= num_bits;
        self.bit_count -= num_bits;
        if unlikely(self.bits_consumed() > self.data.len() * 8) {
            return Err(FormatError::StreamExhausted);
        }
        Ok(())
    }

    /// Reads an unsigned value of `num_bits` bits (0..=32).
    pub(crate) fn read_bits(&mut self, num_bits: u32) -> Result<u32, FormatError> {
        debug_assert!(num_bits <= 32);
        if num_bits == 0 {
            return Ok(0);
        }
        if num_bits > 16 {
            let high = self.read_bits(num_bits - 16)?;
            let low = self.read_bits(16)?;
            return Ok((high << 16) | low);
        }

        self.refill();
        let value = self.bit_buf >> (32 - num_bits);
        self.consume(num_bits)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn reads_msb_first() {
        let mut reader = BitReader::new(&[0b1011_0010, 0b0111_1111]);
        assert_eq!(reader.read_bits(1), Ok(1));
        assert_eq!(reader.read_bits(3), Ok(0b011));
        assert_eq!(reader.read_bits(6), Ok(0b0010_01));
        assert_eq!(reader.read_bits(6), Ok(0b11_1111));
        assert_eq!(reader.bits_consumed(), 16);
    }

    #[test]
    fn reads_wide_values_high_part_first() {
        let mut reader = BitReader::new(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(reader.read_bits(24), Ok(0x12_3456));
        assert_eq!(reader.read_bits(8), Ok(0x78));
    }

    #[rstest]
    #[case(&[], 1)]
    #[case(&[0xFF], 9)]
    #[case(&[0xFF, 0xFF], 17)]
    fn consuming_past_end_fails(#[case] data: &[u8], #[case] bits: u32) {
        let mut reader = BitReader::new(data);
        assert_eq!(reader.read_bits(bits), Err(FormatError::StreamExhausted));
    }

    #[test]
    fn peek_past_end_is_zero_filled() {
        let mut reader = BitReader::new(&[0xAB]);
        assert_eq!(reader.peek16(), 0xAB00);
        assert_eq!(reader.read_bits(8), Ok(0xAB));
        assert_eq!(reader.peek16(), 0);
    }
}
