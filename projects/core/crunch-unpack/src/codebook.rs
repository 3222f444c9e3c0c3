//! Static canonical prefix codes ("data models").
//!
//! Every entropy-coded section of a CRN file is decoded with one of these. A code is transmitted
//! as a list of per-symbol code lengths, itself compressed with a small prefix code over 21
//! code-length symbols, in the same spirit as DEFLATE's dynamic block headers.
//!
//! Codes are assigned canonically: shorter codes first, and within one length in increasing
//! symbol order. Decoding uses a direct lookup table for codes up to [`MAX_TABLE_BITS`] bits and
//! walks the canonical code space for the rare longer ones.

use crate::bitstream::BitReader;
use crate::error::FormatError;
use alloc::vec;
use alloc::vec::Vec;
use likely_stable::likely;

/// Longest code length a table may use.
pub(crate) const MAX_CODE_LENGTH: usize = 16;
/// Largest symbol alphabet a table may declare.
pub(crate) const MAX_SUPPORTED_SYMBOLS: u32 = 8192;
/// Bits used to index the fast lookup table.
pub(crate) const MAX_TABLE_BITS: u32 = 10;

/// Number of code-length symbols: literal lengths 0..=16 and four run codes.
pub(crate) const NUM_CODE_LENGTH_SYMBOLS: usize = 21;
/// Order in which the code-length code lengths are transmitted.
pub(crate) const CODE_LENGTH_ORDER: [u8; NUM_CODE_LENGTH_SYMBOLS] = [
    17, 18, 19, 20, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15, 16,
];

pub(crate) const SMALL_ZERO_RUN: u32 = 17;
pub(crate) const LARGE_ZERO_RUN: u32 = 18;
pub(crate) const SMALL_REPEAT: u32 = 19;
pub(crate) const LARGE_REPEAT: u32 = 20;

pub(crate) const SMALL_ZERO_RUN_EXTRA_BITS: u32 = 3;
pub(crate) const LARGE_ZERO_RUN_EXTRA_BITS: u32 = 7;
pub(crate) const SMALL_REPEAT_EXTRA_BITS: u32 = 2;
pub(crate) const LARGE_REPEAT_EXTRA_BITS: u32 = 6;

pub(crate) const MIN_SMALL_ZERO_RUN: u32 = 3;
pub(crate) const MIN_LARGE_ZERO_RUN: u32 = 11;
pub(crate) const MIN_SMALL_REPEAT: u32 = 3;
pub(crate) const MIN_LARGE_REPEAT: u32 = 7;

/// A lookup entry packs `symbol << 5 | length`. A length of zero marks a miss.
const ENTRY_LENGTH_MASK: u32 = 0x1F;

/// A decoding table for one canonical prefix code.
#[derive(Debug, Clone)]
pub(crate) struct PrefixCode {
    lookup: Vec<u32>,
    table_bits: u32,
    max_length: u32,
    /// Number of codes of each length.
    counts: [u16; MAX_CODE_LENGTH + 1],
    /// Used symbols ordered by (length, symbol).
    sorted_symbols: Vec<u16>,
}

impl PrefixCode {
    /// Builds a table from per-symbol code lengths.
    ///
    /// Symbols with a non-zero length must be below `symbol_limit`, and the lengths must describe
    /// a complete prefix code. A code with a single used symbol is also accepted if that symbol
    /// has length 1.
    pub(crate) fn from_lengths(lengths: &[u8], symbol_limit: u32) -> Result<Self, FormatError> {
        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        let mut used = 0u32;
        let mut max_length = 0u32;
        for (symbol, &length) in lengths.iter().enumerate() {
            if length == 0 {
                continue;
            }
            if length as usize > MAX_CODE_LENGTH {
                return Err(FormatError::IncompleteCode);
            }
            if symbol as u32 >= symbol_limit {
                return Err(FormatError::SymbolOutOfRange {
                    symbol: symbol as u32,
                    limit: symbol_limit,
                });
            }
            counts[length as usize] += 1;
            used += 1;
            max_length = max_length.max(length as u32);
        }

        if used == 0 {
            return Err(FormatError::EmptyCode);
        }

        // Kraft sum scaled by 2^16 must be exactly one.
        let kraft: u32 = (1..=MAX_CODE_LENGTH)
            .map(|len| (counts[len] as u32) << (MAX_CODE_LENGTH - len))
            .sum();
        let single_bit_code = used == 1 && counts[1] == 1;
        if kraft != 1 << MAX_CODE_LENGTH && !single_bit_code {
            return Err(FormatError::IncompleteCode);
        }

        // Canonical first code of each length.
        let mut next_code = [0u32; MAX_CODE_LENGTH + 2];
        for len in 1..=MAX_CODE_LENGTH {
            next_code[len + 1] = (next_code[len] + counts[len] as u32) << 1;
        }

        let mut offsets = [0usize; MAX_CODE_LENGTH + 1];
        for len in 1..MAX_CODE_LENGTH {
            offsets[len + 1] = offsets[len] + counts[len] as usize;
        }

        let table_bits = max_length.min(MAX_TABLE_BITS);
        let mut lookup = vec![0u32; 1 << table_bits];
        let mut sorted_symbols = vec![0u16; used as usize];

        for (symbol, &length) in lengths.iter().enumerate() {
            if length == 0 {
                continue;
            }
            let len = length as usize;
            sorted_symbols[offsets[len]] = symbol as u16;
            offsets[len] += 1;

            let code = next_code[len];
            next_code[len] += 1;

            if length as u32 <= table_bits {
                let shift = table_bits - length as u32;
                let first = (code << shift) as usize;
                let entry = ((symbol as u32) << 5) | length as u32;
                lookup[first..first + (1 << shift)].fill(entry);
            }
        }

        tracing::trace!(used, max_length, table_bits, "built prefix code");

        Ok(Self {
            lookup,
            table_bits,
            max_length,
            counts,
            sorted_symbols,
        })
    }

    /// Decodes one symbol.
    #[inline]
    pub(crate) fn decode(&self, reader: &mut BitReader) -> Result<u32, FormatError> {
        let bits = reader.peek16();
        let entry = self.lookup[(bits >> (16 - self.table_bits)) as usize];
        if likely(entry & ENTRY_LENGTH_MASK != 0) {
            reader.consume(entry & ENTRY_LENGTH_MASK)?;
            return Ok(entry >> 5);
        }
        self.decode_slow(reader, bits)
    }

    #[cold]
    fn decode_slow(&self, reader: &mut BitReader, bits: u32) -> Result<u32, FormatError> {
        let mut code = 0u32;
        let mut first = 0u32;
        let mut index = 0u32;
        for len in 1..=self.max_length {
            code |= (bits >> (16 - len)) & 1;
            let count = self.counts[len as usize] as u32;
            if code >= first && code - first < count {
                reader.consume(len)?;
                return Ok(self.sorted_symbols[(index + code - first) as usize] as u32);
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }
        Err(FormatError::InvalidCode)
    }
}

/// Reads a transmitted code from `reader` and builds its decoding table.
pub(crate) fn receive_prefix_code(
    reader: &mut BitReader,
    symbol_limit: u32,
) -> Result<PrefixCode, FormatError> {
    let total_symbols = reader.read_bits(14)?;
    if total_symbols == 0 {
        return Err(FormatError::EmptyCode);
    }
    if total_symbols > MAX_SUPPORTED_SYMBOLS {
        return Err(FormatError::TooManySymbols(total_symbols));
    }

    let num_length_codes = reader.read_bits(5)?;
    if num_length_codes == 0 || num_length_codes as usize > NUM_CODE_LENGTH_SYMBOLS {
        return Err(FormatError::InvalidCodeLengthCount(num_length_codes));
    }

    let mut length_code_lengths = [0u8; NUM_CODE_LENGTH_SYMBOLS];
    for &symbol in &CODE_LENGTH_ORDER[..num_length_codes as usize] {
        length_code_lengths[symbol as usize] = reader.read_bits(3)? as u8;
    }
    let length_code = PrefixCode::from_lengths(&length_code_lengths, NUM_CODE_LENGTH_SYMBOLS as u32)?;

    let total = total_symbols as usize;
    let mut lengths = vec![0u8; total];
    let mut ofs = 0usize;
    while ofs < total {
        let symbol = length_code.decode(reader)?;
        if symbol <= MAX_CODE_LENGTH as u32 {
            lengths[ofs] = symbol as u8;
            ofs += 1;
            continue;
        }

        let (run, value) = match symbol {
            SMALL_ZERO_RUN => (reader.read_bits(SMALL_ZERO_RUN_EXTRA_BITS)? + MIN_SMALL_ZERO_RUN, 0),
            LARGE_ZERO_RUN => (reader.read_bits(LARGE_ZERO_RUN_EXTRA_BITS)? + MIN_LARGE_ZERO_RUN, 0),
            _ => {
                let previous = match ofs.checked_sub(1) {
                    Some(prev) => lengths[prev],
                    None => 0,
                };
                if previous == 0 {
                    return Err(FormatError::CodeLengthRepeatWithoutPrevious);
                }
                let run = if symbol == SMALL_REPEAT {
                    reader.read_bits(SMALL_REPEAT_EXTRA_BITS)? + MIN_SMALL_REPEAT
                } else {
                    reader.read_bits(LARGE_REPEAT_EXTRA_BITS)? + MIN_LARGE_REPEAT
                };
                (run, previous)
            }
        };

        let end = ofs + run as usize;
        if end > total {
            return Err(FormatError::CodeLengthRunOverflow);
        }
        lengths[ofs..end].fill(value);
        ofs = end;
    }

    PrefixCode::from_lengths(&lengths, symbol_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_prelude::*;

    fn decode_all(code: &PrefixCode, data: &[u8], count: usize) -> Vec<u32> {
        let mut reader = BitReader::new(data);
        (0..count).map(|_| code.decode(&mut reader).unwrap()).collect()
    }

    #[test]
    fn assigns_codes_canonically() {
        // A=2, B=1, C=3, D=3 -> B=0, A=10, C=110, D=111
        let code = PrefixCode::from_lengths(&[2, 1, 3, 3], 4).unwrap();
        // 0 10 110 111 -> 0101_1011 1000_0000
        assert_eq!(decode_all(&code, &[0b0101_1011, 0b1000_0000], 4), [1, 0, 2, 3]);
    }

    #[test]
    fn decodes_codes_longer_than_lookup_table() {
        // Symbols 0..=11 get lengths 1..=11 then a final 11 bit code completes the tree.
        let mut lengths: Vec<u8> = (1..=11).collect();
        lengths.push(11);
        let code = PrefixCode::from_lengths(&lengths, 12).unwrap();

        let mut writer = BitWriter::new();
        let codes = canonical_codes(&lengths);
        for symbol in [11usize, 10, 0, 9] {
            writer.put_bits(codes[symbol], lengths[symbol] as u32);
        }
        let bytes = writer.finish();
        assert_eq!(decode_all(&code, &bytes, 4), [11, 10, 0, 9]);
    }

    #[rstest]
    #[case(&[1, 1, 1])] // over-subscribed
    #[case(&[1, 2])] // incomplete
    #[case(&[2, 2, 2])] // incomplete
    #[case(&[0, 3])] // single symbol that is not one bit
    fn rejects_non_prefix_codes(#[case] lengths: &[u8]) {
        assert_eq!(
            PrefixCode::from_lengths(lengths, 16).unwrap_err(),
            FormatError::IncompleteCode
        );
    }

    #[test]
    fn accepts_single_one_bit_code() {
        let code = PrefixCode::from_lengths(&[0, 0, 1], 3).unwrap();
        assert_eq!(decode_all(&code, &[0x00], 3), [2, 2, 2]);

        let mut reader = BitReader::new(&[0x80]);
        assert_eq!(code.decode(&mut reader), Err(FormatError::InvalidCode));
    }

    #[test]
    fn rejects_symbols_outside_limit() {
        assert_eq!(
            PrefixCode::from_lengths(&[1, 0, 1], 2).unwrap_err(),
            FormatError::SymbolOutOfRange {
                symbol: 2,
                limit: 2
            }
        );
    }

    #[test]
    fn rejects_empty_code() {
        assert_eq!(
            PrefixCode::from_lengths(&[0, 0], 2).unwrap_err(),
            FormatError::EmptyCode
        );
    }

    #[test]
    fn receives_transmitted_code() {
        let lengths = complete_lengths(49);
        let mut writer = BitWriter::new();
        send_prefix_code(&mut writer, &lengths);
        let codes = canonical_codes(&lengths);
        writer.put_bits(codes[48], lengths[48] as u32);
        writer.put_bits(codes[0], lengths[0] as u32);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        let code = receive_prefix_code(&mut reader, 49).unwrap();
        assert_eq!(code.decode(&mut reader), Ok(48));
        assert_eq!(code.decode(&mut reader), Ok(0));
    }

    #[test]
    fn receives_run_length_coded_lengths() {
        // Code length code: symbols 1, 17 and 19 with lengths 2, 1, 2 (complete).
        // codes: 17 -> 0, 1 -> 10, 19 -> 11
        let mut writer = BitWriter::new();
        writer.put_bits(8, 14); // total symbols
        writer.put_bits(19, 5); // transmit the first 19 entries of CODE_LENGTH_ORDER
        for &symbol in &CODE_LENGTH_ORDER[..19] {
            let length = match symbol {
                17 => 1,
                1 | 19 => 2,
                _ => 0,
            };
            writer.put_bits(length, 3);
        }
        writer.put_bits(0b0, 1); // 17: zero run
        writer.put_bits(1, 3); // of 4
        writer.put_bits(0b10, 2); // literal 1
        writer.put_bits(0b11, 2); // 19: repeat
        writer.put_bits(0, 2); // 3 times
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        // Lengths are [0, 0, 0, 0, 1, 1, 1, 1], which over-subscribes a one bit code.
        assert_eq!(
            receive_prefix_code(&mut reader, 8).unwrap_err(),
            FormatError::IncompleteCode
        );
    }

    #[test]
    fn rejects_repeat_at_start() {
        let mut writer = BitWriter::new();
        writer.put_bits(4, 14);
        writer.put_bits(4, 5);
        // 17, 18, 19, 20 each get length 2
        for _ in 0..4 {
            writer.put_bits(2, 3);
        }
        writer.put_bits(0b10, 2); // 19
        writer.put_bits(0, 2);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        assert_eq!(
            receive_prefix_code(&mut reader, 4).unwrap_err(),
            FormatError::CodeLengthRepeatWithoutPrevious
        );
    }

    #[test]
    fn rejects_run_overflow() {
        let mut writer = BitWriter::new();
        writer.put_bits(5, 14);
        writer.put_bits(4, 5);
        for _ in 0..4 {
            writer.put_bits(2, 3);
        }
        writer.put_bits(0b01, 2); // 18: at least 11 zeros
        writer.put_bits(0, 7);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        assert_eq!(
            receive_prefix_code(&mut reader, 5).unwrap_err(),
            FormatError::CodeLengthRunOverflow
        );
    }

    #[rstest]
    #[case(0, FormatError::EmptyCode)]
    #[case(8193, FormatError::TooManySymbols(8193))]
    fn rejects_bad_symbol_counts(#[case] total: u32, #[case] expected: FormatError) {
        let mut writer = BitWriter::new();
        writer.put_bits(total, 14);
        writer.put_bits(0, 18);
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(receive_prefix_code(&mut reader, 8192).unwrap_err(), expected);
    }
}
