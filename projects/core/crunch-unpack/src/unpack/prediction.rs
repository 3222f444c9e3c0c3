//! Endpoint references and the prediction state carried between blocks.
//!
//! Every block either reads new endpoint indices from the stream or reuses indices of a
//! neighbour. The choice is an endpoint reference, sent by the reference code. For BC formats
//! one symbol covers a 2x2 group of blocks; for ETC formats one symbol covers a block and the
//! block below it, and also holds how each block's second subblock is coded.

use likely_stable::unlikely;

use crate::bitstream::BitReader;
use crate::codebook::PrefixCode;
use crate::error::FormatError;

/// Alphabet size of the reference code: four 2-bit fields per symbol.
pub(crate) const REFERENCE_SYMBOLS: u32 = 1 << 8;

/// Most endpoint indices tracked per block.
pub(crate) const MAX_SLOTS: usize = 2;

/// Where a block takes its first endpoint indices from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum EndpointReference {
    /// New indices, delta coded against the current ones.
    Delta,
    /// The current indices, those of the block to the left.
    Left,
    /// The indices stored for this column by the row above.
    Above,
    /// The indices of the second subblock of the block above and to the left. Only ETC blocks
    /// use this; BC blocks read it as [`Above`](Self::Above).
    Diagonal,
}

impl EndpointReference {
    #[inline(always)]
    pub(crate) const fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Delta,
            1 => Self::Left,
            2 => Self::Above,
            _ => Self::Diagonal,
        }
    }
}

/// Per-column state written by one row and read by the row below.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct ColumnEntry {
    /// Reference bits for the block below, taken from the symbol read on the even row.
    pub(crate) reference: u8,
    pub(crate) endpoints: [u32; MAX_SLOTS],
}

/// Prediction state of one level.
///
/// Created fresh for every level and carried across rows and faces.
#[derive(Debug, Clone)]
pub(crate) struct PredictionState {
    /// Endpoint indices of the last decoded block, per slot.
    pub(crate) current: [u32; MAX_SLOTS],
    /// ETC only: indices of the second subblock that sat above the current block's column.
    pub(crate) diagonal: [u32; MAX_SLOTS],
    /// Unused fields of the last BC reference symbol.
    pub(crate) reference_group: u32,
    /// One entry per block column, two for ETC formats.
    pub(crate) columns: alloc::vec::Vec<ColumnEntry>,
}

impl PredictionState {
    pub(crate) fn new(num_columns: usize) -> Self {
        Self {
            current: [0; MAX_SLOTS],
            diagonal: [0; MAX_SLOTS],
            reference_group: 0,
            columns: alloc::vec![ColumnEntry::default(); num_columns],
        }
    }

    /// Returns the reference of BC block `(x, y)`, reading a new group symbol at the top left of
    /// each 2x2 group.
    ///
    /// A symbol holds, from the low bits up: block `(x, y)`, block `(x, y + 1)`,
    /// block `(x + 1, y)`, block `(x + 1, y + 1)`.
    #[inline]
    pub(crate) fn next_group_reference(
        &mut self,
        reader: &mut BitReader,
        code: &PrefixCode,
        x: usize,
        y: usize,
    ) -> Result<EndpointReference, FormatError> {
        let column = &mut self.columns[x];
        if y & 1 == 1 {
            return Ok(EndpointReference::from_bits(column.reference as u32));
        }
        if x & 1 == 0 {
            self.reference_group = code.decode(reader)?;
        }
        let reference = EndpointReference::from_bits(self.reference_group);
        column.reference = (self.reference_group >> 2 & 3) as u8;
        self.reference_group >>= 4;
        Ok(reference)
    }

    /// Returns the reference and subblock mode of ETC block `(x, y)`.
    ///
    /// Even rows read a symbol holding, from the low bits up: the reference of this block, the
    /// reference of the block below, this block's mode, the mode of the block below.
    #[inline]
    pub(crate) fn next_etc_reference(
        &mut self,
        reader: &mut BitReader,
        code: &PrefixCode,
        x: usize,
        y: usize,
    ) -> Result<(EndpointReference, u32), FormatError> {
        let column = &mut self.columns[x * 2];
        let bits = if y & 1 == 1 {
            column.reference as u32
        } else {
            let group = code.decode(reader)?;
            column.reference = ((group >> 2 & 3) | (group >> 4 & 12)) as u8;
            (group & 3) | (group >> 2 & 12)
        };
        Ok((EndpointReference::from_bits(bits), bits >> 2))
    }
}

/// Adds a delta to a palette index, wrapping once.
#[inline(always)]
pub(crate) fn wrap_index(index: u32, size: u32) -> Result<u32, FormatError> {
    let index = if index >= size { index - size } else { index };
    if unlikely(index >= size) {
        return Err(FormatError::PaletteIndexOutOfRange { index, size });
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_prelude::*;

    #[rstest]
    #[case(3, 5, Ok(3))]
    #[case(5, 5, Ok(0))]
    #[case(9, 5, Ok(4))]
    #[case(10, 5, Err(FormatError::PaletteIndexOutOfRange { index: 5, size: 5 }))]
    fn wraps_indices_once(
        #[case] index: u32,
        #[case] size: u32,
        #[case] expected: Result<u32, FormatError>,
    ) {
        assert_eq!(wrap_index(index, size), expected);
    }

    fn reference_stream(symbols: &[u32]) -> (PrefixCode, Vec<u8>) {
        let lengths = complete_lengths(REFERENCE_SYMBOLS as usize);
        let code = PrefixCode::from_lengths(&lengths, REFERENCE_SYMBOLS).unwrap();
        let codes = canonical_codes(&lengths);
        let mut writer = BitWriter::new();
        for &symbol in symbols {
            writer.put_bits(codes[symbol as usize], lengths[symbol as usize] as u32);
        }
        (code, writer.finish())
    }

    #[test]
    fn group_symbol_covers_two_by_two_blocks() {
        use EndpointReference::*;
        // (0,0) Delta, (0,1) Above, (1,0) Left, (1,1) Diagonal
        let (code, bytes) = reference_stream(&[2 << 2 | 1 << 4 | 3 << 6]);
        let mut reader = BitReader::new(&bytes);
        let mut state = PredictionState::new(2);

        let mut order = Vec::new();
        for y in 0..2 {
            for x in 0..2 {
                order.push(state.next_group_reference(&mut reader, &code, x, y).unwrap());
            }
        }
        assert_eq!(order, [Delta, Left, Above, Diagonal]);
    }

    #[test]
    fn etc_symbol_covers_a_block_and_the_one_below() {
        use EndpointReference::*;
        // Row 0: Left, mode 2. Row 1: Diagonal, mode 1.
        let (code, bytes) = reference_stream(&[1 | 3 << 2 | 2 << 4 | 1 << 6]);
        let mut reader = BitReader::new(&bytes);
        let mut state = PredictionState::new(2);

        assert_eq!(state.next_etc_reference(&mut reader, &code, 0, 0), Ok((Left, 2)));
        assert_eq!(state.next_etc_reference(&mut reader, &code, 0, 1), Ok((Diagonal, 1)));
    }
}
