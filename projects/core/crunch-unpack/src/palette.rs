//! Decoding of the four endpoint and selector palettes.
//!
//! Each palette lives in its own section and starts with the prefix code(s) used to decode it.
//! Entries are coded against the previous entry, so every palette is decoded in full when a
//! context is created and then indexed directly while unpacking levels.
//!
//! Selectors are coded in linear order, 0 being the first endpoint, and stored here already
//! remapped to the index order of the output format.

use crate::bitstream::BitReader;
use crate::codebook::receive_prefix_code;
use crate::error::{CrnError, FormatError};
use crate::format::{Channel, CrnFormat};
use crate::header::{Header, PaletteSection};
use alloc::vec::Vec;

/// Maps a linear colour selector (0 = first endpoint ... 3 = second endpoint) to BC1 order.
pub(crate) const DXT1_FROM_LINEAR: [u8; 4] = [0, 2, 3, 1];
/// Maps a linear alpha selector (0 = first endpoint ... 7 = second endpoint) to BC4 order.
pub(crate) const DXT5_FROM_LINEAR: [u8; 8] = [0, 2, 3, 4, 5, 6, 7, 1];
/// Maps a linear colour selector (most negative modifier first) to an ETC1 modifier index.
pub(crate) const ETC1_FROM_LINEAR: [u8; 4] = [3, 2, 0, 1];

const COLOR_5BIT_SYMBOLS: u32 = 32;
const COLOR_6BIT_SYMBOLS: u32 = 64;
const ALPHA_ENDPOINT_SYMBOLS: u32 = 256;
/// Colour selector symbols flip one 4-bit group, two texels, of the running selector.
const COLOR_SELECTOR_SYMBOLS: u32 = 16;
/// Alpha selector symbols flip one 6-bit group, two texels, of the running selector.
const ALPHA_SELECTOR_SYMBOLS: u32 = 64;

/// Output layout of a selector palette.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SelectorForm {
    /// One BC1 or BC4 entry per palette entry.
    Dxt,
    /// One ETC entry per palette entry.
    Etc,
    /// Two ETC entries per palette entry: texels read column by column, then row by row. The
    /// block's flip bit picks between them.
    EtcFlipped,
}

impl SelectorForm {
    pub(crate) const fn for_channel(format: CrnFormat, channel: Channel) -> Self {
        let etc = match channel {
            Channel::Color => format.has_etc_color(),
            Channel::Alpha => format.has_etc_alpha(),
        };
        if !etc {
            Self::Dxt
        } else if format.has_subblocks() {
            Self::EtcFlipped
        } else {
            Self::Etc
        }
    }

    /// Stored entries per palette entry.
    pub(crate) const fn entries(self) -> usize {
        match self {
            Self::EtcFlipped => 2,
            _ => 1,
        }
    }
}

/// Linear texel index read by output texel `(x, y)`.
#[inline(always)]
const fn linear_texel(x: u32, y: u32, transposed: bool) -> u32 {
    if transposed { x * 4 + y } else { y * 4 + x }
}

/// Decodes `count` colour endpoint pairs, each packed as two RGB565 colours.
pub(crate) fn decode_color_endpoints(data: &[u8], count: usize) -> Result<Vec<u32>, FormatError> {
    let mut reader = BitReader::new(data);
    let dm5 = receive_prefix_code(&mut reader, COLOR_5BIT_SYMBOLS)?;
    let dm6 = receive_prefix_code(&mut reader, COLOR_6BIT_SYMBOLS)?;

    let (mut r0, mut g0, mut b0) = (0u32, 0u32, 0u32);
    let (mut r1, mut g1, mut b1) = (0u32, 0u32, 0u32);
    let mut endpoints = Vec::with_capacity(count);
    for _ in 0..count {
        r0 = (r0 + dm5.decode(&mut reader)?) & 31;
        g0 = (g0 + dm6.decode(&mut reader)?) & 63;
        b0 = (b0 + dm5.decode(&mut reader)?) & 31;
        r1 = (r1 + dm5.decode(&mut reader)?) & 31;
        g1 = (g1 + dm6.decode(&mut reader)?) & 63;
        b1 = (b1 + dm5.decode(&mut reader)?) & 31;

        let color0 = b0 | (g0 << 5) | (r0 << 11);
        let color1 = b1 | (g1 << 5) | (r1 << 11);
        endpoints.push(color0 | (color1 << 16));
    }
    Ok(endpoints)
}

/// Expands a packed ETC base colour into the first word of a differential ETC1 block with both
/// subblocks sharing it.
#[inline]
pub(crate) const fn etc1s_block_endpoint(packed: u32) -> u32 {
    let codeword = packed & 0x0700_0000;
    codeword << 5 | codeword << 2 | 0x0200_0000 | (packed & 0x001F_1F1F) << 3
}

/// Decodes `count` ETC base colours. Each entry holds 5-bit red, green and blue and a modifier
/// table, one per byte.
///
/// With `subblocks` the entries are kept packed, since blocks combine two of them. Otherwise
/// each entry is expanded with [`etc1s_block_endpoint`].
pub(crate) fn decode_etc_color_endpoints(
    data: &[u8],
    count: usize,
    subblocks: bool,
) -> Result<Vec<u32>, FormatError> {
    let mut reader = BitReader::new(data);
    let dm = receive_prefix_code(&mut reader, COLOR_5BIT_SYMBOLS)?;

    let mut lanes = [0u32; 4];
    let mut endpoints = Vec::with_capacity(count);
    for _ in 0..count {
        for lane in &mut lanes {
            *lane = (*lane + dm.decode(&mut reader)?) & 31;
        }
        let packed = lanes[0] | lanes[1] << 8 | lanes[2] << 16 | lanes[3] << 24;
        endpoints.push(if subblocks {
            packed
        } else {
            etc1s_block_endpoint(packed)
        });
    }
    Ok(endpoints)
}

/// BC1 selector word for a linear selector with texel `i` at bits `2i`.
#[inline]
const fn dxt1_selectors(linear: u32) -> u32 {
    // Per texel: high bit = h ^ l, low bit = h, which is DXT1_FROM_LINEAR.
    ((linear ^ linear << 1) & 0xAAAA_AAAA) | (linear >> 1 & 0x5555_5555)
}

/// ETC1 selector word, stored little endian so the block's big-endian MSB and LSB planes land
/// in bytes 4..6 and 6..8.
fn etc1_selectors(linear: u32, transposed: bool) -> u32 {
    let mut word = 0u32;
    for y in 0..4 {
        for x in 0..4 {
            let texel = linear_texel(x, y, transposed);
            let index = ETC1_FROM_LINEAR[(linear >> (texel * 2) & 3) as usize] as u32;
            let bit = (x * 4 + y + 8) & 15;
            word |= (index >> 1) << bit | (index & 1) << (bit + 16);
        }
    }
    word
}

/// Decodes `count` colour selector entries.
pub(crate) fn decode_color_selectors(
    data: &[u8],
    count: usize,
    form: SelectorForm,
) -> Result<Vec<u32>, FormatError> {
    let mut reader = BitReader::new(data);
    let dm = receive_prefix_code(&mut reader, COLOR_SELECTOR_SYMBOLS)?;

    let mut linear = 0u32;
    let mut selectors = Vec::with_capacity(count * form.entries());
    for _ in 0..count {
        for shift in (0..32).step_by(4) {
            linear ^= dm.decode(&mut reader)? << shift;
        }
        match form {
            SelectorForm::Dxt => selectors.push(dxt1_selectors(linear)),
            SelectorForm::Etc => selectors.push(etc1_selectors(linear, false)),
            SelectorForm::EtcFlipped => {
                selectors.push(etc1_selectors(linear, true));
                selectors.push(etc1_selectors(linear, false));
            }
        }
    }
    Ok(selectors)
}

/// Decodes `count` alpha endpoint pairs, packed as `alpha0 | alpha1 << 8`.
pub(crate) fn decode_alpha_endpoints(data: &[u8], count: usize) -> Result<Vec<u16>, FormatError> {
    let mut reader = BitReader::new(data);
    let dm = receive_prefix_code(&mut reader, ALPHA_ENDPOINT_SYMBOLS)?;

    let (mut a0, mut a1) = (0u32, 0u32);
    let mut endpoints = Vec::with_capacity(count);
    for _ in 0..count {
        a0 = (a0 + dm.decode(&mut reader)?) & 0xFF;
        a1 = (a1 + dm.decode(&mut reader)?) & 0xFF;
        endpoints.push((a0 | (a1 << 8)) as u16);
    }
    Ok(endpoints)
}

/// The 48 BC4 selector bits, little endian with texel `i` at bits `3i`.
fn dxt5_selectors(linear: u64) -> [u8; 6] {
    let packed = (0..16).fold(0u64, |acc, texel| {
        let value = DXT5_FROM_LINEAR[(linear >> (texel * 3) & 7) as usize] as u64;
        acc | value << (texel * 3)
    });
    let mut bytes = [0u8; 6];
    bytes.copy_from_slice(&packed.to_le_bytes()[..6]);
    bytes
}

/// The 48 EAC selector bits, big endian with texel `(x, y)` in the 3 bits starting at bit
/// `45 - 3 * (4x + y)`.
fn eac_selectors(linear: u64, transposed: bool) -> [u8; 6] {
    let mut packed = 0u64;
    for y in 0..4 {
        for x in 0..4 {
            let value = (linear >> (linear_texel(x, y, transposed) * 3) & 7) as u8;
            // Modifiers 0..=3 are negative with the largest magnitude last.
            let index = if value <= 3 { 3 - value } else { value };
            packed |= (index as u64) << (45 - 3 * (x * 4 + y));
        }
    }
    let mut bytes = [0u8; 6];
    bytes.copy_from_slice(&packed.to_be_bytes()[2..]);
    bytes
}

/// Decodes `count` alpha selector entries.
pub(crate) fn decode_alpha_selectors(
    data: &[u8],
    count: usize,
    form: SelectorForm,
) -> Result<Vec<[u8; 6]>, FormatError> {
    let mut reader = BitReader::new(data);
    let dm = receive_prefix_code(&mut reader, ALPHA_SELECTOR_SYMBOLS)?;

    let mut linear = 0u64;
    let mut selectors = Vec::with_capacity(count * form.entries());
    for _ in 0..count {
        for shift in (0..48).step_by(6) {
            linear ^= (dm.decode(&mut reader)? as u64) << shift;
        }
        match form {
            SelectorForm::Dxt => selectors.push(dxt5_selectors(linear)),
            SelectorForm::Etc => selectors.push(eac_selectors(linear, false)),
            SelectorForm::EtcFlipped => {
                selectors.push(eac_selectors(linear, true));
                selectors.push(eac_selectors(linear, false));
            }
        }
    }
    Ok(selectors)
}

/// All palettes of a file. Palettes the file does not carry are empty.
#[derive(Debug, Clone, Default)]
pub(crate) struct Palettes {
    pub(crate) color_endpoints: Vec<u32>,
    pub(crate) color_selectors: Vec<u32>,
    pub(crate) alpha_endpoints: Vec<u16>,
    pub(crate) alpha_selectors: Vec<[u8; 6]>,
}

impl Palettes {
    /// Decodes every palette `header` declares.
    ///
    /// Endpoints and selectors of one kind are only meaningful together, so a file declaring one
    /// without the other is rejected.
    pub(crate) fn decode(data: &[u8], header: &Header) -> Result<Self, CrnError> {
        let format = header.format;
        let mut palettes = Self::default();
        let section_data =
            |section: &PaletteSection| header.section_range(section.offset, section.size);

        if header.color_endpoints.is_present() {
            if !header.color_selectors.is_present() {
                return Err(FormatError::MissingPalette("colour selector").into());
            }
            let section = &header.color_endpoints;
            let count = section.count as usize;
            palettes.color_endpoints = if format.has_etc_color() {
                let subblocks = format.has_subblocks();
                decode_etc_color_endpoints(&data[section_data(section)?], count, subblocks)?
            } else {
                decode_color_endpoints(&data[section_data(section)?], count)?
            };

            let section = &header.color_selectors;
            palettes.color_selectors = decode_color_selectors(
                &data[section_data(section)?],
                section.count as usize,
                SelectorForm::for_channel(format, Channel::Color),
            )?;
        }

        if header.alpha_endpoints.is_present() {
            if !header.alpha_selectors.is_present() {
                return Err(FormatError::MissingPalette("alpha selector").into());
            }
            let section = &header.alpha_endpoints;
            palettes.alpha_endpoints =
                decode_alpha_endpoints(&data[section_data(section)?], section.count as usize)?;

            let section = &header.alpha_selectors;
            palettes.alpha_selectors = decode_alpha_selectors(
                &data[section_data(section)?],
                section.count as usize,
                SelectorForm::for_channel(format, Channel::Alpha),
            )?;
        }

        Ok(palettes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_prelude::*;

    #[test]
    fn dxt1_selector_bits_follow_the_table() {
        for value in 0..4u32 {
            let linear = value << 6;
            assert_eq!(dxt1_selectors(linear), (DXT1_FROM_LINEAR[value as usize] as u32) << 6);
        }
    }

    #[test]
    fn decodes_color_endpoints() {
        let values = [0x1234_5678u32, 0xFFFF_0000, 0x0000_FFFF, 0x8410_7BEF];
        let bytes = encode_color_endpoints(&values, false);
        assert_eq!(decode_color_endpoints(&bytes, values.len()).unwrap(), values);
    }

    #[test]
    fn decodes_etc_color_endpoints() {
        let values = [0x0102_1F00u32, 0x071F_001F, 0x0000_0000, 0x0510_0A05];
        let bytes = encode_color_endpoints(&values, true);
        assert_eq!(
            decode_etc_color_endpoints(&bytes, values.len(), true).unwrap(),
            values
        );

        let expanded = decode_etc_color_endpoints(&bytes, values.len(), false).unwrap();
        let first = expanded[0].to_le_bytes();
        // Red 0 and green 31 shifted into 5-bit bases, codeword 1 in both tables, differential.
        assert_eq!(first, [0x00, 0xF8, 0x10, 0x26]);
    }

    #[rstest]
    #[case(SelectorForm::Dxt, CrnFormat::Dxt1)]
    #[case(SelectorForm::Etc, CrnFormat::Etc1S)]
    #[case(SelectorForm::EtcFlipped, CrnFormat::Etc1)]
    fn decodes_color_selectors(#[case] form: SelectorForm, #[case] format: CrnFormat) {
        let values = [0u32, 0xFFFF_FFFF, 0x1B1B_E4E4, 0x5555_AAAA];
        let bytes = encode_color_selectors(&values);
        let decoded = decode_color_selectors(&bytes, values.len(), form).unwrap();
        assert_eq!(decoded.len(), values.len() * form.entries());

        for (index, &linear) in values.iter().enumerate() {
            for flip in 0..form.entries() {
                let word = decoded[index * form.entries() + flip];
                let transposed = form == SelectorForm::EtcFlipped && flip == 0;
                assert_eq!(
                    word.to_le_bytes(),
                    color_selector_bytes(format, linear, transposed)
                );
            }
        }
    }

    #[test]
    fn etc_selectors_store_texels_column_major() {
        // Linear texel (x=1, y=0) holds 3, the largest positive modifier (index 1).
        let word = etc1_selectors(3 << 2, false);
        // ETC texel index 4: MSB plane bit 4 is clear, LSB plane bit 4 is set. All other
        // texels take linear 0, index 3, with both planes set.
        let bytes = word.to_le_bytes();
        assert_eq!(bytes, [0xFF, 0xEF, 0xFF, 0xFF]);
    }

    #[test]
    fn decodes_alpha_endpoints() {
        let values = [0xFF00u16, 0x00FF, 0x8040, 0x1234];
        let bytes = encode_alpha_endpoints(&values);
        assert_eq!(decode_alpha_endpoints(&bytes, values.len()).unwrap(), values);
    }

    #[rstest]
    #[case(SelectorForm::Dxt, CrnFormat::Dxt5)]
    #[case(SelectorForm::Etc, CrnFormat::Etc2AS)]
    #[case(SelectorForm::EtcFlipped, CrnFormat::Etc2A)]
    fn decodes_alpha_selectors(#[case] form: SelectorForm, #[case] format: CrnFormat) {
        let values = [0u64, 0xFFFF_FFFF_FFFF, 0x1234_5678_9ABC, 0x9249_2492_4924];
        let bytes = encode_alpha_selectors(&values);
        let decoded = decode_alpha_selectors(&bytes, values.len(), form).unwrap();
        assert_eq!(decoded.len(), values.len() * form.entries());

        for (index, &linear) in values.iter().enumerate() {
            for flip in 0..form.entries() {
                let transposed = form == SelectorForm::EtcFlipped && flip == 0;
                assert_eq!(
                    decoded[index * form.entries() + flip],
                    alpha_selector_bytes(format, linear, transposed)
                );
            }
        }
    }

    #[test]
    fn selector_forms_follow_the_format() {
        assert_eq!(SelectorForm::for_channel(CrnFormat::Dxt5, Channel::Alpha), SelectorForm::Dxt);
        assert_eq!(
            SelectorForm::for_channel(CrnFormat::Etc2A, Channel::Alpha),
            SelectorForm::EtcFlipped
        );
        assert_eq!(
            SelectorForm::for_channel(CrnFormat::Etc2AS, Channel::Alpha),
            SelectorForm::Etc
        );
        assert_eq!(
            SelectorForm::for_channel(CrnFormat::Etc2AS, Channel::Color),
            SelectorForm::Etc
        );
        assert_eq!(
            SelectorForm::for_channel(CrnFormat::Etc2, Channel::Color),
            SelectorForm::EtcFlipped
        );
    }

    #[test]
    fn truncated_palette_fails() {
        let values = [0x1234_5678u32; 64];
        let bytes = encode_color_endpoints(&values, false);
        assert_eq!(
            decode_color_endpoints(&bytes[..bytes.len() / 2], values.len()),
            Err(FormatError::StreamExhausted)
        );
    }
}
