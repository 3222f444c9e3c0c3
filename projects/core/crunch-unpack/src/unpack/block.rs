//! Serialisation of palette entries into output block halves.

use crate::format::Channel;
use crate::palette::Palettes;

/// Size of one channel's half of an output block.
pub(crate) const CHANNEL_BYTES: usize = 8;

/// Writes a colour half: the endpoint word then the 32 selector bits. This is a BC1 block, or
/// an ETC1 block when the endpoint word is an ETC1 base colour word.
#[inline(always)]
pub(crate) fn write_color(out: &mut [u8], endpoints: u32, selectors: u32) {
    out[0..4].copy_from_slice(&endpoints.to_le_bytes());
    out[4..8].copy_from_slice(&selectors.to_le_bytes());
}

/// Writes an alpha half: both 8-bit endpoints then the 48 selector bits. This is a BC4 block, or
/// an EAC block when the endpoints are a base value and modifier byte.
#[inline(always)]
fn write_alpha(out: &mut [u8], endpoints: u16, selectors: &[u8; 6]) {
    out[0..2].copy_from_slice(&endpoints.to_le_bytes());
    out[2..8].copy_from_slice(selectors);
}

/// Writes one channel of a block from palette indices.
///
/// `out` must be [`CHANNEL_BYTES`] long and the indices must be within the palettes. Selector
/// indices address stored entries, so ETC callers add the flip bit themselves.
#[inline(always)]
pub(crate) fn write_channel(
    out: &mut [u8],
    channel: Channel,
    palettes: &Palettes,
    endpoint_index: u32,
    selector_index: usize,
) {
    debug_assert_eq!(out.len(), CHANNEL_BYTES);
    match channel {
        Channel::Color => write_color(
            out,
            palettes.color_endpoints[endpoint_index as usize],
            palettes.color_selectors[selector_index],
        ),
        Channel::Alpha => write_alpha(
            out,
            palettes.alpha_endpoints[endpoint_index as usize],
            &palettes.alpha_selectors[selector_index],
        ),
    }
}

/// Builds the first word of an ETC1 block from the packed base colours of its two subblocks.
///
/// Differential mode is used whenever every channel of `second` lies within `-4..=3` of
/// `first`; otherwise both colours drop to 4 bits.
#[inline]
pub(crate) fn etc1_endpoint_word(first: u32, second: u32, flip: bool) -> u32 {
    let e0 = first.to_le_bytes();
    let e1 = second.to_le_bytes();
    let differential = (0..3).all(|c| e0[c] + 3 >= e1[c] && e1[c] + 4 >= e0[c]);

    let mut word = [0u8; 4];
    for c in 0..3 {
        word[c] = if differential {
            e0[c] << 3 | (e1[c].wrapping_sub(e0[c]) & 7)
        } else {
            (e0[c] << 3 & 0xF0) | e1[c] >> 1
        };
    }
    // Codewords are stored in 5-bit lanes; the shifts keep whatever bits fit.
    word[3] = e0[3] << 5 | e1[3] << 2 | (differential as u8) << 1 | flip as u8;
    u32::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_prelude::*;

    #[test]
    fn color_block_layout() {
        let palettes = Palettes {
            color_endpoints: vec![0xAAAA_BBBB, 0x1122_3344],
            color_selectors: vec![0x5566_7788],
            ..Default::default()
        };
        let mut out = [0u8; CHANNEL_BYTES];
        write_channel(&mut out, Channel::Color, &palettes, 1, 0);
        assert_eq!(out, [0x44, 0x33, 0x22, 0x11, 0x88, 0x77, 0x66, 0x55]);
    }

    #[test]
    fn alpha_block_layout() {
        let palettes = Palettes {
            alpha_endpoints: vec![0x20FF],
            alpha_selectors: vec![[1, 2, 3, 4, 5, 6]],
            ..Default::default()
        };
        let mut out = [0u8; CHANNEL_BYTES];
        write_channel(&mut out, Channel::Alpha, &palettes, 0, 0);
        assert_eq!(out, [0xFF, 0x20, 1, 2, 3, 4, 5, 6]);
    }

    #[rstest]
    // Same colour: differential with zero deltas.
    #[case(0x0210_0804, 0x0210_0804, false, [0x20, 0x40, 0x80, 0x4A])]
    // Red +3, green -4, blue 0, flipped.
    #[case(0x0010_0804, 0x0010_0407, true, [0x23, 0x44, 0x80, 0x03])]
    // Green +4 leaves differential range; both colours keep their top 4 bits.
    #[case(0x0110_0804, 0x0310_0C05, false, [0x22, 0x46, 0x88, 0x2C])]
    fn etc1_endpoint_words(
        #[case] first: u32,
        #[case] second: u32,
        #[case] flip: bool,
        #[case] expected: [u8; 4],
    ) {
        assert_eq!(etc1_endpoint_word(first, second, flip).to_le_bytes(), expected);
    }
}
