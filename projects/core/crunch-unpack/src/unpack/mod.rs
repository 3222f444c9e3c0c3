//! Decoding of a level's block stream into block-compressed output.
//!
//! Blocks are walked in raster order over a grid rounded up to even dimensions; blocks outside
//! the level are decoded and dropped. Each block resolves its endpoint indices through an
//! endpoint reference, then reads one selector index per channel. ETC blocks with subblocks
//! may read a second colour endpoint for their second subblock.

mod block;
mod prediction;

pub(crate) use prediction::REFERENCE_SYMBOLS;

use crate::bitstream::BitReader;
use crate::codebook::PrefixCode;
use crate::context::Codebooks;
use crate::error::{CrnError, FormatError};
use crate::format::{BlockLayout, Channel, CrnFormat};
use crate::info::LevelInfo;
use crate::palette::Palettes;
use block::{CHANNEL_BYTES, etc1_endpoint_word, write_channel, write_color};
use prediction::{EndpointReference, MAX_SLOTS, PredictionState, wrap_index};

/// Codes and palette size used by one channel of the output blocks.
struct ChannelDecoder<'c> {
    channel: Channel,
    byte_offset: usize,
    endpoint_code: &'c PrefixCode,
    selector_code: &'c PrefixCode,
    num_endpoints: u32,
}

/// Output of one face.
struct FaceOutput<'d> {
    data: &'d mut [u8],
    row_pitch: usize,
    bytes_per_block: usize,
}

impl FaceOutput<'_> {
    /// Bytes of block `(x, y)`.
    #[inline(always)]
    fn block(&mut self, x: usize, y: usize) -> &mut [u8] {
        let start = y * self.row_pitch + x * self.bytes_per_block;
        &mut self.data[start..start + self.bytes_per_block]
    }
}

/// Decodes levels of one format using a context's codes and palettes.
pub(crate) struct LevelDecoder<'c> {
    palettes: &'c Palettes,
    reference_code: &'c PrefixCode,
    layout: BlockLayout,
    channels: [Option<ChannelDecoder<'c>>; MAX_SLOTS],
}

impl<'c> LevelDecoder<'c> {
    pub(crate) fn new(
        codes: &'c Codebooks,
        palettes: &'c Palettes,
        format: CrnFormat,
    ) -> Result<Self, FormatError> {
        let Some(layout) = format.block_layout() else {
            return Err(FormatError::UnsupportedUnpackFormat(format));
        };

        let mut channels = [None, None];
        for (decoder, slot) in channels.iter_mut().zip(layout.slots()) {
            let index = slot.channel.code_index();
            let (Some(endpoint_code), Some(selector_code)) =
                (&codes.endpoint_delta[index], &codes.selector[index])
            else {
                return Err(FormatError::MissingPalette(slot.channel.name()));
            };
            let num_endpoints = match slot.channel {
                Channel::Color => palettes.color_endpoints.len(),
                Channel::Alpha => palettes.alpha_endpoints.len(),
            };
            *decoder = Some(ChannelDecoder {
                channel: slot.channel,
                byte_offset: slot.byte_offset,
                endpoint_code,
                selector_code,
                num_endpoints: num_endpoints as u32,
            });
        }

        Ok(Self {
            palettes,
            reference_code: &codes.reference,
            layout,
            channels,
        })
    }

    /// Channels in decode order, paired with their prediction slot.
    #[inline(always)]
    fn channels(&self) -> impl Iterator<Item = (usize, &ChannelDecoder<'c>)> {
        self.channels.iter().flatten().enumerate()
    }

    /// Decodes `stream` into `faces`, each at least `row_pitch * info.blocks_y` bytes.
    pub(crate) fn decode<'d>(
        &self,
        stream: &[u8],
        info: &LevelInfo,
        row_pitch: usize,
        faces: impl Iterator<Item = &'d mut [u8]>,
    ) -> Result<(), CrnError> {
        let blocks_x = info.blocks_x as usize;
        let blocks_y = info.blocks_y as usize;
        let width = blocks_x.next_multiple_of(2);
        let height = blocks_y.next_multiple_of(2);
        let subblocks = matches!(self.layout, BlockLayout::Subblocks { .. });

        let mut reader = BitReader::new(stream);
        let mut state = PredictionState::new(if subblocks { width * 2 } else { width });

        for data in faces {
            let mut output = FaceOutput {
                data,
                row_pitch,
                bytes_per_block: info.bytes_per_block as usize,
            };
            for y in 0..height {
                for x in 0..width {
                    let block = if x < blocks_x && y < blocks_y {
                        Some(output.block(x, y))
                    } else {
                        None
                    };
                    if subblocks {
                        self.decode_subblock_block(&mut reader, &mut state, x, y, block)?;
                    } else {
                        self.decode_direct_block(&mut reader, &mut state, x, y, block)?;
                    }
                }
            }
        }

        tracing::trace!(bits = reader.bits_consumed(), "decoded CRN level stream");
        Ok(())
    }

    /// Applies the next endpoint delta of `slot` to the current indices.
    #[inline(always)]
    fn next_endpoint(
        &self,
        reader: &mut BitReader,
        state: &mut PredictionState,
        slot: usize,
        channel: &ChannelDecoder,
    ) -> Result<(), FormatError> {
        let delta = channel.endpoint_code.decode(reader)?;
        state.current[slot] = wrap_index(state.current[slot] + delta, channel.num_endpoints)?;
        Ok(())
    }

    /// Decodes one block of a format that copies palette entries as they are.
    #[inline]
    fn decode_direct_block(
        &self,
        reader: &mut BitReader,
        state: &mut PredictionState,
        x: usize,
        y: usize,
        block: Option<&mut [u8]>,
    ) -> Result<(), FormatError> {
        match state.next_group_reference(reader, self.reference_code, x, y)? {
            EndpointReference::Delta => {
                for (slot, channel) in self.channels() {
                    self.next_endpoint(reader, state, slot, channel)?;
                }
                state.columns[x].endpoints = state.current;
            }
            EndpointReference::Left => state.columns[x].endpoints = state.current,
            EndpointReference::Above | EndpointReference::Diagonal => {
                state.current = state.columns[x].endpoints;
            }
        }

        let mut selectors = [0u32; MAX_SLOTS];
        for (slot, channel) in self.channels() {
            selectors[slot] = channel.selector_code.decode(reader)?;
        }

        if let Some(block) = block {
            for (slot, channel) in self.channels() {
                let start = channel.byte_offset;
                write_channel(
                    &mut block[start..start + CHANNEL_BYTES],
                    channel.channel,
                    self.palettes,
                    state.current[slot],
                    selectors[slot] as usize,
                );
            }
        }
        Ok(())
    }

    /// Decodes one ETC block whose subblocks have their own base colours.
    ///
    /// Slot 0 is the colour endpoint and slot 1, when present, the alpha endpoint. Only the
    /// colour endpoint changes between the two subblocks.
    #[inline]
    fn decode_subblock_block(
        &self,
        reader: &mut BitReader,
        state: &mut PredictionState,
        x: usize,
        y: usize,
        block: Option<&mut [u8]>,
    ) -> Result<(), FormatError> {
        let (first, second) = (x * 2, x * 2 + 1);
        let (reference, mode) = state.next_etc_reference(reader, self.reference_code, x, y)?;
        match reference {
            EndpointReference::Delta => {
                for (slot, channel) in self.channels() {
                    self.next_endpoint(reader, state, slot, channel)?;
                }
                state.columns[first].endpoints = state.current;
            }
            EndpointReference::Left => state.columns[first].endpoints = state.current,
            EndpointReference::Diagonal => {
                state.current = state.diagonal;
                state.columns[first].endpoints = state.current;
            }
            EndpointReference::Above => state.current = state.columns[first].endpoints,
        }
        let first_color = state.current[0];

        let mut selectors = [0u32; MAX_SLOTS];
        for (slot, channel) in self.channels() {
            selectors[slot] = channel.selector_code.decode(reader)?;
        }

        if mode != 0 {
            if let Some(color) = &self.channels[0] {
                self.next_endpoint(reader, state, 0, color)?;
            }
        }
        state.diagonal = core::mem::replace(&mut state.columns[second].endpoints, state.current);

        if let Some(block) = block {
            let flip = mode & 2 == 0;
            let color_offset = match self.layout {
                BlockLayout::Subblocks { alpha: true } => CHANNEL_BYTES,
                _ => 0,
            };
            let palettes = self.palettes;
            let word = etc1_endpoint_word(
                palettes.color_endpoints[first_color as usize],
                palettes.color_endpoints[state.current[0] as usize],
                flip,
            );
            let selector = selectors[0] as usize * 2 + flip as usize;
            write_color(
                &mut block[color_offset..color_offset + CHANNEL_BYTES],
                word,
                palettes.color_selectors[selector],
            );
            if let Some(alpha) = &self.channels[1] {
                write_channel(
                    &mut block[..CHANNEL_BYTES],
                    alpha.channel,
                    palettes,
                    state.current[1],
                    selectors[1] as usize * 2 + flip as usize,
                );
            }
        }
        Ok(())
    }
}
