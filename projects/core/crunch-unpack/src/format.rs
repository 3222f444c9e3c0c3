//! Texture formats a CRN file can describe.

use derive_enum_all_values::AllValues;

/// The block-compressed format a CRN file decodes to.
///
/// Values match the format byte stored in the file header.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, AllValues)]
pub enum CrnFormat {
    /// BC1, opaque or 1-bit alpha.
    Dxt1 = 0,
    /// BC2. Recognised but cannot be unpacked.
    Dxt3 = 1,
    /// BC3.
    Dxt5 = 2,
    /// BC3 holding YCoCg with a scale factor in blue.
    Dxt5CCxY = 3,
    /// BC3 holding a swizzled normal map, X in alpha and Y in green.
    Dxt5xGxR = 4,
    /// BC3 with red moved to alpha.
    Dxt5xGBR = 5,
    /// BC3 with red and alpha swapped.
    Dxt5AGBR = 6,
    /// BC5 with X in the first channel (`A2XY`).
    DxnXY = 7,
    /// BC5 with Y in the first channel (`ATI2`).
    DxnYX = 8,
    /// BC4 (`ATI1`).
    Dxt5A = 9,
    /// ETC1 with independent subblock endpoints.
    Etc1 = 10,
    /// ETC2 RGB. Blocks are emitted in the ETC1 subset of the format.
    Etc2 = 11,
    /// ETC2 RGBA: an EAC alpha block followed by an ETC1-subset colour block.
    Etc2A = 12,
    /// ETC1 where both subblocks share one endpoint.
    Etc1S = 13,
    /// ETC2 RGBA where both colour subblocks share one endpoint.
    Etc2AS = 14,
}

/// A component stream stored in each output block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Channel {
    /// A colour half taken from the colour palettes: a BC1 block, or the first word of an ETC1
    /// block followed by its selector word.
    Color,
    /// An alpha half taken from the alpha palettes: a BC4 block or an EAC block.
    Alpha,
}

impl Channel {
    /// Index of the delta codes used by this channel.
    pub(crate) const fn code_index(self) -> usize {
        match self {
            Self::Color => 0,
            Self::Alpha => 1,
        }
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Color => "colour",
            Self::Alpha => "alpha",
        }
    }
}

/// One channel of an output block: what it is and where its 8 bytes go.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ChannelSlot {
    pub(crate) channel: Channel,
    pub(crate) byte_offset: usize,
}

const fn slot(channel: Channel, byte_offset: usize) -> ChannelSlot {
    ChannelSlot {
        channel,
        byte_offset,
    }
}

const COLOR_ONLY: &[ChannelSlot] = &[slot(Channel::Color, 0)];
const COLOR_THEN_ALPHA: &[ChannelSlot] = &[slot(Channel::Color, 8), slot(Channel::Alpha, 0)];
const TWO_ALPHA: &[ChannelSlot] = &[slot(Channel::Alpha, 0), slot(Channel::Alpha, 8)];
const ALPHA_ONLY: &[ChannelSlot] = &[slot(Channel::Alpha, 0)];

/// How the blocks of a format are assembled from palette entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BlockLayout {
    /// Each channel copies one endpoint entry and one selector entry. Channels are listed in
    /// decode order.
    Direct(&'static [ChannelSlot]),
    /// ETC1 colour built from two subblock endpoints, optionally behind an EAC alpha block.
    Subblocks {
        /// Whether an alpha block precedes the colour block.
        alpha: bool,
    },
}

impl BlockLayout {
    /// Channels in decode order, with where each lands in the block.
    pub(crate) const fn slots(self) -> &'static [ChannelSlot] {
        match self {
            Self::Direct(slots) => slots,
            Self::Subblocks { alpha: false } => COLOR_ONLY,
            Self::Subblocks { alpha: true } => COLOR_THEN_ALPHA,
        }
    }
}

const fn fourcc(code: &[u8; 4]) -> u32 {
    code[0] as u32 | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

impl CrnFormat {
    /// Converts a header format byte.
    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Dxt1,
            1 => Self::Dxt3,
            2 => Self::Dxt5,
            3 => Self::Dxt5CCxY,
            4 => Self::Dxt5xGxR,
            5 => Self::Dxt5xGBR,
            6 => Self::Dxt5AGBR,
            7 => Self::DxnXY,
            8 => Self::DxnYX,
            9 => Self::Dxt5A,
            10 => Self::Etc1,
            11 => Self::Etc2,
            12 => Self::Etc2A,
            13 => Self::Etc1S,
            14 => Self::Etc2AS,
            _ => return None,
        })
    }

    /// Size of one 4x4 block in bytes.
    pub const fn bytes_per_block(self) -> u32 {
        match self {
            Self::Dxt1 | Self::Dxt5A | Self::Etc1 | Self::Etc2 | Self::Etc1S => 8,
            _ => 16,
        }
    }

    /// Bits per texel of the output format.
    pub const fn bits_per_texel(self) -> u32 {
        self.bytes_per_block() / 2
    }

    /// The FourCC conventionally used for this format.
    pub const fn fourcc(self) -> u32 {
        match self {
            Self::Dxt1 => fourcc(b"DXT1"),
            Self::Dxt3 => fourcc(b"DXT3"),
            Self::Dxt5 => fourcc(b"DXT5"),
            Self::Dxt5CCxY => fourcc(b"CCxY"),
            Self::Dxt5xGxR => fourcc(b"xGxR"),
            Self::Dxt5xGBR => fourcc(b"xGBR"),
            Self::Dxt5AGBR => fourcc(b"AGBR"),
            Self::DxnXY => fourcc(b"A2XY"),
            Self::DxnYX => fourcc(b"ATI2"),
            Self::Dxt5A => fourcc(b"ATI1"),
            Self::Etc1 | Self::Etc1S => fourcc(b"ETC1"),
            Self::Etc2 => fourcc(b"ETC2"),
            Self::Etc2A | Self::Etc2AS => fourcc(b"ET2A"),
        }
    }

    /// Human readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dxt1 => "DXT1",
            Self::Dxt3 => "DXT3",
            Self::Dxt5 => "DXT5",
            Self::Dxt5CCxY => "DXT5_CCxY",
            Self::Dxt5xGxR => "DXT5_xGxR",
            Self::Dxt5xGBR => "DXT5_xGBR",
            Self::Dxt5AGBR => "DXT5_AGBR",
            Self::DxnXY => "DXN_XY",
            Self::DxnYX => "DXN_YX",
            Self::Dxt5A => "DXT5A",
            Self::Etc1 => "ETC1",
            Self::Etc2 => "ETC2",
            Self::Etc2A => "ETC2A",
            Self::Etc1S => "ETC1S",
            Self::Etc2AS => "ETC2AS",
        }
    }

    /// Whether [`unpack_level`](crate::UnpackContext::unpack_level) can decode this format.
    pub const fn can_unpack(self) -> bool {
        !matches!(self, Self::Dxt3)
    }

    /// Whether the format carries colour endpoint and selector palettes.
    pub const fn has_color(self) -> bool {
        !matches!(self, Self::DxnXY | Self::DxnYX | Self::Dxt5A)
    }

    /// Whether the format carries alpha endpoint and selector palettes.
    pub const fn has_alpha(self) -> bool {
        !matches!(
            self,
            Self::Dxt1 | Self::Dxt3 | Self::Etc1 | Self::Etc2 | Self::Etc1S
        )
    }

    /// Whether colour endpoints are stored as ETC base colours rather than RGB565 pairs.
    pub const fn has_etc_color(self) -> bool {
        matches!(
            self,
            Self::Etc1 | Self::Etc2 | Self::Etc2A | Self::Etc1S | Self::Etc2AS
        )
    }

    /// Whether each block picks separate endpoints for its two ETC subblocks.
    pub const fn has_subblocks(self) -> bool {
        matches!(self, Self::Etc1 | Self::Etc2 | Self::Etc2A)
    }

    /// Whether alpha blocks are EAC rather than BC4.
    pub const fn has_etc_alpha(self) -> bool {
        matches!(self, Self::Etc2A | Self::Etc2AS)
    }

    /// How output blocks are assembled, or `None` for formats that cannot be unpacked.
    pub(crate) const fn block_layout(self) -> Option<BlockLayout> {
        Some(match self {
            Self::Dxt1 | Self::Etc1S => BlockLayout::Direct(COLOR_ONLY),
            Self::Dxt5
            | Self::Dxt5CCxY
            | Self::Dxt5xGxR
            | Self::Dxt5xGBR
            | Self::Dxt5AGBR
            | Self::Etc2AS => BlockLayout::Direct(COLOR_THEN_ALPHA),
            Self::DxnXY | Self::DxnYX => BlockLayout::Direct(TWO_ALPHA),
            Self::Dxt5A => BlockLayout::Direct(ALPHA_ONLY),
            Self::Etc1 | Self::Etc2 => BlockLayout::Subblocks { alpha: false },
            Self::Etc2A => BlockLayout::Subblocks { alpha: true },
            Self::Dxt3 => return None,
        })
    }
}

impl core::fmt::Display for CrnFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
