//! Texture, level and file metadata that can be read without unpacking.

use crate::error::{CrnError, FormatError};
use crate::format::CrnFormat;
use crate::header::{HEADER_CRC_START, Header, MAX_LEVELS};
use crate::util::crc16::crc16;

/// Width and height of a compressed block in texels.
pub const BLOCK_DIMENSION: u32 = 4;

/// Metadata of the whole texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width of the top level in texels.
    pub width: u32,
    /// Height of the top level in texels.
    pub height: u32,
    /// Number of mip levels.
    pub levels: u32,
    /// 1 for a regular texture, 6 for a cube map.
    pub faces: u32,
    /// Size of one output block in bytes.
    pub bytes_per_block: u32,
    /// First application-defined header word.
    pub userdata0: u32,
    /// Second application-defined header word.
    pub userdata1: u32,
    /// Output format.
    pub format: CrnFormat,
}

impl TextureInfo {
    pub(crate) fn from_header(header: &Header) -> Self {
        Self {
            width: header.width,
            height: header.height,
            levels: header.levels,
            faces: header.faces,
            bytes_per_block: header.format.bytes_per_block(),
            userdata0: header.userdata[0],
            userdata1: header.userdata[1],
            format: header.format,
        }
    }

    /// Number of blocks across every level and face.
    pub fn total_blocks(&self) -> u64 {
        (0..self.levels)
            .map(|level| {
                let width = (self.width >> level).max(1);
                let height = (self.height >> level).max(1);
                blocks_for(width) as u64 * blocks_for(height) as u64
            })
            .sum::<u64>()
            * self.faces as u64
    }
}

/// Metadata of a single mip level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LevelInfo {
    /// Level index, 0 being the largest.
    pub level: u32,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Faces stored for the level.
    pub faces: u32,
    /// Blocks per row.
    pub blocks_x: u32,
    /// Rows of blocks.
    pub blocks_y: u32,
    /// Size of one output block in bytes.
    pub bytes_per_block: u32,
    /// Output format.
    pub format: CrnFormat,
    /// Offset of the level's compressed block stream in the file.
    pub data_offset: usize,
    /// Length of the level's compressed block stream.
    pub data_size: usize,
}

/// Number of blocks needed to cover `texels` texels.
#[inline]
pub(crate) const fn blocks_for(texels: u32) -> u32 {
    texels.div_ceil(BLOCK_DIMENSION)
}

impl LevelInfo {
    pub(crate) fn from_header(header: &Header, data: &[u8], level: u32) -> Result<Self, CrnError> {
        let range = header.level_range(data, level)?;
        let width = (header.width >> level).max(1);
        let height = (header.height >> level).max(1);
        Ok(Self {
            level,
            width,
            height,
            faces: header.faces,
            blocks_x: blocks_for(width),
            blocks_y: blocks_for(height),
            bytes_per_block: header.format.bytes_per_block(),
            format: header.format,
            data_offset: range.start,
            data_size: range.len(),
        })
    }

    /// Blocks in one face of the level.
    pub fn block_count(&self) -> u32 {
        self.blocks_x * self.blocks_y
    }

    /// Smallest row pitch that holds a row of blocks.
    pub fn min_row_pitch(&self) -> usize {
        self.blocks_x as usize * self.bytes_per_block as usize
    }

    /// Bytes needed for one face at the given row pitch, or `None` if that overflows.
    pub fn face_size(&self, row_pitch: usize) -> Option<usize> {
        row_pitch.checked_mul(self.blocks_y as usize)
    }

    /// Bytes needed for all faces laid out back to back at the given row pitch, or `None` if
    /// that overflows.
    pub fn output_size(&self, row_pitch: usize) -> Option<usize> {
        self.face_size(row_pitch)?.checked_mul(self.faces as usize)
    }
}

/// Section sizes and counts reported by [`validate_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Size of the header including the level directory.
    pub header_size: u32,
    /// Total size of the file as declared by the header.
    pub data_size: u32,
    /// Size of the section holding the reference, endpoint and selector codes.
    pub tables_size: u32,
    /// Combined size of the four palette sections.
    pub total_palette_size: u32,
    /// Compressed size of each level. Only the first `levels` entries are used.
    pub level_compressed_size: [u32; MAX_LEVELS as usize],
    /// Number of levels.
    pub levels: u32,
    /// Entries in the colour endpoint palette.
    pub color_endpoint_palette_entries: u32,
    /// Entries in the colour selector palette.
    pub color_selector_palette_entries: u32,
    /// Entries in the alpha endpoint palette.
    pub alpha_endpoint_palette_entries: u32,
    /// Entries in the alpha selector palette.
    pub alpha_selector_palette_entries: u32,
}

/// Reads the texture metadata from a CRN file.
pub fn get_texture_info(data: &[u8]) -> Result<TextureInfo, CrnError> {
    let header = Header::parse(data)?;
    Ok(TextureInfo::from_header(&header))
}

/// Reads the metadata of one mip level of a CRN file.
///
/// # Errors
///
/// - [`CrnError::LevelOutOfRange`] when `level` is not below the level count.
/// - [`CrnError::Format`] when the level directory points outside the file.
pub fn get_level_info(data: &[u8], level: u32) -> Result<LevelInfo, CrnError> {
    let header = Header::parse(data)?;
    LevelInfo::from_header(&header, data, level)
}

/// Verifies the header and data checksums of a parsed file.
pub(crate) fn verify_checksums(data: &[u8], header: &Header) -> Result<(), FormatError> {
    let header_size = header.header_size as usize;
    let computed = crc16(0, &data[HEADER_CRC_START..header_size]);
    if computed != header.header_crc16 {
        tracing::warn!(stored = header.header_crc16, computed, "CRN header checksum mismatch");
        return Err(FormatError::HeaderChecksumMismatch {
            stored: header.header_crc16,
            computed,
        });
    }

    let computed = crc16(0, &data[header_size..header.data_size as usize]);
    if computed != header.data_crc16 {
        tracing::warn!(stored = header.data_crc16, computed, "CRN data checksum mismatch");
        return Err(FormatError::DataChecksumMismatch {
            stored: header.data_crc16,
            computed,
        });
    }
    Ok(())
}

/// Checks a CRN file's structure and checksums and reports its section sizes.
///
/// This does not decode any palettes or levels.
pub fn validate_file(data: &[u8]) -> Result<FileInfo, CrnError> {
    let header = Header::parse(data)?;
    verify_checksums(data, &header)?;

    // Every section must lie within the file.
    header.section_range(header.tables_offset, header.tables_size as u32)?;
    for section in [
        &header.color_endpoints,
        &header.color_selectors,
        &header.alpha_endpoints,
        &header.alpha_selectors,
    ] {
        header.section_range(section.offset, section.size)?;
    }

    let mut level_compressed_size = [0u32; MAX_LEVELS as usize];
    for (level, size) in (0..header.levels).zip(level_compressed_size.iter_mut()) {
        *size = header.level_range(data, level)?.len() as u32;
    }

    Ok(FileInfo {
        header_size: header.header_size as u32,
        data_size: header.data_size,
        tables_size: header.tables_size as u32,
        total_palette_size: header.total_palette_size(),
        level_compressed_size,
        levels: header.levels,
        color_endpoint_palette_entries: header.color_endpoints.count as u32,
        color_selector_palette_entries: header.color_selectors.count as u32,
        alpha_endpoint_palette_entries: header.alpha_endpoints.count as u32,
        alpha_selector_palette_entries: header.alpha_selectors.count as u32,
    })
}
