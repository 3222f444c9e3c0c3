//! Parsing of the fixed CRN file header and its level directory.
//!
//! All multi-byte header fields are big-endian and unaligned.

use crate::error::{CrnError, FormatError};
use crate::format::CrnFormat;
use core::ops::Range;

/// Magic value at the start of every CRN file (`"Hx"`).
pub const CRN_SIGNATURE: u16 = 0x4878;
/// Size of a header describing a single level.
pub const MIN_HEADER_SIZE: usize = 74;
/// Largest supported width or height.
pub const MAX_DIMENSION: u32 = 4096;
/// Most mip levels a file may hold.
pub const MAX_LEVELS: u32 = 16;
/// Face count of a cube map.
pub const CUBEMAP_FACES: u32 = 6;

const SIGNATURE_OFFSET: usize = 0;
const HEADER_SIZE_OFFSET: usize = 2;
const HEADER_CRC_OFFSET: usize = 4;
const DATA_SIZE_OFFSET: usize = 6;
const DATA_CRC_OFFSET: usize = 10;
const WIDTH_OFFSET: usize = 12;
const HEIGHT_OFFSET: usize = 14;
const LEVELS_OFFSET: usize = 16;
const FACES_OFFSET: usize = 17;
const FORMAT_OFFSET: usize = 18;
const USERDATA0_OFFSET: usize = 25;
const USERDATA1_OFFSET: usize = 29;
const COLOR_ENDPOINTS_OFFSET: usize = 33;
const COLOR_SELECTORS_OFFSET: usize = 41;
const ALPHA_ENDPOINTS_OFFSET: usize = 49;
const ALPHA_SELECTORS_OFFSET: usize = 57;
const TABLES_SIZE_OFFSET: usize = 65;
const TABLES_OFS_OFFSET: usize = 67;
const LEVEL_OFS_OFFSET: usize = 70;

/// Start of the bytes covered by the header checksum.
pub(crate) const HEADER_CRC_START: usize = DATA_SIZE_OFFSET;

// Callers check the buffer length before reading fields.
#[inline]
fn read_u16(data: &[u8], ofs: usize) -> u16 {
    u16::from_be_bytes([data[ofs], data[ofs + 1]])
}

#[inline]
fn read_u24(data: &[u8], ofs: usize) -> u32 {
    u32::from_be_bytes([0, data[ofs], data[ofs + 1], data[ofs + 2]])
}

#[inline]
fn read_u32(data: &[u8], ofs: usize) -> u32 {
    u32::from_be_bytes([data[ofs], data[ofs + 1], data[ofs + 2], data[ofs + 3]])
}

/// Location and entry count of one entropy-coded palette.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) struct PaletteSection {
    /// Byte offset from the start of the file.
    pub(crate) offset: u32,
    /// Size in bytes.
    pub(crate) size: u32,
    /// Number of entries.
    pub(crate) count: u16,
}

impl PaletteSection {
    fn read(data: &[u8], ofs: usize) -> Self {
        Self {
            offset: read_u24(data, ofs),
            size: read_u24(data, ofs + 3),
            count: read_u16(data, ofs + 6),
        }
    }

    pub(crate) fn is_present(&self) -> bool {
        self.count != 0
    }
}

/// Validated contents of a CRN header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) header_size: u16,
    pub(crate) header_crc16: u16,
    pub(crate) data_size: u32,
    pub(crate) data_crc16: u16,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) levels: u32,
    pub(crate) faces: u32,
    pub(crate) format: CrnFormat,
    pub(crate) userdata: [u32; 2],
    pub(crate) color_endpoints: PaletteSection,
    pub(crate) color_selectors: PaletteSection,
    pub(crate) alpha_endpoints: PaletteSection,
    pub(crate) alpha_selectors: PaletteSection,
    pub(crate) tables_size: u16,
    pub(crate) tables_offset: u32,
}

/// Number of mip levels in a full chain for the given base size.
pub const fn max_levels(width: u32, height: u32) -> u32 {
    let mut levels = 1;
    let (mut w, mut h) = (width, height);
    while w > 1 || h > 1 {
        w >>= 1;
        h >>= 1;
        levels += 1;
    }
    levels
}

impl Header {
    /// Parses and validates the header at the start of `data`.
    ///
    /// Fails with [`CrnError::TruncatedData`] when `data` is shorter than the header or the
    /// declared data size.
    pub(crate) fn parse(data: &[u8]) -> Result<Self, CrnError> {
        if data.len() < MIN_HEADER_SIZE {
            return Err(CrnError::TruncatedData {
                needed: MIN_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let signature = read_u16(data, SIGNATURE_OFFSET);
        if signature != CRN_SIGNATURE {
            return Err(FormatError::InvalidSignature(signature).into());
        }

        let header_size = read_u16(data, HEADER_SIZE_OFFSET);
        if (header_size as usize) < MIN_HEADER_SIZE {
            return Err(FormatError::InvalidHeaderSize(header_size).into());
        }
        if header_size as usize > data.len() {
            return Err(CrnError::TruncatedData {
                needed: header_size as usize,
                actual: data.len(),
            });
        }

        let data_size = read_u32(data, DATA_SIZE_OFFSET);
        if data_size < header_size as u32 {
            return Err(FormatError::InvalidDataSize {
                data_size,
                header_size,
            }
            .into());
        }
        if data_size as usize > data.len() {
            return Err(CrnError::TruncatedData {
                needed: data_size as usize,
                actual: data.len(),
            });
        }

        let width = read_u16(data, WIDTH_OFFSET);
        let height = read_u16(data, HEIGHT_OFFSET);
        if width == 0 || height == 0 || width as u32 > MAX_DIMENSION || height as u32 > MAX_DIMENSION
        {
            return Err(FormatError::InvalidDimensions { width, height }.into());
        }

        let levels = data[LEVELS_OFFSET];
        let max = max_levels(width as u32, height as u32).min(MAX_LEVELS);
        if levels == 0 || levels as u32 > max {
            return Err(FormatError::InvalidLevelCount { levels, max }.into());
        }

        let faces = data[FACES_OFFSET];
        if faces != 1 && faces as u32 != CUBEMAP_FACES {
            return Err(FormatError::InvalidFaceCount(faces).into());
        }

        let format_byte = data[FORMAT_OFFSET];
        let format = CrnFormat::from_raw(format_byte).ok_or(FormatError::UnknownFormat(format_byte))?;

        let directory_end = LEVEL_OFS_OFFSET + 4 * levels as usize;
        if directory_end > header_size as usize {
            return Err(FormatError::LevelDirectoryOutOfBounds {
                needed: directory_end,
                header_size,
            }
            .into());
        }

        Ok(Self {
            header_size,
            header_crc16: read_u16(data, HEADER_CRC_OFFSET),
            data_size,
            data_crc16: read_u16(data, DATA_CRC_OFFSET),
            width: width as u32,
            height: height as u32,
            levels: levels as u32,
            faces: faces as u32,
            format,
            userdata: [read_u32(data, USERDATA0_OFFSET), read_u32(data, USERDATA1_OFFSET)],
            color_endpoints: PaletteSection::read(data, COLOR_ENDPOINTS_OFFSET),
            color_selectors: PaletteSection::read(data, COLOR_SELECTORS_OFFSET),
            alpha_endpoints: PaletteSection::read(data, ALPHA_ENDPOINTS_OFFSET),
            alpha_selectors: PaletteSection::read(data, ALPHA_SELECTORS_OFFSET),
            tables_size: read_u16(data, TABLES_SIZE_OFFSET),
            tables_offset: read_u24(data, TABLES_OFS_OFFSET),
        })
    }

    /// Offset of `level`'s block stream as stored in the level directory.
    ///
    /// `data` must be the buffer this header was parsed from and `level < self.levels`.
    fn level_offset(&self, data: &[u8], level: u32) -> usize {
        read_u32(data, LEVEL_OFS_OFFSET + 4 * level as usize) as usize
    }

    /// Byte range of `level`'s block stream.
    ///
    /// A level ends where the next one starts; the last level ends at the declared data size.
    pub(crate) fn level_range(&self, data: &[u8], level: u32) -> Result<Range<usize>, CrnError> {
        if level >= self.levels {
            return Err(CrnError::LevelOutOfRange {
                index: level,
                levels: self.levels,
            });
        }

        let start = self.level_offset(data, level);
        let end = if level + 1 < self.levels {
            self.level_offset(data, level + 1)
        } else {
            self.data_size as usize
        };

        if start < self.header_size as usize || start > end || end > self.data_size as usize {
            return Err(FormatError::LevelOutOfBounds { level, start, end }.into());
        }
        Ok(start..end)
    }

    /// Byte range of a section, checked against the declared data size.
    pub(crate) fn section_range(&self, offset: u32, size: u32) -> Result<Range<usize>, CrnError> {
        let start = offset as usize;
        let end = start + size as usize;
        if end > self.data_size as usize {
            return Err(CrnError::TruncatedData {
                needed: end,
                actual: self.data_size as usize,
            });
        }
        Ok(start..end)
    }

    /// Total size of all four palette sections.
    pub(crate) fn total_palette_size(&self) -> u32 {
        self.color_endpoints.size
            + self.color_selectors.size
            + self.alpha_endpoints.size
            + self.alpha_selectors.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_prelude::*;

    fn minimal_header() -> Vec<u8> {
        CrnFixture::simple(CrnFormat::Dxt1, 8, 8, 1, 1).build()
    }

    fn patch_u16(data: &mut [u8], ofs: usize, value: u16) {
        data[ofs..ofs + 2].copy_from_slice(&value.to_be_bytes());
    }

    #[rstest]
    #[case(1, 1, 1)]
    #[case(4, 4, 3)]
    #[case(8, 8, 4)]
    #[case(256, 64, 9)]
    #[case(4096, 4096, 13)]
    #[case(4096, 1, 13)]
    fn computes_mip_chain_length(#[case] width: u32, #[case] height: u32, #[case] expected: u32) {
        assert_eq!(max_levels(width, height), expected);
    }

    #[test]
    fn parses_fixture_header() {
        let data = minimal_header();
        let header = Header::parse(&data).unwrap();
        assert_eq!(header.width, 8);
        assert_eq!(header.height, 8);
        assert_eq!(header.levels, 1);
        assert_eq!(header.faces, 1);
        assert_eq!(header.format, CrnFormat::Dxt1);
        assert_eq!(header.header_size as usize, MIN_HEADER_SIZE);
        assert_eq!(header.data_size as usize, data.len());
        assert!(header.color_endpoints.is_present());
        assert!(!header.alpha_endpoints.is_present());
    }

    #[test]
    fn short_buffer_is_truncated() {
        let data = minimal_header();
        assert_eq!(
            Header::parse(&data[..MIN_HEADER_SIZE - 1]),
            Err(CrnError::TruncatedData {
                needed: MIN_HEADER_SIZE,
                actual: MIN_HEADER_SIZE - 1
            })
        );
    }

    #[test]
    fn header_size_beyond_buffer_is_truncated() {
        let mut data = minimal_header();
        let len = data.len();
        patch_u16(&mut data, HEADER_SIZE_OFFSET, len as u16 + 1);
        assert_eq!(
            Header::parse(&data),
            Err(CrnError::TruncatedData {
                needed: len + 1,
                actual: len
            })
        );
    }

    #[test]
    fn data_size_beyond_buffer_is_truncated() {
        let data = minimal_header();
        let truncated = &data[..data.len() - 1];
        assert!(matches!(
            Header::parse(truncated),
            Err(CrnError::TruncatedData { .. })
        ));
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = minimal_header();
        data[0] = b'X';
        assert_eq!(
            Header::parse(&data),
            Err(FormatError::InvalidSignature(0x5878).into())
        );
    }

    #[rstest]
    #[case(WIDTH_OFFSET, 0)]
    #[case(HEIGHT_OFFSET, 0)]
    #[case(WIDTH_OFFSET, 4097)]
    fn rejects_bad_dimensions(#[case] offset: usize, #[case] value: u16) {
        let mut data = minimal_header();
        patch_u16(&mut data, offset, value);
        assert!(matches!(
            Header::parse(&data),
            Err(CrnError::Format(FormatError::InvalidDimensions { .. }))
        ));
    }

    #[rstest]
    #[case(LEVELS_OFFSET, 0, FormatError::InvalidLevelCount { levels: 0, max: 4 })]
    #[case(LEVELS_OFFSET, 5, FormatError::InvalidLevelCount { levels: 5, max: 4 })]
    #[case(FACES_OFFSET, 2, FormatError::InvalidFaceCount(2))]
    #[case(FORMAT_OFFSET, 15, FormatError::UnknownFormat(15))]
    fn rejects_bad_fields(#[case] offset: usize, #[case] value: u8, #[case] expected: FormatError) {
        let mut data = minimal_header();
        data[offset] = value;
        assert_eq!(Header::parse(&data), Err(expected.into()));
    }

    #[test]
    fn rejects_level_directory_outside_header() {
        let mut data = minimal_header();
        // Two levels need 78 header bytes, but only 74 are declared.
        data[LEVELS_OFFSET] = 2;
        assert_eq!(
            Header::parse(&data),
            Err(FormatError::LevelDirectoryOutOfBounds {
                needed: 78,
                header_size: 74
            }
            .into())
        );
    }

    #[test]
    fn level_range_checks_index_and_bounds() {
        let mut data = minimal_header();
        let header = Header::parse(&data).unwrap();
        let range = header.level_range(&data, 0).unwrap();
        assert_eq!(range.end, data.len());
        assert_eq!(
            header.level_range(&data, 1),
            Err(CrnError::LevelOutOfRange {
                index: 1,
                levels: 1
            })
        );

        let len = data.len() as u32;
        data[LEVEL_OFS_OFFSET..LEVEL_OFS_OFFSET + 4].copy_from_slice(&(len + 1).to_be_bytes());
        assert!(matches!(
            header.level_range(&data, 0),
            Err(CrnError::Format(FormatError::LevelOutOfBounds { level: 0, .. }))
        ));
    }
}
