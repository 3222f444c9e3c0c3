//! The unpack context: a parsed CRN file ready to decode levels from.

use crate::bitstream::BitReader;
use crate::codebook::{PrefixCode, receive_prefix_code};
use crate::error::{CrnError, FormatError};
use crate::format::Channel;
use crate::header::Header;
use crate::info::{LevelInfo, TextureInfo, verify_checksums};
use crate::options::UnpackOptions;
use crate::palette::Palettes;
use crate::unpack::{LevelDecoder, REFERENCE_SYMBOLS};
use alloc::vec;
use alloc::vec::Vec;

/// Prefix codes shared by every level of a file.
#[derive(Debug, Clone)]
pub(crate) struct Codebooks {
    /// Endpoint references of a block group.
    pub(crate) reference: PrefixCode,
    /// Endpoint index delta codes, indexed by [`Channel::code_index`].
    pub(crate) endpoint_delta: [Option<PrefixCode>; 2],
    /// Selector index codes, indexed by [`Channel::code_index`].
    pub(crate) selector: [Option<PrefixCode>; 2],
}

impl Codebooks {
    /// Receives the codes stored in the tables section.
    fn decode(data: &[u8], header: &Header) -> Result<Self, CrnError> {
        let range = header.section_range(header.tables_offset, header.tables_size as u32)?;
        let mut reader = BitReader::new(&data[range]);

        let reference = receive_prefix_code(&mut reader, REFERENCE_SYMBOLS)?;
        if !header.color_endpoints.is_present() && !header.alpha_endpoints.is_present() {
            return Err(FormatError::NoEndpoints.into());
        }

        let mut codes = Self {
            reference,
            endpoint_delta: [None, None],
            selector: [None, None],
        };
        for (channel, endpoints, selectors) in [
            (Channel::Color, &header.color_endpoints, &header.color_selectors),
            (Channel::Alpha, &header.alpha_endpoints, &header.alpha_selectors),
        ] {
            if !endpoints.is_present() {
                continue;
            }
            let index = channel.code_index();
            codes.endpoint_delta[index] =
                Some(receive_prefix_code(&mut reader, endpoints.count as u32)?);
            codes.selector[index] =
                Some(receive_prefix_code(&mut reader, selectors.count as u32)?);
        }
        Ok(codes)
    }
}

/// A CRN file prepared for unpacking.
///
/// Creating the context parses the header, receives the shared prefix codes and decodes all
/// palettes. Levels can then be unpacked in any order, any number of times, and from several
/// threads at once: unpacking never mutates the context.
///
/// The context borrows the file data and never copies it.
#[derive(Debug, Clone)]
pub struct UnpackContext<'a> {
    /// File data, cut to the size declared in the header.
    data: &'a [u8],
    header: Header,
    codes: Codebooks,
    palettes: Palettes,
}

impl<'a> UnpackContext<'a> {
    /// Prepares `data` for unpacking with default options.
    pub fn begin(data: &'a [u8]) -> Result<Self, CrnError> {
        Self::with_options(data, UnpackOptions::default())
    }

    /// Prepares `data` for unpacking.
    ///
    /// # Errors
    ///
    /// - [`CrnError::TruncatedData`] if the header or any section lies beyond the end of `data`.
    /// - [`CrnError::Format`] if the header, codes or palettes are malformed, or the palettes the
    ///   format needs are missing.
    pub fn with_options(data: &'a [u8], options: UnpackOptions) -> Result<Self, CrnError> {
        let header = Header::parse(data)?;
        let data = &data[..header.data_size as usize];
        if options.verify_checksums {
            verify_checksums(data, &header)?;
        }

        let format = header.format;
        if format.has_color() && !header.color_endpoints.is_present() {
            return Err(FormatError::MissingPalette("colour endpoint").into());
        }
        if format.has_alpha() && !header.alpha_endpoints.is_present() {
            return Err(FormatError::MissingPalette("alpha endpoint").into());
        }

        let palettes = Palettes::decode(data, &header)?;
        let codes = Codebooks::decode(data, &header)?;

        tracing::debug!(
            format = format.name(),
            width = header.width,
            height = header.height,
            levels = header.levels,
            faces = header.faces,
            color_endpoints = palettes.color_endpoints.len(),
            color_selectors = palettes.color_selectors.len(),
            alpha_endpoints = palettes.alpha_endpoints.len(),
            alpha_selectors = palettes.alpha_selectors.len(),
            "CRN unpack context created"
        );

        Ok(Self {
            data,
            header,
            codes,
            palettes,
        })
    }

    /// Metadata of the whole texture.
    pub fn texture_info(&self) -> TextureInfo {
        TextureInfo::from_header(&self.header)
    }

    /// Metadata of one level.
    pub fn level_info(&self, level: u32) -> Result<LevelInfo, CrnError> {
        LevelInfo::from_header(&self.header, self.data, level)
    }

    /// The file data this context reads from.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Resolves the level and checks the output layout, before anything is written.
    fn prepare_level(&self, level: u32, row_pitch: usize) -> Result<(LevelInfo, usize), CrnError> {
        if level >= self.header.levels {
            return Err(CrnError::LevelOutOfRange {
                index: level,
                levels: self.header.levels,
            });
        }
        if !self.header.format.can_unpack() {
            return Err(FormatError::UnsupportedUnpackFormat(self.header.format).into());
        }

        let info = self.level_info(level)?;
        let min_pitch = info.min_row_pitch();
        let row_pitch = if row_pitch == 0 { min_pitch } else { row_pitch };
        if row_pitch < min_pitch {
            return Err(CrnError::RowPitchTooSmall {
                needed: min_pitch,
                actual: row_pitch,
            });
        }
        if info.data_size == 0 {
            return Err(FormatError::EmptyLevel(level).into());
        }
        Ok((info, row_pitch))
    }

    fn level_stream(&self, info: &LevelInfo) -> &'a [u8] {
        &self.data[info.data_offset..info.data_offset + info.data_size]
    }

    /// Unpacks a level into `dst`.
    ///
    /// Rows of blocks are `row_pitch` bytes apart; `0` selects the tightest pitch. Faces of a
    /// cube map follow each other, each taking `row_pitch * blocks_y` bytes.
    ///
    /// # Errors
    ///
    /// - [`CrnError::LevelOutOfRange`] if `level` does not exist. Nothing is written.
    /// - [`CrnError::RowPitchTooSmall`] or [`CrnError::OutputBufferTooSmall`] if the output
    ///   does not fit. Nothing is written.
    /// - [`CrnError::Format`] if the level data is malformed or the format cannot be unpacked.
    ///   The contents of `dst` are unspecified.
    pub fn unpack_level(&self, dst: &mut [u8], row_pitch: usize, level: u32) -> Result<(), CrnError> {
        let (info, row_pitch) = self.prepare_level(level, row_pitch)?;
        let sizes = info.face_size(row_pitch).zip(info.output_size(row_pitch));
        let (face_size, needed) = match sizes {
            Some((face_size, needed)) if needed <= dst.len() => (face_size, needed),
            _ => {
                return Err(CrnError::OutputBufferTooSmall {
                    needed: sizes.map_or(usize::MAX, |(_, needed)| needed),
                    actual: dst.len(),
                });
            }
        };

        tracing::debug!(
            level,
            blocks_x = info.blocks_x,
            blocks_y = info.blocks_y,
            row_pitch,
            "unpacking CRN level"
        );
        let decoder = LevelDecoder::new(&self.codes, &self.palettes, self.header.format)?;
        decoder.decode(
            self.level_stream(&info),
            &info,
            row_pitch,
            dst[..needed].chunks_exact_mut(face_size),
        )
    }

    /// Unpacks a level into one buffer per face.
    ///
    /// Each buffer must hold `row_pitch * blocks_y` bytes. See [`unpack_level`](Self::unpack_level).
    pub fn unpack_level_faces(
        &self,
        faces: &mut [&mut [u8]],
        row_pitch: usize,
        level: u32,
    ) -> Result<(), CrnError> {
        let (info, row_pitch) = self.prepare_level(level, row_pitch)?;
        if faces.len() != info.faces as usize {
            return Err(CrnError::FaceCountMismatch {
                expected: info.faces,
                actual: faces.len(),
            });
        }
        let face_size = info.face_size(row_pitch).unwrap_or(usize::MAX);
        if let Some(short) = faces.iter().find(|face| face.len() < face_size) {
            return Err(CrnError::OutputBufferTooSmall {
                needed: face_size,
                actual: short.len(),
            });
        }

        tracing::debug!(
            level,
            faces = faces.len(),
            row_pitch,
            "unpacking CRN level faces"
        );
        let decoder = LevelDecoder::new(&self.codes, &self.palettes, self.header.format)?;
        decoder.decode(
            self.level_stream(&info),
            &info,
            row_pitch,
            faces.iter_mut().map(|face| &mut face[..face_size]),
        )
    }

    /// Unpacks a level into a new, tightly packed buffer holding every face.
    pub fn unpack_level_to_vec(&self, level: u32) -> Result<Vec<u8>, CrnError> {
        let (info, row_pitch) = self.prepare_level(level, 0)?;
        let Some(size) = info.output_size(row_pitch) else {
            return Err(CrnError::OutputBufferTooSmall {
                needed: usize::MAX,
                actual: 0,
            });
        };
        let mut output = vec![0u8; size];
        self.unpack_level(&mut output, row_pitch, level)?;
        Ok(output)
    }

    /// Releases the context.
    ///
    /// Dropping the context has the same effect.
    pub fn end(self) {
        tracing::trace!("CRN unpack context released");
    }
}

/// Prepares a CRN file for unpacking. See [`UnpackContext::begin`].
pub fn unpack_begin(data: &[u8]) -> Result<UnpackContext<'_>, CrnError> {
    UnpackContext::begin(data)
}

/// Unpacks one level. See [`UnpackContext::unpack_level`].
pub fn unpack_level(
    context: &UnpackContext<'_>,
    dst: &mut [u8],
    row_pitch: usize,
    level: u32,
) -> Result<(), CrnError> {
    context.unpack_level(dst, row_pitch, level)
}

/// Releases a context. See [`UnpackContext::end`].
pub fn unpack_end(context: UnpackContext<'_>) {
    context.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::MIN_HEADER_SIZE;
    use crate::options::UnpackOptionsBuilder;
    use crate::test_prelude::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn context_is_send_and_sync() {
        assert_send_sync::<UnpackContext<'static>>();
    }

    #[test]
    fn begin_decodes_palettes() {
        let fixture = CrnFixture::simple(CrnFormat::Dxt5, 16, 16, 1, 1);
        let data = fixture.build();
        let context = unpack_begin(&data).unwrap();
        let palettes = &context.palettes;
        assert_eq!(palettes.color_endpoints, fixture.color_endpoints);
        assert_eq!(palettes.alpha_endpoints, fixture.alpha_endpoints);
        for (decoded, &linear) in palettes.color_selectors.iter().zip(&fixture.color_selectors) {
            assert_eq!(decoded.to_le_bytes(), color_selector_bytes(CrnFormat::Dxt5, linear, false));
        }
        for (decoded, &linear) in palettes.alpha_selectors.iter().zip(&fixture.alpha_selectors) {
            assert_eq!(*decoded, alpha_selector_bytes(CrnFormat::Dxt5, linear, false));
        }
        assert_eq!(palettes.color_selectors.len(), fixture.color_selectors.len());
        assert_eq!(palettes.alpha_selectors.len(), fixture.alpha_selectors.len());
        assert_eq!(context.texture_info(), get_texture_info(&data).unwrap());
        unpack_end(context);
    }

    #[test]
    fn begin_rejects_header_size_beyond_buffer() {
        let mut data = CrnFixture::simple(CrnFormat::Dxt1, 8, 8, 1, 1).build();
        let len = data.len();
        data[2..4].copy_from_slice(&((len + 10) as u16).to_be_bytes());
        assert_eq!(
            unpack_begin(&data).unwrap_err(),
            CrnError::TruncatedData {
                needed: len + 10,
                actual: len
            }
        );
    }

    #[test]
    fn begin_rejects_missing_required_palette() {
        let mut data = CrnFixture::simple(CrnFormat::Dxt1, 8, 8, 1, 1).build();
        data[18] = CrnFormat::Dxt5 as u8;
        assert_eq!(
            unpack_begin(&data).unwrap_err(),
            FormatError::MissingPalette("alpha endpoint").into()
        );
    }

    #[test]
    fn begin_rejects_section_beyond_file() {
        let fixture = CrnFixture::simple(CrnFormat::Dxt1, 8, 8, 1, 1);
        let mut data = fixture.build();
        // Grow the colour endpoint section (size field at 36) past the end of the file.
        let len = data.len() as u32;
        data[36..39].copy_from_slice(&len.to_be_bytes()[1..]);
        assert!(matches!(
            unpack_begin(&data).unwrap_err(),
            CrnError::TruncatedData { .. }
        ));
    }

    #[test]
    fn begin_rejects_incomplete_code() {
        let mut data = CrnFixture::simple(CrnFormat::Dxt1, 8, 8, 1, 1).build();
        // The tables section follows the 74 byte header. After the 14-bit symbol count and the
        // 5-bit length count, give code length symbol 17 a length of 1 on top of the sixteen
        // 4-bit codes, over-subscribing the code length code.
        data[MIN_HEADER_SIZE + 2] ^= 0x04;
        assert_eq!(
            unpack_begin(&data).unwrap_err(),
            FormatError::IncompleteCode.into()
        );
    }

    #[test]
    fn begin_with_checksums_rejects_corruption() {
        let mut data = CrnFixture::simple(CrnFormat::Dxt1, 8, 8, 1, 1).build();
        let last = data.len() - 1;
        data[last] ^= 1;

        let options = UnpackOptionsBuilder::new().verify_checksums(true).build();
        assert!(matches!(
            UnpackContext::with_options(&data, options).unwrap_err(),
            CrnError::Format(FormatError::DataChecksumMismatch { .. })
        ));
    }

    #[test]
    fn dxt3_fails_to_unpack() {
        let format = CrnFormat::Dxt3;
        let data = CrnFixture::simple(format, 8, 8, 1, 1).build();
        let context = unpack_begin(&data).unwrap();
        let mut dst = [0u8; 64];
        assert_eq!(
            context.unpack_level(&mut dst, 0, 0),
            Err(FormatError::UnsupportedUnpackFormat(format).into())
        );
    }

    #[test]
    fn empty_level_stream_is_rejected() {
        let mut data = CrnFixture::simple(CrnFormat::Dxt1, 8, 8, 1, 1).build();
        // Point the only level at the end of the file.
        let len = data.len() as u32;
        data[70..74].copy_from_slice(&len.to_be_bytes());
        let context = unpack_begin(&data).unwrap();
        assert_eq!(
            context.unpack_level_to_vec(0),
            Err(FormatError::EmptyLevel(0).into())
        );
    }
}
