//! Error types for CRN parsing and unpacking.

use crate::format::CrnFormat;
use thiserror::Error;

/// Errors that can occur while reading or unpacking a CRN file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CrnError {
    /// The buffer ends before a region the file declares.
    #[error("Truncated data: need {needed} bytes, but only {actual} bytes available.")]
    TruncatedData {
        /// The required size in bytes
        needed: usize,
        /// The actual size in bytes
        actual: usize,
    },

    /// The file is structurally malformed.
    #[error("Malformed CRN data: {0}")]
    Format(#[from] FormatError),

    /// The requested mip level does not exist.
    #[error("Level index {index} is out of range, the texture has {levels} levels.")]
    LevelOutOfRange {
        /// The requested level
        index: u32,
        /// Number of levels in the texture
        levels: u32,
    },

    /// The output buffer is too small for the level.
    #[error("Output buffer too small: need {needed} bytes, but only {actual} bytes available.")]
    OutputBufferTooSmall {
        /// The required size in bytes
        needed: usize,
        /// The actual size in bytes
        actual: usize,
    },

    /// The row pitch cannot hold a full row of blocks.
    #[error("Row pitch too small: need at least {needed} bytes per row, got {actual}.")]
    RowPitchTooSmall {
        /// Minimum row pitch in bytes
        needed: usize,
        /// The row pitch that was supplied
        actual: usize,
    },

    /// The number of face buffers does not match the number of faces in the texture.
    #[error("Expected {expected} face buffers, got {actual}.")]
    FaceCountMismatch {
        /// Faces in the texture
        expected: u32,
        /// Buffers supplied
        actual: usize,
    },
}

/// Structural faults found in a CRN file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The file does not start with the CRN signature.
    #[error("invalid signature 0x{0:04X}")]
    InvalidSignature(u16),

    /// The declared header size is below the fixed header size.
    #[error("header size {0} is invalid")]
    InvalidHeaderSize(u16),

    /// The declared data size is smaller than the header.
    #[error("data size {data_size} is smaller than the header size {header_size}")]
    InvalidDataSize {
        /// Declared size of the whole file
        data_size: u32,
        /// Declared size of the header
        header_size: u16,
    },

    /// The format byte is not a known format.
    #[error("unknown texture format {0}")]
    UnknownFormat(u8),

    /// The format is recognised but has no block decoder.
    #[error("format {0:?} cannot be unpacked")]
    UnsupportedUnpackFormat(CrnFormat),

    /// Faces must be 1 or 6.
    #[error("invalid face count {0}")]
    InvalidFaceCount(u8),

    /// Width or height is zero or above the maximum dimension.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Declared width in texels
        width: u16,
        /// Declared height in texels
        height: u16,
    },

    /// The level count is zero or more than the dimensions allow.
    #[error("invalid level count {levels} (at most {max} for this size)")]
    InvalidLevelCount {
        /// Declared level count
        levels: u8,
        /// Most levels the dimensions allow
        max: u32,
    },

    /// The level directory does not fit in the header.
    #[error("level directory needs {needed} header bytes but the header is {header_size} bytes")]
    LevelDirectoryOutOfBounds {
        /// Header bytes the directory needs
        needed: usize,
        /// Declared size of the header
        header_size: u16,
    },

    /// A level's byte range is not within the data region.
    #[error("level {level} spans {start}..{end}, outside the file")]
    LevelOutOfBounds {
        /// The level index
        level: u32,
        /// Start offset of the level's data
        start: usize,
        /// End offset of the level's data
        end: usize,
    },

    /// A level's compressed stream is empty.
    #[error("level {0} has no data")]
    EmptyLevel(u32),

    /// The header checksum does not match the header bytes.
    #[error("header checksum mismatch: stored 0x{stored:04X}, computed 0x{computed:04X}")]
    HeaderChecksumMismatch {
        /// Checksum stored in the file
        stored: u16,
        /// Checksum of the bytes read
        computed: u16,
    },

    /// The data checksum does not match the bytes after the header.
    #[error("data checksum mismatch: stored 0x{stored:04X}, computed 0x{computed:04X}")]
    DataChecksumMismatch {
        /// Checksum stored in the file
        stored: u16,
        /// Checksum of the bytes read
        computed: u16,
    },

    /// A palette needed by the format or its pair palette is absent.
    #[error("{0} palette is required by this format but missing")]
    MissingPalette(&'static str),

    /// Neither colour nor alpha endpoints are present.
    #[error("a texture must contain colour or alpha endpoints")]
    NoEndpoints,

    /// A prefix code declares more symbols than any CRN code uses.
    #[error("prefix code declares {0} symbols")]
    TooManySymbols(u32),

    /// The code length code count is zero or above 21.
    #[error("invalid code length code count {0}")]
    InvalidCodeLengthCount(u32),

    /// A run of code lengths extends past the last symbol.
    #[error("code length run overflows the symbol table")]
    CodeLengthRunOverflow,

    /// A repeat of the previous code length appears before any length.
    #[error("code length repeat has no previous length")]
    CodeLengthRepeatWithoutPrevious,

    /// A prefix code has no symbols with a non-zero length.
    #[error("prefix code has no symbols")]
    EmptyCode,

    /// Code lengths are oversubscribed or leave gaps.
    #[error("code lengths do not form a complete prefix code")]
    IncompleteCode,

    /// A decoded symbol is not below the code's symbol limit.
    #[error("symbol {symbol} exceeds the limit of {limit}")]
    SymbolOutOfRange {
        /// The decoded symbol
        symbol: u32,
        /// Number of symbols the code allows
        limit: u32,
    },

    /// The next bits do not form any code of the prefix code.
    #[error("bit stream does not match any code")]
    InvalidCode,

    /// Decoding read past the end of a section.
    #[error("bit stream exhausted")]
    StreamExhausted,

    /// A decoded palette index is not below the palette size.
    #[error("palette index {index} exceeds palette size {size}")]
    PaletteIndexOutOfRange {
        /// The decoded index
        index: u32,
        /// Entries in the palette
        size: u32,
    },
}

/// Crate-wide result alias.
pub type CrnResult<T> = Result<T, CrnError>;
