#![doc = include_str!("../README.MD")]
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub(crate) mod bitstream;
pub(crate) mod codebook;
pub mod context;
pub mod error;
pub mod format;
pub(crate) mod header;
pub mod info;
pub mod options;
pub(crate) mod palette;
pub(crate) mod unpack;
pub mod util;

#[cfg(feature = "c-exports")]
pub mod c_api;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

// Re-export main types and functions at crate root
pub use context::{UnpackContext, unpack_begin, unpack_end, unpack_level};
pub use error::{CrnError, CrnResult, FormatError};
pub use format::CrnFormat;
pub use header::{CRN_SIGNATURE, CUBEMAP_FACES, MAX_DIMENSION, MAX_LEVELS, MIN_HEADER_SIZE, max_levels};
pub use info::{
    BLOCK_DIMENSION, FileInfo, LevelInfo, TextureInfo, get_level_info, get_texture_info,
    validate_file,
};
pub use options::{UnpackOptions, UnpackOptionsBuilder};

/// Common test prelude for avoiding duplicate imports in test modules
#[cfg(test)]
pub(crate) mod test_prelude;
