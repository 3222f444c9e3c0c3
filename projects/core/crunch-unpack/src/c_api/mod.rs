//! # C API (FFI) Documentation
//!
//! *Note: The C API is only available when the `c-exports` feature is enabled.*
//!
//! ## Example Usage
//!
//! ```c
//! CrnuTextureInfo info;
//! if (crnu_get_texture_info(data, data_size, &info) != CRNU_SUCCESS) {
//!     return;
//! }
//!
//! CrnuUnpackContext* context = crnu_unpack_begin(data, data_size);
//! for (uint32_t level = 0; level < info.levels; level++) {
//!     CrnuLevelInfo level_info;
//!     crnu_get_level_info(data, data_size, level, &level_info);
//!     size_t size = (size_t)level_info.blocks_x * level_info.blocks_y
//!                 * level_info.bytes_per_block * level_info.faces;
//!     uint8_t* blocks = malloc(size);
//!     CrnuErrorCode result = crnu_unpack_level(context, blocks, size, 0, level);
//!     if (result != CRNU_SUCCESS) {
//!         printf("%s\n", crnu_error_message(result));
//!     }
//!     free(blocks);
//! }
//! crnu_unpack_end(context);
//! ```
//!
//! ## Functions
//!
//! - **`crnu_get_texture_info(data, data_size, out_info)`** - Read texture metadata
//! - **`crnu_get_level_info(data, data_size, level_index, out_info)`** - Read one level's metadata
//! - **`crnu_unpack_begin(data, data_size)`** - Create an unpack context, null on failure
//! - **`crnu_unpack_level(context, dst, dst_size, row_pitch, level_index)`** - Unpack one level
//! - **`crnu_unpack_end(context)`** - Free an unpack context
//! - **`crnu_error_message(code)`** - Describe an error code
//!
//! All fallible functions return [`CrnuErrorCode`], `CRNU_SUCCESS` (0) on success.

pub mod context;
pub mod error;

pub use context::*;
pub use error::*;

use crate::info::{LevelInfo, TextureInfo};

/// FFI-safe version of [`TextureInfo`].
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrnuTextureInfo {
    /// Width of the top level in texels.
    pub width: u32,
    /// Height of the top level in texels.
    pub height: u32,
    /// Number of mip levels.
    pub levels: u32,
    /// 1, or 6 for a cube map.
    pub faces: u32,
    /// Bytes per output block.
    pub bytes_per_block: u32,
    /// First application-defined header word.
    pub userdata0: u32,
    /// Second application-defined header word.
    pub userdata1: u32,
    /// Raw format value.
    pub format: u32,
}

/// FFI-safe version of [`LevelInfo`].
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrnuLevelInfo {
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
    /// Bytes per output block.
    pub bytes_per_block: u32,
    /// Raw format value.
    pub format: u32,
}

impl From<TextureInfo> for CrnuTextureInfo {
    fn from(info: TextureInfo) -> Self {
        Self {
            width: info.width,
            height: info.height,
            levels: info.levels,
            faces: info.faces,
            bytes_per_block: info.bytes_per_block,
            userdata0: info.userdata0,
            userdata1: info.userdata1,
            format: info.format as u32,
        }
    }
}

impl From<LevelInfo> for CrnuLevelInfo {
    fn from(info: LevelInfo) -> Self {
        Self {
            width: info.width,
            height: info.height,
            faces: info.faces,
            blocks_x: info.blocks_x,
            blocks_y: info.blocks_y,
            bytes_per_block: info.bytes_per_block,
            format: info.format as u32,
        }
    }
}

/// Read the texture metadata of a CRN file.
///
/// # Safety
/// - `data` must point to `data_size` readable bytes
/// - `out_info` must be a valid pointer to a [`CrnuTextureInfo`]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn crnu_get_texture_info(
    data: *const u8,
    data_size: usize,
    out_info: *mut CrnuTextureInfo,
) -> CrnuErrorCode {
    if data.is_null() {
        return CrnuErrorCode::NullDataPointer;
    }
    if out_info.is_null() {
        return CrnuErrorCode::NullOutputPointer;
    }

    let data = unsafe { core::slice::from_raw_parts(data, data_size) };
    match crate::info::get_texture_info(data) {
        Ok(info) => {
            unsafe { *out_info = info.into() };
            CrnuErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

/// Read the metadata of one level of a CRN file.
///
/// # Safety
/// - `data` must point to `data_size` readable bytes
/// - `out_info` must be a valid pointer to a [`CrnuLevelInfo`]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn crnu_get_level_info(
    data: *const u8,
    data_size: usize,
    level_index: u32,
    out_info: *mut CrnuLevelInfo,
) -> CrnuErrorCode {
    if data.is_null() {
        return CrnuErrorCode::NullDataPointer;
    }
    if out_info.is_null() {
        return CrnuErrorCode::NullOutputPointer;
    }

    let data = unsafe { core::slice::from_raw_parts(data, data_size) };
    match crate::info::get_level_info(data, level_index) {
        Ok(info) => {
            unsafe { *out_info = info.into() };
            CrnuErrorCode::Success
        }
        Err(e) => e.into(),
    }
}
