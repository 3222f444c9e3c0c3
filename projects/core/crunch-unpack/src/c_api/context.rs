//! Unpack context management for the C API.
//!
//! The context is an opaque handle around [`UnpackContext`]. It borrows the file data passed to
//! [`crnu_unpack_begin()`], which must stay alive and unchanged until [`crnu_unpack_end()`].

use super::error::CrnuErrorCode;
use crate::context::UnpackContext;
use alloc::boxed::Box;
use core::ptr;

/// Opaque unpack context.
///
/// This context must be:
///
/// - Created with [`crnu_unpack_begin()`]
/// - Passed to [`crnu_unpack_level()`] any number of times, from any thread
/// - Freed with [`crnu_unpack_end()`] once no unpack call is in flight
#[repr(C)]
pub struct CrnuUnpackContext {
    // Private field to ensure it's opaque
    _private: [u8; 0],
}

/// Internal representation of the unpack context
pub(crate) struct CrnuUnpackContextInner {
    pub(crate) context: UnpackContext<'static>,
}

/// Parse a CRN file and prepare it for unpacking.
///
/// # Safety
/// - `data` must point to `data_size` readable bytes
/// - The data must outlive the returned context and must not be modified while it exists
///
/// # Returns
/// A pointer to a new context, or null if `data` is null or the file is malformed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn crnu_unpack_begin(
    data: *const u8,
    data_size: usize,
) -> *mut CrnuUnpackContext {
    if data.is_null() {
        return ptr::null_mut();
    }

    let data = unsafe { core::slice::from_raw_parts(data, data_size) };
    match UnpackContext::begin(data) {
        Ok(context) => {
            let inner = Box::new(CrnuUnpackContextInner { context });
            Box::into_raw(inner) as *mut CrnuUnpackContext
        }
        Err(error) => {
            tracing::debug!(%error, "crnu_unpack_begin failed");
            ptr::null_mut()
        }
    }
}

/// Unpack one level into `dst`.
///
/// Rows of blocks are `row_pitch` bytes apart, `0` selecting the tightest pitch. Cube map faces
/// follow each other in `dst`.
///
/// # Safety
/// - `context` must be a valid pointer returned by [`crnu_unpack_begin()`]
/// - `dst` must point to `dst_size` writable bytes
#[unsafe(no_mangle)]
pub unsafe extern "C" fn crnu_unpack_level(
    context: *const CrnuUnpackContext,
    dst: *mut u8,
    dst_size: usize,
    row_pitch: u32,
    level_index: u32,
) -> CrnuErrorCode {
    if context.is_null() {
        return CrnuErrorCode::NullContextPointer;
    }
    if dst.is_null() {
        return CrnuErrorCode::NullOutputPointer;
    }

    let inner = unsafe { &*(context as *const CrnuUnpackContextInner) };
    let dst = unsafe { core::slice::from_raw_parts_mut(dst, dst_size) };
    inner
        .context
        .unpack_level(dst, row_pitch as usize, level_index)
        .into()
}

/// Free an unpack context.
///
/// # Safety
/// - `context` must be a valid pointer returned by [`crnu_unpack_begin()`]
/// - `context` must not have been freed already, and no unpack may be in flight on it
/// - After calling this function, `context` becomes invalid
#[unsafe(no_mangle)]
pub unsafe extern "C" fn crnu_unpack_end(context: *mut CrnuUnpackContext) -> CrnuErrorCode {
    if context.is_null() {
        return CrnuErrorCode::NullContextPointer;
    }

    let inner = unsafe { Box::from_raw(context as *mut CrnuUnpackContextInner) };
    inner.context.end();
    CrnuErrorCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_prelude::*;

    #[test]
    fn test_unpack_round_trip() {
        let fixture = CrnFixture::simple(CrnFormat::Dxt5, 16, 8, 2, 1);
        let data = fixture.build();

        unsafe {
            let context = crnu_unpack_begin(data.as_ptr(), data.len());
            assert!(!context.is_null());

            for level in 0..2 {
                let expected = fixture.expected_level(level);
                let mut dst = vec![0u8; expected.len()];
                let result = crnu_unpack_level(context, dst.as_mut_ptr(), dst.len(), 0, level);
                assert_eq!(result, CrnuErrorCode::Success);
                assert_eq!(dst, expected);
            }

            assert_eq!(crnu_unpack_end(context), CrnuErrorCode::Success);
        }
    }

    #[test]
    fn test_unpack_level_errors() {
        let data = CrnFixture::simple(CrnFormat::Dxt1, 8, 8, 1, 1).build();
        unsafe {
            let context = crnu_unpack_begin(data.as_ptr(), data.len());
            let mut dst = [0u8; 32];

            assert_eq!(
                crnu_unpack_level(context, dst.as_mut_ptr(), dst.len(), 0, 1),
                CrnuErrorCode::LevelOutOfRange
            );
            assert_eq!(
                crnu_unpack_level(context, dst.as_mut_ptr(), dst.len() - 1, 0, 0),
                CrnuErrorCode::OutputBufferTooSmall
            );
            assert_eq!(
                crnu_unpack_level(context, ptr::null_mut(), 0, 0, 0),
                CrnuErrorCode::NullOutputPointer
            );
            assert_eq!(
                crnu_unpack_level(ptr::null(), dst.as_mut_ptr(), dst.len(), 0, 0),
                CrnuErrorCode::NullContextPointer
            );

            crnu_unpack_end(context);
        }
    }

    #[test]
    fn test_begin_rejects_bad_input() {
        let data = [0u8; 16];
        unsafe {
            assert!(crnu_unpack_begin(ptr::null(), 0).is_null());
            assert!(crnu_unpack_begin(data.as_ptr(), data.len()).is_null());
            assert_eq!(
                crnu_unpack_end(ptr::null_mut()),
                CrnuErrorCode::NullContextPointer
            );
        }
    }
}
