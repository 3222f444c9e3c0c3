//! C API error codes.

use crate::error::{CrnError, FormatError};
use core::ffi::c_char;

/// C-compatible error codes for CRN operations.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrnuErrorCode {
    /// Operation succeeded
    Success = 0,
    /// Null pointer provided for the file data
    NullDataPointer = 1,
    /// Null pointer provided for an output parameter
    NullOutputPointer = 2,
    /// Null pointer provided for the unpack context
    NullContextPointer = 3,
    /// The file is shorter than a region it declares
    TruncatedData = 4,
    /// The file is malformed
    InvalidData = 5,
    /// The header or data checksum does not match
    ChecksumMismatch = 6,
    /// The format cannot be unpacked
    UnsupportedFormat = 7,
    /// The requested level does not exist
    LevelOutOfRange = 8,
    /// Output buffer too small for the level
    OutputBufferTooSmall = 9,
    /// Row pitch cannot hold a row of blocks
    RowPitchTooSmall = 10,
    /// Number of face buffers does not match the texture
    FaceCountMismatch = 11,
}

impl From<CrnError> for CrnuErrorCode {
    fn from(error: CrnError) -> Self {
        match error {
            CrnError::TruncatedData { .. } => Self::TruncatedData,
            CrnError::Format(
                FormatError::HeaderChecksumMismatch { .. } | FormatError::DataChecksumMismatch { .. },
            ) => Self::ChecksumMismatch,
            CrnError::Format(FormatError::UnsupportedUnpackFormat(_)) => Self::UnsupportedFormat,
            CrnError::Format(_) => Self::InvalidData,
            CrnError::LevelOutOfRange { .. } => Self::LevelOutOfRange,
            CrnError::OutputBufferTooSmall { .. } => Self::OutputBufferTooSmall,
            CrnError::RowPitchTooSmall { .. } => Self::RowPitchTooSmall,
            CrnError::FaceCountMismatch { .. } => Self::FaceCountMismatch,
        }
    }
}

impl<T> From<Result<T, CrnError>> for CrnuErrorCode {
    fn from(result: Result<T, CrnError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => e.into(),
        }
    }
}

/// Get a null-terminated string description of the error code.
///
/// The returned string is a static string literal that does not need to be freed.
///
/// # Safety
/// This function is safe to call with any error code value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn crnu_error_message(error_code: CrnuErrorCode) -> *const c_char {
    let message = match error_code {
        CrnuErrorCode::Success => c"Success",
        CrnuErrorCode::NullDataPointer => c"Null pointer provided for data parameter",
        CrnuErrorCode::NullOutputPointer => c"Null pointer provided for output parameter",
        CrnuErrorCode::NullContextPointer => c"Null pointer provided for context parameter",
        CrnuErrorCode::TruncatedData => c"File is shorter than a region it declares",
        CrnuErrorCode::InvalidData => c"Malformed CRN data",
        CrnuErrorCode::ChecksumMismatch => c"CRN checksum mismatch",
        CrnuErrorCode::UnsupportedFormat => c"Texture format cannot be unpacked",
        CrnuErrorCode::LevelOutOfRange => c"Level index is out of range",
        CrnuErrorCode::OutputBufferTooSmall => c"Output buffer too small for the level",
        CrnuErrorCode::RowPitchTooSmall => c"Row pitch too small for a row of blocks",
        CrnuErrorCode::FaceCountMismatch => c"Face buffer count does not match the texture",
    };
    message.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CrnFormat;
    use core::ffi::CStr;

    fn message(code: CrnuErrorCode) -> &'static str {
        unsafe { CStr::from_ptr(crnu_error_message(code)).to_str().unwrap() }
    }

    #[test]
    fn test_crnu_error_message_success() {
        assert_eq!(message(CrnuErrorCode::Success), "Success");
        assert_eq!(CrnuErrorCode::Success as u32, 0);
    }

    #[test]
    fn test_crnu_error_message_output_buffer_too_small() {
        assert_eq!(
            message(CrnuErrorCode::OutputBufferTooSmall),
            "Output buffer too small for the level"
        );
    }

    #[test]
    fn test_error_conversion() {
        assert_eq!(
            CrnuErrorCode::from(CrnError::LevelOutOfRange {
                index: 3,
                levels: 1
            }),
            CrnuErrorCode::LevelOutOfRange
        );
        assert_eq!(
            CrnuErrorCode::from(CrnError::from(FormatError::UnsupportedUnpackFormat(
                CrnFormat::Dxt3
            ))),
            CrnuErrorCode::UnsupportedFormat
        );
        assert_eq!(
            CrnuErrorCode::from(CrnError::from(FormatError::DataChecksumMismatch {
                stored: 1,
                computed: 2
            })),
            CrnuErrorCode::ChecksumMismatch
        );
        assert_eq!(
            CrnuErrorCode::from(CrnError::from(FormatError::StreamExhausted)),
            CrnuErrorCode::InvalidData
        );
        assert_eq!(
            CrnuErrorCode::from(Ok::<(), CrnError>(())),
            CrnuErrorCode::Success
        );
    }
}
