//! Common test imports for avoiding duplicate imports in test modules

// External crates commonly used in tests
pub use rstest::rstest;

// Core functionality from this crate
pub use crate::error::{CrnError, FormatError};
pub use crate::format::CrnFormat;
pub use crate::header::max_levels;
pub use crate::{get_level_info, get_texture_info, unpack_begin, unpack_level};

// Synthetic file writer
pub use crate::fixtures::*;

// alloc types, since the crate is no_std without the `std` feature
pub use alloc::vec;
pub use alloc::vec::Vec;
