//! Options controlling how an [`UnpackContext`](crate::UnpackContext) is created.

/// Settings used by [`UnpackContext::with_options`](crate::UnpackContext::with_options).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnpackOptions {
    /// Verify the header and data checksums before decoding anything.
    pub verify_checksums: bool,
}

/// Builder for [`UnpackOptions`].
#[derive(Debug, Clone, Copy)]
pub struct UnpackOptionsBuilder {
    verify_checksums: Option<bool>,
}

impl UnpackOptionsBuilder {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self {
            verify_checksums: None,
        }
    }

    /// Set whether the CRC-16 checksums of the header and data are verified.
    ///
    /// Off by default. Checking touches every byte of the file once, which is wasted work when
    /// the data is already known to be intact.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = Some(verify);
        self
    }

    /// Build the options using the configured values.
    pub fn build(self) -> UnpackOptions {
        UnpackOptions {
            verify_checksums: self.verify_checksums.unwrap_or(false),
        }
    }
}

impl Default for UnpackOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = UnpackOptionsBuilder::new().verify_checksums(true).build();
        assert!(options.verify_checksums);
    }

    #[test]
    fn test_options_builder_defaults() {
        let options = UnpackOptionsBuilder::new().build();
        assert_eq!(options, UnpackOptions::default());
        assert!(!options.verify_checksums);
    }
}
