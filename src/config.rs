//! Parser configuration
//!
//! Controls the root validation gate, the automatic repair of truncated field sets, optional
//! integrity checks and the truncation limits used when rendering values for display.

/// Configuration of a [`crate::Parser`]
///
/// None of the checks changes the shape of a well-formed tree. They decide whether a stream is
/// accepted at all ([`ParserConfig::validate`]), whether a field set that stopped early is padded
/// out to its declared size ([`ParserConfig::autofix`]) and which anomalies are reported to the
/// diagnostics sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ParserConfig {
    /// Run the format `validate()` gate when the parser is constructed
    pub validate: bool,

    /// Cover the unparsed remainder of a field set with a `raw[]` field when its grammar fails
    /// or ends short of the declared size
    pub autofix: bool,

    /// Verify that null padding really is zero and warn otherwise
    pub check_padding: bool,

    /// Verify stored checksums, where a format has them
    pub check_checksums: bool,

    /// Maximum number of characters of a string shown by `display` (default: 40)
    pub max_string_length: usize,

    /// Maximum number of bytes of a byte field shown by `display` (default: 14)
    pub max_byte_length: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            validate: true,
            autofix: true,
            check_padding: true,
            check_checksums: true,
            max_string_length: 40,
            max_byte_length: 14,
        }
    }
}

impl ParserConfig {
    /// Creates a configuration for fast sniffing
    ///
    /// Skips the validation gate and all integrity checks. Trees built with it can be walked
    /// like any other, but a stream of the wrong format is not rejected up front.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            validate: false,
            autofix: true,
            check_padding: false,
            check_checksums: false,
            ..Self::default()
        }
    }

    /// Creates a configuration with all checks enabled and no automatic repair
    ///
    /// Field sets whose grammar stops early keep their partial content, so the unparsed
    /// remainder is visible as a gap rather than a `raw[]` field.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            validate: true,
            autofix: false,
            check_padding: true,
            check_checksums: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_config_presets() {
        let default = ParserConfig::default();
        assert!(default.validate);
        assert!(default.autofix);
        assert!(default.check_padding);
        assert!(default.check_checksums);
        assert_eq!(default.max_string_length, 40);
        assert_eq!(default.max_byte_length, 14);

        let minimal = ParserConfig::minimal();
        assert!(!minimal.validate);
        assert!(minimal.autofix);
        assert!(!minimal.check_padding);
        assert!(!minimal.check_checksums);
        assert_eq!(minimal.max_string_length, 40);

        let strict = ParserConfig::strict();
        assert!(strict.validate);
        assert!(!strict.autofix);
        assert!(strict.check_padding);
        assert!(strict.check_checksums);
    }
}
