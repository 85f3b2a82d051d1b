//! Format registry.
//!
//! Every supported format implements [`Format`] and is listed in [`FormatId`]. Guessing the
//! format of an unknown stream walks the registry, trying formats whose extensions match the
//! file name first.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{
    field::{Field, FieldSetType},
    formats::ttf::TrueType,
    metadata::Metadata,
    stream::Endian,
};

/// Static description of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Registry identifier
    pub id: FormatId,
    /// Broad category, such as `misc` or `video`
    pub category: &'static str,
    /// File extensions, lower case and without the dot
    pub file_ext: &'static [&'static str],
    /// Smallest stream the format can describe, in bits
    pub min_size: u64,
    /// Human readable name
    pub description: &'static str,
}

/// A file format the parser can build a field tree for.
pub trait Format: Send + Sync {
    /// Static description of the format
    fn info(&self) -> &'static FormatInfo;

    /// Byte order of the integers in the format
    fn endian(&self) -> Endian;

    /// Type of the root field set
    fn root(&self) -> Box<dyn FieldSetType>;

    /// Decide whether the tree below `root` plausibly is this format.
    ///
    /// Only the first few fields should be inspected, so rejecting a foreign stream stays cheap.
    ///
    /// # Errors
    /// Returns the reason the stream was rejected.
    fn validate(&self, root: Field<'_>) -> std::result::Result<(), String>;

    /// Add what the tree tells about the document to `metadata`. Never fails; missing or damaged
    /// parts contribute nothing.
    fn extract_metadata(&self, _root: Field<'_>, _metadata: &mut Metadata) {}
}

static TRUETYPE: TrueType = TrueType;

/// Identifier of a registered format.
///
/// ```rust
/// use fieldscope::FormatId;
/// use std::str::FromStr;
///
/// assert_eq!(FormatId::from_str("ttf").unwrap(), FormatId::TrueType);
/// assert_eq!(FormatId::TrueType.to_string(), "ttf");
/// assert_eq!(FormatId::from_extension("TTF"), [FormatId::TrueType]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum FormatId {
    /// TrueType and OpenType fonts
    #[strum(serialize = "ttf")]
    TrueType,
}

impl FormatId {
    /// The implementation of this format
    pub fn format(self) -> &'static dyn Format {
        match self {
            FormatId::TrueType => &TRUETYPE,
        }
    }

    /// Static description of this format
    pub fn info(self) -> &'static FormatInfo {
        self.format().info()
    }

    /// Formats registered for the file extension `extension`, ignoring case
    pub fn from_extension(extension: &str) -> Vec<FormatId> {
        FormatId::iter()
            .filter(|id| {
                id.info()
                    .file_ext
                    .iter()
                    .any(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .collect()
    }

    /// Formats to try for a stream, those matching `extension` first
    pub fn candidates(extension: Option<&str>) -> Vec<FormatId> {
        let mut candidates = extension.map(FormatId::from_extension).unwrap_or_default();
        for id in FormatId::iter() {
            if !candidates.contains(&id) {
                candidates.push(id);
            }
        }
        candidates
    }
}
