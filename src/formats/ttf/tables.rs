//! Table dispatch by tag.

use strum::{Display, EnumIter, EnumString};

use crate::{
    diagnostics::DiagnosticCategory,
    field::{Field, FieldSetType, Grammar},
    Result,
};

use super::{cmap, dsig, gsub, head, metrics, name, variations};

/// Tags of the tables with a dedicated grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum TableTag {
    /// Digital signature
    #[strum(serialize = "DSIG")]
    Dsig,
    /// Glyph substitutions
    #[strum(serialize = "GSUB")]
    Gsub,
    /// Axis variations
    #[strum(serialize = "avar")]
    Avar,
    /// Character to glyph mapping
    #[strum(serialize = "cmap")]
    Cmap,
    /// Font variations
    #[strum(serialize = "fvar")]
    Fvar,
    /// Font header
    #[strum(serialize = "head")]
    Head,
    /// Horizontal header
    #[strum(serialize = "hhea")]
    Hhea,
    /// Maximum profile
    #[strum(serialize = "maxp")]
    Maxp,
    /// Naming table
    #[strum(serialize = "name")]
    Name,
    /// OS/2 and Windows metrics
    #[strum(serialize = "OS/2")]
    Os2,
    /// PostScript information
    #[strum(serialize = "post")]
    Post,
}

impl TableTag {
    /// Human readable name of the table
    pub fn long_name(self) -> &'static str {
        match self {
            TableTag::Dsig => "Digital Signature",
            TableTag::Gsub => "Glyph Substitutions",
            TableTag::Avar => "Axis variation table",
            TableTag::Cmap => "Character to Glyph Index Mapping",
            TableTag::Fvar => "Font variations table",
            TableTag::Head => "Font header",
            TableTag::Hhea => "Horizontal Header",
            TableTag::Maxp => "Maximum Profile",
            TableTag::Name => "Names",
            TableTag::Os2 => "OS/2 and Windows Metrics",
            TableTag::Post => "PostScript",
        }
    }
}

/// A table of a known tag, sized by its directory entry.
#[derive(Debug, Clone)]
pub struct Table {
    tag: TableTag,
    header: String,
}

impl Table {
    /// A table of `tag` described by the directory entry at path `header`
    pub fn new(tag: TableTag, header: String) -> Self {
        Table { tag, header }
    }

    /// Tag of the table
    pub fn tag(&self) -> TableTag {
        self.tag
    }
}

impl FieldSetType for Table {
    fn create_fields(&self) -> Box<dyn Grammar> {
        match self.tag {
            TableTag::Dsig => dsig::fields(),
            TableTag::Gsub => gsub::fields(),
            TableTag::Avar => variations::avar(),
            TableTag::Cmap => cmap::fields(),
            TableTag::Fvar => variations::fvar(),
            TableTag::Head => head::fields(),
            TableTag::Hhea => metrics::hhea(),
            TableTag::Maxp => metrics::maxp(),
            TableTag::Name => name::fields(),
            TableTag::Os2 => metrics::os2(),
            TableTag::Post => metrics::post(),
        }
    }

    fn create_description(&self, _set: Field<'_>) -> Result<String> {
        Ok(format!("Table {} ({})", self.tag, self.header))
    }

    fn create_display(&self, _set: Field<'_>) -> Result<String> {
        Ok(format!("{} ({})", self.tag, self.tag.long_name()))
    }

    fn type_name(&self) -> &'static str {
        "Table"
    }
}

/// Sum of the big endian words of `data`, the last one zero padded. The `head` table is summed
/// with its `checkSumAdjustment` word taken as zero.
pub fn checksum(tag: &str, data: &[u8]) -> u32 {
    data.chunks(4)
        .enumerate()
        .filter(|(index, _)| !(tag == "head" && *index == 2))
        .fold(0u32, |sum, (_, chunk)| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            sum.wrapping_add(u32::from_be_bytes(word))
        })
}

/// Compare the checksum of `table` with the one stored in its directory entry
pub(super) fn verify_checksum(table: Field<'_>, tag: &str, stored: u64) {
    match table.bytes() {
        Ok(data) => {
            let computed = checksum(tag, &data);
            if u64::from(computed) != stored {
                table.warning(
                    DiagnosticCategory::Checksum,
                    format!("Checksum mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}"),
                );
            }
        }
        Err(error) => table.warning(
            DiagnosticCategory::Checksum,
            format!("Unable to compute checksum: {error}"),
        ),
    }
}
