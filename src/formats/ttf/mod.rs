//! TrueType and OpenType fonts.
//!
//! A font starts with an offset table: a version, the number of tables and one directory entry
//! per table giving its tag, checksum, offset and length. Tables may be stored in any order, so
//! the root grammar visits them sorted by offset, covering gaps with null padding.
//!
//! # Layout
//!
//! ```text
//! /maj_ver, /min_ver, /nb_table, ...      offset table
//! /table_hdr[0] ... /table_hdr[n-1]       directory entries (TableHeader)
//! /padding[k]                             gaps between tables
//! /table[0] ... /table[m]                 tables in offset order (Table)
//! ```
//!
//! Supported tables: `DSIG`, `GSUB`, `OS/2`, `avar`, `cmap`, `fvar`, `head`, `hhea`, `maxp`,
//! `name` and `post`. Other tables are kept as raw bytes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fieldscope::{Parser, ParserConfig};
//! use std::path::Path;
//!
//! let parser = Parser::from_file(Path::new("font.ttf"), ParserConfig::default())?;
//! let root = parser.root();
//! for index in 0..root.get("nb_table")?.value().as_u64().unwrap_or(0) {
//!     let header = root.get(&format!("table_hdr[{index}]"))?;
//!     println!("{}", header.description());
//! }
//! # Ok::<(), fieldscope::Error>(())
//! ```

mod cmap;
mod dsig;
mod gsub;
mod head;
mod metadata;
mod metrics;
mod name;
mod tables;
mod variations;

use std::{collections::VecDeque, str::FromStr};

use crate::{
    diagnostics::DiagnosticCategory,
    field::{
        sort_by_offset, sequence, Charset, Field, FieldSetType, FieldType, Grammar, SetBuilder,
        Step,
    },
    metadata::Metadata,
    parser::{Format, FormatId, FormatInfo},
    stream::Endian,
    Result,
};

pub use tables::{Table, TableTag};

/// Most name records accepted in a `name` table
pub const MAX_NAME_COUNT: u64 = 300;
/// Fewest tables of a plausible font
pub const MIN_NB_TABLE: u64 = 3;
/// Most tables of a plausible font
pub const MAX_NB_TABLE: u64 = 30;

/// `fontDirectionHint` of the `head` table
pub const DIRECTION_NAME: &[(i64, &str)] = &[
    (0, "Mixed directional"),
    (1, "Left to right"),
    (2, "Left to right + neutrals"),
    (-1, "Right to left"),
    (-2, "Right to left + neutrals"),
];

/// Name identifiers of the `name` table
pub const NAMEID_NAME: &[(i64, &str)] = &[
    (0, "Copyright notice"),
    (1, "Font family name"),
    (2, "Font subfamily name"),
    (3, "Unique font identifier"),
    (4, "Full font name"),
    (5, "Version string"),
    (6, "Postscript name"),
    (7, "Trademark"),
    (8, "Manufacturer name"),
    (9, "Designer"),
    (10, "Description"),
    (11, "URL Vendor"),
    (12, "URL Designer"),
    (13, "License Description"),
    (14, "License info URL"),
    (16, "Preferred Family"),
    (17, "Preferred Subfamily"),
    (18, "Compatible Full"),
    (19, "Sample text"),
    (20, "PostScript CID findfont name"),
];

/// Platform identifiers
pub const PLATFORM_NAME: &[(i64, &str)] = &[
    (0, "Unicode"),
    (1, "Macintosh"),
    (2, "ISO"),
    (3, "Microsoft"),
    (4, "Custom"),
];

/// Usage permissions of the `OS/2` embedding flags
pub const PERMISSIONS: &[(i64, &str)] = &[
    (0, "Installable embedding"),
    (2, "Restricted License embedding"),
    (4, "Preview & Print embedding"),
    (8, "Editable embedding"),
];

/// Charset of the strings of a name record, by platform and encoding
pub fn charset(platform: u64, encoding: u64) -> Option<Charset> {
    match (platform, encoding) {
        (0, 3) | (3, 1) => Some(Charset::Utf16Be),
        (1, 0) => Some(Charset::MacRoman),
        _ => None,
    }
}

static INFO: FormatInfo = FormatInfo {
    id: FormatId::TrueType,
    category: "misc",
    file_ext: &["ttf"],
    min_size: 10 * 8,
    description: "TrueType font",
};

/// The TrueType format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueType;

impl Format for TrueType {
    fn info(&self) -> &'static FormatInfo {
        &INFO
    }

    fn endian(&self) -> Endian {
        Endian::Big
    }

    fn root(&self) -> Box<dyn FieldSetType> {
        Box::new(TrueTypeFont)
    }

    fn validate(&self, root: Field<'_>) -> std::result::Result<(), String> {
        let value = |name: &str| -> std::result::Result<u64, String> {
            root.get(name)
                .map_err(|error| error.to_string())?
                .value()
                .as_u64()
                .ok_or_else(|| format!("Unable to read {name}"))
        };

        let (major, minor) = (value("maj_ver")?, value("min_ver")?);
        if !matches!((major, minor), (1, 0) | (0x4F54, 0x544F)) {
            return Err(format!("Invalid version ({major}.{minor})"));
        }

        let tables = value("nb_table")?;
        if !(MIN_NB_TABLE..=MAX_NB_TABLE).contains(&tables) {
            return Err(format!("Invalid number of table ({tables})"));
        }
        Ok(())
    }

    fn extract_metadata(&self, root: Field<'_>, metadata: &mut Metadata) {
        metadata::extract(root, metadata);
    }
}

/// One entry of the table directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableHeader;

impl FieldSetType for TableHeader {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add("tag", FieldType::tag())?;
            set.add("checksum", FieldType::hex(FieldType::UInt32))?;
            set.add("offset", FieldType::UInt32)?;
            set.add("size", FieldType::filesize(FieldType::UInt32))?;
            Ok(())
        })
    }

    fn create_description(&self, set: Field<'_>) -> Result<String> {
        Ok(format!(
            "Table entry: {} ({})",
            set.get("tag")?.display(),
            set.get("size")?.display()
        ))
    }

    fn static_size(&self) -> Option<u64> {
        Some(128)
    }

    fn type_name(&self) -> &'static str {
        "TableHeader"
    }
}

/// A directory entry, read back once all entries exist
#[derive(Debug, Clone)]
struct TableEntry {
    header: String,
    tag: String,
    offset: u64,
    size: u64,
    checksum: u64,
}

impl TableEntry {
    fn read(set: &SetBuilder<'_>, index: u64) -> Result<TableEntry> {
        let name = format!("table_hdr[{index}]");
        let header = set.get(&name)?;
        Ok(TableEntry {
            header: header.path(),
            tag: set.text(&format!("{name}/tag"))?,
            offset: set.uint(&format!("{name}/offset"))?,
            size: set.uint(&format!("{name}/size"))?,
            checksum: set.uint(&format!("{name}/checksum"))?,
        })
    }
}

enum RootState {
    Header,
    Directory { next: u64, count: u64 },
    Tables(VecDeque<TableEntry>),
    Tail,
}

struct RootGrammar {
    state: RootState,
}

impl RootGrammar {
    fn directory(&self, set: &SetBuilder<'_>, count: u64) -> Result<VecDeque<TableEntry>> {
        let entries = (0..count)
            .map(|index| TableEntry::read(set, index))
            .collect::<Result<Vec<_>>>()?;

        let (unique, duplicates) = sort_by_offset(entries, |entry| entry.offset);
        for entry in duplicates {
            set.warning(
                DiagnosticCategory::Table,
                format!(
                    "Skip table {} ({}): offset {} is used by another table",
                    entry.tag, entry.header, entry.offset
                ),
            );
        }
        Ok(unique.into())
    }

    fn table(set: &mut SetBuilder<'_>, entry: &TableEntry) {
        if entry.size == 0 {
            return;
        }

        if entry.offset.saturating_mul(8) < set.current_size() {
            set.warning(
                DiagnosticCategory::Offset,
                format!(
                    "Skip table {} ({}): offset {} overlaps previous data",
                    entry.tag, entry.header, entry.offset
                ),
            );
            return;
        }

        if let Err(error) = set.seek_byte(entry.offset, true, true) {
            set.warning(
                DiagnosticCategory::Table,
                format!(
                    "Unable to reach table {} at offset {}: {error}",
                    entry.tag, entry.offset
                ),
            );
            return;
        }

        let added = match TableTag::from_str(&entry.tag) {
            Ok(tag) => set.add_set(
                "table[]",
                Table::new(tag, entry.header.clone()),
                Some(entry.size.saturating_mul(8)),
            ),
            Err(_) => set
                .add_described(
                    "table[]",
                    FieldType::RawBytes(entry.size),
                    format!("Table {} ({})", entry.tag, entry.header),
                )
                .inspect(|table| {
                    table.warning(
                        DiagnosticCategory::Table,
                        format!("Unknown table {}, kept as raw bytes", entry.tag),
                    );
                }),
        };

        match added {
            Ok(table) => {
                if set.config().check_checksums {
                    tables::verify_checksum(table, &entry.tag, entry.checksum);
                }
            }
            Err(error) => set.warning(
                DiagnosticCategory::Table,
                format!("Unable to add table {} ({}): {error}", entry.tag, entry.header),
            ),
        }
    }
}

impl Grammar for RootGrammar {
    fn step(&mut self, set: &mut SetBuilder<'_>) -> Result<Step> {
        match &mut self.state {
            RootState::Header => {
                set.add_described("maj_ver", FieldType::UInt16, "Major version")?;
                set.add_described("min_ver", FieldType::UInt16, "Minor version")?;
                set.add("nb_table", FieldType::UInt16)?;
                set.add("search_range", FieldType::UInt16)?;
                set.add("entry_selector", FieldType::UInt16)?;
                set.add("range_shift", FieldType::UInt16)?;
                self.state = RootState::Directory {
                    next: 0,
                    count: set.uint("nb_table")?,
                };
            }
            RootState::Directory { next, count } => {
                if *next < *count {
                    set.add_set("table_hdr[]", TableHeader, None)?;
                    *next += 1;
                } else {
                    let count = *count;
                    self.state = RootState::Tables(self.directory(set, count)?);
                }
            }
            RootState::Tables(entries) => match entries.pop_front() {
                Some(entry) => RootGrammar::table(set, &entry),
                None => self.state = RootState::Tail,
            },
            RootState::Tail => {
                if let Some(size) = set.size() {
                    set.seek_bit(size, true)?;
                }
                return Ok(Step::Done);
            }
        }
        Ok(Step::Continue)
    }
}

/// Root field set of a font.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueTypeFont;

impl FieldSetType for TrueTypeFont {
    fn create_fields(&self) -> Box<dyn Grammar> {
        Box::new(RootGrammar {
            state: RootState::Header,
        })
    }

    fn create_description(&self, _set: Field<'_>) -> Result<String> {
        Ok(INFO.description.to_string())
    }

    fn type_name(&self) -> &'static str {
        "TrueTypeFontFile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test::fonts::{head_table, FontBuilder},
        Error, Parser, ParserConfig,
    };

    #[test]
    fn offset_table() {
        let parser = Parser::from_mem(FontBuilder::minimal().build(), ParserConfig::default())
            .unwrap();
        let root = parser.root();
        assert_eq!(root.get("maj_ver").unwrap().value().as_u64(), Some(1));
        assert_eq!(root.get("maj_ver").unwrap().description(), "Major version");
        assert_eq!(root.get("nb_table").unwrap().value().as_u64(), Some(4));
        assert_eq!(root.get("search_range").unwrap().value().as_u64(), Some(64));

        let header = root.get("table_hdr[0]").unwrap();
        assert_eq!(header.address(), 96);
        assert_eq!(header.size(), 128);
        assert_eq!(header.get("tag").unwrap().display(), "\"head\"");
        assert_eq!(header.description(), "Table entry: \"head\" (54 bytes)");
        assert_eq!(header.type_name(), "TableHeader");
    }

    #[test]
    fn validation() {
        let otto = FontBuilder::minimal().version(0x4F54, 0x544F).build();
        assert!(Parser::from_mem(otto, ParserConfig::default()).is_ok());

        let parse = |data: Vec<u8>| {
            let stream = crate::stream::BitStream::from_mem(data).unwrap();
            Parser::new(stream, FormatId::TrueType, ParserConfig::default())
        };

        let bad_version = FontBuilder::minimal().version(2, 0).build();
        assert!(matches!(
            parse(bad_version),
            Err(Error::Validation(reason)) if reason == "Invalid version (2.0)"
        ));

        let two_tables = FontBuilder::default()
            .table(b"head", head_table())
            .table(b"hhea", crate::test::fonts::hhea_table())
            .build();
        assert!(matches!(
            parse(two_tables),
            Err(Error::Validation(reason)) if reason == "Invalid number of table (2)"
        ));
    }

    #[test]
    fn tables_in_offset_order() {
        let parser = Parser::from_mem(
            FontBuilder::minimal().reversed().build(),
            ParserConfig::default(),
        )
        .unwrap();
        let root = parser.root();

        let tables: Vec<_> = root
            .children()
            .filter(|field| field.name().starts_with("table["))
            .collect();
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[0].display(), "name (Names)");
        assert_eq!(tables[3].display(), "head (Font header)");
        assert_eq!(tables[3].description(), "Table head (/table_hdr[0])");

        for pair in tables.windows(2) {
            assert!(pair[0].address() + pair[0].size() <= pair[1].address());
        }
        assert!(!parser.diagnostics().has_warnings());
    }
}
