//! `cmap`: character to glyph index mapping.
//!
//! Encoding records point at subtables by offset; several records may share one subtable. The
//! format of a subtable is read from its first word and its length from the header that follows,
//! so subtables are placed with a declared size and parsed on demand.

use std::collections::VecDeque;

use crate::{
    diagnostics::DiagnosticCategory,
    field::{sequence, sort_by_offset, Field, FieldSetType, FieldType, Grammar, SetBuilder, Step},
    Result,
};

use super::PLATFORM_NAME;

/// One encoding record.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingRecord;

impl FieldSetType for EncodingRecord {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add(
                "platformID",
                FieldType::enumeration(FieldType::UInt16, PLATFORM_NAME),
            )?;
            set.add("encodingID", FieldType::UInt16)?;
            set.add("subtableOffset", FieldType::UInt32)?;
            Ok(())
        })
    }

    fn static_size(&self) -> Option<u64> {
        Some(64)
    }

    fn type_name(&self) -> &'static str {
        "EncodingRecord"
    }
}

/// A segment of consecutive character codes mapped to consecutive glyphs
#[derive(Debug, Clone, Copy, Default)]
struct SequentialMapGroup;

impl FieldSetType for SequentialMapGroup {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add_described(
                "startCharCode",
                FieldType::UInt32,
                "First character code in this group",
            )?;
            set.add_described(
                "endCharCode",
                FieldType::UInt32,
                "Last character code in this group",
            )?;
            set.add_described(
                "startGlyphID",
                FieldType::UInt32,
                "Glyph index corresponding to the starting character code",
            )?;
            Ok(())
        })
    }

    fn static_size(&self) -> Option<u64> {
        Some(96)
    }

    fn type_name(&self) -> &'static str {
        "SequentialMapGroup"
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct VariationSelector;

impl FieldSetType for VariationSelector {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add_described("varSelector", FieldType::UInt24, "Variation selector")?;
            set.add_described(
                "defaultUVSOffset",
                FieldType::UInt32,
                "Offset to default UVS table",
            )?;
            set.add_described(
                "nonDefaultUVSOffset",
                FieldType::UInt32,
                "Offset to non-default UVS table",
            )?;
            Ok(())
        })
    }

    fn static_size(&self) -> Option<u64> {
        Some(88)
    }

    fn type_name(&self) -> &'static str {
        "VariationSelector"
    }
}

/// A mapping subtable of one of the supported formats
#[derive(Debug, Clone, Copy)]
pub struct CmapSubtable {
    format: u64,
}

impl CmapSubtable {
    /// Bit offset and width of the length field of a subtable of `format`
    fn length_field(format: u64) -> Option<(u64, u32)> {
        match format {
            0 | 4 | 6 => Some((16, 16)),
            12 => Some((32, 32)),
            14 => Some((16, 32)),
            _ => None,
        }
    }
}

fn format_0(set: &mut SetBuilder<'_>) -> Result<()> {
    set.add_described("format", FieldType::UInt16, "Table format")?;
    set.add_described("length", FieldType::UInt16, "Length in bytes")?;
    set.add_described("language", FieldType::UInt16, "Language ID")?;
    set.add_vector("mapping", 256, FieldType::UInt8)?;
    Ok(())
}

fn format_4(set: &mut SetBuilder<'_>) -> Result<()> {
    set.add_described("format", FieldType::UInt16, "Table format")?;
    set.add_described("length", FieldType::UInt16, "Length in bytes")?;
    set.add_described("language", FieldType::UInt16, "Language ID")?;
    set.add_described(
        "segCountX2",
        FieldType::UInt16,
        "Twice the number of segments",
    )?;
    let segments = set.uint("segCountX2")? / 2;
    set.add("searchRange", FieldType::UInt16)?;
    set.add("entrySelector", FieldType::UInt16)?;
    set.add("rangeShift", FieldType::UInt16)?;
    set.add_vector("endCode", segments, FieldType::UInt16)?;
    set.add("reserved[]", FieldType::padding_bits(16))?;
    set.add_vector("startCode", segments, FieldType::UInt16)?;
    set.add_vector("idDelta", segments, FieldType::Int16)?;
    set.add_vector("idRangeOffsets", segments, FieldType::UInt16)?;

    let length = set.uint("length")?;
    let remainder = length.saturating_sub(set.current_size() / 8) / 2;
    if remainder > 0 {
        set.add_vector("glyphIdArray", remainder, FieldType::UInt16)?;
    }
    Ok(())
}

fn format_6(set: &mut SetBuilder<'_>) -> Result<()> {
    set.add_described("format", FieldType::UInt16, "Table format")?;
    set.add_described("length", FieldType::UInt16, "Length in bytes")?;
    set.add_described("language", FieldType::UInt16, "Language ID")?;
    set.add_described(
        "firstCode",
        FieldType::UInt16,
        "First character code of subrange",
    )?;
    set.add_described(
        "entryCount",
        FieldType::UInt16,
        "Number of character codes in subrange",
    )?;
    let count = set.uint("entryCount")?;
    set.add_vector("glyphIdArray", count, FieldType::UInt16)?;
    Ok(())
}

fn format_12(set: &mut SetBuilder<'_>) -> Result<()> {
    set.add_described("format", FieldType::UInt16, "Table format")?;
    set.add("reserved[]", FieldType::padding_bits(16))?;
    set.add_described("length", FieldType::UInt32, "Length in bytes")?;
    set.add_described("language", FieldType::UInt32, "Language ID")?;
    set.add_described(
        "numGroups",
        FieldType::UInt32,
        "Number of groupings which follow",
    )?;
    for _ in 0..set.uint("numGroups")? {
        set.add_set("mapgroup[]", SequentialMapGroup, None)?;
    }
    Ok(())
}

fn format_14(set: &mut SetBuilder<'_>) -> Result<()> {
    set.add_described("format", FieldType::UInt16, "Table format")?;
    set.add_described("length", FieldType::UInt32, "Length in bytes")?;
    set.add_described(
        "numVarSelectorRecords",
        FieldType::UInt32,
        "Number of variation selector records",
    )?;
    for _ in 0..set.uint("numVarSelectorRecords")? {
        set.add_set("variationSelector[]", VariationSelector, None)?;
    }
    Ok(())
}

impl FieldSetType for CmapSubtable {
    fn create_fields(&self) -> Box<dyn Grammar> {
        match self.format {
            0 => sequence(format_0),
            4 => sequence(format_4),
            6 => sequence(format_6),
            12 => sequence(format_12),
            _ => sequence(format_14),
        }
    }

    fn create_description(&self, _set: Field<'_>) -> Result<String> {
        Ok(format!("Character mapping subtable, format {}", self.format))
    }

    fn type_name(&self) -> &'static str {
        "CmapSubtable"
    }
}

enum CmapState {
    Header,
    Records { next: u64, count: u64 },
    Subtables(VecDeque<u64>),
}

struct CmapGrammar {
    state: CmapState,
}

impl CmapGrammar {
    fn offsets(set: &SetBuilder<'_>, count: u64) -> Result<VecDeque<u64>> {
        let offsets = (0..count)
            .map(|index| set.uint(&format!("encodingRecords[{index}]/subtableOffset")))
            .collect::<Result<Vec<_>>>()?;

        let (unique, duplicates) = sort_by_offset(offsets, |offset| *offset);
        for offset in duplicates {
            set.warning(
                DiagnosticCategory::Table,
                format!("Skip duplicate cmap subtable at offset {offset}"),
            );
        }
        Ok(unique.into())
    }

    fn subtable(set: &mut SetBuilder<'_>, offset: u64) -> Result<()> {
        if offset.saturating_mul(8) < set.current_size() {
            set.warning(
                DiagnosticCategory::Offset,
                format!("Skip cmap subtable at offset {offset} (overlaps previous data)"),
            );
            return Ok(());
        }

        set.seek_byte(offset, true, false)?;
        let format = set.peek_uint(16)?;
        let Some((position, width)) = CmapSubtable::length_field(format) else {
            set.warning(
                DiagnosticCategory::Table,
                format!("Unknown cmap subtable format {format} at offset {offset}"),
            );
            return Ok(());
        };

        let length = set.peek_uint_at(set.current_size() + position, width)?;
        set.add_set(
            &format!("cmap table format {format}"),
            CmapSubtable { format },
            Some(length.saturating_mul(8)),
        )?;
        Ok(())
    }
}

impl Grammar for CmapGrammar {
    fn step(&mut self, set: &mut SetBuilder<'_>) -> Result<Step> {
        match &mut self.state {
            CmapState::Header => {
                set.add("version", FieldType::UInt16)?;
                set.add_described("numTables", FieldType::UInt16, "Number of encoding tables")?;
                self.state = CmapState::Records {
                    next: 0,
                    count: set.uint("numTables")?,
                };
            }
            CmapState::Records { next, count } => {
                if *next < *count {
                    set.add_set("encodingRecords[]", EncodingRecord, None)?;
                    *next += 1;
                } else {
                    let count = *count;
                    self.state = CmapState::Subtables(CmapGrammar::offsets(set, count)?);
                }
            }
            CmapState::Subtables(offsets) => match offsets.pop_front() {
                Some(offset) => {
                    if let Err(error) = CmapGrammar::subtable(set, offset) {
                        set.warning(
                            DiagnosticCategory::Table,
                            format!("Unable to parse cmap subtable at offset {offset}: {error}"),
                        );
                    }
                }
                None => return Ok(Step::Done),
            },
        }
        Ok(Step::Continue)
    }
}

pub(super) fn fields() -> Box<dyn Grammar> {
    Box::new(CmapGrammar {
        state: CmapState::Header,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        diagnostics::DiagnosticCategory,
        field::Value,
        test::fonts::{cmap_table, FontBuilder, Writer},
        Parser, ParserConfig,
    };

    fn parse(cmap: Vec<u8>) -> Parser {
        let font = FontBuilder::minimal().table(b"cmap", cmap).build();
        Parser::from_mem(font, ParserConfig::default()).unwrap()
    }

    fn format_0() -> Vec<u8> {
        let mut table = Writer::default();
        table.u16(0).u16(262).u16(0);
        for code in 0..=255u8 {
            table.u8(code);
        }
        table.finish()
    }

    #[test]
    fn subtables_in_offset_order() {
        let parser = parse(cmap_table());
        let cmap = parser.get_field("/table[4]").unwrap();
        assert_eq!(cmap.display(), "cmap (Character to Glyph Index Mapping)");

        let names: Vec<_> = cmap.children().map(|f| f.name().to_string()).collect();
        assert_eq!(
            names,
            [
                "version",
                "numTables",
                "encodingRecords[0]",
                "encodingRecords[1]",
                "cmap table format 4",
                "cmap table format 0",
            ]
        );

        let record = cmap.get("encodingRecords[1]").unwrap();
        assert_eq!(record.get("platformID").unwrap().display(), "Microsoft");

        let format4 = cmap.get("cmap table format 4").unwrap();
        assert_eq!(format4.address(), 20 * 8);
        assert_eq!(format4.size(), 36 * 8);
        assert_eq!(format4.current_len(), 0);
        assert_eq!(
            format4.get("idDelta").unwrap().value(),
            &Value::List(vec![Value::Int(-0x40), Value::Int(1)])
        );
        assert_eq!(
            format4.get("glyphIdArray").unwrap().value(),
            &Value::List(vec![Value::UInt(7), Value::UInt(8)])
        );

        let mapping = parser
            .get_field("/table[4]/cmap table format 0/mapping")
            .unwrap();
        assert_eq!(mapping.get("item[65]").unwrap().value(), &Value::UInt(32));
        assert!(!parser.diagnostics().has_warnings());
    }

    #[test]
    fn shared_subtables_are_parsed_once() {
        let cmap = Writer::default()
            .u16(0)
            .u16(2)
            .u16(1)
            .u16(0)
            .u32(20)
            .u16(3)
            .u16(1)
            .u32(20)
            .bytes(&format_0())
            .finish();
        let parser = parse(cmap);
        let table = parser.get_field("/table[4]").unwrap();

        let subtables: Vec<_> = table
            .children()
            .filter(|f| f.name().starts_with("cmap table"))
            .collect();
        assert_eq!(subtables.len(), 1);
        assert_eq!(subtables[0].address(), 20 * 8);

        let warnings = parser.diagnostics().by_category(DiagnosticCategory::Table);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("offset 20"));
    }

    #[test]
    fn unknown_formats_are_skipped() {
        let cmap = Writer::default()
            .u16(0)
            .u16(1)
            .u16(3)
            .u16(1)
            .u32(12)
            .u16(2)
            .u16(6)
            .u16(0)
            .finish();
        let parser = parse(cmap);
        let table = parser.get_field("/table[4]").unwrap();

        assert_eq!(table.len(), 4);
        let raw = table.get("raw[0]").unwrap();
        assert_eq!(raw.address(), 12 * 8);
        assert_eq!(raw.size(), 6 * 8);
        let warnings = parser.diagnostics().by_category(DiagnosticCategory::Table);
        assert_eq!(warnings[0].message, "Unknown cmap subtable format 2 at offset 12");
    }
}
