//! `name`: the naming table.
//!
//! A header lists `count` name records, each pointing at a string in the storage area that
//! follows. Strings are visited in offset order; a record repeating the `(offset, length)` of
//! its predecessor or pointing into an already read string is skipped with a warning.

use std::collections::VecDeque;

use crate::{
    diagnostics::DiagnosticCategory,
    field::{sequence, Charset, Field, FieldSetType, FieldType, Grammar, SetBuilder, Step},
    Result,
};

use super::{charset, MAX_NAME_COUNT, NAMEID_NAME, PLATFORM_NAME};

/// One name record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameHeader;

impl FieldSetType for NameHeader {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add(
                "platformID",
                FieldType::enumeration(FieldType::UInt16, PLATFORM_NAME),
            )?;
            set.add("encodingID", FieldType::UInt16)?;
            set.add("languageID", FieldType::UInt16)?;
            set.add(
                "nameID",
                FieldType::enumeration(FieldType::UInt16, NAMEID_NAME),
            )?;
            set.add("length", FieldType::UInt16)?;
            set.add("offset", FieldType::UInt16)?;
            Ok(())
        })
    }

    fn create_description(&self, set: Field<'_>) -> Result<String> {
        Ok(format!(
            "Name record: {} ({})",
            set.get("nameID")?.display(),
            set.get("platformID")?.display()
        ))
    }

    fn static_size(&self) -> Option<u64> {
        Some(96)
    }

    fn type_name(&self) -> &'static str {
        "NameHeader"
    }
}

/// The charset of the strings of `header`, ISO-8859-1 with a warning when unknown
fn header_charset(header: Field<'_>) -> Result<Charset> {
    let platform = header.get("platformID")?.value().as_u64().unwrap_or_default();
    let encoding = header.get("encodingID")?.value().as_u64().unwrap_or_default();
    Ok(charset(platform, encoding).unwrap_or_else(|| {
        header.warning(
            DiagnosticCategory::Charset,
            format!("Unknown charset ({platform},{encoding})"),
        );
        Charset::Iso8859_1
    }))
}

#[derive(Debug)]
struct NameRecord {
    name: String,
    offset: u64,
    length: u64,
    charset: Charset,
    description: String,
}

enum NameState {
    Header,
    Records { next: u64, count: u64 },
    Values {
        records: VecDeque<NameRecord>,
        last: Option<(u64, u64)>,
    },
    Tail,
}

struct NameGrammar {
    state: NameState,
}

impl NameGrammar {
    fn records(set: &SetBuilder<'_>, count: u64) -> Result<VecDeque<NameRecord>> {
        let mut records = Vec::new();
        for index in 0..count {
            let header = set.get(&format!("header[{index}]"))?;
            records.push(NameRecord {
                name: header.name().to_string(),
                offset: header.get("offset")?.value().as_u64().unwrap_or_default(),
                length: header.get("length")?.value().as_u64().unwrap_or_default(),
                charset: header_charset(header)?,
                description: header.description().to_string(),
            });
        }
        records.sort_by_key(|record| record.offset);
        Ok(records.into())
    }

    fn value(set: &mut SetBuilder<'_>, record: &NameRecord, storage: u64) {
        let offset = storage + record.offset;
        if offset.saturating_mul(8) < set.current_size() {
            set.warning(
                DiagnosticCategory::Offset,
                format!("Skip value {} (negative offset)", record.name),
            );
            return;
        }

        if let Err(error) = set.seek_byte(offset, true, true) {
            set.warning(
                DiagnosticCategory::Offset,
                format!("Skip value {} (offset {offset}): {error}", record.name),
            );
            return;
        }

        if record.length == 0 {
            return;
        }
        if let Err(error) = set.add_described(
            "value[]",
            FieldType::string(record.length, record.charset),
            record.description.clone(),
        ) {
            set.warning(
                DiagnosticCategory::Offset,
                format!("Skip value {} ({} bytes): {error}", record.name, record.length),
            );
        }
    }
}

impl Grammar for NameGrammar {
    fn step(&mut self, set: &mut SetBuilder<'_>) -> Result<Step> {
        match &mut self.state {
            NameState::Header => {
                let format = set.add("format", FieldType::UInt16)?;
                let format = format.value().as_u64().unwrap_or_default();
                if format != 0 {
                    return Err(malformed_error!("Invalid format ({})", format));
                }
                set.add("count", FieldType::UInt16)?;
                set.add("offset", FieldType::UInt16)?;

                let count = set.uint("count")?;
                if count > MAX_NAME_COUNT {
                    return Err(malformed_error!("Invalid number of names ({})", count));
                }
                self.state = NameState::Records { next: 0, count };
            }
            NameState::Records { next, count } => {
                if *next < *count {
                    set.add_set("header[]", NameHeader, None)?;
                    *next += 1;
                } else {
                    let count = *count;
                    self.state = NameState::Values {
                        records: NameGrammar::records(set, count)?,
                        last: None,
                    };
                }
            }
            NameState::Values { records, last } => match records.pop_front() {
                Some(record) => {
                    let key = (record.offset, record.length);
                    if *last == Some(key) {
                        set.warning(
                            DiagnosticCategory::Table,
                            format!(
                                "Skip duplicate {} ({}, {})",
                                record.name, record.offset, record.length
                            ),
                        );
                    } else {
                        *last = Some(key);
                        let storage = set.uint("offset")?;
                        NameGrammar::value(set, &record, storage);
                    }
                }
                None => self.state = NameState::Tail,
            },
            NameState::Tail => {
                let remaining = set.remaining_bits() / 8;
                if remaining > 0 {
                    set.add("padding_end", FieldType::null_bytes(remaining))?;
                }
                return Ok(Step::Done);
            }
        }
        Ok(Step::Continue)
    }
}

pub(super) fn fields() -> Box<dyn Grammar> {
    Box::new(NameGrammar {
        state: NameState::Header,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        diagnostics::DiagnosticCategory,
        test::fonts::{default_names, name_table, name_table_with, FontBuilder, NameEntry},
        Parser, ParserConfig,
    };

    fn parse(name: Vec<u8>) -> Parser {
        let mut builder = FontBuilder::minimal();
        builder.tables[3].1 = name;
        Parser::from_mem(builder.build(), ParserConfig::default()).unwrap()
    }

    fn entry(name_id: u16, offset: u16, length: u16) -> NameEntry {
        NameEntry {
            platform: 1,
            encoding: 0,
            language: 0,
            name_id,
            offset,
            length,
        }
    }

    #[test]
    fn names_in_their_charsets() {
        let parser = parse(name_table(&default_names()));
        let names = parser.get_field("/table[3]").unwrap();
        assert_eq!(names.display(), "name (Names)");
        assert_eq!(names.get("count").unwrap().value().as_u64(), Some(6));

        let header = names.get("header[1]").unwrap();
        assert_eq!(header.size(), 96);
        assert_eq!(header.description(), "Name record: Copyright notice (Microsoft)");

        let mac = names.get("value[0]").unwrap();
        assert_eq!(mac.value().as_str(), Some("Example Sans"));
        assert_eq!(mac.description(), "Name record: Font family name (Macintosh)");
        let url = names.get("value[5]").unwrap();
        assert_eq!(url.value().as_str(), Some("https://example.com"));
        assert_eq!(url.description(), "Name record: URL Vendor (Microsoft)");

        assert!(!names.contains("padding[0]"));
        assert!(!parser.diagnostics().has_warnings());
    }

    #[test]
    fn duplicate_records_are_read_once() {
        let storage = b"RegularBold";
        let parser = parse(name_table_with(
            &[entry(2, 0, 7), entry(4, 0, 7), entry(2, 7, 4)],
            storage,
        ));
        let names = parser.get_field("/table[3]").unwrap();

        assert_eq!(names.get("value[0]").unwrap().value().as_str(), Some("Regular"));
        assert_eq!(names.get("value[1]").unwrap().value().as_str(), Some("Bold"));
        assert!(!names.contains("value[2]"));

        let skipped = parser.diagnostics().by_category(DiagnosticCategory::Table);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].message, "Skip duplicate header[1] (0, 7)");
    }

    #[test]
    fn negative_offsets_are_skipped() {
        let storage = b"Example\0Sans";
        let parser = parse(name_table_with(
            &[entry(1, 0, 7), entry(4, 2, 5), entry(2, 8, 4)],
            storage,
        ));
        let names = parser.get_field("/table[3]").unwrap();

        assert_eq!(names.get("value[0]").unwrap().value().as_str(), Some("Example"));
        assert_eq!(names.get("value[1]").unwrap().value().as_str(), Some("Sans"));
        assert!(names.is_exhausted());

        let skipped = parser.diagnostics().by_category(DiagnosticCategory::Offset);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].message, "Skip value header[1] (negative offset)");
        assert_eq!(skipped[0].path.as_deref(), Some("/table[3]"));
    }

    #[test]
    fn unknown_charset_falls_back_to_latin1() {
        let mut record = entry(1, 0, 4);
        record.platform = 2;
        record.encoding = 7;
        let parser = parse(name_table_with(&[record], b"caf\xe9"));
        let names = parser.get_field("/table[3]").unwrap();

        assert_eq!(names.get("value[0]").unwrap().value().as_str(), Some("caf\u{e9}"));
        let charset = parser.diagnostics().by_category(DiagnosticCategory::Charset);
        assert_eq!(charset.len(), 1);
        assert_eq!(charset[0].message, "Unknown charset (2,7)");
        assert_eq!(charset[0].path.as_deref(), Some("/table[3]/header[0]"));
    }

    #[test]
    fn invalid_format_and_count() {
        let mut data = name_table(&default_names());
        data[1] = 1;
        let parser = parse(data);
        let names = parser.get_field("/table[3]").unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains("raw[0]"));

        let mut data = name_table(&default_names());
        data[2] = 0x01;
        data[3] = 0x2D;
        let parser = parse(data);
        let names = parser.get_field("/table[3]").unwrap();
        assert!(!names.contains("header[0]"));
        let errors = parser.diagnostics().by_category(DiagnosticCategory::Grammar);
        assert!(errors[0].message.contains("Invalid number of names (301)"));
    }
}
