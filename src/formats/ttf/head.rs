//! `head`: global font information.

use crate::field::{sequence, FieldType, Grammar};

use super::DIRECTION_NAME;

const MAGIC: &[u8] = &[0x5F, 0x0F, 0x3C, 0xF5];

const OFFSET_FORMAT: &[(i64, &str)] = &[(0, "short offsets"), (1, "long")];

pub(super) fn fields() -> Box<dyn Grammar> {
    sequence(|set| {
        set.add_described("maj_ver", FieldType::UInt16, "Major version")?;
        set.add_described("min_ver", FieldType::UInt16, "Minor version")?;
        set.add_described("font_maj_ver", FieldType::UInt16, "Font major version")?;
        set.add_described("font_min_ver", FieldType::UInt16, "Font minor version")?;
        set.add("checksum", FieldType::hex(FieldType::UInt32))?;
        let magic = set.add_described(
            "magic",
            FieldType::Bytes(4),
            r"Magic string (\x5F\x0F\x3C\xF5)",
        )?;
        if magic.value().as_bytes() != Some(MAGIC) {
            return Err(malformed_error!("Invalid magic of font header"));
        }

        // Flags, bit 15 first
        set.add_described("adobe", FieldType::Bits(2), "(used by Adobe)")?;
        set.add_described("cleartype", FieldType::Bit, "Optimised for ClearType")?;
        set.add_described(
            "converted",
            FieldType::Bit,
            "Font converted (produce compatible metrics)",
        )?;
        set.add_described(
            "lossless",
            FieldType::Bit,
            "Data is lossless (Agfa MicroType compression)",
        )?;
        set.add_described(
            "indic",
            FieldType::Bit,
            "Contains Indic-style rearrangement effects?",
        )?;
        set.add_described(
            "strong",
            FieldType::Bit,
            "Contains strong right-to-left glyphs?",
        )?;
        set.add_described("gx", FieldType::Bit, "Metamorphosis effects?")?;
        set.add_described(
            "linguistic",
            FieldType::Bit,
            "Requires layout for correct linguistic rendering?",
        )?;
        set.add("reserved[]", FieldType::padding_bits(1))?;
        set.add_described("vertical", FieldType::Bit, "Laid out vertically?")?;
        set.add_described(
            "instr_width",
            FieldType::Bit,
            "Instructions may alter advance width",
        )?;
        set.add_described(
            "ppem",
            FieldType::Bit,
            "Force PPEM to integer values for all",
        )?;
        set.add_described(
            "instr_point",
            FieldType::Bit,
            "Instructions may depend on point size",
        )?;
        set.add_described("x0", FieldType::Bit, "Left sidebearing point at x=0")?;
        set.add_described("y0", FieldType::Bit, "Baseline at y=0")?;

        let units = set.add_described("unit_per_em", FieldType::UInt16, "Units per em")?;
        let units = units.value().as_u64().unwrap_or_default();
        if !(16..=16384).contains(&units) {
            return Err(malformed_error!("Invalid unit/em value ({})", units));
        }

        set.add("created_high", FieldType::UInt32)?;
        set.add("created", FieldType::TimestampMac32)?;
        set.add("modified_high", FieldType::UInt32)?;
        set.add("modified", FieldType::TimestampMac32)?;
        set.add("xmin", FieldType::Int16)?;
        set.add("ymin", FieldType::Int16)?;
        set.add("xmax", FieldType::Int16)?;
        set.add("ymax", FieldType::Int16)?;

        // Mac style, bit 15 first
        set.add("reserved[]", FieldType::padding_bits(9))?;
        set.add("expanded", FieldType::Bit)?;
        set.add_described("condensed", FieldType::Bit, "(narrow)")?;
        set.add("shadow", FieldType::Bit)?;
        set.add("outline", FieldType::Bit)?;
        set.add("underline", FieldType::Bit)?;
        set.add("italic", FieldType::Bit)?;
        set.add("bold", FieldType::Bit)?;

        set.add_described(
            "lowest",
            FieldType::UInt16,
            "Smallest readable size in pixels",
        )?;
        set.add_described(
            "font_dir",
            FieldType::enumeration(FieldType::Int16, DIRECTION_NAME),
            "Font direction hint",
        )?;
        set.add(
            "ofst_format",
            FieldType::enumeration(FieldType::UInt16, OFFSET_FORMAT),
        )?;
        set.add_described("glyph_format", FieldType::UInt16, "(=0)")?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        diagnostics::DiagnosticCategory,
        field::Value,
        test::fonts::{head_table, FontBuilder},
        Parser, ParserConfig,
    };

    fn font(head: Vec<u8>) -> Parser {
        let mut builder = FontBuilder::minimal();
        builder.tables[0].1 = head;
        Parser::from_mem(builder.build(), ParserConfig::default()).unwrap()
    }

    #[test]
    fn font_header() {
        let parser = font(head_table());
        let head = parser.get_field("/table[0]").unwrap();
        assert_eq!(head.display(), "head (Font header)");

        let flag = |name: &str| head.get(name).unwrap().value().as_bool().unwrap();
        assert!(flag("y0"));
        assert!(flag("x0"));
        assert!(!flag("instr_point"));
        assert!(flag("ppem"));
        assert!(flag("bold"));
        assert!(flag("italic"));
        assert!(!flag("underline"));

        assert_eq!(head.get("unit_per_em").unwrap().value(), &Value::UInt(2048));
        assert_eq!(head.get("created").unwrap().display(), "2020-01-01 00:00:00");
        assert_eq!(head.get("modified").unwrap().display(), "2021-06-15 12:30:00");
        assert_eq!(head.get("xmin").unwrap().value(), &Value::Int(-100));
        assert_eq!(head.get("font_dir").unwrap().display(), "Left to right + neutrals");
        assert_eq!(head.get("ofst_format").unwrap().display(), "short offsets");
        assert_eq!(head.get("glyph_format").unwrap().address(), 52 * 8);
        assert_eq!(head.len(), 42);
        assert!(!parser.diagnostics().has_warnings());
    }

    #[test]
    fn bad_magic_stops_the_table() {
        let mut data = head_table();
        data[12] = 0;
        let parser = font(data);
        let head = parser.get_field("/table[0]").unwrap();

        assert_eq!(head.len(), 7);
        assert!(head.contains("magic"));
        assert!(!head.contains("adobe"));
        let raw = head.get("raw[0]").unwrap();
        assert_eq!(raw.address(), 16 * 8);
        assert_eq!(raw.size(), (54 - 16) * 8);

        let errors = parser.diagnostics().by_category(DiagnosticCategory::Grammar);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Invalid magic of font header"));
    }

    #[test]
    fn units_per_em_range() {
        let mut data = head_table();
        data[18] = 0;
        data[19] = 8;
        let parser = font(data);
        let head = parser.get_field("/table[0]").unwrap();
        assert!(!head.contains("created"));
        assert!(head.contains("raw[0]"));
    }
}
