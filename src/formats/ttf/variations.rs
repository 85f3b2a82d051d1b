//! Font variations: `avar` and `fvar`.

use crate::{
    field::{sequence, F2Dot14, Field, FieldSetType, FieldType, Fixed, Grammar, Tuple},
    Result,
};

/// One normalized coordinate mapping of an axis
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisValueMap;

impl FieldSetType for AxisValueMap {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add_set("fromCoordinate", F2Dot14, None)?;
            set.add_set("toCoordinate", F2Dot14, None)?;
            Ok(())
        })
    }

    fn create_description(&self, set: Field<'_>) -> Result<String> {
        Ok(format!(
            "{} -> {}",
            set.get("fromCoordinate")?.display(),
            set.get("toCoordinate")?.display()
        ))
    }

    fn static_size(&self) -> Option<u64> {
        Some(32)
    }

    fn type_name(&self) -> &'static str {
        "AxisValueMap"
    }
}

/// The coordinate mappings of one axis
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentMaps;

impl FieldSetType for SegmentMaps {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add_described(
                "positionMapCount",
                FieldType::UInt16,
                "The number of correspondence pairs for this axis",
            )?;
            for _ in 0..set.uint("positionMapCount")? {
                set.add_set("axisValueMaps[]", AxisValueMap, None)?;
            }
            Ok(())
        })
    }

    fn type_name(&self) -> &'static str {
        "SegmentMaps"
    }
}

pub(super) fn avar() -> Box<dyn Grammar> {
    sequence(|set| {
        set.add_described("majorVersion", FieldType::UInt16, "Major version")?;
        set.add_described("minorVersion", FieldType::UInt16, "Minor version")?;
        set.add("reserved[]", FieldType::padding_bits(16))?;
        set.add_described(
            "axisCount",
            FieldType::UInt16,
            "The number of variation axes for this font",
        )?;
        for _ in 0..set.uint("axisCount")? {
            set.add_set("segmentMaps[]", SegmentMaps, None)?;
        }
        Ok(())
    })
}

/// Range and name of one design axis
#[derive(Debug, Clone, Copy, Default)]
pub struct VariationAxisRecord;

impl FieldSetType for VariationAxisRecord {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add_described(
                "axisTag",
                FieldType::tag(),
                "Tag identifying the design variation for the axis",
            )?;
            set.add_set_described(
                "minValue",
                Fixed,
                None,
                "The minimum coordinate value for the axis",
            )?;
            set.add_set_described(
                "defaultValue",
                Fixed,
                None,
                "The default coordinate value for the axis",
            )?;
            set.add_set_described(
                "maxValue",
                Fixed,
                None,
                "The maximum coordinate value for the axis",
            )?;
            set.add("reservedFlags", FieldType::padding_bits(15))?;
            set.add_described(
                "hidden",
                FieldType::Bit,
                "The axis should not be exposed directly in user interfaces",
            )?;
            set.add_described(
                "axisNameID",
                FieldType::UInt16,
                "The name ID for entries in the 'name' table that provide a display name for \
                 this axis",
            )?;
            Ok(())
        })
    }

    fn static_size(&self) -> Option<u64> {
        Some(160)
    }

    fn type_name(&self) -> &'static str {
        "VariationAxisRecord"
    }
}

/// A named instance: a point in the design space
#[derive(Debug, Clone, Copy)]
pub struct InstanceRecord {
    axis_count: u64,
    has_postscript_name: bool,
}

impl FieldSetType for InstanceRecord {
    fn create_fields(&self) -> Box<dyn Grammar> {
        let Self {
            axis_count,
            has_postscript_name,
        } = *self;
        sequence(move |set| {
            set.add_described(
                "subfamilyNameID",
                FieldType::UInt16,
                "Name ID for subfamily names for this instance",
            )?;
            set.add("reservedFlags", FieldType::padding_bits(16))?;
            set.add_set("coordinates", Tuple { axis_count }, None)?;
            if has_postscript_name {
                set.add_described(
                    "postScriptNameID",
                    FieldType::UInt16,
                    "Name ID for PostScript names for this instance",
                )?;
            }
            Ok(())
        })
    }

    fn create_description(&self, _set: Field<'_>) -> Result<String> {
        Ok("Instance record".to_string())
    }

    fn static_size(&self) -> Option<u64> {
        let size = self.axis_count.checked_mul(32)?.checked_add(32)?;
        if self.has_postscript_name {
            size.checked_add(16)
        } else {
            Some(size)
        }
    }

    fn type_name(&self) -> &'static str {
        "InstanceRecord"
    }
}

pub(super) fn fvar() -> Box<dyn Grammar> {
    sequence(|set| {
        set.add_described("majorVersion", FieldType::UInt16, "Major version")?;
        set.add_described("minorVersion", FieldType::UInt16, "Minor version")?;
        set.add_described(
            "axisArrayOffset",
            FieldType::UInt16,
            "Offset to the start of the VariationAxisRecord array.",
        )?;
        set.add("reserved[]", FieldType::padding_bits(16))?;
        set.add_described(
            "axisCount",
            FieldType::UInt16,
            "The number of variation axes for this font",
        )?;
        set.add_described(
            "axisSize",
            FieldType::UInt16,
            "The size in bytes of each VariationAxisRecord",
        )?;
        set.add_described(
            "instanceCount",
            FieldType::UInt16,
            "The number of named instances for this font",
        )?;
        set.add_described(
            "instanceSize",
            FieldType::UInt16,
            "The size in bytes of each InstanceRecord",
        )?;

        let axis_offset = set.uint("axisArrayOffset")?;
        if axis_offset > 16 {
            set.add("padding", FieldType::padding_bits((axis_offset - 16) * 8))?;
        }

        let axis_count = set.uint("axisCount")?;
        for _ in 0..axis_count {
            set.add_set("axes[]", VariationAxisRecord, None)?;
        }

        // Coordinates are 4-byte Fixed values
        let has_postscript_name = set.uint("instanceSize")? == axis_count * 4 + 6;
        for _ in 0..set.uint("instanceCount")? {
            set.add_set(
                "instances[]",
                InstanceRecord {
                    axis_count,
                    has_postscript_name,
                },
                None,
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        field::Value,
        test::fonts::{avar_table, fvar_table, FontBuilder},
        Parser, ParserConfig,
    };

    fn parse(tag: &[u8; 4], table: Vec<u8>) -> Parser {
        let font = FontBuilder::minimal().table(tag, table).build();
        Parser::from_mem(font, ParserConfig::default()).unwrap()
    }

    #[test]
    fn axis_variations() {
        let parser = parse(b"avar", avar_table());
        let avar = parser.get_field("/table[4]").unwrap();
        assert_eq!(avar.display(), "avar (Axis variation table)");

        let maps = avar.get("segmentMaps[0]").unwrap();
        assert_eq!(maps.size(), (2 + 3 * 4) * 8);
        let first = maps.get("axisValueMaps[0]").unwrap();
        assert_eq!(first.get("fromCoordinate").unwrap().value(), &Value::Float(-1.0));
        assert_eq!(first.description(), "-1.0 -> -1.0");
        let last = maps.get("axisValueMaps[2]/toCoordinate").unwrap();
        assert_eq!(last.value(), &Value::Float(1.0));
        assert!(!parser.diagnostics().has_warnings());
    }

    #[test]
    fn font_variations() {
        let parser = parse(b"fvar", fvar_table());
        let fvar = parser.get_field("/table[4]").unwrap();

        let axis = fvar.get("axes[0]").unwrap();
        assert_eq!(axis.size(), 160);
        assert_eq!(axis.get("axisTag").unwrap().value().as_str(), Some("wght"));
        assert_eq!(axis.get("minValue").unwrap().value(), &Value::Float(100.0));
        assert_eq!(axis.get("maxValue").unwrap().value(), &Value::Float(900.0));
        assert_eq!(axis.get("hidden").unwrap().value(), &Value::Bool(false));

        let bold = fvar.get("instances[1]").unwrap();
        assert_eq!(bold.description(), "Instance record");
        assert_eq!(bold.size(), 80);
        assert_eq!(
            bold.get("coordinates/coordinate[0]").unwrap().value(),
            &Value::Float(700.0)
        );
        assert_eq!(bold.get("postScriptNameID").unwrap().value(), &Value::UInt(260));
        assert_eq!(fvar.len(), 11);
        assert!(!parser.diagnostics().has_warnings());
    }
}
