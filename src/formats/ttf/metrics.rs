//! Metric and profile tables: `hhea`, `maxp`, `OS/2` and `post`.

use crate::field::{
    sequence, Charset, FieldSetType, FieldType, Fixed, GenericVector, Grammar, Version16Dot16,
};

use super::PERMISSIONS;

/// Signed distance in font design units
const FWORD: FieldType = FieldType::Int16;
/// Unsigned distance in font design units
const UFWORD: FieldType = FieldType::UInt16;

pub(super) fn hhea() -> Box<dyn Grammar> {
    sequence(|set| {
        set.add_described("majorVersion", FieldType::UInt16, "Major version")?;
        set.add_described("minorVersion", FieldType::UInt16, "Minor version")?;
        set.add_described("ascender", FWORD, "Typographic ascent")?;
        set.add_described("descender", FWORD, "Typographic descent")?;
        set.add_described("lineGap", FWORD, "Typographic linegap")?;
        set.add_described("advanceWidthMax", UFWORD, "Maximum advance width")?;
        set.add_described("minLeftSideBearing", FWORD, "Minimum left sidebearing value")?;
        set.add_described(
            "minRightSideBearing",
            FWORD,
            "Minimum right sidebearing value",
        )?;
        set.add_described("xMaxExtent", FWORD, "Maximum X extent")?;
        set.add_described("caretSlopeRise", FieldType::Int16, "Caret slope rise")?;
        set.add_described("caretSlopeRun", FieldType::Int16, "Caret slope run")?;
        set.add_described("caretOffset", FieldType::Int16, "Caret offset")?;
        set.add_vector("reserved", 4, FieldType::Int16)?;
        set.add_described("metricDataFormat", FieldType::Int16, "Metric data format")?;
        set.add_described(
            "numberOfHMetrics",
            FieldType::UInt16,
            "Number of horizontal metrics",
        )?;
        Ok(())
    })
}

const MAXP_LIMITS: [(&str, &str); 13] = [
    ("maxPoints", "Maximum points in a non-composite glyph"),
    ("maxContours", "Maximum contours in a non-composite glyph"),
    ("maxCompositePoints", "Maximum points in a composite glyph"),
    ("maxCompositeContours", "Maximum contours in a composite glyph"),
    ("maxZones", "Do instructions use the twilight zone?"),
    ("maxTwilightPoints", "Maximum points used in Z0"),
    ("maxStorage", "Number of Storage Area locations"),
    ("maxFunctionDefs", "Number of function definitions"),
    ("maxInstructionDefs", "Number of instruction definitions"),
    ("maxStackElements", "Maximum stack depth"),
    ("maxSizeOfInstructions", "Maximum byte count for glyph instructions"),
    ("maxComponentElements", "Maximum number of components at glyph top level"),
    ("maxComponentDepth", "Maximum level of recursion"),
];

pub(super) fn maxp() -> Box<dyn Grammar> {
    sequence(|set| {
        set.add_set_described("format", Version16Dot16, None, "format version")?;
        set.add_described("numGlyphs", FieldType::UInt16, "Number of glyphs")?;
        if set.float("format")? >= 1.0 {
            for (name, description) in MAXP_LIMITS {
                set.add_described(name, FieldType::UInt16, description)?;
            }
        }
        Ok(())
    })
}

/// Embedding permissions of the font
#[derive(Debug, Clone, Copy, Default)]
pub struct FsType;

impl FieldSetType for FsType {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add("reserved[]", FieldType::padding_bits(6))?;
            set.add_described(
                "bitmap_embedding",
                FieldType::Bit,
                "Only bitmaps contained in the font may be embedded",
            )?;
            set.add_described(
                "no_subsetting",
                FieldType::Bit,
                "Font may not be subsetted prior to embedding",
            )?;
            set.add("reserved[]", FieldType::padding_bits(4))?;
            set.add(
                "usage_permissions",
                FieldType::enumeration(FieldType::Bits(4), PERMISSIONS),
            )?;
            Ok(())
        })
    }

    fn static_size(&self) -> Option<u64> {
        Some(16)
    }

    fn type_name(&self) -> &'static str {
        "fsType"
    }
}

const OS2_METRICS: [&str; 11] = [
    "ySubscriptXSize",
    "ySubscriptYSize",
    "ySubscriptXOffset",
    "ySubscriptYOffset",
    "ySuperscriptXSize",
    "ySuperscriptYSize",
    "ySuperscriptXOffset",
    "ySuperscriptYOffset",
    "yStrikeoutSize",
    "yStrikeoutPosition",
    "sFamilyClass",
];

pub(super) fn os2() -> Box<dyn Grammar> {
    sequence(|set| {
        set.add_described("version", FieldType::UInt16, "Table version")?;
        set.add("xAvgCharWidth", FieldType::Int16)?;
        set.add("usWeightClass", FieldType::UInt16)?;
        set.add("usWidthClass", FieldType::UInt16)?;
        set.add_set("fsType", FsType, None)?;
        for name in OS2_METRICS {
            set.add(name, FieldType::Int16)?;
        }
        set.add_vector("panose", 10, FieldType::UInt8)?;
        for name in [
            "ulUnicodeRange1",
            "ulUnicodeRange2",
            "ulUnicodeRange3",
            "ulUnicodeRange4",
        ] {
            set.add(name, FieldType::UInt32)?;
        }
        set.add_described("achVendID", FieldType::tag(), "Vendor ID")?;
        set.add("fsSelection", FieldType::UInt16)?;
        set.add("usFirstCharIndex", FieldType::UInt16)?;
        set.add("usLastCharIndex", FieldType::UInt16)?;
        set.add("sTypoAscender", FieldType::Int16)?;
        set.add("sTypoDescender", FieldType::Int16)?;
        set.add("sTypoLineGap", FieldType::Int16)?;
        set.add("usWinAscent", FieldType::UInt16)?;
        set.add("usWinDescent", FieldType::UInt16)?;

        let version = set.uint("version")?;
        if version >= 1 {
            set.add("ulCodePageRange1", FieldType::UInt32)?;
            set.add("ulCodePageRange2", FieldType::UInt32)?;
        }
        if version >= 2 {
            set.add("sxHeight", FieldType::Int16)?;
            set.add("sCapHeight", FieldType::Int16)?;
            set.add("usDefaultChar", FieldType::UInt16)?;
            set.add("usBreakChar", FieldType::UInt16)?;
            set.add("usMaxContext", FieldType::UInt16)?;
        }
        if version >= 5 {
            set.add("usLowerOpticalPointSize", FieldType::UInt16)?;
            set.add("usUpperOpticalPointSize", FieldType::UInt16)?;
        }
        Ok(())
    })
}

/// Glyph name indices below this refer to the standard Macintosh glyph set
const STANDARD_NAMES: u64 = 258;

pub(super) fn post() -> Box<dyn Grammar> {
    sequence(|set| {
        set.add_set_described("version", Version16Dot16, None, "Table version")?;
        set.add_set_described(
            "italicAngle",
            Fixed,
            None,
            "Italic angle in counter-clockwise degrees from the vertical.",
        )?;
        set.add_described("underlinePosition", FWORD, "Top of underline to baseline")?;
        set.add_described("underlineThickness", FWORD, "Suggested underline thickness")?;
        set.add_described("isFixedPitch", FieldType::UInt32, "Is the font fixed pitch?")?;
        set.add_described(
            "minMemType42",
            FieldType::UInt32,
            "Minimum memory usage (OpenType)",
        )?;
        set.add_described(
            "maxMemType42",
            FieldType::UInt32,
            "Maximum memory usage (OpenType)",
        )?;
        set.add_described("minMemType1", FieldType::UInt32, "Minimum memory usage (Type 1)")?;
        set.add_described("maxMemType1", FieldType::UInt32, "Maximum memory usage (Type 1)")?;

        let version = set.float("version")?;
        if version == 2.0 {
            set.add("numGlyphs", FieldType::UInt16)?;
            let count = set.uint("numGlyphs")?;
            let indices = set.add_set_described(
                "glyphNameIndex",
                GenericVector::new(count, FieldType::UInt16)?,
                None,
                "Array of indices into the string data",
            )?;

            let indices: Vec<u64> = indices
                .value()
                .as_list()
                .unwrap_or_default()
                .iter()
                .filter_map(|index| index.as_u64())
                .collect();
            for (glyph, index) in indices.into_iter().enumerate() {
                if index >= STANDARD_NAMES {
                    set.add(
                        &format!("glyphname[{glyph}]"),
                        FieldType::PascalString8(Charset::MacRoman),
                    )?;
                }
            }
        } else if version == 2.5 {
            set.add("numGlyphs", FieldType::UInt16)?;
            let count = set.uint("numGlyphs")?;
            set.add_set_described(
                "offset",
                GenericVector::new(count, FieldType::Int8)?,
                None,
                "Difference between graphic index and standard order of glyph",
            )?;
        }
        Ok(())
    })
}
