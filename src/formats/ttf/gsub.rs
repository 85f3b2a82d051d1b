//! `GSUB`: glyph substitutions.
//!
//! Only the header is decoded. The lists it points at are kept as raw `content[]` chunks cut at
//! the list offsets.

use crate::{
    diagnostics::DiagnosticCategory,
    field::{sequence, FieldType, Grammar},
};

const LISTS: [(&str, &str); 3] = [
    ("scriptListOffset", "script list"),
    ("featureListOffset", "feature list"),
    ("lookupListOffset", "lookup list"),
];

pub(super) fn fields() -> Box<dyn Grammar> {
    sequence(|set| {
        set.add_described("majorVersion", FieldType::UInt16, "Major version")?;
        set.add_described("minorVersion", FieldType::UInt16, "Minor version")?;

        let mut offsets = Vec::new();
        for (name, list) in LISTS {
            let offset =
                set.add_described(name, FieldType::UInt16, format!("Offset to {list} table"))?;
            offsets.push((offset.value().as_u64().unwrap_or_default(), list));
        }
        if set.uint("minorVersion")? == 1 {
            let offset = set.add_described(
                "featureVariationsOffset",
                FieldType::UInt32,
                "Offset to feature variations table",
            )?;
            offsets.push((
                offset.value().as_u64().unwrap_or_default(),
                "feature variations",
            ));
        }

        offsets.retain(|(offset, _)| *offset != 0);
        offsets.sort_by_key(|(offset, _)| *offset);
        offsets.dedup_by_key(|(offset, _)| *offset);

        let end = set.size().unwrap_or(set.current_size()) / 8;
        let mut chunks = offsets.iter().peekable();
        while let Some(&(offset, list)) = chunks.next() {
            if offset.saturating_mul(8) < set.current_size() {
                set.warning(
                    DiagnosticCategory::Offset,
                    format!("Skip {list} at offset {offset} (overlaps previous data)"),
                );
                continue;
            }
            set.seek_byte(offset, true, true)?;

            let next = chunks.peek().map_or(end, |(next, _)| *next);
            let length = next.saturating_sub(offset);
            if length > 0 {
                set.add_described("content[]", FieldType::RawBytes(length), list)?;
            }
        }
        Ok(())
    })
}
