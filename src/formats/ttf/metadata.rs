//! Font metadata from the `head` and `name` tables.

use log::debug;

use crate::{
    field::Field,
    metadata::{Metadata, MetadataKey},
    Result,
};

fn name_key(name_id: u64) -> Option<MetadataKey> {
    match name_id {
        0 | 14 => Some(MetadataKey::Copyright),
        3 => Some(MetadataKey::Title),
        5 => Some(MetadataKey::Version),
        8 => Some(MetadataKey::Author),
        11 => Some(MetadataKey::Url),
        _ => None,
    }
}

/// The parsed table named `tag`, located through its directory entry
fn table<'a>(root: Field<'a>, tag: &str) -> Option<Field<'a>> {
    let count = root.get("nb_table").ok()?.value().as_u64()?;
    (0..count).find_map(|index| {
        let header = root.get(&format!("table_hdr[{index}]")).ok()?;
        if header.get("tag").ok()?.value().as_str()? != tag {
            return None;
        }
        let offset = header.get("offset").ok()?.value().as_u64()?;
        let table = root.field_by_address(offset.checked_mul(8)?, true)?;
        (table.address() == offset * 8 && table.is_field_set()).then_some(table)
    })
}

fn extract_header(head: Field<'_>, metadata: &mut Metadata) -> Result<()> {
    if let Some(created) = head.get("created")?.value().as_datetime() {
        metadata.add(MetadataKey::CreationDate, created);
    }
    if let Some(modified) = head.get("modified")?.value().as_datetime() {
        metadata.add(MetadataKey::LastModification, modified);
    }
    metadata.add(
        MetadataKey::Comment,
        format!(
            "Smallest readable size in pixels: {} pixels",
            head.get("lowest")?.value()
        ),
    );
    metadata.add(
        MetadataKey::Comment,
        format!("Font direction: {}", head.get("font_dir")?.display()),
    );
    Ok(())
}

fn extract_names(names: Field<'_>, metadata: &mut Metadata) -> Result<()> {
    let storage = names.get("offset")?.value().as_u64().unwrap_or_default();
    let headers = names
        .children()
        .filter(|field| field.name().starts_with("header["));
    for header in headers {
        let Some(key) = header.get("nameID")?.value().as_u64().and_then(name_key) else {
            continue;
        };
        let offset = storage + header.get("offset")?.value().as_u64().unwrap_or_default();
        let Some(field) = names.field_by_address(offset * 8, true) else {
            continue;
        };
        if !field.field_type().is_some_and(|ty| ty.is_string()) {
            continue;
        }
        let Some(mut text) = field.value().as_str() else {
            continue;
        };
        if key == MetadataKey::Version {
            text = text.strip_prefix("Version ").unwrap_or(text);
        }
        metadata.add(key, text);
    }
    Ok(())
}

pub(super) fn extract(root: Field<'_>, metadata: &mut Metadata) {
    if let Some(head) = table(root, "head") {
        if let Err(e) = extract_header(head, metadata) {
            debug!("Incomplete font header metadata: {e}");
        }
    }
    if let Some(names) = table(root, "name") {
        if let Err(e) = extract_names(names, metadata) {
            debug!("Incomplete name metadata: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        metadata::{MetadataKey, MetadataValue},
        test::fonts::{name_table, FontBuilder},
        Parser, ParserConfig,
    };

    #[test]
    fn header_and_names() {
        let parser =
            Parser::from_mem(FontBuilder::minimal().build(), ParserConfig::default()).unwrap();
        let metadata = parser.metadata();

        let created = metadata.get(MetadataKey::CreationDate).unwrap();
        assert_eq!(created.to_string(), "2020-01-01 00:00:00");
        let comments: Vec<_> = metadata
            .get_all(MetadataKey::Comment)
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            comments,
            [
                "Smallest readable size in pixels: 8 pixels",
                "Font direction: Left to right + neutrals",
            ]
        );
        assert_eq!(metadata.text(MetadataKey::Title), Some("Example Sans Regular"));
        assert_eq!(metadata.text(MetadataKey::Version), Some("1.002"));
        assert_eq!(metadata.text(MetadataKey::Author), Some("Example Foundry"));
        assert_eq!(metadata.text(MetadataKey::Url), Some("https://example.com"));
        assert_eq!(
            metadata.get(MetadataKey::Copyright),
            Some(&MetadataValue::Text("(c) Example Foundry".to_string()))
        );
    }

    #[test]
    fn names_only() {
        let mut builder = FontBuilder::minimal();
        builder.tables[3].1 = name_table(&[(3, 1, 0x409, 14, "Licensed"), (1, 0, 0, 2, "Bold")]);
        builder.tables.remove(0);
        let parser = Parser::from_mem(builder.build(), ParserConfig::default()).unwrap();
        let metadata = parser.metadata();

        assert!(metadata.get(MetadataKey::CreationDate).is_none());
        assert_eq!(metadata.text(MetadataKey::Copyright), Some("Licensed"));
        assert_eq!(metadata.len(), 1);
    }
}
