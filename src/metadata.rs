//! Document metadata.
//!
//! Formats summarize a parsed tree into a flat list of well-known keys (title, author, dates,
//! dimensions...). Entries keep the order in which they were found and a key may repeat, e.g.
//! several comments or a copyright found in two name records.

use std::fmt;

use chrono::NaiveDateTime;
use strum::{Display, EnumIter, EnumString};

/// Well-known metadata keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum MetadataKey {
    /// Title of the document
    #[strum(serialize = "Title")]
    Title,
    /// Author or manufacturer
    #[strum(serialize = "Author")]
    Author,
    /// Version string
    #[strum(serialize = "Version")]
    Version,
    /// Copyright notice
    #[strum(serialize = "Copyright")]
    Copyright,
    /// Related URL
    #[strum(serialize = "URL")]
    Url,
    /// Creation date
    #[strum(serialize = "Creation date")]
    CreationDate,
    /// Last modification date
    #[strum(serialize = "Last modification")]
    LastModification,
    /// Free text
    #[strum(serialize = "Comment")]
    Comment,
    /// Width in pixels
    #[strum(serialize = "Image width")]
    Width,
    /// Height in pixels
    #[strum(serialize = "Image height")]
    Height,
}

/// A metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// Text
    Text(String),
    /// An integer, such as a dimension
    Int(i64),
    /// A timestamp
    DateTime(NaiveDateTime),
}

impl MetadataValue {
    /// The value as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Text(value) => write!(f, "{value}"),
            MetadataValue::Int(value) => write!(f, "{value}"),
            MetadataValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<NaiveDateTime> for MetadataValue {
    fn from(value: NaiveDateTime) -> Self {
        MetadataValue::DateTime(value)
    }
}

/// Ordered collection of metadata entries.
///
/// ```rust
/// use fieldscope::metadata::{Metadata, MetadataKey};
///
/// let mut metadata = Metadata::default();
/// metadata.add(MetadataKey::Title, "Sans");
/// metadata.add(MetadataKey::Title, "Sans");
/// metadata.add(MetadataKey::Comment, "  ");
/// assert_eq!(metadata.len(), 1);
/// assert_eq!(metadata.text(MetadataKey::Title), Some("Sans"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    items: Vec<(MetadataKey, MetadataValue)>,
}

impl Metadata {
    /// Add an entry. Blank text and exact duplicates are ignored; text is trimmed.
    pub fn add(&mut self, key: MetadataKey, value: impl Into<MetadataValue>) {
        let value = match value.into() {
            MetadataValue::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                MetadataValue::Text(text.to_string())
            }
            other => other,
        };

        if !self
            .items
            .iter()
            .any(|(existing, current)| *existing == key && *current == value)
        {
            self.items.push((key, value));
        }
    }

    /// The first value of `key`
    pub fn get(&self, key: MetadataKey) -> Option<&MetadataValue> {
        self.get_all(key).next()
    }

    /// All values of `key`, in order
    pub fn get_all(&self, key: MetadataKey) -> impl Iterator<Item = &MetadataValue> {
        self.items
            .iter()
            .filter(move |(existing, _)| *existing == key)
            .map(|(_, value)| value)
    }

    /// The first value of `key` as text
    pub fn text(&self, key: MetadataKey) -> Option<&str> {
        self.get(key).and_then(MetadataValue::as_text)
    }

    /// Height in pixels, if known
    pub fn height(&self) -> Option<i64> {
        self.get(MetadataKey::Height).and_then(MetadataValue::as_int)
    }

    /// All entries, in order
    pub fn iter(&self) -> impl Iterator<Item = &(MetadataKey, MetadataValue)> {
        self.items.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing was found
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.items {
            writeln!(f, "- {key}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_and_repeats() {
        let mut metadata = Metadata::default();
        metadata.add(MetadataKey::Copyright, "(c) one");
        metadata.add(MetadataKey::Height, 720_i64);
        metadata.add(MetadataKey::Copyright, " (c) two ");

        let copyrights: Vec<_> = metadata
            .get_all(MetadataKey::Copyright)
            .map(ToString::to_string)
            .collect();
        assert_eq!(copyrights, ["(c) one", "(c) two"]);
        assert_eq!(metadata.height(), Some(720));
        assert_eq!(metadata.get(MetadataKey::Url), None);
        assert_eq!(
            metadata.to_string(),
            "- Copyright: (c) one\n- Image height: 720\n- Copyright: (c) two\n"
        );
    }
}
