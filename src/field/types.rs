use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::{
    diagnostics::DiagnosticCategory,
    field::{
        text::{printable_bytes, printable_text, Charset, TextHandler},
        Field, Value,
    },
    Error, Parser, Result,
};

/// Primitive type of a leaf field.
///
/// Integer widths and byte order follow the parser's endianness. All sizes are in bits unless a
/// variant says otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 24-bit integer
    UInt24,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 24-bit integer
    Int24,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// A single bit, decoded as a boolean
    Bit,
    /// An unsigned integer of up to 64 bits
    Bits(u32),
    /// Uninterpreted bits
    RawBits(u64),
    /// Filler bits; `null` ones are expected to be zero
    Padding {
        /// Width in bits
        bits: u64,
        /// Whether the bits must be zero
        null: bool,
    },
    /// Bytes shown as data
    Bytes(u64),
    /// Uninterpreted bytes
    RawBytes(u64),
    /// A fixed-length string of `len` bytes
    String {
        /// Length in bytes
        len: u64,
        /// Encoding of the bytes
        charset: Charset,
    },
    /// A string prefixed with its length as one byte
    PascalString8(Charset),
    /// Seconds since 1904-01-01 00:00:00, unsigned 32-bit
    TimestampMac32,
    /// An integer whose display is looked up in a table
    Enum {
        /// The integer type
        inner: Box<FieldType>,
        /// Display names by value
        table: &'static [(i64, &'static str)],
    },
    /// An integer with an alternative display
    Formatted {
        /// The integer type
        inner: Box<FieldType>,
        /// How to render the value
        handler: TextHandler,
    },
}

fn sign_extend(raw: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

fn mac_timestamp(seconds: u64) -> Result<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1904, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| malformed_error!("Invalid Mac epoch"))?;
    let delta = i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| malformed_error!("Timestamp out of range: {}", seconds))?;

    epoch
        .checked_add_signed(delta)
        .ok_or_else(|| malformed_error!("Timestamp out of range: {}", seconds))
}

fn decode_text(field: Field<'_>, charset: Charset, bytes: &[u8]) -> Value {
    let (text, fallback) = charset.decode(bytes);
    if fallback {
        field.warning(
            DiagnosticCategory::Charset,
            format!("String is not valid {charset}, decoded with replacements"),
        );
    }
    Value::Text(text)
}

impl FieldType {
    /// Null padding of `bytes` bytes
    pub fn null_bytes(bytes: u64) -> Self {
        FieldType::Padding {
            bits: bytes.saturating_mul(8),
            null: true,
        }
    }

    /// Null padding of `bits` bits
    pub fn null_bits(bits: u64) -> Self {
        FieldType::Padding { bits, null: true }
    }

    /// Reserved bits whose content is not checked
    pub fn padding_bits(bits: u64) -> Self {
        FieldType::Padding { bits, null: false }
    }

    /// A string of `len` bytes
    pub fn string(len: u64, charset: Charset) -> Self {
        FieldType::String { len, charset }
    }

    /// A four character ASCII tag
    pub fn tag() -> Self {
        FieldType::string(4, Charset::Ascii)
    }

    /// `inner` displayed through `table`
    pub fn enumeration(inner: FieldType, table: &'static [(i64, &'static str)]) -> Self {
        FieldType::Enum {
            inner: Box::new(inner),
            table,
        }
    }

    /// `inner` displayed as zero padded hexadecimal
    pub fn hex(inner: FieldType) -> Self {
        FieldType::Formatted {
            inner: Box::new(inner),
            handler: TextHandler::Hexadecimal,
        }
    }

    /// `inner` displayed as a file size
    pub fn filesize(inner: FieldType) -> Self {
        FieldType::Formatted {
            inner: Box::new(inner),
            handler: TextHandler::FileSize,
        }
    }

    fn integer_width(&self) -> Option<(u32, bool)> {
        match self {
            FieldType::UInt8 => Some((8, false)),
            FieldType::UInt16 => Some((16, false)),
            FieldType::UInt24 => Some((24, false)),
            FieldType::UInt32 => Some((32, false)),
            FieldType::UInt64 => Some((64, false)),
            FieldType::Int8 => Some((8, true)),
            FieldType::Int16 => Some((16, true)),
            FieldType::Int24 => Some((24, true)),
            FieldType::Int32 => Some((32, true)),
            FieldType::Int64 => Some((64, true)),
            _ => None,
        }
    }

    /// Size in bits when it does not depend on the data
    pub fn static_size(&self) -> Option<u64> {
        if let Some((bits, _)) = self.integer_width() {
            return Some(u64::from(bits));
        }

        match self {
            FieldType::Bit => Some(1),
            FieldType::Bits(bits) => Some(u64::from(*bits)),
            FieldType::RawBits(bits) | FieldType::Padding { bits, .. } => Some(*bits),
            FieldType::Bytes(len) | FieldType::RawBytes(len) | FieldType::String { len, .. } => {
                len.checked_mul(8)
            }
            FieldType::TimestampMac32 => Some(32),
            FieldType::Enum { inner, .. } | FieldType::Formatted { inner, .. } => {
                inner.static_size()
            }
            _ => None,
        }
    }

    /// Size in bits of a field of this type at absolute bit `address`
    pub(crate) fn dynamic_size(&self, parser: &Parser, address: u64) -> Result<u64> {
        if let Some(size) = self.static_size() {
            return Ok(size);
        }

        match self {
            FieldType::PascalString8(_) => {
                let len = parser.stream().read_bits(address, 8, parser.endian())?;
                Ok(8 + len * 8)
            }
            other => Err(Error::InvalidSize(format!(
                "{} has no known size",
                other.type_name()
            ))),
        }
    }

    /// Returns true for text types
    pub fn is_string(&self) -> bool {
        matches!(self, FieldType::String { .. } | FieldType::PascalString8(_))
    }

    /// Short type name shown by tree listings
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::UInt8 => "UInt8",
            FieldType::UInt16 => "UInt16",
            FieldType::UInt24 => "UInt24",
            FieldType::UInt32 => "UInt32",
            FieldType::UInt64 => "UInt64",
            FieldType::Int8 => "Int8",
            FieldType::Int16 => "Int16",
            FieldType::Int24 => "Int24",
            FieldType::Int32 => "Int32",
            FieldType::Int64 => "Int64",
            FieldType::Bit => "Bit",
            FieldType::Bits(_) => "Bits",
            FieldType::RawBits(_) => "RawBits",
            FieldType::Padding { null: true, .. } => "NullBits",
            FieldType::Padding { null: false, .. } => "PaddingBits",
            FieldType::Bytes(_) => "Bytes",
            FieldType::RawBytes(_) => "RawBytes",
            FieldType::String { .. } => "String",
            FieldType::PascalString8(_) => "PascalString8",
            FieldType::TimestampMac32 => "TimestampMac32",
            FieldType::Enum { inner, .. } | FieldType::Formatted { inner, .. } => {
                inner.type_name()
            }
        }
    }

    pub(crate) fn decode(&self, field: Field<'_>) -> Result<Value> {
        let parser = field.parser();
        let stream = parser.stream();
        let endian = parser.endian();
        let address = field.absolute_address();

        if let Some((bits, signed)) = self.integer_width() {
            let raw = stream.read_bits(address, bits, endian)?;
            return Ok(if signed {
                Value::Int(sign_extend(raw, bits))
            } else {
                Value::UInt(raw)
            });
        }

        match self {
            FieldType::Bit => Ok(Value::Bool(stream.read_bits(address, 1, endian)? != 0)),
            FieldType::Bits(bits) => {
                if *bits > 64 {
                    return Err(Error::InvalidSize(format!("{bits} bits do not fit an integer")));
                }
                Ok(Value::UInt(stream.read_bits(address, *bits, endian)?))
            }
            FieldType::RawBits(bits) | FieldType::Padding { bits, .. } => {
                Ok(Value::Bytes(stream.read_raw(address, *bits)?))
            }
            FieldType::Bytes(len) | FieldType::RawBytes(len) => {
                Ok(Value::Bytes(stream.read_bytes(address, *len)?.into_owned()))
            }
            FieldType::String { len, charset } => {
                let bytes = stream.read_bytes(address, *len)?;
                Ok(decode_text(field, *charset, &bytes))
            }
            FieldType::PascalString8(charset) => {
                let len = stream.read_bits(address, 8, endian)?;
                let bytes = stream.read_bytes(address + 8, len)?;
                Ok(decode_text(field, *charset, &bytes))
            }
            FieldType::TimestampMac32 => {
                let seconds = stream.read_bits(address, 32, endian)?;
                Ok(Value::DateTime(mac_timestamp(seconds)?))
            }
            FieldType::Enum { inner, .. } | FieldType::Formatted { inner, .. } => {
                inner.decode(field)
            }
            _ => Err(Error::InvalidSize(format!(
                "{} cannot be decoded",
                self.type_name()
            ))),
        }
    }

    pub(crate) fn display(&self, field: Field<'_>) -> Result<String> {
        let config = field.parser().config();
        match self {
            FieldType::Padding { null: true, .. } => Ok("<null>".to_string()),
            FieldType::Enum { inner, table } => {
                if let Some(key) = field.value().as_i64() {
                    if let Some((_, name)) = table.iter().find(|(value, _)| *value == key) {
                        return Ok((*name).to_string());
                    }
                    field.warning(
                        DiagnosticCategory::Enum,
                        format!("Unknown value {key}"),
                    );
                }
                inner.display(field)
            }
            FieldType::Formatted { inner, handler } => match field.value().as_u64() {
                Some(value) => Ok(handler.render(value, field.size())),
                None => inner.display(field),
            },
            FieldType::String { .. } | FieldType::PascalString8(_) => match field.value() {
                Value::Text(text) => Ok(printable_text(text, config.max_string_length)),
                other => Ok(other.to_string()),
            },
            FieldType::RawBits(_)
            | FieldType::Padding { .. }
            | FieldType::Bytes(_)
            | FieldType::RawBytes(_) => match field.value() {
                Value::Bytes(bytes) => Ok(printable_bytes(bytes, config.max_byte_length)),
                other => Ok(other.to_string()),
            },
            _ => Ok(field.value().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::parser_for;

    const COLORS: &[(i64, &str)] = &[(0, "black"), (1, "white")];

    #[test]
    fn integers() {
        let parser = parser_for(&[0xFF, 0xFE, 0x80, 0x00, 0x00, 0x01, 0x02, 0x03], |set| {
            set.add("a", FieldType::Int8)?;
            set.add("b", FieldType::Int8)?;
            set.add("c", FieldType::Int16)?;
            set.add("d", FieldType::UInt8)?;
            set.add("e", FieldType::UInt24)?;
            Ok(())
        });

        let root = parser.root();
        assert_eq!(root.get("a").unwrap().value(), &Value::Int(-1));
        assert_eq!(root.get("b").unwrap().value(), &Value::Int(-2));
        assert_eq!(root.get("c").unwrap().value(), &Value::Int(-32768));
        assert_eq!(root.get("d").unwrap().value(), &Value::UInt(0));
        assert_eq!(root.get("e").unwrap().value(), &Value::UInt(0x010203));
        assert_eq!(root.get("e").unwrap().type_name(), "UInt24");
    }

    #[test]
    fn bits_are_msb_first() {
        let parser = parser_for(&[0b1010_0110], |set| {
            set.add("flag", FieldType::Bit)?;
            set.add("pair", FieldType::Bits(2))?;
            set.add("rest", FieldType::padding_bits(5))?;
            Ok(())
        });

        let root = parser.root();
        assert_eq!(root.get("flag").unwrap().value(), &Value::Bool(true));
        assert_eq!(root.get("pair").unwrap().value(), &Value::UInt(1));
        assert_eq!(root.get("rest").unwrap().address(), 3);
        assert_eq!(root.get("rest").unwrap().size(), 5);
    }

    #[test]
    fn enums_and_handlers() {
        let parser = parser_for(&[0, 1, 7, 0x00, 0x2A], |set| {
            set.add("a", FieldType::enumeration(FieldType::UInt8, COLORS))?;
            set.add("b", FieldType::enumeration(FieldType::UInt8, COLORS))?;
            set.add("c", FieldType::enumeration(FieldType::UInt8, COLORS))?;
            set.add("d", FieldType::hex(FieldType::UInt16))?;
            Ok(())
        });

        let root = parser.root();
        assert_eq!(root.get("a").unwrap().display(), "black");
        assert_eq!(root.get("b").unwrap().display(), "white");
        assert_eq!(root.get("c").unwrap().display(), "7");
        assert_eq!(root.get("c").unwrap().display(), "7");
        assert_eq!(root.get("d").unwrap().display(), "0x002a");
        assert_eq!(root.get("d").unwrap().value(), &Value::UInt(42));

        let unknown = parser.diagnostics().by_category(DiagnosticCategory::Enum);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].path.as_deref(), Some("/c"));
    }

    #[test]
    fn strings() {
        let parser = parser_for(b"\x04headabc\xff", |set| {
            set.add("pascal", FieldType::PascalString8(Charset::Ascii))?;
            set.add("plain", FieldType::string(3, Charset::Ascii))?;
            set.add("odd", FieldType::string(1, Charset::Ascii))?;
            Ok(())
        });

        let root = parser.root();
        let pascal = root.get("pascal").unwrap();
        assert_eq!(pascal.size(), 40);
        assert_eq!(pascal.value().as_str(), Some("head"));
        assert_eq!(pascal.display(), "\"head\"");
        assert_eq!(root.get("plain").unwrap().address(), 40);
        assert_eq!(root.get("odd").unwrap().value().as_str(), Some("\u{ff}"));
        assert_eq!(
            parser
                .diagnostics()
                .by_category(DiagnosticCategory::Charset)
                .len(),
            1
        );
    }

    #[test]
    fn mac_timestamps() {
        let parser = parser_for(&[0x00, 0x00, 0x00, 0x3C, 0x7C, 0x25, 0xB0, 0x80], |set| {
            set.add("minute", FieldType::TimestampMac32)?;
            set.add("date", FieldType::TimestampMac32)?;
            Ok(())
        });

        let root = parser.root();
        assert_eq!(root.get("minute").unwrap().display(), "1904-01-01 00:01:00");
        assert_eq!(root.get("date").unwrap().display(), "1970-01-01 00:00:00");
    }

    #[test]
    fn bytes_display_is_truncated() {
        let parser = parser_for(&[b'a'; 20], |set| {
            set.add("data", FieldType::Bytes(20))?;
            Ok(())
        });

        let data = parser.root().get("data").unwrap();
        assert_eq!(data.display(), "\"aaaaaaaaaaaaaa\"(...)");
        assert_eq!(data.value().as_bytes().map(<[u8]>::len), Some(20));
    }
}
