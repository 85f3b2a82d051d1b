//! Character sets and display helpers.
//!
//! Text in binary formats comes in whatever encoding the format (or an earlier field) declares,
//! and display strings must stay short and printable no matter what the bytes contain.

use std::fmt::Write;

use strum::Display;
use widestring::U16String;

/// Character set of a string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Charset {
    /// 7-bit ASCII; bytes above 0x7F fall back to ISO-8859-1
    #[strum(serialize = "ASCII")]
    Ascii,
    /// Latin-1, every byte maps to the code point of the same value
    #[strum(serialize = "ISO-8859-1")]
    Iso8859_1,
    /// UTF-8, invalid sequences are replaced
    #[strum(serialize = "UTF-8")]
    Utf8,
    /// UTF-16 with big endian code units
    #[strum(serialize = "UTF-16-BE")]
    Utf16Be,
    /// Classic Mac OS Roman
    #[strum(serialize = "MacRoman")]
    MacRoman,
}

/// Code points of Mac OS Roman bytes 0x80 to 0xFF
const MAC_ROMAN_HIGH: [u16; 128] = [
    0x00C4, 0x00C5, 0x00C7, 0x00C9, 0x00D1, 0x00D6, 0x00DC, 0x00E1, 0x00E0, 0x00E2, 0x00E4,
    0x00E3, 0x00E5, 0x00E7, 0x00E9, 0x00E8, 0x00EA, 0x00EB, 0x00ED, 0x00EC, 0x00EE, 0x00EF,
    0x00F1, 0x00F3, 0x00F2, 0x00F4, 0x00F6, 0x00F5, 0x00FA, 0x00F9, 0x00FB, 0x00FC, 0x2020,
    0x00B0, 0x00A2, 0x00A3, 0x00A7, 0x2022, 0x00B6, 0x00DF, 0x00AE, 0x00A9, 0x2122, 0x00B4,
    0x00A8, 0x2260, 0x00C6, 0x00D8, 0x221E, 0x00B1, 0x2264, 0x2265, 0x00A5, 0x00B5, 0x2202,
    0x2211, 0x220F, 0x03C0, 0x222B, 0x00AA, 0x00BA, 0x03A9, 0x00E6, 0x00F8, 0x00BF, 0x00A1,
    0x00AC, 0x221A, 0x0192, 0x2248, 0x2206, 0x00AB, 0x00BB, 0x2026, 0x00A0, 0x00C0, 0x00C3,
    0x00D5, 0x0152, 0x0153, 0x2013, 0x2014, 0x201C, 0x201D, 0x2018, 0x2019, 0x00F7, 0x25CA,
    0x00FF, 0x0178, 0x2044, 0x20AC, 0x2039, 0x203A, 0xFB01, 0xFB02, 0x2021, 0x00B7, 0x201A,
    0x201E, 0x2030, 0x00C2, 0x00CA, 0x00C1, 0x00CB, 0x00C8, 0x00CD, 0x00CE, 0x00CF, 0x00CC,
    0x00D3, 0x00D4, 0xF8FF, 0x00D2, 0x00DA, 0x00DB, 0x00D9, 0x0131, 0x02C6, 0x02DC, 0x00AF,
    0x02D8, 0x02D9, 0x02DA, 0x00B8, 0x02DD, 0x02DB, 0x02C7,
];

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

impl Charset {
    /// Decode `bytes` in this charset.
    ///
    /// Decoding never fails. The returned flag is true when the data did not fit the charset and
    /// a fallback or replacement was used, so the caller can report it.
    pub fn decode(self, bytes: &[u8]) -> (String, bool) {
        match self {
            Charset::Ascii => (latin1(bytes), !bytes.is_ascii()),
            Charset::Iso8859_1 => (latin1(bytes), false),
            Charset::Utf8 => match std::str::from_utf8(bytes) {
                Ok(text) => (text.to_string(), false),
                Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
            },
            Charset::Utf16Be => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                let text = U16String::from_vec(units);
                let lossy = text.to_string().is_err();
                (text.to_string_lossy(), lossy || bytes.len() % 2 != 0)
            }
            Charset::MacRoman => {
                let text = bytes
                    .iter()
                    .map(|&byte| {
                        if byte < 0x80 {
                            char::from(byte)
                        } else {
                            char::from_u32(u32::from(MAC_ROMAN_HIGH[usize::from(byte - 0x80)]))
                                .unwrap_or(char::REPLACEMENT_CHARACTER)
                        }
                    })
                    .collect();
                (text, false)
            }
        }
    }
}

/// Alternative display of an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextHandler {
    /// `0x` followed by the zero padded hexadecimal value
    Hexadecimal,
    /// A human readable file size
    FileSize,
}

impl TextHandler {
    /// Render `value` of a field that is `bits` wide
    pub fn render(self, value: u64, bits: u64) -> String {
        match self {
            TextHandler::Hexadecimal => hexadecimal(value, bits),
            TextHandler::FileSize => human_filesize(value),
        }
    }
}

/// `0x` prefixed hexadecimal, zero padded to the width of the field
pub fn hexadecimal(value: u64, bits: u64) -> String {
    let width = usize::try_from(bits.div_ceil(4)).unwrap_or(16);
    format!("0x{value:0width$x}")
}

/// Human readable size: exact bytes below 10000, otherwise one decimal of the largest unit.
///
/// ```rust
/// use fieldscope::field::human_filesize;
///
/// assert_eq!(human_filesize(1), "1 byte");
/// assert_eq!(human_filesize(9999), "9999 bytes");
/// assert_eq!(human_filesize(10 * 1024), "10.0 KB");
/// ```
pub fn human_filesize(size: u64) -> String {
    if size < 10_000 {
        return if size == 1 {
            "1 byte".to_string()
        } else {
            format!("{size} bytes")
        };
    }

    let units = ["KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    for unit in units {
        value /= 1024.0;
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
    }
    format!("{} TB", value as u64)
}

/// Render a float with at least one decimal, so whole numbers read as `1.0`
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        format!("{text}.0")
    } else {
        text
    }
}

fn escape_into(output: &mut String, c: char) {
    match c {
        '\0' => output.push_str("\\0"),
        '\t' => output.push_str("\\t"),
        '\n' => output.push_str("\\n"),
        '\r' => output.push_str("\\r"),
        '\\' => output.push_str("\\\\"),
        '"' => output.push_str("\\\""),
        c if c.is_control() => {
            let _ = write!(output, "\\x{:02x}", u32::from(c));
        }
        c => output.push(c),
    }
}

/// Quote and escape `text`, keeping at most `max` characters followed by `(...)`
pub fn printable_text(text: &str, max: usize) -> String {
    let mut output = String::with_capacity(text.len().min(max) + 8);
    output.push('"');
    let mut truncated = false;
    for (index, c) in text.chars().enumerate() {
        if index >= max {
            truncated = true;
            break;
        }
        escape_into(&mut output, c);
    }
    output.push('"');
    if truncated {
        output.push_str("(...)");
    }
    output
}

/// Quote and escape `bytes`, keeping at most `max` bytes followed by `(...)`
pub fn printable_bytes(bytes: &[u8], max: usize) -> String {
    let mut output = String::with_capacity(bytes.len().min(max) * 2 + 8);
    output.push('"');
    for &byte in bytes.iter().take(max) {
        if byte.is_ascii() {
            escape_into(&mut output, char::from(byte));
        } else {
            let _ = write!(output, "\\x{byte:02x}");
        }
    }
    output.push('"');
    if bytes.len() > max {
        output.push_str("(...)");
    }
    output
}
