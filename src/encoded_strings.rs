use encoding_rs::{SHIFT_JIS, UTF_16BE, UTF_16LE, WINDOWS_1252};
use strum_macros::{Display, EnumString};

use crate::SerializerError;

type Result<T> = std::result::Result<T, SerializerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum TextEncoding {
    #[strum(serialize = "UTF-8")]
    Utf8,
    #[strum(serialize = "UTF-16LE")]
    Utf16Le,
    #[strum(serialize = "UTF-16BE")]
    Utf16Be,
    #[strum(serialize = "SHIFT-JIS")]
    ShiftJis,
    #[strum(serialize = "WINDOWS-1252")]
    Windows1252,
}

impl TextEncoding {
    /// Width in bytes of one code unit, and therefore of the terminator.
    pub fn unit_size(&self) -> usize {
        match self {
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
            _ => 1,
        }
    }

    /// Number of characters a length prefix records for `string`.
    ///
    /// UTF-16 counts code units, so a surrogate pair counts as two.
    pub fn char_count(&self, string: &str) -> usize {
        match self {
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => string.encode_utf16().count(),
            _ => string.chars().count(),
        }
    }

    /// Byte length of the character whose first code unit is `lead`.
    pub fn sequence_length(&self, lead: &[u8]) -> usize {
        let first = lead.first().copied().unwrap_or(0);
        match self {
            TextEncoding::Utf8 => match first {
                0xF0..=0xF7 => 4,
                0xE0..=0xEF => 3,
                0xC0..=0xDF => 2,
                _ => 1,
            },
            TextEncoding::ShiftJis => match first {
                0x81..=0x9F | 0xE0..=0xFC => 2,
                _ => 1,
            },
            TextEncoding::Windows1252 => 1,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
        }
    }

    /// Byte length shared by every character, if the encoding has one.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => Some(2),
            TextEncoding::Windows1252 => Some(1),
            TextEncoding::Utf8 | TextEncoding::ShiftJis => None,
        }
    }

    pub fn encode(&self, string: &str) -> Result<Vec<u8>> {
        let encoding = match self {
            TextEncoding::Utf8 => return Ok(string.as_bytes().to_vec()),
            TextEncoding::Utf16Le => return Ok(to_utf_16(string, u16::to_le_bytes)),
            TextEncoding::Utf16Be => return Ok(to_utf_16(string, u16::to_be_bytes)),
            TextEncoding::ShiftJis => SHIFT_JIS,
            TextEncoding::Windows1252 => WINDOWS_1252,
        };
        let (result, _, has_errors) = encoding.encode(string);
        if has_errors {
            Err(SerializerError::EncodingFailed(
                string.to_string(),
                self.to_string(),
            ))
        } else {
            Ok(result.into())
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let encoding = match self {
            TextEncoding::Utf8 => {
                return String::from_utf8(bytes.to_vec())
                    .map_err(|_| SerializerError::DecodingFailed(self.to_string()));
            }
            TextEncoding::Utf16Le => UTF_16LE,
            TextEncoding::Utf16Be => UTF_16BE,
            TextEncoding::ShiftJis => SHIFT_JIS,
            TextEncoding::Windows1252 => WINDOWS_1252,
        };
        let (result, has_errors) = encoding.decode_without_bom_handling(bytes);
        if has_errors {
            Err(SerializerError::DecodingFailed(self.to_string()))
        } else {
            Ok(result.into())
        }
    }
}

fn to_utf_16(string: &str, to_bytes: fn(u16) -> [u8; 2]) -> Vec<u8> {
    let mut buffer: Vec<u8> = Vec::new();
    for unit in string.encode_utf16() {
        buffer.extend_from_slice(&to_bytes(unit));
    }
    buffer
}
