use std::io::{Read, Seek, Write};

use indexmap::IndexMap;

use crate::{BinarySerializable, BinarySerializer, SerializerError};

type Result<T> = std::result::Result<T, SerializerError>;

const LANGUAGE_CODE_WIDTH: usize = 4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalizedString {
    pub id: u32,
    pub text: String,
    pub voiced: bool,
    /// 4-bit speaker index, 0 when narrated.
    pub speaker: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageTable {
    pub code: String,
    pub strings: Vec<LocalizedString>,
}

/// Per-language text tables. Strings follow the context's encoding and
/// string strategy; language codes are always 4 zero-padded bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalizationTable {
    pub version: u16,
    pub languages: Vec<LanguageTable>,
}

impl BinarySerializable for LocalizedString {
    fn serialize<S: Read + Write + Seek>(&mut self, s: &mut BinarySerializer<S>) -> Result<()> {
        s.serialize(&mut self.id, "Id")?;
        let voiced = &mut self.voiced;
        let speaker = &mut self.speaker;
        s.serialize_bit_values::<u8, _>(
            |bits| {
                bits.flag(voiced);
                bits.field(speaker, 4);
                bits.skip(3);
            },
            "Flags",
        )?;
        s.serialize_string(&mut self.text, "Text")
    }
}

impl BinarySerializable for LanguageTable {
    fn serialize<S: Read + Write + Seek>(&mut self, s: &mut BinarySerializer<S>) -> Result<()> {
        s.serialize_fixed_string(&mut self.code, LANGUAGE_CODE_WIDTH, "Code")?;
        s.serialize_sized_object_array::<u16, _>(&mut self.strings, "Strings")
    }
}

impl BinarySerializable for LocalizationTable {
    fn serialize<S: Read + Write + Seek>(&mut self, s: &mut BinarySerializer<S>) -> Result<()> {
        s.serialize(&mut self.version, "Version")?;
        s.serialize_sized_object_array::<u8, _>(&mut self.languages, "Languages")
    }
}

impl LocalizationTable {
    pub fn language(&self, code: &str) -> Option<&LanguageTable> {
        self.languages.iter().find(|l| l.code == code)
    }

    pub fn get(&self, code: &str, id: u32) -> Option<&str> {
        self.language(code)?
            .strings
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.text.as_str())
    }

    /// Every string of `code` keyed by id, in table order.
    pub fn strings_by_id(&self, code: &str) -> IndexMap<u32, &str> {
        self.language(code)
            .map(|l| l.strings.iter().map(|s| (s.id, s.text.as_str())).collect())
            .unwrap_or_default()
    }
}
