use std::convert::TryFrom;
use std::io::{Read, Seek, Write};

use crate::archive::{ArchiveContainer, ArchiveEntry};
use crate::{BinarySerializer, CntTableLayout, SerializerError};

type Result<T> = std::result::Result<T, SerializerError>;

const FILE_NAME_WIDTH: usize = 9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CntHeader {
    pub signature: i16,
    pub xor_key: u8,
    pub directories: Vec<String>,
    pub version_id: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FileEntry {
    pub name: String,
    pub offset: u64,
    pub size: u64,
    pub xor_key: u8,
    pub checksum: u8,
}

impl FileEntry {
    pub fn new(name: &str, size: u64, xor_key: u8) -> Self {
        FileEntry {
            name: name.to_string(),
            offset: 0,
            size,
            xor_key,
            checksum: 0,
        }
    }

    pub fn compute_checksum(content: &[u8]) -> u8 {
        content.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
    }

    pub fn verify_checksum(&self, content: &[u8]) -> bool {
        FileEntry::compute_checksum(content) == self.checksum
    }
}

impl ArchiveEntry for FileEntry {
    fn offset(&self) -> u64 {
        self.offset
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }
}

/// CNT container: directory table plus a file table whose row layout depends
/// on the game.
pub struct Cnt;

impl ArchiveContainer for Cnt {
    type Header = CntHeader;
    type Entry = FileEntry;

    fn serialize_header<S: Read + Write + Seek>(
        s: &mut BinarySerializer<S>,
        header: &mut CntHeader,
        entries: &mut Vec<FileEntry>,
    ) -> Result<()> {
        s.serialize_array_size::<i32, _>(&mut header.directories, "DirectoryCount")?;
        s.serialize_array_size::<i32, _>(entries, "FileCount")?;
        s.serialize(&mut header.signature, "Signature")?;
        s.serialize(&mut header.xor_key, "XorKey")?;
        for directory in header.directories.iter_mut() {
            serialize_xored_name(s, directory, header.xor_key, "DirectoryName")?;
        }
        s.serialize(&mut header.version_id, "VersionId")?;

        let layout = s.context().cnt_table_layout();
        for entry in entries.iter_mut() {
            match layout {
                CntTableLayout::Named => serialize_named_row(s, entry)?,
                CntTableLayout::Compact => serialize_compact_row(s, entry)?,
            }
        }
        Ok(())
    }
}

// int32 byte length in the clear, then the name bytes XORed with `key`.
fn serialize_xored_name<S: Read + Write + Seek>(
    s: &mut BinarySerializer<S>,
    name: &mut String,
    key: u8,
    field: &str,
) -> Result<()> {
    let encoding = s.context().encoding;
    let mut bytes = if s.is_reading() {
        Vec::new()
    } else {
        encoding.encode(name)?
    };
    let mut length = i32::try_from(bytes.len()).map_err(|_| {
        SerializerError::InvalidArgument(format!("{}: name is too long", field))
    })?;
    s.serialize(&mut length, field)?;
    let length = usize::try_from(length).map_err(|_| {
        SerializerError::InvalidArgument(format!("{}: negative name length {}", field, length))
    })?;
    s.with_xor(key, |s| s.serialize_bytes(&mut bytes, length, field))?;
    if s.is_reading() {
        *name = encoding.decode(&bytes)?;
    }
    Ok(())
}

fn serialize_u32_field<S: Read + Write + Seek>(
    s: &mut BinarySerializer<S>,
    value: &mut u64,
    field: &str,
) -> Result<()> {
    let mut raw = u32::try_from(*value).map_err(|_| {
        SerializerError::InvalidArgument(format!("{}: 0x{:x} does not fit in 32 bits", field, value))
    })?;
    s.serialize(&mut raw, field)?;
    *value = raw as u64;
    Ok(())
}

fn serialize_named_row<S: Read + Write + Seek>(
    s: &mut BinarySerializer<S>,
    entry: &mut FileEntry,
) -> Result<()> {
    s.serialize(&mut entry.xor_key, "EntryXorKey")?;
    s.serialize(&mut entry.checksum, "Checksum")?;
    serialize_u32_field(s, &mut entry.offset, "FileOffset")?;
    serialize_u32_field(s, &mut entry.size, "FileSize")?;
    let name = &mut entry.name;
    s.with_xor(entry.xor_key, |s| {
        s.serialize_fixed_string(name, FILE_NAME_WIDTH, "FileName")
    })
}

fn serialize_compact_row<S: Read + Write + Seek>(
    s: &mut BinarySerializer<S>,
    entry: &mut FileEntry,
) -> Result<()> {
    serialize_u32_field(s, &mut entry.offset, "FileOffset")?;
    serialize_u32_field(s, &mut entry.size, "FileSize")?;
    s.serialize(&mut entry.xor_key, "EntryXorKey")?;
    s.serialize(&mut entry.checksum, "Checksum")?;
    s.serialize_padding(2, "Padding")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::{archive_file, cnt_files};
    use crate::{ArchiveError, ArchiveFileGenerator, Context, FileGenerator, Game, Mode, Platform};
    use std::io::Cursor;

    fn header() -> CntHeader {
        CntHeader {
            signature: 0x0A,
            xor_key: 0x5A,
            directories: vec!["a/".to_string(), "b/".to_string()],
            version_id: 1,
        }
    }

    fn pack(context: &Context) -> (Vec<FileEntry>, Vec<u8>) {
        let header = header();
        let files = cnt_files();
        let mut entries: Vec<FileEntry> = files
            .iter()
            .map(|(name, content)| {
                let mut entry = FileEntry::new(name, content.len() as u64, 0x21);
                entry.checksum = FileEntry::compute_checksum(content);
                entry
            })
            .collect();
        Cnt::assign_offsets(&header, &mut entries, context, 4).unwrap();

        let mut generator = FileGenerator::new();
        for (entry, (_, content)) in entries.iter().zip(files) {
            generator.add_bytes(entry.clone(), content).unwrap();
        }
        let mut cursor = Cursor::new(Vec::new());
        Cnt::write_archive(&mut cursor, &header, &entries, generator, context).unwrap();
        (entries, cursor.into_inner())
    }

    #[test]
    fn named_archive_round_trip() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let (entries, bytes) = pack(&context);

        let mut cursor = Cursor::new(bytes);
        let (read_header, read_entries, mut reader) = Cnt::read_archive(&mut cursor, &context).unwrap();
        assert_eq!(header(), read_header);
        assert_eq!(entries, read_entries);
        for ((_, content), entry) in cnt_files().iter().zip(&read_entries) {
            let read = reader.take(entry).unwrap();
            assert_eq!(content, &read);
            assert!(entry.verify_checksum(&read));
        }
    }

    #[test]
    fn compact_archive_round_trip() {
        let context = Context::new(Game::Rayman3, Platform::GameCube);
        let (entries, bytes) = pack(&context);

        let mut cursor = Cursor::new(bytes);
        let (read_header, read_entries, mut reader) = Cnt::read_archive(&mut cursor, &context).unwrap();
        assert_eq!(header(), read_header);
        assert_eq!(entries.len(), read_entries.len());
        for (written, read) in entries.iter().zip(&read_entries) {
            assert_eq!("", read.name);
            assert_eq!(written.offset, read.offset);
            assert_eq!(written.size, read.size);
            assert_eq!(written.checksum, read.checksum);
        }
        assert_eq!(cnt_files()[1].1, reader.take(&read_entries[1]).unwrap());
    }

    #[test]
    fn directory_names_are_xored() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let (_, bytes) = pack(&context);
        // 4 + 4 + 2 + 1 header bytes, then the first directory.
        assert_eq!(&[2, 0, 0, 0], &bytes[11..15]);
        assert_eq!(&[b'a' ^ 0x5A, b'/' ^ 0x5A], &bytes[15..17]);
    }

    #[test]
    fn header_probe_matches_written_header() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let (entries, bytes) = pack(&context);
        let measured = Cnt::measure_header_size(&header(), &entries, &context).unwrap();
        // 11 fixed bytes, two directories of 4 + 2 bytes, version, two 19 byte rows.
        assert_eq!(11 + 12 + 1 + 2 * 19, measured);
        assert_eq!(align_up(measured), entries[0].offset);
        assert!(bytes.len() as u64 >= measured);

        let mut scratch = Cursor::new(Vec::new());
        let mut probe_header = header();
        let mut probe_entries = entries.clone();
        let mut s = BinarySerializer::new(&mut scratch, &context, Mode::Write);
        Cnt::serialize_header(&mut s, &mut probe_header, &mut probe_entries).unwrap();
        assert_eq!(&bytes[..measured as usize], &scratch.into_inner()[..]);

        let compact = Context::new(Game::Rayman3, Platform::PC);
        assert_eq!(
            11 + 12 + 1 + 2 * 12,
            Cnt::measure_header_size(&header(), &entries, &compact).unwrap()
        );
    }

    fn align_up(value: u64) -> u64 {
        (value + 3) / 4 * 4
    }

    #[test]
    fn count_mismatch_writes_nothing() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let mut entries = vec![FileEntry::new("a.bin", 1, 0), FileEntry::new("b.bin", 1, 0)];
        Cnt::assign_offsets(&header(), &mut entries, &context, 1).unwrap();
        let mut generator = FileGenerator::new();
        generator.add_bytes(entries[0].clone(), vec![1]).unwrap();

        let mut cursor = Cursor::new(Vec::new());
        let result = Cnt::write_archive(&mut cursor, &header(), &entries, generator, &context);
        assert!(matches!(
            result,
            Err(ArchiveError::GeneratorCountMismatch(1, 2))
        ));
        assert!(cursor.into_inner().is_empty());
    }

    #[test]
    fn offsets_inside_header_are_rejected() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let entries = vec![FileEntry::new("a.bin", 1, 0)];
        let mut generator = FileGenerator::new();
        generator.add_bytes(entries[0].clone(), vec![1]).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        let result = Cnt::write_archive(&mut cursor, &header(), &entries, generator, &context);
        assert!(matches!(result, Err(ArchiveError::OffsetInsideHeader(..))));
    }

    #[test]
    fn content_size_must_match_entry() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let mut entries = vec![FileEntry::new("a.bin", 4, 0)];
        Cnt::assign_offsets(&header(), &mut entries, &context, 1).unwrap();
        let mut generator = FileGenerator::new();
        generator.add_bytes(entries[0].clone(), vec![1]).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        let result = Cnt::write_archive(&mut cursor, &header(), &entries, generator, &context);
        assert!(matches!(result, Err(ArchiveError::SizeMismatch(_, 4, 1))));
    }

    #[test]
    fn long_file_names_are_rejected() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let entries = vec![FileEntry::new("much_too_long.bin", 0, 0)];
        let result = Cnt::measure_header_size(&header(), &entries, &context);
        assert!(matches!(
            result,
            Err(ArchiveError::SerializerError(
                SerializerError::StringTooLongForFixedWidth(..)
            ))
        ));
    }

    #[test]
    fn reader_rejects_unknown_entries() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let (_, bytes) = pack(&context);
        let mut cursor = Cursor::new(bytes);
        let (_, _, mut reader) = Cnt::read_archive(&mut cursor, &context).unwrap();
        let stranger = FileEntry::new("x.bin", 1, 0);
        assert!(matches!(
            reader.take(&stranger),
            Err(ArchiveError::UnknownGeneratorKey(_))
        ));
    }

    #[test]
    fn repack_from_file_backed_reader() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let (entries, bytes) = pack(&context);
        let mut source = archive_file(&bytes);

        let (header, read_entries, reader) = Cnt::read_archive(source.as_file_mut(), &context).unwrap();
        assert_eq!(entries, read_entries);
        let mut target = Cursor::new(Vec::new());
        Cnt::write_archive(&mut target, &header, &read_entries, reader, &context).unwrap();
        assert_eq!(bytes, target.into_inner());
    }

    #[test]
    fn truncated_content_fails() {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let (_, mut bytes) = pack(&context);
        bytes.truncate(bytes.len() - 1);
        let mut cursor = Cursor::new(bytes);
        let (_, entries, mut reader) = Cnt::read_archive(&mut cursor, &context).unwrap();
        assert!(matches!(
            reader.take(&entries[1]),
            Err(ArchiveError::SerializerError(
                SerializerError::UnexpectedEndOfStream(..)
            ))
        ));
    }

    #[test]
    fn identical_compact_rows_repack() {
        let context = Context::new(Game::Rayman3, Platform::PC);
        let header = CntHeader::default();
        let mut entries = vec![FileEntry::new("a", 0, 0), FileEntry::new("b", 0, 0)];
        Cnt::assign_offsets(&header, &mut entries, &context, 1).unwrap();
        let mut generator = FileGenerator::new();
        for entry in &entries {
            generator.add_bytes(entry.clone(), Vec::new()).unwrap();
        }
        let mut cursor = Cursor::new(Vec::new());
        Cnt::write_archive(&mut cursor, &header, &entries, generator, &context).unwrap();
        let bytes = cursor.into_inner();

        let mut source = Cursor::new(bytes.clone());
        let (read_header, read_entries, reader) = Cnt::read_archive(&mut source, &context).unwrap();
        assert_eq!(read_entries[0], read_entries[1]);
        assert_eq!(2, reader.count());
        let mut target = Cursor::new(Vec::new());
        Cnt::write_archive(&mut target, &read_header, &read_entries, reader, &context).unwrap();
        assert_eq!(bytes, target.into_inner());
    }

    fn read_error(bytes: Vec<u8>) -> Option<SerializerError> {
        let context = Context::new(Game::Rayman2, Platform::PC);
        let mut cursor = Cursor::new(bytes);
        match Cnt::read_archive(&mut cursor, &context) {
            Err(ArchiveError::SerializerError(err)) => Some(err),
            _ => None,
        }
    }

    #[test]
    fn oversized_directory_count_fails() {
        let mut bytes = vec![0xFF, 0xFF, 0xFF, 0x7F];
        bytes.extend(vec![0; 8]);
        assert!(matches!(
            read_error(bytes),
            Some(SerializerError::UnexpectedEndOfStream(4, 0x7FFF_FFFF))
        ));
    }

    #[test]
    fn oversized_file_count_fails() {
        let mut bytes = vec![0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0x7F];
        bytes.extend(vec![0; 4]);
        assert!(matches!(
            read_error(bytes),
            Some(SerializerError::UnexpectedEndOfStream(8, 0x7FFF_FFFF))
        ));
    }

    #[test]
    fn oversized_directory_name_fails() {
        let bytes = vec![
            1, 0, 0, 0, // directories
            0, 0, 0, 0, // files
            0, 0, // signature
            0, // key
            0xFF, 0xFF, 0xFF, 0x7F, // name length
            0, 0,
        ];
        assert!(matches!(
            read_error(bytes),
            Some(SerializerError::UnexpectedEndOfStream(15, 0x7FFF_FFFF))
        ));
    }

    #[test]
    fn oversized_entry_content_fails() {
        let context = Context::new(Game::Rayman3, Platform::PC);
        let mut header = CntHeader::default();
        let mut entries = vec![FileEntry::new("a", 0xFFFF_FFFF, 0)];
        Cnt::assign_offsets(&header, &mut entries, &context, 1).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut s = BinarySerializer::new(&mut cursor, &context, Mode::Write);
            Cnt::serialize_header(&mut s, &mut header, &mut entries).unwrap();
        }
        cursor.set_position(0);
        let (_, read_entries, mut reader) = Cnt::read_archive(&mut cursor, &context).unwrap();
        assert!(matches!(
            reader.take(&read_entries[0]),
            Err(ArchiveError::SerializerError(
                SerializerError::UnexpectedEndOfStream(..)
            ))
        ));
    }
}
