use std::convert::TryFrom;
use std::fmt::Debug;
use std::hash::Hash;
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};

use log::debug;
use rustc_hash::FxHashSet;

use crate::{
    ArchiveError, ArchiveFileGenerator, BinarySerializer, Context, Mode, SerializerError,
};

type Result<T> = std::result::Result<T, ArchiveError>;

/// Table row of an archive: where an entry's content lives.
pub trait ArchiveEntry: Clone + Default + Eq + Hash + Debug {
    /// Offset of the content relative to the start of the archive.
    fn offset(&self) -> u64;

    fn size(&self) -> u64;

    fn set_offset(&mut self, offset: u64);
}

/// A container format made of a header and entry table followed by entry
/// content placed at each entry's offset.
pub trait ArchiveContainer {
    type Header: Clone + Default + Debug;
    type Entry: ArchiveEntry;

    /// Serializes the header and entry table. On read `entries` is resized
    /// to the stored entry count.
    fn serialize_header<S: Read + Write + Seek>(
        s: &mut BinarySerializer<S>,
        header: &mut Self::Header,
        entries: &mut Vec<Self::Entry>,
    ) -> std::result::Result<(), SerializerError>;

    /// Length in bytes of the header and table for `entries`, measured
    /// against a scratch buffer.
    fn measure_header_size(
        header: &Self::Header,
        entries: &[Self::Entry],
        context: &Context,
    ) -> Result<u64> {
        context.validate()?;
        let mut scratch = Cursor::new(Vec::new());
        let mut header = header.clone();
        let mut entries = entries.to_vec();
        let mut s = BinarySerializer::new(&mut scratch, context, Mode::Write);
        Self::serialize_header(&mut s, &mut header, &mut entries)?;
        Ok(scratch.get_ref().len() as u64)
    }

    /// Lays entries out back to back after the header, each starting on a
    /// multiple of `alignment`. Returns the total archive size.
    fn assign_offsets(
        header: &Self::Header,
        entries: &mut [Self::Entry],
        context: &Context,
        alignment: u64,
    ) -> Result<u64> {
        let mut next = Self::measure_header_size(header, entries, context)?;
        for entry in entries.iter_mut() {
            next = align(next, alignment);
            entry.set_offset(next);
            next += entry.size();
        }
        Ok(next)
    }

    /// Writes the header and table, then every entry's content at its offset.
    ///
    /// Offsets are relative to the stream position at the time of the call.
    /// The generator is checked against `entries` before anything is written.
    fn write_archive<S, G>(
        stream: &mut S,
        header: &Self::Header,
        entries: &[Self::Entry],
        mut generator: G,
        context: &Context,
    ) -> Result<()>
    where
        S: Read + Write + Seek,
        G: ArchiveFileGenerator<Self::Entry>,
    {
        if generator.count() != entries.len() {
            return Err(ArchiveError::GeneratorCountMismatch(
                generator.count(),
                entries.len(),
            ));
        }
        if let Some(entry) = entries.iter().find(|e| !generator.contains(e)) {
            return Err(ArchiveError::UnknownGeneratorKey(format!("{:?}", entry)));
        }
        let header_size = Self::measure_header_size(header, entries, context)?;
        if let Some(entry) = entries.iter().find(|e| e.offset() < header_size) {
            return Err(ArchiveError::OffsetInsideHeader(
                format!("{:?}", entry),
                entry.offset(),
                header_size,
            ));
        }

        let base = stream.stream_position()?;
        let mut s = BinarySerializer::new(stream, context, Mode::Write);
        let mut header = header.clone();
        let mut table = entries.to_vec();
        Self::serialize_header(&mut s, &mut header, &mut table)?;
        let written = s.position()? - base;
        if written != header_size {
            return Err(ArchiveError::HeaderSizeDiverged(header_size, written));
        }
        debug!("wrote {} byte header for {} entries", written, entries.len());

        for entry in entries {
            let mut content = generator.take(entry)?;
            if content.len() as u64 != entry.size() {
                return Err(ArchiveError::SizeMismatch(
                    format!("{:?}", entry),
                    entry.size(),
                    content.len(),
                ));
            }
            s.goto(base + entry.offset())?;
            let length = content.len();
            s.serialize_bytes(&mut content, length, "Content")?;
        }
        Ok(())
    }

    /// Reads the header and table and returns a generator that slices entry
    /// content out of `stream` on demand.
    fn read_archive<'s, S: Read + Write + Seek>(
        stream: &'s mut S,
        context: &Context,
    ) -> Result<(
        Self::Header,
        Vec<Self::Entry>,
        ArchiveContentReader<'s, S, Self::Entry>,
    )> {
        context.validate()?;
        let base = stream.stream_position()?;
        let mut header = Self::Header::default();
        let mut entries = Vec::new();
        {
            let mut s = BinarySerializer::new(&mut *stream, context, Mode::Read);
            Self::serialize_header(&mut s, &mut header, &mut entries)?;
        }
        debug!("read header with {} entries", entries.len());
        let reader = ArchiveContentReader::new(stream, base, &entries);
        Ok((header, entries, reader))
    }
}

/// Reader-side generator over an archive stream. Every call to `take` seeks
/// to the entry and returns an owned copy of its content.
///
/// Rows that compare equal describe the same bytes, so they share one key;
/// `count` still reports one entry per table row.
pub struct ArchiveContentReader<'s, S, K> {
    stream: &'s mut S,
    base: u64,
    rows: usize,
    entries: FxHashSet<K>,
}

impl<'s, S: Read + Seek, K: ArchiveEntry> ArchiveContentReader<'s, S, K> {
    pub fn new(stream: &'s mut S, base: u64, entries: &[K]) -> Self {
        ArchiveContentReader {
            stream,
            base,
            rows: entries.len(),
            entries: entries.iter().cloned().collect(),
        }
    }
}

impl<'s, S: Read + Seek, K: ArchiveEntry> ArchiveFileGenerator<K> for ArchiveContentReader<'s, S, K> {
    fn count(&self) -> usize {
        self.rows
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    fn take(&mut self, key: &K) -> Result<Vec<u8>> {
        if !self.entries.contains(key) {
            return Err(ArchiveError::UnknownGeneratorKey(format!("{:?}", key)));
        }
        let size = usize::try_from(key.size()).map_err(|_| {
            SerializerError::InvalidArgument(format!("entry size {} is too large", key.size()))
        })?;
        let offset = self.base.checked_add(key.offset()).ok_or_else(|| {
            SerializerError::InvalidArgument(format!("entry offset 0x{:x} overflows", key.offset()))
        })?;
        let end = self.stream.seek(SeekFrom::End(0))?;
        if offset.saturating_add(key.size()) > end {
            return Err(SerializerError::UnexpectedEndOfStream(offset, size).into());
        }
        self.stream.seek(SeekFrom::Start(offset))?;
        let mut content = vec![0; size];
        self.stream.read_exact(&mut content).map_err(|err| {
            if err.kind() == ErrorKind::UnexpectedEof {
                ArchiveError::from(SerializerError::UnexpectedEndOfStream(offset, size))
            } else {
                ArchiveError::from(err)
            }
        })?;
        Ok(content)
    }
}

fn align(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        value
    } else {
        (value + alignment - 1) / alignment * alignment
    }
}
