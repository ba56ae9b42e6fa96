use std::fmt;
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};

use log::{trace, warn};

use crate::bit_fields::BitFields;
use crate::endian_aware_io::{Integer, Primitive};
use crate::{Context, Endian, LengthWidth, SerializerError, StringStrategy};

type Result<T> = std::result::Result<T, SerializerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Read => write!(f, "read"),
            Mode::Write => write!(f, "write"),
        }
    }
}

/// A layout that reads and writes through the same function body.
///
/// On write every slot passed to the serializer is encoded as is; on read the
/// slot is overwritten with the decoded value.
pub trait BinarySerializable {
    fn serialize<S: Read + Write + Seek>(&mut self, s: &mut BinarySerializer<S>) -> Result<()>;
}

/// A layout that can only be read.
pub trait ReadOnlyFormat: Sized {
    fn deserialize<S: Read + Write + Seek>(s: &mut BinarySerializer<S>) -> Result<Self>;
}

pub struct BinarySerializer<'a, S> {
    stream: &'a mut S,
    context: &'a Context,
    mode: Mode,
    xor_keys: Vec<u8>,
    checksums: Vec<u8>,
}

impl<'a, S: Read + Write + Seek> BinarySerializer<'a, S> {
    pub fn new(stream: &'a mut S, context: &'a Context, mode: Mode) -> Self {
        BinarySerializer {
            stream,
            context,
            mode,
            xor_keys: Vec::new(),
            checksums: Vec::new(),
        }
    }

    pub fn context(&self) -> &'a Context {
        self.context
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_reading(&self) -> bool {
        self.mode == Mode::Read
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.stream.stream_position()?)
    }

    pub fn goto(&mut self, offset: u64) -> Result<()> {
        self.stream.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Runs `body` at `offset`, then returns to the current position.
    pub fn do_at<R, E, F>(&mut self, offset: u64, body: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<R, E>,
        E: From<SerializerError>,
    {
        let origin = self.position()?;
        self.goto(offset)?;
        let result = body(self);
        self.goto(origin)?;
        result
    }

    /// Runs `body` with every transferred byte XORed with `key`.
    ///
    /// The previous key is restored when `body` returns, whether or not it
    /// succeeded.
    pub fn with_xor<R, E, F>(&mut self, key: u8, body: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<R, E>,
    {
        self.xor_keys.push(key);
        let result = body(self);
        self.xor_keys.pop();
        result
    }

    /// Runs `body` and returns the 8-bit additive checksum of the plain bytes
    /// transferred while it ran.
    pub fn with_checksum<R, E, F>(&mut self, body: F) -> std::result::Result<(R, u8), E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<R, E>,
    {
        self.checksums.push(0);
        let result = body(self);
        let checksum = self.checksums.pop().unwrap_or(0);
        result.map(|value| (value, checksum))
    }

    fn transfer(&mut self, buffer: &mut [u8]) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        let key = self.xor_keys.last().copied().unwrap_or(0);
        match self.mode {
            Mode::Read => {
                if let Err(err) = self.stream.read_exact(buffer) {
                    return Err(self.map_read_error(err, buffer.len()));
                }
                if key != 0 {
                    buffer.iter_mut().for_each(|b| *b ^= key);
                }
                self.update_checksums(buffer);
            }
            Mode::Write => {
                self.update_checksums(buffer);
                if key != 0 {
                    let encoded: Vec<u8> = buffer.iter().map(|b| b ^ key).collect();
                    self.stream.write_all(&encoded)?;
                } else {
                    self.stream.write_all(buffer)?;
                }
            }
        }
        Ok(())
    }

    /// Fails unless `count` elements of `element_size` bytes are left in the
    /// stream. Checked before allocating room for a count read from the stream.
    fn ensure_available(&mut self, count: usize, element_size: usize, name: &str) -> Result<()> {
        if !self.is_reading() {
            return Ok(());
        }
        let needed = count.checked_mul(element_size).ok_or_else(|| {
            SerializerError::InvalidArgument(format!(
                "{}: {} elements of {} bytes overflow",
                name, count, element_size
            ))
        })?;
        let position = self.stream.stream_position()?;
        let end = self.stream.seek(SeekFrom::End(0))?;
        self.stream.seek(SeekFrom::Start(position))?;
        let available = end.saturating_sub(position);
        if (needed as u64) > available {
            return Err(SerializerError::UnexpectedEndOfStream(position, needed));
        }
        Ok(())
    }

    fn map_read_error(&mut self, err: std::io::Error, expected: usize) -> SerializerError {
        if err.kind() == ErrorKind::UnexpectedEof {
            let position = self.stream.stream_position().unwrap_or(0);
            SerializerError::UnexpectedEndOfStream(position, expected)
        } else {
            SerializerError::IOError(err)
        }
    }

    fn update_checksums(&mut self, buffer: &[u8]) {
        let sum = buffer.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        for checksum in self.checksums.iter_mut() {
            *checksum = checksum.wrapping_add(sum);
        }
    }

    pub fn serialize<T: Primitive>(&mut self, value: &mut T, name: &str) -> Result<()> {
        let mut buffer = [0u8; 8];
        let bytes = &mut buffer[..T::SIZE];
        if !self.is_reading() {
            value.write_to(self.context.endian, bytes);
        }
        self.transfer(bytes)?;
        if self.is_reading() {
            *value = T::read_from(self.context.endian, bytes);
        }
        trace!("{} {}: {:?}", self.mode, name, value);
        Ok(())
    }

    pub fn serialize_bool(&mut self, value: &mut bool, name: &str) -> Result<()> {
        let width = self.context.bool_width.bytes();
        let mut buffer = [0u8; 8];
        let bytes = &mut buffer[..width];
        if !self.is_reading() && *value {
            let one = self.context.endian.encode(1u64);
            match self.context.endian {
                Endian::Little => bytes.copy_from_slice(&one[..width]),
                Endian::Big => bytes.copy_from_slice(&one[8 - width..]),
            }
        }
        self.transfer(bytes)?;
        if self.is_reading() {
            let nonzero = bytes.iter().filter(|b| **b != 0).count();
            let canonical = match self.context.endian {
                Endian::Little => bytes[0] == 1,
                Endian::Big => bytes[width - 1] == 1,
            };
            if nonzero > 1 || (nonzero == 1 && !canonical) {
                warn!("{}: non-canonical boolean {:02X?}", name, bytes);
            }
            *value = nonzero != 0;
        }
        trace!("{} {}: {}", self.mode, name, value);
        Ok(())
    }

    fn serialize_size<L: Integer>(&mut self, length: &mut usize, name: &str) -> Result<()> {
        let mut raw = if self.is_reading() {
            L::default()
        } else {
            L::from_length(*length).ok_or_else(|| {
                SerializerError::InvalidArgument(format!(
                    "{}: length {} does not fit in {} bytes",
                    name,
                    length,
                    L::SIZE
                ))
            })?
        };
        self.serialize(&mut raw, name)?;
        if self.is_reading() {
            *length = raw.to_length().ok_or_else(|| {
                SerializerError::InvalidArgument(format!("{}: invalid length {:?}", name, raw))
            })?;
        }
        Ok(())
    }

    /// Serializes a length using the context's length width.
    pub fn serialize_length(&mut self, length: &mut usize, name: &str) -> Result<()> {
        match self.context.length_width {
            LengthWidth::U8 => self.serialize_size::<u8>(length, name),
            LengthWidth::U16 => self.serialize_size::<u16>(length, name),
            LengthWidth::U32 => self.serialize_size::<u32>(length, name),
            LengthWidth::U64 => self.serialize_size::<u64>(length, name),
        }
    }

    pub fn serialize_string(&mut self, value: &mut String, name: &str) -> Result<()> {
        let strategy = self.context.string_strategy;
        self.serialize_string_with(value, strategy, name)
    }

    pub fn serialize_fixed_string(
        &mut self,
        value: &mut String,
        width: usize,
        name: &str,
    ) -> Result<()> {
        self.serialize_string_with(value, StringStrategy::FixedPadded(width), name)
    }

    pub fn serialize_string_with(
        &mut self,
        value: &mut String,
        strategy: StringStrategy,
        name: &str,
    ) -> Result<()> {
        match strategy {
            StringStrategy::LengthPrefixed => self.length_prefixed_string(value, name)?,
            StringStrategy::NullTerminated => self.null_terminated_string(value, name)?,
            StringStrategy::FixedPadded(width) => self.fixed_padded_string(value, width, name)?,
        }
        trace!("{} {}: {:?}", self.mode, name, value);
        Ok(())
    }

    fn length_prefixed_string(&mut self, value: &mut String, name: &str) -> Result<()> {
        let encoding = self.context.encoding;
        let mut length = encoding.char_count(value);
        self.serialize_length(&mut length, name)?;
        if !self.is_reading() {
            let mut bytes = encoding.encode(value)?;
            return self.transfer(&mut bytes);
        }

        let minimum = encoding.fixed_width().unwrap_or_else(|| encoding.unit_size());
        self.ensure_available(length, minimum, name)?;
        let bytes = match encoding.fixed_width() {
            Some(width) => {
                let mut bytes = vec![0; length * width];
                self.transfer(&mut bytes)?;
                bytes
            }
            None => {
                let mut bytes = Vec::new();
                for _ in 0..length {
                    let mut lead = vec![0; encoding.unit_size()];
                    self.transfer(&mut lead)?;
                    let remaining = encoding.sequence_length(&lead).saturating_sub(lead.len());
                    let mut rest = vec![0; remaining];
                    self.transfer(&mut rest)?;
                    bytes.extend(lead);
                    bytes.extend(rest);
                }
                bytes
            }
        };
        *value = encoding.decode(&bytes)?;
        Ok(())
    }

    fn null_terminated_string(&mut self, value: &mut String, name: &str) -> Result<()> {
        let encoding = self.context.encoding;
        let unit = encoding.unit_size();
        if !self.is_reading() {
            let mut bytes = encoding.encode(value)?;
            if bytes.chunks(unit).any(|c| c.iter().all(|b| *b == 0)) {
                return Err(SerializerError::InvalidArgument(format!(
                    "{}: string contains a terminator",
                    name
                )));
            }
            bytes.resize(bytes.len() + unit, 0);
            return self.transfer(&mut bytes);
        }

        let mut bytes = Vec::new();
        let mut next = vec![0; unit];
        loop {
            self.transfer(&mut next)?;
            if next.iter().all(|b| *b == 0) {
                break;
            }
            bytes.extend_from_slice(&next);
        }
        *value = encoding.decode(&bytes)?;
        Ok(())
    }

    fn fixed_padded_string(&mut self, value: &mut String, width: usize, name: &str) -> Result<()> {
        if width == 0 {
            return Err(SerializerError::InvalidArgument(format!(
                "{}: fixed string width must be positive",
                name
            )));
        }
        let encoding = self.context.encoding;
        if !self.is_reading() {
            let mut bytes = encoding.encode(value)?;
            if bytes.len() > width {
                return Err(SerializerError::StringTooLongForFixedWidth(
                    value.clone(),
                    bytes.len(),
                    width,
                ));
            }
            bytes.resize(width, 0);
            return self.transfer(&mut bytes);
        }

        let mut bytes = vec![0; width];
        self.transfer(&mut bytes)?;
        let unit = encoding.unit_size();
        let mut end = bytes.len() - bytes.len() % unit;
        while end >= unit && bytes[end - unit..end].iter().all(|b| *b == 0) {
            end -= unit;
        }
        *value = encoding.decode(&bytes[..end])?;
        Ok(())
    }

    pub fn serialize_bytes(&mut self, bytes: &mut Vec<u8>, length: usize, name: &str) -> Result<()> {
        if self.is_reading() {
            self.ensure_available(length, 1, name)?;
            bytes.clear();
            bytes.resize(length, 0);
        } else {
            check_length(bytes.len(), length, name)?;
        }
        self.transfer(bytes)?;
        trace!("{} {}: {} bytes", self.mode, name, length);
        Ok(())
    }

    /// Zero bytes on write; on read the bytes are skipped with a warning if
    /// any of them is set.
    pub fn serialize_padding(&mut self, count: usize, name: &str) -> Result<()> {
        let mut padding = vec![0; count];
        self.transfer(&mut padding)?;
        if self.is_reading() && padding.iter().any(|b| *b != 0) {
            warn!("{}: padding is not empty: {:02X?}", name, padding);
        }
        Ok(())
    }

    pub fn serialize_array<T: Primitive>(
        &mut self,
        values: &mut Vec<T>,
        length: usize,
        name: &str,
    ) -> Result<()> {
        if self.is_reading() {
            self.ensure_available(length, T::SIZE, name)?;
            values.clear();
            values.resize(length, T::default());
        } else {
            check_length(values.len(), length, name)?;
        }
        for value in values.iter_mut() {
            self.serialize(value, name)?;
        }
        Ok(())
    }

    /// Serializes the length of `values` as an `L`. On read `values` is
    /// resized to the stored length with default elements, each of which must
    /// occupy at least one byte of the remaining stream.
    pub fn serialize_array_size<L: Integer, T: Default>(
        &mut self,
        values: &mut Vec<T>,
        name: &str,
    ) -> Result<()> {
        let mut length = values.len();
        self.serialize_size::<L>(&mut length, name)?;
        if self.is_reading() {
            self.ensure_available(length, 1, name)?;
            values.clear();
            values.resize_with(length, T::default);
        }
        Ok(())
    }

    pub fn serialize_sized_array<L: Integer, T: Primitive>(
        &mut self,
        values: &mut Vec<T>,
        name: &str,
    ) -> Result<()> {
        self.serialize_array_size::<L, T>(values, name)?;
        let length = values.len();
        self.serialize_array(values, length, name)
    }

    pub fn serialize_object<T: BinarySerializable>(&mut self, value: &mut T, name: &str) -> Result<()> {
        trace!("{} {}", self.mode, name);
        value.serialize(self)
    }

    pub fn serialize_object_array<T: BinarySerializable + Default>(
        &mut self,
        values: &mut Vec<T>,
        length: usize,
        name: &str,
    ) -> Result<()> {
        if self.is_reading() {
            self.ensure_available(length, 1, name)?;
            values.clear();
            values.resize_with(length, T::default);
        } else {
            check_length(values.len(), length, name)?;
        }
        for value in values.iter_mut() {
            self.serialize_object(value, name)?;
        }
        Ok(())
    }

    pub fn serialize_sized_object_array<L: Integer, T: BinarySerializable + Default>(
        &mut self,
        values: &mut Vec<T>,
        name: &str,
    ) -> Result<()> {
        self.serialize_array_size::<L, T>(values, name)?;
        let length = values.len();
        self.serialize_object_array(values, length, name)
    }

    pub fn read_object<T: ReadOnlyFormat>(&mut self, name: &str) -> Result<T> {
        if !self.is_reading() {
            return Err(SerializerError::InvalidArgument(format!(
                "{} can only be read",
                name
            )));
        }
        trace!("{} {}", self.mode, name);
        T::deserialize(self)
    }

    /// Packs the fields declared by `body` into a single `T`.
    pub fn serialize_bit_values<T: Integer, F>(&mut self, body: F, name: &str) -> Result<()>
    where
        F: FnOnce(&mut BitFields),
    {
        if self.is_reading() {
            let mut raw = T::default();
            self.serialize(&mut raw, name)?;
            body(&mut BitFields::reader(raw.to_bits()));
        } else {
            let mut fields = BitFields::writer();
            body(&mut fields);
            let mut raw = T::from_bits(fields.bits());
            self.serialize(&mut raw, name)?;
        }
        Ok(())
    }
}

fn check_length(actual: usize, expected: usize, name: &str) -> Result<()> {
    if actual != expected {
        Err(SerializerError::InvalidArgument(format!(
            "{}: holds {} elements but {} are declared",
            name, actual, expected
        )))
    } else {
        Ok(())
    }
}

pub fn serialize_to<T, S>(stream: &mut S, value: &mut T, context: &Context) -> Result<()>
where
    T: BinarySerializable,
    S: Read + Write + Seek,
{
    context.validate()?;
    let mut s = BinarySerializer::new(stream, context, Mode::Write);
    value.serialize(&mut s)
}

pub fn serialize<T: BinarySerializable>(value: &mut T, context: &Context) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    serialize_to(&mut cursor, value, context)?;
    Ok(cursor.into_inner())
}

pub fn deserialize_from<T, S>(stream: &mut S, context: &Context) -> Result<T>
where
    T: BinarySerializable + Default,
    S: Read + Write + Seek,
{
    context.validate()?;
    let mut s = BinarySerializer::new(stream, context, Mode::Read);
    let mut value = T::default();
    value.serialize(&mut s)?;
    Ok(value)
}

pub fn deserialize<T: BinarySerializable + Default>(bytes: &[u8], context: &Context) -> Result<T> {
    let mut cursor = Cursor::new(bytes.to_vec());
    deserialize_from(&mut cursor, context)
}

pub fn deserialize_read_only<T: ReadOnlyFormat>(bytes: &[u8], context: &Context) -> Result<T> {
    context.validate()?;
    let mut cursor = Cursor::new(bytes.to_vec());
    let mut s = BinarySerializer::new(&mut cursor, context, Mode::Read);
    T::deserialize(&mut s)
}
