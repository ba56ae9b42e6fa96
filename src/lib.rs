mod archive_generator;
mod bit_fields;
mod context;
mod encoded_strings;
mod errors;
mod game;
mod localization_table;
mod serializer;
mod texture_utils;

pub mod archive;
pub mod cnt;
pub mod endian_aware_io;

#[cfg(test)]
mod utils;

pub use archive::{ArchiveContainer, ArchiveContentReader, ArchiveEntry};
pub use archive_generator::{ArchiveFileGenerator, FileGenerator, Producer};
pub use bit_fields::{extract_bits, set_bits, BitFields};
pub use cnt::{Cnt, CntHeader, FileEntry};
pub use context::{BoolWidth, Context, LengthWidth, StringStrategy};
pub use encoded_strings::TextEncoding;
pub use endian_aware_io::{Endian, Integer, Primitive};
pub use game::{CntTableLayout, Game, Platform};
pub use localization_table::{LanguageTable, LocalizationTable, LocalizedString};
pub use serializer::{
    deserialize, deserialize_from, deserialize_read_only, serialize, serialize_to,
    BinarySerializable, BinarySerializer, Mode, ReadOnlyFormat,
};
pub use texture_utils::{
    align, swap_byte_pairs, tiled_offset, untile, untile_texture, TextureCompression, TiledLayout,
};

pub use errors::{ArchiveError, SerializerError, TextureError};
