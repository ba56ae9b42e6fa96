use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializerError {
    #[error("Stream ended at 0x{0:x} while {1} more bytes were expected.")]
    UnexpectedEndOfStream(u64, usize),

    #[error("String '{0}' needs {1} bytes but the field is only {2} bytes wide.")]
    StringTooLongForFixedWidth(String, usize, usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to encode string {0} with encoding {1}.")]
    EncodingFailed(String, String),

    #[error("Unable to decode {0} string.")]
    DecodingFailed(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Generator holds {0} entries but {1} entries are about to be written.")]
    GeneratorCountMismatch(usize, usize),

    #[error("No generator entry exists for '{0}'.")]
    UnknownGeneratorKey(String),

    #[error("Generator entry '{0}' was already consumed.")]
    GeneratorKeyConsumed(String),

    #[error("Generator already holds an entry for '{0}'.")]
    DuplicateGeneratorKey(String),

    #[error("Entry '{0}' at offset 0x{1:x} overlaps the header, which ends at 0x{2:x}.")]
    OffsetInsideHeader(String, u64, u64),

    #[error("Measured header size 0x{0:x} differs from the written header size 0x{1:x}.")]
    HeaderSizeDiverged(u64, u64),

    #[error("Entry '{0}' declares {1} bytes but its content is {2} bytes long.")]
    SizeMismatch(String, u64, usize),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    SerializerError(#[from] SerializerError),
}

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Tiled block address {0} is outside a tile holding {1} blocks.")]
    CorruptTexture(usize, usize),

    #[error("Texture data is {0} bytes but {1} bytes are required.")]
    TextureTooSmall(usize, usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
