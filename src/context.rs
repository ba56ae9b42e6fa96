use crate::{CntTableLayout, Endian, Game, Platform, SerializerError, TextEncoding};

type Result<T> = std::result::Result<T, SerializerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringStrategy {
    LengthPrefixed,
    NullTerminated,
    /// Zero padded to a fixed number of bytes.
    FixedPadded(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolWidth {
    One,
    Two,
    Four,
    Eight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthWidth {
    U8,
    U16,
    U32,
    U64,
}

impl BoolWidth {
    pub fn bytes(&self) -> usize {
        match self {
            BoolWidth::One => 1,
            BoolWidth::Two => 2,
            BoolWidth::Four => 4,
            BoolWidth::Eight => 8,
        }
    }

    pub fn from_bytes(bytes: usize) -> Result<Self> {
        match bytes {
            1 => Ok(BoolWidth::One),
            2 => Ok(BoolWidth::Two),
            4 => Ok(BoolWidth::Four),
            8 => Ok(BoolWidth::Eight),
            _ => Err(SerializerError::InvalidArgument(format!(
                "unsupported boolean width {}",
                bytes
            ))),
        }
    }
}

/// Format rules shared by every call of one serialize operation.
#[derive(Debug, Clone)]
pub struct Context {
    pub endian: Endian,
    pub encoding: TextEncoding,
    pub string_strategy: StringStrategy,
    pub bool_width: BoolWidth,
    pub length_width: LengthWidth,
    pub game: Game,
    pub platform: Platform,
}

impl Context {
    pub fn new(game: Game, platform: Platform) -> Self {
        Context {
            endian: platform.default_endian(),
            encoding: TextEncoding::Windows1252,
            string_strategy: StringStrategy::LengthPrefixed,
            bool_width: BoolWidth::One,
            length_width: LengthWidth::U32,
            game,
            platform,
        }
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_string_strategy(mut self, strategy: StringStrategy) -> Self {
        self.string_strategy = strategy;
        self
    }

    pub fn with_bool_width(mut self, width: BoolWidth) -> Self {
        self.bool_width = width;
        self
    }

    pub fn with_length_width(mut self, width: LengthWidth) -> Self {
        self.length_width = width;
        self
    }

    pub fn cnt_table_layout(&self) -> CntTableLayout {
        self.game.cnt_table_layout()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.platform.supports(self.endian) {
            return Err(SerializerError::InvalidArgument(format!(
                "{} data is never stored in {} endian",
                self.platform, self.endian
            )));
        }
        if let StringStrategy::FixedPadded(0) = self.string_strategy {
            return Err(SerializerError::InvalidArgument(
                "fixed string width must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
