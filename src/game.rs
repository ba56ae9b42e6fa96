use strum_macros::{Display, EnumString};

use crate::Endian;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString)]
pub enum Game {
    Rayman2,
    Rayman3,
    RaymanArena,
    TonicTrouble,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString)]
pub enum Platform {
    PC,
    PS2,
    Xbox,
    GameCube,
    Xbox360,
    PS3,
    Wii,
}

/// Row layout of a CNT file table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CntTableLayout {
    /// Key and checksum first, followed by a fixed 9 byte XORed file name.
    Named,
    /// Offset and size first, followed by key, checksum and 2 bytes of padding.
    Compact,
}

impl Game {
    pub fn cnt_table_layout(&self) -> CntTableLayout {
        match self {
            Game::Rayman2 | Game::TonicTrouble => CntTableLayout::Named,
            Game::Rayman3 | Game::RaymanArena => CntTableLayout::Compact,
        }
    }
}

impl Platform {
    pub fn default_endian(&self) -> Endian {
        match self {
            Platform::PC | Platform::PS2 | Platform::Xbox => Endian::Little,
            Platform::GameCube | Platform::Xbox360 | Platform::PS3 | Platform::Wii => Endian::Big,
        }
    }

    /// Whether the platform's hardware can read data stored in `endian`.
    pub fn supports(&self, endian: Endian) -> bool {
        match self {
            // Both byte orders show up in PC ports.
            Platform::PC => true,
            _ => self.default_endian() == endian,
        }
    }
}
