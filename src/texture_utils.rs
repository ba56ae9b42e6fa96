use log::debug;
use strum_macros::{Display, EnumString};

use crate::TextureError;

type Result<T> = std::result::Result<T, TextureError>;

// Tiled surfaces are built from macro tiles of 32x32 blocks.
const MACRO_TILE_BLOCKS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum TextureCompression {
    DXT1,
    DXT3,
    DXT5,
    DXT5A,
    DXN,
    A8R8G8B8,
    R5G6B5,
}

/// Memory geometry of a tiled texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiledLayout {
    /// Block dimensions in pixels.
    pub block_width: usize,
    pub block_height: usize,
    pub bytes_per_block: usize,
    /// Alignment of the surface in pixels.
    pub align_x: usize,
    pub align_y: usize,
}

impl TextureCompression {
    pub fn layout(&self) -> TiledLayout {
        let (block_width, block_height, bytes_per_block) = match self {
            TextureCompression::DXT1 | TextureCompression::DXT5A => (4, 4, 8),
            TextureCompression::DXT3 | TextureCompression::DXT5 | TextureCompression::DXN => {
                (4, 4, 16)
            }
            TextureCompression::A8R8G8B8 => (1, 1, 4),
            TextureCompression::R5G6B5 => (1, 1, 2),
        };
        TiledLayout {
            block_width,
            block_height,
            bytes_per_block,
            align_x: block_width * MACRO_TILE_BLOCKS,
            align_y: block_height * MACRO_TILE_BLOCKS,
        }
    }
}

pub fn align(value: usize, increment: usize) -> usize {
    if increment <= 1 {
        value
    } else {
        let tmp = value % increment;
        if tmp > 0 {
            value + (increment - tmp)
        } else {
            value
        }
    }
}

fn block_count(pixels: usize, block: usize) -> usize {
    (pixels + block - 1) / block
}

/// Index of block `(x, y)` inside a tiled surface whose rows are `width`
/// blocks wide, for blocks of `texel_pitch` bytes.
pub fn tiled_offset(x: usize, y: usize, width: usize, texel_pitch: usize) -> usize {
    let aligned_width = (width + 31) & !31;
    let log_bpp = (texel_pitch >> 2) + ((texel_pitch >> 1) >> (texel_pitch >> 2));
    let macro_offset = ((x >> 5) + (y >> 5) * (aligned_width >> 5)) << (log_bpp + 7);
    let micro = ((x & 7) + ((y & 6) << 2)) << log_bpp;
    let offset = macro_offset
        + ((micro & !15) << 1)
        + (micro & 15)
        + ((y & 8) << (3 + log_bpp))
        + ((y & 1) << 4);
    (((offset & !511) << 3)
        + ((offset & 448) << 2)
        + (offset & 63)
        + ((y & 16) << 7)
        + (((((y & 8) >> 2) + (x >> 3)) & 3) << 6))
        >> log_bpp
}

pub fn untile_texture(
    data: &[u8],
    width: usize,
    height: usize,
    compression: TextureCompression,
) -> Result<Vec<u8>> {
    untile(data, width, height, &compression.layout())
}

/// Rearranges tiled block data into linear row-major block order, covering
/// only the blocks of the original `width` x `height` texture.
pub fn untile(data: &[u8], width: usize, height: usize, layout: &TiledLayout) -> Result<Vec<u8>> {
    if width == 0 || height == 0 || layout.block_width == 0 || layout.block_height == 0 {
        return Err(TextureError::InvalidArgument(format!(
            "cannot untile a {}x{} texture with {}x{} blocks",
            width, height, layout.block_width, layout.block_height
        )));
    }
    let bytes_per_block = layout.bytes_per_block;
    if !bytes_per_block.is_power_of_two() || bytes_per_block > 16 {
        return Err(TextureError::InvalidArgument(format!(
            "unsupported block size of {} bytes",
            bytes_per_block
        )));
    }

    let blocks_x = block_count(width, layout.block_width);
    let blocks_y = block_count(height, layout.block_height);
    let aligned_blocks_x = block_count(align(width, layout.align_x), layout.block_width);
    let aligned_blocks_y = block_count(align(height, layout.align_y), layout.block_height);
    // Surfaces smaller than one macro tile are stored linearly at the aligned pitch.
    if aligned_blocks_x < MACRO_TILE_BLOCKS && aligned_blocks_y < MACRO_TILE_BLOCKS {
        return crop(data, aligned_blocks_x, blocks_x, blocks_y, bytes_per_block);
    }

    // 16 pixel mips share a tile with the next larger mip and sit past it.
    let sx_offset = if width == 16 && aligned_blocks_x >= 2 * blocks_x {
        blocks_x
    } else {
        0
    };
    let sy_offset = if height == 16 && aligned_blocks_y >= 2 * blocks_y {
        blocks_y
    } else {
        0
    };
    let mut output = vec![0; blocks_x * blocks_y * bytes_per_block];
    let pitch = align(aligned_blocks_x, MACRO_TILE_BLOCKS);
    let total_blocks = pitch * aligned_blocks_y;
    debug!(
        "untiling {}x{} blocks from a {}x{} tiled grid (offset {}, {})",
        blocks_x, blocks_y, pitch, aligned_blocks_y, sx_offset, sy_offset
    );

    for dy in 0..blocks_y {
        for dx in 0..blocks_x {
            let address = tiled_offset(dx + sx_offset, dy + sy_offset, pitch, bytes_per_block);
            if address >= total_blocks {
                return Err(TextureError::CorruptTexture(address, total_blocks));
            }
            let source = address * bytes_per_block;
            if source + bytes_per_block > data.len() {
                return Err(TextureError::TextureTooSmall(
                    data.len(),
                    source + bytes_per_block,
                ));
            }
            let destination = (dy * blocks_x + dx) * bytes_per_block;
            output[destination..destination + bytes_per_block]
                .copy_from_slice(&data[source..source + bytes_per_block]);
        }
    }
    Ok(output)
}

/// Keeps the first `width` blocks of the first `height` rows of a linear
/// surface whose rows are `stride` blocks wide.
pub fn crop(
    data: &[u8],
    stride: usize,
    width: usize,
    height: usize,
    bytes_per_block: usize,
) -> Result<Vec<u8>> {
    if width > stride {
        return Err(TextureError::InvalidArgument(format!(
            "crop width {} exceeds stride {}",
            width, stride
        )));
    }
    let required = ((height.saturating_sub(1)) * stride + width) * bytes_per_block;
    if height > 0 && data.len() < required {
        return Err(TextureError::TextureTooSmall(data.len(), required));
    }
    let row_length = width * bytes_per_block;
    let mut output = Vec::with_capacity(row_length * height);
    for row in 0..height {
        let base = row * stride * bytes_per_block;
        output.extend_from_slice(&data[base..base + row_length]);
    }
    Ok(output)
}

/// Swaps every pair of bytes, converting 16-bit big endian texture words.
pub fn swap_byte_pairs(data: &[u8]) -> Vec<u8> {
    let mut swapped = data.to_vec();
    for pair in swapped.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
    swapped
}
