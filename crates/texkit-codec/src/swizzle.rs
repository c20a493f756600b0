//! Mapping between row-major element coordinates and storage order.
//!
//! Consoles store textures in hardware-friendly orders: fixed-size tiles,
//! Z-order (Morton) curves, or Morton order inside tiles. A [`Swizzle`] maps
//! an element's `(x, y)` coordinate in a `width x height` grid to its index in
//! the stored stream, and back. For linear pixel formats the elements are
//! pixels; block formats swizzle whole blocks.
//!
//! Every variant is a bijection on `0..width * height` once
//! [`Swizzle::validate`] has accepted the dimensions.

use thiserror::Error;

/// Swizzle configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwizzleError {
    #[error("morton order needs power-of-two dimensions, got {width}x{height}")]
    NotPowerOfTwo { width: usize, height: usize },

    #[error("{width}x{height} is not a multiple of the {tile_width}x{tile_height} tile")]
    NotTileMultiple {
        width: usize,
        height: usize,
        tile_width: usize,
        tile_height: usize,
    },

    #[error("invalid tile size {tile_width}x{tile_height}")]
    InvalidTile {
        tile_width: usize,
        tile_height: usize,
    },
}

/// Element ordering of a stored texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Swizzle {
    /// Row-major, no reordering.
    #[default]
    Linear,
    /// Row-major tiles, row-major elements inside each tile.
    Tiled {
        tile_width: usize,
        tile_height: usize,
    },
    /// Z-order curve with x in the even bits and y in the odd bits.
    ///
    /// For non-square grids the curve covers the largest square and the
    /// remaining high bits of the longer axis select the square.
    Morton,
    /// Row-major square tiles with Morton order inside each tile.
    MortonTiled { tile: usize },
}

impl Swizzle {
    /// Check that `width x height` can be addressed by this swizzle.
    ///
    /// Empty grids are always accepted.
    pub fn validate(&self, width: usize, height: usize) -> Result<(), SwizzleError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        match *self {
            Swizzle::Linear => Ok(()),
            Swizzle::Tiled {
                tile_width,
                tile_height,
            } => check_tiles(width, height, tile_width, tile_height),
            Swizzle::Morton => {
                if width.is_power_of_two() && height.is_power_of_two() {
                    Ok(())
                } else {
                    Err(SwizzleError::NotPowerOfTwo { width, height })
                }
            }
            Swizzle::MortonTiled { tile } => {
                if !tile.is_power_of_two() {
                    return Err(SwizzleError::InvalidTile {
                        tile_width: tile,
                        tile_height: tile,
                    });
                }
                check_tiles(width, height, tile, tile)
            }
        }
    }

    /// Stream index of the element at `(x, y)`.
    pub fn index(&self, x: usize, y: usize, width: usize, height: usize) -> usize {
        match *self {
            Swizzle::Linear => y * width + x,
            Swizzle::Tiled {
                tile_width,
                tile_height,
            } => {
                let tiles_per_row = width / tile_width;
                let tile = (y / tile_height) * tiles_per_row + x / tile_width;
                let within = (y % tile_height) * tile_width + x % tile_width;
                tile * tile_width * tile_height + within
            }
            Swizzle::Morton => morton_index(x, y, width, height),
            Swizzle::MortonTiled { tile } => {
                let tiles_per_row = width / tile;
                let t = (y / tile) * tiles_per_row + x / tile;
                t * tile * tile + morton_index(x % tile, y % tile, tile, tile)
            }
        }
    }

    /// Coordinate of the element stored at `index`.
    pub fn coordinate(&self, index: usize, width: usize, height: usize) -> (usize, usize) {
        match *self {
            Swizzle::Linear => (index % width, index / width),
            Swizzle::Tiled {
                tile_width,
                tile_height,
            } => {
                let tiles_per_row = width / tile_width;
                let tile_area = tile_width * tile_height;
                let (tile, within) = (index / tile_area, index % tile_area);
                (
                    (tile % tiles_per_row) * tile_width + within % tile_width,
                    (tile / tiles_per_row) * tile_height + within / tile_width,
                )
            }
            Swizzle::Morton => morton_coordinate(index, width, height),
            Swizzle::MortonTiled { tile } => {
                let tiles_per_row = width / tile;
                let area = tile * tile;
                let (t, within) = (index / area, index % area);
                let (x, y) = morton_coordinate(within, tile, tile);
                (
                    (t % tiles_per_row) * tile + x,
                    (t / tiles_per_row) * tile + y,
                )
            }
        }
    }
}

fn check_tiles(
    width: usize,
    height: usize,
    tile_width: usize,
    tile_height: usize,
) -> Result<(), SwizzleError> {
    if tile_width == 0 || tile_height == 0 {
        return Err(SwizzleError::InvalidTile {
            tile_width,
            tile_height,
        });
    }
    if width % tile_width != 0 || height % tile_height != 0 {
        return Err(SwizzleError::NotTileMultiple {
            width,
            height,
            tile_width,
            tile_height,
        });
    }
    Ok(())
}

fn morton_index(x: usize, y: usize, width: usize, height: usize) -> usize {
    let bits = width.min(height).trailing_zeros();
    let mut index = 0;
    for i in 0..bits {
        index |= ((x >> i) & 1) << (2 * i);
        index |= ((y >> i) & 1) << (2 * i + 1);
    }
    let high = if width > height { x >> bits } else { y >> bits };
    index | (high << (2 * bits))
}

fn morton_coordinate(index: usize, width: usize, height: usize) -> (usize, usize) {
    let bits = width.min(height).trailing_zeros();
    let (mut x, mut y) = (0, 0);
    for i in 0..bits {
        x |= ((index >> (2 * i)) & 1) << i;
        y |= ((index >> (2 * i + 1)) & 1) << i;
    }
    let high = index >> (2 * bits);
    if width > height {
        x |= high << bits;
    } else {
        y |= high << bits;
    }
    (x, y)
}
