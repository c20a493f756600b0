//! Ordered (Bayer matrix) dithering.
//!
//! Each pixel is nudged by a fixed offset taken from its position in a
//! tiled Bayer matrix, then mapped to the nearest palette entry. No state
//! passes between pixels, so output depends only on the pixel and its
//! coordinates and any row order gives the same result. `spread` sets the
//! offset range in channel units; it should be close to the distance
//! between neighbouring palette colors.

use super::{check_input, Dither, DitherError, DitherOptions};
use crate::color::Color;
use crate::palette::Palette;
use rayon::prelude::*;

/// Bayer threshold matrix size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BayerSize {
    Two,
    Four,
    Eight,
}

impl BayerSize {
    pub fn side(self) -> usize {
        match self {
            BayerSize::Two => 2,
            BayerSize::Four => 4,
            BayerSize::Eight => 8,
        }
    }
}

/// Row-major Bayer matrix with values `0..side * side`.
///
/// Built by repeated doubling: each quadrant of the next matrix is
/// `4 * M + [[0, 2], [3, 1]]`.
pub fn bayer_matrix(size: BayerSize) -> Vec<u32> {
    const QUADRANT: [[u32; 2]; 2] = [[0, 2], [3, 1]];
    let mut side = 1;
    let mut m = vec![0u32];
    while side < size.side() {
        let next_side = side * 2;
        let mut next = vec![0u32; next_side * next_side];
        for (qy, offsets) in QUADRANT.iter().enumerate() {
            for (qx, &offset) in offsets.iter().enumerate() {
                for y in 0..side {
                    for x in 0..side {
                        next[(qy * side + y) * next_side + qx * side + x] = 4 * m[y * side + x] + offset;
                    }
                }
            }
        }
        side = next_side;
        m = next;
    }
    m
}

/// Ordered ditherer.
///
/// Each pixel's red, green and blue are offset by
/// `((2 m + 1) * spread) / (2 n) - spread / 2`, where `m` is the matrix
/// value at the pixel and `n` the number of matrix cells, before the nearest
/// palette entry is looked up. Alpha is left untouched. Rows run in parallel.
#[derive(Debug, Clone)]
pub struct Ordered {
    side: usize,
    offsets: Vec<i32>,
    options: DitherOptions,
}

impl Ordered {
    pub fn new(size: BayerSize, options: DitherOptions) -> Self {
        let n = (size.side() * size.side()) as i32;
        let spread = options.spread;
        let offsets = bayer_matrix(size)
            .into_iter()
            .map(|m| ((2 * m as i32 + 1) * spread) / (2 * n) - spread / 2)
            .collect();
        Self {
            side: size.side(),
            offsets,
            options,
        }
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> i32 {
        self.offsets[(y % self.side) * self.side + x % self.side]
    }
}

impl Dither for Ordered {
    fn dither(
        &self,
        image: &[Color],
        width: usize,
        height: usize,
        palette: &Palette,
    ) -> Result<Vec<u16>, DitherError> {
        check_input(image, width, height, palette)?;
        if image.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = vec![0u16; width * height];
        out.par_chunks_mut(width)
            .zip(image.par_chunks(width))
            .enumerate()
            .for_each(|(y, (row, pixels))| {
                if self.options.is_cancelled() {
                    return;
                }
                for (x, (index, &c)) in row.iter_mut().zip(pixels).enumerate() {
                    let d = self.offset(x, y);
                    let shift = |v: u8| (v as i32 + d).clamp(0, 255) as u8;
                    *index = palette.find_nearest(Color::new(shift(c.r), shift(c.g), shift(c.b), c.a));
                }
            });

        if self.options.is_cancelled() {
            return Err(DitherError::Cancelled);
        }
        Ok(out)
    }
}
