//! Ordered color palettes and nearest-color lookup.
//!
//! A [`Palette`] is produced by the quantizer and consumed by the ditherer
//! and the index encodings. Index order is authoritative: index `i` of an
//! index sequence refers to `palette.colors()[i]`.

use crate::color::Color;
use thiserror::Error;

/// Largest palette an index sequence (`u16`) can address.
pub const MAX_PALETTE_LEN: usize = 1 << 16;

/// Palette construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    #[error("palette has {0} colors, at most {MAX_PALETTE_LEN} are addressable")]
    TooManyColors(usize),
}

/// An ordered list of at most [`MAX_PALETTE_LEN`] colors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Result<Self, PaletteError> {
        if colors.len() > MAX_PALETTE_LEN {
            return Err(PaletteError::TooManyColors(colors.len()));
        }
        Ok(Self { colors })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    /// Index of the entry closest to `color` by squared RGBA distance.
    ///
    /// Ties resolve to the lowest index. An empty palette returns 0.
    pub fn find_nearest(&self, color: Color) -> u16 {
        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (i, &c) in self.colors.iter().enumerate() {
            let d = color.distance_sq(c);
            if d < best_dist {
                best = i;
                best_dist = d;
                if d == 0 {
                    break;
                }
            }
        }
        best as u16
    }

    /// Map an index sequence back to colors. Out-of-range indices yield
    /// `None`.
    pub fn resolve(&self, indices: &[u16]) -> Option<Vec<Color>> {
        indices.iter().map(|&i| self.get(i as usize)).collect()
    }
}
