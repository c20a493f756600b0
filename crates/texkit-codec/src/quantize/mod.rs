//! Palette generation with Wu's color quantizer.
//!
//! # Algorithm
//!
//! 1. Colors are counted in parallel shards and merged.
//! 2. If the image has no more distinct colors than requested, those colors
//!    become the palette in order of first appearance and the result is
//!    exact.
//! 3. Otherwise the colors go into a 4-D moment histogram (5 bits per color
//!    channel and 3 bits of alpha by default). Boxes are split greedily
//!    along the plane that maximizes between-box variance until the budget
//!    is reached or no box can be split.
//! 4. Each box contributes its mean color, and every pixel is mapped to its
//!    nearest palette entry.
//!
//! # Example
//!
//! ```
//! use texkit_codec::{Color, QuantizeOptions, WuQuantizer};
//!
//! let pixels = vec![Color::BLACK, Color::WHITE, Color::BLACK];
//! let result = WuQuantizer::new(QuantizeOptions::new(4)).quantize(&pixels).unwrap();
//! assert_eq!(result.palette.colors(), &[Color::BLACK, Color::WHITE]);
//! assert_eq!(result.indices, vec![0, 1, 0]);
//! ```

mod histogram;
mod wu;

use crate::color::Color;
use crate::palette::{Palette, MAX_PALETTE_LEN};
use histogram::Histogram;
use rayon::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

const COUNT_CHUNK: usize = 1 << 14;

/// Quantizer configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantizeError {
    #[error("palette size must be at least 1")]
    ZeroColors,

    #[error("palette size {0} exceeds the {MAX_PALETTE_LEN} colors an index can address")]
    TooManyColors(usize),

    #[error("unsupported histogram precision: {rgb_bits} color bits, {alpha_bits} alpha bits")]
    HistogramBits { rgb_bits: u32, alpha_bits: u32 },
}

/// Quantizer configuration.
///
/// # Defaults
///
/// - 256 colors
/// - 5 histogram bits per color channel, 3 for alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizeOptions {
    /// Maximum palette size.
    pub colors: usize,
    /// Histogram precision of red, green and blue (1..=6).
    pub rgb_bits: u32,
    /// Histogram precision of alpha (0..=4). Zero ignores alpha when
    /// splitting, although box means still average it.
    pub alpha_bits: u32,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            colors: 256,
            rgb_bits: 5,
            alpha_bits: 3,
        }
    }
}

impl QuantizeOptions {
    #[inline]
    pub fn new(colors: usize) -> Self {
        Self {
            colors,
            ..Self::default()
        }
    }

    #[inline]
    pub fn rgb_bits(mut self, bits: u32) -> Self {
        self.rgb_bits = bits;
        self
    }

    #[inline]
    pub fn alpha_bits(mut self, bits: u32) -> Self {
        self.alpha_bits = bits;
        self
    }

    pub fn validate(&self) -> Result<(), QuantizeError> {
        if self.colors == 0 {
            return Err(QuantizeError::ZeroColors);
        }
        if self.colors > MAX_PALETTE_LEN {
            return Err(QuantizeError::TooManyColors(self.colors));
        }
        if !(1..=6).contains(&self.rgb_bits) || self.alpha_bits > 4 {
            return Err(QuantizeError::HistogramBits {
                rgb_bits: self.rgb_bits,
                alpha_bits: self.alpha_bits,
            });
        }
        Ok(())
    }
}

/// Palette and per-pixel indices produced by a quantizer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuantizeResult {
    pub palette: Palette,
    pub indices: Vec<u16>,
}

/// Distinct colors with their pixel counts, in order of first appearance.
fn count_colors(colors: &[Color]) -> Vec<(Color, u32)> {
    let merged = colors
        .par_chunks(COUNT_CHUNK)
        .enumerate()
        .fold(HashMap::new, |mut map: HashMap<Color, (u32, usize)>, (chunk, pixels)| {
            for (i, &c) in pixels.iter().enumerate() {
                map.entry(c)
                    .or_insert((0, chunk * COUNT_CHUNK + i))
                    .0 += 1;
            }
            map
        })
        .reduce(HashMap::new, |mut acc, map| {
            for (c, (count, first)) in map {
                let entry = acc.entry(c).or_insert((0, first));
                entry.0 += count;
                entry.1 = entry.1.min(first);
            }
            acc
        });

    let mut distinct: Vec<_> = merged.into_iter().collect();
    distinct.sort_unstable_by_key(|&(_, (_, first))| first);
    distinct
        .into_iter()
        .map(|(c, (count, _))| (c, count))
        .collect()
}

/// Map every pixel to its nearest palette entry, in parallel.
pub fn remap(colors: &[Color], palette: &Palette) -> Vec<u16> {
    colors.par_iter().map(|&c| palette.find_nearest(c)).collect()
}

/// Wu's variance-minimizing color quantizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WuQuantizer {
    options: QuantizeOptions,
}

impl WuQuantizer {
    pub fn new(options: QuantizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &QuantizeOptions {
        &self.options
    }

    /// Build a palette of at most `options.colors` entries and index every
    /// pixel into it. Output is deterministic for a given input.
    pub fn quantize(&self, colors: &[Color]) -> Result<QuantizeResult, QuantizeError> {
        self.options.validate()?;
        if colors.is_empty() {
            return Ok(QuantizeResult::default());
        }

        let distinct = count_colors(colors);
        if distinct.len() <= self.options.colors {
            debug!(pixels = colors.len(), distinct = distinct.len(), "palette is exact");
            let lookup: HashMap<Color, u16> = distinct
                .iter()
                .enumerate()
                .map(|(i, &(c, _))| (c, i as u16))
                .collect();
            let indices = colors
                .par_iter()
                .map(|c| lookup.get(c).copied().unwrap_or(0))
                .collect();
            let palette = Palette::new(distinct.into_iter().map(|(c, _)| c).collect())
                .map_err(|_| QuantizeError::TooManyColors(self.options.colors))?;
            return Ok(QuantizeResult { palette, indices });
        }

        let mut hist = Histogram::new(self.options.rgb_bits, self.options.alpha_bits);
        for &(c, count) in &distinct {
            hist.add(c, count);
        }
        hist.accumulate();

        let boxes = wu::partition(&hist, self.options.colors);
        let entries: Vec<Color> = boxes
            .iter()
            .map(|b| hist.volume(b))
            .filter(|m| m.w > 0)
            .map(|m| m.mean())
            .collect();
        debug!(
            pixels = colors.len(),
            distinct = distinct.len(),
            palette = entries.len(),
            "quantized"
        );

        let palette =
            Palette::new(entries).map_err(|_| QuantizeError::TooManyColors(self.options.colors))?;
        let indices = remap(colors, &palette);
        Ok(QuantizeResult { palette, indices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn squared_error(colors: &[Color], result: &QuantizeResult) -> u64 {
        colors
            .iter()
            .zip(&result.indices)
            .map(|(&c, &i)| c.distance_sq(result.palette.colors()[i as usize]) as u64)
            .sum()
    }

    #[test]
    fn test_empty_input() {
        let result = WuQuantizer::default().quantize(&[]).unwrap();
        assert!(result.palette.is_empty());
        assert!(result.indices.is_empty());
    }

    #[test]
    fn test_zero_colors_rejected() {
        let q = WuQuantizer::new(QuantizeOptions::new(0));
        assert_eq!(q.quantize(&[Color::BLACK]), Err(QuantizeError::ZeroColors));
    }

    #[test]
    fn test_too_many_colors_rejected() {
        let q = WuQuantizer::new(QuantizeOptions::new(MAX_PALETTE_LEN + 1));
        assert_eq!(
            q.quantize(&[Color::BLACK]),
            Err(QuantizeError::TooManyColors(MAX_PALETTE_LEN + 1))
        );
        assert!(QuantizeOptions::new(MAX_PALETTE_LEN).validate().is_ok());
    }

    #[test]
    fn test_histogram_bits_validated() {
        assert!(QuantizeOptions::new(4).rgb_bits(0).validate().is_err());
        assert!(QuantizeOptions::new(4).rgb_bits(7).validate().is_err());
        assert!(QuantizeOptions::new(4).alpha_bits(5).validate().is_err());
        assert!(QuantizeOptions::new(4).alpha_bits(0).validate().is_ok());
    }

    #[test]
    fn test_exact_palette_in_first_appearance_order() {
        let red = Color::rgb(255, 0, 0);
        let blue = Color::rgb(0, 0, 255);
        let green = Color::rgb(0, 255, 0);
        let pixels = [red, blue, red, green];
        let result = WuQuantizer::new(QuantizeOptions::new(4)).quantize(&pixels).unwrap();
        assert_eq!(result.palette.colors(), &[red, blue, green]);
        assert_eq!(result.indices, vec![0, 1, 0, 2]);
    }

    #[test]
    fn test_first_appearance_across_chunks() {
        let mut pixels = vec![Color::grey(9); COUNT_CHUNK * 2 + 5];
        pixels[COUNT_CHUNK + 3] = Color::grey(1);
        pixels[COUNT_CHUNK * 2 + 1] = Color::grey(2);
        let result = WuQuantizer::new(QuantizeOptions::new(8)).quantize(&pixels).unwrap();
        assert_eq!(
            result.palette.colors(),
            &[Color::grey(9), Color::grey(1), Color::grey(2)]
        );
    }

    #[test]
    fn test_clusters_become_box_means() {
        let mut pixels = Vec::new();
        for base in [Color::rgb(200, 0, 0), Color::rgb(0, 200, 0), Color::rgb(0, 0, 200)] {
            let bumped = Color::rgb(
                base.r.saturating_add(base.r / 100),
                base.g.saturating_add(base.g / 100),
                base.b.saturating_add(base.b / 100),
            );
            for _ in 0..10 {
                pixels.push(base);
                pixels.push(bumped);
            }
        }
        let result = WuQuantizer::new(QuantizeOptions::new(3)).quantize(&pixels).unwrap();
        let colors = result.palette.colors();
        assert_eq!(colors.len(), 3);
        assert!(colors.contains(&Color::rgb(201, 0, 0)));
        assert!(colors.contains(&Color::rgb(0, 201, 0)));
        assert!(colors.contains(&Color::rgb(0, 0, 201)));
    }

    #[test]
    fn test_colors_in_one_cell_merge() {
        let pixels = [Color::grey(0), Color::grey(1), Color::grey(2)];
        let result = WuQuantizer::new(QuantizeOptions::new(2)).quantize(&pixels).unwrap();
        assert_eq!(result.palette.colors(), &[Color::grey(1)]);
        assert_eq!(result.indices, vec![0, 0, 0]);
    }

    #[test]
    fn test_more_colors_means_less_error() {
        let pixels: Vec<_> = (0..=255u8).map(Color::grey).collect();
        let coarse = WuQuantizer::new(QuantizeOptions::new(4)).quantize(&pixels).unwrap();
        let fine = WuQuantizer::new(QuantizeOptions::new(16)).quantize(&pixels).unwrap();
        assert!(coarse.palette.len() <= 4);
        assert!(fine.palette.len() <= 16);
        assert!(squared_error(&pixels, &fine) < squared_error(&pixels, &coarse));
    }

    #[test]
    fn test_deterministic() {
        let pixels: Vec<_> = (0..4096u32)
            .map(|i| Color::new((i * 7) as u8, (i * 13) as u8, (i * 29) as u8, (i * 3) as u8))
            .collect();
        let q = WuQuantizer::new(QuantizeOptions::new(32));
        let a = q.quantize(&pixels).unwrap();
        let b = q.quantize(&pixels).unwrap();
        assert_eq!(a, b);
        assert!(a.palette.len() <= 32);
        assert!(a.indices.iter().all(|&i| (i as usize) < a.palette.len()));
    }
}
