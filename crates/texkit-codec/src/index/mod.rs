//! Palette-indexed pixel encodings.
//!
//! Each pixel stores a palette index and, optionally, its own alpha:
//!
//! | name | bits | layout (MSB first) |
//! |---|---|---|
//! | I2 | 2 | index |
//! | I4 | 4 | index |
//! | I8 | 8 | index |
//! | AI44 | 8 | alpha 4, index 4 |
//! | IA44 | 8 | index 4, alpha 4 |
//! | AI53 | 8 | alpha 5, index 3 |
//! | IA53 | 8 | index 5, alpha 3 |
//!
//! Pixels narrower than a byte are packed starting at the least significant
//! bit. Alpha is truncated on encode and bit-replicated on decode, like the
//! bit-depth formats.

use crate::color::{bits, Color};
use crate::format::{CodecError, FormatError, ImageLayout};
use crate::palette::Palette;

/// Which field takes the high bits of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexOrder {
    #[default]
    AlphaHigh,
    IndexHigh,
}

/// Packs palette indices (and optional per-pixel alpha) into bytes.
pub trait IndexEncoding: Send + Sync {
    fn name(&self) -> &str;

    fn bits_per_pixel(&self) -> u32;

    /// Width of the index field; palettes may hold up to `2^index_bits`
    /// colors.
    fn index_bits(&self) -> u32;

    fn data_len(&self, width: usize, height: usize) -> usize;

    /// Pack `indices`. `colors` supplies per-pixel alpha and may be empty
    /// for formats without an alpha field.
    fn encode(
        &self,
        indices: &[u16],
        colors: &[Color],
        layout: ImageLayout,
    ) -> Result<Vec<u8>, CodecError>;

    /// Unpack the index field of every pixel, row-major.
    fn decode_indices(&self, data: &[u8], layout: ImageLayout) -> Result<Vec<u16>, CodecError>;

    /// Unpack and resolve every pixel against `palette`.
    fn decode(
        &self,
        data: &[u8],
        palette: &Palette,
        layout: ImageLayout,
    ) -> Result<Vec<Color>, CodecError>;
}

/// A concrete index layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFormat {
    index_bits: u32,
    alpha_bits: u32,
    order: IndexOrder,
    name: String,
}

impl IndexFormat {
    /// Index and alpha must together fill 1, 2, 4 or 8 bits, with at least
    /// one index bit.
    pub fn new(index_bits: u32, alpha_bits: u32, order: IndexOrder) -> Result<Self, FormatError> {
        let total = index_bits + alpha_bits;
        if index_bits == 0 || !matches!(total, 1 | 2 | 4 | 8) {
            return Err(FormatError::UnsupportedIndexLayout {
                index_bits,
                alpha_bits,
            });
        }
        let name = match (alpha_bits, order) {
            (0, _) => format!("I{index_bits}"),
            (a, IndexOrder::AlphaHigh) => format!("AI{a}{index_bits}"),
            (a, IndexOrder::IndexHigh) => format!("IA{index_bits}{a}"),
        };
        Ok(Self {
            index_bits,
            alpha_bits,
            order,
            name,
        })
    }

    pub fn alpha_bits(&self) -> u32 {
        self.alpha_bits
    }

    pub fn order(&self) -> IndexOrder {
        self.order
    }

    #[inline]
    fn pixel_bits(&self) -> u32 {
        self.index_bits + self.alpha_bits
    }

    fn pack(&self, index: u16, alpha: u8) -> u32 {
        let a = bits::truncate(alpha, self.alpha_bits);
        match self.order {
            IndexOrder::AlphaHigh => (a << self.index_bits) | index as u32,
            IndexOrder::IndexHigh => ((index as u32) << self.alpha_bits) | a,
        }
    }

    fn unpack(&self, value: u32) -> (u16, u8) {
        let (index, alpha) = match self.order {
            IndexOrder::AlphaHigh => (value & mask(self.index_bits), value >> self.index_bits),
            IndexOrder::IndexHigh => (value >> self.alpha_bits, value & mask(self.alpha_bits)),
        };
        (index as u16, bits::expand(alpha, self.alpha_bits))
    }

    fn read(&self, data: &[u8], pixel: usize) -> u32 {
        let width = self.pixel_bits() as usize;
        let offset = pixel * width;
        (data[offset / 8] as u32 >> (offset % 8)) & mask(self.pixel_bits())
    }

    fn write(&self, out: &mut [u8], pixel: usize, value: u32) {
        let width = self.pixel_bits() as usize;
        let offset = pixel * width;
        out[offset / 8] |= (value << (offset % 8)) as u8;
    }

    fn check(&self, data: &[u8], layout: &ImageLayout) -> Result<(), CodecError> {
        layout.swizzle.validate(layout.width, layout.height)?;
        layout.check_data(data, self.data_len(layout.width, layout.height))
    }

    /// Stored value of every pixel, in row-major order.
    fn values<'a>(&'a self, data: &'a [u8], layout: ImageLayout) -> impl Iterator<Item = u32> + 'a {
        (0..layout.pixel_count()).map(move |i| {
            let (x, y) = (i % layout.width, i / layout.width);
            let stored = layout.swizzle.index(x, y, layout.width, layout.height);
            self.read(data, stored)
        })
    }
}

#[inline]
fn mask(bits: u32) -> u32 {
    (1u32 << bits) - 1
}

impl IndexEncoding for IndexFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn bits_per_pixel(&self) -> u32 {
        self.pixel_bits()
    }

    fn index_bits(&self) -> u32 {
        self.index_bits
    }

    fn data_len(&self, width: usize, height: usize) -> usize {
        (width * height * self.pixel_bits() as usize).div_ceil(8)
    }

    fn encode(
        &self,
        indices: &[u16],
        colors: &[Color],
        layout: ImageLayout,
    ) -> Result<Vec<u8>, CodecError> {
        layout.swizzle.validate(layout.width, layout.height)?;
        if indices.len() != layout.pixel_count() {
            return Err(CodecError::ColorCountMismatch {
                expected: layout.pixel_count(),
                actual: indices.len(),
                width: layout.width,
                height: layout.height,
            });
        }
        if self.alpha_bits > 0 {
            layout.check_colors(colors)?;
        }

        let mut out = vec![0u8; self.data_len(layout.width, layout.height)];
        for stored in 0..layout.pixel_count() {
            let (x, y) = layout.swizzle.coordinate(stored, layout.width, layout.height);
            let i = y * layout.width + x;
            let index = indices[i];
            if index as u32 > mask(self.index_bits) {
                return Err(FormatError::IndexOutOfRange {
                    index,
                    bits: self.index_bits,
                }
                .into());
            }
            let alpha = colors.get(i).map_or(255, |c| c.a);
            self.write(&mut out, stored, self.pack(index, alpha));
        }
        Ok(out)
    }

    fn decode_indices(&self, data: &[u8], layout: ImageLayout) -> Result<Vec<u16>, CodecError> {
        self.check(data, &layout)?;
        Ok(self.values(data, layout).map(|v| self.unpack(v).0).collect())
    }

    fn decode(
        &self,
        data: &[u8],
        palette: &Palette,
        layout: ImageLayout,
    ) -> Result<Vec<Color>, CodecError> {
        self.check(data, &layout)?;
        self.values(data, layout)
            .map(|v| -> Result<Color, CodecError> {
                let (index, alpha) = self.unpack(v);
                let color = palette
                    .get(index as usize)
                    .ok_or(FormatError::IndexOutsidePalette {
                        index: index as usize,
                        palette_len: palette.len(),
                    })?;
                Ok(if self.alpha_bits > 0 {
                    color.with_alpha(alpha)
                } else {
                    color
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swizzle::Swizzle;
    use pretty_assertions::assert_eq;

    fn greys(n: usize) -> Palette {
        Palette::new((0..n).map(|i| Color::grey((i * 16) as u8)).collect()).unwrap()
    }

    #[test]
    fn test_names() {
        let name = |i, a, o| IndexFormat::new(i, a, o).unwrap().name().to_string();
        assert_eq!(name(4, 0, IndexOrder::AlphaHigh), "I4");
        assert_eq!(name(4, 4, IndexOrder::AlphaHigh), "AI44");
        assert_eq!(name(3, 5, IndexOrder::AlphaHigh), "AI53");
        assert_eq!(name(5, 3, IndexOrder::IndexHigh), "IA53");
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(IndexFormat::new(0, 4, IndexOrder::AlphaHigh).is_err());
        assert!(IndexFormat::new(3, 0, IndexOrder::AlphaHigh).is_err());
        assert!(IndexFormat::new(8, 8, IndexOrder::AlphaHigh).is_err());
    }

    #[test]
    fn test_i2_packs_lsb_first() {
        let f = IndexFormat::new(2, 0, IndexOrder::AlphaHigh).unwrap();
        let data = f.encode(&[1, 2, 3, 0, 3], &[], ImageLayout::new(5, 1)).unwrap();
        assert_eq!(data, vec![0b00_11_10_01, 0b11]);
        assert_eq!(f.decode_indices(&data, ImageLayout::new(5, 1)).unwrap(), vec![1, 2, 3, 0, 3]);
    }

    #[test]
    fn test_i4_length_and_decode() {
        let f = IndexFormat::new(4, 0, IndexOrder::AlphaHigh).unwrap();
        assert_eq!(f.data_len(3, 3), 5);
        let data = f.encode(&[15, 0, 7], &[], ImageLayout::new(3, 1)).unwrap();
        assert_eq!(data, vec![0x0F, 0x07]);
        let colors = f.decode(&data, &greys(16), ImageLayout::new(3, 1)).unwrap();
        assert_eq!(colors, vec![Color::grey(240), Color::grey(0), Color::grey(112)]);
    }

    #[test]
    fn test_ai44_alpha_high() {
        let f = IndexFormat::new(4, 4, IndexOrder::AlphaHigh).unwrap();
        let colors = [Color::new(0, 0, 0, 0xA7)];
        let data = f.encode(&[3], &colors, ImageLayout::new(1, 1)).unwrap();
        assert_eq!(data, vec![0xA3]);
        let out = f.decode(&data, &greys(4), ImageLayout::new(1, 1)).unwrap();
        assert_eq!(out, vec![Color::new(48, 48, 48, 0xAA)]);
    }

    #[test]
    fn test_ia53_index_high() {
        let f = IndexFormat::new(5, 3, IndexOrder::IndexHigh).unwrap();
        let colors = [Color::new(0, 0, 0, 255)];
        let data = f.encode(&[17], &colors, ImageLayout::new(1, 1)).unwrap();
        assert_eq!(data, vec![(17 << 3) | 7]);
        assert_eq!(f.decode_indices(&data, ImageLayout::new(1, 1)).unwrap(), vec![17]);
    }

    #[test]
    fn test_index_out_of_range() {
        let f = IndexFormat::new(3, 5, IndexOrder::AlphaHigh).unwrap();
        let err = f
            .encode(&[8], &[Color::BLACK], ImageLayout::new(1, 1))
            .unwrap_err();
        assert_eq!(err, CodecError::Format(FormatError::IndexOutOfRange { index: 8, bits: 3 }));
    }

    #[test]
    fn test_index_outside_palette() {
        let f = IndexFormat::new(8, 0, IndexOrder::AlphaHigh).unwrap();
        let err = f.decode(&[9], &greys(4), ImageLayout::new(1, 1)).unwrap_err();
        assert_eq!(
            err,
            CodecError::Format(FormatError::IndexOutsidePalette {
                index: 9,
                palette_len: 4
            })
        );
    }

    #[test]
    fn test_missing_alpha_source() {
        let f = IndexFormat::new(4, 4, IndexOrder::AlphaHigh).unwrap();
        assert!(matches!(
            f.encode(&[0, 1], &[], ImageLayout::new(2, 1)),
            Err(CodecError::ColorCountMismatch { .. })
        ));
    }

    #[test]
    fn test_swizzled_round_trip() {
        let f = IndexFormat::new(8, 0, IndexOrder::AlphaHigh).unwrap();
        let layout = ImageLayout::new(4, 4).with_swizzle(Swizzle::Morton);
        let indices: Vec<u16> = (0..16).collect();
        let data = f.encode(&indices, &[], layout).unwrap();
        // Stored order is Morton: (1, 0) comes second, (0, 1) third.
        assert_eq!(&data[..4], &[0, 1, 4, 5]);
        assert_eq!(f.decode_indices(&data, layout).unwrap(), indices);
    }
}
