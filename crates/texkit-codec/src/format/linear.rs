//! Linear (one value per pixel) encodings built on a [`PixelFormat`].

use super::bit_depth::Packing;
use super::{ChannelLayout, CodecError, ColorEncoding, ColorStream, ImageLayout};
use crate::color::Color;
use rayon::prelude::*;

/// Converts a single pixel between [`Color`] and its packed integer value.
pub trait PixelFormat: Send + Sync {
    fn name(&self) -> &str;
    fn channels(&self) -> ChannelLayout;
    fn packing(&self) -> &Packing;
    fn encode_color(&self, color: Color) -> u32;
    fn decode_color(&self, value: u32) -> Color;
}

/// A [`ColorEncoding`] that stores one packed value per pixel.
///
/// The swizzle in the [`ImageLayout`] reorders pixels; any swizzle accepted
/// by [`Swizzle::validate`](crate::Swizzle::validate) is supported.
#[derive(Debug, Clone)]
pub struct LinearEncoding<P> {
    format: P,
}

impl<P: PixelFormat> LinearEncoding<P> {
    pub fn new(format: P) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &P {
        &self.format
    }

    fn check(&self, data: &[u8], layout: &ImageLayout) -> Result<(), CodecError> {
        layout.swizzle.validate(layout.width, layout.height)?;
        layout.check_data(data, self.data_len(layout.width, layout.height))
    }
}

impl<P: PixelFormat> ColorEncoding for LinearEncoding<P> {
    fn name(&self) -> &str {
        self.format.name()
    }

    fn bits_per_pixel(&self) -> u32 {
        self.format.packing().bits()
    }

    fn channels(&self) -> ChannelLayout {
        self.format.channels()
    }

    fn data_len(&self, width: usize, height: usize) -> usize {
        self.format.packing().data_len(width * height)
    }

    fn decode<'a>(
        &'a self,
        data: &'a [u8],
        layout: ImageLayout,
    ) -> Result<ColorStream<'a>, CodecError> {
        self.check(data, &layout)?;
        let ImageLayout {
            width,
            height,
            swizzle,
        } = layout;
        let packing = *self.format.packing();
        Ok(Box::new((0..width * height).map(move |i| {
            let s = swizzle.index(i % width, i / width, width, height);
            self.format.decode_color(packing.read(data, s))
        })))
    }

    fn decode_all(&self, data: &[u8], layout: ImageLayout) -> Result<Vec<Color>, CodecError> {
        self.check(data, &layout)?;
        let ImageLayout {
            width,
            height,
            swizzle,
        } = layout;
        let packing = *self.format.packing();
        Ok((0..width * height)
            .into_par_iter()
            .map(|i| {
                let s = swizzle.index(i % width, i / width, width, height);
                self.format.decode_color(packing.read(data, s))
            })
            .collect())
    }

    fn encode(&self, colors: &[Color], layout: ImageLayout) -> Result<Vec<u8>, CodecError> {
        layout.check_colors(colors)?;
        let ImageLayout {
            width,
            height,
            swizzle,
        } = layout;
        swizzle.validate(width, height)?;

        let packing = self.format.packing();
        let mut out = vec![0u8; self.data_len(width, height)];
        for s in 0..width * height {
            let (x, y) = swizzle.coordinate(s, width, height);
            packing.write(&mut out, s, self.format.encode_color(colors[y * width + x]));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ComponentOrder, LaFormat, LaOrder, RgbaFormat};
    use crate::swizzle::Swizzle;
    use pretty_assertions::assert_eq;

    fn rgba8888() -> LinearEncoding<RgbaFormat> {
        LinearEncoding::new(RgbaFormat::new(8, 8, 8, 8, ComponentOrder::Rgba).unwrap())
    }

    fn gradient(w: usize, h: usize) -> Vec<Color> {
        (0..w * h)
            .map(|i| Color::new(i as u8, (i * 3) as u8, (i * 7) as u8, 255 - i as u8))
            .collect()
    }

    #[test]
    fn test_rgba8888_lossless() {
        let enc = rgba8888();
        let colors = gradient(5, 3);
        let layout = ImageLayout::new(5, 3);
        let data = enc.encode(&colors, layout).unwrap();
        assert_eq!(data.len(), 60);
        // Rgba order, little endian: alpha is the lowest byte.
        assert_eq!(&data[..4], &[255, 0, 0, 0]);
        assert_eq!(enc.decode_all(&data, layout).unwrap(), colors);
        assert_eq!(enc.decode(&data, layout).unwrap().collect::<Vec<_>>(), colors);
    }

    #[test]
    fn test_swizzled_round_trip() {
        let enc = rgba8888();
        let colors = gradient(8, 4);
        let layout = ImageLayout::new(8, 4).with_swizzle(Swizzle::Morton);
        let data = enc.encode(&colors, layout).unwrap();
        let linear = enc.encode(&colors, ImageLayout::new(8, 4)).unwrap();
        assert_ne!(data, linear);
        assert_eq!(enc.decode_all(&data, layout).unwrap(), colors);
    }

    #[test]
    fn test_four_bit_odd_pixel_count() {
        let enc = LinearEncoding::new(LaFormat::new(4, 0, LaOrder::La).unwrap());
        assert_eq!(enc.data_len(3, 1), 2);
        let colors = vec![Color::grey(0x00), Color::grey(0x88), Color::grey(0xFF)];
        let data = enc.encode(&colors, ImageLayout::new(3, 1)).unwrap();
        assert_eq!(data, vec![0x80, 0x0F]);
        assert_eq!(enc.decode_all(&data, ImageLayout::new(3, 1)).unwrap(), colors);
    }

    #[test]
    fn test_length_errors() {
        let enc = rgba8888();
        let layout = ImageLayout::new(2, 2);
        assert!(matches!(
            enc.decode(&[0; 15], layout),
            Err(CodecError::LengthMismatch {
                expected: 16,
                actual: 15,
                ..
            })
        ));
        assert!(matches!(
            enc.encode(&[Color::BLACK; 3], layout),
            Err(CodecError::ColorCountMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_image() {
        let enc = rgba8888();
        let layout = ImageLayout::new(0, 4);
        assert_eq!(enc.encode(&[], layout).unwrap(), Vec::<u8>::new());
        assert_eq!(enc.decode(&[], layout).unwrap().count(), 0);
    }
}
