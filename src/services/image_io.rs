//! PNG input and output for RGBA images.

use crate::error::ImageError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use texkit_codec::Color;

/// Row-major RGBA image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Color>,
}

impl RgbaImage {
    pub fn new(width: usize, height: usize, pixels: Vec<Color>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Decode a PNG of any color type and bit depth to 8-bit RGBA.
///
/// Palette and low bit depth images are expanded, 16-bit channels are
/// reduced to their high byte.
pub fn decode_png<R: Read>(reader: R) -> Result<RgbaImage, ImageError> {
    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;

    if info.bit_depth != png::BitDepth::Eight {
        return Err(ImageError::UnsupportedLayout(format!(
            "{:?} bit samples after expansion",
            info.bit_depth
        )));
    }

    let (width, height) = (info.width as usize, info.height as usize);
    let data = &buf[..info.buffer_size()];
    let pixels: Vec<Color> = match info.color_type {
        png::ColorType::Rgba => data
            .chunks_exact(4)
            .map(|p| Color::new(p[0], p[1], p[2], p[3]))
            .collect(),
        png::ColorType::Rgb => data
            .chunks_exact(3)
            .map(|p| Color::rgb(p[0], p[1], p[2]))
            .collect(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .map(|p| Color::grey(p[0]).with_alpha(p[1]))
            .collect(),
        png::ColorType::Grayscale => data.iter().map(|&l| Color::grey(l)).collect(),
        png::ColorType::Indexed => {
            return Err(ImageError::UnsupportedLayout(
                "indexed color was not expanded".to_string(),
            ))
        }
    };

    if pixels.len() != width * height {
        return Err(ImageError::PngDecode(format!(
            "expected {} pixels, decoded {}",
            width * height,
            pixels.len()
        )));
    }
    tracing::debug!(width, height, color_type = ?info.color_type, "Decoded PNG");
    Ok(RgbaImage::new(width, height, pixels))
}

/// Encode an image as 8-bit RGBA PNG.
pub fn encode_png<W: Write>(writer: W, image: &RgbaImage) -> Result<(), ImageError> {
    let too_large = || ImageError::TooLarge {
        width: image.width.min(u32::MAX as usize) as u32,
        height: image.height.min(u32::MAX as usize) as u32,
    };
    let width = u32::try_from(image.width).map_err(|_| too_large())?;
    let height = u32::try_from(image.height).map_err(|_| too_large())?;

    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    let data: Vec<u8> = image.pixels.iter().flat_map(|c| c.to_array()).collect();
    writer.write_image_data(&data)?;
    writer.finish()?;
    Ok(())
}

pub fn read_png(path: &Path) -> Result<RgbaImage, ImageError> {
    let file = File::open(path)?;
    decode_png(BufReader::new(file))
}

pub fn write_png(path: &Path, image: &RgbaImage) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_png(&mut writer, image)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn encode_raw(width: u32, height: u32, color: png::ColorType, depth: png::BitDepth, data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buf, width, height);
            encoder.set_color(color);
            encoder.set_depth(depth);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        buf
    }

    #[test]
    fn test_rgba_round_trip() {
        let image = RgbaImage::new(
            2,
            2,
            vec![
                Color::new(1, 2, 3, 4),
                Color::new(250, 0, 10, 255),
                Color::TRANSPARENT,
                Color::WHITE,
            ],
        );
        let mut buf = Vec::new();
        encode_png(&mut buf, &image).unwrap();
        assert_eq!(decode_png(Cursor::new(buf)).unwrap(), image);
    }

    #[test]
    fn test_rgb_is_opaque() {
        let bytes = encode_raw(2, 1, png::ColorType::Rgb, png::BitDepth::Eight, &[10, 20, 30, 40, 50, 60]);
        let image = decode_png(Cursor::new(bytes)).unwrap();
        assert_eq!(image.pixels, vec![Color::rgb(10, 20, 30), Color::rgb(40, 50, 60)]);
    }

    #[test]
    fn test_grayscale_alpha() {
        let bytes = encode_raw(1, 1, png::ColorType::GrayscaleAlpha, png::BitDepth::Eight, &[77, 128]);
        let image = decode_png(Cursor::new(bytes)).unwrap();
        assert_eq!(image.pixels, vec![Color::new(77, 77, 77, 128)]);
    }

    #[test]
    fn test_low_bit_depth_grayscale_expands() {
        // 1-bit: 0b1000_0000 is one white pixel followed by black
        let bytes = encode_raw(2, 1, png::ColorType::Grayscale, png::BitDepth::One, &[0b1000_0000]);
        let image = decode_png(Cursor::new(bytes)).unwrap();
        assert_eq!(image.pixels, vec![Color::WHITE, Color::BLACK]);
    }

    #[test]
    fn test_sixteen_bit_is_stripped() {
        let bytes = encode_raw(1, 1, png::ColorType::Grayscale, png::BitDepth::Sixteen, &[0xAB, 0xCD]);
        let image = decode_png(Cursor::new(bytes)).unwrap();
        assert_eq!(image.pixels, vec![Color::grey(0xAB)]);
    }

    #[test]
    fn test_garbage_rejected() {
        let err = decode_png(Cursor::new(b"not a png".to_vec())).unwrap_err();
        assert!(matches!(err, ImageError::PngDecode(_)), "{err}");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");
        let image = RgbaImage::new(3, 1, vec![Color::BLACK, Color::grey(128), Color::WHITE]);
        write_png(&path, &image).unwrap();
        assert_eq!(read_png(&path).unwrap(), image);
    }

    #[test]
    fn test_missing_file() {
        let err = read_png(Path::new("/nonexistent/texkit/input.png")).unwrap_err();
        assert!(matches!(err, ImageError::Io(_)));
    }
}
