//! Test images.

use texkit::services::RgbaImage;
use texkit_codec::Color;

/// Horizontal red ramp over a vertical green ramp, opaque
pub fn gradient(width: usize, height: usize) -> RgbaImage {
    let pixels = (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            Color::rgb(
                (x * 255 / (width - 1).max(1)) as u8,
                (y * 255 / (height - 1).max(1)) as u8,
                96,
            )
        })
        .collect();
    RgbaImage::new(width, height, pixels)
}

/// Left half `left`, right half `right`
pub fn two_tone(width: usize, height: usize, left: Color, right: Color) -> RgbaImage {
    let pixels = (0..width * height)
        .map(|i| if i % width < width / 2 { left } else { right })
        .collect();
    RgbaImage::new(width, height, pixels)
}

/// Every pixel `color`
pub fn solid(width: usize, height: usize, color: Color) -> RgbaImage {
    RgbaImage::new(width, height, vec![color; width * height])
}
