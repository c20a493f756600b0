//! Assertion helpers for tests.

use pretty_assertions::assert_eq;
use texkit::services::RgbaImage;
use texkit_codec::Color;

/// Assert two images match exactly
pub fn assert_same_image(actual: &RgbaImage, expected: &RgbaImage) {
    assert_eq!(
        (actual.width, actual.height),
        (expected.width, expected.height),
        "Image dimensions differ"
    );
    if let Some(i) = (0..actual.pixels.len()).find(|&i| actual.pixels[i] != expected.pixels[i]) {
        panic!(
            "Pixel ({}, {}) differs: got {:?}, expected {:?}",
            i % actual.width,
            i / actual.width,
            actual.pixels[i],
            expected.pixels[i]
        );
    }
}

/// Assert every channel of every pixel is within `tolerance`
pub fn assert_close(actual: &RgbaImage, expected: &RgbaImage, tolerance: u8) {
    assert_eq!(actual.pixels.len(), expected.pixels.len(), "Pixel count differs");
    for (i, (a, e)) in actual.pixels.iter().zip(&expected.pixels).enumerate() {
        let worst = channel_diff(*a, *e);
        assert!(
            worst <= tolerance,
            "Pixel {i} off by {worst} (> {tolerance}): got {a:?}, expected {e:?}"
        );
    }
}

/// Count distinct colors
pub fn distinct_colors(image: &RgbaImage) -> usize {
    let mut colors = image.pixels.clone();
    colors.sort_by_key(|c| c.to_array());
    colors.dedup();
    colors.len()
}

fn channel_diff(a: Color, b: Color) -> u8 {
    a.to_array()
        .iter()
        .zip(b.to_array())
        .map(|(&x, y)| x.abs_diff(y))
        .max()
        .unwrap_or(0)
}
