//! The RGBA color value shared by every codec, the quantizer and the ditherer.
//!
//! Every encoding in this crate converts to and from [`Color`]: four 8-bit
//! channels regardless of the bit depth the source format stores. Narrower
//! channels are widened by bit replication (see [`bits`]) and alpha defaults
//! to fully opaque when a format carries none.

pub mod bits;

/// An RGBA color with four 8-bit channels.
///
/// `Color` is a small `Copy` value. Two colors are equal when all four
/// channels are equal; no color space or premultiplication is implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Create an opaque grey with all color channels set to `l`.
    #[inline]
    pub const fn grey(l: u8) -> Self {
        Self::rgb(l, l, l)
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub const fn from_array(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    /// Copy of this color with a different alpha.
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Integer Rec. 601 luma: `(77 r + 150 g + 29 b + 128) >> 8`.
    ///
    /// The weights sum to 256, so greys map to themselves exactly.
    #[inline]
    pub fn luminance(self) -> u8 {
        ((77 * self.r as u32 + 150 * self.g as u32 + 29 * self.b as u32 + 128) >> 8) as u8
    }

    /// Squared Euclidean distance over all four channels.
    #[inline]
    pub fn distance_sq(self, other: Color) -> u32 {
        let d = |a: u8, b: u8| {
            let v = a as i32 - b as i32;
            (v * v) as u32
        };
        d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b) + d(self.a, other.a)
    }

    /// Squared Euclidean distance over red, green and blue only.
    #[inline]
    pub fn distance_sq_rgb(self, other: Color) -> u32 {
        let d = |a: u8, b: u8| {
            let v = a as i32 - b as i32;
            (v * v) as u32
        };
        d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b)
    }
}

impl From<[u8; 4]> for Color {
    fn from(c: [u8; 4]) -> Self {
        Color::from_array(c)
    }
}

impl From<Color> for [u8; 4] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_exact_for_greys() {
        for v in 0..=255u8 {
            assert_eq!(Color::grey(v).luminance(), v, "grey {} drifted", v);
        }
    }

    #[test]
    fn test_luminance_weights_green_heaviest() {
        let r = Color::rgb(255, 0, 0).luminance();
        let g = Color::rgb(0, 255, 0).luminance();
        let b = Color::rgb(0, 0, 255).luminance();
        assert!(g > r && r > b, "expected g > r > b, got {} {} {}", g, r, b);
    }

    #[test]
    fn test_distance_includes_alpha() {
        let a = Color::new(10, 20, 30, 255);
        let b = Color::new(10, 20, 30, 0);
        assert_eq!(a.distance_sq_rgb(b), 0);
        assert_eq!(a.distance_sq(b), 255 * 255);
    }

    #[test]
    fn test_array_conversion() {
        let c = Color::new(1, 2, 3, 4);
        let arr: [u8; 4] = c.into();
        assert_eq!(arr, [1, 2, 3, 4]);
        assert_eq!(Color::from(arr), c);
    }
}
