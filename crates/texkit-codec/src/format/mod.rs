//! The codec abstraction shared by linear and block encodings.
//!
//! A [`ColorEncoding`] converts between an encoded byte buffer and a
//! row-major sequence of [`Color`]s for an image described by an
//! [`ImageLayout`]. Decoding is lazy: [`ColorEncoding::decode`] returns a
//! [`ColorStream`] that unpacks pixels (or block rows) as it is consumed.
//! [`ColorEncoding::decode_all`] is the eager, parallel counterpart.

pub mod bit_depth;
mod linear;

pub use bit_depth::{ByteOrder, ComponentOrder, LaFormat, LaOrder, NibbleOrder, Packing, RgbaFormat};
pub use linear::{LinearEncoding, PixelFormat};

use crate::color::Color;
use crate::swizzle::{Swizzle, SwizzleError};
use thiserror::Error;

/// Lazy, finite, row-major sequence of decoded colors.
pub type ColorStream<'a> = Box<dyn Iterator<Item = Color> + Send + 'a>;

/// Errors raised while constructing a pixel format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("channel width {0} exceeds 8 bits")]
    ChannelTooWide(u32),

    #[error("pixel format has no channels")]
    Empty,

    #[error("unsupported pixel size of {0} bits (expected 4, 8, 16, 24 or 32)")]
    UnsupportedPixelSize(u32),

    #[error("index {index} does not fit in {bits} bits")]
    IndexOutOfRange { index: u16, bits: u32 },

    #[error("index {index} is outside the {palette_len}-color palette")]
    IndexOutsidePalette { index: usize, palette_len: usize },

    #[error("unsupported index layout: {index_bits} index bits + {alpha_bits} alpha bits")]
    UnsupportedIndexLayout { index_bits: u32, alpha_bits: u32 },
}

/// Errors raised while encoding or decoding image data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("expected {expected} bytes for a {width}x{height} image, got {actual}")]
    LengthMismatch {
        expected: usize,
        actual: usize,
        width: usize,
        height: usize,
    },

    #[error("expected {expected} colors for a {width}x{height} image, got {actual}")]
    ColorCountMismatch {
        expected: usize,
        actual: usize,
        width: usize,
        height: usize,
    },

    #[error("{actual} colors is not a whole number of {block_pixels}-pixel blocks")]
    BlockAlignment { block_pixels: usize, actual: usize },

    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        reason: &'static str,
    },

    #[error("{format} does not support {swizzle:?} storage")]
    UnsupportedSwizzle { format: String, swizzle: Swizzle },

    #[error(transparent)]
    Swizzle(#[from] SwizzleError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Which channels an encoding stores.
///
/// Decoders fill channels a format does not store with fixed values:
/// alpha with 255, color channels with 0 (luminance replicates into red,
/// green and blue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Rgba,
    Rgb,
    LuminanceAlpha,
    Luminance,
    Alpha,
    RedGreen,
    Red,
}

impl ChannelLayout {
    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            ChannelLayout::Rgba | ChannelLayout::LuminanceAlpha | ChannelLayout::Alpha
        )
    }
}

/// Dimensions and storage order of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLayout {
    pub width: usize,
    pub height: usize,
    pub swizzle: Swizzle,
}

impl ImageLayout {
    /// Row-major layout of a `width x height` image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            swizzle: Swizzle::Linear,
        }
    }

    pub fn with_swizzle(mut self, swizzle: Swizzle) -> Self {
        self.swizzle = swizzle;
        self
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub(crate) fn check_colors(&self, colors: &[Color]) -> Result<(), CodecError> {
        if colors.len() != self.pixel_count() {
            return Err(CodecError::ColorCountMismatch {
                expected: self.pixel_count(),
                actual: colors.len(),
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub(crate) fn check_data(&self, data: &[u8], expected: usize) -> Result<(), CodecError> {
        if data.len() != expected {
            return Err(CodecError::LengthMismatch {
                expected,
                actual: data.len(),
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// A pixel encoding: converts between encoded bytes and [`Color`]s.
///
/// Implementations are immutable and shared across threads through the
/// registry.
pub trait ColorEncoding: Send + Sync {
    /// Human readable format name, e.g. `"RGB565"` or `"DXT5"`.
    fn name(&self) -> &str;

    /// Storage cost per pixel, in bits.
    fn bits_per_pixel(&self) -> u32;

    /// Channels the format stores.
    fn channels(&self) -> ChannelLayout;

    /// Width and height of the unit the format encodes atomically.
    fn block_dimensions(&self) -> (usize, usize) {
        (1, 1)
    }

    /// Exact encoded size of a `width x height` image, in bytes.
    fn data_len(&self, width: usize, height: usize) -> usize;

    /// Lazily decode `data` into a row-major color stream.
    ///
    /// Input length and swizzle are validated up front, so the returned
    /// stream itself cannot fail.
    fn decode<'a>(
        &'a self,
        data: &'a [u8],
        layout: ImageLayout,
    ) -> Result<ColorStream<'a>, CodecError>;

    /// Decode the whole image at once.
    fn decode_all(&self, data: &[u8], layout: ImageLayout) -> Result<Vec<Color>, CodecError> {
        Ok(self.decode(data, layout)?.collect())
    }

    /// Encode `layout.width * layout.height` row-major colors.
    fn encode(&self, colors: &[Color], layout: ImageLayout) -> Result<Vec<u8>, CodecError>;
}
