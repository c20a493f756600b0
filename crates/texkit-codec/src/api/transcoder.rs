//! Reusable facade over the registry, the quantizer and the ditherers.

use super::error::Error;
use crate::color::Color;
use crate::dither::{DitherAlgorithm, DitherOptions};
use crate::format::{CodecError, ColorStream, ImageLayout};
use crate::palette::Palette;
use crate::quantize::{QuantizeOptions, WuQuantizer};
use crate::registry::EncodingRegistry;
use std::sync::Arc;
use tracing::debug;

/// A quantized image: palette plus one index per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexedImage {
    pub palette: Palette,
    pub indices: Vec<u16>,
    pub width: usize,
    pub height: usize,
}

impl IndexedImage {
    /// Resolve every index back to its palette color.
    pub fn to_colors(&self) -> Vec<Color> {
        self.indices
            .iter()
            .map(|&i| self.palette.get(i as usize).unwrap_or(Color::TRANSPARENT))
            .collect()
    }
}

/// Encoded output of [`Transcoder::encode_indexed`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexedTexture {
    /// Packed per-pixel indices.
    pub data: Vec<u8>,
    /// The palette, encoded as a one-row image.
    pub palette_data: Vec<u8>,
    pub palette_len: usize,
}

/// Reusable transcoding pipeline.
///
/// Create once, configure with the builder methods, then call any operation
/// as often as needed. All operations take `&self`, and the registry is
/// shared through an [`Arc`], so a configured transcoder can be cloned
/// cheaply and used from several threads.
///
/// # Defaults
///
/// - the built-in registry
/// - 256 colors, default histogram precision
/// - no dithering (nearest palette color)
///
/// # Example
///
/// ```
/// use texkit_codec::{Color, DitherAlgorithm, ImageLayout, Transcoder};
/// use texkit_codec::registry::keys;
///
/// let pixels = vec![Color::rgb(200, 40, 40); 16];
/// let transcoder = Transcoder::new()
///     .colors(16)
///     .dither(DitherAlgorithm::FloydSteinberg);
///
/// let dxt1 = transcoder.encode(keys::DXT1, &pixels, ImageLayout::new(4, 4)).unwrap();
/// assert_eq!(dxt1.len(), 8);
///
/// let texture = transcoder
///     .encode_indexed(keys::I4, keys::RGBA8888, &pixels, ImageLayout::new(4, 4))
///     .unwrap();
/// assert_eq!(texture.palette_len, 1);
/// assert_eq!(texture.data.len(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct Transcoder {
    registry: Arc<EncodingRegistry>,
    quantize: QuantizeOptions,
    dither: DitherAlgorithm,
    dither_options: DitherOptions,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcoder {
    /// Transcoder over [`EncodingRegistry::builtin`].
    pub fn new() -> Self {
        Self::with_registry(Arc::new(EncodingRegistry::builtin()))
    }

    /// Transcoder over a custom registry.
    pub fn with_registry(registry: Arc<EncodingRegistry>) -> Self {
        Self {
            registry,
            quantize: QuantizeOptions::default(),
            dither: DitherAlgorithm::None,
            dither_options: DitherOptions::default(),
        }
    }

    /// Palette size budget for [`quantize`](Self::quantize). Indexed
    /// encodes further cap it at what the index format can address.
    #[inline]
    pub fn colors(mut self, colors: usize) -> Self {
        self.quantize.colors = colors;
        self
    }

    #[inline]
    pub fn quantize_options(mut self, options: QuantizeOptions) -> Self {
        self.quantize = options;
        self
    }

    #[inline]
    pub fn dither(mut self, algorithm: DitherAlgorithm) -> Self {
        self.dither = algorithm;
        self
    }

    #[inline]
    pub fn dither_options(mut self, options: DitherOptions) -> Self {
        self.dither_options = options;
        self
    }

    pub fn registry(&self) -> &EncodingRegistry {
        &self.registry
    }

    pub fn dither_algorithm(&self) -> DitherAlgorithm {
        self.dither
    }

    /// Lazily decode `data` stored in the color encoding `key`.
    pub fn decode<'a>(
        &'a self,
        key: u32,
        data: &'a [u8],
        layout: ImageLayout,
    ) -> Result<ColorStream<'a>, Error> {
        let def = self.registry.color(key)?;
        debug!(format = def.name(), width = layout.width, height = layout.height, "decode");
        Ok(def.encoding().decode(data, layout)?)
    }

    /// Decode the whole image at once.
    pub fn decode_all(&self, key: u32, data: &[u8], layout: ImageLayout) -> Result<Vec<Color>, Error> {
        let def = self.registry.color(key)?;
        debug!(format = def.name(), width = layout.width, height = layout.height, "decode");
        Ok(def.encoding().decode_all(data, layout)?)
    }

    /// Encode row-major `colors` into the color encoding `key`.
    pub fn encode(&self, key: u32, colors: &[Color], layout: ImageLayout) -> Result<Vec<u8>, Error> {
        let def = self.registry.color(key)?;
        debug!(format = def.name(), width = layout.width, height = layout.height, "encode");
        Ok(def.encoding().encode(colors, layout)?)
    }

    /// Build a palette for `colors` and index every pixel into it, applying
    /// the configured dither.
    pub fn quantize(&self, colors: &[Color], width: usize, height: usize) -> Result<IndexedImage, Error> {
        self.quantize_with(self.quantize, colors, width, height)
    }

    fn quantize_with(
        &self,
        options: QuantizeOptions,
        colors: &[Color],
        width: usize,
        height: usize,
    ) -> Result<IndexedImage, Error> {
        if colors.len() != width * height {
            return Err(CodecError::ColorCountMismatch {
                expected: width * height,
                actual: colors.len(),
                width,
                height,
            }
            .into());
        }

        let result = WuQuantizer::new(options).quantize(colors)?;
        let indices = match self.dither.build(self.dither_options.clone()) {
            Some(ditherer) if !colors.is_empty() => {
                debug!(algorithm = %self.dither, palette = result.palette.len(), "dither");
                ditherer.dither(colors, width, height, &result.palette)?
            }
            _ => result.indices,
        };

        Ok(IndexedImage {
            palette: result.palette,
            indices,
            width,
            height,
        })
    }

    /// Quantize `colors` and store them as an index texture plus a palette.
    ///
    /// The palette size is capped by what `index_key` can address. The
    /// palette format must encode single pixels (no block formats).
    pub fn encode_indexed(
        &self,
        index_key: u32,
        palette_key: u32,
        colors: &[Color],
        layout: ImageLayout,
    ) -> Result<IndexedTexture, Error> {
        let index = self.registry.index(index_key)?;
        let palette_def = self.registry.color(palette_key)?;
        if palette_def.encoding().block_dimensions() != (1, 1) {
            return Err(Error::UnsupportedPaletteFormat {
                format: palette_def.name().to_string(),
            });
        }

        let budget = self.quantize.colors.min(index.max_colors());
        let mut options = self.quantize;
        options.colors = budget;
        let image = self.quantize_with(options, colors, layout.width, layout.height)?;
        debug!(
            index = index.name(),
            palette = palette_def.name(),
            colors = image.palette.len(),
            budget,
            "encode indexed"
        );

        let data = index.encoding().encode(&image.indices, colors, layout)?;
        let palette_len = image.palette.len();
        let palette_data = palette_def
            .encoding()
            .encode(image.palette.colors(), ImageLayout::new(palette_len, 1))?;
        Ok(IndexedTexture {
            data,
            palette_data,
            palette_len,
        })
    }

    /// Decode an index texture against its encoded palette.
    ///
    /// The palette length is inferred from the size of `palette_data`.
    pub fn decode_indexed(
        &self,
        index_key: u32,
        palette_key: u32,
        data: &[u8],
        palette_data: &[u8],
        layout: ImageLayout,
    ) -> Result<Vec<Color>, Error> {
        let index = self.registry.index(index_key)?;
        let palette_def = self.registry.color(palette_key)?;
        if palette_def.encoding().block_dimensions() != (1, 1) {
            return Err(Error::UnsupportedPaletteFormat {
                format: palette_def.name().to_string(),
            });
        }

        let palette_len = palette_data.len() * 8 / palette_def.bits_per_pixel() as usize;
        let colors = palette_def
            .encoding()
            .decode_all(palette_data, ImageLayout::new(palette_len, 1))?;
        let palette = Palette::new(colors)?;
        debug!(index = index.name(), palette = palette.len(), "decode indexed");
        Ok(index.encoding().decode(data, &palette, layout)?)
    }
}
