//! File-level operations behind the CLI subcommands.

use crate::error::ServiceError;
use crate::models::AppConfig;
use crate::services::image_io::{self, RgbaImage};
use std::path::Path;
use texkit_codec::{FormatKind, ImageLayout, IndexedImage, Swizzle, Transcoder};

/// One row of `texkit formats`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub key: u32,
    pub name: String,
    pub bits_per_pixel: u32,
    pub kind: FormatKind,
    pub block: (usize, usize),
}

/// Parse a swizzle argument: `linear`, `morton`, `tiled:WxH` or
/// `morton-tiled:N`.
pub fn parse_swizzle(s: &str) -> Result<Swizzle, ServiceError> {
    let invalid = || ServiceError::InvalidSwizzle(s.to_string());
    let lower = s.trim().to_ascii_lowercase();
    match lower.split_once(':') {
        None if lower == "linear" => Ok(Swizzle::Linear),
        None if lower == "morton" => Ok(Swizzle::Morton),
        Some(("tiled", size)) => {
            let (w, h) = size.split_once('x').ok_or_else(invalid)?;
            Ok(Swizzle::Tiled {
                tile_width: w.parse().map_err(|_| invalid())?,
                tile_height: h.parse().map_err(|_| invalid())?,
            })
        }
        Some(("morton-tiled", tile)) => Ok(Swizzle::MortonTiled {
            tile: tile.parse().map_err(|_| invalid())?,
        }),
        _ => Err(invalid()),
    }
}

/// Combines the configured [`Transcoder`] with file I/O
pub struct TranscodeService {
    transcoder: Transcoder,
}

impl TranscodeService {
    /// Build the transcoder from configuration; fails on an unknown dither name
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let transcoder = Transcoder::new()
            .quantize_options(config.quantize_options())
            .dither(config.dither_algorithm()?)
            .dither_options(config.dither_options());
        Ok(Self { transcoder })
    }

    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    /// All registered formats, color formats first, each in key order
    pub fn list_formats(&self) -> Vec<FormatInfo> {
        let registry = self.transcoder.registry();
        let colors = registry.colors().map(|def| FormatInfo {
            key: def.key(),
            name: def.name().to_string(),
            bits_per_pixel: def.bits_per_pixel(),
            kind: FormatKind::Color,
            block: def.encoding().block_dimensions(),
        });
        let indices = registry.indices().map(|def| FormatInfo {
            key: def.key(),
            name: def.name().to_string(),
            bits_per_pixel: def.bits_per_pixel(),
            kind: FormatKind::Indexed,
            block: (1, 1),
        });
        colors.chain(indices).collect()
    }

    /// Decode a raw texture file to PNG
    pub fn decode_file(
        &self,
        format: &str,
        layout: ImageLayout,
        input: &Path,
        output: &Path,
    ) -> Result<RgbaImage, ServiceError> {
        let key = self.transcoder.registry().resolve_color(format)?.key();
        let data = std::fs::read(input)?;
        let pixels = self.transcoder.decode_all(key, &data, layout)?;
        let image = RgbaImage::new(layout.width, layout.height, pixels);
        image_io::write_png(output, &image)?;
        tracing::info!(format, width = layout.width, height = layout.height, "Decoded texture");
        Ok(image)
    }

    /// Encode a PNG into a raw texture file; returns the encoded size
    pub fn encode_file(
        &self,
        format: &str,
        swizzle: Swizzle,
        input: &Path,
        output: &Path,
    ) -> Result<usize, ServiceError> {
        let key = self.transcoder.registry().resolve_color(format)?.key();
        let image = image_io::read_png(input)?;
        let layout = ImageLayout::new(image.width, image.height).with_swizzle(swizzle);
        let data = self.transcoder.encode(key, &image.pixels, layout)?;
        std::fs::write(output, &data)?;
        tracing::info!(format, width = image.width, height = image.height, bytes = data.len(), "Encoded texture");
        Ok(data.len())
    }

    /// Reduce a PNG to the configured palette and write the result as PNG
    pub fn quantize_file(&self, input: &Path, output: &Path) -> Result<IndexedImage, ServiceError> {
        let image = image_io::read_png(input)?;
        let indexed = self
            .transcoder
            .quantize(&image.pixels, image.width, image.height)?;
        let result = RgbaImage::new(indexed.width, indexed.height, indexed.to_colors());
        image_io::write_png(output, &result)?;
        tracing::info!(
            width = image.width,
            height = image.height,
            colors = indexed.palette.len(),
            dither = %self.transcoder.dither_algorithm(),
            "Quantized image"
        );
        Ok(indexed)
    }

    /// Quantize a PNG and write index data plus encoded palette; returns the
    /// palette length
    pub fn index_file(
        &self,
        index_format: &str,
        palette_format: &str,
        swizzle: Swizzle,
        input: &Path,
        output: &Path,
        palette_output: &Path,
    ) -> Result<usize, ServiceError> {
        let registry = self.transcoder.registry();
        let index_key = registry.resolve_index(index_format)?.key();
        let palette_key = registry.resolve_color(palette_format)?.key();
        let image = image_io::read_png(input)?;
        let layout = ImageLayout::new(image.width, image.height).with_swizzle(swizzle);
        let texture = self
            .transcoder
            .encode_indexed(index_key, palette_key, &image.pixels, layout)?;
        std::fs::write(output, &texture.data)?;
        std::fs::write(palette_output, &texture.palette_data)?;
        tracing::info!(
            index_format,
            palette_format,
            colors = texture.palette_len,
            "Wrote indexed texture"
        );
        Ok(texture.palette_len)
    }

    /// Decode index data plus palette back to PNG
    pub fn unindex_file(
        &self,
        index_format: &str,
        palette_format: &str,
        layout: ImageLayout,
        input: &Path,
        palette_input: &Path,
        output: &Path,
    ) -> Result<RgbaImage, ServiceError> {
        let registry = self.transcoder.registry();
        let index_key = registry.resolve_index(index_format)?.key();
        let palette_key = registry.resolve_color(palette_format)?.key();
        let data = std::fs::read(input)?;
        let palette_data = std::fs::read(palette_input)?;
        let pixels = self
            .transcoder
            .decode_indexed(index_key, palette_key, &data, &palette_data, layout)?;
        let image = RgbaImage::new(layout.width, layout.height, pixels);
        image_io::write_png(output, &image)?;
        Ok(image)
    }
}
