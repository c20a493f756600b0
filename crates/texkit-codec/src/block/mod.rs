//! Fixed-size block compression.
//!
//! Block formats encode a 4x4 tile of pixels into a fixed number of bytes.
//! Each format implements [`BlockCodec`], which only ever sees one block at
//! a time. [`BlockEncoding`] turns a block codec into a full
//! [`ColorEncoding`]:
//!
//! - images whose dimensions are not block multiples are padded by
//!   replicating the last column and row, and cropped again on decode;
//! - the layout's [`Swizzle`](crate::Swizzle) reorders whole blocks;
//! - encoding runs over blocks in parallel, decoding yields one block row
//!   at a time.
//!
//! PVRTC is the exception: its colors are interpolated across neighbouring
//! blocks, so [`Pvrtc4`] implements [`ColorEncoding`] on the whole image.

mod astc;
mod ati;
mod dxt;
mod endpoints;
mod etc1;
mod pvrtc;

pub use astc::Astc4x4;
pub use ati::{Ati1, Ati1Channel, Ati2, Ati2Channels};
pub use dxt::{Dxt1, Dxt3, Dxt5};
pub use etc1::{Etc1, Etc1A4};
pub use pvrtc::Pvrtc4;

use crate::color::Color;
use crate::format::{ChannelLayout, CodecError, ColorEncoding, ColorStream, ImageLayout};
use rayon::prelude::*;
use tracing::debug;

/// A block compression format.
///
/// `decode_block` and `encode_block` work on exactly one block:
/// `block_width * block_height` row-major colors and `block_bytes` bytes.
/// Implementations are pure and must be deterministic.
pub trait BlockCodec: Send + Sync {
    fn name(&self) -> &str;

    fn channels(&self) -> ChannelLayout;

    fn block_width(&self) -> usize {
        4
    }

    fn block_height(&self) -> usize {
        4
    }

    fn block_bytes(&self) -> usize;

    fn decode_block(&self, block: &[u8], out: &mut [Color]);

    fn encode_block(&self, colors: &[Color], out: &mut [u8]);

    #[inline]
    fn block_pixels(&self) -> usize {
        self.block_width() * self.block_height()
    }
}

/// Adapts a [`BlockCodec`] to the [`ColorEncoding`] interface.
#[derive(Debug, Clone)]
pub struct BlockEncoding<C> {
    codec: C,
}

impl<C: BlockCodec> BlockEncoding<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    fn grid(&self, width: usize, height: usize) -> (usize, usize) {
        (
            width.div_ceil(self.codec.block_width()),
            height.div_ceil(self.codec.block_height()),
        )
    }

    /// Encode colors already grouped into blocks.
    ///
    /// `colors` holds whole blocks back to back, each in row-major order.
    /// A count that is not a multiple of the block size is rejected.
    pub fn encode_blocks(&self, colors: &[Color]) -> Result<Vec<u8>, CodecError> {
        let block_pixels = self.codec.block_pixels();
        if colors.len() % block_pixels != 0 {
            return Err(CodecError::BlockAlignment {
                block_pixels,
                actual: colors.len(),
            });
        }
        let block_bytes = self.codec.block_bytes();
        let mut out = vec![0u8; colors.len() / block_pixels * block_bytes];
        out.par_chunks_mut(block_bytes)
            .zip(colors.par_chunks(block_pixels))
            .for_each(|(dst, src)| self.codec.encode_block(src, dst));
        Ok(out)
    }

    /// Decode back-to-back blocks into grouped colors (inverse of
    /// [`encode_blocks`](Self::encode_blocks)).
    pub fn decode_blocks(&self, data: &[u8]) -> Result<Vec<Color>, CodecError> {
        let block_bytes = self.codec.block_bytes();
        if data.len() % block_bytes != 0 {
            return Err(CodecError::LengthMismatch {
                expected: data.len().div_ceil(block_bytes) * block_bytes,
                actual: data.len(),
                width: 0,
                height: 0,
            });
        }
        let block_pixels = self.codec.block_pixels();
        let mut out = vec![Color::TRANSPARENT; data.len() / block_bytes * block_pixels];
        out.par_chunks_mut(block_pixels)
            .zip(data.par_chunks(block_bytes))
            .for_each(|(dst, src)| self.codec.decode_block(src, dst));
        Ok(out)
    }

    fn check(&self, data: &[u8], layout: &ImageLayout) -> Result<(usize, usize), CodecError> {
        let (gw, gh) = self.grid(layout.width, layout.height);
        layout.swizzle.validate(gw, gh)?;
        layout.check_data(data, self.data_len(layout.width, layout.height))?;
        Ok((gw, gh))
    }

    /// Decode block row `by` into `row`, cropped to the image width.
    fn decode_block_row(
        &self,
        data: &[u8],
        layout: &ImageLayout,
        grid: (usize, usize),
        by: usize,
        row: &mut [Color],
    ) {
        let (bw, bh) = (self.codec.block_width(), self.codec.block_height());
        let block_bytes = self.codec.block_bytes();
        let width = layout.width;
        let mut block = vec![Color::TRANSPARENT; bw * bh];
        for bx in 0..grid.0 {
            let index = layout.swizzle.index(bx, by, grid.0, grid.1);
            let src = &data[index * block_bytes..(index + 1) * block_bytes];
            self.codec.decode_block(src, &mut block);
            for j in 0..bh {
                for i in 0..bw {
                    let x = bx * bw + i;
                    if x < width {
                        row[j * width + x] = block[j * bw + i];
                    }
                }
            }
        }
    }
}

impl<C: BlockCodec> ColorEncoding for BlockEncoding<C> {
    fn name(&self) -> &str {
        self.codec.name()
    }

    fn bits_per_pixel(&self) -> u32 {
        (self.codec.block_bytes() * 8 / self.codec.block_pixels()) as u32
    }

    fn channels(&self) -> ChannelLayout {
        self.codec.channels()
    }

    fn block_dimensions(&self) -> (usize, usize) {
        (self.codec.block_width(), self.codec.block_height())
    }

    fn data_len(&self, width: usize, height: usize) -> usize {
        let (gw, gh) = self.grid(width, height);
        gw * gh * self.codec.block_bytes()
    }

    fn decode<'a>(
        &'a self,
        data: &'a [u8],
        layout: ImageLayout,
    ) -> Result<ColorStream<'a>, CodecError> {
        let grid = self.check(data, &layout)?;
        Ok(Box::new(BlockRows {
            encoding: self,
            data,
            layout,
            grid,
            row: vec![Color::TRANSPARENT; layout.width * self.codec.block_height()],
            x: 0,
            y: 0,
        }))
    }

    fn decode_all(&self, data: &[u8], layout: ImageLayout) -> Result<Vec<Color>, CodecError> {
        let grid = self.check(data, &layout)?;
        let bh = self.codec.block_height();
        let (width, height) = (layout.width, layout.height);
        let mut out = vec![Color::TRANSPARENT; width * height];
        if width == 0 {
            return Ok(out);
        }
        out.par_chunks_mut(width * bh)
            .enumerate()
            .for_each(|(by, dst)| {
                let mut row = vec![Color::TRANSPARENT; width * bh];
                self.decode_block_row(data, &layout, grid, by, &mut row);
                dst.copy_from_slice(&row[..dst.len()]);
            });
        Ok(out)
    }

    fn encode(&self, colors: &[Color], layout: ImageLayout) -> Result<Vec<u8>, CodecError> {
        layout.check_colors(colors)?;
        let (gw, gh) = self.grid(layout.width, layout.height);
        layout.swizzle.validate(gw, gh)?;
        debug!(
            format = self.codec.name(),
            width = layout.width,
            height = layout.height,
            blocks = gw * gh,
            "encoding blocks"
        );

        let (bw, bh) = (self.codec.block_width(), self.codec.block_height());
        let block_bytes = self.codec.block_bytes();
        let (width, height) = (layout.width, layout.height);
        let mut out = vec![0u8; gw * gh * block_bytes];
        out.par_chunks_mut(block_bytes)
            .enumerate()
            .for_each_init(
                || vec![Color::TRANSPARENT; bw * bh],
                |block, (index, dst)| {
                    let (bx, by) = layout.swizzle.coordinate(index, gw, gh);
                    for j in 0..bh {
                        let y = (by * bh + j).min(height - 1);
                        for i in 0..bw {
                            let x = (bx * bw + i).min(width - 1);
                            block[j * bw + i] = colors[y * width + x];
                        }
                    }
                    self.codec.encode_block(block, dst);
                },
            );
        Ok(out)
    }
}

/// Lazy decoder that unpacks one block row at a time.
struct BlockRows<'a, C> {
    encoding: &'a BlockEncoding<C>,
    data: &'a [u8],
    layout: ImageLayout,
    grid: (usize, usize),
    row: Vec<Color>,
    x: usize,
    y: usize,
}

impl<C: BlockCodec> Iterator for BlockRows<'_, C> {
    type Item = Color;

    fn next(&mut self) -> Option<Color> {
        let (width, height) = (self.layout.width, self.layout.height);
        if width == 0 || self.y >= height {
            return None;
        }
        let bh = self.encoding.codec.block_height();
        let in_block = self.y % bh;
        if in_block == 0 && self.x == 0 {
            self.encoding
                .decode_block_row(self.data, &self.layout, self.grid, self.y / bh, &mut self.row);
        }
        let color = self.row[in_block * width + self.x];
        self.x += 1;
        if self.x == width {
            self.x = 0;
            self.y += 1;
        }
        Some(color)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = self.layout.width * self.layout.height;
        let done = (self.y * self.layout.width + self.x).min(total);
        (total - done, Some(total - done))
    }
}
