//! PVRTC 4 bits per pixel.
//!
//! Each 4x4 block stores two low-resolution colors (A and B) and a 2-bit
//! modulation value per pixel. A pixel's final A and B colors are bilinear
//! blends of the A/B colors of the four blocks whose centers surround it,
//! wrapping around the texture edges, so a block cannot be decoded in
//! isolation.
//!
//! Blocks are 8 bytes, read as a little-endian `u64` and stored in Morton
//! order (y in the even bits):
//!
//! | bits | content |
//! |---|---|
//! | 0..32 | modulation, pixel `(x, y)` at bits `2 (y * 4 + x)` |
//! | 32 | punch-through flag |
//! | 33..47 | color A: `R5 G5 B4` if opaque, else `A3 R4 G4 B3` (bits 46..33) |
//! | 47 | color A opaque flag |
//! | 48..63 | color B: `R5 G5 B5` if opaque, else `A3 R4 G4 B4` (bits 62..48) |
//! | 63 | color B opaque flag |
//!
//! Dimensions are padded up to powers of two of at least 8. Colors are
//! widened to 8 bits before interpolation and blended with rounded integer
//! arithmetic. This approximates the hardware's fixed-point blend and is
//! exact for the encoder in this module, which decodes the same way.

use crate::color::{bits, Color};
use crate::format::{ChannelLayout, CodecError, ColorEncoding, ColorStream, ImageLayout};
use crate::swizzle::Swizzle;
use rayon::prelude::*;
use tracing::debug;

const STANDARD_WEIGHTS: [u32; 4] = [0, 3, 5, 8];
const PUNCH_THROUGH_WEIGHTS: [u32; 4] = [0, 4, 4, 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PvrtcBlock {
    modulation: u32,
    color: u32,
}

impl PvrtcBlock {
    fn read(bytes: &[u8]) -> Self {
        Self {
            modulation: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            color: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    fn write(&self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.modulation.to_le_bytes());
        out[4..8].copy_from_slice(&self.color.to_le_bytes());
    }

    fn punch_through(&self) -> bool {
        self.color & 1 == 1
    }

    fn color_a(&self) -> Color {
        let c = self.color & 0xFFFF;
        if c & 0x8000 != 0 {
            Color::rgb(
                bits::expand((c >> 10) & 0x1F, 5),
                bits::expand((c >> 5) & 0x1F, 5),
                bits::expand((c >> 1) & 0xF, 4),
            )
        } else {
            Color::new(
                bits::expand((c >> 8) & 0xF, 4),
                bits::expand((c >> 4) & 0xF, 4),
                bits::expand((c >> 1) & 0x7, 3),
                bits::expand((c >> 12) & 0x7, 3),
            )
        }
    }

    fn color_b(&self) -> Color {
        let c = self.color >> 16;
        if c & 0x8000 != 0 {
            Color::rgb(
                bits::expand((c >> 10) & 0x1F, 5),
                bits::expand((c >> 5) & 0x1F, 5),
                bits::expand(c & 0x1F, 5),
            )
        } else {
            Color::new(
                bits::expand((c >> 8) & 0xF, 4),
                bits::expand((c >> 4) & 0xF, 4),
                bits::expand(c & 0xF, 4),
                bits::expand((c >> 12) & 0x7, 3),
            )
        }
    }
}

/// Pack A (15 bits incl. flag, shifted left by one) from an 8-bit color.
fn pack_a(c: Color, opaque: bool) -> u32 {
    let n = |v: u8, w: u32| bits::nearest(v, w);
    let word = if opaque {
        0x8000 | n(c.r, 5) << 10 | n(c.g, 5) << 5 | n(c.b, 4) << 1
    } else {
        n(c.a, 3) << 12 | n(c.r, 4) << 8 | n(c.g, 4) << 4 | n(c.b, 3) << 1
    };
    word & 0xFFFE
}

fn pack_b(c: Color, opaque: bool) -> u32 {
    let n = |v: u8, w: u32| bits::nearest(v, w);
    if opaque {
        0x8000 | n(c.r, 5) << 10 | n(c.g, 5) << 5 | n(c.b, 5)
    } else {
        n(c.a, 3) << 12 | n(c.r, 4) << 8 | n(c.g, 4) << 4 | n(c.b, 4)
    }
}

/// Block index in PVRTC Morton order, y in the even bits.
fn twiddle(bx: usize, by: usize, bw: usize, bh: usize) -> usize {
    let bits = bw.min(bh).trailing_zeros();
    let mut index = 0;
    for i in 0..bits {
        index |= ((by >> i) & 1) << (2 * i);
        index |= ((bx >> i) & 1) << (2 * i + 1);
    }
    let high = if bw > bh { bx >> bits } else { by >> bits };
    index | (high << (2 * bits))
}

fn padded(v: usize) -> usize {
    v.next_power_of_two().max(8)
}

/// The block grid of an image, with A/B colors unpacked once.
struct Grid {
    bw: usize,
    bh: usize,
    blocks: Vec<PvrtcBlock>,
    a: Vec<Color>,
    b: Vec<Color>,
}

impl Grid {
    fn new(bw: usize, bh: usize, blocks: Vec<PvrtcBlock>) -> Self {
        let a = blocks.iter().map(PvrtcBlock::color_a).collect();
        let b = blocks.iter().map(PvrtcBlock::color_b).collect();
        Self {
            bw,
            bh,
            blocks,
            a,
            b,
        }
    }

    /// Read blocks from Morton order into a row-major grid.
    fn from_bytes(data: &[u8], bw: usize, bh: usize) -> Self {
        let mut blocks = vec![PvrtcBlock { modulation: 0, color: 0 }; bw * bh];
        for by in 0..bh {
            for bx in 0..bw {
                let i = twiddle(bx, by, bw, bh) * 8;
                blocks[by * bw + bx] = PvrtcBlock::read(&data[i..i + 8]);
            }
        }
        Self::new(bw, bh, blocks)
    }

    /// Bilinearly interpolated A and B colors at pixel `(px, py)`.
    fn endpoints(&self, px: usize, py: usize) -> (Color, Color) {
        let (w, h) = (self.bw * 4, self.bh * 4);
        let gx = px + w - 2;
        let gy = py + h - 2;
        let (x0, y0) = ((gx / 4) % self.bw, (gy / 4) % self.bh);
        let (x1, y1) = ((x0 + 1) % self.bw, (y0 + 1) % self.bh);
        let (fx, fy) = ((gx % 4) as u32, (gy % 4) as u32);
        let weights = [
            (y0 * self.bw + x0, (4 - fx) * (4 - fy)),
            (y0 * self.bw + x1, fx * (4 - fy)),
            (y1 * self.bw + x0, (4 - fx) * fy),
            (y1 * self.bw + x1, fx * fy),
        ];
        let blend = |colors: &[Color]| {
            let mut acc = [0u32; 4];
            for &(i, w) in &weights {
                for (a, v) in acc.iter_mut().zip(colors[i].to_array()) {
                    *a += v as u32 * w;
                }
            }
            Color::from_array(acc.map(|v| ((v + 8) / 16) as u8))
        };
        (blend(&self.a), blend(&self.b))
    }

    fn pixel(&self, px: usize, py: usize) -> Color {
        let block = &self.blocks[(py / 4) * self.bw + px / 4];
        let m = ((block.modulation >> (2 * ((py % 4) * 4 + px % 4))) & 3) as usize;
        let (a, b) = self.endpoints(px, py);
        modulate(a, b, m, block.punch_through())
    }
}

fn modulate(a: Color, b: Color, m: usize, punch_through: bool) -> Color {
    let w = if punch_through {
        PUNCH_THROUGH_WEIGHTS[m]
    } else {
        STANDARD_WEIGHTS[m]
    };
    let mix = |x: u8, y: u8| ((x as u32 * (8 - w) + y as u32 * w + 4) / 8) as u8;
    let c = Color::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b), mix(a.a, b.a));
    if punch_through && m == 2 {
        c.with_alpha(0)
    } else {
        c
    }
}

/// PVRTC 4bpp, whole-image codec.
///
/// Images are padded to power-of-two dimensions of at least 8 by edge
/// replication; decoding crops back. Only [`Swizzle::Linear`] layouts are
/// accepted since the format defines its own block order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pvrtc4;

impl Pvrtc4 {
    fn check_swizzle(&self, layout: &ImageLayout) -> Result<(), CodecError> {
        if layout.swizzle != Swizzle::Linear {
            return Err(CodecError::UnsupportedSwizzle {
                format: self.name().to_string(),
                swizzle: layout.swizzle,
            });
        }
        Ok(())
    }

    fn block_grid(width: usize, height: usize) -> (usize, usize) {
        (padded(width) / 4, padded(height) / 4)
    }

    fn decode_grid(&self, data: &[u8], layout: &ImageLayout) -> Result<Option<Grid>, CodecError> {
        self.check_swizzle(layout)?;
        layout.check_data(data, self.data_len(layout.width, layout.height))?;
        if layout.is_empty() {
            return Ok(None);
        }
        let (bw, bh) = Self::block_grid(layout.width, layout.height);
        Ok(Some(Grid::from_bytes(data, bw, bh)))
    }
}

impl ColorEncoding for Pvrtc4 {
    fn name(&self) -> &str {
        "PVRTC4"
    }

    fn bits_per_pixel(&self) -> u32 {
        4
    }

    fn channels(&self) -> ChannelLayout {
        ChannelLayout::Rgba
    }

    fn block_dimensions(&self) -> (usize, usize) {
        (4, 4)
    }

    fn data_len(&self, width: usize, height: usize) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        padded(width) * padded(height) / 2
    }

    fn decode<'a>(
        &'a self,
        data: &'a [u8],
        layout: ImageLayout,
    ) -> Result<ColorStream<'a>, CodecError> {
        let Some(grid) = self.decode_grid(data, &layout)? else {
            return Ok(Box::new(std::iter::empty()));
        };
        let width = layout.width;
        Ok(Box::new(
            (0..layout.pixel_count()).map(move |i| grid.pixel(i % width, i / width)),
        ))
    }

    fn decode_all(&self, data: &[u8], layout: ImageLayout) -> Result<Vec<Color>, CodecError> {
        let Some(grid) = self.decode_grid(data, &layout)? else {
            return Ok(Vec::new());
        };
        let width = layout.width;
        Ok((0..layout.pixel_count())
            .into_par_iter()
            .map(|i| grid.pixel(i % width, i / width))
            .collect())
    }

    fn encode(&self, colors: &[Color], layout: ImageLayout) -> Result<Vec<u8>, CodecError> {
        layout.check_colors(colors)?;
        self.check_swizzle(&layout)?;
        if layout.is_empty() {
            return Ok(Vec::new());
        }
        let (width, height) = (layout.width, layout.height);
        let (bw, bh) = Self::block_grid(width, height);
        debug!(width, height, blocks = bw * bh, "encoding PVRTC4");
        let source = |px: usize, py: usize| colors[py.min(height - 1) * width + px.min(width - 1)];

        // Pass 1: per-block bounding box endpoints.
        let blocks: Vec<PvrtcBlock> = (0..bw * bh)
            .into_par_iter()
            .map(|i| {
                let (bx, by) = (i % bw, i / bw);
                let mut lo = [255u8; 4];
                let mut hi = [0u8; 4];
                for j in 0..4 {
                    for k in 0..4 {
                        let c = source(bx * 4 + k, by * 4 + j).to_array();
                        for ch in 0..4 {
                            lo[ch] = lo[ch].min(c[ch]);
                            hi[ch] = hi[ch].max(c[ch]);
                        }
                    }
                }
                let opaque = lo[3] == 255;
                PvrtcBlock {
                    modulation: 0,
                    color: pack_b(Color::from_array(hi), opaque) << 16
                        | pack_a(Color::from_array(lo), opaque),
                }
            })
            .collect();
        let grid = Grid::new(bw, bh, blocks);

        // Pass 2: choose each pixel's modulation against the interpolated endpoints.
        let modulations: Vec<u32> = (0..bw * bh)
            .into_par_iter()
            .map(|i| {
                let (bx, by) = (i % bw, i / bw);
                let mut modulation = 0u32;
                for j in 0..4 {
                    for k in 0..4 {
                        let (px, py) = (bx * 4 + k, by * 4 + j);
                        let target = source(px, py);
                        let (a, b) = grid.endpoints(px, py);
                        let m = (0..4)
                            .min_by_key(|&m| (target.distance_sq(modulate(a, b, m, false)), m))
                            .unwrap_or(0);
                        modulation |= (m as u32) << (2 * (j * 4 + k));
                    }
                }
                modulation
            })
            .collect();

        let mut out = vec![0u8; bw * bh * 8];
        for by in 0..bh {
            for bx in 0..bw {
                let i = by * bw + bx;
                let block = PvrtcBlock {
                    modulation: modulations[i],
                    color: grid.blocks[i].color,
                };
                let at = twiddle(bx, by, bw, bh) * 8;
                block.write(&mut out[at..at + 8]);
            }
        }
        Ok(out)
    }
}
