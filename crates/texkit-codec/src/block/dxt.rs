//! DXT1, DXT3 and DXT5 (BC1, BC2, BC3).
//!
//! All three share the 8-byte color block:
//!
//! | bytes | content |
//! |---|---|
//! | 0..2 | `color0`, RGB565, little endian |
//! | 2..4 | `color1`, RGB565, little endian |
//! | 4..8 | 16 two-bit indices, pixel *i* (row-major) at bits `2i..2i+2` of a little-endian `u32` |
//!
//! When `color0 > color1` the palette is `c0, c1, (2 c0 + c1) / 3,
//! (c0 + 2 c1) / 3`; otherwise it is `c0, c1, (c0 + c1) / 2, transparent`.
//! DXT3 and DXT5 always use the four-color palette.
//!
//! DXT3 prefixes the color block with 64 bits of explicit alpha (pixel *i* in
//! bits `4i..4i+4` of a little-endian `u64`). DXT5 prefixes it with a BC4
//! alpha block (see [`super::ati`]).

use super::ati::{decode_alpha_block, encode_alpha_block};
use super::endpoints::principal_endpoints;
use super::BlockCodec;
use crate::color::{bits, Color};
use crate::format::ChannelLayout;

fn to_565(c: Color) -> u16 {
    ((bits::nearest(c.r, 5) << 11) | (bits::nearest(c.g, 6) << 5) | bits::nearest(c.b, 5)) as u16
}

fn from_565(v: u16) -> Color {
    let v = v as u32;
    Color::rgb(
        bits::expand(v >> 11, 5),
        bits::expand((v >> 5) & 0x3F, 6),
        bits::expand(v & 0x1F, 5),
    )
}

fn lerp(a: Color, b: Color, num: u32, den: u32) -> Color {
    let mix = |x: u8, y: u8| ((x as u32 * (den - num) + y as u32 * num) / den) as u8;
    Color::rgb(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
}

fn color_table(c0: u16, c1: u16, four: bool) -> [Color; 4] {
    let (a, b) = (from_565(c0), from_565(c1));
    if four {
        [a, b, lerp(a, b, 1, 3), lerp(a, b, 2, 3)]
    } else {
        [a, b, lerp(a, b, 1, 2), Color::TRANSPARENT]
    }
}

pub(crate) fn decode_color_block(block: &[u8], out: &mut [Color], force_four: bool) {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let table = color_table(c0, c1, force_four || c0 > c1);
    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
    for (i, px) in out.iter_mut().enumerate().take(16) {
        *px = table[((indices >> (2 * i)) & 3) as usize];
    }
}

/// Encode 16 colors. With `punch_through`, pixels with alpha below 128
/// select the transparent entry of the three-color palette.
pub(crate) fn encode_color_block(colors: &[Color], out: &mut [u8], punch_through: bool) {
    let transparent: Vec<bool> = colors.iter().map(|c| punch_through && c.a < 128).collect();
    let opaque: Vec<Color> = colors
        .iter()
        .zip(&transparent)
        .filter(|&(_, &t)| !t)
        .map(|(c, _)| *c)
        .collect();

    if opaque.is_empty() {
        out[..4].fill(0);
        out[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        return;
    }

    let (high, low) = principal_endpoints(&opaque, 3);
    let (mut c0, mut c1) = (to_565(high), to_565(low));
    let three = transparent.iter().any(|&t| t);
    if (three && c0 > c1) || (!three && c0 < c1) {
        std::mem::swap(&mut c0, &mut c1);
    }

    let table = color_table(c0, c1, !three);
    let candidates = if three { 3 } else { 4 };
    let mut indices = 0u32;
    for (i, (c, &t)) in colors.iter().zip(&transparent).enumerate() {
        let index = if t {
            3
        } else {
            (0..candidates)
                .min_by_key(|&k| (c.distance_sq_rgb(table[k]), k))
                .unwrap_or(0)
        };
        indices |= (index as u32) << (2 * i);
    }

    out[0..2].copy_from_slice(&c0.to_le_bytes());
    out[2..4].copy_from_slice(&c1.to_le_bytes());
    out[4..8].copy_from_slice(&indices.to_le_bytes());
}

/// DXT1 / BC1: 4 bits per pixel, RGB with one-bit punch-through alpha.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dxt1;

impl BlockCodec for Dxt1 {
    fn name(&self) -> &str {
        "DXT1"
    }

    fn channels(&self) -> ChannelLayout {
        ChannelLayout::Rgba
    }

    fn block_bytes(&self) -> usize {
        8
    }

    fn decode_block(&self, block: &[u8], out: &mut [Color]) {
        decode_color_block(block, out, false);
    }

    fn encode_block(&self, colors: &[Color], out: &mut [u8]) {
        encode_color_block(colors, out, true);
    }
}

/// DXT3 / BC2: BC1 color plus explicit 4-bit alpha.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dxt3;

impl BlockCodec for Dxt3 {
    fn name(&self) -> &str {
        "DXT3"
    }

    fn channels(&self) -> ChannelLayout {
        ChannelLayout::Rgba
    }

    fn block_bytes(&self) -> usize {
        16
    }

    fn decode_block(&self, block: &[u8], out: &mut [Color]) {
        decode_color_block(&block[8..16], out, true);
        let mut alpha = [0u8; 8];
        alpha.copy_from_slice(&block[..8]);
        let alpha = u64::from_le_bytes(alpha);
        for (i, px) in out.iter_mut().enumerate().take(16) {
            px.a = bits::expand(((alpha >> (4 * i)) & 0xF) as u32, 4);
        }
    }

    fn encode_block(&self, colors: &[Color], out: &mut [u8]) {
        let alpha = colors
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, c)| acc | ((bits::nearest(c.a, 4) as u64) << (4 * i)));
        out[..8].copy_from_slice(&alpha.to_le_bytes());
        encode_color_block(colors, &mut out[8..16], false);
    }
}

/// DXT5 / BC3: BC1 color plus an interpolated BC4 alpha block.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dxt5;

impl BlockCodec for Dxt5 {
    fn name(&self) -> &str {
        "DXT5"
    }

    fn channels(&self) -> ChannelLayout {
        ChannelLayout::Rgba
    }

    fn block_bytes(&self) -> usize {
        16
    }

    fn decode_block(&self, block: &[u8], out: &mut [Color]) {
        decode_color_block(&block[8..16], out, true);
        let mut alpha = [0u8; 16];
        decode_alpha_block(&block[..8], &mut alpha);
        for (px, a) in out.iter_mut().zip(alpha) {
            px.a = a;
        }
    }

    fn encode_block(&self, colors: &[Color], out: &mut [u8]) {
        let mut alpha = [0u8; 16];
        for (a, c) in alpha.iter_mut().zip(colors) {
            *a = c.a;
        }
        encode_alpha_block(&alpha, &mut out[..8]);
        encode_color_block(colors, &mut out[8..16], false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn round_trip<C: BlockCodec>(codec: &C, colors: &[Color]) -> Vec<Color> {
        let mut block = vec![0u8; codec.block_bytes()];
        codec.encode_block(colors, &mut block);
        let mut out = vec![Color::TRANSPARENT; 16];
        codec.decode_block(&block, &mut out);
        out
    }

    fn max_channel_error(a: &[Color], b: &[Color]) -> [u8; 4] {
        let mut err = [0u8; 4];
        for (x, y) in a.iter().zip(b) {
            for ch in 0..4 {
                err[ch] = err[ch].max(x.to_array()[ch].abs_diff(y.to_array()[ch]));
            }
        }
        err
    }

    #[test]
    fn test_565_known_values() {
        assert_eq!(to_565(Color::rgb(255, 0, 0)), 0xF800);
        assert_eq!(to_565(Color::rgb(0, 255, 0)), 0x07E0);
        assert_eq!(from_565(0x001F), Color::rgb(0, 0, 255));
    }

    #[test]
    fn test_solid_red_is_exact() {
        let red = [Color::rgb(255, 0, 0); 16];
        let mut block = [0u8; 8];
        Dxt1.encode_block(&red, &mut block);
        assert_eq!(&block[..4], &[0x00, 0xF8, 0x00, 0xF8]);
        assert_eq!(round_trip(&Dxt1, &red), red.to_vec());
    }

    #[test]
    fn test_four_color_palette_layout() {
        // c0 = white, c1 = black, indices 0, 1, 2, 3 repeated.
        let block = [0xFF, 0xFF, 0x00, 0x00, 0xE4, 0xE4, 0xE4, 0xE4];
        let mut out = [Color::TRANSPARENT; 16];
        Dxt1.decode_block(&block, &mut out);
        assert_eq!(out[0], Color::WHITE);
        assert_eq!(out[1], Color::BLACK);
        assert_eq!(out[2], Color::grey(170));
        assert_eq!(out[3], Color::grey(85));
    }

    #[test]
    fn test_three_color_mode_transparency() {
        let block = [0x00, 0x00, 0xFF, 0xFF, 0xE4, 0xE4, 0xE4, 0xE4];
        let mut out = [Color::BLACK; 16];
        Dxt1.decode_block(&block, &mut out);
        assert_eq!(out[2], Color::grey(127));
        assert_eq!(out[3], Color::TRANSPARENT);
    }

    #[test]
    fn test_punch_through_alpha() {
        let mut colors = [Color::rgb(30, 60, 90); 16];
        colors[5] = Color::new(0, 0, 0, 10);
        let out = round_trip(&Dxt1, &colors);
        assert_eq!(out[5].a, 0);
        assert!(out.iter().enumerate().all(|(i, c)| i == 5 || c.a == 255));
    }

    #[test]
    fn test_two_color_block_error_bounded() {
        let a = Color::rgb(200, 40, 17);
        let b = Color::rgb(12, 180, 240);
        let colors: Vec<_> = (0..16).map(|i| if i < 7 { a } else { b }).collect();
        let err = max_channel_error(&colors, &round_trip(&Dxt1, &colors));
        assert!(err[0] <= 4 && err[1] <= 2 && err[2] <= 4, "error {:?}", err);
    }

    #[test]
    fn test_gradient_error_bounded() {
        let colors: Vec<_> = (0..16).map(|i| Color::grey(i * 16)).collect();
        let err = max_channel_error(&colors, &round_trip(&Dxt1, &colors));
        // 240 / 3 steps: each pixel is at most half an interpolation step off.
        assert!(err.iter().take(3).all(|&e| e <= 44), "error {:?}", err);
    }

    #[test]
    fn test_dxt3_alpha_layout() {
        let mut colors = [Color::rgb(0, 0, 0); 16];
        colors[0].a = 0;
        colors[1].a = 0x11;
        colors[15].a = 0xFF;
        let mut block = [0u8; 16];
        Dxt3.encode_block(&colors, &mut block);
        // Pixel 0 in the low nibble, pixel 1 in the high nibble.
        assert_eq!(block[0], 0x10);
        assert_eq!(block[7] >> 4, 0xF);
        let out = round_trip(&Dxt3, &colors);
        assert_eq!((out[0].a, out[1].a, out[15].a), (0, 0x11, 0xFF));
    }

    #[test]
    fn test_dxt3_alpha_error_bounded() {
        let colors: Vec<_> = (0..16).map(|i| Color::new(9, 9, 9, i * 13 + 7)).collect();
        let err = max_channel_error(&colors, &round_trip(&Dxt3, &colors));
        assert!(err[3] <= 8, "alpha error {}", err[3]);
    }

    #[test]
    fn test_dxt5_keeps_two_alpha_levels_exact() {
        let colors: Vec<_> = (0..16)
            .map(|i| Color::new(100, 150, 200, if i % 2 == 0 { 37 } else { 201 }))
            .collect();
        let out = round_trip(&Dxt5, &colors);
        for (o, c) in out.iter().zip(&colors) {
            assert_eq!(o.a, c.a);
        }
    }

    #[test]
    fn test_forced_four_color_ignores_endpoint_order() {
        // Identical endpoints would select three-color mode in DXT1.
        let colors = [Color::rgb(40, 40, 40); 16];
        let out = round_trip(&Dxt5, &colors);
        assert!(out.iter().all(|c| c.a == 255 && c.r.abs_diff(40) <= 4));
    }
}
