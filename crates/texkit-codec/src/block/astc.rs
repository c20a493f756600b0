//! ASTC with a 4x4 footprint (8 bits per pixel), LDR subset.
//!
//! A block is 128 bits read as a little-endian `u128`. Two block kinds are
//! understood:
//!
//! **Void extent** (constant color):
//!
//! | bits | content |
//! |---|---|
//! | 0..9 | `0x1FC` |
//! | 9 | HDR flag (must be 0) |
//! | 10..12 | reserved, `11` |
//! | 12..64 | extent coordinates, all ones |
//! | 64..128 | R, G, B, A as UNORM16 |
//!
//! **Block mode `0x042`**: 4x4 weight grid, 2-bit weights, one partition,
//! one plane, color endpoint mode 12 (LDR RGBA direct).
//!
//! | bits | content |
//! |---|---|
//! | 0..11 | block mode `0x042` |
//! | 11..13 | partition count - 1 = 0 |
//! | 13..17 | endpoint mode = 12 |
//! | 17..81 | eight 8-bit endpoint values `r0 r1 g0 g1 b0 b1 a0 a1` |
//! | 96..128 | sixteen 2-bit weights, bit-reversed from bit 127 |
//!
//! Weights unquantize to 0, 21, 43, 64. Endpoints whose RGB sum decreases
//! from `e0` to `e1` are swapped and blue-contracted, as the format
//! specifies. Any other block mode decodes to the error color, magenta.

use super::endpoints::principal_endpoints;
use super::BlockCodec;
use crate::color::Color;
use crate::format::ChannelLayout;

const VOID_EXTENT_LOW: u128 = 0xFFFF_FFFF_FFFF_FDFC;
const BLOCK_MODE: u128 = 0x042;
const ENDPOINT_MODE_RGBA: u128 = 12;
const WEIGHTS: [u32; 4] = [0, 21, 43, 64];
const ERROR_COLOR: Color = Color::new(255, 0, 255, 255);

fn blue_contract(c: [u32; 4]) -> [u32; 4] {
    [(c[0] + c[2]) >> 1, (c[1] + c[2]) >> 1, c[2], c[3]]
}

/// Decode CEM 12 endpoint values into `(e0, e1)`.
fn unpack_endpoints(v: [u32; 8]) -> ([u32; 4], [u32; 4]) {
    let s0 = v[0] + v[2] + v[4];
    let s1 = v[1] + v[3] + v[5];
    if s1 >= s0 {
        ([v[0], v[2], v[4], v[6]], [v[1], v[3], v[5], v[7]])
    } else {
        (
            blue_contract([v[1], v[3], v[5], v[7]]),
            blue_contract([v[0], v[2], v[4], v[6]]),
        )
    }
}

/// Interpolate in 16-bit UNORM space and keep the top byte.
fn interpolate(e0: [u32; 4], e1: [u32; 4], weight: u32) -> Color {
    let mix = |a: u32, b: u32| {
        let (a, b) = (a * 257, b * 257);
        (((a * (64 - weight) + b * weight + 32) >> 6) >> 8) as u8
    };
    Color::new(
        mix(e0[0], e1[0]),
        mix(e0[1], e1[1]),
        mix(e0[2], e1[2]),
        mix(e0[3], e1[3]),
    )
}

#[inline]
fn weight_index(bits: u128, pixel: usize) -> usize {
    let lo = (bits >> (127 - 2 * pixel)) & 1;
    let hi = (bits >> (126 - 2 * pixel)) & 1;
    (lo | hi << 1) as usize
}

fn decode(bits: u128, out: &mut [Color]) {
    if bits & 0x1FF == 0x1FC {
        let color = if bits & (1 << 9) != 0 {
            ERROR_COLOR
        } else {
            let ch = |i: u32| ((bits >> (64 + 16 * i)) & 0xFFFF) as u32 >> 8;
            Color::new(ch(0) as u8, ch(1) as u8, ch(2) as u8, ch(3) as u8)
        };
        out[..16].fill(color);
        return;
    }

    let supported = bits & 0x7FF == BLOCK_MODE
        && (bits >> 11) & 0x3 == 0
        && (bits >> 13) & 0xF == ENDPOINT_MODE_RGBA;
    if !supported {
        out[..16].fill(ERROR_COLOR);
        return;
    }

    let values: [u32; 8] = std::array::from_fn(|i| ((bits >> (17 + 8 * i)) & 0xFF) as u32);
    let (e0, e1) = unpack_endpoints(values);
    for (i, px) in out.iter_mut().enumerate().take(16) {
        *px = interpolate(e0, e1, WEIGHTS[weight_index(bits, i)]);
    }
}

fn encode(colors: &[Color]) -> u128 {
    let first = colors[0];
    if colors[..16].iter().all(|&c| c == first) {
        let unorm = |v: u8| v as u128 * 257;
        return VOID_EXTENT_LOW
            | unorm(first.r) << 64
            | unorm(first.g) << 80
            | unorm(first.b) << 96
            | unorm(first.a) << 112;
    }

    let (mut lo, mut hi) = principal_endpoints(&colors[..16], 4);
    let sum = |c: Color| c.r as u32 + c.g as u32 + c.b as u32;
    if sum(hi) < sum(lo) {
        std::mem::swap(&mut lo, &mut hi);
    }
    let e0 = lo.to_array().map(|v| v as u32);
    let e1 = hi.to_array().map(|v| v as u32);

    let mut bits = BLOCK_MODE | ENDPOINT_MODE_RGBA << 13;
    let values = [e0[0], e1[0], e0[1], e1[1], e0[2], e1[2], e0[3], e1[3]];
    for (i, &v) in values.iter().enumerate() {
        bits |= (v as u128) << (17 + 8 * i);
    }

    for (i, &c) in colors[..16].iter().enumerate() {
        let index = (0..4)
            .min_by_key(|&k| (c.distance_sq(interpolate(e0, e1, WEIGHTS[k])), k))
            .unwrap_or(0);
        bits |= ((index & 1) as u128) << (127 - 2 * i);
        bits |= ((index >> 1) as u128) << (126 - 2 * i);
    }
    bits
}

/// ASTC 4x4, LDR.
#[derive(Debug, Clone, Copy, Default)]
pub struct Astc4x4;

impl BlockCodec for Astc4x4 {
    fn name(&self) -> &str {
        "ASTC4x4"
    }

    fn channels(&self) -> ChannelLayout {
        ChannelLayout::Rgba
    }

    fn block_bytes(&self) -> usize {
        16
    }

    fn decode_block(&self, block: &[u8], out: &mut [Color]) {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&block[..16]);
        decode(u128::from_le_bytes(bytes), out);
    }

    fn encode_block(&self, colors: &[Color], out: &mut [u8]) {
        out[..16].copy_from_slice(&encode(colors).to_le_bytes());
    }
}
