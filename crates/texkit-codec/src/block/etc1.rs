//! ETC1 and ETC1A4.
//!
//! An ETC1 block is a 64-bit word, big endian by default (handheld variants
//! store it little endian). The 4x4 block is split into two 2x4 or 4x2
//! sub-blocks, each with a base color and one of eight modifier tables.
//!
//! | bits | individual mode | differential mode |
//! |---|---|---|
//! | 63..56 | R1 (4) R2 (4) | R (5) dR (3) |
//! | 55..48 | G1 (4) G2 (4) | G (5) dG (3) |
//! | 47..40 | B1 (4) B2 (4) | B (5) dB (3) |
//! | 39..37 | table of sub-block 1 | same |
//! | 36..34 | table of sub-block 2 | same |
//! | 33 | diff flag = 0 | diff flag = 1 |
//! | 32 | flip | flip |
//! | 31..16 | index MSBs | same |
//! | 15..0 | index LSBs | same |
//!
//! Pixel `(x, y)` owns index bit `x * 4 + y` (column-major). With flip = 0
//! the sub-blocks are the left and right 2x4 halves, with flip = 1 the top
//! and bottom 4x2 halves. Index `msb:lsb` selects `+a`, `+b`, `-a`, `-b`
//! from the sub-block's table row `[a, b]`.
//!
//! ETC1A4 prefixes the block with 64 bits of 4-bit alpha, pixel `(x, y)` in
//! bits `4 (x * 4 + y)` of a little-endian `u64`.

use super::BlockCodec;
use crate::color::{bits, Color};
use crate::format::{ByteOrder, ChannelLayout};

const MODIFIERS: [[i32; 2]; 8] = [
    [2, 8],
    [5, 17],
    [9, 29],
    [13, 42],
    [18, 60],
    [24, 80],
    [33, 106],
    [47, 183],
];

#[inline]
fn in_second_subblock(x: usize, y: usize, flip: bool) -> bool {
    if flip {
        y >= 2
    } else {
        x >= 2
    }
}

#[inline]
fn modify(base: [i32; 3], table: usize, index: usize) -> [u8; 3] {
    let [a, b] = MODIFIERS[table];
    let delta = [a, b, -a, -b][index];
    base.map(|c| (c + delta).clamp(0, 255) as u8)
}

fn read_word(block: &[u8], order: ByteOrder) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&block[..8]);
    match order {
        ByteOrder::Big => u64::from_be_bytes(bytes),
        ByteOrder::Little => u64::from_le_bytes(bytes),
    }
}

fn write_word(word: u64, out: &mut [u8], order: ByteOrder) {
    let bytes = match order {
        ByteOrder::Big => word.to_be_bytes(),
        ByteOrder::Little => word.to_le_bytes(),
    };
    out[..8].copy_from_slice(&bytes);
}

fn decode_word(word: u64, out: &mut [Color]) {
    let field = |shift: u32, width: u32| ((word >> shift) & ((1 << width) - 1)) as u32;
    let diff = field(33, 1) == 1;
    let flip = field(32, 1) == 1;

    let mut bases = [[0i32; 3]; 2];
    for ch in 0..3 {
        let shift = 59 - 8 * ch as u32;
        if diff {
            let base = field(shift, 5) as i32;
            let delta = ((field(shift - 3, 3) as i32) << 29) >> 29;
            bases[0][ch] = bits::expand(base as u32, 5) as i32;
            bases[1][ch] = bits::expand(((base + delta) & 0x1F) as u32, 5) as i32;
        } else {
            bases[0][ch] = bits::expand(field(shift + 1, 4), 4) as i32;
            bases[1][ch] = bits::expand(field(shift - 3, 4), 4) as i32;
        }
    }
    let tables = [field(37, 3) as usize, field(34, 3) as usize];

    for y in 0..4 {
        for x in 0..4 {
            let bit = (x * 4 + y) as u32;
            let index = (field(16 + bit, 1) << 1 | field(bit, 1)) as usize;
            let sub = in_second_subblock(x, y, flip) as usize;
            let [r, g, b] = modify(bases[sub], tables[sub], index);
            out[y * 4 + x] = Color::rgb(r, g, b);
        }
    }
}

/// Best table and indices for one sub-block around `base`.
struct SubblockFit {
    table: usize,
    indices: Vec<(usize, usize)>,
    error: u64,
}

fn fit_subblock(colors: &[Color], pixels: &[(usize, usize)], base: [i32; 3]) -> SubblockFit {
    let mut best = SubblockFit {
        table: 0,
        indices: Vec::new(),
        error: u64::MAX,
    };
    for table in 0..MODIFIERS.len() {
        let mut error = 0u64;
        let mut indices = Vec::with_capacity(pixels.len());
        for &(x, y) in pixels {
            let c = colors[y * 4 + x];
            let (index, err) = (0..4)
                .map(|i| {
                    let [r, g, b] = modify(base, table, i);
                    (i, c.distance_sq_rgb(Color::rgb(r, g, b)) as u64)
                })
                .min_by_key(|&(i, err)| (err, i))
                .unwrap_or((0, 0));
            error += err;
            indices.push((x * 4 + y, index));
        }
        if error < best.error {
            best = SubblockFit {
                table,
                indices,
                error,
            };
        }
    }
    best
}

fn subblock_pixels(flip: bool) -> [Vec<(usize, usize)>; 2] {
    let mut subs = [Vec::with_capacity(8), Vec::with_capacity(8)];
    for y in 0..4 {
        for x in 0..4 {
            subs[in_second_subblock(x, y, flip) as usize].push((x, y));
        }
    }
    subs
}

fn average(colors: &[Color], pixels: &[(usize, usize)]) -> [u8; 3] {
    let mut sum = [0u32; 3];
    for &(x, y) in pixels {
        let c = colors[y * 4 + x];
        sum[0] += c.r as u32;
        sum[1] += c.g as u32;
        sum[2] += c.b as u32;
    }
    let n = pixels.len() as u32;
    sum.map(|s| ((s + n / 2) / n) as u8)
}

/// Search both modes, both flips and all tables; return the best word.
fn encode_word(colors: &[Color]) -> u64 {
    let mut best: Option<(u64, u64)> = None;
    for diff in [true, false] {
        for flip in [false, true] {
            let subs = subblock_pixels(flip);
            let avg = [average(colors, &subs[0]), average(colors, &subs[1])];

            let mut color_bits = 0u64;
            let mut bases = [[0i32; 3]; 2];
            let mut valid = true;
            for ch in 0..3 {
                let shift = 59 - 8 * ch as u64;
                if diff {
                    let q0 = bits::nearest(avg[0][ch], 5) as i32;
                    let q1 = bits::nearest(avg[1][ch], 5) as i32;
                    let delta = q1 - q0;
                    if !(-4..=3).contains(&delta) {
                        valid = false;
                        break;
                    }
                    color_bits |= (q0 as u64) << shift;
                    color_bits |= ((delta & 7) as u64) << (shift - 3);
                    bases[0][ch] = bits::expand(q0 as u32, 5) as i32;
                    bases[1][ch] = bits::expand(q1 as u32, 5) as i32;
                } else {
                    let q0 = bits::nearest(avg[0][ch], 4);
                    let q1 = bits::nearest(avg[1][ch], 4);
                    color_bits |= (q0 as u64) << (shift + 1);
                    color_bits |= (q1 as u64) << (shift - 3);
                    bases[0][ch] = bits::expand(q0, 4) as i32;
                    bases[1][ch] = bits::expand(q1, 4) as i32;
                }
            }
            if !valid {
                continue;
            }

            let fits = [
                fit_subblock(colors, &subs[0], bases[0]),
                fit_subblock(colors, &subs[1], bases[1]),
            ];
            let error = fits[0].error + fits[1].error;
            if best.is_some_and(|(e, _)| e <= error) {
                continue;
            }

            let mut word = color_bits
                | (fits[0].table as u64) << 37
                | (fits[1].table as u64) << 34
                | (diff as u64) << 33
                | (flip as u64) << 32;
            for fit in &fits {
                for &(bit, index) in &fit.indices {
                    word |= ((index >> 1) as u64) << (16 + bit);
                    word |= ((index & 1) as u64) << bit;
                }
            }
            best = Some((error, word));
        }
    }
    best.map(|(_, w)| w).unwrap_or(0)
}

/// ETC1: 4 bits per pixel, opaque RGB.
#[derive(Debug, Clone, Copy)]
pub struct Etc1 {
    byte_order: ByteOrder,
}

impl Default for Etc1 {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Big,
        }
    }
}

impl Etc1 {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self { byte_order }
    }
}

impl BlockCodec for Etc1 {
    fn name(&self) -> &str {
        match self.byte_order {
            ByteOrder::Big => "ETC1",
            ByteOrder::Little => "ETC1LE",
        }
    }

    fn channels(&self) -> ChannelLayout {
        ChannelLayout::Rgb
    }

    fn block_bytes(&self) -> usize {
        8
    }

    fn decode_block(&self, block: &[u8], out: &mut [Color]) {
        decode_word(read_word(block, self.byte_order), out);
    }

    fn encode_block(&self, colors: &[Color], out: &mut [u8]) {
        write_word(encode_word(colors), out, self.byte_order);
    }
}

/// ETC1A4: ETC1 color plus explicit 4-bit alpha, 8 bits per pixel.
#[derive(Debug, Clone, Copy)]
pub struct Etc1A4 {
    byte_order: ByteOrder,
}

impl Default for Etc1A4 {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Big,
        }
    }
}

impl Etc1A4 {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self { byte_order }
    }
}

impl BlockCodec for Etc1A4 {
    fn name(&self) -> &str {
        match self.byte_order {
            ByteOrder::Big => "ETC1A4",
            ByteOrder::Little => "ETC1A4LE",
        }
    }

    fn channels(&self) -> ChannelLayout {
        ChannelLayout::Rgba
    }

    fn block_bytes(&self) -> usize {
        16
    }

    fn decode_block(&self, block: &[u8], out: &mut [Color]) {
        decode_word(read_word(&block[8..], self.byte_order), out);
        let alpha = read_word(block, ByteOrder::Little);
        for y in 0..4 {
            for x in 0..4 {
                let nibble = (alpha >> (4 * (x * 4 + y))) & 0xF;
                out[y * 4 + x].a = bits::expand(nibble as u32, 4);
            }
        }
    }

    fn encode_block(&self, colors: &[Color], out: &mut [u8]) {
        let mut alpha = 0u64;
        for y in 0..4 {
            for x in 0..4 {
                let a = bits::nearest(colors[y * 4 + x].a, 4) as u64;
                alpha |= a << (4 * (x * 4 + y));
            }
        }
        write_word(alpha, out, ByteOrder::Little);
        write_word(encode_word(colors), &mut out[8..], self.byte_order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<C: BlockCodec>(codec: &C, colors: &[Color]) -> Vec<Color> {
        let mut block = vec![0u8; codec.block_bytes()];
        codec.encode_block(colors, &mut block);
        let mut out = vec![Color::TRANSPARENT; 16];
        codec.decode_block(&block, &mut out);
        out
    }

    fn max_rgb_error(a: &[Color], b: &[Color]) -> u8 {
        a.iter()
            .zip(b)
            .map(|(x, y)| x.r.abs_diff(y.r).max(x.g.abs_diff(y.g)).max(x.b.abs_diff(y.b)))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_decode_individual_mode() {
        // R1=0xF R2=0x0, G1=0x0 G2=0xF, B1=B2=0x8, tables 0 and 0, no flip,
        // all indices 0 (+2).
        let word: u64 = 0xF0_0F_88_00_0000_0000;
        let mut out = [Color::TRANSPARENT; 16];
        decode_word(word, &mut out);
        assert_eq!(out[0], Color::rgb(255, 2, 138));
        assert_eq!(out[3], Color::rgb(2, 255, 138));
    }

    #[test]
    fn test_decode_differential_negative_delta() {
        // R = 16, dR = -1 (0b111); G, B zero; diff flag set, flip set.
        let word: u64 = (16u64 << 59) | (0b111u64 << 56) | (1 << 33) | (1 << 32);
        let mut out = [Color::TRANSPARENT; 16];
        decode_word(word, &mut out);
        assert_eq!(out[0].r, bits::expand(16, 5) + 2);
        assert_eq!(out[15].r, bits::expand(15, 5) + 2);
    }

    #[test]
    fn test_index_bits_are_column_major() {
        // Pixel (1, 0) owns bit 4; set its MSB so it takes -a.
        let word: u64 = (0x88u64 << 56) | (0x88 << 48) | (0x88 << 40) | (1 << (16 + 4));
        let mut out = [Color::TRANSPARENT; 16];
        decode_word(word, &mut out);
        assert_eq!(out[1].r, 0x88 - 2);
        assert_eq!(out[4].r, 0x88 + 2);
    }

    #[test]
    fn test_solid_blocks_within_tolerance() {
        for c in [
            Color::rgb(0, 0, 0),
            Color::rgb(255, 255, 255),
            Color::rgb(200, 30, 90),
            Color::rgb(17, 140, 251),
        ] {
            let colors = [c; 16];
            let err = max_rgb_error(&colors, &round_trip(&Etc1::default(), &colors));
            assert!(err <= 8, "{:?} error {}", c, err);
        }
    }

    #[test]
    fn test_split_block_uses_both_subblocks() {
        let colors: Vec<_> = (0..16)
            .map(|i| if i % 4 < 2 { Color::rgb(230, 20, 20) } else { Color::rgb(20, 20, 230) })
            .collect();
        let out = round_trip(&Etc1::default(), &colors);
        assert!(max_rgb_error(&colors, &out) <= 12);
    }

    #[test]
    fn test_little_endian_variant_matches_big_endian() {
        let colors: Vec<_> = (0..16).map(|i| Color::rgb(i * 9, 100, 255 - i * 9)).collect();
        let (mut be, mut le) = ([0u8; 8], [0u8; 8]);
        Etc1::new(ByteOrder::Big).encode_block(&colors, &mut be);
        Etc1::new(ByteOrder::Little).encode_block(&colors, &mut le);
        le.reverse();
        assert_eq!(be, le);
    }

    #[test]
    fn test_etc1a4_alpha() {
        let colors: Vec<_> = (0..16).map(|i| Color::new(60, 60, 60, i * 17)).collect();
        let out = round_trip(&Etc1A4::default(), &colors);
        for (o, c) in out.iter().zip(&colors) {
            assert_eq!(o.a, c.a);
        }
    }
}
