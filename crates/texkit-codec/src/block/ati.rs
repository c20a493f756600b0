//! ATI1 / ATI2 (BC4 / BC5) and the interpolated alpha block used by DXT5.
//!
//! One 8-byte block stores a single 8-bit channel:
//!
//! | bytes | content |
//! |---|---|
//! | 0 | endpoint `a0` |
//! | 1 | endpoint `a1` |
//! | 2..8 | 16 three-bit indices, pixel *i* (row-major) at bits `3i..3i+3` of a little-endian 48-bit integer |
//!
//! With `a0 > a1` the table holds `a0`, `a1` and six interpolants in
//! sevenths; otherwise `a0`, `a1`, four interpolants in fifths, then `0` and
//! `255`.

use super::BlockCodec;
use crate::color::Color;
use crate::format::ChannelLayout;

fn value_table(a0: u8, a1: u8) -> [u8; 8] {
    let (x, y) = (a0 as u32, a1 as u32);
    let mix = |num: u32, den: u32| ((x * (den - num) + y * num) / den) as u8;
    if a0 > a1 {
        [a0, a1, mix(1, 7), mix(2, 7), mix(3, 7), mix(4, 7), mix(5, 7), mix(6, 7)]
    } else {
        [a0, a1, mix(1, 5), mix(2, 5), mix(3, 5), mix(4, 5), 0, 255]
    }
}

pub(crate) fn decode_alpha_block(block: &[u8], out: &mut [u8; 16]) {
    let table = value_table(block[0], block[1]);
    let indices = block[2..8]
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64);
    for (i, v) in out.iter_mut().enumerate() {
        *v = table[((indices >> (3 * i)) & 7) as usize];
    }
}

/// Pick indices for `table`, returning the packed indices and total squared error.
fn assign(values: &[u8; 16], table: &[u8; 8]) -> (u64, u64) {
    let mut indices = 0u64;
    let mut error = 0u64;
    for (i, &v) in values.iter().enumerate() {
        let (best, err) = table
            .iter()
            .enumerate()
            .map(|(k, &t)| (k, (t as i64 - v as i64).pow(2) as u64))
            .min_by_key(|&(k, err)| (err, k))
            .unwrap_or((0, 0));
        indices |= (best as u64) << (3 * i);
        error += err;
    }
    (indices, error)
}

/// Encode 16 values, trying both table modes and keeping the better one.
///
/// The eight-value mode spans the block's full range. The six-value mode
/// spans the values strictly between 0 and 255 and gets the extremes for
/// free, which wins for masks with hard edges plus a few mid tones.
pub(crate) fn encode_alpha_block(values: &[u8; 16], out: &mut [u8]) {
    let max = values.iter().copied().max().unwrap_or(0);
    let min = values.iter().copied().min().unwrap_or(0);

    let mut best = (max, min, 0u64, u64::MAX);
    if max > min {
        let (indices, err) = assign(values, &value_table(max, min));
        best = (max, min, indices, err);
    }

    let inner = values.iter().copied().filter(|&v| v != 0 && v != 255);
    let lo = inner.clone().min().unwrap_or(0);
    let hi = inner.max().unwrap_or(0);
    let (indices, err) = assign(values, &value_table(lo, hi));
    if err < best.3 {
        best = (lo, hi, indices, err);
    }

    let (a0, a1, indices, _) = best;
    out[0] = a0;
    out[1] = a1;
    out[2..8].copy_from_slice(&indices.to_le_bytes()[..6]);
}

/// Which channel a single-channel ATI1 texture carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ati1Channel {
    /// Luminance, decoded as an opaque grey.
    #[default]
    Luminance,
    /// Alpha, decoded over black.
    Alpha,
    /// Red, decoded with green and blue at zero.
    Red,
}

impl Ati1Channel {
    fn extract(self, c: Color) -> u8 {
        match self {
            Ati1Channel::Luminance => c.luminance(),
            Ati1Channel::Alpha => c.a,
            Ati1Channel::Red => c.r,
        }
    }

    fn rebuild(self, v: u8) -> Color {
        match self {
            Ati1Channel::Luminance => Color::grey(v),
            Ati1Channel::Alpha => Color::new(0, 0, 0, v),
            Ati1Channel::Red => Color::rgb(v, 0, 0),
        }
    }
}

fn gather(colors: &[Color], f: impl Fn(Color) -> u8) -> [u8; 16] {
    let mut values = [0u8; 16];
    for (v, &c) in values.iter_mut().zip(colors) {
        *v = f(c);
    }
    values
}

/// ATI1 / BC4: one channel, 4 bits per pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ati1 {
    channel: Ati1Channel,
}

impl Ati1 {
    pub fn new(channel: Ati1Channel) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> Ati1Channel {
        self.channel
    }
}

impl BlockCodec for Ati1 {
    fn name(&self) -> &str {
        match self.channel {
            Ati1Channel::Luminance => "ATI1L",
            Ati1Channel::Alpha => "ATI1A",
            Ati1Channel::Red => "ATI1R",
        }
    }

    fn channels(&self) -> ChannelLayout {
        match self.channel {
            Ati1Channel::Luminance => ChannelLayout::Luminance,
            Ati1Channel::Alpha => ChannelLayout::Alpha,
            Ati1Channel::Red => ChannelLayout::Red,
        }
    }

    fn block_bytes(&self) -> usize {
        8
    }

    fn decode_block(&self, block: &[u8], out: &mut [Color]) {
        let mut values = [0u8; 16];
        decode_alpha_block(block, &mut values);
        for (px, v) in out.iter_mut().zip(values) {
            *px = self.channel.rebuild(v);
        }
    }

    fn encode_block(&self, colors: &[Color], out: &mut [u8]) {
        let values = gather(colors, |c| self.channel.extract(c));
        encode_alpha_block(&values, out);
    }
}

/// The channel pair an ATI2 texture carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ati2Channels {
    /// Red and green (normal maps); blue decodes as 0.
    #[default]
    RedGreen,
    /// Luminance and alpha.
    LuminanceAlpha,
}

/// ATI2 / BC5: two independent BC4 blocks, 8 bits per pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ati2 {
    channels: Ati2Channels,
}

impl Ati2 {
    pub fn new(channels: Ati2Channels) -> Self {
        Self { channels }
    }
}

impl BlockCodec for Ati2 {
    fn name(&self) -> &str {
        match self.channels {
            Ati2Channels::RedGreen => "ATI2",
            Ati2Channels::LuminanceAlpha => "ATI2LA",
        }
    }

    fn channels(&self) -> ChannelLayout {
        match self.channels {
            Ati2Channels::RedGreen => ChannelLayout::RedGreen,
            Ati2Channels::LuminanceAlpha => ChannelLayout::LuminanceAlpha,
        }
    }

    fn block_bytes(&self) -> usize {
        16
    }

    fn decode_block(&self, block: &[u8], out: &mut [Color]) {
        let (mut first, mut second) = ([0u8; 16], [0u8; 16]);
        decode_alpha_block(&block[..8], &mut first);
        decode_alpha_block(&block[8..16], &mut second);
        for ((px, x), y) in out.iter_mut().zip(first).zip(second) {
            *px = match self.channels {
                Ati2Channels::RedGreen => Color::rgb(x, y, 0),
                Ati2Channels::LuminanceAlpha => Color::new(x, x, x, y),
            };
        }
    }

    fn encode_block(&self, colors: &[Color], out: &mut [u8]) {
        let (first, second) = match self.channels {
            Ati2Channels::RedGreen => (gather(colors, |c| c.r), gather(colors, |c| c.g)),
            Ati2Channels::LuminanceAlpha => {
                (gather(colors, |c| c.luminance()), gather(colors, |c| c.a))
            }
        };
        encode_alpha_block(&first, &mut out[..8]);
        encode_alpha_block(&second, &mut out[8..16]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn round_trip(values: [u8; 16]) -> ([u8; 8], [u8; 16]) {
        let mut block = [0u8; 8];
        encode_alpha_block(&values, &mut block);
        let mut out = [0u8; 16];
        decode_alpha_block(&block, &mut out);
        (block, out)
    }

    #[test]
    fn test_eight_value_table() {
        assert_eq!(value_table(255, 0), [255, 0, 218, 182, 145, 109, 72, 36]);
    }

    #[test]
    fn test_six_value_table() {
        assert_eq!(value_table(0, 255), [0, 255, 51, 102, 153, 204, 0, 255]);
    }

    #[test]
    fn test_index_bit_layout() {
        // a0 > a1, pixel 0 -> index 1, pixel 1 -> index 7, everything else 0.
        let block = [200, 100, 0b00_111_001, 0, 0, 0, 0, 0];
        let mut out = [0u8; 16];
        decode_alpha_block(&block, &mut out);
        assert_eq!(out[0], 100);
        // Index 7 of an 8-value block is (6 * a0 + 1 * a1) / 7 for a0 > a1.
        assert_eq!(out[1] as u32, (200 + 6 * 100u32) / 7);
        assert!(out[2..].iter().all(|&v| v == 200));
    }

    #[test]
    fn test_solid_block_exact() {
        let (_, out) = round_trip([77; 16]);
        assert_eq!(out, [77; 16]);
    }

    #[test]
    fn test_prefers_extremes_mode_for_masks() {
        let mut values = [0u8; 16];
        for (i, v) in values.iter_mut().enumerate() {
            *v = match i % 4 {
                0 => 0,
                1 => 255,
                2 => 100,
                _ => 110,
            };
        }
        let (block, out) = round_trip(values);
        assert!(block[0] <= block[1], "expected six-value mode");
        assert_eq!(out, values);
    }

    #[test]
    fn test_gradient_error_bounded() {
        let values: [u8; 16] = std::array::from_fn(|i| (i * 17) as u8);
        let (_, out) = round_trip(values);
        for (o, v) in out.iter().zip(values) {
            assert!(o.abs_diff(v) <= 19, "{} vs {}", o, v);
        }
    }

    #[test]
    fn test_ati2_red_green() {
        let colors: Vec<_> = (0..16)
            .map(|i| Color::rgb(if i < 8 { 10 } else { 250 }, 128, 77))
            .collect();
        let mut block = [0u8; 16];
        let codec = Ati2::new(Ati2Channels::RedGreen);
        codec.encode_block(&colors, &mut block);
        let mut out = [Color::TRANSPARENT; 16];
        codec.decode_block(&block, &mut out);
        for (o, c) in out.iter().zip(&colors) {
            assert_eq!(*o, Color::rgb(c.r, c.g, 0));
        }
    }

    #[test]
    fn test_ati1_channels() {
        let colors = [Color::new(90, 90, 90, 30); 16];
        let mut block = [0u8; 8];
        let mut out = [Color::TRANSPARENT; 16];

        let alpha = Ati1::new(Ati1Channel::Alpha);
        alpha.encode_block(&colors, &mut block);
        alpha.decode_block(&block, &mut out);
        assert_eq!(out[0], Color::new(0, 0, 0, 30));

        let lum = Ati1::new(Ati1Channel::Luminance);
        lum.encode_block(&colors, &mut block);
        lum.decode_block(&block, &mut out);
        assert_eq!(out[0], Color::grey(90));
    }
}
