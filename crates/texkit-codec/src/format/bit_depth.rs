//! Fixed-width channel packing for uncompressed pixel formats.
//!
//! A pixel is an integer of 4, 8, 16, 24 or 32 bits holding up to four
//! channels. Channels are listed most significant first, so `RGB565` with
//! [`ComponentOrder::Rgba`] stores red in bits 15..11, green in 10..5 and
//! blue in 4..0:
//!
//! ```text
//!  15      11 10         5 4       0
//! +----------+------------+---------+
//! |  R (5)   |   G (6)    |  B (5)  |
//! +----------+------------+---------+
//! ```
//!
//! Multi-byte pixels are stored little or big endian ([`ByteOrder`]).
//! Four-bit pixels are packed two per byte, low nibble first unless
//! [`NibbleOrder::HighFirst`] is configured.
//!
//! Encoding truncates each 8-bit channel to its field width. Decoding
//! widens by bit replication, so `decode(encode(c))` is within one
//! quantization step of `c` and exact for 8-bit fields.

use super::linear::PixelFormat;
use super::{ChannelLayout, FormatError};
use crate::color::{bits, Color};

/// Byte order of multi-byte pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Which pixel of a byte occupies the low nibble in 4-bit formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NibbleOrder {
    #[default]
    LowFirst,
    HighFirst,
}

/// Channel order of an RGBA pixel, most significant channel first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentOrder {
    #[default]
    Rgba,
    Argb,
    Bgra,
    Abgr,
}

impl ComponentOrder {
    /// Channel indices (0 = r, 1 = g, 2 = b, 3 = a), most significant first.
    fn channels(self) -> [usize; 4] {
        match self {
            ComponentOrder::Rgba => [0, 1, 2, 3],
            ComponentOrder::Argb => [3, 0, 1, 2],
            ComponentOrder::Bgra => [2, 1, 0, 3],
            ComponentOrder::Abgr => [3, 2, 1, 0],
        }
    }
}

/// Channel order of a luminance/alpha pixel, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaOrder {
    #[default]
    La,
    Al,
}

/// How pixel values are laid out in a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packing {
    bits: u32,
    byte_order: ByteOrder,
    nibble_order: NibbleOrder,
}

impl Packing {
    pub fn new(bits: u32) -> Result<Self, FormatError> {
        match bits {
            0 => Err(FormatError::Empty),
            4 | 8 | 16 | 24 | 32 => Ok(Self {
                bits,
                byte_order: ByteOrder::default(),
                nibble_order: NibbleOrder::default(),
            }),
            other => Err(FormatError::UnsupportedPixelSize(other)),
        }
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Bytes needed for `pixels` packed values.
    #[inline]
    pub fn data_len(&self, pixels: usize) -> usize {
        (pixels * self.bits as usize).div_ceil(8)
    }

    fn low_nibble_first(&self, index: usize) -> bool {
        (index % 2 == 0) == (self.nibble_order == NibbleOrder::LowFirst)
    }

    /// Read the value of pixel `index`. `data` must hold at least
    /// `data_len(index + 1)` bytes.
    pub fn read(&self, data: &[u8], index: usize) -> u32 {
        if self.bits == 4 {
            let byte = data[index / 2];
            return if self.low_nibble_first(index) {
                (byte & 0x0F) as u32
            } else {
                (byte >> 4) as u32
            };
        }
        let n = self.bits as usize / 8;
        let bytes = &data[index * n..index * n + n];
        match self.byte_order {
            ByteOrder::Little => bytes.iter().rev().fold(0, |acc, &b| (acc << 8) | b as u32),
            ByteOrder::Big => bytes.iter().fold(0, |acc, &b| (acc << 8) | b as u32),
        }
    }

    /// Store `value` as pixel `index`, leaving neighbouring nibbles intact.
    pub fn write(&self, out: &mut [u8], index: usize, value: u32) {
        if self.bits == 4 {
            let low = self.low_nibble_first(index);
            let slot = &mut out[index / 2];
            let v = (value & 0x0F) as u8;
            *slot = if low {
                (*slot & 0xF0) | v
            } else {
                (*slot & 0x0F) | (v << 4)
            };
            return;
        }
        let n = self.bits as usize / 8;
        for i in 0..n {
            let shift = match self.byte_order {
                ByteOrder::Little => 8 * i,
                ByteOrder::Big => 8 * (n - 1 - i),
            };
            out[index * n + i] = (value >> shift) as u8;
        }
    }
}

fn check_width(bits: u32) -> Result<u32, FormatError> {
    if bits > 8 {
        Err(FormatError::ChannelTooWide(bits))
    } else {
        Ok(bits)
    }
}

/// An RGBA pixel format with per-channel widths of 0 to 8 bits.
///
/// # Example
///
/// ```
/// use texkit_codec::{Color, ComponentOrder, RgbaFormat};
///
/// let rgb565 = RgbaFormat::new(5, 6, 5, 0, ComponentOrder::Rgba).unwrap();
/// assert_eq!(rgb565.name(), "RGB565");
/// assert_eq!(rgb565.encode_color(Color::rgb(255, 0, 0)), 0xF800);
/// assert_eq!(rgb565.decode_color(0x07E0), Color::rgb(0, 255, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFormat {
    name: String,
    widths: [u32; 4],
    shifts: [u32; 4],
    packing: Packing,
}

impl RgbaFormat {
    /// Build a format from channel widths in `r, g, b, a` order and the
    /// order in which the channels are stored.
    pub fn new(r: u32, g: u32, b: u32, a: u32, order: ComponentOrder) -> Result<Self, FormatError> {
        let widths = [check_width(r)?, check_width(g)?, check_width(b)?, check_width(a)?];
        let total: u32 = widths.iter().sum();
        let packing = Packing::new(total)?;

        let mut shifts = [0; 4];
        let mut remaining = total;
        let mut letters = String::new();
        let mut digits = String::new();
        for ch in order.channels() {
            remaining -= widths[ch];
            shifts[ch] = remaining;
            if widths[ch] > 0 {
                letters.push(['R', 'G', 'B', 'A'][ch]);
                digits.push_str(&widths[ch].to_string());
            }
        }

        Ok(Self {
            name: letters + &digits,
            widths,
            shifts,
            packing,
        })
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.packing.byte_order = order;
        self
    }

    pub fn with_nibble_order(mut self, order: NibbleOrder) -> Self {
        self.packing.nibble_order = order;
        self
    }

    /// Replace the generated name (e.g. for a byte-swapped variant).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel widths in `r, g, b, a` order.
    pub fn widths(&self) -> [u32; 4] {
        self.widths
    }

    pub fn encode_color(&self, color: Color) -> u32 {
        color
            .to_array()
            .iter()
            .zip(self.widths.iter().zip(self.shifts.iter()))
            .fold(0, |acc, (&c, (&w, &s))| acc | (bits::truncate(c, w) << s))
    }

    pub fn decode_color(&self, value: u32) -> Color {
        let mut out = [0u8, 0, 0, 255];
        for ch in 0..4 {
            let w = self.widths[ch];
            if w > 0 {
                let field = (value >> self.shifts[ch]) & ((1 << w) - 1);
                out[ch] = bits::expand(field, w);
            }
        }
        Color::from_array(out)
    }
}

impl PixelFormat for RgbaFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn channels(&self) -> ChannelLayout {
        match (self.widths[0] > 0 || self.widths[1] > 0 || self.widths[2] > 0, self.widths[3] > 0) {
            (true, true) => ChannelLayout::Rgba,
            (true, false) => ChannelLayout::Rgb,
            _ => ChannelLayout::Alpha,
        }
    }

    fn packing(&self) -> &Packing {
        &self.packing
    }

    fn encode_color(&self, color: Color) -> u32 {
        RgbaFormat::encode_color(self, color)
    }

    fn decode_color(&self, value: u32) -> Color {
        RgbaFormat::decode_color(self, value)
    }
}

/// A luminance/alpha pixel format.
///
/// Encoding stores the color's [`Color::luminance`]; decoding replicates
/// luminance into red, green and blue. A format without a luminance field
/// decodes to black with the stored alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaFormat {
    name: String,
    l_bits: u32,
    a_bits: u32,
    l_shift: u32,
    a_shift: u32,
    packing: Packing,
}

impl LaFormat {
    pub fn new(l: u32, a: u32, order: LaOrder) -> Result<Self, FormatError> {
        let (l_bits, a_bits) = (check_width(l)?, check_width(a)?);
        let packing = Packing::new(l_bits + a_bits)?;
        let (l_shift, a_shift) = match order {
            LaOrder::La => (a_bits, 0),
            LaOrder::Al => (0, l_bits),
        };
        let name = match (l_bits, a_bits, order) {
            (0, a, _) => format!("A{}", a),
            (l, 0, _) => format!("L{}", l),
            (l, a, LaOrder::La) => format!("LA{}{}", l, a),
            (l, a, LaOrder::Al) => format!("AL{}{}", a, l),
        };
        Ok(Self {
            name,
            l_bits,
            a_bits,
            l_shift,
            a_shift,
            packing,
        })
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.packing.byte_order = order;
        self
    }

    pub fn with_nibble_order(mut self, order: NibbleOrder) -> Self {
        self.packing.nibble_order = order;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encode_color(&self, color: Color) -> u32 {
        (bits::truncate(color.luminance(), self.l_bits) << self.l_shift)
            | (bits::truncate(color.a, self.a_bits) << self.a_shift)
    }

    pub fn decode_color(&self, value: u32) -> Color {
        let field = |shift: u32, w: u32| (value >> shift) & ((1u32 << w) - 1);
        let l = bits::expand(field(self.l_shift, self.l_bits), self.l_bits);
        let a = if self.a_bits > 0 {
            bits::expand(field(self.a_shift, self.a_bits), self.a_bits)
        } else {
            255
        };
        Color::new(l, l, l, a)
    }
}

impl PixelFormat for LaFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn channels(&self) -> ChannelLayout {
        match (self.l_bits > 0, self.a_bits > 0) {
            (true, true) => ChannelLayout::LuminanceAlpha,
            (true, false) => ChannelLayout::Luminance,
            _ => ChannelLayout::Alpha,
        }
    }

    fn packing(&self) -> &Packing {
        &self.packing
    }

    fn encode_color(&self, color: Color) -> u32 {
        LaFormat::encode_color(self, color)
    }

    fn decode_color(&self, value: u32) -> Color {
        LaFormat::decode_color(self, value)
    }
}
