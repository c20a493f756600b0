//! Lookup of encodings by numeric key or name.
//!
//! The registry keeps color encodings (bit-depth and block formats) and
//! index encodings in separate tables. Asking one table for a key that only
//! the other knows fails with [`RegistryError::WrongKind`], so callers can
//! tell that a quantization pass is needed (or must be skipped) instead of
//! just getting "not found".
//!
//! The registry is immutable once built and can be shared across threads.
//!
//! # Example
//!
//! ```
//! use texkit_codec::registry::{keys, EncodingRegistry};
//!
//! let registry = EncodingRegistry::builtin();
//! let dxt1 = registry.color(keys::DXT1).unwrap();
//! assert_eq!(dxt1.name(), "DXT1");
//! assert_eq!(dxt1.data_len(6, 6), 32);
//! assert!(registry.resolve_color("rgb565").is_ok());
//! assert!(registry.color(keys::I4).is_err());
//! ```

pub mod keys;

use crate::block::{
    Astc4x4, Ati1, Ati1Channel, Ati2, Ati2Channels, BlockEncoding, Dxt1, Dxt3, Dxt5, Etc1, Etc1A4,
    Pvrtc4,
};
use crate::format::{
    ByteOrder, ChannelLayout, ColorEncoding, ComponentOrder, FormatError, LaFormat, LaOrder,
    LinearEncoding, RgbaFormat,
};
use crate::index::{IndexEncoding, IndexFormat, IndexOrder};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Which table a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Color,
    Indexed,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Color => f.write_str("color"),
            FormatKind::Indexed => f.write_str("indexed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unsupported {kind} format '{key}'")]
    UnsupportedFormat { key: String, kind: FormatKind },

    #[error("format '{key}' is {actual}, expected {expected}")]
    WrongKind {
        key: String,
        expected: FormatKind,
        actual: FormatKind,
    },

    #[error("key {0:#04x} registered twice")]
    DuplicateKey(u32),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// A registered color encoding.
pub struct EncodingDefinition {
    key: u32,
    encoding: Box<dyn ColorEncoding>,
}

impl EncodingDefinition {
    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn name(&self) -> &str {
        self.encoding.name()
    }

    pub fn encoding(&self) -> &dyn ColorEncoding {
        self.encoding.as_ref()
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.encoding.bits_per_pixel()
    }

    pub fn channels(&self) -> ChannelLayout {
        self.encoding.channels()
    }

    pub fn data_len(&self, width: usize, height: usize) -> usize {
        self.encoding.data_len(width, height)
    }

    pub fn kind(&self) -> FormatKind {
        FormatKind::Color
    }
}

impl fmt::Debug for EncodingDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingDefinition")
            .field("key", &self.key)
            .field("name", &self.name())
            .finish()
    }
}

/// A registered index encoding.
pub struct IndexDefinition {
    key: u32,
    encoding: Box<dyn IndexEncoding>,
}

impl IndexDefinition {
    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn name(&self) -> &str {
        self.encoding.name()
    }

    pub fn encoding(&self) -> &dyn IndexEncoding {
        self.encoding.as_ref()
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.encoding.bits_per_pixel()
    }

    /// Largest palette the format can address.
    pub fn max_colors(&self) -> usize {
        1 << self.encoding.index_bits()
    }

    pub fn data_len(&self, width: usize, height: usize) -> usize {
        self.encoding.data_len(width, height)
    }

    pub fn kind(&self) -> FormatKind {
        FormatKind::Indexed
    }
}

impl fmt::Debug for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("key", &self.key)
            .field("name", &self.name())
            .finish()
    }
}

/// Parse `0x1A`, `26` or return `None` for anything else.
fn parse_key(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Immutable table of encodings.
#[derive(Debug, Default)]
pub struct EncodingRegistry {
    colors: BTreeMap<u32, EncodingDefinition>,
    indices: BTreeMap<u32, IndexDefinition>,
}

impl EncodingRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Every encoding this crate implements, under the keys in [`keys`].
    pub fn builtin() -> Self {
        match builtin_builder().and_then(RegistryBuilder::build) {
            Ok(registry) => registry,
            // Built-in formats are fixed; a failure here is a bug in the table.
            Err(e) => unreachable!("invalid built-in registry: {e}"),
        }
    }

    fn not_found(&self, key: u32, expected: FormatKind) -> RegistryError {
        let actual = match expected {
            FormatKind::Color if self.indices.contains_key(&key) => Some(FormatKind::Indexed),
            FormatKind::Indexed if self.colors.contains_key(&key) => Some(FormatKind::Color),
            _ => None,
        };
        let key = format!("{key:#04x}");
        match actual {
            Some(actual) => RegistryError::WrongKind {
                key,
                expected,
                actual,
            },
            None => RegistryError::UnsupportedFormat {
                key,
                kind: expected,
            },
        }
    }

    pub fn color(&self, key: u32) -> Result<&EncodingDefinition, RegistryError> {
        self.colors
            .get(&key)
            .ok_or_else(|| self.not_found(key, FormatKind::Color))
    }

    pub fn index(&self, key: u32) -> Result<&IndexDefinition, RegistryError> {
        self.indices
            .get(&key)
            .ok_or_else(|| self.not_found(key, FormatKind::Indexed))
    }

    /// Case-insensitive lookup by name.
    pub fn color_by_name(&self, name: &str) -> Result<&EncodingDefinition, RegistryError> {
        if let Some(def) = self.colors.values().find(|d| d.name().eq_ignore_ascii_case(name)) {
            return Ok(def);
        }
        match self.indices.values().find(|d| d.name().eq_ignore_ascii_case(name)) {
            Some(_) => Err(RegistryError::WrongKind {
                key: name.to_string(),
                expected: FormatKind::Color,
                actual: FormatKind::Indexed,
            }),
            None => Err(RegistryError::UnsupportedFormat {
                key: name.to_string(),
                kind: FormatKind::Color,
            }),
        }
    }

    pub fn index_by_name(&self, name: &str) -> Result<&IndexDefinition, RegistryError> {
        if let Some(def) = self.indices.values().find(|d| d.name().eq_ignore_ascii_case(name)) {
            return Ok(def);
        }
        match self.colors.values().find(|d| d.name().eq_ignore_ascii_case(name)) {
            Some(_) => Err(RegistryError::WrongKind {
                key: name.to_string(),
                expected: FormatKind::Indexed,
                actual: FormatKind::Color,
            }),
            None => Err(RegistryError::UnsupportedFormat {
                key: name.to_string(),
                kind: FormatKind::Indexed,
            }),
        }
    }

    /// Look up a color encoding by hex key, decimal key or name.
    pub fn resolve_color(&self, query: &str) -> Result<&EncodingDefinition, RegistryError> {
        match parse_key(query) {
            Some(key) => self.color(key),
            None => self.color_by_name(query.trim()),
        }
    }

    /// Look up an index encoding by hex key, decimal key or name.
    pub fn resolve_index(&self, query: &str) -> Result<&IndexDefinition, RegistryError> {
        match parse_key(query) {
            Some(key) => self.index(key),
            None => self.index_by_name(query.trim()),
        }
    }

    /// Which table, if any, holds `key`.
    pub fn kind(&self, key: u32) -> Option<FormatKind> {
        if self.colors.contains_key(&key) {
            Some(FormatKind::Color)
        } else if self.indices.contains_key(&key) {
            Some(FormatKind::Indexed)
        } else {
            None
        }
    }

    /// Color encodings in key order.
    pub fn colors(&self) -> impl Iterator<Item = &EncodingDefinition> {
        self.colors.values()
    }

    /// Index encodings in key order.
    pub fn indices(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.indices.values()
    }
}

/// Collects encodings and checks keys for uniqueness on [`build`](Self::build).
#[derive(Default)]
pub struct RegistryBuilder {
    colors: Vec<(u32, Box<dyn ColorEncoding>)>,
    indices: Vec<(u32, Box<dyn IndexEncoding>)>,
}

impl RegistryBuilder {
    pub fn color(mut self, key: u32, encoding: impl ColorEncoding + 'static) -> Self {
        self.colors.push((key, Box::new(encoding)));
        self
    }

    pub fn index(mut self, key: u32, encoding: impl IndexEncoding + 'static) -> Self {
        self.indices.push((key, Box::new(encoding)));
        self
    }

    /// Fails on a key used twice, within or across the two tables.
    pub fn build(self) -> Result<EncodingRegistry, RegistryError> {
        let mut registry = EncodingRegistry::default();
        for (key, encoding) in self.colors {
            if registry.colors.contains_key(&key) {
                return Err(RegistryError::DuplicateKey(key));
            }
            registry
                .colors
                .insert(key, EncodingDefinition { key, encoding });
        }
        for (key, encoding) in self.indices {
            if registry.colors.contains_key(&key) || registry.indices.contains_key(&key) {
                return Err(RegistryError::DuplicateKey(key));
            }
            registry
                .indices
                .insert(key, IndexDefinition { key, encoding });
        }
        Ok(registry)
    }
}

fn rgba(
    r: u32,
    g: u32,
    b: u32,
    a: u32,
    order: ComponentOrder,
    byte_order: ByteOrder,
) -> Result<LinearEncoding<RgbaFormat>, FormatError> {
    Ok(LinearEncoding::new(
        RgbaFormat::new(r, g, b, a, order)?.with_byte_order(byte_order),
    ))
}

fn la(l: u32, a: u32) -> Result<LinearEncoding<LaFormat>, FormatError> {
    Ok(LinearEncoding::new(
        LaFormat::new(l, a, LaOrder::La)?.with_byte_order(ByteOrder::Big),
    ))
}

fn indexed(index_bits: u32, alpha_bits: u32, order: IndexOrder) -> Result<IndexFormat, FormatError> {
    IndexFormat::new(index_bits, alpha_bits, order)
}

/// 8-bit-per-channel formats list their channels in memory order (big
/// endian); 16-bit formats are little-endian words.
fn builtin_builder() -> Result<RegistryBuilder, RegistryError> {
    use ByteOrder::{Big, Little};
    use ComponentOrder::{Argb, Bgra, Rgba};

    Ok(EncodingRegistry::builder()
        .color(keys::RGBA8888, rgba(8, 8, 8, 8, Rgba, Big)?)
        .color(keys::BGRA8888, rgba(8, 8, 8, 8, Bgra, Big)?)
        .color(keys::RGB888, rgba(8, 8, 8, 0, Rgba, Big)?)
        .color(keys::RGB565, rgba(5, 6, 5, 0, Rgba, Little)?)
        .color(keys::RGBA5551, rgba(5, 5, 5, 1, Rgba, Little)?)
        .color(keys::RGBA4444, rgba(4, 4, 4, 4, Rgba, Little)?)
        .color(keys::ARGB4444, rgba(4, 4, 4, 4, Argb, Little)?)
        .color(keys::LA88, la(8, 8)?)
        .color(keys::L8, la(8, 0)?)
        .color(keys::A8, la(0, 8)?)
        .color(keys::LA44, la(4, 4)?)
        .color(keys::L4, la(4, 0)?)
        .color(keys::A4, la(0, 4)?)
        .color(keys::DXT1, BlockEncoding::new(Dxt1))
        .color(keys::DXT3, BlockEncoding::new(Dxt3))
        .color(keys::DXT5, BlockEncoding::new(Dxt5))
        .color(keys::ATI1L, BlockEncoding::new(Ati1::new(Ati1Channel::Luminance)))
        .color(keys::ATI1A, BlockEncoding::new(Ati1::new(Ati1Channel::Alpha)))
        .color(keys::ATI2, BlockEncoding::new(Ati2::new(Ati2Channels::RedGreen)))
        .color(keys::ETC1, BlockEncoding::new(Etc1::new(Big)))
        .color(keys::ETC1A4, BlockEncoding::new(Etc1A4::new(Big)))
        .color(keys::ETC1_LE, BlockEncoding::new(Etc1::new(Little)))
        .color(keys::ETC1A4_LE, BlockEncoding::new(Etc1A4::new(Little)))
        .color(keys::PVRTC4, Pvrtc4)
        .color(keys::ASTC4X4, BlockEncoding::new(Astc4x4))
        .index(keys::I2, indexed(2, 0, IndexOrder::AlphaHigh)?)
        .index(keys::I4, indexed(4, 0, IndexOrder::AlphaHigh)?)
        .index(keys::I8, indexed(8, 0, IndexOrder::AlphaHigh)?)
        .index(keys::AI44, indexed(4, 4, IndexOrder::AlphaHigh)?)
        .index(keys::IA44, indexed(4, 4, IndexOrder::IndexHigh)?)
        .index(keys::AI53, indexed(3, 5, IndexOrder::AlphaHigh)?)
        .index(keys::IA53, indexed(5, 3, IndexOrder::IndexHigh)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::format::ImageLayout;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_names_and_bpp() {
        let r = EncodingRegistry::builtin();
        let expect = [
            (keys::RGBA8888, "RGBA8888", 32),
            (keys::RGB565, "RGB565", 16),
            (keys::L4, "L4", 4),
            (keys::DXT1, "DXT1", 4),
            (keys::DXT5, "DXT5", 8),
            (keys::ETC1A4_LE, "ETC1A4LE", 8),
            (keys::PVRTC4, "PVRTC4", 4),
            (keys::ASTC4X4, "ASTC4x4", 8),
        ];
        for (key, name, bpp) in expect {
            let def = r.color(key).unwrap();
            assert_eq!(def.name(), name);
            assert_eq!(def.bits_per_pixel(), bpp, "{name}");
        }
        assert_eq!(r.index(keys::AI53).unwrap().name(), "AI53");
        assert_eq!(r.index(keys::IA53).unwrap().max_colors(), 32);
    }

    #[test]
    fn test_names_unique() {
        let r = EncodingRegistry::builtin();
        let mut names: Vec<_> = r
            .colors()
            .map(|d| d.name().to_ascii_lowercase())
            .chain(r.indices().map(|d| d.name().to_ascii_lowercase()))
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_unsupported_and_wrong_kind() {
        let r = EncodingRegistry::builtin();
        assert_eq!(
            r.color(0x3F).unwrap_err(),
            RegistryError::UnsupportedFormat {
                key: "0x3f".into(),
                kind: FormatKind::Color
            }
        );
        assert_eq!(
            r.index(keys::DXT1).unwrap_err(),
            RegistryError::WrongKind {
                key: "0x10".into(),
                expected: FormatKind::Indexed,
                actual: FormatKind::Color
            }
        );
        assert!(matches!(
            r.color_by_name("i8"),
            Err(RegistryError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_resolve() {
        let r = EncodingRegistry::builtin();
        assert_eq!(r.resolve_color("0x12").unwrap().name(), "DXT5");
        assert_eq!(r.resolve_color("18").unwrap().name(), "DXT5");
        assert_eq!(r.resolve_color("etc1").unwrap().key(), keys::ETC1);
        assert_eq!(r.resolve_index("ia44").unwrap().key(), keys::IA44);
        assert!(r.resolve_color("nope").is_err());
    }

    #[test]
    fn test_duplicate_key() {
        let built = EncodingRegistry::builder()
            .color(1, BlockEncoding::new(Dxt1))
            .index(1, IndexFormat::new(4, 0, IndexOrder::AlphaHigh).unwrap())
            .build();
        assert_eq!(built.unwrap_err(), RegistryError::DuplicateKey(1));
    }

    #[test]
    fn test_byte_layouts() {
        let r = EncodingRegistry::builtin();
        let c = [Color::new(1, 2, 3, 4)];
        let layout = ImageLayout::new(1, 1);
        let bytes = |key| r.color(key).unwrap().encoding().encode(&c, layout).unwrap();
        assert_eq!(bytes(keys::RGBA8888), vec![1, 2, 3, 4]);
        assert_eq!(bytes(keys::BGRA8888), vec![3, 2, 1, 4]);
        assert_eq!(bytes(keys::RGB888), vec![1, 2, 3]);
        let white = [Color::WHITE];
        let rgb565 = r.color(keys::RGB565).unwrap().encoding();
        assert_eq!(rgb565.encode(&white, layout).unwrap(), vec![0xFF, 0xFF]);
    }
}
