#![allow(clippy::needless_range_loop, clippy::manual_range_contains)]

//! texkit-codec: texture pixel encodings, block compression, palette
//! quantization and dithering.
//!
//! The crate converts between in-memory RGBA images and the packed byte
//! layouts used by GPU and console texture formats:
//!
//! - **Bit-depth formats** ([`RgbaFormat`], [`LaFormat`]): RGB565,
//!   RGBA4444, LA88 and friends, with configurable channel and byte order.
//! - **Block formats** ([`block`]): DXT1/3/5, ATI1/2, ETC1, PVRTC 4bpp and
//!   a subset of ASTC 4x4.
//! - **Index formats** ([`IndexFormat`]): 2, 4 and 8 bit palette indices,
//!   optionally with per-pixel alpha.
//! - **Swizzling** ([`Swizzle`]): tiled, Morton and Morton-in-tile storage.
//!
//! Reducing an image to a palette uses Wu's quantizer ([`WuQuantizer`]),
//! optionally followed by ordered or error-diffusion dithering
//! ([`DitherAlgorithm`]). Error diffusion runs rows concurrently on a
//! bounded-lag pipeline and produces the same indices as a sequential pass.
//!
//! # Quick Start
//!
//! The [`Transcoder`] builder is the primary entry point:
//!
//! ```
//! use texkit_codec::{Color, DitherAlgorithm, ImageLayout, Transcoder};
//! use texkit_codec::registry::keys;
//!
//! let width = 8;
//! let height = 8;
//! let pixels: Vec<Color> = (0..width * height)
//!     .map(|i| Color::grey((i * 4) as u8))
//!     .collect();
//! let layout = ImageLayout::new(width, height);
//!
//! let transcoder = Transcoder::new().dither(DitherAlgorithm::FloydSteinberg);
//!
//! // Block compression
//! let dxt1 = transcoder.encode(keys::DXT1, &pixels, layout).unwrap();
//! assert_eq!(dxt1.len(), 32);
//! let decoded = transcoder.decode_all(keys::DXT1, &dxt1, layout).unwrap();
//! assert_eq!(decoded.len(), pixels.len());
//!
//! // Palette texture: 4-bit indices plus an RGB565 palette
//! let texture = transcoder
//!     .encode_indexed(keys::I4, keys::RGB565, &pixels, layout)
//!     .unwrap();
//! assert!(texture.palette_len <= 16);
//! assert_eq!(texture.data.len(), 32);
//! ```
//!
//! # Lower-level use
//!
//! Every encoding is also usable directly through [`ColorEncoding`] or
//! [`IndexEncoding`], and the quantizer and ditherers through
//! [`WuQuantizer`] and [`Dither`]:
//!
//! ```
//! use texkit_codec::{Color, Dither, DitherAlgorithm, DitherOptions, QuantizeOptions, WuQuantizer};
//!
//! let pixels = vec![Color::rgb(10, 200, 30); 16];
//! let result = WuQuantizer::new(QuantizeOptions::new(8)).quantize(&pixels).unwrap();
//! let ditherer = DitherAlgorithm::Bayer4.build(DitherOptions::new()).unwrap();
//! let indices = ditherer.dither(&pixels, 4, 4, &result.palette).unwrap();
//! assert_eq!(indices, vec![0; 16]);
//! ```
//!
//! # Concurrency
//!
//! Block codecs, the color counter and ordered dithering use the rayon
//! global pool. Error diffusion spawns its own scoped workers, sized by
//! [`DitherOptions::threads`]. Every type here is `Send + Sync`; the
//! registry and the transcoder can be shared between threads.

pub mod api;
pub mod block;
pub mod color;
pub mod dither;
pub mod format;
pub mod index;
pub mod palette;
pub mod quantize;
pub mod registry;
pub mod swizzle;


pub use api::{Error, IndexedImage, IndexedTexture, Transcoder};
pub use block::{BlockCodec, BlockEncoding};
pub use color::Color;
pub use dither::{CancelToken, Dither, DitherAlgorithm, DitherError, DitherOptions};
pub use format::{
    ByteOrder, ChannelLayout, CodecError, ColorEncoding, ColorStream, ComponentOrder, FormatError,
    ImageLayout, LaFormat, LaOrder, LinearEncoding, RgbaFormat,
};
pub use index::{IndexEncoding, IndexFormat, IndexOrder};
pub use palette::{Palette, PaletteError};
pub use quantize::{QuantizeError, QuantizeOptions, QuantizeResult, WuQuantizer};
pub use registry::{EncodingRegistry, FormatKind, RegistryError};
pub use swizzle::{Swizzle, SwizzleError};
