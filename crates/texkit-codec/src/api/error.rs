//! Unified error type for the public API.

use crate::dither::DitherError;
use crate::format::{CodecError, FormatError};
use crate::palette::PaletteError;
use crate::quantize::QuantizeError;
use crate::registry::RegistryError;
use crate::swizzle::SwizzleError;
use thiserror::Error;

/// Any error the crate can raise, for `?` propagation in application code.
///
/// # Example
///
/// ```
/// use texkit_codec::{Error, ImageLayout, Transcoder};
/// use texkit_codec::registry::keys;
///
/// fn encode_dxt1(pixels: &[texkit_codec::Color]) -> Result<Vec<u8>, Error> {
///     Transcoder::new().encode(keys::DXT1, pixels, ImageLayout::new(4, 4))
/// }
///
/// assert!(encode_dxt1(&[texkit_codec::Color::BLACK; 16]).is_ok());
/// assert!(encode_dxt1(&[]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Swizzle(#[from] SwizzleError),

    #[error(transparent)]
    Quantize(#[from] QuantizeError),

    #[error(transparent)]
    Dither(#[from] DitherError),

    #[error(transparent)]
    Palette(#[from] PaletteError),

    #[error("{format} cannot store a palette (needs one pixel per unit)")]
    UnsupportedPaletteFormat { format: String },
}
