//! Dithering: choosing palette indices so that the indexed image keeps the
//! tone of the source.
//!
//! Two families are available:
//!
//! - **Ordered** ([`Ordered`]): a Bayer threshold matrix offsets each pixel
//!   before the nearest-color lookup. Rows are independent and run on the
//!   rayon pool.
//! - **Error diffusion** ([`ErrorDiffusion`]): each pixel's quantization
//!   error is spread to its unprocessed neighbours according to a
//!   [`Kernel`]. Rows run concurrently on the bounded-lag [`LineTask`]
//!   pipeline.
//!
//! All ditherers implement [`Dither`]; [`DitherAlgorithm`] selects one by
//! name.
//!
//! # Example
//!
//! ```
//! use texkit_codec::{Color, Dither, DitherAlgorithm, DitherOptions, Palette};
//!
//! let palette = Palette::new(vec![Color::BLACK, Color::WHITE]).unwrap();
//! let image = vec![Color::grey(128); 16];
//! let ditherer = DitherAlgorithm::FloydSteinberg
//!     .build(DitherOptions::new())
//!     .unwrap();
//! let indices = ditherer.dither(&image, 4, 4, &palette).unwrap();
//! assert_eq!(indices.len(), 16);
//! ```

mod diffusion;
pub mod kernel;
mod options;
mod ordered;
mod pipeline;

pub use diffusion::ErrorDiffusion;
pub use kernel::Kernel;
pub use options::DitherOptions;
pub use ordered::{bayer_matrix, BayerSize, Ordered};
pub use pipeline::{CancelToken, LineTask};

use crate::color::Color;
use crate::palette::Palette;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Dithering errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DitherError {
    #[error("threshold {threshold} must be smaller than the line length {len}")]
    ThresholdTooLarge { threshold: usize, len: usize },

    #[error("threshold {threshold} is below the kernel reach of {reach} pixels")]
    ThresholdBelowKernelReach { threshold: usize, reach: usize },

    #[error("expected {expected} pixels, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("cannot dither to an empty palette")]
    EmptyPalette,

    #[error("dithering was cancelled")]
    Cancelled,

    #[error("a dithering worker panicked")]
    WorkerPanicked,

    #[error("unknown dither algorithm '{0}'")]
    UnknownAlgorithm(String),
}

/// Maps an image to palette indices.
pub trait Dither: Send + Sync {
    /// Dither a row-major `width x height` image.
    ///
    /// Returns one index per pixel, each below `palette.len()`.
    fn dither(
        &self,
        image: &[Color],
        width: usize,
        height: usize,
        palette: &Palette,
    ) -> Result<Vec<u16>, DitherError>;
}

pub(crate) fn check_input(
    image: &[Color],
    width: usize,
    height: usize,
    palette: &Palette,
) -> Result<(), DitherError> {
    if image.len() != width * height {
        return Err(DitherError::SizeMismatch {
            expected: width * height,
            actual: image.len(),
        });
    }
    if palette.is_empty() && !image.is_empty() {
        return Err(DitherError::EmptyPalette);
    }
    Ok(())
}

/// Dither algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherAlgorithm {
    /// Plain nearest-color mapping.
    #[default]
    None,
    Bayer2,
    Bayer4,
    Bayer8,
    FloydSteinberg,
    Atkinson,
    JarvisJudiceNinke,
    Sierra,
    SierraTwoRow,
    SierraLite,
    Stucki,
    Burkes,
}

impl DitherAlgorithm {
    pub const ALL: [DitherAlgorithm; 12] = [
        DitherAlgorithm::None,
        DitherAlgorithm::Bayer2,
        DitherAlgorithm::Bayer4,
        DitherAlgorithm::Bayer8,
        DitherAlgorithm::FloydSteinberg,
        DitherAlgorithm::Atkinson,
        DitherAlgorithm::JarvisJudiceNinke,
        DitherAlgorithm::Sierra,
        DitherAlgorithm::SierraTwoRow,
        DitherAlgorithm::SierraLite,
        DitherAlgorithm::Stucki,
        DitherAlgorithm::Burkes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DitherAlgorithm::None => "none",
            DitherAlgorithm::Bayer2 => "bayer2",
            DitherAlgorithm::Bayer4 => "bayer4",
            DitherAlgorithm::Bayer8 => "bayer8",
            DitherAlgorithm::FloydSteinberg => "floyd-steinberg",
            DitherAlgorithm::Atkinson => "atkinson",
            DitherAlgorithm::JarvisJudiceNinke => "jarvis-judice-ninke",
            DitherAlgorithm::Sierra => "sierra",
            DitherAlgorithm::SierraTwoRow => "sierra-two-row",
            DitherAlgorithm::SierraLite => "sierra-lite",
            DitherAlgorithm::Stucki => "stucki",
            DitherAlgorithm::Burkes => "burkes",
        }
    }

    /// The diffusion kernel, for error diffusion algorithms.
    pub fn kernel(self) -> Option<Kernel> {
        match self {
            DitherAlgorithm::FloydSteinberg => Some(kernel::FLOYD_STEINBERG),
            DitherAlgorithm::Atkinson => Some(kernel::ATKINSON),
            DitherAlgorithm::JarvisJudiceNinke => Some(kernel::JARVIS_JUDICE_NINKE),
            DitherAlgorithm::Sierra => Some(kernel::SIERRA),
            DitherAlgorithm::SierraTwoRow => Some(kernel::SIERRA_TWO_ROW),
            DitherAlgorithm::SierraLite => Some(kernel::SIERRA_LITE),
            DitherAlgorithm::Stucki => Some(kernel::STUCKI),
            DitherAlgorithm::Burkes => Some(kernel::BURKES),
            _ => None,
        }
    }

    /// Instantiate the ditherer. `None` yields no ditherer: callers keep the
    /// quantizer's nearest-color indices.
    pub fn build(self, options: DitherOptions) -> Option<Box<dyn Dither>> {
        let bayer = |size| -> Box<dyn Dither> { Box::new(Ordered::new(size, options.clone())) };
        match self {
            DitherAlgorithm::None => None,
            DitherAlgorithm::Bayer2 => Some(bayer(BayerSize::Two)),
            DitherAlgorithm::Bayer4 => Some(bayer(BayerSize::Four)),
            DitherAlgorithm::Bayer8 => Some(bayer(BayerSize::Eight)),
            other => other
                .kernel()
                .map(|k| Box::new(ErrorDiffusion::new(k, options.clone())) as Box<dyn Dither>),
        }
    }
}

impl fmt::Display for DitherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DitherAlgorithm {
    type Err = DitherError;

    /// Parse a name as printed by [`DitherAlgorithm::name`], ignoring case,
    /// plus the short forms `fs`, `jjn` and `sierra2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace('_', "-");
        let alias = match lower.as_str() {
            "fs" | "floydsteinberg" => Some(DitherAlgorithm::FloydSteinberg),
            "jjn" => Some(DitherAlgorithm::JarvisJudiceNinke),
            "sierra2" => Some(DitherAlgorithm::SierraTwoRow),
            _ => None,
        };
        alias
            .or_else(|| Self::ALL.into_iter().find(|a| a.name() == lower))
            .ok_or_else(|| DitherError::UnknownAlgorithm(s.to_string()))
    }
}
