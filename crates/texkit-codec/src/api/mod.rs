//! High-level API: the [`Transcoder`] facade and the unified [`Error`] type.

mod error;
mod transcoder;

pub use error::Error;
pub use transcoder::{IndexedImage, IndexedTexture, Transcoder};
