pub mod image_io;
pub mod transcode_service;

pub use image_io::{read_png, write_png, RgbaImage};
pub use transcode_service::{parse_swizzle, FormatInfo, TranscodeService};
