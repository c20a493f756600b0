//! Numeric keys of the built-in encodings.
//!
//! Color encodings use `0x00..0x40`, index encodings `0x40..`.

pub const RGBA8888: u32 = 0x00;
pub const BGRA8888: u32 = 0x01;
pub const RGB888: u32 = 0x02;
pub const RGB565: u32 = 0x03;
pub const RGBA5551: u32 = 0x04;
pub const RGBA4444: u32 = 0x05;
pub const ARGB4444: u32 = 0x06;
pub const LA88: u32 = 0x07;
pub const L8: u32 = 0x08;
pub const A8: u32 = 0x09;
pub const LA44: u32 = 0x0A;
pub const L4: u32 = 0x0B;
pub const A4: u32 = 0x0C;

pub const DXT1: u32 = 0x10;
pub const DXT3: u32 = 0x11;
pub const DXT5: u32 = 0x12;
pub const ATI1L: u32 = 0x13;
pub const ATI1A: u32 = 0x14;
pub const ATI2: u32 = 0x15;
pub const ETC1: u32 = 0x16;
pub const ETC1A4: u32 = 0x17;
pub const ETC1_LE: u32 = 0x18;
pub const ETC1A4_LE: u32 = 0x19;
pub const PVRTC4: u32 = 0x1A;
pub const ASTC4X4: u32 = 0x1B;

pub const I2: u32 = 0x40;
pub const I4: u32 = 0x41;
pub const I8: u32 = 0x42;
pub const AI44: u32 = 0x43;
pub const IA44: u32 = 0x44;
pub const AI53: u32 = 0x45;
pub const IA53: u32 = 0x46;
