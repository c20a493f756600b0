//! Texkit - texture format conversion
//!
//! Command line front end over `texkit-codec`.
//! This library exposes modules for integration testing.

pub mod error;
pub mod models;
pub mod services;
