pub mod config;

pub use config::{AppConfig, DitherConfig, QuantizeConfig, CONFIG_ENV};
