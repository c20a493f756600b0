use serde::Deserialize;
use std::path::{Path, PathBuf};
use texkit_codec::{DitherAlgorithm, DitherError, DitherOptions, QuantizeOptions};

/// Environment variable naming the config file when `--config` is absent
pub const CONFIG_ENV: &str = "TEXKIT_CONFIG";

/// Application configuration loaded from texkit.yaml
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Palette generation settings
    #[serde(default)]
    pub quantize: QuantizeConfig,

    /// Dithering settings
    #[serde(default)]
    pub dither: DitherConfig,

    /// Worker threads for error diffusion (0 = one per CPU)
    #[serde(default)]
    pub threads: usize,
}

/// Quantizer settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QuantizeConfig {
    /// Palette size budget
    #[serde(default = "default_colors")]
    pub colors: usize,

    /// Histogram precision per color channel
    #[serde(default = "default_rgb_bits")]
    pub rgb_bits: u32,

    /// Histogram precision for alpha
    #[serde(default = "default_alpha_bits")]
    pub alpha_bits: u32,
}

fn default_colors() -> usize {
    256
}

fn default_rgb_bits() -> u32 {
    5
}

fn default_alpha_bits() -> u32 {
    3
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            rgb_bits: default_rgb_bits(),
            alpha_bits: default_alpha_bits(),
        }
    }
}

/// Dither settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DitherConfig {
    /// Algorithm name, e.g. "none", "bayer4" or "floyd-steinberg"
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Pipeline lag in pixels (defaults to the kernel reach)
    #[serde(default)]
    pub threshold: Option<usize>,

    /// Ordered dither offset range
    #[serde(default = "default_spread")]
    pub spread: i32,
}

fn default_algorithm() -> String {
    "none".to_string()
}

fn default_spread() -> i32 {
    32
}

impl Default for DitherConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            threshold: None,
            spread: default_spread(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Resolve the config path from the CLI flag or `TEXKIT_CONFIG`
    pub fn resolve_path(cli_path: Option<&Path>) -> Option<PathBuf> {
        cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    /// Load configuration from a file, falling back to defaults on any error
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_yaml_str(&content) {
                Ok(config) => {
                    tracing::debug!(
                        path = %path.display(),
                        colors = config.quantize.colors,
                        dither = %config.dither.algorithm,
                        "Loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    tracing::warn!(%e, path = %path.display(), "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(%e, path = %path.display(), "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    pub fn quantize_options(&self) -> QuantizeOptions {
        QuantizeOptions::new(self.quantize.colors)
            .rgb_bits(self.quantize.rgb_bits)
            .alpha_bits(self.quantize.alpha_bits)
    }

    pub fn dither_algorithm(&self) -> Result<DitherAlgorithm, DitherError> {
        self.dither.algorithm.parse()
    }

    pub fn dither_options(&self) -> DitherOptions {
        let options = DitherOptions::new()
            .threads(self.threads)
            .spread(self.dither.spread);
        match self.dither.threshold {
            Some(threshold) => options.threshold(threshold),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.quantize.colors, 256);
        assert_eq!(config.quantize.rgb_bits, 5);
        assert_eq!(config.quantize.alpha_bits, 3);
        assert_eq!(config.dither.algorithm, "none");
        assert_eq!(config.dither.threshold, None);
        assert_eq!(config.dither.spread, 32);
        assert_eq!(config.threads, 0);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = AppConfig::from_yaml_str(
            "quantize:\n  colors: 16\ndither:\n  algorithm: atkinson\nthreads: 4\n",
        )
        .unwrap();

        assert_eq!(config.quantize.colors, 16);
        assert_eq!(config.quantize.rgb_bits, 5);
        assert_eq!(config.dither.algorithm, "atkinson");
        assert_eq!(config.dither.spread, 32);
        assert_eq!(config.threads, 4);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(AppConfig::from_yaml_str("").unwrap(), AppConfig::default());
        assert_eq!(AppConfig::from_yaml_str("  \n").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(AppConfig::from_yaml_str("quantize:\n  colours: 16\n").is_err());
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(dir.path().join("missing.yaml").as_path()));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_malformed_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "quantize: [not, a, map]").unwrap();
        let config = AppConfig::load(Some(file.path()));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dither:\n  algorithm: bayer8\n  spread: 48").unwrap();
        let config = AppConfig::load(Some(file.path()));
        assert_eq!(config.dither.algorithm, "bayer8");
        assert_eq!(config.dither.spread, 48);
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(AppConfig::load(None), AppConfig::default());
    }

    #[test]
    fn test_cli_path_wins_over_env() {
        let path = Path::new("/tmp/explicit.yaml");
        assert_eq!(
            AppConfig::resolve_path(Some(path)),
            Some(PathBuf::from("/tmp/explicit.yaml"))
        );
    }

    #[test]
    fn test_codec_options() {
        let mut config = AppConfig::default();
        config.quantize.colors = 64;
        config.dither.algorithm = "FS".to_string();
        config.dither.threshold = Some(5);
        config.threads = 3;

        assert_eq!(config.quantize_options().colors, 64);
        assert_eq!(config.dither_algorithm(), Ok(DitherAlgorithm::FloydSteinberg));
        let options = config.dither_options();
        assert_eq!(options.threads, 3);
        assert_eq!(options.threshold, Some(5));
    }

    #[test]
    fn test_unknown_algorithm() {
        let mut config = AppConfig::default();
        config.dither.algorithm = "blue-noise".to_string();
        assert_eq!(
            config.dither_algorithm(),
            Err(DitherError::UnknownAlgorithm("blue-noise".to_string()))
        );
    }
}
