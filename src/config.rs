use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the scorpion library and binary.
///
/// Controls decoder limits, where cleaned copies go, and how tag values
/// are shown.
///
/// # Loading
///
/// ```rust,no_run
/// use scorpion::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("scorpion.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.output.dry_run = true;
/// config.decode.max_ifd_depth = 2;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Limits applied while decoding untrusted files.
    pub decode: DecodeOptions,
    /// Redaction output behavior.
    pub output: OutputConfig,
    /// Presentation of decoded tags.
    pub display: DisplayConfig,
}

/// Limits passed explicitly through every decoder.
///
/// This is the whole per-decode context besides the buffer itself; decoders
/// keep no state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Maximum nesting of EXIF sub-IFDs (IFD0 is depth 0).
    pub max_ifd_depth: usize,
    /// Upper bound on the inflated size of one zlib stream.
    pub max_inflate_bytes: usize,
}

/// Controls where and whether cleaned copies are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, compute the cleaned bytes but do not write them.
    pub dry_run: bool,
    /// If `false`, refuse to replace an existing cleaned copy.
    pub overwrite: bool,
}

/// Presentation settings used by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Longer values are cut and suffixed with `...`.
    pub max_value_len: usize,
    /// Print an OpenStreetMap link next to decoded GPS coordinates.
    pub show_map_link: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_ifd_depth: 4,
            max_inflate_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            overwrite: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_value_len: 60,
            show_map_link: true,
        }
    }
}

impl Config {
    /// Resolve the config file path: `scorpion.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("scorpion.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
