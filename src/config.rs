//! Tool configuration module.
//!
//! Handles loading, validating, and merging the `imgtool.toml` file. Stock
//! defaults are the base layer; a user file, when present, overrides them
//! key by key.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [defaults]
//! format = "jpeg"           # Output format when a request names none
//! dpi = 72.0                # DPI when resize.dpi is absent
//!
//! [optimizer]
//! min_quality = 10          # Lowest quality the size search may try
//! max_quality = 100         # Highest quality the size search may try
//! max_iterations = 7        # Encode attempts per search
//! tolerance_kb = 2.0        # Stop once a trial is this close to the target
//!
//! [limits]
//! max_dimension = 8192      # Max output width or height, in pixels
//! max_pixels = 100000000    # Max output pixel count
//!
//! [encoding]
//! avif_speed = 6            # AVIF encoder speed (1 slow .. 10 fast)
//!
//! [storage]
//! uploads_dir = "uploads"   # Where fileIds are resolved
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [optimizer]
//! max_iterations = 9
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{OutputFormat, SearchConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "imgtool.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `imgtool.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Fallbacks for values a request leaves out.
    pub defaults: DefaultsConfig,
    /// Size-target search bounds.
    pub optimizer: OptimizerConfig,
    /// Output size guards.
    pub limits: LimitsConfig,
    /// Codec tuning.
    pub encoding: EncodingConfig,
    /// Where source images live.
    pub storage: StorageConfig,
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.format.parse::<OutputFormat>().is_err() {
            return Err(ConfigError::Validation(format!(
                "defaults.format must be one of jpeg, png, webp, avif (got {:?})",
                self.defaults.format
            )));
        }
        if self.defaults.dpi.is_nan() || self.defaults.dpi <= 0.0 {
            return Err(ConfigError::Validation(
                "defaults.dpi must be positive".into(),
            ));
        }
        let opt = &self.optimizer;
        if opt.min_quality == 0 || opt.max_quality > 100 {
            return Err(ConfigError::Validation(
                "optimizer qualities must be 1-100".into(),
            ));
        }
        if opt.min_quality > opt.max_quality {
            return Err(ConfigError::Validation(
                "optimizer.min_quality must not exceed optimizer.max_quality".into(),
            ));
        }
        if opt.max_iterations == 0 {
            return Err(ConfigError::Validation(
                "optimizer.max_iterations must be at least 1".into(),
            ));
        }
        if opt.tolerance_kb.is_nan() || opt.tolerance_kb < 0.0 {
            return Err(ConfigError::Validation(
                "optimizer.tolerance_kb must not be negative".into(),
            ));
        }
        if self.limits.max_dimension == 0 || self.limits.max_pixels == 0 {
            return Err(ConfigError::Validation(
                "limits values must be non-zero".into(),
            ));
        }
        if !(1..=10).contains(&self.encoding.avif_speed) {
            return Err(ConfigError::Validation(
                "encoding.avif_speed must be 1-10".into(),
            ));
        }
        if self.storage.uploads_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.uploads_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Fallbacks for values a request leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Output format name (`jpeg`, `png`, `webp`, `avif`; `jpg` and `webm` accepted).
    pub format: String,
    /// Dots per inch used to convert cm/in lengths.
    pub dpi: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            format: "jpeg".to_string(),
            dpi: crate::imaging::DEFAULT_DPI,
        }
    }
}

impl DefaultsConfig {
    /// The configured format, falling back to JPEG if it does not parse.
    ///
    /// Validated configs always parse.
    pub fn output_format(&self) -> OutputFormat {
        self.format.parse().unwrap_or_default()
    }
}

/// Size-target search bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    pub min_quality: u32,
    pub max_quality: u32,
    pub max_iterations: u32,
    pub tolerance_kb: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let search = SearchConfig::default();
        Self {
            min_quality: search.min_quality,
            max_quality: search.max_quality,
            max_iterations: search.max_iterations,
            tolerance_kb: search.tolerance_kb,
        }
    }
}

impl OptimizerConfig {
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            min_quality: self.min_quality,
            max_quality: self.max_quality,
            max_iterations: self.max_iterations,
            tolerance_kb: self.tolerance_kb,
        }
    }
}

/// Output size guards, checked before any resize runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Max output width or height, in pixels.
    pub max_dimension: u32,
    /// Max output pixel count (width × height).
    pub max_pixels: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_dimension: 8192,
            max_pixels: 100_000_000,
        }
    }
}

/// Codec tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// AVIF encoder speed, 1 (slowest, smallest) to 10 (fastest).
    pub avif_speed: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            avif_speed: crate::imaging::rust_backend::DEFAULT_AVIF_SPEED,
        }
    }
}

/// Where source images live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory `fileId`s are resolved against.
    pub uploads_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: "uploads".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// `ToolConfig::default()` as a TOML table; the layer `imgtool.toml` sits on.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ToolConfig::default()).expect("default config must serialize")
}

/// Lay `overlay` over `base`.
///
/// Sections merge key by key, so `[optimizer] max_quality = 90` leaves the
/// other optimizer keys at their defaults. Any non-table value in `overlay`
/// wins outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut table), toml::Value::Table(overrides)) => {
            for (key, value) in overrides {
                let merged = match table.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                table.insert(key, merged);
            }
            toml::Value::Table(table)
        }
        (_, scalar) => scalar,
    }
}

/// Read `imgtool.toml` (or whatever `--config` names) without interpreting it.
///
/// `Ok(None)` when there is no file at `path`; a file that is there but
/// unreadable or not TOML is an error.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Turn the merged table into a [`ToolConfig`] and run [`ToolConfig::validate`].
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ToolConfig, ConfigError> {
    let merged = match overlay {
        Some(overrides) => merge_toml(base, overrides),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Settings the CLI runs with: stock defaults overridden by the file at
/// `path`, if one exists.
pub fn load_config(path: &Path) -> Result<ToolConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `imgtool.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgtool Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Request fallbacks
# ---------------------------------------------------------------------------
[defaults]
# Output format when a request names none: jpeg, png, webp or avif.
# "jpg" and "webm" are accepted as aliases.
format = "jpeg"

# Dots per inch used to turn cm/in lengths into pixels when the
# request's resize block has no dpi of its own.
dpi = 72.0

# ---------------------------------------------------------------------------
# Size-target search
# ---------------------------------------------------------------------------
[optimizer]
# Quality range the binary search explores.
min_quality = 10
max_quality = 100

# Encode attempts per search. 7 covers the full 10-100 range.
max_iterations = 7

# The search stops as soon as a trial lands within this many KB of the target.
tolerance_kb = 2.0

# ---------------------------------------------------------------------------
# Output limits
# ---------------------------------------------------------------------------
[limits]
# Largest allowed output width or height, in pixels.
max_dimension = 8192

# Largest allowed output pixel count (width x height).
max_pixels = 100000000

# ---------------------------------------------------------------------------
# Codec tuning
# ---------------------------------------------------------------------------
[encoding]
# AVIF encoder speed, 1 (slowest, smallest files) to 10 (fastest).
avif_speed = 6

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory that request fileIds are resolved against.
uploads_dir = "uploads"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_stock_values() {
        let config = ToolConfig::default();
        assert_eq!(config.defaults.format, "jpeg");
        assert_eq!(config.defaults.dpi, 72.0);
        assert_eq!(config.optimizer.min_quality, 10);
        assert_eq!(config.optimizer.max_quality, 100);
        assert_eq!(config.optimizer.max_iterations, 7);
        assert_eq!(config.optimizer.tolerance_kb, 2.0);
        assert_eq!(config.limits.max_dimension, 8192);
        assert_eq!(config.limits.max_pixels, 100_000_000);
        assert_eq!(config.encoding.avif_speed, 6);
        assert_eq!(config.storage.uploads_dir, "uploads");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[optimizer]
max_iterations = 9
"#;
        let config: ToolConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.optimizer.max_iterations, 9);
        // Everything else keeps defaults
        assert_eq!(config.optimizer.min_quality, 10);
        assert_eq!(config.defaults.format, "jpeg");
    }

    #[test]
    fn default_format_accepts_aliases() {
        let mut defaults = DefaultsConfig::default();
        defaults.format = "webm".to_string();
        assert_eq!(defaults.output_format(), OutputFormat::WebP);
        defaults.format = "JPG".to_string();
        assert_eq!(defaults.output_format(), OutputFormat::Jpeg);
    }

    #[test]
    fn optimizer_config_maps_to_search_config() {
        let config = OptimizerConfig {
            min_quality: 20,
            max_quality: 90,
            max_iterations: 5,
            tolerance_kb: 1.0,
        };
        let search = config.search_config();
        assert_eq!(search.min_quality, 20);
        assert_eq!(search.max_quality, 90);
        assert_eq!(search.max_iterations, 5);
        assert_eq!(search.tolerance_kb, 1.0);
        assert_eq!(
            OptimizerConfig::default().search_config(),
            SearchConfig::default()
        );
    }

    // =========================================================================
    // load_config
    // =========================================================================

    #[test]
    fn load_config_missing_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[defaults]
format = "webp"

[storage]
uploads_dir = "/srv/uploads"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.defaults.output_format(), OutputFormat::WebP);
        assert_eq!(config.storage.uploads_dir, "/srv/uploads");
        assert_eq!(config.limits.max_dimension, 8192);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_directory_path_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
[defaults]
format = "bmp"
"#,
        )
        .unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_overrides_leaf_and_keeps_siblings() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str(
            r#"
[optimizer]
tolerance_kb = 0.5
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let optimizer = merged.get("optimizer").unwrap();
        assert_eq!(
            optimizer.get("tolerance_kb").unwrap().as_float(),
            Some(0.5)
        );
        assert_eq!(
            optimizer.get("max_iterations").unwrap().as_integer(),
            Some(7)
        );
        assert!(merged.get("limits").is_some());
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[optimizer]
max_iteration = 9
"#;
        let result: Result<ToolConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[limit]
max_dimension = 100
"#;
        let result: Result<ToolConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(ToolConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = ToolConfig::default();
        config.optimizer.min_quality = 0;
        assert!(config.validate().is_err());

        let mut config = ToolConfig::default();
        config.optimizer.max_quality = 101;
        assert!(config.validate().is_err());

        let mut config = ToolConfig::default();
        config.optimizer.min_quality = 60;
        config.optimizer.max_quality = 50;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_quality"));
    }

    #[test]
    fn validate_zero_iterations() {
        let mut config = ToolConfig::default();
        config.optimizer.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_dpi_must_be_positive() {
        let mut config = ToolConfig::default();
        config.defaults.dpi = 0.0;
        assert!(config.validate().is_err());
        config.defaults.dpi = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_limits_and_speed() {
        let mut config = ToolConfig::default();
        config.limits.max_pixels = 0;
        assert!(config.validate().is_err());

        let mut config = ToolConfig::default();
        config.encoding.avif_speed = 11;
        assert!(config.validate().is_err());
        config.encoding.avif_speed = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_empty_uploads_dir() {
        let mut config = ToolConfig::default();
        config.storage.uploads_dir = "  ".to_string();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // resolve_config / stock_config_toml
    // =========================================================================

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let overlay: toml::Value = toml::from_str(
            r#"
[encoding]
avif_speed = 0
"#,
        )
        .unwrap();
        let result = resolve_config(stock_defaults_value(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: ToolConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[defaults]",
            "[optimizer]",
            "[limits]",
            "[encoding]",
            "[storage]",
        ] {
            assert!(content.contains(section), "{section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        for key in ["defaults", "optimizer", "limits", "encoding", "storage"] {
            assert!(val.get(key).is_some(), "{key}");
        }
    }
}
