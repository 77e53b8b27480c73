//! Cadence configuration file handling
//!
//! The CLI reads an optional `cadence.toml` with two tables:
//! - `[scheduler]` - background worker settings
//! - `[interpolation]` - defaults for `cadence chase`

use anyhow::{Context, Result};
use cadence_animation::{InterpolationOptions, SchedulerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

/// Contents of `cadence.toml`
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CadenceConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub interpolation: InterpolationOptions,
}

impl CadenceConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `cadence.toml` in the
    /// current directory is used if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file {} does not exist", path.display());
                }
                Self::load_from_file(path)
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_animation::OverrunPolicy;
    use std::time::Duration;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = CadenceConfig::from_toml("").unwrap();
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert_eq!(config.interpolation, InterpolationOptions::default());
    }

    #[test]
    fn test_partial_tables() {
        let config = CadenceConfig::from_toml(
            r#"
            [scheduler]
            overrun = "catch-up"

            [interpolation]
            ratio = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.overrun, OverrunPolicy::CatchUp);
        assert_eq!(config.scheduler.thread_name, "cadence-scheduler");
        assert_eq!(config.interpolation.ratio, 0.5);
        assert_eq!(config.interpolation.period, Duration::from_millis(1));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(CadenceConfig::from_toml("[scheduler\n").is_err());
        assert!(CadenceConfig::from_toml("[scheduler]\noverrun = \"sometimes\"").is_err());
    }

    #[test]
    fn test_missing_explicit_path() {
        let path = std::env::temp_dir().join("cadence-missing-config.toml");
        let _ = fs::remove_file(&path);
        let err = CadenceConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("cadence-config-{}.toml", std::process::id()));
        fs::write(&path, "[scheduler]\nthread_name = \"frames\"\nmax_park_ms = 5\n").unwrap();

        let config = CadenceConfig::load(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.scheduler.thread_name, "frames");
        assert_eq!(config.scheduler.max_park_ms, 5);
    }

    #[test]
    fn test_to_toml_reloads() {
        let mut config = CadenceConfig::default();
        config.interpolation.ratio = 0.25;
        let text = config.to_toml().unwrap();
        let reloaded = CadenceConfig::from_toml(&text).unwrap();
        assert_eq!(reloaded.interpolation.ratio, 0.25);
    }
}
