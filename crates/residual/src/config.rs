//! `residual.toml` configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "residual.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub diagnostics: DiagnosticsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Fail the run on warnings as well as errors
    pub deny_warnings: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print the global and declarative binding tables
    pub show_bindings: bool,
    /// Print the properties left implicit as host defaults
    pub show_ignored: bool,
}

impl Config {
    /// Load `path`, or `residual.toml` from the working directory if it
    /// exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::parse(
            r#"
[diagnostics]
deny_warnings = true

[output]
show_ignored = true
"#,
        )
        .unwrap();
        assert!(config.diagnostics.deny_warnings);
        assert!(config.output.show_ignored);
        assert!(!config.output.show_bindings);
    }

    #[test]
    fn test_unknown_value_type_is_rejected() {
        assert!(Config::parse("[output]\nshow_bindings = \"yes\"").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("does/not/exist/residual.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
