//! Options file support
//!
//! Printer style and filter setup can be kept in a TOML file next to the
//! templates (`asttpl.toml` by convention) instead of being set up in code.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::printer::PrinterConfig;
use crate::template::FilterRegistry;
use crate::CompileConfig;

/// Errors that can occur when loading or parsing options
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse options TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Settings loaded from an options file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub printer: PrinterConfig,
    pub filters: FilterOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterOptions {
    /// Register the built-in filter library
    pub builtin: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self { builtin: true }
    }
}

impl Options {
    /// Load options from TOML file
    pub fn from_file(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load options from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(content)?)
    }

    /// Compile configuration with these settings applied
    pub fn into_config(self) -> CompileConfig {
        let config = CompileConfig::new().with_printer(self.printer);
        if self.filters.builtin {
            config.with_filters(FilterRegistry::with_builtins())
        } else {
            config
        }
    }
}
