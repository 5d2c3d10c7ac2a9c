//! Configuration for source printing

use serde::Deserialize;

/// Quote character used for string literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quote {
    #[default]
    Single,
    Double,
}

impl Quote {
    pub fn as_char(&self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }
}

/// Configuration options for printed source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrinterConfig {
    /// Spaces per indentation level
    pub tab_width: usize,

    /// Quote character for string literals
    pub quote: Quote,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            tab_width: 2,
            quote: Quote::Single,
        }
    }
}

impl PrinterConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the indentation width
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width;
        self
    }

    /// Set the string quote style
    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quote = quote;
        self
    }
}
