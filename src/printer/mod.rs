//! Source printer turning a syntax tree back into text
//!
//! Output is deterministic: formatting of the input template is not
//! preserved, every tree prints the same way for a given configuration.

pub mod config;
pub mod source;

pub use config::{PrinterConfig, Quote};
pub use source::print;
