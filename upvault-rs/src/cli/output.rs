//! Output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::error::Result;
use serde::Serialize;

/// Helper for formatting and printing output.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Render a serializable value in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        let output = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Toml => toml::to_string_pretty(value)?,
        };
        Ok(output)
    }

    /// Print a serializable value to stdout unless in quiet mode.
    pub fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        println!("{}", self.render(value)?.trim_end());
        Ok(())
    }

    /// Print a warning message.
    pub fn warn(&self, message: &str) {
        eprintln!("Warning: {}", message);
    }
}
