//! Output formatting

use crate::app::OutputFormat;
use anyhow::Result;
use serde::Serialize;

/// Print `value` as pretty JSON, or the rendered text in CLI format
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Cli => println!("{}", text()),
    }
    Ok(())
}
