//! Providers command implementation.

use crate::config::AppConfig;
use crate::error::Result;
use crate::output::Formatter;

/// Execute the providers command.
pub fn execute_providers(config: &AppConfig, formatter: &Formatter) -> Result<()> {
    println!("{}", formatter.providers(&config.llm())?);
    Ok(())
}
