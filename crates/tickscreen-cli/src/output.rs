use std::io::{self, Write};

use tickscreen_core::{CoreError, Table};

use crate::error::CliError;

/// Prints `table` as CSV on stdout.
pub fn render(table: &Table) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    table.write_to(&mut handle).map_err(CoreError::from)?;
    handle.flush()?;
    Ok(())
}
