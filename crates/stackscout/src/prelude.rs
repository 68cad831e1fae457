pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, Result};
pub use std::format as f;

use stackscout_core::{ScoutError, ToolOutcome};

pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .padding(1, 1)
        .build();

    table.set_format(format);

    table
}

/// Turn a domain error into a report that keeps the kind and suggestions
pub fn report(error: ScoutError) -> color_eyre::eyre::Report {
    eyre!(ToolOutcome::failure(&error).text)
}

/// Build the services from the global flags
pub fn services(global: &crate::Global) -> Result<crate::service::Services> {
    let config = crate::config::Config::from_global(global).map_err(report)?;
    crate::service::Services::from_config(config).map_err(report)
}

pub fn output_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
