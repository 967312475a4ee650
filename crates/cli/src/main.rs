//! `fbmap`: offline front end for the typemap engine.
//!
//! Extracts records from saved XML responses, prints column lists and builds
//! request arguments from JSON records, using the built-in schema catalogue.

mod config;
mod run;

use std::fs;

use anyhow::Context as _;
use clap::Parser;
use config::{CliConfig, Command};
use tracing::debug;

/// Initializes logging on stderr so stdout stays machine readable.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fbmap={level},fbmap_typemap={level},fbmap_objects={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let name_map = config.load_name_map()?;
    debug!(command = ?config.command, remapped = name_map.len(), "starting");

    let output = match &config.command {
        Command::Extract {
            schema,
            input,
            container,
            sort,
        } => {
            let xml = fs::read_to_string(input)
                .with_context(|| format!("reading {}", input.display()))?;
            run::extract_records(schema, &xml, container.as_deref(), sort, &name_map)?
        }
        Command::Columns { schema, subset } => run::columns(schema, subset.as_deref(), &name_map)?,
        Command::Args { schema, record } => {
            let json = fs::read_to_string(record)
                .with_context(|| format!("reading {}", record.display()))?;
            run::wire_args(schema, &json, &name_map)?
        }
        Command::Schemas => run::list_schemas(),
    };

    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
