//! Command line configuration for `fbmap`.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FBMAP_LOG_LEVEL` | warn | Log level |
//! | `FBMAP_NAME_MAP` | (none) | JSON file with wire name overrides |

use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fbmap_typemap::NameMap;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Parser)]
#[command(name = "fbmap")]
#[command(about = "Convert FogBugz XML responses to records and records to request arguments")]
#[command(version)]
pub struct CliConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "FBMAP_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// JSON object mapping field names to wire names, e.g. custom field columns.
    #[arg(long, env = "FBMAP_NAME_MAP", global = true)]
    pub name_map: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Extract records from a saved XML response and print them as JSON.
    Extract {
        /// Catalogue schema name, e.g. fbBug.
        #[arg(long)]
        schema: String,

        /// Response file.
        #[arg(long)]
        input: PathBuf,

        /// Element whose children are the records; without it the document
        /// root is a single record.
        #[arg(long)]
        container: Option<String>,

        /// Sort key; repeat for composite ordering.
        #[arg(long = "sort")]
        sort: Vec<String>,
    },

    /// Print the `cols` argument for a schema.
    Columns {
        #[arg(long)]
        schema: String,

        /// Comma or space separated field names.
        #[arg(long)]
        subset: Option<String>,
    },

    /// Build request arguments from a JSON record.
    Args {
        #[arg(long)]
        schema: String,

        /// JSON object file.
        #[arg(long)]
        record: PathBuf,
    },

    /// List the catalogue schemas and their fields.
    Schemas,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            name_map: None,
            command: Command::Schemas,
        }
    }
}

impl CliConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "Log level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        if let Some(path) = &self.name_map {
            if !path.is_file() {
                errors.push(format!("Name map file not found: {}", path.display()));
            }
        }

        if let Command::Extract { sort, .. } = &self.command {
            if sort.iter().any(|key| key.trim().is_empty()) {
                errors.push("Sort keys cannot be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Loads the name remap, empty when none is configured.
    pub fn load_name_map(&self) -> anyhow::Result<NameMap> {
        let Some(path) = &self.name_map else {
            return Ok(NameMap::new());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading name map {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("name map {} must be a JSON object of strings", path.display()))
    }
}
