//! Command-line interface definitions for the Clay metrics importer.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Deployment-oriented settings can also be provided via environment
//! variables.

use clap::{Parser, ValueEnum};

/// Command-line arguments for the Clay metrics importer.
///
/// # Examples
///
/// ```sh
/// # Import page metrics for every page under a list endpoint
/// clay_metrics_import -l http://nymag.com/selectall/pages -o ./rows
///
/// # Import inline-product rows instead
/// clay_metrics_import -l http://nymag.com/strategist/pages -o ./rows -m inline-products
///
/// # With a config file and an explicit destination table
/// clay_metrics_import -l http://nymag.com/selectall/pages -o ./rows \
///     -c config.yaml --table page_data_backfill
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// List endpoint returning a JSON array of page identifiers
    #[arg(short, long, env = "CLAY_LIST_URL")]
    pub list_url: String,

    /// Transform applied to each fetched page
    #[arg(short, long, value_enum, default_value_t = Module::Page)]
    pub module: Module,

    /// Output directory for the NDJSON row files
    #[arg(short, long)]
    pub output_dir: String,

    /// Optional path to config.yaml
    #[arg(short, long)]
    pub config: Option<String>,

    /// Destination dataset (defaults per module)
    #[arg(long)]
    pub dataset: Option<String>,

    /// Destination table (defaults per module)
    #[arg(long)]
    pub table: Option<String>,
}

/// Which row shape the run produces.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Module {
    /// One metrics row per published page.
    Page,
    /// One row per page with inline Amazon product links.
    InlineProducts,
}

impl Module {
    pub fn default_dataset(self) -> &'static str {
        match self {
            Module::Page => "clay",
            Module::InlineProducts => "products",
        }
    }

    pub fn default_table(self) -> &'static str {
        match self {
            Module::Page => "page_data",
            Module::InlineProducts => "inline_products",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "clay_metrics_import",
            "--list-url",
            "http://nymag.com/selectall/pages",
            "--output-dir",
            "./rows",
        ]);

        assert_eq!(cli.list_url, "http://nymag.com/selectall/pages");
        assert_eq!(cli.output_dir, "./rows");
        assert_eq!(cli.module, Module::Page);
    }

    #[test]
    fn test_cli_module_values() {
        let cli = Cli::parse_from(&[
            "clay_metrics_import",
            "-l",
            "http://nymag.com/strategist/pages",
            "-o",
            "/tmp/rows",
            "-m",
            "inline-products",
        ]);

        assert_eq!(cli.module, Module::InlineProducts);
        assert_eq!(cli.module.default_dataset(), "products");
        assert_eq!(cli.module.default_table(), "inline_products");
    }
}
