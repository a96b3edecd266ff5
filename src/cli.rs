//! Command-line interface for tabrecon

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tabrecon")]
#[command(about = "Reconcile tables across CSV files, databases and other stores")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Log filter for this invocation: debug with `--verbose`, info otherwise
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a datasource config template
    #[command(alias = "generate:config")]
    GenerateConfig {
        /// Datasource type: "csv", "sql" or "mock" (prompted when omitted).
        /// Spreadsheet sources are not supported
        #[arg(short = 't', long = "type", value_parser = parse_kind)]
        kind: Option<crate::config::DatasourceKind>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the schema a datasource reports
    #[command(alias = "generate:schema")]
    GenerateSchema {
        /// Datasource config file
        #[arg(short, long)]
        config: PathBuf,

        /// Schema (table or file stem) to describe
        #[arg(long)]
        table: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the rows of one schema
    Dump {
        /// Datasource config file
        config: PathBuf,

        /// Schema (table or file stem) to dump
        #[arg(long)]
        table: Option<String>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Compare two datasources
    Diff {
        /// Reference datasource config
        left: PathBuf,

        /// Subject datasource config
        right: PathBuf,

        /// Reference schema file; enables key-matched comparison
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Schema (table or file stem) to compare on both sides
        #[arg(long)]
        table: Option<String>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print only the change counts
        #[arg(short, long)]
        quiet: bool,
    },
}

/// Parse output format string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

fn parse_kind(s: &str) -> Result<crate::config::DatasourceKind, String> {
    crate::config::DatasourceKind::parse(s)
}
