//! Unit tests for CLI argument parsing and validation

use clap::Parser;
use std::path::PathBuf;
use tabrecon::cli::{Cli, Commands, OutputFormat};
use tabrecon::config::DatasourceKind;

#[test]
fn test_cli_generate_config_command() {
    let cli = Cli::try_parse_from(["tabrecon", "generate-config", "--type", "sql", "-o", "db.json"]).unwrap();
    match cli.command {
        Commands::GenerateConfig { kind, output } => {
            assert_eq!(kind, Some(DatasourceKind::Sql));
            assert_eq!(output, Some(PathBuf::from("db.json")));
        }
        _ => panic!("Expected GenerateConfig command"),
    }
}

#[test]
fn test_cli_generate_config_type_is_optional() {
    let cli = Cli::try_parse_from(["tabrecon", "generate-config"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::GenerateConfig { kind: None, output: None }
    ));
}

#[test]
fn test_cli_generate_schema_command() {
    let cli = Cli::try_parse_from([
        "tabrecon", "generate-schema", "--config", "db.json", "--table", "users",
    ])
    .unwrap();
    match cli.command {
        Commands::GenerateSchema { config, table, output } => {
            assert_eq!(config, PathBuf::from("db.json"));
            assert_eq!(table.as_deref(), Some("users"));
            assert!(output.is_none());
        }
        _ => panic!("Expected GenerateSchema command"),
    }
}

#[test]
fn test_cli_generate_schema_requires_config() {
    assert!(Cli::try_parse_from(["tabrecon", "generate-schema"]).is_err());
}

#[test]
fn test_cli_dump_command_defaults() {
    let cli = Cli::try_parse_from(["tabrecon", "dump", "left.json"]).unwrap();
    match cli.command {
        Commands::Dump { config, table, format } => {
            assert_eq!(config, PathBuf::from("left.json"));
            assert!(table.is_none());
            assert_eq!(format, "pretty");
        }
        _ => panic!("Expected Dump command"),
    }
}

#[test]
fn test_cli_diff_command_defaults() {
    let cli = Cli::try_parse_from(["tabrecon", "diff", "left.json", "right.json"]).unwrap();
    match cli.command {
        Commands::Diff {
            left,
            right,
            schema,
            table,
            format,
            output,
            quiet,
        } => {
            assert_eq!(left, PathBuf::from("left.json"));
            assert_eq!(right, PathBuf::from("right.json"));
            assert!(schema.is_none());
            assert!(table.is_none());
            assert_eq!(format, "pretty");
            assert!(output.is_none());
            assert!(!quiet);
        }
        _ => panic!("Expected Diff command"),
    }
}

#[test]
fn test_cli_diff_requires_both_sides() {
    assert!(Cli::try_parse_from(["tabrecon", "diff", "left.json"]).is_err());
}

#[test]
fn test_cli_verbose_is_global() {
    let cli = Cli::try_parse_from(["tabrecon", "dump", "left.json", "--verbose"]).unwrap();
    assert!(cli.verbose);
}

#[test]
fn test_output_format_parse() {
    assert!(matches!(OutputFormat::parse("pretty"), Ok(OutputFormat::Pretty)));
    assert!(matches!(OutputFormat::parse("Json"), Ok(OutputFormat::Json)));
    assert!(OutputFormat::parse("csv").is_err());
}
