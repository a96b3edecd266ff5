//! Output formatting utilities

use crate::error::Result;
use crate::row::Row;
use crate::row_diff::{Diff, RowDelta};
use crate::schema::Schema;
use crate::schema_diff::SchemaDelta;
use serde::Serialize;

/// How rows were matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Keyed,
    Unkeyed,
}

/// One schema comparison, labelled with what was compared
#[derive(Debug, Clone, Serialize)]
pub struct SchemaComparison {
    pub between: String,
    pub delta: SchemaDelta,
}

/// Everything the `diff` command reports
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub left: String,
    pub right: String,
    pub mode: MatchMode,
    pub schema_deltas: Vec<SchemaComparison>,
    pub diff: Diff,
}

impl DiffReport {
    pub fn has_changes(&self) -> bool {
        !self.diff.is_empty() || self.schema_deltas.iter().any(|c| !c.delta.is_empty())
    }
}

/// Rows shown per bucket before eliding
const SAMPLE_LIMIT: usize = 5;

/// Pretty printer for tabrecon output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print a diff report
    pub fn print_diff_report(report: &DiffReport, quiet: bool) {
        let diff = &report.diff;
        if quiet {
            // Machine-readable output
            let schema_changes: usize = report.schema_deltas.iter().map(|c| c.delta.change_count()).sum();
            println!("schema_changes={}", schema_changes);
            println!("added={}", diff.added().len());
            println!("deleted={}", diff.deleted().len());
            println!("modified={}", diff.modified().len());
            return;
        }

        println!("🔍 Diff: {} → {} ({})", report.left, report.right, mode_label(report.mode));

        for comparison in &report.schema_deltas {
            if comparison.delta.is_empty() {
                println!("├─ ✅ Schema {}: unchanged", comparison.between);
            } else {
                println!(
                    "├─ ❌ Schema {}: {} changes",
                    comparison.between,
                    comparison.delta.change_count()
                );
                Self::print_schema_delta(&comparison.delta, "│  ");
            }
        }

        if diff.is_empty() {
            println!("└─ ✅ Rows: unchanged");
            return;
        }

        Self::print_rows_bucket("Added", diff.added(), "├─");
        Self::print_rows_bucket("Deleted", diff.deleted(), "├─");
        Self::print_modified(diff.modified());
        println!("└─ Total changes: {}", diff.change_count());
    }

    fn print_schema_delta(delta: &SchemaDelta, prefix: &str) {
        for column in &delta.added_columns {
            println!("{}├─ + {} ({})", prefix, column.name, column.column_type);
        }
        for column in &delta.removed_columns {
            println!("{}├─ - {} ({})", prefix, column.name, column.column_type);
        }
        for change in &delta.changed_columns {
            println!(
                "{}├─ ~ {}: {}{} → {}{}",
                prefix,
                change.name,
                change.before.column_type,
                flags(change.before.not_null, change.before.auto_increment),
                change.after.column_type,
                flags(change.after.not_null, change.after.auto_increment)
            );
        }
        if delta.primary_key.changed {
            println!(
                "{}└─ Primary key: [{}] → [{}]",
                prefix,
                delta.primary_key.before.join(", "),
                delta.primary_key.after.join(", ")
            );
        }
    }

    fn print_rows_bucket(label: &str, rows: &[Row], marker: &str) {
        if rows.is_empty() {
            return;
        }
        println!("{} {} rows: {}", marker, label, rows.len());
        for (i, row) in rows.iter().take(SAMPLE_LIMIT).enumerate() {
            let last = i + 1 == rows.len().min(SAMPLE_LIMIT) && rows.len() <= SAMPLE_LIMIT;
            let row_marker = if last { "└─" } else { "├─" };
            println!("│  {} {}", row_marker, format_row(row));
        }
        if rows.len() > SAMPLE_LIMIT {
            println!("│  └─ ... and {} more", rows.len() - SAMPLE_LIMIT);
        }
    }

    fn print_modified(modified: &[RowDelta]) {
        if modified.is_empty() {
            return;
        }
        println!("├─ Modified rows: {}", modified.len());
        for (i, delta) in modified.iter().take(SAMPLE_LIMIT).enumerate() {
            let last = i + 1 == modified.len().min(SAMPLE_LIMIT) && modified.len() <= SAMPLE_LIMIT;
            let (row_marker, indent) = if last { ("└─", "   ") } else { ("├─", "│  ") };
            println!("│  {} Key {}: {} columns changed", row_marker, delta.key, delta.changes.len());

            for (j, (column, change)) in delta.changes.iter().enumerate() {
                let change_marker = if j + 1 == delta.changes.len() { "└─" } else { "├─" };
                println!(
                    "│  {}{} {}: {} → {}",
                    indent,
                    change_marker,
                    column,
                    cell_text(change.before.display_text()),
                    cell_text(change.after.display_text())
                );
            }
        }
        if modified.len() > SAMPLE_LIMIT {
            println!("│  └─ ... and {} more", modified.len() - SAMPLE_LIMIT);
        }
    }

    /// Print a schema as a column listing
    pub fn print_schema(schema: &Schema) {
        println!("📋 Schema: {}", schema.name());
        let key = schema.key_column_names();
        let width = schema.columns().iter().map(|c| c.name.len()).max().unwrap_or(0);
        for (i, column) in schema.columns().iter().enumerate() {
            let marker = if i + 1 == schema.columns().len() { "└─" } else { "├─" };
            let key_flag = if key.contains(&column.name) { " [key]" } else { "" };
            println!(
                "{} {:<width$}  {}{}{}",
                marker,
                column.name,
                column.column_type,
                flags(column.not_null, column.auto_increment),
                key_flag,
                width = width
            );
        }
    }

    /// Print rows as an aligned table in schema column order
    pub fn print_rows(schema: &Schema, rows: &[Row]) {
        let names = schema.column_names();
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                names
                    .iter()
                    .map(|name| cell_text(row.get(name).and_then(|v| v.display_text())))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        println!("{}", format_line(names.iter().map(|n| n.to_string()), &widths));
        println!(
            "{}",
            widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
        );
        for row in cells {
            println!("{}", format_line(row.into_iter(), &widths));
        }
        println!("({} rows)", rows.len());
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }
}

fn mode_label(mode: MatchMode) -> &'static str {
    match mode {
        MatchMode::Keyed => "matched by primary key",
        MatchMode::Unkeyed => "matched by row content",
    }
}

fn flags(not_null: bool, auto_increment: bool) -> String {
    let mut out = String::new();
    if not_null {
        out.push_str(" not null");
    }
    if auto_increment {
        out.push_str(" auto_increment");
    }
    out
}

fn cell_text(text: Option<String>) -> String {
    text.unwrap_or_else(|| "NULL".to_string())
}

fn format_row(row: &Row) -> String {
    row.values()
        .map(|value| format!("{}={}", value.column_name(), cell_text(value.display_text())))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_line(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
}
