//! Edge case tests for data-related scenarios

use crate::common::rows::{row, text};
use crate::common::{CliTestRunner, TestFixture};
use std::sync::Arc;
use tabrecon::config::CsvConfig;
use tabrecon::datasource::{CsvDatasource, Datasource, Session};
use tabrecon::{diff_rows, Column, ColumnType, PrimaryKey, RawValue, Schema, Side, TabreconError};

fn keyed(columns: Vec<Column>, key: &[&str]) -> Schema {
    Schema::new("t", columns, Some(PrimaryKey::new(key.iter().copied()).unwrap())).unwrap()
}

#[test]
fn test_csv_with_malformed_quotes() {
    let runner = CliTestRunner::new().unwrap();
    let malformed_csv = r#"id,name,description
1,"Product A","Good product"
2,"Product B,"Missing closing quote
3,Product C,"Normal product"
"#;
    let csv_path = runner.fixture().create_csv_raw("malformed.csv", malformed_csv).unwrap();
    let config = runner.fixture().csv_config("bad.json", &csv_path).unwrap();

    // The reader may recover from the stray quote; if it does not, the error names the file format
    if let Err(err) = runner.run_command(&["dump", config.to_str().unwrap()]) {
        let msg = err.to_string();
        assert!(msg.contains("CSV") || msg.contains("malformed.csv"), "unexpected error: {msg}");
    }
}

#[test]
fn test_csv_unicode_and_embedded_commas_survive() {
    let fixture = TestFixture::new().unwrap();
    let csv_path = fixture
        .create_csv_raw("unicode.csv", "id,name\n1,\"Café, ☕\"\n2,北京\n")
        .unwrap();

    let mut source = CsvDatasource::new(CsvConfig { path: csv_path });
    let mut session = Session::open(&mut source).unwrap();
    let schema = session.resolve_schema(None).unwrap();
    let rows = session.get_rows(&schema).unwrap();

    assert_eq!(rows[0].get("name").unwrap().raw(), &text("Café, ☕"));
    assert_eq!(rows[1].get("name").unwrap().raw(), &text("北京"));
}

#[test]
fn test_csv_header_only_has_no_rows() {
    let fixture = TestFixture::new().unwrap();
    let csv_path = fixture.create_csv_raw("empty.csv", "id,name\n").unwrap();

    let mut source = CsvDatasource::new(CsvConfig { path: csv_path });
    let mut session = Session::open(&mut source).unwrap();
    let schema = session.resolve_schema(None).unwrap();
    assert!(session.get_rows(&schema).unwrap().is_empty());
}

#[test]
fn test_key_column_missing_from_row() {
    let schema = keyed(
        vec![Column::new("id", ColumnType::Int), Column::new("v", ColumnType::Int)],
        &["id"],
    );
    let v = Arc::new(Column::new("v", ColumnType::Int));
    let left = vec![row(vec![(&v, RawValue::Int(1))])];

    match diff_rows(&left, &[], Some(&schema)).unwrap_err() {
        TabreconError::SchemaMismatch { column, side } => {
            assert_eq!(column, "id");
            assert_eq!(side, Side::Left);
        }
        other => panic!("expected schema mismatch, got {other}"),
    }
}

#[test]
fn test_compared_column_missing_from_right_row() {
    let schema = keyed(
        vec![Column::new("id", ColumnType::Int), Column::new("v", ColumnType::Int)],
        &["id"],
    );
    let id = Arc::new(schema.columns()[0].clone());
    let v = Arc::new(schema.columns()[1].clone());
    let left = vec![row(vec![(&id, RawValue::Int(1)), (&v, RawValue::Int(1))])];
    let right = vec![row(vec![(&id, RawValue::Int(1))])];

    assert!(matches!(
        diff_rows(&left, &right, Some(&schema)),
        Err(TabreconError::SchemaMismatch { side: Side::Right, .. })
    ));
}

#[test]
fn test_row_columns_outside_schema_are_ignored() {
    let schema = keyed(vec![Column::new("id", ColumnType::Int)], &["id"]);
    let id = Arc::new(schema.columns()[0].clone());
    let extra = Arc::new(Column::new("note", ColumnType::String));
    let left = vec![row(vec![(&id, RawValue::Int(1)), (&extra, text("x"))])];
    let right = vec![row(vec![(&id, RawValue::Int(1)), (&extra, text("y"))])];

    assert!(diff_rows(&left, &right, Some(&schema)).unwrap().is_empty());
}

#[test]
fn test_malformed_key_never_matches() {
    let schema = keyed(
        vec![Column::new("id", ColumnType::Int), Column::new("v", ColumnType::String)],
        &["id"],
    );
    let id = Arc::new(schema.columns()[0].clone());
    let v = Arc::new(schema.columns()[1].clone());
    let left = vec![row(vec![(&id, text("x1")), (&v, text("a"))])];
    let right = vec![row(vec![(&id, text("x1")), (&v, text("a"))])];

    let diff = diff_rows(&left, &right, Some(&schema)).unwrap();
    assert_eq!(diff.added().len(), 1);
    assert_eq!(diff.deleted().len(), 1);
    assert!(diff.modified().is_empty());
}

#[test]
fn test_null_key_components_are_distinct_from_text() {
    let schema = keyed(
        vec![Column::new("a", ColumnType::String), Column::new("b", ColumnType::String)],
        &["a", "b"],
    );
    let a = Arc::new(schema.columns()[0].clone());
    let b = Arc::new(schema.columns()[1].clone());
    let left = vec![
        row(vec![(&a, RawValue::Null), (&b, text("x"))]),
        row(vec![(&a, text("\\N")), (&b, text("x"))]),
    ];

    let diff = diff_rows(&left, &[], Some(&schema)).unwrap();
    assert_eq!(diff.deleted().len(), 2);
}

#[test]
fn test_unsupported_native_value_aborts() {
    let schema = keyed(
        vec![Column::new("id", ColumnType::Int), Column::new("span", ColumnType::String)],
        &["id"],
    );
    let id = Arc::new(schema.columns()[0].clone());
    let span = Arc::new(schema.columns()[1].clone());
    let left = vec![row(vec![
        (&id, RawValue::Int(1)),
        (&span, RawValue::Unsupported("INTERVAL".to_string())),
    ])];
    let right = vec![row(vec![(&id, RawValue::Int(1)), (&span, text("1 day"))])];

    assert!(matches!(
        diff_rows(&left, &right, Some(&schema)),
        Err(TabreconError::UnsupportedConversion { .. })
    ));
}

#[test]
fn test_empty_sides() {
    let schema = keyed(vec![Column::new("id", ColumnType::Int)], &["id"]);
    assert!(diff_rows(&[], &[], Some(&schema)).unwrap().is_empty());
    assert!(diff_rows(&[], &[], None).unwrap().is_empty());
}

#[test]
fn test_unpadded_date_text_is_reported_as_modified() {
    let schema = keyed(
        vec![Column::new("id", ColumnType::Int), Column::new("born", ColumnType::Date)],
        &["id"],
    );
    let id = Arc::new(schema.columns()[0].clone());
    let born = Arc::new(schema.columns()[1].clone());
    let left = vec![row(vec![(&id, RawValue::Int(1)), (&born, text("2018-05-08"))])];
    let right = vec![row(vec![(&id, RawValue::Int(1)), (&born, text("2018-5-8"))])];

    let diff = diff_rows(&left, &right, Some(&schema)).unwrap();
    assert_eq!(diff.modified().len(), 1);
    assert!(diff.modified()[0].changes.contains_key("born"));
}
