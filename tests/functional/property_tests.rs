//! Properties the row differ must hold for any input

use crate::common::rows::{row, text};
use std::collections::BTreeSet;
use std::sync::Arc;
use tabrecon::datasource::{Datasource, MockDatasource};
use tabrecon::{diff_rows, Column, ColumnType, PrimaryKey, RawValue, Row, Schema};

fn priced_schema() -> Schema {
    Schema::new(
        "prices",
        vec![
            Column::new("sku", ColumnType::String),
            Column::new("region", ColumnType::Int).at_position(1),
            Column::new("price", ColumnType::Float).at_position(2),
        ],
        Some(PrimaryKey::new(["sku", "region"]).unwrap()),
    )
    .unwrap()
}

/// Left and right sides with adds, deletes, modifications and unchanged rows
fn sample_sides(schema: &Schema) -> (Vec<Row>, Vec<Row>) {
    let sku = Arc::new(schema.columns()[0].clone());
    let region = Arc::new(schema.columns()[1].clone());
    let price = Arc::new(schema.columns()[2].clone());
    let make = |s: &str, r: i64, p: RawValue| {
        row(vec![(&sku, text(s)), (&region, RawValue::Int(r)), (&price, p)])
    };

    let left = vec![
        make("a|b", 1, text("1.50")),
        make("apple", 2, RawValue::Float(2.0)),
        make("pear", 1, text("3.25")),
        make("plum", 3, RawValue::Null),
        make("fig", 1, text("oops")),
    ];
    let right = vec![
        make("pear", 1, RawValue::Float(3.25)),
        make("a|b", 1, RawValue::Float(1.5)),
        make("apple", 2, RawValue::Float(2.5)),
        make("kiwi", 7, text("0.10")),
        make("fig", 1, text("oops")),
    ];
    (left, right)
}

#[test]
fn test_diff_is_deterministic_under_input_order() {
    let schema = priced_schema();
    let (left, right) = sample_sides(&schema);
    let first = serde_json::to_string(&diff_rows(&left, &right, Some(&schema)).unwrap()).unwrap();

    let mut left_rev = left.clone();
    left_rev.reverse();
    let mut right_rev = right.clone();
    right_rev.reverse();
    let second =
        serde_json::to_string(&diff_rows(&left_rev, &right_rev, Some(&schema)).unwrap()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_keyed_completeness() {
    let schema = priced_schema();
    let (left, right) = sample_sides(&schema);
    let diff = diff_rows(&left, &right, Some(&schema)).unwrap();

    // apple changed price, plum deleted, kiwi added
    let modified: BTreeSet<&str> = diff.modified().iter().map(|d| d.key.as_str()).collect();
    assert_eq!(modified, BTreeSet::from(["apple|2", "fig|1"]));
    assert_eq!(diff.added().len(), 1);
    assert_eq!(diff.added()[0].get("sku").unwrap().display_text().as_deref(), Some("kiwi"));
    assert_eq!(diff.deleted().len(), 1);
    assert_eq!(diff.deleted()[0].get("sku").unwrap().display_text().as_deref(), Some("plum"));
}

#[test]
fn test_unconvertible_cell_always_differs() {
    let schema = priced_schema();
    let (left, right) = sample_sides(&schema);
    let diff = diff_rows(&left, &right, Some(&schema)).unwrap();

    let fig = diff
        .modified()
        .iter()
        .find(|d| d.key.as_str() == "fig|1")
        .expect("identical malformed cells still differ");
    assert!(fig.changes.contains_key("price"));
}

#[test]
fn test_no_op_law() {
    let schema = priced_schema();
    let (_, right) = sample_sides(&schema);
    let well_formed: Vec<Row> = right
        .into_iter()
        .filter(|r| r.get("sku").unwrap().display_text().as_deref() != Some("fig"))
        .collect();

    assert!(diff_rows(&well_formed, &well_formed, Some(&schema)).unwrap().is_empty());
    assert!(diff_rows(&well_formed, &well_formed, None).unwrap().is_empty());
}

#[test]
fn test_symmetry() {
    let schema = priced_schema();
    let (left, right) = sample_sides(&schema);

    let forward = diff_rows(&left, &right, Some(&schema)).unwrap();
    let backward = diff_rows(&right, &left, Some(&schema)).unwrap();
    assert_eq!(forward.added(), backward.deleted());
    assert_eq!(forward.deleted(), backward.added());

    let forward = diff_rows(&left, &right, None).unwrap();
    let backward = diff_rows(&right, &left, None).unwrap();
    assert_eq!(forward.added(), backward.deleted());
    assert_eq!(forward.deleted(), backward.added());
}

#[test]
fn test_float_text_forms_do_not_differ() {
    let schema = priced_schema();
    let (left, right) = sample_sides(&schema);
    let diff = diff_rows(&left, &right, Some(&schema)).unwrap();

    // "1.50" vs 1.5 and "3.25" vs 3.25 are equal once normalized
    assert!(diff.modified().iter().all(|d| d.key.as_str() != "a\\|b|1"));
    assert!(diff.modified().iter().all(|d| d.key.as_str() != "pear|1"));
}

#[test]
fn test_mock_sources_of_different_sizes() {
    let mut small = MockDatasource::new(3);
    let mut large = MockDatasource::new(5);
    let schema = small.get_schema("mock").unwrap();
    let left = small.get_rows(&schema).unwrap();
    let right = large.get_rows(&schema).unwrap();

    let keyed = diff_rows(&left, &right, Some(&schema)).unwrap();
    let keys: Vec<String> = keyed
        .added()
        .iter()
        .map(|r| r.get("id").unwrap().display_text().unwrap())
        .collect();
    assert_eq!(keys, vec!["3", "4"]);
    assert!(keyed.deleted().is_empty());
    assert!(keyed.modified().is_empty());

    let unkeyed = diff_rows(&left, &right, None).unwrap();
    assert_eq!(unkeyed.added().len(), 2);
}
