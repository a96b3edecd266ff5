//! Integration tests for the CSV connector and the commands built on it

use crate::common::{assertions, sample_data, CliTestRunner, TestFixture};
use std::fs;
use tabrecon::config::CsvConfig;
use tabrecon::datasource::{CsvDatasource, Datasource, Session};
use tabrecon::{ColumnType, RawValue, Schema};

#[test]
fn test_csv_session_reads_all_rows_as_text() {
    let fixture = TestFixture::new().unwrap();
    let csv_path = fixture
        .create_csv("products.csv", &sample_data::products_csv_data())
        .unwrap();

    let mut source = CsvDatasource::new(CsvConfig { path: csv_path });
    let mut session = Session::open(&mut source).unwrap();
    let schema = session.resolve_schema(None).unwrap();
    let rows = session.get_rows(&schema).unwrap();

    assert_eq!(schema.name(), "products");
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0].get("price").unwrap().raw(),
        &RawValue::Text("1.50".to_string())
    );
}

#[test]
fn test_csv_rows_typed_by_schema_file() {
    let fixture = TestFixture::new().unwrap();
    let csv_path = fixture
        .create_csv("products.csv", &sample_data::products_csv_data())
        .unwrap();
    let schema_path = fixture
        .create_json("products.schema.json", &sample_data::products_schema())
        .unwrap();
    let schema = Schema::from_json_file(&schema_path).unwrap();

    let mut source = CsvDatasource::new(CsvConfig { path: csv_path });
    let mut session = Session::open(&mut source).unwrap();
    let rows = session.get_rows(&schema).unwrap();

    let price = rows[0].get("price").unwrap();
    assert_eq!(price.column().column_type, ColumnType::Float);
    assert_eq!(price.display_text().as_deref(), Some("1.5"));
}

#[test]
fn test_csv_directory_requires_table_choice() {
    let fixture = TestFixture::new().unwrap();
    let dir = fixture.root().join("exports");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("users.csv"), "id\n1\n").unwrap();
    fs::write(dir.join("orders.csv"), "id\n9\n").unwrap();

    let mut source = CsvDatasource::new(CsvConfig { path: dir });
    let mut session = Session::open(&mut source).unwrap();

    let err = session.resolve_schema(None).unwrap_err();
    assert!(err.to_string().contains("orders, users"));

    let schema = session.resolve_schema(Some("orders")).unwrap();
    let rows = session.get_rows(&schema).unwrap();
    assert_eq!(rows[0].get("id").unwrap().display_text().as_deref(), Some("9"));
}

#[test]
fn test_csv_set_rows_round_trips_through_file() {
    let fixture = TestFixture::new().unwrap();
    let csv_path = fixture
        .create_csv("products.csv", &sample_data::products_csv_data())
        .unwrap();
    let copy_path = fixture.root().join("copy.csv");
    fs::write(&copy_path, "id,name,price\n").unwrap();

    let mut source = CsvDatasource::new(CsvConfig { path: csv_path });
    let mut session = Session::open(&mut source).unwrap();
    let schema = session.resolve_schema(None).unwrap();
    let rows = session.get_rows(&schema).unwrap();
    drop(session);

    let mut target = CsvDatasource::new(CsvConfig { path: copy_path.clone() });
    let mut session = Session::open(&mut target).unwrap();
    session.set_rows(&schema, &rows).unwrap();
    let copied = session.get_rows(&schema).unwrap();

    assert_eq!(copied, rows);
    assert_eq!(
        fs::read_to_string(&copy_path).unwrap(),
        "id,name,price\n1,Apple,1.50\n2,Banana,0.75\n3,Cherry,2.00\n"
    );
}

#[test]
fn test_generate_schema_command_writes_inferred_schema() {
    let runner = CliTestRunner::new().unwrap();
    let csv_path = runner
        .fixture()
        .create_csv("products.csv", &sample_data::products_csv_data())
        .unwrap();
    let config = runner.fixture().csv_config("left.json", &csv_path).unwrap();
    let output = runner.fixture().root().join("schema.json");

    runner.expect_success(&[
        "generate-schema",
        "--config",
        config.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ]);

    assertions::assert_file_exists_and_not_empty(&output);
    let schema = Schema::from_json_file(&output).unwrap();
    assert_eq!(schema.name(), "products");
    assert_eq!(schema.column_names(), vec!["id", "name", "price"]);
    assert!(schema.primary_key().is_none());
}

#[test]
fn test_dump_command_succeeds_in_both_formats() {
    let runner = CliTestRunner::new().unwrap();
    let csv_path = runner
        .fixture()
        .create_csv("products.csv", &sample_data::products_csv_data())
        .unwrap();
    let config = runner.fixture().csv_config("left.json", &csv_path).unwrap();

    runner.expect_success(&["dump", config.to_str().unwrap()]);
    runner.expect_success(&["dump", config.to_str().unwrap(), "--format", "json"]);
}
