//! End-to-end tests over real files on disk.

use std::io::Write;
use std::path::Path;

use pretty_assertions::assert_eq;
use scout_sheets::prelude::*;

const SALES_CSV: &str = "ID,Name,Amount\n1,Alice,10\n2,Bob,20\n3,Carol,30\n";

fn write_file(dir: &Path, name: &str, content: &str) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

#[test]
fn opens_csv_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "sales.csv", SALES_CSV);

    let workbook = open_workbook(dir.path().join("sales.csv")).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["sales"]);
    assert_eq!(workbook.filename(), "sales.csv");

    let sheet = workbook.sheet_by_index(0).unwrap();
    assert_eq!(sheet.nrows(), 4);
    assert_eq!(sheet.cell(1, 1).unwrap(), Cell::text("Alice"));
}

#[test]
fn rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "data.parquet", "not tabular text");
    assert!(open_workbook(dir.path().join("data.parquet")).is_err());
}

#[test]
fn table_reader_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "sales.csv", SALES_CSV);

    let reader = TableReader::open(dir.path().join("sales.csv"), TableOptions::default()).unwrap();
    assert_eq!(reader.len(), 1);
    assert_eq!(reader.sheet_names(), vec!["sales"]);

    let table = reader.sheet(0usize).unwrap();
    assert_eq!(table.datarow(), 1);
    assert_eq!(table.datacol(), 0);
    assert_eq!(table.headerrow(), 0);
    assert_eq!(table.headers().unwrap(), ["ID", "Name", "Amount"]);
    assert_eq!(table.total("Amount", None).unwrap(), 60.0);
    assert_eq!(
        table.unique("Name", None).unwrap(),
        vec![
            Value::Text("Alice".into()),
            Value::Text("Bob".into()),
            Value::Text("Carol".into()),
        ]
    );
    assert_eq!(table.find_column("Amo").unwrap(), 2);

    let rows = reader.rows("sales").unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].0, 1);
    assert_eq!(rows[2].1[1], Value::Text("Carol".into()));
}

#[test]
fn sheet_lookup_by_name_and_prefix() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "quarterly_report.csv", SALES_CSV);

    let reader = TableReader::open(
        dir.path().join("quarterly_report.csv"),
        TableOptions::default(),
    )
    .unwrap();

    // Exact name, unique prefix, then a miss
    assert!(reader.sheet("quarterly_report").is_ok());
    assert!(reader.sheet("quarter").is_ok());
    assert!(matches!(
        reader.sheet("annual"),
        Err(Error::SheetNotFound(_))
    ));
}

#[test]
fn strict_reader_options_apply_to_every_sheet() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "sales.csv", SALES_CSV);

    let reader = TableReader::open(
        dir.path().join("sales.csv"),
        TableOptions {
            strict: true,
            ..TableOptions::default()
        },
    )
    .unwrap();
    let table = reader.sheet(0usize).unwrap();
    assert_eq!(table.datarow(), 1);
    assert_eq!(table.headerrow(), 0);
}

#[test]
fn xl_files_filters_and_restarts() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.xlsx", "");
    write_file(dir.path(), "B.XLS", "");
    write_file(dir.path(), "notes.txt", "");
    write_file(dir.path(), ".hidden.xls", "");
    write_file(dir.path(), "data.csv", "");

    let mut found: Vec<String> = xl_files(dir.path())
        .unwrap()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    found.sort();
    assert_eq!(found, vec!["B.XLS", "a.xlsx"]);

    // A second call walks the directory afresh
    assert_eq!(xl_files(dir.path()).unwrap().count(), 2);
}
