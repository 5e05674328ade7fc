use bookdash::config::ColumnAliases;
use bookdash::present::export_csv;
use bookdash::{
    load_table, prepare, Dashboard, DashboardConfig, FilterColumn, FilterSpec, LoadOptions,
    NullSalesPolicy,
};
use tempfile::TempDir;

mod common;

fn dashboard() -> Dashboard {
    let table = prepare(
        common::sample_bookings(),
        &ColumnAliases::default(),
        NullSalesPolicy::Coalesce,
    )
    .unwrap();
    Dashboard::new(table, DashboardConfig::default()).unwrap()
}

#[test]
fn test_export_keeps_rows_and_columns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filtered_data.csv");
    let dash = dashboard();
    let spec = FilterSpec::new().with(FilterColumn::Zone, "South");

    let rows = dash.export_csv(&spec, &path).unwrap();
    assert_eq!(rows, 2);

    let exported = load_table(&path, &LoadOptions::new()).unwrap();
    let filtered = dash.filtered(&spec).unwrap();
    assert_eq!(exported.height(), filtered.height());
    assert_eq!(exported.get_column_names(), filtered.get_column_names());
}

#[test]
fn test_exported_file_loads_back_into_the_pipeline() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("all.csv");
    dashboard().export_csv(&FilterSpec::new(), &path).unwrap();

    let raw = load_table(&path, &LoadOptions::new()).unwrap();
    let table = prepare(raw, &ColumnAliases::default(), NullSalesPolicy::Coalesce).unwrap();
    let reloaded = Dashboard::new(table, DashboardConfig::default()).unwrap();
    let view = reloaded.view(&FilterSpec::new(), 0).unwrap();
    assert_eq!(view.filtered_rows, 5);
    assert_eq!(view.summary.total_revenue, 480.0);
}

#[test]
fn test_empty_selection_exports_header_only() {
    let dash = dashboard();
    let spec = FilterSpec::new().with(FilterColumn::Branch, "Mumbai");
    let csv = export_csv(&dash.filtered(&spec).unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("ZONE,BRANCH,TOUR_START_DATE"));
}

#[test]
fn test_export_to_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("out.csv");
    let err = dashboard()
        .export_csv(&FilterSpec::new(), &path)
        .unwrap_err();
    assert!(err.to_string().starts_with("Cannot create"), "{}", err);
}
