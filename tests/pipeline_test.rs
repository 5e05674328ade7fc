use bookdash::aggregate::{by_month, category_counts, summarize};
use bookdash::config::ColumnAliases;
use bookdash::filter::{apply, distinct_values};
use bookdash::prepare::{TOTAL_SALE_VALUE, TOUR_MONTH};
use bookdash::present::format_average;
use bookdash::{
    load_table, prepare, BookingTable, FilterColumn, FilterSpec, LoadOptions, NullSalesPolicy,
};
use polars::prelude::*;
use tempfile::TempDir;

mod common;

fn prepared(df: DataFrame) -> BookingTable {
    prepare(df, &ColumnAliases::default(), NullSalesPolicy::Coalesce).unwrap()
}

fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

#[test]
fn test_zone_filter_scenario() {
    let table = prepared(common::north_south());
    let spec = FilterSpec::new().with(FilterColumn::Zone, "North");
    let df = apply(&table, &spec).unwrap();

    assert_eq!(df.height(), 1);
    let total = df.column(TOTAL_SALE_VALUE).unwrap().f64().unwrap().get(0);
    assert_eq!(total, Some(150.0));

    let summary = summarize(&df).unwrap();
    assert_eq!(summary.total_count, 1);
    assert_eq!(summary.total_revenue, 150.0);
    assert_eq!(summary.average_value, Some(150.0));
}

#[test]
fn test_empty_spec_keeps_every_row() {
    let table = prepared(common::sample_bookings());
    let df = apply(&table, &FilterSpec::new()).unwrap();
    assert!(df.equals_missing(table.df()));

    // Empty strings place no constraint either
    let mut spec = FilterSpec::new();
    spec.set(FilterColumn::Branch, Some(String::new()));
    assert!(apply(&table, &spec).unwrap().equals_missing(table.df()));
}

#[test]
fn test_filtered_rows_satisfy_every_constraint() {
    let table = prepared(common::sample_bookings());
    for zone in distinct_values(&table, FilterColumn::Zone).unwrap() {
        for month in distinct_values(&table, FilterColumn::Month).unwrap() {
            let spec = FilterSpec::new()
                .with(FilterColumn::Zone, zone.as_str())
                .with(FilterColumn::Month, month.as_str());
            let df = apply(&table, &spec).unwrap();
            assert!(df.height() <= table.height());
            assert!(strings(&df, "ZONE").iter().all(|z| z.as_deref() == Some(zone.as_str())));
            assert!(strings(&df, TOUR_MONTH)
                .iter()
                .all(|m| m.as_deref() == Some(month.as_str())));
        }
    }

    let spec = FilterSpec::new()
        .with(FilterColumn::Zone, "South")
        .with(FilterColumn::Month, "2024-02");
    assert_eq!(apply(&table, &spec).unwrap().height(), 1);
}

#[test]
fn test_no_match_summarizes_to_zero() {
    let table = prepared(common::sample_bookings());
    let spec = FilterSpec::new().with(FilterColumn::Zone, "West");
    let df = apply(&table, &spec).unwrap();
    assert_eq!(df.height(), 0);

    let summary = summarize(&df).unwrap();
    assert_eq!(summary.total_count, 0);
    assert_eq!(summary.total_revenue, 0.0);
    assert_eq!(summary.average_value, None);
    assert_eq!(format_average(summary.average_value), "N/A");
    assert!(by_month(&df).unwrap().is_empty());
}

#[test]
fn test_months_ascending_and_undated_rows_only_in_summary() {
    let table = prepared(common::sample_bookings());
    let df = apply(&table, &FilterSpec::new()).unwrap();

    let months = by_month(&df).unwrap();
    let labels: Vec<&str> = months.iter().map(|b| b.month.as_str()).collect();
    assert_eq!(labels, ["2024-01", "2024-02", "2024-03"]);

    let january = &months.months[0];
    assert_eq!(january.count, 2);
    assert_eq!(january.revenue, 200.0);
    assert_eq!(january.mean, 100.0);

    let bucketed: usize = months.iter().map(|b| b.count).sum();
    assert_eq!(bucketed, 4);
    assert_eq!(summarize(&df).unwrap().total_count, 5);
}

#[test]
fn test_null_sales_policies() {
    let coalesced = prepared(common::sample_bookings());
    assert_eq!(coalesced.height(), 5);
    let east = apply(
        &coalesced,
        &FilterSpec::new().with(FilterColumn::Zone, "East"),
    )
    .unwrap();
    let total = east.column(TOTAL_SALE_VALUE).unwrap().f64().unwrap().get(0);
    assert_eq!(total, Some(70.0));

    let dropped = prepare(
        common::sample_bookings(),
        &ColumnAliases::default(),
        NullSalesPolicy::Drop,
    )
    .unwrap();
    assert_eq!(dropped.height(), 4);
    assert_eq!(dropped.dropped_rows(), 1);
    assert_eq!(
        distinct_values(&dropped, FilterColumn::Zone).unwrap(),
        ["North", "South"]
    );
}

#[test]
fn test_branch_name_alias() {
    let mut df = common::north_south();
    df.rename("BRANCH", "BRANCH NAME".into()).unwrap();
    let table = prepared(df);
    assert_eq!(table.columns().branch, "BRANCH NAME");

    let spec = FilterSpec::new().with(FilterColumn::Branch, "Chennai");
    let filtered = apply(&table, &spec).unwrap();
    assert_eq!(filtered.height(), 1);
    assert_eq!(summarize(&filtered).unwrap().total_revenue, 200.0);
}

#[test]
fn test_selection_options_are_sorted_and_non_null() {
    let table = prepared(common::sample_bookings());
    assert_eq!(
        distinct_values(&table, FilterColumn::Zone).unwrap(),
        ["East", "North", "South"]
    );
    assert_eq!(
        distinct_values(&table, FilterColumn::Branch).unwrap(),
        ["Agra", "Chennai", "Delhi", "Kolkata"]
    );
    assert_eq!(
        distinct_values(&table, FilterColumn::Month).unwrap(),
        ["2024-01", "2024-02", "2024-03"]
    );
}

#[test]
fn test_astra_counts_most_frequent_first() {
    let table = prepared(common::sample_bookings());
    let counts = category_counts(table.df(), "ASTRA BOOKING").unwrap();
    let pairs: Vec<(&str, usize)> = counts.iter().map(|c| (c.label.as_str(), c.count)).collect();
    assert_eq!(pairs, [("Yes", 3), ("No", 2)]);
}

#[test]
fn test_csv_file_through_the_pipeline() {
    let dir = TempDir::new().unwrap();
    let path = common::write_csv(&common::sample_bookings(), dir.path(), "bookings.csv");

    let raw = load_table(&path, &LoadOptions::new()).unwrap();
    assert_eq!(raw.height(), 5);
    let table = prepared(raw);
    assert_eq!(table.columns().astra_booking.as_deref(), Some("ASTRA BOOKING"));

    let spec = FilterSpec::new().with(FilterColumn::Month, "2024-01");
    let summary = summarize(&apply(&table, &spec).unwrap()).unwrap();
    assert_eq!(summary.total_count, 2);
    assert_eq!(summary.total_revenue, 200.0);
}

#[test]
fn test_missing_file_and_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.csv");
    let err = load_table(&missing, &LoadOptions::new()).unwrap_err();
    assert!(err.to_string().starts_with("File not found"), "{}", err);

    let odd = dir.path().join("bookings.dat");
    std::fs::write(&odd, "ZONE\nNorth\n").unwrap();
    let err = load_table(&odd, &LoadOptions::new()).unwrap_err();
    assert!(err.to_string().starts_with("Unsupported file type"), "{}", err);
}

#[test]
fn test_csv_with_bad_leading_date_still_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bookings.csv");
    std::fs::write(
        &path,
        "ZONE,BRANCH,TOUR_START_DATE,LAND_SALE_VALUE,AIR_SALE_VALUE\n\
         North,Delhi,unknown,50,100\n\
         South,Chennai,2024-02-12,0,200\n\
         North,Agra,2024-01-25,20,30\n",
    )
    .unwrap();

    let table = prepared(load_table(&path, &LoadOptions::new()).unwrap());
    assert_eq!(table.height(), 3);

    let df = apply(&table, &FilterSpec::new()).unwrap();
    assert_eq!(summarize(&df).unwrap().total_count, 3);
    let labels: Vec<String> = by_month(&df).unwrap().iter().map(|b| b.month.clone()).collect();
    assert_eq!(labels, ["2024-01", "2024-02"]);
}
