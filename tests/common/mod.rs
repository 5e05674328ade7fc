#![allow(dead_code)]

use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Four bookings over two zones and two months, plus one row without a usable date.
pub fn sample_bookings() -> DataFrame {
    df!(
        "ZONE" => &["North", "South", "North", "East", "South"],
        "BRANCH" => &["Delhi", "Chennai", "Agra", "Kolkata", "Chennai"],
        "TOUR_START_DATE" => &["2024-01-10", "2024-02-12", "2024-01-25", "2024-03-02", "unknown"],
        "LAND_SALE_VALUE" => &[Some(50.0), Some(0.0), Some(20.0), None, Some(5.0)],
        "AIR_SALE_VALUE" => &[Some(100.0), Some(200.0), Some(30.0), Some(70.0), Some(5.0)],
        "ASTRA BOOKING" => &["Yes", "No", "Yes", "Yes", "No"]
    )
    .unwrap()
}

/// The two-row example used throughout the docs.
pub fn north_south() -> DataFrame {
    df!(
        "ZONE" => &["North", "South"],
        "BRANCH" => &["Delhi", "Chennai"],
        "TOUR_START_DATE" => &["2024-01-10", "2024-02-12"],
        "LAND_SALE_VALUE" => &[50.0, 0.0],
        "AIR_SALE_VALUE" => &[100.0, 200.0]
    )
    .unwrap()
}

pub fn write_csv(df: &DataFrame, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut df = df.clone();
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}
