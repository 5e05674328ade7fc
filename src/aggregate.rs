//! Summary metrics and grouped series over a (filtered) booking frame.
//!
//! Every function takes the frame produced by [`crate::filter::apply`], so it expects the
//! derived `TOUR_MONTH` and `TOTAL_SALE_VALUE` columns to be present.

use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::prepare::{BookingColumns, TOTAL_SALE_VALUE, TOUR_MONTH};

/// Label used for null categories.
pub const NULL_LABEL: &str = "(null)";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub total_count: usize,
    pub total_revenue: f64,
    /// None when there are no rows.
    pub average_value: Option<f64>,
}

pub fn summarize(df: &DataFrame) -> Result<Summary> {
    let out = df
        .clone()
        .lazy()
        .select([
            col(TOTAL_SALE_VALUE).sum().alias("revenue"),
            col(TOTAL_SALE_VALUE).mean().alias("average"),
        ])
        .collect()?;

    Ok(Summary {
        total_count: df.height(),
        total_revenue: out.column("revenue")?.f64()?.get(0).unwrap_or(0.0),
        average_value: out
            .column("average")?
            .f64()?
            .get(0)
            .filter(|v| v.is_finite()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
    pub revenue: f64,
    pub mean: f64,
}

/// Per-month buckets, ascending by month, one bucket per month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub months: Vec<MonthBucket>,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonthBucket> {
        self.months.iter()
    }
}

/// Group by `TOUR_MONTH`. Rows without a month are left out.
pub fn by_month(df: &DataFrame) -> Result<AggregateResult> {
    let grouped = df
        .clone()
        .lazy()
        .filter(col(TOUR_MONTH).is_not_null())
        .group_by([col(TOUR_MONTH)])
        .agg([
            len().alias("count"),
            col(TOTAL_SALE_VALUE).sum().alias("revenue"),
            col(TOTAL_SALE_VALUE).mean().alias("mean"),
        ])
        .sort([TOUR_MONTH], SortMultipleOptions::default())
        .collect()?;

    let months = grouped.column(TOUR_MONTH)?.str()?;
    let counts = grouped.column("count")?.cast(&DataType::UInt64)?;
    let counts = counts.u64()?;
    let revenue = grouped.column("revenue")?.f64()?;
    let mean = grouped.column("mean")?.f64()?;

    let buckets = (0..grouped.height())
        .filter_map(|i| {
            Some(MonthBucket {
                month: months.get(i)?.to_string(),
                count: counts.get(i).unwrap_or(0) as usize,
                revenue: revenue.get(i).unwrap_or(0.0),
                mean: mean.get(i).unwrap_or(0.0),
            })
        })
        .collect();
    Ok(AggregateResult { months: buckets })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

/// Rows per distinct value of `column`, most frequent first.
pub fn category_counts(df: &DataFrame, column: &str) -> Result<Vec<CategoryCount>> {
    let values = df.column(column)?.cast(&DataType::String)?;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.str()?.into_iter() {
        *counts.entry(value.unwrap_or(NULL_LABEL)).or_default() += 1;
    }

    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: label.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    Ok(out)
}

/// (land, air) points of one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSeries {
    pub zone: String,
    pub points: Vec<(f64, f64)>,
}

/// Land vs air sale values grouped by zone, zones ascending. Rows missing either value are
/// skipped; at most `row_limit` rows are read.
pub fn land_vs_air(
    df: &DataFrame,
    columns: &BookingColumns,
    row_limit: Option<usize>,
) -> Result<Vec<ZoneSeries>> {
    let mut lf = df
        .clone()
        .lazy()
        .select([
            col(columns.zone.as_str()).cast(DataType::String).alias("zone"),
            col(columns.land_sale_value.as_str())
                .cast(DataType::Float64)
                .alias("land"),
            col(columns.air_sale_value.as_str())
                .cast(DataType::Float64)
                .alias("air"),
        ])
        .filter(col("land").is_not_null().and(col("air").is_not_null()));
    if let Some(limit) = row_limit {
        lf = lf.slice(0, limit.min(u32::MAX as usize) as u32);
    }
    let points = lf.collect()?;

    let zones = points.column("zone")?.str()?;
    let land = points.column("land")?.f64()?;
    let air = points.column("air")?.f64()?;

    let mut by_zone: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    for i in 0..points.height() {
        let (Some(x), Some(y)) = (land.get(i), air.get(i)) else {
            continue;
        };
        if x.is_finite() && y.is_finite() {
            let zone = zones.get(i).unwrap_or(NULL_LABEL).to_string();
            by_zone.entry(zone).or_default().push((x, y));
        }
    }

    Ok(by_zone
        .into_iter()
        .map(|(zone, points)| ZoneSeries { zone, points })
        .collect())
}

/// Revenue per (zone, branch). `cells[row][col]` is branch `y_labels[row]` in zone
/// `x_labels[col]`; combinations without rows are 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeatmapGrid {
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl HeatmapGrid {
    pub fn is_empty(&self) -> bool {
        self.x_labels.is_empty() || self.y_labels.is_empty()
    }

    pub fn max(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .copied()
            .fold(0.0_f64, f64::max)
    }
}

pub fn zone_branch_heatmap(df: &DataFrame, columns: &BookingColumns) -> Result<HeatmapGrid> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([
            col(columns.zone.as_str()).cast(DataType::String).alias("zone"),
            col(columns.branch.as_str())
                .cast(DataType::String)
                .alias("branch"),
        ])
        .agg([col(TOTAL_SALE_VALUE).sum().alias("revenue")])
        .collect()?;

    let zones = grouped.column("zone")?.str()?;
    let branches = grouped.column("branch")?.str()?;
    let revenue = grouped.column("revenue")?.f64()?;

    let mut sums: HashMap<(&str, &str), f64> = HashMap::new();
    let mut x_set = BTreeSet::new();
    let mut y_set = BTreeSet::new();
    for i in 0..grouped.height() {
        let zone = zones.get(i).unwrap_or(NULL_LABEL);
        let branch = branches.get(i).unwrap_or(NULL_LABEL);
        x_set.insert(zone);
        y_set.insert(branch);
        *sums.entry((zone, branch)).or_default() += revenue.get(i).unwrap_or(0.0);
    }

    let cells = y_set
        .iter()
        .map(|branch| {
            x_set
                .iter()
                .map(|zone| sums.get(&(*zone, *branch)).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    Ok(HeatmapGrid {
        x_labels: x_set.into_iter().map(str::to_string).collect(),
        y_labels: y_set.into_iter().map(str::to_string).collect(),
        cells,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyRevenue {
    /// Days since 1970-01-01.
    pub day: i32,
    pub revenue: f64,
}

/// Revenue per tour start date, ascending. Rows without a date are left out.
pub fn by_start_date(df: &DataFrame, columns: &BookingColumns) -> Result<Vec<DailyRevenue>> {
    let date = columns.tour_start_date.as_str();
    let grouped = df
        .clone()
        .lazy()
        .filter(col(date).is_not_null())
        .group_by([col(date).cast(DataType::Int32).alias("day")])
        .agg([col(TOTAL_SALE_VALUE).sum().alias("revenue")])
        .sort(["day"], SortMultipleOptions::default())
        .collect()?;

    let days = grouped.column("day")?.i32()?;
    let revenue = grouped.column("revenue")?.f64()?;
    Ok((0..grouped.height())
        .filter_map(|i| {
            Some(DailyRevenue {
                day: days.get(i)?,
                revenue: revenue.get(i).unwrap_or(0.0),
            })
        })
        .collect())
}
