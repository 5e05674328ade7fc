//! Projection of aggregates into display-ready pieces: chart specs, summary cards, row
//! pages and the CSV export. Nothing here mutates the data it is given.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::aggregate::{
    AggregateResult, CategoryCount, DailyRevenue, HeatmapGrid, Summary, ZoneSeries,
};
use crate::prepare::{TOTAL_SALE_VALUE, TOUR_MONTH};

/// Charts the dashboard can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    MonthlyTrend,
    RevenueByMonth,
    AstraDistribution,
    LandVsAir,
    ZoneBranchHeatmap,
    DailyTrend,
}

impl ChartId {
    pub const ALL: [Self; 6] = [
        Self::MonthlyTrend,
        Self::RevenueByMonth,
        Self::AstraDistribution,
        Self::LandVsAir,
        Self::ZoneBranchHeatmap,
        Self::DailyTrend,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MonthlyTrend => "monthly_trend",
            Self::RevenueByMonth => "revenue_by_month",
            Self::AstraDistribution => "astra_distribution",
            Self::LandVsAir => "land_vs_air",
            Self::ZoneBranchHeatmap => "zone_branch_heatmap",
            Self::DailyTrend => "daily_trend",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::MonthlyTrend => "Monthly Booking Trends",
            Self::RevenueByMonth => "Revenue by Month",
            Self::AstraDistribution => "ASTRA Booking Distribution",
            Self::LandVsAir => "Land vs Air Sales",
            Self::ZoneBranchHeatmap => "Revenue Heatmap (Zone vs Branch)",
            Self::DailyTrend => "Booking Trends Over Time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Scatter,
    Heatmap,
}

/// How x values of point series should be labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum XAxisKind {
    Numeric,
    /// x = days since Unix epoch
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Categories {
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Points {
        x_axis: XAxisKind,
        series: Vec<PointSeries>,
    },
    Grid(HeatmapGrid),
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Categories { values, .. } => values.is_empty(),
            Self::Points { series, .. } => series.iter().all(|s| s.points.is_empty()),
            Self::Grid(grid) => grid.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub id: ChartId,
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

impl ChartSpec {
    fn new(id: ChartId, kind: ChartKind, x_label: &str, y_label: &str, data: ChartData) -> Self {
        Self {
            id,
            kind,
            title: id.title().to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            data,
        }
    }

    /// True when there is nothing to draw; the chart shows "No data".
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn month_categories(agg: &AggregateResult) -> ChartData {
    ChartData::Categories {
        labels: agg.iter().map(|b| b.month.clone()).collect(),
        values: agg.iter().map(|b| b.revenue).collect(),
    }
}

pub fn monthly_trend(agg: &AggregateResult) -> ChartSpec {
    ChartSpec::new(
        ChartId::MonthlyTrend,
        ChartKind::Line,
        TOUR_MONTH,
        TOTAL_SALE_VALUE,
        month_categories(agg),
    )
}

pub fn revenue_by_month(agg: &AggregateResult) -> ChartSpec {
    ChartSpec::new(
        ChartId::RevenueByMonth,
        ChartKind::Bar,
        TOUR_MONTH,
        TOTAL_SALE_VALUE,
        month_categories(agg),
    )
}

pub fn astra_distribution(counts: &[CategoryCount]) -> ChartSpec {
    ChartSpec::new(
        ChartId::AstraDistribution,
        ChartKind::Pie,
        "ASTRA BOOKING",
        "Bookings",
        ChartData::Categories {
            labels: counts.iter().map(|c| c.label.clone()).collect(),
            values: counts.iter().map(|c| c.count as f64).collect(),
        },
    )
}

pub fn land_vs_air(series: &[ZoneSeries]) -> ChartSpec {
    ChartSpec::new(
        ChartId::LandVsAir,
        ChartKind::Scatter,
        "LAND_SALE_VALUE",
        "AIR_SALE_VALUE",
        ChartData::Points {
            x_axis: XAxisKind::Numeric,
            series: series
                .iter()
                .map(|s| PointSeries {
                    name: s.zone.clone(),
                    points: s.points.clone(),
                })
                .collect(),
        },
    )
}

pub fn zone_branch_heatmap(grid: &HeatmapGrid) -> ChartSpec {
    ChartSpec::new(
        ChartId::ZoneBranchHeatmap,
        ChartKind::Heatmap,
        "ZONE",
        "BRANCH",
        ChartData::Grid(grid.clone()),
    )
}

pub fn daily_trend(days: &[DailyRevenue]) -> ChartSpec {
    let points: Vec<(f64, f64)> = days.iter().map(|d| (d.day as f64, d.revenue)).collect();
    let series = if points.is_empty() {
        Vec::new()
    } else {
        vec![PointSeries {
            name: TOTAL_SALE_VALUE.to_string(),
            points,
        }]
    };
    ChartSpec::new(
        ChartId::DailyTrend,
        ChartKind::Line,
        "TOUR_START_DATE",
        TOTAL_SALE_VALUE,
        ChartData::Points {
            x_axis: XAxisKind::Date,
            series,
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryCard {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryCards {
    pub cards: Vec<SummaryCard>,
}

impl SummaryCards {
    pub fn from_summary(summary: &Summary, currency: &str) -> Self {
        let with_currency = |label: &str| {
            if currency.is_empty() {
                label.to_string()
            } else {
                format!("{} ({})", label, currency)
            }
        };
        Self {
            cards: vec![
                SummaryCard {
                    label: "Total Bookings".to_string(),
                    value: format_count(summary.total_count),
                },
                SummaryCard {
                    label: with_currency("Total Revenue"),
                    value: format_amount(summary.total_revenue),
                },
                SummaryCard {
                    label: with_currency("Average Sale Value"),
                    value: format_average(summary.average_value),
                },
            ],
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `1234567` -> `1,234,567`
pub fn format_count(n: usize) -> String {
    group_thousands(&n.to_string())
}

/// Two decimals with thousands separators: `1234.5` -> `1,234.50`
pub fn format_amount(v: f64) -> String {
    if !v.is_finite() {
        return "N/A".to_string();
    }
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if v < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, group_thousands(int_part), frac)
}

pub fn format_average(v: Option<f64>) -> String {
    v.map(format_amount).unwrap_or_else(|| "N/A".to_string())
}

/// Compact numeric axis label.
pub fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Axis label for x values: dates when `kind` is [`XAxisKind::Date`].
pub fn format_x_axis_label(v: f64, kind: XAxisKind) -> String {
    use chrono::NaiveDate;

    match kind {
        XAxisKind::Numeric => format_axis_label(v),
        XAxisKind::Date => {
            const UNIX_EPOCH_CE_DAYS: i32 = 719_163;
            let days = v.trunc() as i32;
            match NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_CE_DAYS.saturating_add(days)) {
                Some(d) => d.format("%Y-%m-%d").to_string(),
                None => format_axis_label(v),
            }
        }
    }
}

/// One page of raw rows, cells rendered as strings (nulls empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowPage {
    /// 0-based, clamped into range.
    pub page: usize,
    /// At least 1.
    pub page_count: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowPage {
    /// 1-based index of the first row on this page (0 when there are no rows).
    pub fn first_row(&self) -> usize {
        if self.total_rows == 0 {
            0
        } else {
            self.page * self.page_size + 1
        }
    }

    pub fn last_row(&self) -> usize {
        (self.page * self.page_size + self.rows.len()).min(self.total_rows)
    }
}

pub fn page_rows(df: &DataFrame, page: usize, page_size: usize) -> Result<RowPage> {
    let page_size = page_size.max(1);
    let total_rows = df.height();
    let page_count = total_rows.div_ceil(page_size).max(1);
    let page = page.min(page_count - 1);

    let slice = df.slice((page * page_size) as i64, page_size);
    let headers = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows = Vec::with_capacity(slice.height());
    for i in 0..slice.height() {
        let row = slice
            .get_columns()
            .iter()
            .map(|column| column.get(i).map(|v| cell_text(&v)))
            .collect::<PolarsResult<Vec<String>>>()?;
        rows.push(row);
    }

    Ok(RowPage {
        page,
        page_count,
        page_size,
        total_rows,
        headers,
        rows,
    })
}

fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Float64(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.1}", f),
        other => other.to_string(),
    }
}

/// Filter description for the view header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveFilter {
    pub column: String,
    pub value: String,
}

/// Everything the dashboard shows for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub filters: Vec<ActiveFilter>,
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub summary: Summary,
    pub cards: SummaryCards,
    pub months: AggregateResult,
    pub charts: Vec<ChartSpec>,
    pub page: RowPage,
}

impl DashboardView {
    pub fn chart(&self, id: ChartId) -> Option<&ChartSpec> {
        self.charts.iter().find(|c| c.id == id)
    }
}

/// Comma-separated rendering of `df` with a header row.
pub fn export_csv(df: &DataFrame) -> Result<String> {
    let mut df = df.clone();
    let mut buf: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df)?;
    String::from_utf8(buf).map_err(|e| eyre!("CSV export is not valid UTF-8: {}", e))
}

/// Write `df` as CSV to `path`. Returns the number of rows written.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<usize> {
    let mut df = df.clone();
    let file = File::create(path)
        .map_err(|e| eyre!("Cannot create {}: {}", path.display(), e))?;
    CsvWriter::new(file).include_header(true).finish(&mut df)?;
    info!(path = %path.display(), rows = df.height(), "exported filtered rows");
    Ok(df.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::MonthBucket;

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_amount(150.0), "150.00");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(-1234567.891), "-1,234,567.89");
        assert_eq!(format_average(None), "N/A");
        assert_eq!(format_average(Some(150.0)), "150.00");
    }

    #[test]
    fn test_summary_cards_labels() {
        let summary = Summary {
            total_count: 1,
            total_revenue: 150.0,
            average_value: Some(150.0),
        };
        let cards = SummaryCards::from_summary(&summary, "INR");
        let labels: Vec<&str> = cards.cards.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Total Bookings",
                "Total Revenue (INR)",
                "Average Sale Value (INR)"
            ]
        );
        assert_eq!(cards.cards[0].value, "1");

        let empty = Summary {
            total_count: 0,
            total_revenue: 0.0,
            average_value: None,
        };
        let cards = SummaryCards::from_summary(&empty, "");
        assert_eq!(cards.cards[2].label, "Average Sale Value");
        assert_eq!(cards.cards[2].value, "N/A");
    }

    #[test]
    fn test_month_charts_share_data() {
        let agg = AggregateResult {
            months: vec![MonthBucket {
                month: "2024-01".to_string(),
                count: 1,
                revenue: 150.0,
                mean: 150.0,
            }],
        };
        let line = monthly_trend(&agg);
        let bar = revenue_by_month(&agg);
        assert_eq!(line.kind, ChartKind::Line);
        assert_eq!(bar.kind, ChartKind::Bar);
        assert_eq!(line.data, bar.data);
        assert!(!line.is_empty());
        assert!(monthly_trend(&AggregateResult::default()).is_empty());
        assert!(daily_trend(&[]).is_empty());
    }

    #[test]
    fn test_page_rows_clamps_and_stringifies() {
        let df = df!(
            "ZONE" => &["A", "B", "C"],
            "VALUE" => &[Some(1.5), None, Some(3.0)]
        )
        .unwrap();
        let page = page_rows(&df, 7, 2).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.rows, vec![vec!["C".to_string(), "3.0".to_string()]]);
        assert_eq!((page.first_row(), page.last_row()), (3, 3));

        let first = page_rows(&df, 0, 2).unwrap();
        assert_eq!(first.rows[1], vec!["B".to_string(), String::new()]);

        let empty = page_rows(&df.clear(), 3, 10).unwrap();
        assert_eq!((empty.page, empty.page_count), (0, 1));
        assert!(empty.rows.is_empty());
        assert_eq!(empty.headers, vec!["ZONE".to_string(), "VALUE".to_string()]);
    }

    #[test]
    fn test_export_csv_has_header() {
        let df = df!("ZONE" => &["North"], "TOTAL_SALE_VALUE" => &[150.0]).unwrap();
        let csv = export_csv(&df).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("ZONE,TOTAL_SALE_VALUE"));
        assert_eq!(lines.next(), Some("North,150.0"));
    }

    #[test]
    fn test_date_axis_labels() {
        assert_eq!(format_x_axis_label(19737.0, XAxisKind::Date), "2024-01-15");
        assert_eq!(format_x_axis_label(2.5, XAxisKind::Numeric), "2.50");
    }
}
