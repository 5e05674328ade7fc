//! Turns a raw booking frame into a [`BookingTable`]: canonical column names resolved,
//! start date normalized to `Date`, and the derived `TOUR_MONTH` / `TOTAL_SALE_VALUE` columns
//! added. Source columns are kept as-is.

use color_eyre::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ColumnAliases;

/// Derived month column, `YYYY-MM` strings.
pub const TOUR_MONTH: &str = "TOUR_MONTH";
/// Derived `land + air` column with nulls counted as zero.
pub const TOTAL_SALE_VALUE: &str = "TOTAL_SALE_VALUE";

const MONTH_FORMAT: &str = "%Y-%m";

/// What to do with rows whose land or air sale value is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullSalesPolicy {
    /// Count the missing value as zero and keep the row.
    #[default]
    Coalesce,
    /// Remove the row before anything is computed.
    Drop,
}

impl From<bookdash_cli::NullSales> for NullSalesPolicy {
    fn from(value: bookdash_cli::NullSales) -> Self {
        match value {
            bookdash_cli::NullSales::Coalesce => Self::Coalesce,
            bookdash_cli::NullSales::Drop => Self::Drop,
        }
    }
}

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("required column {role} not found (tried: {tried})")]
    MissingColumn { role: &'static str, tried: String },
}

/// Source column names the dashboard reads, after alias resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingColumns {
    pub zone: String,
    pub branch: String,
    pub tour_start_date: String,
    pub land_sale_value: String,
    pub air_sale_value: String,
    pub astra_booking: Option<String>,
}

impl BookingColumns {
    pub fn resolve(schema: &Schema, aliases: &ColumnAliases) -> Result<Self, PrepareError> {
        let required = |role: &'static str, candidates: &[String]| {
            resolve_column(schema, candidates).ok_or_else(|| PrepareError::MissingColumn {
                role,
                tried: candidates.join(", "),
            })
        };

        Ok(Self {
            zone: required("ZONE", &aliases.zone)?,
            branch: required("BRANCH", &aliases.branch)?,
            tour_start_date: required("TOUR_START_DATE", &aliases.tour_start_date)?,
            land_sale_value: required("LAND_SALE_VALUE", &aliases.land_sale_value)?,
            air_sale_value: required("AIR_SALE_VALUE", &aliases.air_sale_value)?,
            astra_booking: resolve_column(schema, &aliases.astra_booking),
        })
    }
}

/// First exact match wins, then the first case-insensitive (trimmed) match.
fn resolve_column(schema: &Schema, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find(|c| schema.contains(c.as_str()))
        .cloned()
        .or_else(|| {
            candidates.iter().find_map(|c| {
                let wanted = c.trim().to_lowercase();
                schema
                    .iter_names()
                    .find(|name| name.trim().to_lowercase() == wanted)
                    .map(|name| name.to_string())
            })
        })
}

/// The prepared dataset. Immutable once built.
#[derive(Debug, Clone)]
pub struct BookingTable {
    df: DataFrame,
    columns: BookingColumns,
    null_policy: NullSalesPolicy,
    dropped_rows: usize,
}

impl BookingTable {
    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn columns(&self) -> &BookingColumns {
        &self.columns
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn null_policy(&self) -> NullSalesPolicy {
        self.null_policy
    }

    /// Rows removed by [`NullSalesPolicy::Drop`].
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }
}

/// Layouts tried for text start dates, in order. The first one that parses wins.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
];

/// Text to `Date` with a fixed layout list. A value matching none of them becomes null;
/// the frame never fails on a bad value.
fn parse_date_text(text: Expr) -> Expr {
    let attempts: Vec<Expr> = DATE_FORMATS
        .iter()
        .map(|format| {
            text.clone().str().to_date(StrptimeOptions {
                format: Some((*format).into()),
                strict: false,
                exact: true,
                cache: true,
            })
        })
        .collect();
    coalesce(&attempts)
}

/// Start-date expression producing a `Date`. Unparseable values become null.
fn start_date_expr(name: &str, dtype: &DataType) -> Expr {
    match dtype {
        DataType::Date => col(name),
        DataType::Datetime(_, _) => col(name).dt().date(),
        DataType::String => parse_date_text(col(name)),
        _ => parse_date_text(col(name).cast(DataType::String)),
    }
    .alias(name)
}

pub fn prepare(
    raw: DataFrame,
    aliases: &ColumnAliases,
    policy: NullSalesPolicy,
) -> Result<BookingTable> {
    let columns = BookingColumns::resolve(raw.schema(), aliases)?;
    debug!(?columns, "resolved booking columns");

    let date_dtype = raw.column(&columns.tour_start_date)?.dtype().clone();
    let raw_height = raw.height();

    let land = col(columns.land_sale_value.as_str()).cast(DataType::Float64);
    let air = col(columns.air_sale_value.as_str()).cast(DataType::Float64);

    let mut lf = raw
        .lazy()
        .with_column(start_date_expr(&columns.tour_start_date, &date_dtype));
    if policy == NullSalesPolicy::Drop {
        lf = lf.filter(land.clone().is_not_null().and(air.clone().is_not_null()));
    }
    let df = lf
        .with_columns([
            (land.fill_null(lit(0.0)) + air.fill_null(lit(0.0))).alias(TOTAL_SALE_VALUE),
            col(columns.tour_start_date.as_str())
                .dt()
                .to_string(MONTH_FORMAT)
                .alias(TOUR_MONTH),
        ])
        .collect()?;

    let dropped_rows = raw_height - df.height();
    let undated = df.column(TOUR_MONTH)?.null_count();
    if undated > 0 {
        warn!(rows = undated, "rows without a usable tour start date");
    }
    info!(
        rows = df.height(),
        dropped = dropped_rows,
        policy = ?policy,
        "prepared booking table"
    );

    Ok(BookingTable {
        df,
        columns,
        null_policy: policy,
        dropped_rows,
    })
}
