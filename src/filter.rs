//! Equality filters over the prepared booking table.

use color_eyre::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::prepare::{BookingColumns, BookingTable, TOUR_MONTH};

/// Columns a selection control can constrain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterColumn {
    Zone,
    Branch,
    Month,
}

impl FilterColumn {
    pub const ALL: [Self; 3] = [Self::Zone, Self::Branch, Self::Month];

    pub fn label(self) -> &'static str {
        match self {
            Self::Zone => "Zone",
            Self::Branch => "Branch",
            Self::Month => "Month",
        }
    }

    /// Name of the table column this filter compares against.
    pub fn column_name(self, columns: &BookingColumns) -> &str {
        match self {
            Self::Zone => &columns.zone,
            Self::Branch => &columns.branch,
            Self::Month => TOUR_MONTH,
        }
    }
}

/// Selected value per filter column. A missing or empty value places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    selections: BTreeMap<FilterColumn, String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: FilterColumn, value: impl Into<String>) -> Self {
        self.set(column, Some(value.into()));
        self
    }

    pub fn set(&mut self, column: FilterColumn, value: Option<String>) {
        match value {
            Some(v) if !v.is_empty() => {
                self.selections.insert(column, v);
            }
            _ => {
                self.selections.remove(&column);
            }
        }
    }

    pub fn clear(&mut self, column: FilterColumn) {
        self.selections.remove(&column);
    }

    pub fn get(&self, column: FilterColumn) -> Option<&str> {
        self.selections.get(&column).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Constrained columns in column order.
    pub fn active(&self) -> impl Iterator<Item = (FilterColumn, &str)> {
        self.selections.iter().map(|(c, v)| (*c, v.as_str()))
    }

    /// Keep only the given columns.
    pub fn restricted_to(&self, columns: &[FilterColumn]) -> Self {
        Self {
            selections: self
                .selections
                .iter()
                .filter(|(c, _)| columns.contains(c))
                .map(|(c, v)| (*c, v.clone()))
                .collect(),
        }
    }
}

/// Conjunction of the constraints in `spec`, compared on the string rendering of each column.
pub fn filter_expr(columns: &BookingColumns, spec: &FilterSpec) -> Option<Expr> {
    spec.active()
        .map(|(column, value)| {
            col(column.column_name(columns))
                .cast(DataType::String)
                .eq(lit(value.to_string()))
        })
        .reduce(|acc, e| acc.and(e))
}

/// Rows of `table` matching every constraint in `spec`.
pub fn apply(table: &BookingTable, spec: &FilterSpec) -> Result<DataFrame> {
    let Some(predicate) = filter_expr(table.columns(), spec) else {
        return Ok(table.df().clone());
    };
    let df = table.df().clone().lazy().filter(predicate).collect()?;
    debug!(
        filters = ?spec,
        rows = df.height(),
        of = table.height(),
        "applied filters"
    );
    Ok(df)
}

/// Distinct non-null values of `column`, ascending.
pub fn distinct_values(table: &BookingTable, column: FilterColumn) -> Result<Vec<String>> {
    let name = column.column_name(table.columns());
    let values = table.df().column(name)?.cast(&DataType::String)?;
    let distinct: BTreeSet<&str> = values.str()?.into_iter().flatten().collect();
    Ok(distinct.into_iter().map(str::to_string).collect())
}
