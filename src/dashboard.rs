//! The filter -> aggregate -> present pipeline over one prepared table.

use color_eyre::Result;
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::aggregate::{self, AggregateResult};
use crate::config::{AppConfig, DEFAULT_CHART_ROW_LIMIT, DEFAULT_PAGE_SIZE};
use crate::filter::{self, FilterColumn, FilterSpec};
use crate::prepare::BookingTable;
use crate::present::{self, ActiveFilter, ChartId, ChartSpec, DashboardView, SummaryCards};

/// What a dashboard shows: selection controls, charts and table layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub title: String,
    pub filters: Vec<FilterColumn>,
    pub charts: Vec<ChartId>,
    pub page_size: usize,
    pub currency: String,
    pub chart_row_limit: Option<usize>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: "Booking Dashboard".to_string(),
            filters: FilterColumn::ALL.to_vec(),
            charts: ChartId::ALL.to_vec(),
            page_size: DEFAULT_PAGE_SIZE,
            currency: "INR".to_string(),
            chart_row_limit: Some(DEFAULT_CHART_ROW_LIMIT),
        }
    }
}

impl From<&AppConfig> for DashboardConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            title: config.dashboard.title.clone(),
            filters: config.dashboard.filters.clone(),
            charts: config.dashboard.charts.clone(),
            page_size: config.dashboard.page_size,
            currency: config.dashboard.currency.clone(),
            chart_row_limit: config.chart.row_limit,
        }
    }
}

pub struct Dashboard {
    table: BookingTable,
    config: DashboardConfig,
    options: BTreeMap<FilterColumn, Vec<String>>,
}

impl Dashboard {
    pub fn new(table: BookingTable, config: DashboardConfig) -> Result<Self> {
        let mut options = BTreeMap::new();
        for column in &config.filters {
            options.insert(*column, filter::distinct_values(&table, *column)?);
        }
        Ok(Self {
            table,
            config,
            options,
        })
    }

    pub fn table(&self) -> &BookingTable {
        &self.table
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Selectable values for `column`; empty when the column has no control.
    pub fn options(&self, column: FilterColumn) -> &[String] {
        self.options.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `spec` limited to this dashboard's controls.
    pub fn effective_spec(&self, spec: &FilterSpec) -> FilterSpec {
        spec.restricted_to(&self.config.filters)
    }

    pub fn filtered(&self, spec: &FilterSpec) -> Result<DataFrame> {
        filter::apply(&self.table, &self.effective_spec(spec))
    }

    pub fn view(&self, spec: &FilterSpec, page: usize) -> Result<DashboardView> {
        let spec = self.effective_spec(spec);
        let df = filter::apply(&self.table, &spec)?;
        let summary = aggregate::summarize(&df)?;
        let months = aggregate::by_month(&df)?;

        let charts = self
            .config
            .charts
            .iter()
            .map(|id| self.chart(*id, &df, &months))
            .collect::<Result<Vec<_>>>()?;

        let view = DashboardView {
            title: self.config.title.clone(),
            filters: spec
                .active()
                .map(|(column, value)| ActiveFilter {
                    column: column.label().to_string(),
                    value: value.to_string(),
                })
                .collect(),
            total_rows: self.table.height(),
            filtered_rows: df.height(),
            cards: SummaryCards::from_summary(&summary, &self.config.currency),
            summary,
            months,
            charts,
            page: present::page_rows(&df, page, self.config.page_size)?,
        };
        debug!(
            rows = view.filtered_rows,
            page = view.page.page,
            charts = view.charts.len(),
            "dashboard view built"
        );
        Ok(view)
    }

    /// Build one chart from an already filtered frame.
    pub fn chart(
        &self,
        id: ChartId,
        df: &DataFrame,
        months: &AggregateResult,
    ) -> Result<ChartSpec> {
        let columns = self.table.columns();
        Ok(match id {
            ChartId::MonthlyTrend => present::monthly_trend(months),
            ChartId::RevenueByMonth => present::revenue_by_month(months),
            ChartId::AstraDistribution => match &columns.astra_booking {
                Some(name) => present::astra_distribution(&aggregate::category_counts(df, name)?),
                None => present::astra_distribution(&[]),
            },
            ChartId::LandVsAir => present::land_vs_air(&aggregate::land_vs_air(
                df,
                columns,
                self.config.chart_row_limit,
            )?),
            ChartId::ZoneBranchHeatmap => {
                present::zone_branch_heatmap(&aggregate::zone_branch_heatmap(df, columns)?)
            }
            ChartId::DailyTrend => {
                present::daily_trend(&aggregate::by_start_date(df, columns)?)
            }
        })
    }

    /// Write the rows matching `spec` as CSV. Returns the row count.
    pub fn export_csv(&self, spec: &FilterSpec, path: &Path) -> Result<usize> {
        present::write_csv(&self.filtered(spec)?, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnAliases;
    use crate::prepare::{prepare, NullSalesPolicy};
    use polars::prelude::*;

    fn dashboard(config: DashboardConfig) -> Dashboard {
        let df = df!(
            "ZONE" => &["North", "South"],
            "BRANCH" => &["Delhi", "Chennai"],
            "TOUR_START_DATE" => &["2024-01-10", "2024-02-12"],
            "LAND_SALE_VALUE" => &[50.0, 0.0],
            "AIR_SALE_VALUE" => &[100.0, 200.0]
        )
        .unwrap();
        let table = prepare(df, &ColumnAliases::default(), NullSalesPolicy::Coalesce).unwrap();
        Dashboard::new(table, config).unwrap()
    }

    #[test]
    fn test_view_for_zone_filter() {
        let dash = dashboard(DashboardConfig::default());
        let spec = FilterSpec::new().with(FilterColumn::Zone, "North");
        let view = dash.view(&spec, 0).unwrap();
        assert_eq!(view.total_rows, 2);
        assert_eq!(view.filtered_rows, 1);
        assert_eq!(view.summary.total_revenue, 150.0);
        assert_eq!(view.summary.average_value, Some(150.0));
        assert_eq!(view.charts.len(), ChartId::ALL.len());
        assert!(view.chart(ChartId::AstraDistribution).unwrap().is_empty());
        assert!(!view.chart(ChartId::MonthlyTrend).unwrap().is_empty());
        assert_eq!(view.filters[0].column, "Zone");
    }

    #[test]
    fn test_options_follow_configured_filters() {
        let config = DashboardConfig {
            filters: vec![FilterColumn::Month],
            charts: vec![ChartId::RevenueByMonth],
            ..DashboardConfig::default()
        };
        let dash = dashboard(config);
        assert!(dash.options(FilterColumn::Zone).is_empty());
        assert_eq!(dash.options(FilterColumn::Month), ["2024-01", "2024-02"]);

        let spec = FilterSpec::new().with(FilterColumn::Zone, "North");
        let view = dash.view(&spec, 0).unwrap();
        assert_eq!(view.filtered_rows, 2);
        assert_eq!(view.charts.len(), 1);
    }

    #[test]
    fn test_no_match_renders_empty_view() {
        let dash = dashboard(DashboardConfig::default());
        let spec = FilterSpec::new().with(FilterColumn::Branch, "Nowhere");
        let view = dash.view(&spec, 4).unwrap();
        assert_eq!(view.filtered_rows, 0);
        assert_eq!(view.summary.average_value, None);
        assert_eq!(view.cards.cards[2].value, "N/A");
        assert!(view.charts.iter().all(|c| c.is_empty()));
        assert_eq!(view.page.page, 0);
    }
}
