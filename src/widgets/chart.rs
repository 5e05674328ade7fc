//! Chart pane: draws one [`ChartSpec`] with ratatui's Chart, BarChart and Table widgets.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType,
        LegendPosition, Paragraph, Row, Table, Widget,
    },
};

use crate::aggregate::HeatmapGrid;
use crate::config::Theme;
use crate::present::{
    format_axis_label, format_x_axis_label, ChartData, ChartKind, ChartSpec, PointSeries,
    XAxisKind,
};

/// Shown instead of a chart when the filtered table has nothing to plot.
pub const NO_DATA: &str = "No data";

const HEAT_SHADES: [&str; 5] = ["·", "░", "▒", "▓", "█"];

pub struct ChartPanel<'a> {
    spec: Option<&'a ChartSpec>,
    /// (index, count) of the visible chart, shown in the title.
    position: (usize, usize),
    theme: &'a Theme,
}

impl<'a> ChartPanel<'a> {
    pub fn new(spec: Option<&'a ChartSpec>, position: (usize, usize), theme: &'a Theme) -> Self {
        Self {
            spec,
            position,
            theme,
        }
    }
}

impl Widget for &ChartPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = match self.spec {
            Some(spec) => format!(
                " {} ({}/{}) ",
                spec.title,
                self.position.0 + 1,
                self.position.1
            ),
            None => " Charts ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.get("card_border")))
            .title(Span::styled(
                title,
                Style::default().fg(self.theme.get("title")),
            ));
        let inner = block.inner(area);
        block.render(area, buf);

        let spec = match self.spec {
            Some(spec) if !spec.is_empty() => spec,
            _ => {
                Paragraph::new(NO_DATA)
                    .style(Style::default().fg(self.theme.get("dimmed")))
                    .centered()
                    .render(inner, buf);
                return;
            }
        };

        match &spec.data {
            ChartData::Categories { labels, values } if spec.kind == ChartKind::Line => {
                render_category_line(spec, labels, values, self.theme, inner, buf)
            }
            ChartData::Categories { labels, values } => {
                render_bars(spec, labels, values, self.theme, inner, buf)
            }
            ChartData::Points { x_axis, series } => {
                render_points(spec, *x_axis, series, self.theme, inner, buf)
            }
            ChartData::Grid(grid) => render_heatmap(grid, self.theme, inner, buf),
        }
    }
}

/// Min and max of `values`, widened so the range is never empty.
fn bounds(values: impl Iterator<Item = f64>, include_zero: bool) -> [f64; 2] {
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), v| {
        (a.min(v), b.max(v))
    });
    if include_zero {
        lo = lo.min(0.0);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return [0.0, 1.0];
    }
    if hi <= lo {
        lo -= 0.5;
        hi += 0.5;
    }
    [lo, hi]
}

fn axis_labels(
    [lo, hi]: [f64; 2],
    style: Style,
    format: impl Fn(f64) -> String,
) -> Vec<Span<'static>> {
    vec![
        Span::styled(format(lo), style),
        Span::styled(format((lo + hi) / 2.0), style),
        Span::styled(format(hi), style),
    ]
}

fn render_category_line(
    spec: &ChartSpec,
    labels: &[String],
    values: &[f64],
    theme: &Theme,
    area: Rect,
    buf: &mut Buffer,
) {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v))
        .collect();
    let x_bounds = bounds(points.iter().map(|p| p.0), false);
    let y_bounds = bounds(values.iter().copied(), true);

    let label_style = Style::default().fg(theme.get("keybind_labels"));
    let label_at = |v: f64| {
        let idx = v.round();
        if idx >= 0.0 && (idx as usize) < labels.len() {
            labels[idx as usize].clone()
        } else {
            String::new()
        }
    };

    let dataset = Dataset::default()
        .name(spec.y_label.as_str())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(theme.series_colors()[0]))
        .data(&points);

    Chart::new(vec![dataset])
        .x_axis(
            Axis::default()
                .title(spec.x_label.as_str())
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds, label_style, label_at)),
        )
        .y_axis(
            Axis::default()
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds, label_style, format_axis_label)),
        )
        .legend_position(None)
        .render(area, buf);
}

/// Bar and pie charts; a pie is drawn as bars labelled with their share.
fn render_bars(
    spec: &ChartSpec,
    labels: &[String],
    values: &[f64],
    theme: &Theme,
    area: Rect,
    buf: &mut Buffer,
) {
    let colors = theme.series_colors();
    let total: f64 = values.iter().sum();
    let n = values.len().max(1) as u16;
    let bar_width = (area.width / n).saturating_sub(1).clamp(1, 12);

    let bars: Vec<Bar> = labels
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (label, &value))| {
            let (color, text) = if spec.kind == ChartKind::Pie {
                let share = if total > 0.0 {
                    value / total * 100.0
                } else {
                    0.0
                };
                (colors[i % colors.len()], format!("{:.1}%", share))
            } else {
                (colors[0], format_axis_label(value))
            };
            Bar::default()
                .value(value.max(0.0).round() as u64)
                .label(Line::from(label.clone()))
                .text_value(text)
                .style(Style::default().fg(color))
        })
        .collect();

    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .render(area, buf);
}

fn render_points(
    spec: &ChartSpec,
    x_axis: XAxisKind,
    series: &[PointSeries],
    theme: &Theme,
    area: Rect,
    buf: &mut Buffer,
) {
    let colors = theme.series_colors();
    let (graph_type, marker) = match spec.kind {
        ChartKind::Line => (GraphType::Line, symbols::Marker::Braille),
        _ => (GraphType::Scatter, symbols::Marker::Dot),
    };

    let all = || series.iter().flat_map(|s| s.points.iter());
    let x_bounds = bounds(all().map(|p| p.0), false);
    let y_bounds = bounds(all().map(|p| p.1), true);

    let datasets: Vec<Dataset> = series
        .iter()
        .filter(|s| !s.points.is_empty())
        .enumerate()
        .map(|(i, s)| {
            Dataset::default()
                .name(s.name.as_str())
                .marker(marker)
                .graph_type(graph_type)
                .style(Style::default().fg(colors[i % colors.len()]))
                .data(&s.points)
        })
        .collect();

    let label_style = Style::default().fg(theme.get("keybind_labels"));
    let legend = if series.len() > 1 {
        Some(LegendPosition::TopRight)
    } else {
        None
    };
    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title(spec.x_label.as_str())
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds, label_style, |v| {
                    format_x_axis_label(v, x_axis)
                })),
        )
        .y_axis(
            Axis::default()
                .title(spec.y_label.as_str())
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds, label_style, format_axis_label)),
        )
        .legend_position(legend)
        .render(area, buf);
}

/// Shade for `value` relative to the grid maximum.
fn heat_shade(value: f64, max: f64) -> &'static str {
    if max <= 0.0 || value <= 0.0 {
        return HEAT_SHADES[0];
    }
    let steps = (HEAT_SHADES.len() - 1) as f64;
    let idx = ((value / max).clamp(0.0, 1.0) * steps).ceil() as usize;
    HEAT_SHADES[idx.clamp(1, HEAT_SHADES.len() - 1)]
}

/// Branches as rows, zones as columns, each cell a shade plus the value.
fn render_heatmap(grid: &HeatmapGrid, theme: &Theme, area: Rect, buf: &mut Buffer) {
    let max = grid.max();
    let color = theme.series_colors()[0];
    let header_style = Style::default()
        .fg(theme.get("table_header"))
        .bg(theme.get("table_header_bg"));

    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(grid.x_labels.iter().map(|z| Cell::from(z.as_str()))),
    )
    .style(header_style);

    let rows = grid.y_labels.iter().zip(&grid.cells).map(|(branch, values)| {
        Row::new(
            std::iter::once(Cell::from(branch.as_str())).chain(values.iter().map(|&v| {
                Cell::from(Line::from(vec![
                    Span::styled(heat_shade(v, max), Style::default().fg(color)),
                    Span::raw(format!(" {}", format_axis_label(v))),
                ]))
            })),
        )
    });

    let label_width = grid
        .y_labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(6, 24) as u16;
    let widths = std::iter::once(Constraint::Length(label_width))
        .chain(grid.x_labels.iter().map(|_| Constraint::Fill(1)));

    Table::new(rows, widths)
        .header(header)
        .style(Style::default().fg(Color::Reset))
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregateResult, MonthBucket};
    use crate::present::{monthly_trend, revenue_by_month};

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        (area.y..area.bottom())
            .map(|y| {
                (area.x..area.right())
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_empty_chart_shows_no_data() {
        let theme = Theme::default();
        let spec = monthly_trend(&AggregateResult::default());
        let panel = ChartPanel::new(Some(&spec), (0, 6), &theme);
        let area = Rect::new(0, 0, 50, 8);
        let mut buf = Buffer::empty(area);
        (&panel).render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains(NO_DATA), "got:\n{}", text);
        assert!(text.contains("Monthly Booking Trends (1/6)"), "got:\n{}", text);
    }

    #[test]
    fn test_bar_chart_renders_labels() {
        let theme = Theme::default();
        let agg = AggregateResult {
            months: vec![
                MonthBucket {
                    month: "2024-01".to_string(),
                    count: 1,
                    revenue: 150.0,
                    mean: 150.0,
                },
                MonthBucket {
                    month: "2024-02".to_string(),
                    count: 1,
                    revenue: 200.0,
                    mean: 200.0,
                },
            ],
        };
        let spec = revenue_by_month(&agg);
        let panel = ChartPanel::new(Some(&spec), (1, 6), &theme);
        let area = Rect::new(0, 0, 40, 12);
        let mut buf = Buffer::empty(area);
        (&panel).render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(!text.contains(NO_DATA));
        assert!(text.contains("2024-01"), "got:\n{}", text);
    }

    #[test]
    fn test_heat_shade_scale() {
        assert_eq!(heat_shade(0.0, 10.0), "·");
        assert_eq!(heat_shade(1.0, 10.0), "░");
        assert_eq!(heat_shade(10.0, 10.0), "█");
        assert_eq!(heat_shade(5.0, 0.0), "·");
    }

    #[test]
    fn test_bounds_never_empty() {
        assert_eq!(bounds(std::iter::empty(), false), [0.0, 1.0]);
        assert_eq!(bounds([3.0].into_iter(), false), [2.5, 3.5]);
        assert_eq!(bounds([3.0, 5.0].into_iter(), true), [0.0, 5.0]);
    }
}
