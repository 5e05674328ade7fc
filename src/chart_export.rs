//! Chart export to PNG (plotters bitmap backend).

use color_eyre::eyre::eyre;
use color_eyre::Result;
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

use crate::aggregate::HeatmapGrid;
use crate::present::{
    format_axis_label, format_x_axis_label, ChartData, ChartKind, ChartSpec, PointSeries,
    XAxisKind,
};

const PALETTE: [RGBColor; 7] = [
    RGBColor(0, 178, 230),
    RGBColor(230, 0, 128),
    RGBColor(0, 178, 0),
    RGBColor(230, 204, 0),
    RGBColor(0, 0, 230),
    RGBColor(230, 0, 0),
    RGBColor(128, 230, 230),
];

/// Render `spec` to a PNG file of the given pixel size.
pub fn write_chart_png(path: &Path, spec: &ChartSpec, size: (u32, u32)) -> Result<()> {
    if spec.is_empty() {
        return Err(eyre!("No data to export"));
    }

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&spec.title, ("sans-serif", 24))?;

    match &spec.data {
        ChartData::Categories { labels, values } => {
            draw_categories(&root, spec, labels, values)?
        }
        ChartData::Points { x_axis, series } => draw_points(&root, spec, *x_axis, series)?,
        ChartData::Grid(grid) => draw_heatmap(&root, spec, grid)?,
    }

    root.present()?;
    info!(path = %path.display(), chart = spec.id.as_str(), "exported chart image");
    Ok(())
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, plotters::coord::Shift>;

/// Line over category indices, or one bar per category (bar and pie charts).
fn draw_categories(
    area: &Area,
    spec: &ChartSpec,
    labels: &[String],
    values: &[f64],
) -> Result<()> {
    let n = values.len();
    let y_max = values.iter().copied().fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..y_max)?;

    let label_at = |v: &f64| {
        let idx = v.round();
        if (v - idx).abs() < 1e-6 && idx >= 0.0 && (idx as usize) < n {
            labels[idx as usize].clone()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_labels(n.clamp(1, 24))
        .x_label_formatter(&label_at)
        .y_label_formatter(&|v: &f64| format_axis_label(*v))
        .disable_x_mesh()
        .draw()?;

    match spec.kind {
        ChartKind::Line => {
            let color = PALETTE[0];
            let points: Vec<(f64, f64)> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (i as f64, *v))
                .collect();
            chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
            chart.draw_series(
                points
                    .iter()
                    .map(|&p| Circle::new(p, 3, color.filled())),
            )?;
        }
        _ => {
            let multicolor = spec.kind == ChartKind::Pie;
            chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
                let color = if multicolor {
                    PALETTE[i % PALETTE.len()]
                } else {
                    PALETTE[0]
                };
                let x = i as f64;
                Rectangle::new([(x - 0.35, 0.0), (x + 0.35, v)], color.filled())
            }))?;
        }
    }
    Ok(())
}

fn draw_points(
    area: &Area,
    spec: &ChartSpec,
    x_axis: XAxisKind,
    series: &[PointSeries],
) -> Result<()> {
    let all = series.iter().flat_map(|s| s.points.iter());
    let (mut x_min, mut x_max, mut y_min, mut y_max) = all.fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(a, b, c, d), &(x, y)| (a.min(x), b.max(x), c.min(y), d.max(y)),
    );
    if x_max <= x_min {
        x_min -= 0.5;
        x_max += 0.5;
    }
    y_min = y_min.min(0.0);
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }

    let mut chart = ChartBuilder::on(area)
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..y_max * 1.05)?;

    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_label_formatter(&|v: &f64| format_x_axis_label(*v, x_axis))
        .y_label_formatter(&|v: &f64| format_axis_label(*v))
        .draw()?;

    for (idx, s) in series.iter().enumerate() {
        if s.points.is_empty() {
            continue;
        }
        let color = PALETTE[idx % PALETTE.len()];
        match spec.kind {
            ChartKind::Line => {
                chart
                    .draw_series(LineSeries::new(s.points.iter().copied(), color))?
                    .label(s.name.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
            _ => {
                chart
                    .draw_series(plotters::series::PointSeries::of_element(
                        s.points.iter().copied(),
                        3,
                        color,
                        &|c, size, _| {
                            EmptyElement::at(c) + Circle::new((0, 0), size, color.filled())
                        },
                    ))?
                    .label(s.name.as_str())
                    .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// White (0) to blue (max) cells.
fn heat_color(value: f64, max: f64) -> RGBColor {
    let t = if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    RGBColor(
        (255.0 - 225.0 * t) as u8,
        (255.0 - 155.0 * t) as u8,
        (255.0 - 25.0 * t) as u8,
    )
}

fn draw_heatmap(area: &Area, spec: &ChartSpec, grid: &HeatmapGrid) -> Result<()> {
    let nx = grid.x_labels.len() as i32;
    let ny = grid.y_labels.len() as i32;
    let max = grid.max();

    let mut chart = ChartBuilder::on(area)
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(120)
        .build_cartesian_2d(0..nx, 0..ny)?;

    let label = |labels: &[String], v: i32| {
        usize::try_from(v)
            .ok()
            .and_then(|i| labels.get(i))
            .cloned()
            .unwrap_or_default()
    };
    let x_formatter = |v: &i32| label(&grid.x_labels, *v);
    let y_formatter = |v: &i32| label(&grid.y_labels, *v);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_labels(nx as usize + 1)
        .y_labels(ny as usize + 1)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .draw()?;

    chart.draw_series(grid.cells.iter().zip(0..).flat_map(|(values, row)| {
        values.iter().zip(0..).map(move |(&v, col)| {
            Rectangle::new([(col, row), (col + 1, row + 1)], heat_color(v, max).filled())
        })
    }))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateResult;
    use crate::present::monthly_trend;

    #[test]
    fn test_empty_chart_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        let spec = monthly_trend(&AggregateResult::default());
        let err = write_chart_png(&path, &spec, (640, 480)).unwrap_err();
        assert_eq!(err.to_string(), "No data to export");
        assert!(!path.exists());
    }

    #[test]
    fn test_heat_color_range() {
        assert_eq!(heat_color(0.0, 10.0), RGBColor(255, 255, 255));
        assert_eq!(heat_color(10.0, 10.0), RGBColor(30, 100, 230));
        assert_eq!(heat_color(5.0, 0.0), RGBColor(255, 255, 255));
    }
}
