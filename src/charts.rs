use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters_svg::SVGBackend;
use thiserror::Error;

use crate::dataset::{self, BoxStats};

const SIZE: (u32, u32) = (560, 360);
const FONT: &str = "sans-serif";

#[derive(Debug, Error)]
#[error("failed to draw chart: {0}")]
pub struct ChartError(#[from] DrawingAreaErrorKind<std::io::Error>);

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;
type DrawResult = Result<(), DrawingAreaErrorKind<std::io::Error>>;

/// Runs `draw` against a white SVG canvas and returns the finished document.
fn render_svg(size: (u32, u32), draw: impl FnOnce(&Area<'_>) -> DrawResult) -> Result<String, ChartError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    Ok(svg)
}

fn segment_label(value: &SegmentValue<usize>, labels: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(index) | SegmentValue::Exact(index) => {
            labels.get(*index).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}

/// Last category index; segmented axes over `0..=last` give one slot per label.
fn last_index(count: usize) -> usize {
    count.max(1) - 1
}

fn format_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.2}")
    }
}

fn upper_bound(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.filter(|v| v.is_finite()).fold(0.0_f64, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

pub fn bar_chart(labels: &[&str], values: &[f64], color: RGBColor, y_label: &str) -> Result<String, ChartError> {
    let names: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
    let y_max = upper_bound(values.iter().copied());

    render_svg(SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((0..last_index(names.len())).into_segmented(), 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(names.len())
            .x_label_formatter(&|v| segment_label(v, &names))
            .y_desc(y_label)
            .axis_desc_style((FONT, 13))
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(color.filled())
                .margin(16)
                .data(values.iter().enumerate().map(|(i, v)| (i, *v))),
        )?;
        Ok(())
    })
}

pub fn histogram_chart(hist: &dataset::Histogram, color: RGBColor, x_label: &str, y_label: &str) -> Result<String, ChartError> {
    let bins: Vec<String> = hist
        .edges
        .windows(2)
        .map(|pair| format!("{}–{}", format_tick(pair[0]), format_tick(pair[1])))
        .collect();
    let y_max = upper_bound(hist.counts.iter().map(|c| *c as f64));

    render_svg(SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .margin(12)
            .x_label_area_size(44)
            .y_label_area_size(60)
            .build_cartesian_2d((0..last_index(bins.len())).into_segmented(), 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(bins.len())
            .x_label_formatter(&|v| segment_label(v, &bins))
            .x_desc(x_label)
            .y_desc(y_label)
            .axis_desc_style((FONT, 13))
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(color.filled())
                .margin(0)
                .data(hist.counts.iter().enumerate().map(|(i, c)| (i, *c as f64))),
        )?;
        Ok(())
    })
}

/// Blue-white-red scale for values in [-1, 1]; NaN renders grey.
pub fn diverging_color(value: f64) -> RGBColor {
    if value.is_nan() {
        return RGBColor(191, 191, 191);
    }
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const HOT: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let t = value.clamp(-1.0, 1.0);
    let (from, to, f) = if t < 0.0 { (MID, COLD, -t) } else { (MID, HOT, t) };
    let mix = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

pub fn heatmap(labels: &[&str], matrix: &[Vec<f64>]) -> Result<String, ChartError> {
    let n = labels.len().max(1);
    let names: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
    // Row 0 is drawn at the top, so the y axis reads the labels backwards.
    let rows_up: Vec<String> = names.iter().rev().cloned().collect();
    let cell_text = TextStyle::from((FONT, 11).into_font()).pos(Pos::new(HPos::Center, VPos::Center));

    render_svg((620, 500), |root| {
        let (grid_area, bar_area) = root.split_horizontally(540);

        let mut chart = ChartBuilder::on(&grid_area)
            .margin(12)
            .x_label_area_size(110)
            .y_label_area_size(110)
            .build_cartesian_2d(
                (0..last_index(n)).into_segmented(),
                (0..last_index(n)).into_segmented(),
            )?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n)
            .y_labels(n)
            .x_label_formatter(&|v| segment_label(v, &names))
            .y_label_formatter(&|v| segment_label(v, &rows_up))
            .x_label_style((FONT, 11).into_font().transform(FontTransform::Rotate90))
            .draw()?;

        let cells: Vec<(usize, usize, f64)> = matrix
            .iter()
            .take(n)
            .enumerate()
            .flat_map(|(row, values)| {
                let y = n - 1 - row;
                values.iter().take(n).enumerate().map(move |(col, value)| (col, y, *value))
            })
            .collect();

        chart.draw_series(cells.iter().map(|&(col, y, value)| {
            Rectangle::new(
                [
                    (SegmentValue::Exact(col), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(col + 1), SegmentValue::Exact(y + 1)),
                ],
                diverging_color(value).filled(),
            )
        }))?;
        chart.draw_series(cells.iter().map(|&(col, y, value)| {
            Text::new(
                format!("{value:.2}"),
                (SegmentValue::CenterOf(col), SegmentValue::CenterOf(y)),
                cell_text.clone(),
            )
        }))?;

        // colour bar
        let mut scale = ChartBuilder::on(&bar_area)
            .margin_top(12)
            .margin_bottom(122)
            .margin_right(12)
            .y_label_area_size(36)
            .build_cartesian_2d(0f64..1f64, -1f64..1f64)?;
        scale
            .configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(5)
            .draw()?;
        let steps = 40;
        scale.draw_series((0..steps).map(|step| {
            let lo = -1.0 + 2.0 * step as f64 / steps as f64;
            let hi = lo + 2.0 / steps as f64;
            Rectangle::new([(0.0, lo), (1.0, hi)], diverging_color((lo + hi) / 2.0).filled())
        }))?;
        Ok(())
    })
}

pub fn grouped_bar_chart(
    title: &str,
    categories: &[&str],
    series: &[(&str, &[f64], RGBColor)],
    y_label: &str,
) -> Result<String, ChartError> {
    let names: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
    let n = names.len().max(1);
    let y_max = upper_bound(series.iter().flat_map(|(_, values, _)| values.iter().copied()));
    let width = 0.8 / series.len().max(1) as f64;

    render_svg((960, 520), |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 18).into_font())
            .margin(12)
            .x_label_area_size(170)
            .y_label_area_size(60)
            .build_cartesian_2d((0..last_index(n)).into_segmented(), 0f64..y_max)?
            .set_secondary_coord(0f64..n as f64, 0f64..y_max);

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|v| segment_label(v, &names))
            .x_label_style((FONT, 11).into_font().transform(FontTransform::Rotate90))
            .y_desc(y_label)
            .axis_desc_style((FONT, 13))
            .draw()?;

        for (offset, (name, values, color)) in series.iter().enumerate() {
            let color = *color;
            chart
                .draw_secondary_series(values.iter().take(n).enumerate().map(|(index, value)| {
                    let x = index as f64 + 0.1 + width * offset as f64;
                    Rectangle::new([(x, 0.0), (x + width, *value)], color.filled())
                }))?
                .label(*name)
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

pub fn box_plot(title: &str, groups: &[BoxStats], x_label: &str, y_label: &str) -> Result<String, ChartError> {
    let names: Vec<String> = groups.iter().map(|g| format_tick(g.group)).collect();
    let n = names.len().max(1);
    let lo = groups
        .iter()
        .flat_map(|g| g.outliers.iter().copied().chain([g.lower_whisker]))
        .fold(f64::INFINITY, f64::min);
    let hi = groups
        .iter()
        .flat_map(|g| g.outliers.iter().copied().chain([g.upper_whisker]))
        .fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = if lo.is_finite() && hi.is_finite() {
        let pad = ((hi - lo) * 0.1).max(0.5);
        (lo - pad, hi + pad)
    } else {
        (0.0, 1.0)
    };

    let box_color = RGBColor(31, 119, 180);
    let median_color = RGBColor(44, 160, 44);
    let whisker_color = RGBColor(51, 51, 51);

    render_svg(SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 16).into_font())
            .margin(12)
            .x_label_area_size(44)
            .y_label_area_size(60)
            .build_cartesian_2d((0..last_index(n)).into_segmented(), lo..hi)?
            .set_secondary_coord(0f64..n as f64, lo..hi);

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|v| segment_label(v, &names))
            .x_desc(x_label)
            .y_desc(y_label)
            .axis_desc_style((FONT, 13))
            .draw()?;

        chart.draw_secondary_series(groups.iter().enumerate().map(|(i, stats)| {
            let x = i as f64;
            Rectangle::new([(x + 0.25, stats.q3), (x + 0.75, stats.q1)], box_color.stroke_width(1))
        }))?;

        let lines = groups.iter().enumerate().flat_map(|(i, stats)| {
            let (left, mid, right) = (i as f64 + 0.25, i as f64 + 0.5, i as f64 + 0.75);
            let cap = |y: f64| PathElement::new(vec![(mid - 0.12, y), (mid + 0.12, y)], whisker_color.stroke_width(1));
            [
                PathElement::new(vec![(mid, stats.q3), (mid, stats.upper_whisker)], whisker_color.stroke_width(1)),
                PathElement::new(vec![(mid, stats.q1), (mid, stats.lower_whisker)], whisker_color.stroke_width(1)),
                cap(stats.upper_whisker),
                cap(stats.lower_whisker),
                PathElement::new(vec![(left, stats.median), (right, stats.median)], median_color.stroke_width(2)),
            ]
        });
        chart.draw_secondary_series(lines)?;

        chart.draw_secondary_series(groups.iter().enumerate().flat_map(|(i, stats)| {
            let x = i as f64 + 0.5;
            stats
                .outliers
                .iter()
                .map(move |y| Circle::new((x, *y), 3, whisker_color.stroke_width(1)))
        }))?;
        Ok(())
    })
}
