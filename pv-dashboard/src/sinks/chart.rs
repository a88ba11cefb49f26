use plotters::prelude::*;
use pvlive_client::GenerationSample;
use time::{macros::format_description, OffsetDateTime};

use crate::transform::DisplayZone;

pub const CHART_SIZE: (u32, u32) = (1200, 480);

#[derive(thiserror::Error, Debug)]
pub enum ChartError {
    #[error("cannot draw an empty series")]
    Empty,
    #[error("drawing failed: {0}")]
    Draw(String),
}

fn draw_err(e: impl std::fmt::Display) -> ChartError {
    ChartError::Draw(e.to_string())
}

/// Y range from zero to the largest reading, with 10% headroom.
fn y_range(series: &[GenerationSample]) -> (f64, f64) {
    let max = series
        .iter()
        .filter_map(|s| s.generation_mw)
        .fold(0.0_f64, f64::max);

    let padding = (max * 0.1).max(1.0);
    (0.0, max + padding)
}

fn x_range(series: &[GenerationSample]) -> (i64, i64) {
    let first = series.first().map(|s| s.ts.unix_timestamp()).unwrap_or(0);
    let last = series.last().map(|s| s.ts.unix_timestamp()).unwrap_or(0);
    if last > first {
        (first, last)
    } else {
        (first, first + 1)
    }
}

/// Contiguous runs of readings; a `None` value breaks the line.
fn segments(series: &[GenerationSample]) -> Vec<Vec<(i64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();

    for sample in series {
        match sample.generation_mw {
            Some(mw) => current.push((sample.ts.unix_timestamp(), mw)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn tick_label(secs: i64, zone: &DisplayZone) -> String {
    let fmt = format_description!("[hour]:[minute]");
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()
        .and_then(|ts| zone.convert(ts).format(&fmt).ok())
        .unwrap_or_default()
}

/// Render the series as an SVG line chart, x axis labelled in `zone`.
pub fn render_svg(series: &[GenerationSample], zone: &DisplayZone, size: (u32, u32)) -> Result<String, ChartError> {
    if series.is_empty() {
        return Err(ChartError::Empty);
    }

    let (x_min, x_max) = x_range(series);
    let (y_min, y_max) = y_range(series);
    let x_desc = format!("time ({})", zone.name());

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(draw_err)?;

        let grid_color = RGBColor(230, 230, 230);
        chart
            .configure_mesh()
            .x_desc(x_desc.as_str())
            .y_desc("generation_mw")
            .x_labels(12)
            .y_labels(8)
            .light_line_style(ShapeStyle::from(&grid_color).stroke_width(1))
            .x_label_formatter(&|x| tick_label(*x, zone))
            .y_label_formatter(&|y| format!("{y:.0}"))
            .draw()
            .map_err(draw_err)?;

        let line_color = RGBColor(255, 75, 75);
        for segment in segments(series) {
            chart
                .draw_series(LineSeries::new(segment, ShapeStyle::from(&line_color).stroke_width(2)))
                .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
    }

    Ok(svg)
}
