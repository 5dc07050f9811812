//! Draw a computed [`FigureLayout`] with plotters.
//!
//! The output format follows the file extension: `.svg` renders to the
//! vector backend, anything else to the bitmap backend. All numbers drawn
//! here were computed by [`super::layout`]; this module only translates
//! them into chart primitives.

use std::path::Path;

use plotters::coord::ranged1d::{AsRangedCoord, Ranged, ValueFormatter};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;

use super::{FigureLayout, HistStyle, LegendGlyph, Rgb};
use crate::error::{Error, Result};

pub const DEFAULT_SIZE: (u32, u32) = (800, 600);

/// Pixel width reserved for the external legend panel.
const LEGEND_PANEL_WIDTH: u32 = 190;

impl Rgb {
    fn color(&self) -> RGBColor {
        RGBColor(self.0, self.1, self.2)
    }
}

pub fn render_figure(layout: &FigureLayout, path: &Path, size: (u32, u32)) -> Result<()> {
    let is_svg = path.extension().and_then(|e| e.to_str()) == Some("svg");
    if is_svg {
        let root = SVGBackend::new(path, size).into_drawing_area();
        draw(&root, layout)?;
        root.present().map_err(render_err)?;
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        draw(&root, layout)?;
        root.present().map_err(render_err)?;
    }
    Ok(())
}

fn render_err(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}

fn draw<DB>(root: &DrawingArea<DB, Shift>, layout: &FigureLayout) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(render_err)?;
    let (width, _) = root.dim_in_pixel();

    if let Some(text) = &layout.annotations.header_right {
        let style = TextStyle::from(("sans-serif", 15))
            .pos(Pos::new(HPos::Right, VPos::Top));
        root.draw(&Text::new(text.clone(), (width as i32 - 10, 8), style))
            .map_err(render_err)?;
    }

    let (chart_area, legend_area) = if layout.legend_inline {
        (root.clone(), None)
    } else {
        let (left, right) =
            root.split_horizontally(width.saturating_sub(LEGEND_PANEL_WIDTH) as i32);
        (left, Some(right))
    };

    if layout.log_scale {
        let (y0, y1) = layout.y_range;
        draw_chart(&chart_area, layout, (y0..y1).log_scale())?;
    } else {
        let (y0, y1) = layout.y_range;
        draw_chart(&chart_area, layout, y0..y1)?;
    }

    if let Some(area) = legend_area {
        draw_external_legend(&area, layout)?;
    }

    if let Some(text) = &layout.annotations.header_left {
        let style = TextStyle::from(("sans-serif", 18).into_font().style(FontStyle::Bold));
        root.draw(&Text::new(text.clone(), (75, 18), style))
            .map_err(render_err)?;
    }
    if let Some(text) = &layout.annotations.corner_note {
        root.draw(&Text::new(text.clone(), (75, 42), ("sans-serif", 13)))
            .map_err(render_err)?;
    }
    Ok(())
}

fn draw_chart<DB, YS>(area: &DrawingArea<DB, Shift>, layout: &FigureLayout, y_spec: YS) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    YS: AsRangedCoord<Value = f64>,
    YS::CoordDescType: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    let bins = &layout.bins;
    let n = bins.len() - 1;
    let (x0, x1) = (bins[0], bins[n]);
    // Keep every drawn y inside the axis range; relevant on a log axis
    // where baselines sit at zero.
    let floor = layout.y_range.0;
    let clamp = |v: f64| v.max(floor);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(x0..x1, y_spec)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc(layout.x_label.clone().unwrap_or_default())
        .y_desc(layout.y_label.clone().unwrap_or_default())
        .label_style(("sans-serif", 13))
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(render_err)?;

    // Stacked series, bottom first, then the combined uncertainty band.
    for series in &layout.stacked {
        let color = series.color.color();
        let bars: Vec<Rectangle<(f64, f64)>> = (0..n)
            .map(|i| {
                Rectangle::new(
                    [(bins[i], clamp(series.baseline[i])), (bins[i + 1], clamp(series.top[i]))],
                    color.filled(),
                )
            })
            .collect();
        match series.style {
            HistStyle::Fill => {
                chart.draw_series(bars).map_err(render_err)?;
            }
            HistStyle::Step => {
                chart
                    .draw_series(std::iter::once(step_outline(bins, series, &clamp, color)))
                    .map_err(render_err)?;
            }
        }
    }
    if let Some(band) = &layout.stacked_band {
        let color = band.color.color();
        chart
            .draw_series((0..n).map(|i| {
                Rectangle::new(
                    [(bins[i], clamp(band.lower[i])), (bins[i + 1], clamp(band.upper[i]))],
                    color.mix(0.3).filled(),
                )
            }))
            .map_err(render_err)?;
    }

    // Independent series, each with its own band.
    for (series, band) in &layout.unstacked {
        let color = series.color.color();
        match series.style {
            HistStyle::Fill => {
                chart
                    .draw_series((0..n).map(|i| {
                        Rectangle::new(
                            [(bins[i], clamp(series.baseline[i])), (bins[i + 1], clamp(series.top[i]))],
                            color.mix(0.7).filled(),
                        )
                    }))
                    .map_err(render_err)?;
            }
            HistStyle::Step => {
                chart
                    .draw_series(std::iter::once(step_outline(bins, series, &clamp, color)))
                    .map_err(render_err)?;
            }
        }
        chart
            .draw_series((0..n).map(|i| {
                Rectangle::new(
                    [(bins[i], clamp(band.lower[i])), (bins[i + 1], clamp(band.upper[i]))],
                    color.mix(0.3).filled(),
                )
            }))
            .map_err(render_err)?;
    }

    if let Some(markers) = &layout.markers {
        let centres: Vec<f64> = bins.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        chart
            .draw_series(centres.iter().zip(markers.y.iter().zip(&markers.y_err)).map(
                |(&x, (&y, &e))| {
                    ErrorBar::new_vertical(x, clamp(y - e), clamp(y), clamp(y + e), BLACK.filled(), 3)
                },
            ))
            .map_err(render_err)?;
    }

    if layout.legend_inline {
        // Invisible anchor series carrying the legend entries.
        for entry in &layout.legend {
            let color = entry.color.color();
            let glyph = entry.glyph;
            chart
                .draw_series(std::iter::once(EmptyElement::at((x0, floor))))
                .map_err(render_err)?
                .label(entry.label.clone())
                .legend(move |(x, y)| match glyph {
                    LegendGlyph::Fill => {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()).into_dyn()
                    }
                    LegendGlyph::Step => {
                        PathElement::new(vec![(x, y), (x + 12, y)], color.stroke_width(2)).into_dyn()
                    }
                    LegendGlyph::Marker => {
                        Circle::new((x + 6, y), 3, BLACK.filled()).into_dyn()
                    }
                });
        }
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .border_style(BLACK.mix(0.4))
            .background_style(WHITE.mix(0.8))
            .label_font(("sans-serif", 12))
            .draw()
            .map_err(render_err)?;
    }
    Ok(())
}

fn step_outline(
    bins: &[f64],
    series: &super::StepSeries,
    clamp: &impl Fn(f64) -> f64,
    color: RGBColor,
) -> PathElement<(f64, f64)> {
    let n = bins.len() - 1;
    let mut points = Vec::with_capacity(2 * n + 2);
    points.push((bins[0], clamp(series.baseline[0])));
    for i in 0..n {
        points.push((bins[i], clamp(series.top[i])));
        points.push((bins[i + 1], clamp(series.top[i])));
    }
    points.push((bins[n], clamp(series.baseline[n - 1])));
    PathElement::new(points, color.stroke_width(2))
}

fn draw_external_legend<DB>(area: &DrawingArea<DB, Shift>, layout: &FigureLayout) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let row_height = 22;
    for (i, entry) in layout.legend.iter().enumerate() {
        let y = 40 + (i as i32) * row_height;
        let color = entry.color.color();
        match entry.glyph {
            LegendGlyph::Fill => {
                area.draw(&Rectangle::new([(8, y - 6), (24, y + 6)], color.filled()))
                    .map_err(render_err)?;
            }
            LegendGlyph::Step => {
                area.draw(&PathElement::new(vec![(8, y), (24, y)], color.stroke_width(2)))
                    .map_err(render_err)?;
            }
            LegendGlyph::Marker => {
                area.draw(&Circle::new((16, y), 3, BLACK.filled()))
                    .map_err(render_err)?;
            }
        }
        area.draw(&Text::new(entry.label.clone(), (30, y - 6), ("sans-serif", 12)))
            .map_err(render_err)?;
    }
    Ok(())
}
