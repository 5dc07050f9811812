//! Compose named histograms into one comparison chart.
//!
//! This module does all the numerical work (stacking, normalization,
//! uncertainty bands, axis limits, legend placement) and produces a
//! [`FigureLayout`] that a rendering backend draws verbatim. Nothing here
//! depends on the output medium.

pub mod render;

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::hist::Histogram;
use crate::variable::validate_bins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Category palette, matching the matplotlib colour names the analysis uses.
pub mod palette {
    use super::Rgb;

    pub const DODGER_BLUE: Rgb = Rgb(30, 144, 255);
    pub const DARK_ORCHID: Rgb = Rgb(153, 50, 204);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const GOLD: Rgb = Rgb(255, 215, 0);
    pub const FOREST_GREEN: Rgb = Rgb(34, 139, 34);
    pub const GREY: Rgb = Rgb(128, 128, 128);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistStyle {
    /// Outline only.
    Step,
    /// Filled area under the outline.
    Fill,
}

#[derive(Debug, Clone)]
pub struct SeriesStyle {
    pub color: Rgb,
    pub style: HistStyle,
    /// Legend text.
    pub label: String,
}

impl SeriesStyle {
    /// Fallback for series the caller gave no style for.
    fn default_for(label: &str) -> Self {
        Self { color: palette::GREY, style: HistStyle::Step, label: label.to_string() }
    }
}

/// Header and corner texts drawn over the chart.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    /// Bold text in the upper-left corner, inside the axes. When present,
    /// the upper y-limit is inflated to leave room for it.
    pub header_left: Option<String>,
    /// Text above the axes, flush right.
    pub header_right: Option<String>,
    /// Smaller note below the upper-left header.
    pub corner_note: Option<String>,
}

/// One chart worth of input. Transient: built per rendering call.
#[derive(Debug, Clone)]
pub struct PlotRequest {
    /// Bin edges shared by every histogram in the request.
    pub bins: Vec<f64>,
    /// Ordered label -> histogram mapping; iteration order is rendering
    /// order, and stacking baselines follow it.
    pub series: Vec<(String, Histogram)>,
    /// Optional data-like series drawn as error markers, not bars.
    pub points: Option<(String, Histogram)>,
    /// Labels of the series to sum visually. Labels naming no series are
    /// ignored.
    pub stack: Vec<String>,
    pub styles: BTreeMap<String, SeriesStyle>,
    pub normalize: bool,
    pub log_scale: bool,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub annotations: Annotations,
}

/// A histogram outline between two step lines.
#[derive(Debug, Clone)]
pub struct StepSeries {
    pub label: String,
    pub color: Rgb,
    pub style: HistStyle,
    pub baseline: Vec<f64>,
    pub top: Vec<f64>,
}

/// Translucent uncertainty band.
#[derive(Debug, Clone)]
pub struct Band {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub color: Rgb,
}

/// Data drawn as points with vertical error bars at bin centres.
#[derive(Debug, Clone)]
pub struct MarkerSeries {
    pub label: String,
    pub y: Vec<f64>,
    pub y_err: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendGlyph {
    Fill,
    Step,
    Marker,
}

#[derive(Debug, Clone)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
    pub glyph: LegendGlyph,
}

/// Everything a backend needs to draw the chart, fully computed.
#[derive(Debug, Clone)]
pub struct FigureLayout {
    pub bins: Vec<f64>,
    /// Cumulative stacked series, bottom first.
    pub stacked: Vec<StepSeries>,
    /// Quadrature uncertainty band of the whole stack.
    pub stacked_band: Option<Band>,
    /// Independent series, each with its own band.
    pub unstacked: Vec<(StepSeries, Band)>,
    pub markers: Option<MarkerSeries>,
    pub legend: Vec<LegendEntry>,
    /// Inline when few series, external panel otherwise.
    pub legend_inline: bool,
    pub y_range: (f64, f64),
    pub log_scale: bool,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub annotations: Annotations,
}

/// Number of rendered bar series above which the legend moves out of the
/// axes to avoid occluding data.
const INLINE_LEGEND_LIMIT: usize = 5;

/// Extra y-headroom left for the upper-left header annotation. Applied
/// multiplicatively in log scale and additively in linear scale: a fixed
/// additive headroom is visually meaningless in log space.
const HEADER_HEADROOM: f64 = 0.2;

pub fn layout(request: &PlotRequest) -> Result<FigureLayout> {
    validate(request)?;
    let widths: Vec<f64> = request.bins.windows(2).map(|w| w[1] - w[0]).collect();

    let is_stacked = |label: &str| request.stack.iter().any(|s| s == label);
    let mut stacked: Vec<(String, Histogram)> = vec![];
    let mut unstacked: Vec<(String, Histogram)> = vec![];
    for (label, hist) in &request.series {
        if is_stacked(label) {
            stacked.push((label.clone(), hist.clone()));
        } else {
            unstacked.push((label.clone(), hist.clone()));
        }
    }
    let mut points = request.points.clone();

    if request.normalize {
        for (_, hist) in &mut unstacked {
            normalize_in_place(hist, &widths);
        }
        if let Some((_, hist)) = &mut points {
            normalize_in_place(hist, &widths);
        }
        // The stacked group is one unit: every member is scaled by the
        // integral of the summed histogram, so proportions are preserved.
        if !stacked.is_empty() {
            let total = sum_counts(stacked.iter().map(|(_, h)| h));
            let integral = total.integral(Some(&widths));
            if integral > 0.0 {
                for (_, hist) in &mut stacked {
                    hist.scale(integral);
                }
            }
        }
    }

    let style_of = |label: &str| {
        request
            .styles
            .get(label)
            .cloned()
            .unwrap_or_else(|| SeriesStyle::default_for(label))
    };

    // Cumulative stack: the baseline of level k is the sum of levels 0..k-1.
    let n = request.bins.len() - 1;
    let mut baseline = vec![0.0; n];
    let mut stacked_out = vec![];
    for (label, hist) in &stacked {
        let style = style_of(label);
        let top: Vec<f64> = baseline.iter().zip(&hist.counts).map(|(b, c)| b + c).collect();
        stacked_out.push(StepSeries {
            label: style.label,
            color: style.color,
            style: style.style,
            baseline: baseline.clone(),
            top: top.clone(),
        });
        baseline = top;
    }
    let stacked_band = if stacked.is_empty() {
        None
    } else {
        let err = quadrature_sum(stacked.iter().map(|(_, h)| h.stat_errors.as_slice()), n);
        Some(Band {
            lower: baseline.iter().zip(&err).map(|(t, e)| t - e).collect(),
            upper: baseline.iter().zip(&err).map(|(t, e)| t + e).collect(),
            color: palette::GREY,
        })
    };

    let unstacked_out: Vec<(StepSeries, Band)> = unstacked
        .iter()
        .map(|(label, hist)| {
            let style = style_of(label);
            let series = StepSeries {
                label: style.label,
                color: style.color,
                style: style.style,
                baseline: vec![0.0; n],
                top: hist.counts.clone(),
            };
            let band = Band {
                lower: hist.counts.iter().zip(&hist.stat_errors).map(|(c, e)| c - e).collect(),
                upper: hist.counts.iter().zip(&hist.stat_errors).map(|(c, e)| c + e).collect(),
                color: style.color,
            };
            (series, band)
        })
        .collect();

    let markers = points.as_ref().map(|(label, hist)| MarkerSeries {
        label: style_of(label).label,
        y: hist.counts.clone(),
        y_err: hist.stat_errors.clone(),
    });

    let mut legend: Vec<LegendEntry> = request
        .series
        .iter()
        .map(|(label, _)| {
            let style = style_of(label);
            LegendEntry {
                label: style.label,
                color: style.color,
                glyph: match style.style {
                    HistStyle::Fill => LegendGlyph::Fill,
                    HistStyle::Step => LegendGlyph::Step,
                },
            }
        })
        .collect();
    if let Some(markers) = &markers {
        legend.push(LegendEntry {
            label: markers.label.clone(),
            color: palette::BLACK,
            glyph: LegendGlyph::Marker,
        });
    }
    let legend_inline = request.series.len() <= INLINE_LEGEND_LIMIT;

    let y_range = y_range(
        request,
        &stacked_out,
        stacked_band.as_ref(),
        &unstacked_out,
        markers.as_ref(),
    );

    Ok(FigureLayout {
        bins: request.bins.clone(),
        stacked: stacked_out,
        stacked_band,
        unstacked: unstacked_out,
        markers,
        legend,
        legend_inline,
        y_range,
        log_scale: request.log_scale,
        x_label: request.x_label.clone(),
        y_label: request.y_label.clone(),
        annotations: request.annotations.clone(),
    })
}

fn validate(request: &PlotRequest) -> Result<()> {
    if request.series.is_empty() {
        return Err(Error::Render("no histograms to plot".into()));
    }
    validate_bins(&request.bins).map_err(Error::Render)?;
    let n = request.bins.len() - 1;
    let all = request.series.iter().chain(&request.points);
    for (label, hist) in all {
        if hist.n_bins() != n {
            return Err(Error::Render(format!(
                "histogram `{label}` has {} bins, edges define {n}",
                hist.n_bins()
            )));
        }
    }
    Ok(())
}

/// Divide by the integral; a zero integral leaves the histogram unscaled.
fn normalize_in_place(hist: &mut Histogram, widths: &[f64]) {
    let integral = hist.integral(Some(widths));
    if integral > 0.0 {
        hist.scale(integral);
    }
}

fn sum_counts<'h>(hists: impl Iterator<Item = &'h Histogram>) -> Histogram {
    let mut counts: Vec<f64> = vec![];
    for hist in hists {
        if counts.is_empty() {
            counts = vec![0.0; hist.n_bins()];
        }
        for (total, c) in counts.iter_mut().zip(&hist.counts) {
            *total += c;
        }
    }
    let n = counts.len();
    Histogram { counts, stat_errors: vec![0.0; n] }
}

fn quadrature_sum<'e>(errors: impl Iterator<Item = &'e [f64]>, n: usize) -> Vec<f64> {
    let mut sum = vec![0.0; n];
    for errs in errors {
        for (s, e) in sum.iter_mut().zip(errs) {
            *s += e * e;
        }
    }
    sum.into_iter().map(f64::sqrt).collect()
}

fn y_range(
    request: &PlotRequest,
    stacked: &[StepSeries],
    stacked_band: Option<&Band>,
    unstacked: &[(StepSeries, Band)],
    markers: Option<&MarkerSeries>,
) -> (f64, f64) {
    let mut y_max = f64::MIN;
    let mut min_positive = f64::MAX;
    let mut observe = |v: f64| {
        if v > y_max {
            y_max = v;
        }
        if v > 0.0 && v < min_positive {
            min_positive = v;
        }
    };
    for series in stacked {
        series.top.iter().for_each(|&v| observe(v));
    }
    if let Some(band) = stacked_band {
        band.upper.iter().for_each(|&v| observe(v));
    }
    for (series, band) in unstacked {
        series.top.iter().for_each(|&v| observe(v));
        band.upper.iter().for_each(|&v| observe(v));
    }
    if let Some(markers) = markers {
        for (y, e) in markers.y.iter().zip(&markers.y_err) {
            observe(y + e);
        }
    }
    if y_max <= 0.0 {
        y_max = 1.0;
    }
    if min_positive == f64::MAX {
        min_positive = 0.1;
    }

    let (y_min, mut y_top) = if request.log_scale {
        (min_positive / 2.0, y_max * 1.5)
    } else {
        (0.0, y_max * 1.05)
    };

    if request.annotations.header_left.is_some() {
        if request.log_scale {
            // Multiplicative headroom: additive space is meaningless on a
            // log axis.
            let span = y_top / y_min;
            y_top *= span.powf(HEADER_HEADROOM);
        } else {
            y_top += (y_top - y_min) * HEADER_HEADROOM;
        }
    }
    (y_min, y_top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use pretty_assertions::assert_eq;

    fn hist(counts: &[f64]) -> Histogram {
        Histogram {
            counts: counts.to_vec(),
            stat_errors: counts.iter().map(|c| c.sqrt()).collect(),
        }
    }

    fn request(series: Vec<(&str, Histogram)>, stack: &[&str]) -> PlotRequest {
        PlotRequest {
            bins: vec![0.0, 1.0, 2.0],
            series: series.into_iter().map(|(l, h)| (l.to_string(), h)).collect(),
            points: None,
            stack: stack.iter().map(|s| s.to_string()).collect(),
            styles: BTreeMap::new(),
            normalize: false,
            log_scale: false,
            x_label: None,
            y_label: None,
            annotations: Annotations::default(),
        }
    }

    #[test]
    fn stack_accumulates_in_request_order() {
        let r = request(
            vec![("a", hist(&[2.0, 2.0])), ("b", hist(&[3.0, 1.0]))],
            &["a", "b"],
        );
        let fig = layout(&r).unwrap();
        assert_eq!(fig.stacked.len(), 2);
        assert_eq!(fig.stacked[0].baseline, vec![0.0, 0.0]);
        assert_eq!(fig.stacked[0].top, vec![2.0, 2.0]);
        assert_eq!(fig.stacked[1].baseline, vec![2.0, 2.0]);
        assert_eq!(fig.stacked[1].top, vec![5.0, 3.0]);
    }

    #[test]
    fn stacked_band_is_quadrature_of_members() {
        let a = Histogram { counts: vec![1.0, 1.0], stat_errors: vec![3.0, 0.0] };
        let b = Histogram { counts: vec![1.0, 1.0], stat_errors: vec![4.0, 0.0] };
        let r = request(vec![("a", a), ("b", b)], &["a", "b"]);
        let fig = layout(&r).unwrap();
        let band = fig.stacked_band.unwrap();
        assert_float_eq!(band.upper[0] - band.lower[0], 10.0, abs <= 1e-12);
    }

    #[test]
    fn normalized_stack_scales_members_proportionally() {
        let mut r = request(
            vec![("a", hist(&[2.0, 2.0])), ("b", hist(&[3.0, 1.0]))],
            &["a", "b"],
        );
        r.normalize = true;
        let fig = layout(&r).unwrap();
        // Shared factor 8 (unit bin widths): proportions survive.
        assert_eq!(fig.stacked[0].top, vec![0.25, 0.25]);
        assert_eq!(fig.stacked[1].top, vec![0.625, 0.375]);
        let total_integral: f64 = fig.stacked[1].top.iter().sum();
        assert_float_eq!(total_integral, 1.0, abs <= 1e-12);
    }

    #[test]
    fn normalized_unstacked_histogram_has_unit_integral() {
        let mut r = request(vec![("a", hist(&[3.0, 1.0]))], &[]);
        r.bins = vec![0.0, 0.5, 2.0];
        r.normalize = true;
        let fig = layout(&r).unwrap();
        let (series, _) = &fig.unstacked[0];
        let integral = series.top[0] * 0.5 + series.top[1] * 1.5;
        assert_float_eq!(integral, 1.0, abs <= 1e-12);
    }

    #[test]
    fn zero_integral_is_left_unscaled() {
        let mut r = request(vec![("a", hist(&[0.0, 0.0]))], &[]);
        r.normalize = true;
        let fig = layout(&r).unwrap();
        assert_eq!(fig.unstacked[0].0.top, vec![0.0, 0.0]);
    }

    #[test]
    fn unknown_stack_labels_are_ignored() {
        let r = request(vec![("a", hist(&[1.0, 1.0]))], &["a", "ghost"]);
        let fig = layout(&r).unwrap();
        assert_eq!(fig.stacked.len(), 1);
    }

    #[test]
    fn empty_request_is_a_render_error() {
        let r = request(vec![], &[]);
        assert!(matches!(layout(&r), Err(Error::Render(_))));
    }

    #[test]
    fn wrong_histogram_length_is_a_render_error() {
        let r = request(vec![("a", hist(&[1.0, 2.0, 3.0]))], &[]);
        assert!(matches!(layout(&r), Err(Error::Render(_))));
    }

    #[test]
    fn legend_moves_outside_for_many_series() {
        let few = request(vec![("a", hist(&[1.0, 1.0]))], &[]);
        assert!(layout(&few).unwrap().legend_inline);
        let mut many = request(vec![], &[]);
        many.series = (0..6).map(|i| (format!("s{i}"), hist(&[1.0, 1.0]))).collect();
        assert!(!layout(&many).unwrap().legend_inline);
    }

    #[test]
    fn header_headroom_is_additive_in_linear_scale() {
        let mut r = request(vec![("a", hist(&[4.0, 1.0]))], &[]);
        r.annotations.header_left = Some("CMS".into());
        let with_header = layout(&r).unwrap().y_range;
        r.annotations.header_left = None;
        let without = layout(&r).unwrap().y_range;
        assert_float_eq!(
            with_header.1 - without.1,
            (without.1 - without.0) * HEADER_HEADROOM,
            abs <= 1e-9
        );
    }

    #[test]
    fn header_headroom_is_multiplicative_in_log_scale() {
        let mut r = request(vec![("a", hist(&[4.0, 1.0]))], &[]);
        r.log_scale = true;
        r.annotations.header_left = Some("CMS".into());
        let (y0, y1) = layout(&r).unwrap().y_range;
        r.annotations.header_left = None;
        let (b0, b1) = layout(&r).unwrap().y_range;
        assert_float_eq!(y0, b0, abs <= 1e-12);
        assert_float_eq!(y1 / b1, (b1 / b0).powf(HEADER_HEADROOM), rel <= 1e-9);
    }
}
