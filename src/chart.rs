//! Figure generation using plotters (SVG output)
//!
//! Uses SVG backend to avoid system font dependencies.

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters_svg::SVGBackend;

use crate::model::metrics::{CountryStatus, Series};

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

const PALETTE: [RGBColor; 8] = [
    BLUE,
    RED,
    GREEN,
    MAGENTA,
    CYAN,
    BLACK,
    RGBColor(255, 140, 0),
    RGBColor(128, 0, 128),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// One plotted series within a panel.
#[derive(Clone)]
pub struct Trace {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub kind: PlotKind,
    pub style: LineStyle,
    pub color: RGBColor,
}

impl Trace {
    pub fn line(label: impl Into<String>, points: Vec<(f64, f64)>, color: RGBColor) -> Self {
        Self {
            label: label.into(),
            points,
            kind: PlotKind::Line,
            style: LineStyle::Solid,
            color,
        }
    }

    pub fn bars(label: impl Into<String>, points: Vec<(f64, f64)>, color: RGBColor) -> Self {
        Self {
            kind: PlotKind::Bar,
            ..Self::line(label, points, color)
        }
    }

    pub fn dashed(mut self) -> Self {
        self.style = LineStyle::Dashed;
        self
    }
}

/// Display options for a single chart panel.
#[derive(Clone)]
pub struct PanelSpec {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    /// Log scale on both axes
    pub log_scale: bool,
    pub legend: bool,
    pub traces: Vec<Trace>,
}

impl PanelSpec {
    pub fn new(title: impl Into<String>, x_desc: impl Into<String>, y_desc: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_desc: x_desc.into(),
            y_desc: y_desc.into(),
            log_scale: false,
            legend: true,
            traces: Vec::new(),
        }
    }
}

fn day_points(values: &[f64]) -> Vec<(f64, f64)> {
    values.iter().enumerate().map(|(d, v)| (d as f64, *v)).collect()
}

fn series_points(series: &Series) -> Vec<(f64, f64)> {
    series.points().map(|(d, v)| (d as f64, v)).collect()
}

fn usable(p: (f64, f64), log_scale: bool) -> bool {
    p.0.is_finite() && p.1.is_finite() && (!log_scale || (p.0 > 0.0 && p.1 > 0.0))
}

fn padded(lo: f64, hi: f64, log_scale: bool) -> Range<f64> {
    if log_scale {
        return lo / 1.5..hi * 1.5;
    }
    let span = if hi > lo { hi - lo } else { 1.0 };
    let lo = if lo >= 0.0 { 0.0 } else { lo - span * 0.05 };
    lo..hi + span * 0.05
}

/// Axis ranges covering every drawable point, or `None` when nothing is drawable.
fn bounds(spec: &PanelSpec) -> Option<(Range<f64>, Range<f64>)> {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    let mut any = false;
    for trace in &spec.traces {
        for &p in trace.points.iter().filter(|p| usable(**p, spec.log_scale)) {
            any = true;
            x = (x.0.min(p.0), x.1.max(p.0));
            y = (y.0.min(p.1), y.1.max(p.1));
        }
        if trace.kind == PlotKind::Bar && !spec.log_scale {
            y = (y.0.min(0.0), y.1.max(0.0));
        }
    }
    if !any {
        return None;
    }
    let x = if spec.log_scale {
        padded(x.0, x.1, true)
    } else {
        x.0 - 0.5..x.1 + 0.5
    };
    Some((x, padded(y.0, y.1, spec.log_scale)))
}

fn draw_placeholder(area: &Area<'_>, title: &str) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        format!("{title}: no data"),
        ((w / 2) as i32 - 80, (h / 2) as i32),
        ("sans-serif", 18).into_font().color(&BLACK),
    ))?;
    Ok(())
}

fn draw_traces<'a, X, Y>(chart: &mut ChartContext<'a, SVGBackend<'a>, Cartesian2d<X, Y>>, spec: &PanelSpec) -> Result<()>
where
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    let mut labelled = false;
    for trace in &spec.traces {
        let points: Vec<(f64, f64)> = trace
            .points
            .iter()
            .copied()
            .filter(|p| usable(*p, spec.log_scale))
            .collect();
        if points.is_empty() {
            continue;
        }
        let color = trace.color;
        let anno = match (trace.kind, trace.style) {
            (PlotKind::Bar, _) => chart.draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Rectangle::new([(x - 0.4, 0.0), (x + 0.4, y)], color.mix(0.6).filled())),
            )?,
            (PlotKind::Line, LineStyle::Solid) => chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?,
            (PlotKind::Line, LineStyle::Dashed) => {
                chart.draw_series(DashedLineSeries::new(points, 8, 4, color.stroke_width(2)))?
            }
        };
        if spec.legend && !trace.label.is_empty() {
            labelled = true;
            anno.label(trace.label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }
    }

    if labelled {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

/// Draw one panel into `area`. Panels without drawable points get a
/// placeholder instead of an error.
pub fn draw_panel(area: &Area<'_>, spec: &PanelSpec) -> Result<()> {
    let Some((x_range, y_range)) = bounds(spec) else {
        return draw_placeholder(area, &spec.title);
    };

    let mut builder = ChartBuilder::on(area);
    builder
        .caption(&spec.title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(60);

    if spec.log_scale {
        let mut chart = builder.build_cartesian_2d(x_range.log_scale(), y_range.log_scale())?;
        chart
            .configure_mesh()
            .x_desc(spec.x_desc.as_str())
            .y_desc(spec.y_desc.as_str())
            .draw()?;
        draw_traces(&mut chart, spec)
    } else {
        let mut chart = builder.build_cartesian_2d(x_range, y_range)?;
        chart
            .configure_mesh()
            .x_desc(spec.x_desc.as_str())
            .y_desc(spec.y_desc.as_str())
            .draw()?;
        draw_traces(&mut chart, spec)
    }
}

/// The four panels of the per-country figure: totals, daily new cases with
/// running average, log-log growth curve, outcome rates.
pub fn country_panels(status: &CountryStatus) -> Vec<PanelSpec> {
    let mut totals = PanelSpec::new("Total Cases", "Days", "Cases");
    totals.traces = vec![
        Trace::line("confirmed", day_points(&status.cases), BLUE),
        Trace::line("deaths", day_points(&status.deaths), RED),
        Trace::line("recoveries", day_points(&status.recovered), GREEN),
    ];

    let mut daily = PanelSpec::new("Daily New Cases", "Days", "Cases");
    daily.traces = vec![
        Trace::bars("daily cases", day_points(&status.daily_new_cases), BLUE),
        Trace::line(
            format!("avg daily cases ({} days)", status.window),
            series_points(&status.running_average),
            RED,
        )
        .dashed(),
    ];

    let mut growth = PanelSpec::new("Avg New Cases vs Total Cases", "Total Cases", "Avg New Cases");
    growth.log_scale = true;
    growth.legend = false;
    growth.traces = vec![Trace::line("", status.growth.clone(), BLUE)];

    let mut outcome = PanelSpec::new("Outcome of Cases", "Days", "Percent");
    outcome.traces = vec![
        Trace::line("recovery rate", day_points(&status.recovery_rate), GREEN),
        Trace::line("death rate", day_points(&status.death_rate), RED),
    ];

    vec![totals, daily, growth, outcome]
}

fn svg_path(path: &Path) -> PathBuf {
    if path.extension().map(|e| e != "svg").unwrap_or(true) {
        path.with_extension("svg")
    } else {
        path.to_path_buf()
    }
}

/// File-system friendly name for a country, e.g. "Congo (Kinshasa)" -> "Congo_Kinshasa".
pub fn file_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Render the 2x2 status figure for one country. Returns the written path
/// (always with an `.svg` extension).
pub fn render_country_status(path: &Path, status: &CountryStatus, size: (u32, u32)) -> Result<PathBuf> {
    let svg_path = svg_path(path);
    let out_path = svg_path.clone();
    let root = SVGBackend::new(&out_path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let body = root.titled(&status.country, ("sans-serif", 30))?;

    let panels = country_panels(status);
    for (area, panel) in body.split_evenly((2, 2)).iter().zip(panels.iter()) {
        draw_panel(area, panel).with_context(|| format!("{}: panel '{}' failed", status.country, panel.title))?;
    }

    root.present()
        .with_context(|| format!("write figure failed (path={:?})", svg_path))?;
    Ok(svg_path)
}

/// One status figure per country into `dir`.
pub fn render_countries_status(dir: &Path, statuses: &[CountryStatus], size: (u32, u32)) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("create chart dir failed (path={:?})", dir))?;
    statuses
        .iter()
        .map(|s| render_country_status(&dir.join(file_stem(&s.country)), s, size))
        .collect()
}

/// One figure with a line per country for the same metric.
pub fn render_overlay(
    path: &Path,
    title: &str,
    y_desc: &str,
    series: &[(String, Series)],
    size: (u32, u32),
) -> Result<PathBuf> {
    let svg_path = svg_path(path);
    let out_path = svg_path.clone();
    let root = SVGBackend::new(&out_path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut panel = PanelSpec::new(title, "Days", y_desc);
    panel.traces = series
        .iter()
        .enumerate()
        .map(|(i, (country, s))| Trace::line(country.clone(), series_points(s), PALETTE[i % PALETTE.len()]))
        .collect();
    draw_panel(&root, &panel)?;

    root.present()
        .with_context(|| format!("write figure failed (path={:?})", svg_path))?;
    Ok(svg_path)
}
