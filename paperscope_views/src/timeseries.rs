//! Per-country trend lines with the movable current-year marker. In
//! growth mode the first year of every series is undefined and stays
//! out of both the drawn line and the y-domain.

use paperscope_rs::metrics::CountrySeries;
use paperscope_rs::scale::LinearScale;
use paperscope_rs::{ViewMode, END_YEAR, START_YEAR};

use crate::state::SelectionState;
use crate::svg::{self, Svg};

/// Comparison palette, assigned by position in the compared list and
/// shared with the controls and map secondary strokes.
pub const COUNTRY_COLORS: [&str; 6] = [
    "#22d3ee", "#f472b6", "#4ade80", "#fbbf24", "#a78bfa", "#fb7185",
];

pub fn comparison_color(ix: usize) -> &'static str {
    COUNTRY_COLORS[ix % COUNTRY_COLORS.len()]
}

const MARGIN_TOP: f64 = 20.0;
const MARGIN_RIGHT: f64 = 100.0;
const MARGIN_BOTTOM: f64 = 35.0;
const MARGIN_LEFT: f64 = 55.0;
const LEGEND_ROW_H: f64 = 22.0;

pub struct TimeSeriesView {
    width: f64,
    height: f64,
}

impl TimeSeriesView {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn inner(&self) -> (f64, f64) {
        (
            (self.width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
            (self.height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
        )
    }

    fn scales(&self, mode: ViewMode, series: &[CountrySeries]) -> (LinearScale, LinearScale) {
        let (iw, ih) = self.inner();
        let x = LinearScale::new((START_YEAR as f64, END_YEAR as f64), (0.0, iw));

        let defined: Vec<f64> = series
            .iter()
            .flat_map(|s| s.points.iter().filter_map(|p| p.value))
            .collect();
        let (y0, y1) = match mode {
            ViewMode::Growth => {
                let min = defined.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = defined.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let min = if min.is_finite() { min.min(0.0) } else { 0.0 };
                let max = if max.is_finite() { max } else { 50.0 };
                let pad = (max - min) * 0.1;
                (min - pad, max + pad)
            }
            ViewMode::Absolute => {
                let max = defined.iter().cloned().fold(0.0_f64, f64::max);
                (0.0, if max > 0.0 { max * 1.1 } else { 1.0 })
            }
        };
        let y = LinearScale::new((y0, y1), (ih, 0.0)).nice(5);
        (x, y)
    }

    /// Legend row hit test, for click-to-rehighlight.
    pub fn legend_at<'a>(&self, series: &'a [CountrySeries], x: f64, y: f64) -> Option<&'a str> {
        let (iw, _) = self.inner();
        let lx = MARGIN_LEFT + iw + 10.0;
        if x < lx || x > self.width {
            return None;
        }
        let row = ((y - MARGIN_TOP) / LEGEND_ROW_H).floor();
        if row < 0.0 {
            return None;
        }
        series.get(row as usize).map(|s| s.code.as_str())
    }

    /// Data-point hit test against the drawn dots.
    pub fn point_at<'a>(
        &self,
        state: &SelectionState,
        series: &'a [CountrySeries],
        x: f64,
        y: f64,
    ) -> Option<&'a str> {
        let (xs, ys) = self.scales(state.view_mode, series);
        for s in series {
            for p in &s.points {
                let Some(v) = p.value else { continue };
                let dx = MARGIN_LEFT + xs.scale(p.year as f64) - x;
                let dy = MARGIN_TOP + ys.scale(v) - y;
                if dx * dx + dy * dy <= 36.0 {
                    return Some(&s.code);
                }
            }
        }
        None
    }

    pub fn render(&self, state: &SelectionState, series: &[CountrySeries]) -> String {
        if series.is_empty() || series.iter().all(|s| s.points.is_empty()) {
            return svg::empty_state(
                self.width,
                self.height,
                "Click countries on the map to compare trends",
            );
        }
        let (iw, ih) = self.inner();
        let (xs, ys) = self.scales(state.view_mode, series);
        let mut doc = Svg::new(self.width, self.height);
        doc.open_group(&format!(
            "transform=\"translate({},{})\"",
            MARGIN_LEFT, MARGIN_TOP
        ));

        for tick in ys.ticks(5) {
            let ty = ys.scale(tick);
            doc.push(&svg::line(
                0.0,
                ty,
                iw,
                ty,
                "stroke=\"#1e2a45\" stroke-dasharray=\"2,4\"",
            ));
            doc.push(&svg::text(
                -8.0,
                ty + 3.0,
                "text-anchor=\"end\" fill=\"#94a3b8\" font-size=\"10\"",
                &tick_label(tick, state.view_mode),
            ));
        }
        if state.view_mode == ViewMode::Growth && ys.domain.0 < 0.0 {
            let zy = ys.scale(0.0);
            doc.push(&svg::line(0.0, zy, iw, zy, "stroke=\"#64748b\" stroke-width=\"1\""));
        }
        for tick in xs.ticks(8) {
            doc.push(&svg::text(
                xs.scale(tick),
                ih + 16.0,
                "text-anchor=\"middle\" fill=\"#94a3b8\" font-size=\"10\"",
                &format!("{:.0}", tick),
            ));
        }
        doc.push(&svg::line(0.0, ih, iw, ih, "stroke=\"#1e2a45\""));
        doc.push(&svg::text(
            -40.0,
            ih / 2.0,
            &format!(
                "transform=\"rotate(-90 {} {})\" text-anchor=\"middle\" fill=\"#94a3b8\" font-size=\"10\"",
                -40.0,
                ih / 2.0
            ),
            match state.view_mode {
                ViewMode::Growth => "YoY Growth Rate",
                ViewMode::Absolute => "Papers",
            },
        ));

        for (i, s) in series.iter().enumerate() {
            let color = comparison_color(i);
            let highlighted = state.selected_country.as_deref() == Some(s.code.as_str());
            let mut d = String::new();
            let mut pen_down = false;
            for p in &s.points {
                match p.value {
                    Some(v) => {
                        let cmd = if pen_down { 'L' } else { 'M' };
                        d.push_str(&format!(
                            "{}{:.2},{:.2}",
                            cmd,
                            xs.scale(p.year as f64),
                            ys.scale(v)
                        ));
                        pen_down = true;
                    }
                    // Undefined rows break the line instead of
                    // rendering as zero.
                    None => pen_down = false,
                }
            }
            doc.push(&svg::path(
                &d,
                &format!(
                    "stroke=\"{}\" stroke-width=\"{}\" stroke-opacity=\"{}\" fill=\"none\"",
                    color,
                    if highlighted { 3.0 } else { 2.0 },
                    if highlighted { 1.0 } else { 0.8 }
                ),
            ));
            for p in &s.points {
                let Some(v) = p.value else { continue };
                doc.push(&svg::circle(
                    xs.scale(p.year as f64),
                    ys.scale(v),
                    if highlighted { 4.0 } else { 3.0 },
                    &format!("fill=\"{}\" stroke=\"#0a0e1a\" stroke-width=\"1\"", color),
                ));
            }
        }

        self.render_year_marker(&mut doc, state, series, &xs, &ys, ih);
        self.render_legend(&mut doc, state, series, iw);

        doc.close_group();
        doc.finish()
    }

    fn render_year_marker(
        &self,
        doc: &mut Svg,
        state: &SelectionState,
        series: &[CountrySeries],
        xs: &LinearScale,
        ys: &LinearScale,
        ih: f64,
    ) {
        let year = state.selected_year;
        if !(START_YEAR..=END_YEAR).contains(&year) {
            return;
        }
        let mx = xs.scale(year as f64);
        doc.push(&svg::line(
            mx,
            0.0,
            mx,
            ih,
            "stroke=\"#f472b6\" stroke-width=\"2\" stroke-dasharray=\"4,4\" opacity=\"0.8\"",
        ));
        doc.push(&svg::text(
            mx,
            -5.0,
            "text-anchor=\"middle\" fill=\"#f472b6\" font-size=\"11\" font-weight=\"600\" font-family=\"JetBrains Mono, monospace\"",
            &year.to_string(),
        ));
        for (i, s) in series.iter().enumerate() {
            let marked = s
                .points
                .iter()
                .find(|p| p.year == year)
                .and_then(|p| p.value);
            if let Some(v) = marked {
                doc.push(&svg::circle(
                    mx,
                    ys.scale(v),
                    6.0,
                    &format!(
                        "fill=\"{}\" stroke=\"#fff\" stroke-width=\"2\"",
                        comparison_color(i)
                    ),
                ));
            }
        }
    }

    fn render_legend(
        &self,
        doc: &mut Svg,
        state: &SelectionState,
        series: &[CountrySeries],
        iw: f64,
    ) {
        for (i, s) in series.iter().enumerate() {
            let highlighted = state.selected_country.as_deref() == Some(s.code.as_str());
            let x = iw + 10.0;
            let y = i as f64 * LEGEND_ROW_H;
            doc.push(&svg::rect(
                x,
                y,
                12.0,
                12.0,
                &format!(
                    "rx=\"2\" fill=\"{}\" opacity=\"{}\"",
                    comparison_color(i),
                    if highlighted { 1.0 } else { 0.8 }
                ),
            ));
            let name = if s.name.chars().count() > 10 {
                let short: String = s.name.chars().take(10).collect();
                format!("{}…", short)
            } else {
                s.name.clone()
            };
            doc.push(&svg::text(
                x + 16.0,
                y + 10.0,
                &format!(
                    "fill=\"{}\" font-size=\"11\" font-weight=\"{}\" font-family=\"Space Grotesk, sans-serif\"",
                    if highlighted { "#e2e8f0" } else { "#94a3b8" },
                    if highlighted { 600 } else { 400 }
                ),
                &name,
            ));
        }
    }
}

fn tick_label(v: f64, mode: ViewMode) -> String {
    match mode {
        ViewMode::Growth => format!("{:.0}%", v),
        ViewMode::Absolute => {
            if v >= 1_000_000.0 {
                format!("{}M", trim(v / 1_000_000.0))
            } else if v >= 1_000.0 {
                format!("{}K", trim(v / 1_000.0))
            } else {
                trim(v)
            }
        }
    }
}

fn trim(v: f64) -> String {
    if v.fract().abs() < 1e-9 {
        format!("{:.0}", v)
    } else {
        format!("{}", v)
    }
}
