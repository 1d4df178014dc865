//! Choropleth world map: projection, per-feature encoding from the
//! active scale and selection state, hover/click hit testing, legend
//! and tooltip.

use hashbrown::HashMap;

use paperscope_rs::geo::{resolve_code, resolve_name};
use paperscope_rs::metrics::thousands;
use paperscope_rs::project::{ring_contains, Projection};
use paperscope_rs::scale::ColorScale;
use paperscope_rs::structs::CountrySummary;
use paperscope_rs::topo::{Feature, Topology};
use paperscope_rs::ViewMode;

use crate::state::SelectionState;
use crate::svg::{self, Svg};

const BG_COLOR: &str = "#0a0e1a";
const GRID_COLOR: &str = "#1e2a45";
const SELECTED_STROKE: &str = "#f472b6";
const COMPARED_STROKE: &str = "#22d3ee";
const DEFAULT_STROKE: &str = "#1e2a45";

const LEGEND_W: f64 = 180.0;
const LEGEND_H: f64 = 12.0;

// Fallback extent while the tooltip box is unmeasured, as in the
// source renderer.
const TOOLTIP_W: f64 = 180.0;
const TOOLTIP_H: f64 = 100.0;

struct MapFeature {
    code: Option<&'static str>,
    name: String,
    path: String,
    rings: Vec<Vec<[f64; 2]>>,
}

/// The projected map for one viewport size. Reprojection happens only
/// on resize; renders just rebind fills and strokes.
pub struct MapView {
    width: f64,
    height: f64,
    raw: Vec<Feature>,
    names: HashMap<String, String>,
    features: Vec<MapFeature>,
    graticule: String,
    hovered: Option<usize>,
    pointer: (f64, f64),
    render_pass: u64,
}

impl MapView {
    pub fn new(world: &Topology, names: HashMap<String, String>, width: f64, height: f64) -> Self {
        let raw = world.features("countries");
        let mut view = Self {
            width,
            height,
            raw,
            names,
            features: Vec::new(),
            graticule: String::new(),
            hovered: None,
            pointer: (0.0, 0.0),
            render_pass: 0,
        };
        view.project();
        view
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.hovered = None;
            self.project();
        }
    }

    fn project(&mut self) {
        let projection =
            Projection::fit_size((self.width - 20.0).max(1.0), (self.height - 50.0).max(1.0), &self.raw);
        self.features = self
            .raw
            .iter()
            .map(|f| MapFeature {
                code: resolve_code(f),
                name: resolve_name(f, &self.names),
                path: projection.feature_path(f),
                rings: projection.project_rings(f),
            })
            .collect();
        self.graticule = projection.graticule_path();
    }

    /// Topmost feature under the pointer; even-odd across rings so
    /// holes behave.
    pub fn feature_at(&self, x: f64, y: f64) -> Option<usize> {
        self.features.iter().enumerate().rev().find_map(|(i, f)| {
            let mut inside = false;
            for ring in &f.rings {
                if ring_contains(ring, x, y) {
                    inside = !inside;
                }
            }
            inside.then_some(i)
        })
    }

    /// Pointer-move handler: tracks the hovered feature and publishes
    /// the hovered country code (unresolvable features stay out of
    /// country resolution but still get a tooltip).
    pub fn pointer_move(&mut self, x: f64, y: f64, state: &mut SelectionState) {
        self.pointer = (x, y);
        let hit = self.feature_at(x, y);
        if hit != self.hovered {
            self.hovered = hit;
            let code = hit.and_then(|i| self.features[i].code);
            state.hover_country(code);
        }
    }

    /// Pointer-leave: the restored stroke is recomputed from whatever
    /// the selection is *now*, because renders always derive strokes
    /// from current state rather than caching the enter-time style.
    pub fn pointer_leave(&mut self, state: &mut SelectionState) {
        self.hovered = None;
        state.hover_country(None);
    }

    /// Click dispatch. A feature click never falls through to the
    /// background-clear handler; clicking the already selected country
    /// deselects it; background clicks clear everything.
    pub fn click(&mut self, x: f64, y: f64, state: &mut SelectionState) {
        match self.feature_at(x, y) {
            Some(i) => {
                if let Some(code) = self.features[i].code {
                    state.select_country(code);
                }
            }
            None => state.clear_selection(),
        }
    }

    fn stroke_for(&self, state: &SelectionState, ix: usize, hovered: bool) -> (&'static str, f64) {
        if hovered {
            return (COMPARED_STROKE, 2.0);
        }
        match self.features[ix].code {
            Some(code) if state.selected_country.as_deref() == Some(code) => {
                (SELECTED_STROKE, 2.0)
            }
            Some(code) if state.is_compared(code) => (COMPARED_STROKE, 1.5),
            _ => (DEFAULT_STROKE, 0.5),
        }
    }

    fn fill_for(
        &self,
        state: &SelectionState,
        scale: &ColorScale,
        snapshot: &HashMap<String, u32>,
        growth: &HashMap<String, f64>,
        ix: usize,
    ) -> String {
        let no_data = ColorScale::no_data_color().hex();
        let Some(code) = self.features[ix].code else {
            return no_data;
        };
        match state.view_mode {
            ViewMode::Growth => match growth.get(code) {
                Some(g) => scale.color(*g).hex(),
                None => no_data,
            },
            ViewMode::Absolute => match snapshot.get(code) {
                Some(&papers) if papers > 0 => scale.color(papers as f64).hex(),
                _ => no_data,
            },
        }
    }

    pub fn render(
        &mut self,
        state: &SelectionState,
        scale: &ColorScale,
        snapshot: &HashMap<String, u32>,
        growth: &HashMap<String, f64>,
        summary: &[CountrySummary],
    ) -> String {
        self.render_pass += 1;
        let mut doc = Svg::new(self.width, self.height);
        doc.push(&svg::rect(
            0.0,
            0.0,
            self.width,
            self.height,
            &format!("fill=\"{}\"", BG_COLOR),
        ));
        doc.push(&svg::path(
            &self.graticule,
            &format!("fill=\"none\" stroke=\"{}\" stroke-width=\"0.3\"", GRID_COLOR),
        ));

        // Hovered feature drawn last: raised z-order under hover.
        let order = (0..self.features.len())
            .filter(|i| Some(*i) != self.hovered)
            .chain(self.hovered);
        for i in order {
            let hovered = Some(i) == self.hovered;
            let (stroke, stroke_w) = self.stroke_for(state, i, hovered);
            let fill = self.fill_for(state, scale, snapshot, growth, i);
            doc.push(&svg::path(
                &self.features[i].path,
                &format!(
                    "fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"",
                    fill, stroke, stroke_w
                ),
            ));
        }

        self.render_legend(&mut doc, state, scale, snapshot);
        if state.selected_country.is_some() || !state.compared_countries.is_empty() {
            doc.push(&svg::text(
                8.0,
                self.height - 8.0,
                "fill=\"#64748b\" font-size=\"10\" font-family=\"JetBrains Mono, monospace\"",
                "Click empty area to clear selection",
            ));
        }
        if let Some(hix) = self.hovered {
            self.render_tooltip(&mut doc, state, snapshot, growth, summary, hix);
        }
        doc.finish()
    }

    fn render_legend(
        &self,
        doc: &mut Svg,
        state: &SelectionState,
        scale: &ColorScale,
        snapshot: &HashMap<String, u32>,
    ) {
        let x = self.width - LEGEND_W - 20.0;
        let y = self.height - 40.0;

        // Unique per render pass so a mode flip without remount never
        // reuses a stale gradient definition.
        let gradient_id = format!(
            "legend-gradient-{}-{}",
            match state.view_mode {
                ViewMode::Absolute => "absolute",
                ViewMode::Growth => "growth",
            },
            self.render_pass
        );
        let stops: String = scale
            .legend_stops()
            .iter()
            .map(|(offset, color)| {
                format!(
                    "<stop offset=\"{:.0}%\" stop-color=\"{}\"/>",
                    offset * 100.0,
                    color.hex()
                )
            })
            .collect();
        doc.push_def(&format!(
            "<linearGradient id=\"{}\" x1=\"0%\" x2=\"100%\">{}</linearGradient>",
            gradient_id, stops
        ));
        doc.push(&svg::rect(
            x,
            y,
            LEGEND_W,
            LEGEND_H,
            &format!("fill=\"url(#{})\" rx=\"2\"", gradient_id),
        ));

        let mono = "fill=\"#94a3b8\" font-size=\"10\" font-family=\"JetBrains Mono, monospace\"";
        let (lo, hi, caption) = match state.view_mode {
            ViewMode::Growth => (
                "-30%".to_string(),
                "+60%".to_string(),
                "Year-over-Year Growth",
            ),
            ViewMode::Absolute => (
                "0".to_string(),
                snapshot
                    .values()
                    .max()
                    .map(|m| thousands(*m as u64))
                    .unwrap_or_default(),
                "Paper Count (log scale)",
            ),
        };
        doc.push(&svg::text(x, y - 5.0, mono, &lo));
        doc.push(&svg::text(
            x + LEGEND_W,
            y - 5.0,
            &format!("text-anchor=\"end\" {}", mono),
            &hi,
        ));
        doc.push(&svg::text(
            x + LEGEND_W / 2.0,
            y + LEGEND_H + 12.0,
            "text-anchor=\"middle\" fill=\"#64748b\" font-size=\"9\" font-family=\"Space Grotesk, sans-serif\"",
            caption,
        ));
    }

    fn render_tooltip(
        &self,
        doc: &mut Svg,
        state: &SelectionState,
        snapshot: &HashMap<String, u32>,
        growth: &HashMap<String, f64>,
        summary: &[CountrySummary],
        ix: usize,
    ) {
        let feature = &self.features[ix];
        let papers = feature.code.and_then(|c| snapshot.get(c));
        let growth_pct = feature.code.and_then(|c| growth.get(c));
        let total = feature
            .code
            .and_then(|c| summary.iter().find(|s| s.country_code == c))
            .map(|s| s.total_papers);

        let mut lines = vec![feature.name.clone()];
        lines.push(format!(
            "Papers ({}): {}",
            state.selected_year,
            papers.map_or("N/A".to_string(), |p| thousands(*p as u64))
        ));
        if let Some(g) = growth_pct {
            lines.push(format!("YoY Growth: {}{:.1}%", if *g >= 0.0 { "+" } else { "" }, g));
        }
        if let Some(t) = total {
            lines.push(format!("Total Papers: {}", thousands(t)));
        }

        let (px, py) = self.pointer;
        let mut left = px + 15.0;
        let mut top = py + 15.0;
        if left + TOOLTIP_W > self.width - 10.0 {
            left = px - TOOLTIP_W - 15.0;
        }
        if top + TOOLTIP_H > self.height - 10.0 {
            top = py - TOOLTIP_H - 15.0;
        }
        left = left.max(10.0);
        top = top.max(10.0);

        doc.push(&svg::rect(
            left,
            top,
            TOOLTIP_W,
            14.0 + 16.0 * lines.len() as f64,
            "fill=\"rgba(10,14,26,0.95)\" stroke=\"#1e2a45\" rx=\"4\"",
        ));
        for (i, line) in lines.iter().enumerate() {
            let attrs = if i == 0 {
                "fill=\"#e2e8f0\" font-size=\"12\" font-weight=\"600\""
            } else {
                "fill=\"#94a3b8\" font-size=\"11\""
            };
            doc.push(&svg::text(
                left + 8.0,
                top + 18.0 + 16.0 * i as f64,
                attrs,
                line,
            ));
        }
    }
}
