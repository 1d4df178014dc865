//! The coordinator. Owns the archive handle, the shared selection
//! state, the three panel views and the playback timer, and routes
//! every interaction through the state transitions so the panels stay
//! consistent with each other.

use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;

use paperscope_rs::metrics::{
    growth_for_year, series_for_countries, snapshot_for_year, CountrySeries,
};
use paperscope_rs::scale::ColorScale;
use paperscope_rs::stowage::Archive;
use paperscope_rs::{ViewMode, END_YEAR, START_YEAR};

use crate::map::MapView;
use crate::nodelink::{GraphClick, GraphView};
use crate::player::{next_loop_year, Autoplay, SPEED_PRESETS_MS};
use crate::state::SelectionState;
use crate::timeseries::TimeSeriesView;

pub struct PanelSizes {
    pub map: (f64, f64),
    pub graph: (f64, f64),
    pub series: (f64, f64),
}

impl Default for PanelSizes {
    fn default() -> Self {
        Self {
            map: (860.0, 520.0),
            graph: (420.0, 380.0),
            series: (860.0, 300.0),
        }
    }
}

pub struct Dashboard {
    archive: Arc<Archive>,
    pub state: SelectionState,
    map: MapView,
    graph: GraphView,
    series: TimeSeriesView,
    autoplay: Option<Autoplay>,
    speed_ix: usize,
}

impl Dashboard {
    pub fn new(archive: Arc<Archive>, sizes: PanelSizes) -> Self {
        let map = MapView::new(
            &archive.world,
            archive.country_names(),
            sizes.map.0,
            sizes.map.1,
        );
        Self {
            archive,
            state: SelectionState::default(),
            map,
            graph: GraphView::new(sizes.graph.0, sizes.graph.1),
            series: TimeSeriesView::new(sizes.series.0, sizes.series.1),
            autoplay: None,
            speed_ix: 1,
        }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn resize_map(&mut self, width: f64, height: f64) {
        self.map.resize(width, height);
    }

    pub fn resize_graph(&mut self, width: f64, height: f64) {
        self.graph.resize(width, height);
    }

    pub fn resize_series(&mut self, width: f64, height: f64) {
        self.series.resize(width, height);
    }

    fn snapshot(&self) -> HashMap<String, u32> {
        snapshot_for_year(
            &self.archive.country_year,
            &self.archive.subfield,
            self.state.selected_year,
            self.state.selected_subfield.as_deref(),
        )
    }

    fn growth(&self) -> HashMap<String, f64> {
        growth_for_year(&self.archive.country_year, self.state.selected_year)
    }

    fn color_scale(&self, snapshot: &HashMap<String, u32>) -> ColorScale {
        match self.state.view_mode {
            ViewMode::Absolute => ColorScale::for_counts(snapshot.values().copied()),
            ViewMode::Growth => ColorScale::for_growth(),
        }
    }

    /// One series per compared country, comparison order, with the
    /// subfield cross-filter applied when one is active.
    pub fn comparison_series(&self) -> Vec<CountrySeries> {
        let codes = &self.state.compared_countries;
        let mut series = match self.state.selected_subfield.as_deref() {
            Some(sf) if !self.archive.subfield.is_empty() => {
                let slice: Vec<_> = self
                    .archive
                    .subfield
                    .iter()
                    .filter(|r| r.subfield == sf)
                    .collect();
                series_for_countries(&slice, codes, self.state.view_mode)
            }
            _ => series_for_countries(&self.archive.country_year, codes, self.state.view_mode),
        };
        // Subfield rows carry no display name; backfill from the
        // summary so legends never regress to bare codes.
        for s in &mut series {
            if let Some(summary) = self.archive.summary_for(&s.code) {
                s.name = summary.country.clone();
            }
        }
        series
    }

    pub fn render_map(&mut self) -> String {
        let snapshot = self.snapshot();
        let growth = self.growth();
        let scale = self.color_scale(&snapshot);
        self.map.render(
            &self.state,
            &scale,
            &snapshot,
            &growth,
            &self.archive.summary,
        )
    }

    pub fn render_graph(&mut self) -> String {
        self.graph.sync(&self.archive.node_link, &self.state);
        self.graph.render(&self.state)
    }

    pub fn render_series(&self) -> String {
        self.series.render(&self.state, &self.comparison_series())
    }

    pub fn map_pointer_move(&mut self, x: f64, y: f64) {
        self.map.pointer_move(x, y, &mut self.state);
    }

    pub fn map_pointer_leave(&mut self) {
        self.map.pointer_leave(&mut self.state);
    }

    pub fn map_click(&mut self, x: f64, y: f64) {
        self.map.click(x, y, &mut self.state);
    }

    pub fn graph_pointer_move(&mut self, x: f64, y: f64) {
        self.graph.sync(&self.archive.node_link, &self.state);
        let hit = self.graph.node_at(x, y);
        self.graph.hover(hit);
    }

    pub fn graph_click(&mut self, x: f64, y: f64) {
        self.graph.sync(&self.archive.node_link, &self.state);
        let Some(ix) = self.graph.node_at(x, y) else {
            return;
        };
        match self.graph.click(ix) {
            Some(GraphClick::ToggleField(field)) => self.state.toggle_field(&field),
            Some(GraphClick::SelectSubfield(sub)) => self.state.select_subfield(&sub),
            None => {}
        }
    }

    pub fn graph_drag_start(&mut self, x: f64, y: f64) -> Option<usize> {
        self.graph.sync(&self.archive.node_link, &self.state);
        let ix = self.graph.node_at(x, y)?;
        self.graph.simulation_mut()?.drag_start(ix);
        Some(ix)
    }

    pub fn graph_drag_to(&mut self, ix: usize, x: f64, y: f64) {
        if let Some(sim) = self.graph.simulation_mut() {
            sim.drag_to(ix, x, y);
            sim.step();
        }
    }

    pub fn graph_drag_end(&mut self, ix: usize) {
        if let Some(sim) = self.graph.simulation_mut() {
            sim.drag_end(ix);
        }
    }

    /// Click in the trend panel: a legend row or a data point both
    /// re-route selection to that country.
    pub fn series_click(&mut self, x: f64, y: f64) {
        let series = self.comparison_series();
        let hit = self
            .series
            .legend_at(&series, x, y)
            .or_else(|| self.series.point_at(&self.state, &series, x, y))
            .map(str::to_string);
        if let Some(code) = hit {
            self.state.select_country(&code);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.autoplay.is_some()
    }

    /// Play/pause toggle. Starting at the final year rewinds first so
    /// the sweep always has somewhere to go.
    pub fn toggle_play(&mut self) {
        if self.autoplay.take().is_some() {
            return;
        }
        if self.state.selected_year >= END_YEAR {
            self.state.set_year(START_YEAR);
        }
        self.autoplay = Some(Autoplay::start(self.interval()));
    }

    pub fn set_speed(&mut self, ix: usize) {
        self.speed_ix = ix.min(SPEED_PRESETS_MS.len() - 1);
        if self.autoplay.is_some() {
            self.autoplay = Some(Autoplay::start(self.interval()));
        }
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(SPEED_PRESETS_MS[self.speed_ix])
    }

    /// Called from the event loop; advances the playhead when the
    /// timer fired. Playback loops until toggled off.
    pub fn poll(&mut self) {
        let ticked = self.autoplay.as_ref().map_or(false, |a| a.try_tick());
        if ticked {
            self.state.set_year(next_loop_year(self.state.selected_year));
        }
    }
}
