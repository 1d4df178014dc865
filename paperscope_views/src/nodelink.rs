//! Two-tier field/subfield graph view. Field nodes are always shown;
//! a subfield appears only while its parent field is expanded, and
//! links never anchor to invisible nodes.

use paperscope_rs::metrics::{compact_count, thousands};
use paperscope_rs::scale::{Rgb, SqrtScale};
use paperscope_rs::stowage::NodeLinkData;
use paperscope_rs::structs::{NodeKind, NodeLinkGraph};

use crate::force::{SimLink, Simulation};
use crate::state::SelectionState;
use crate::svg::{self, Svg};

pub const FIELD_RADIUS_RANGE: (f64, f64) = (25.0, 55.0);
pub const SUBFIELD_RADIUS_RANGE: (f64, f64) = (10.0, 30.0);

pub fn field_color(field: &str) -> &'static str {
    match field {
        "Computer Vision" => "#22d3ee",
        "Natural Language Processing" => "#f472b6",
        "Robotics" => "#4ade80",
        "Theory" => "#fbbf24",
        "Reinforcement Learning" => "#fbbf24",
        _ => "#64748b",
    }
}

pub fn field_label(field: &str) -> &str {
    match field {
        "Natural Language Processing" => "NLP",
        "Reinforcement Learning" => "RL",
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct VisibleNode {
    pub id: String,
    pub kind: NodeKind,
    pub count: u32,
    pub parent: Option<String>,
    pub radius: f64,
}

#[derive(Debug, Clone, Default)]
pub struct VisibleGraph {
    pub nodes: Vec<VisibleNode>,
    pub links: Vec<SimLink>,
}

/// Selects the drawable subset and sizes it. Radius scale domains
/// span *all* field or subfield counts, not just the visible subset,
/// so radii stay put across expand/collapse and year scrubbing.
pub fn visible_graph(graph: &NodeLinkGraph, expanded: &[String]) -> VisibleGraph {
    let max_of = |kind: NodeKind| {
        graph
            .nodes
            .iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.count)
            .max()
            .unwrap_or(1)
    };
    let field_scale = SqrtScale::new(max_of(NodeKind::Main) as f64, FIELD_RADIUS_RANGE);
    let sub_scale = SqrtScale::new(max_of(NodeKind::Sub) as f64, SUBFIELD_RADIUS_RANGE);

    let is_expanded = |field: &str| expanded.iter().any(|f| f == field);
    let nodes: Vec<VisibleNode> = graph
        .nodes
        .iter()
        .filter(|n| match n.kind {
            NodeKind::Main => true,
            NodeKind::Sub => n.parent.as_deref().map_or(false, |p| is_expanded(p)),
        })
        .map(|n| VisibleNode {
            id: n.id.clone(),
            kind: n.kind,
            count: n.count,
            parent: n.parent.clone(),
            radius: match n.kind {
                NodeKind::Main => field_scale.radius(n.count as f64),
                NodeKind::Sub => sub_scale.radius(n.count as f64),
            },
        })
        .collect();

    let index_of = |id: &str| nodes.iter().position(|n| n.id == id);
    let links = graph
        .links
        .iter()
        .filter(|l| is_expanded(&l.source))
        .filter_map(|l| {
            Some(SimLink {
                source: index_of(&l.source)?,
                target: index_of(&l.target)?,
            })
        })
        .collect();

    VisibleGraph { nodes, links }
}

/// What a click on a graph node means for the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphClick {
    ToggleField(String),
    SelectSubfield(String),
}

#[derive(Debug, Clone, PartialEq)]
struct LayoutKey {
    country: String,
    year: u16,
    expanded: Vec<String>,
    width_px: i64,
    height_px: i64,
}

/// Owns the current layout and its simulation. Any change of graph
/// data, visible set or viewport stops the old simulation before the
/// replacement starts.
pub struct GraphView {
    width: f64,
    height: f64,
    visible: VisibleGraph,
    sim: Option<Simulation>,
    key: Option<LayoutKey>,
    hovered: Option<usize>,
}

impl GraphView {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            visible: VisibleGraph::default(),
            sim: None,
            key: None,
            hovered: None,
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        if let Some(sim) = self.sim.as_mut() {
            sim.stop();
        }
        self.sim = None;
        self.key = None;
        self.hovered = None;
    }

    /// Rebuilds the layout when the (country, year, expansion, size)
    /// key moved; otherwise leaves the settled simulation alone.
    pub fn sync(&mut self, node_link: &NodeLinkData, state: &SelectionState) {
        let Some(country) = state.selected_country.as_deref() else {
            self.invalidate();
            self.visible = VisibleGraph::default();
            return;
        };
        let key = LayoutKey {
            country: country.to_string(),
            year: state.selected_year,
            expanded: state.expanded_fields.clone(),
            width_px: (self.width * 10.0) as i64,
            height_px: (self.height * 10.0) as i64,
        };
        if self.key.as_ref() == Some(&key) {
            return;
        }
        self.invalidate();

        let graph = node_link
            .get(country)
            .and_then(|g| g.for_year(state.selected_year));
        self.visible = match graph {
            Some(g) => visible_graph(g, &state.expanded_fields),
            None => VisibleGraph::default(),
        };
        if !self.visible.nodes.is_empty() {
            let radii: Vec<f64> = self.visible.nodes.iter().map(|n| n.radius).collect();
            let mut sim =
                Simulation::new(&radii, self.visible.links.clone(), self.width, self.height);
            sim.settle();
            self.sim = Some(sim);
        }
        self.key = Some(key);
    }

    pub fn visible(&self) -> &VisibleGraph {
        &self.visible
    }

    pub fn simulation_mut(&mut self) -> Option<&mut Simulation> {
        self.sim.as_mut()
    }

    pub fn node_at(&self, x: f64, y: f64) -> Option<usize> {
        let sim = self.sim.as_ref()?;
        // Topmost (last drawn) wins on overlap.
        sim.nodes()
            .iter()
            .enumerate()
            .rev()
            .find(|(_, n)| {
                let dx = n.x - x;
                let dy = n.y - y;
                dx * dx + dy * dy <= n.radius * n.radius
            })
            .map(|(i, _)| i)
    }

    pub fn hover(&mut self, node: Option<usize>) {
        self.hovered = node.filter(|&i| i < self.visible.nodes.len());
    }

    pub fn click(&self, ix: usize) -> Option<GraphClick> {
        let node = self.visible.nodes.get(ix)?;
        Some(match node.kind {
            NodeKind::Main => GraphClick::ToggleField(node.id.clone()),
            NodeKind::Sub => GraphClick::SelectSubfield(node.id.clone()),
        })
    }

    pub fn total_field_papers(&self) -> u64 {
        self.visible
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Main)
            .map(|n| n.count as u64)
            .sum()
    }

    pub fn render(&self, state: &SelectionState) -> String {
        if state.selected_country.is_none() {
            return svg::empty_state(self.width, self.height, "Select a country to explore");
        }
        let Some(sim) = self.sim.as_ref() else {
            return svg::empty_state(self.width, self.height, "No field data for this year");
        };

        let mut doc = Svg::new(self.width, self.height);
        let positions = sim.nodes();

        for link in &self.visible.links {
            let s = &positions[link.source];
            let t = &positions[link.target];
            let color = field_color(&self.visible.nodes[link.source].id);
            let d = format!(
                "M{:.2},{:.2}Q{:.2},{:.2} {:.2},{:.2}",
                s.x,
                s.y,
                (s.x + t.x) / 2.0,
                (s.y + t.y) / 2.0 - 20.0,
                t.x,
                t.y
            );
            doc.push(&svg::path(
                &d,
                &format!(
                    "stroke=\"{}\" stroke-width=\"1.5\" stroke-opacity=\"0.4\" fill=\"none\"",
                    color
                ),
            ));
        }

        for (i, node) in self.visible.nodes.iter().enumerate() {
            let pos = &positions[i];
            match node.kind {
                NodeKind::Main => self.render_field(&mut doc, state, node, pos.x, pos.y),
                NodeKind::Sub => self.render_subfield(&mut doc, state, node, pos.x, pos.y),
            }
        }

        doc.push(&svg::text(
            self.width - 8.0,
            12.0,
            "text-anchor=\"end\" fill=\"#64748b\" font-size=\"10\" font-family=\"JetBrains Mono, monospace\"",
            &format!(
                "{} · {} papers",
                state.selected_year,
                thousands(self.total_field_papers())
            ),
        ));
        let hint = if state.expanded_fields.is_empty() {
            "Click node to expand".to_string()
        } else {
            state.expanded_fields.join(", ")
        };
        doc.push(&svg::text(
            8.0,
            self.height - 4.0,
            "fill=\"#64748b\" font-size=\"9\" opacity=\"0.7\"",
            &hint,
        ));

        if let Some(hix) = self.hovered {
            self.render_tooltip(&mut doc, state, hix);
        }
        doc.finish()
    }

    fn render_field(
        &self,
        doc: &mut Svg,
        state: &SelectionState,
        node: &VisibleNode,
        x: f64,
        y: f64,
    ) {
        let color = field_color(&node.id);
        let expanded = state.is_expanded(&node.id);
        let (opacity, stroke, stroke_w) = if expanded {
            (1.0, "#fff", 3.0)
        } else {
            (0.7, color, 1.5)
        };
        doc.push(&svg::circle(
            x,
            y,
            node.radius,
            &format!(
                "fill=\"{}\" fill-opacity=\"{}\" stroke=\"{}\" stroke-width=\"{}\"",
                color, opacity, stroke, stroke_w
            ),
        ));
        doc.push(&svg::text(
            x,
            y + node.radius + 12.0,
            "text-anchor=\"middle\" fill=\"#e2e8f0\" font-size=\"9\"",
            field_label(&node.id),
        ));
        if node.count > 0 {
            let size = (node.radius * 0.3).max(8.0);
            doc.push(&svg::text(
                x,
                y + 4.0,
                &format!(
                    "text-anchor=\"middle\" fill=\"#0a0e1a\" font-size=\"{:.0}\" font-weight=\"600\"",
                    size
                ),
                &compact_count(node.count as u64),
            ));
        }
    }

    fn render_subfield(
        &self,
        doc: &mut Svg,
        state: &SelectionState,
        node: &VisibleNode,
        x: f64,
        y: f64,
    ) {
        let parent_color = node
            .parent
            .as_deref()
            .map(field_color)
            .unwrap_or("#64748b");
        let fill = Rgb::parse(parent_color)
            .map(|c| c.brighter(0.6).hex())
            .unwrap_or_else(|| parent_color.to_string());
        let selected = state.selected_subfield.as_deref() == Some(node.id.as_str());
        let stroke = if selected {
            "stroke=\"#fff\" stroke-width=\"2\""
        } else {
            "stroke=\"none\""
        };
        doc.push(&svg::circle(
            x,
            y,
            node.radius,
            &format!(
                "fill=\"{}\" fill-opacity=\"{}\" {}",
                fill,
                if selected { 1.0 } else { 0.7 },
                stroke
            ),
        ));
        let label = if node.id.chars().count() > 12 {
            let short: String = node.id.chars().take(11).collect();
            format!("{}…", short)
        } else {
            node.id.clone()
        };
        doc.push(&svg::text(
            x,
            y + node.radius + 10.0,
            "text-anchor=\"middle\" fill=\"#94a3b8\" font-size=\"7\"",
            &label,
        ));
        if node.count > 0 {
            let size = (node.radius * 0.35).max(6.0);
            doc.push(&svg::text(
                x,
                y + 3.0,
                &format!(
                    "text-anchor=\"middle\" fill=\"#0a0e1a\" font-size=\"{:.0}\" font-weight=\"600\"",
                    size
                ),
                &compact_count(node.count as u64),
            ));
        }
    }

    fn render_tooltip(&self, doc: &mut Svg, state: &SelectionState, ix: usize) {
        let Some(node) = self.visible.nodes.get(ix) else {
            return;
        };
        let Some(pos) = self.sim.as_ref().map(|s| &s.nodes()[ix]) else {
            return;
        };
        let mut lines = vec![
            node.id.clone(),
            format!("{} papers", thousands(node.count as u64)),
        ];
        if node.kind == NodeKind::Main {
            let verb = if state.is_expanded(&node.id) {
                "collapse"
            } else {
                "expand"
            };
            lines.push(format!("Click to {}", verb));
        }
        let w = 10.0 + 6.2 * lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as f64;
        let h = 8.0 + 14.0 * lines.len() as f64;
        let x = (pos.x + 10.0).min(self.width - w - 4.0).max(4.0);
        let y = (pos.y - node.radius - h - 4.0).max(4.0);
        doc.push(&svg::rect(
            x,
            y,
            w,
            h,
            "fill=\"rgba(10,14,26,0.95)\" stroke=\"#1e2a45\" rx=\"4\"",
        ));
        for (i, l) in lines.iter().enumerate() {
            doc.push(&svg::text(
                x + 5.0,
                y + 14.0 * (i + 1) as f64,
                "fill=\"#e2e8f0\" font-size=\"11\"",
                l,
            ));
        }
    }
}
