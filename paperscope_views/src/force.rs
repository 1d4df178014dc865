//! Velocity-Verlet force simulation for the field/subfield graph:
//! link attraction, many-body repulsion, centering and radius-aware
//! collision, with per-step viewport clamping. A simulation is an
//! owned, explicitly stoppable resource; a stopped simulation never
//! moves a node again.

use rand::{rngs::SmallRng, Rng, SeedableRng};

pub const LINK_DISTANCE: f64 = 70.0;
pub const LINK_STRENGTH: f64 = 0.6;
pub const CHARGE_STRENGTH: f64 = -200.0;
pub const COLLIDE_PADDING: f64 = 8.0;
/// Margin reserved for node labels along the bottom edge.
pub const LABEL_MARGIN: f64 = 25.0;
pub const EDGE_MARGIN: f64 = 5.0;

const ALPHA_MIN: f64 = 0.001;
const VELOCITY_DECAY: f64 = 0.6;
const INITIAL_RADIUS: f64 = 10.0;
const MAX_TICKS: usize = 300;

#[derive(Debug, Clone)]
pub struct SimNode {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Pin position while dragging; `None` releases the node.
    pub fx: Option<f64>,
    pub fy: Option<f64>,
    pub radius: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
}

pub struct Simulation {
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    degree: Vec<usize>,
    alpha: f64,
    alpha_target: f64,
    alpha_decay: f64,
    width: f64,
    height: f64,
    stopped: bool,
    rng: SmallRng,
}

impl Simulation {
    /// Nodes start on a phyllotaxis spiral around the viewport center
    /// so the layout is deterministic up to coincident-point jiggle.
    pub fn new(radii: &[f64], links: Vec<SimLink>, width: f64, height: f64) -> Self {
        let initial_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
        let nodes = radii
            .iter()
            .enumerate()
            .map(|(i, &radius)| {
                let r = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
                let a = i as f64 * initial_angle;
                SimNode {
                    x: width / 2.0 + r * a.cos(),
                    y: height / 2.0 + r * a.sin(),
                    vx: 0.0,
                    vy: 0.0,
                    fx: None,
                    fy: None,
                    radius,
                }
            })
            .collect::<Vec<_>>();
        let mut degree = vec![0usize; nodes.len()];
        for l in &links {
            degree[l.source] += 1;
            degree[l.target] += 1;
        }
        Self {
            nodes,
            links,
            degree,
            alpha: 1.0,
            alpha_target: 0.0,
            alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / MAX_TICKS as f64),
            width,
            height,
            stopped: false,
            rng: SmallRng::seed_from_u64(0x5eed),
        }
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// One tick. Returns false once the simulation has cooled below
    /// the alpha floor or was stopped.
    pub fn step(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        self.apply_links();
        self.apply_charge();
        self.apply_center();
        self.apply_collide();
        self.integrate();
        if self.alpha < ALPHA_MIN && self.alpha_target < ALPHA_MIN {
            self.stopped = true;
        }
        !self.stopped
    }

    /// Runs the cooling schedule to completion.
    pub fn settle(&mut self) {
        let mut ticks = 0;
        while self.step() && ticks < MAX_TICKS {
            ticks += 1;
        }
    }

    /// Releases the simulation; must be called before a replacement
    /// starts on new data or a new viewport.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn drag_start(&mut self, ix: usize) {
        if let Some(node) = self.nodes.get_mut(ix) {
            node.fx = Some(node.x);
            node.fy = Some(node.y);
        }
        self.alpha_target = 0.3;
        self.restart();
    }

    pub fn drag_to(&mut self, ix: usize, x: f64, y: f64) {
        if let Some(node) = self.nodes.get_mut(ix) {
            node.fx = Some(x);
            node.fy = Some(y);
        }
    }

    pub fn drag_end(&mut self, ix: usize) {
        if let Some(node) = self.nodes.get_mut(ix) {
            node.fx = None;
            node.fy = None;
        }
        self.alpha_target = 0.0;
    }

    fn restart(&mut self) {
        if self.alpha < 0.3 {
            self.alpha = 0.3;
        }
        self.stopped = false;
    }

    fn jiggle(&mut self) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * 1e-6
    }

    fn apply_links(&mut self) {
        for li in 0..self.links.len() {
            let SimLink { source, target } = self.links[li];
            let mut dx = self.nodes[target].x + self.nodes[target].vx
                - self.nodes[source].x
                - self.nodes[source].vx;
            let mut dy = self.nodes[target].y + self.nodes[target].vy
                - self.nodes[source].y
                - self.nodes[source].vy;
            if dx == 0.0 && dy == 0.0 {
                dx = self.jiggle();
                dy = self.jiggle();
            }
            let len = (dx * dx + dy * dy).sqrt();
            let l = (len - LINK_DISTANCE) / len * self.alpha * LINK_STRENGTH;
            let bias =
                self.degree[source] as f64 / (self.degree[source] + self.degree[target]) as f64;
            self.nodes[target].vx -= dx * l * bias;
            self.nodes[target].vy -= dy * l * bias;
            self.nodes[source].vx += dx * l * (1.0 - bias);
            self.nodes[source].vy += dy * l * (1.0 - bias);
        }
    }

    // Pairwise is plenty here; the graph tops out at a few dozen
    // nodes, no Barnes-Hut needed.
    fn apply_charge(&mut self) {
        for i in 0..self.nodes.len() {
            for j in (i + 1)..self.nodes.len() {
                let mut dx = self.nodes[j].x - self.nodes[i].x;
                let mut dy = self.nodes[j].y - self.nodes[i].y;
                if dx == 0.0 && dy == 0.0 {
                    dx = self.jiggle();
                    dy = self.jiggle();
                }
                let d2 = dx * dx + dy * dy;
                let w = CHARGE_STRENGTH * self.alpha / d2;
                self.nodes[i].vx -= dx * w;
                self.nodes[i].vy -= dy * w;
                self.nodes[j].vx += dx * w;
                self.nodes[j].vy += dy * w;
            }
        }
    }

    fn apply_center(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        let n = self.nodes.len() as f64;
        let sx = self.nodes.iter().map(|d| d.x).sum::<f64>() / n - self.width / 2.0;
        let sy = self.nodes.iter().map(|d| d.y).sum::<f64>() / n - self.height / 2.0;
        for node in &mut self.nodes {
            node.x -= sx;
            node.y -= sy;
        }
    }

    fn apply_collide(&mut self) {
        for i in 0..self.nodes.len() {
            for j in (i + 1)..self.nodes.len() {
                let ri = self.nodes[i].radius + COLLIDE_PADDING;
                let rj = self.nodes[j].radius + COLLIDE_PADDING;
                let r = ri + rj;
                let mut dx = (self.nodes[i].x + self.nodes[i].vx)
                    - (self.nodes[j].x + self.nodes[j].vx);
                let mut dy = (self.nodes[i].y + self.nodes[i].vy)
                    - (self.nodes[j].y + self.nodes[j].vy);
                let mut l2 = dx * dx + dy * dy;
                if l2 >= r * r {
                    continue;
                }
                if l2 == 0.0 {
                    dx = self.jiggle();
                    dy = self.jiggle();
                    l2 = dx * dx + dy * dy;
                }
                let len = l2.sqrt();
                let d = (r - len) / len;
                let wj = rj * rj / (ri * ri + rj * rj);
                self.nodes[i].vx += dx * d * wj;
                self.nodes[i].vy += dy * d * wj;
                self.nodes[j].vx -= dx * d * (1.0 - wj);
                self.nodes[j].vy -= dy * d * (1.0 - wj);
            }
        }
    }

    fn integrate(&mut self) {
        for node in &mut self.nodes {
            match (node.fx, node.fy) {
                (Some(fx), Some(fy)) => {
                    node.x = fx;
                    node.y = fy;
                    node.vx = 0.0;
                    node.vy = 0.0;
                }
                _ => {
                    node.vx *= VELOCITY_DECAY;
                    node.vy *= VELOCITY_DECAY;
                    node.x += node.vx;
                    node.y += node.vy;
                }
            }
            // Keep every circle fully inside the viewport, with label
            // room at the bottom.
            let r = node.radius;
            node.x = node.x.clamp(r + EDGE_MARGIN, (self.width - r - EDGE_MARGIN).max(r));
            node.y = node
                .y
                .clamp(r + EDGE_MARGIN, (self.height - r - LABEL_MARGIN).max(r));
        }
    }
}
