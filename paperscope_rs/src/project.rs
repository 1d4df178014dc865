//! Natural Earth projection fitted to a viewport, plus SVG path
//! construction for decoded features and the graticule.

use crate::topo::{Feature, LonLat};

/// Polynomial approximation of the Natural Earth I projection,
/// unit-sphere coordinates (lambda/phi in radians).
fn natural_earth_raw(lambda: f64, phi: f64) -> [f64; 2] {
    let phi2 = phi * phi;
    let phi4 = phi2 * phi2;
    [
        lambda
            * (0.8707 - 0.131979 * phi2
                + phi4 * (-0.013791 + phi4 * (0.003971 * phi2 - 0.001529 * phi4))),
        phi * (1.007226 + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4))),
    ]
}

#[derive(Debug, Clone, Copy)]
pub struct Projection {
    k: f64,
    tx: f64,
    ty: f64,
}

impl Projection {
    /// Scales and centers the projection so the given features fill a
    /// `width` x `height` box, the fit-size behavior the map relies on
    /// after every resize.
    pub fn fit_size(width: f64, height: f64, features: &[Feature]) -> Self {
        let mut bounds = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
        let mut seen = false;
        for f in features {
            for poly in &f.polygons {
                for ring in poly {
                    for p in ring {
                        let [x, y] = Self::flipped_raw(*p);
                        bounds[0] = bounds[0].min(x);
                        bounds[1] = bounds[1].min(y);
                        bounds[2] = bounds[2].max(x);
                        bounds[3] = bounds[3].max(y);
                        seen = true;
                    }
                }
            }
        }
        if !seen {
            return Self { k: 1.0, tx: 0.0, ty: 0.0 };
        }
        let k = (width / (bounds[2] - bounds[0])).min(height / (bounds[3] - bounds[1]));
        Self {
            k,
            tx: (width - k * (bounds[0] + bounds[2])) / 2.0,
            ty: (height - k * (bounds[1] + bounds[3])) / 2.0,
        }
    }

    // Screen y grows downward.
    fn flipped_raw(p: LonLat) -> [f64; 2] {
        let r = natural_earth_raw(p[0].to_radians(), p[1].to_radians());
        [r[0], -r[1]]
    }

    pub fn project(&self, p: LonLat) -> [f64; 2] {
        let [x, y] = Self::flipped_raw(p);
        [x * self.k + self.tx, y * self.k + self.ty]
    }

    /// Projected rings for hit testing, one vec per ring.
    pub fn project_rings(&self, feature: &Feature) -> Vec<Vec<[f64; 2]>> {
        feature
            .polygons
            .iter()
            .flat_map(|poly| poly.iter())
            .map(|ring| ring.iter().map(|p| self.project(*p)).collect())
            .collect()
    }

    /// SVG path data for all rings of a feature.
    pub fn feature_path(&self, feature: &Feature) -> String {
        let mut d = String::new();
        for ring in self.project_rings(feature) {
            for (i, [x, y]) in ring.iter().enumerate() {
                let cmd = if i == 0 { 'M' } else { 'L' };
                d.push_str(&format!("{}{:.2},{:.2}", cmd, x, y));
            }
            if !ring.is_empty() {
                d.push('Z');
            }
        }
        d
    }

    /// 10-degree graticule as one multi-segment path.
    pub fn graticule_path(&self) -> String {
        let mut d = String::new();
        let mut lambda = -180.0;
        while lambda <= 180.0 {
            self.push_line(&mut d, (0..=64).map(|i| [lambda, -80.0 + 160.0 * i as f64 / 64.0]));
            lambda += 10.0;
        }
        let mut phi = -80.0;
        while phi <= 80.0 {
            self.push_line(&mut d, (0..=144).map(|i| [-180.0 + 360.0 * i as f64 / 144.0, phi]));
            phi += 10.0;
        }
        d
    }

    fn push_line(&self, d: &mut String, points: impl Iterator<Item = LonLat>) {
        for (i, p) in points.enumerate() {
            let [x, y] = self.project(p);
            let cmd = if i == 0 { 'M' } else { 'L' };
            d.push_str(&format!("{}{:.2},{:.2}", cmd, x, y));
        }
    }
}

/// Even-odd ray cast against one ring.
pub fn ring_contains(ring: &[[f64; 2]], x: f64, y: f64) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}
