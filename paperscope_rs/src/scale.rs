//! Color and positional scales. Counts get a logarithmic sequential
//! scale because they span orders of magnitude between countries;
//! growth gets a fixed-domain diverging scale so a given percentage
//! keeps its color while scrubbing across years.

use serde::Serialize;

/// Five stops from near-black to bright cyan for absolute counts.
pub const PAPER_COUNT_COLORS: [&str; 5] = ["#0a0e1a", "#0c4a6e", "#0891b2", "#22d3ee", "#a5f3fc"];

/// Background / no-data fill, distinct from the scale minimum.
pub const NO_DATA_COLOR: &str = "#0a0e1a";

/// ColorBrewer RdYlGn-11 ramp backing the diverging growth scale.
pub const RD_YL_GN: [&str; 11] = [
    "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#d9ef8b", "#a6d96a",
    "#66bd63", "#1a9850", "#006837",
];

pub const GROWTH_DOMAIN: (f64, f64) = (-30.0, 60.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn parse(hex: &str) -> Option<Rgb> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let n = u32::from_str_radix(hex, 16).ok()?;
        Some(Rgb((n >> 16) as u8, (n >> 8) as u8, n as u8))
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Channel-multiplied brightening, k in gamma steps of 1/0.7.
    pub fn brighter(&self, k: f64) -> Rgb {
        let f = (1.0 / 0.7_f64).powf(k);
        let up = |c: u8| ((c as f64 * f).round().min(255.0)) as u8;
        Rgb(up(self.0), up(self.1), up(self.2))
    }
}

fn basis(t1: f64, v0: f64, v1: f64, v2: f64, v3: f64) -> f64 {
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}

fn basis_channel(values: &[f64], t: f64) -> f64 {
    let n = values.len() - 1;
    let t = t.clamp(0.0, 1.0);
    let i = ((t * n as f64).floor() as usize).min(n - 1);
    let v1 = values[i];
    let v2 = values[i + 1];
    let v0 = if i > 0 { values[i - 1] } else { 2.0 * v1 - v2 };
    let v3 = if i < n - 1 {
        values[i + 2]
    } else {
        2.0 * v2 - v1
    };
    basis((t - i as f64 / n as f64) * n as f64, v0, v1, v2, v3)
}

/// Uniform cubic B-spline through the stop colors in RGB space, the
/// interpolation d3 calls `interpolateRgbBasis`.
pub fn rgb_basis(stops: &[Rgb], t: f64) -> Rgb {
    debug_assert!(stops.len() >= 2);
    let channel = |pick: fn(&Rgb) -> u8| {
        let vals: Vec<f64> = stops.iter().map(|c| pick(c) as f64).collect();
        basis_channel(&vals, t).round().clamp(0.0, 255.0) as u8
    };
    Rgb(
        channel(|c| c.0),
        channel(|c| c.1),
        channel(|c| c.2),
    )
}

fn parse_stops(hex: &[&str]) -> Vec<Rgb> {
    hex.iter().filter_map(|h| Rgb::parse(h)).collect()
}

/// The color mapping behind map fills and the legend gradient.
#[derive(Debug, Clone)]
pub enum ColorScale {
    /// Empty snapshot: everything renders as background.
    NoData,
    /// Log scale over [1, max] through the count palette.
    LogSequential { max: f64, stops: Vec<Rgb> },
    /// Fixed diverging domain, observation-independent.
    Diverging { min: f64, max: f64, stops: Vec<Rgb> },
}

impl ColorScale {
    pub fn for_counts(values: impl Iterator<Item = u32>) -> Self {
        let max = values.filter(|v| *v > 0).max().unwrap_or(0);
        if max == 0 {
            return ColorScale::NoData;
        }
        ColorScale::LogSequential {
            max: max as f64,
            stops: parse_stops(&PAPER_COUNT_COLORS),
        }
    }

    pub fn for_growth() -> Self {
        ColorScale::Diverging {
            min: GROWTH_DOMAIN.0,
            max: GROWTH_DOMAIN.1,
            stops: parse_stops(&RD_YL_GN),
        }
    }

    pub fn no_data_color() -> Rgb {
        Rgb::parse(NO_DATA_COLOR).unwrap_or(Rgb(10, 14, 26))
    }

    pub fn color(&self, value: f64) -> Rgb {
        match self {
            ColorScale::NoData => Self::no_data_color(),
            ColorScale::LogSequential { max, stops } => {
                let t = if *max <= 1.0 {
                    1.0
                } else {
                    value.max(1.0).ln() / max.ln()
                };
                rgb_basis(stops, t)
            }
            ColorScale::Diverging { min, max, stops } => {
                rgb_basis(stops, (value - min) / (max - min))
            }
        }
    }

    /// Gradient stops for the legend swatch, as (offset, color) with
    /// offsets in [0, 1].
    pub fn legend_stops(&self) -> Vec<(f64, Rgb)> {
        match self {
            ColorScale::NoData => vec![(0.0, Self::no_data_color()), (1.0, Self::no_data_color())],
            ColorScale::LogSequential { stops, .. } => {
                let n = (stops.len() - 1) as f64;
                stops
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i as f64 / n, *c))
                    .collect()
            }
            ColorScale::Diverging { stops, .. } => [0.0, 0.5, 1.0]
                .iter()
                .map(|t| (*t, rgb_basis(stops, *t)))
                .collect(),
        }
    }
}

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let step = (stop - start) / count.max(1) as f64;
    if step <= 0.0 {
        return 1.0;
    }
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    factor * 10f64.powf(power)
}

#[derive(Debug, Clone, Copy)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn scale(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Extends the domain to round tick boundaries.
    pub fn nice(mut self, count: usize) -> Self {
        let step = tick_step(self.domain.0, self.domain.1, count);
        self.domain.0 = (self.domain.0 / step).floor() * step;
        self.domain.1 = (self.domain.1 / step).ceil() * step;
        self
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (d0, d1) = self.domain;
        if d1 <= d0 {
            return vec![d0];
        }
        let step = tick_step(d0, d1, count);
        let start = (d0 / step).ceil();
        let stop = (d1 / step).floor();
        (start as i64..=stop as i64)
            .map(|i| i as f64 * step)
            .collect()
    }
}

/// Square-root radius scale over [0, max]; keeps circle area roughly
/// proportional to the backing count.
#[derive(Debug, Clone, Copy)]
pub struct SqrtScale {
    max_sqrt: f64,
    range: (f64, f64),
}

impl SqrtScale {
    pub fn new(domain_max: f64, range: (f64, f64)) -> Self {
        Self {
            max_sqrt: domain_max.max(1.0).sqrt(),
            range,
        }
    }

    pub fn radius(&self, v: f64) -> f64 {
        let (r0, r1) = self.range;
        r0 + v.max(0.0).sqrt() / self.max_sqrt * (r1 - r0)
    }
}
