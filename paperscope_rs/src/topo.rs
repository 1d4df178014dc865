//! Minimal TopoJSON decoding: delta-encoded quantized arcs plus the
//! `countries` geometry collection are all the map needs.

use hashbrown::HashMap;
use serde::Deserialize;
use serde_json::Value;

pub type LonLat = [f64; 2];

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub arcs: Option<Value>,
    #[serde(default)]
    pub properties: Option<GeoProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoProperties {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeometryCollection {
    #[serde(default)]
    pub geometries: Vec<Geometry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    pub arcs: Vec<Vec<[f64; 2]>>,
    pub objects: HashMap<String, GeometryCollection>,
}

/// A decoded geometry: identity plus absolute lon/lat rings, grouped
/// polygon -> rings, first ring exterior.
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: Option<String>,
    pub name: Option<String>,
    pub polygons: Vec<Vec<Vec<LonLat>>>,
}

impl Topology {
    /// Applies the quantization transform and undoes delta encoding.
    pub fn decoded_arcs(&self) -> Vec<Vec<LonLat>> {
        self.arcs
            .iter()
            .map(|arc| match self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            [
                                x * t.scale[0] + t.translate[0],
                                y * t.scale[1] + t.translate[1],
                            ]
                        })
                        .collect()
                }
                None => arc.clone(),
            })
            .collect()
    }

    /// Decodes one named object (here always `"countries"`) into
    /// features. Unknown geometry kinds degrade to an empty polygon
    /// list instead of failing the whole map.
    pub fn features(&self, object: &str) -> Vec<Feature> {
        let arcs = self.decoded_arcs();
        let Some(collection) = self.objects.get(object) else {
            return Vec::new();
        };
        collection
            .geometries
            .iter()
            .map(|geom| Feature {
                id: geom.id.as_ref().and_then(id_string),
                name: geom
                    .properties
                    .as_ref()
                    .and_then(|p| p.name.clone()),
                polygons: geom_polygons(geom, &arcs),
            })
            .collect()
    }
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn geom_polygons(geom: &Geometry, arcs: &[Vec<LonLat>]) -> Vec<Vec<Vec<LonLat>>> {
    let (Some(kind), Some(raw)) = (geom.kind.as_deref(), geom.arcs.as_ref()) else {
        return Vec::new();
    };
    match kind {
        "Polygon" => serde_json::from_value::<Vec<Vec<i64>>>(raw.clone())
            .map(|rings| vec![assemble_polygon(&rings, arcs)])
            .unwrap_or_default(),
        "MultiPolygon" => serde_json::from_value::<Vec<Vec<Vec<i64>>>>(raw.clone())
            .map(|polys| {
                polys
                    .iter()
                    .map(|rings| assemble_polygon(rings, arcs))
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn assemble_polygon(rings: &[Vec<i64>], arcs: &[Vec<LonLat>]) -> Vec<Vec<LonLat>> {
    rings.iter().map(|ring| assemble_ring(ring, arcs)).collect()
}

/// Stitches arc fragments into one ring. A negative index `i` means
/// arc `!i` traversed backwards; shared junction points are dropped.
fn assemble_ring(indices: &[i64], arcs: &[Vec<LonLat>]) -> Vec<LonLat> {
    let mut points: Vec<LonLat> = Vec::new();
    for &ix in indices {
        let (arc_ix, reversed) = if ix < 0 {
            ((!ix) as usize, true)
        } else {
            (ix as usize, false)
        };
        let Some(arc) = arcs.get(arc_ix) else { continue };
        let mut fragment: Vec<LonLat> = if reversed {
            arc.iter().rev().copied().collect()
        } else {
            arc.clone()
        };
        if !points.is_empty() && !fragment.is_empty() {
            fragment.remove(0);
        }
        points.extend(fragment);
    }
    points
}
