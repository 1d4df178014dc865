//! Archive loading. The five collections are read in one parallel
//! batch at startup; nothing renders until all of them resolved, and a
//! single failure is fatal for the whole session.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::bounded;
use flate2::read::GzDecoder;
use hashbrown::HashMap;
use serde::de::DeserializeOwned;

use crate::structs::{CountryGraphs, CountrySummary, CountryYearRecord, SubfieldYearRecord};
use crate::topo::Topology;

pub const COUNTRY_YEAR_FILE: &str = "ai_papers_country_year.json";
pub const SUMMARY_FILE: &str = "ai_papers_country_summary.json";
pub const SUBFIELD_FILE: &str = "ai_papers_country_year_subfield.json";
pub const NODE_LINK_FILE: &str = "node_link_by_country_year.json";
pub const WORLD_FILE: &str = "world-50m.json";

pub type NodeLinkData = HashMap<String, CountryGraphs>;

#[derive(Debug, Clone)]
pub struct LoadError {
    pub file: String,
    pub reason: String,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load {}: {}", self.file, self.reason)
    }
}

impl std::error::Error for LoadError {}

/// The fully loaded dataset, immutable for the session.
#[derive(Debug)]
pub struct Archive {
    pub country_year: Vec<CountryYearRecord>,
    pub summary: Vec<CountrySummary>,
    pub subfield: Vec<SubfieldYearRecord>,
    pub node_link: NodeLinkData,
    pub world: Topology,
}

/// Reads `name` from `dir`, transparently accepting a `.gz` variant.
pub fn read_collection(dir: &Path, name: &str) -> Result<String, LoadError> {
    let plain = dir.join(name);
    let gz = dir.join(format!("{}.gz", name));
    let err = |e: std::io::Error| LoadError {
        file: name.to_string(),
        reason: e.to_string(),
    };
    let mut raw = String::new();
    if plain.exists() {
        File::open(&plain)
            .and_then(|mut f| f.read_to_string(&mut raw))
            .map_err(err)?;
    } else if gz.exists() {
        File::open(&gz)
            .and_then(|f| GzDecoder::new(f).read_to_string(&mut raw))
            .map_err(err)?;
    } else {
        return Err(LoadError {
            file: name.to_string(),
            reason: "no such file".to_string(),
        });
    }
    Ok(raw)
}

/// Parses one collection, reporting the JSON path of the first bad
/// element on failure.
pub fn load_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T, LoadError> {
    let raw = read_collection(dir, name)?;
    let mut de = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(&mut de).map_err(|e| LoadError {
        file: name.to_string(),
        reason: e.to_string(),
    })
}

enum Loaded {
    CountryYear(Vec<CountryYearRecord>),
    Summary(Vec<CountrySummary>),
    Subfield(Vec<SubfieldYearRecord>),
    NodeLink(NodeLinkData),
    World(Box<Topology>),
}

impl Archive {
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let dir: PathBuf = dir.to_path_buf();
        let (tx, rx) = bounded::<Result<Loaded, LoadError>>(5);

        thread::scope(|s| {
            for slot in 0..5u8 {
                let tx = tx.clone();
                let dir = dir.clone();
                s.spawn(move || {
                    let res = match slot {
                        0 => load_json(&dir, COUNTRY_YEAR_FILE).map(Loaded::CountryYear),
                        1 => load_json(&dir, SUMMARY_FILE).map(Loaded::Summary),
                        2 => load_json(&dir, SUBFIELD_FILE).map(Loaded::Subfield),
                        3 => load_json(&dir, NODE_LINK_FILE).map(Loaded::NodeLink),
                        _ => load_json(&dir, WORLD_FILE)
                            .map(|t| Loaded::World(Box::new(t))),
                    };
                    let _ = tx.send(res);
                });
            }
            drop(tx);

            let mut country_year = None;
            let mut summary = None;
            let mut subfield = None;
            let mut node_link = None;
            let mut world = None;
            for res in rx.iter() {
                match res? {
                    Loaded::CountryYear(v) => country_year = Some(v),
                    Loaded::Summary(v) => summary = Some(v),
                    Loaded::Subfield(v) => subfield = Some(v),
                    Loaded::NodeLink(v) => node_link = Some(v),
                    Loaded::World(v) => world = Some(*v),
                }
            }
            let missing = |name: &str| LoadError {
                file: name.to_string(),
                reason: "loader thread produced no result".to_string(),
            };
            Ok(Archive {
                country_year: country_year.ok_or_else(|| missing(COUNTRY_YEAR_FILE))?,
                summary: summary.ok_or_else(|| missing(SUMMARY_FILE))?,
                subfield: subfield.ok_or_else(|| missing(SUBFIELD_FILE))?,
                node_link: node_link.ok_or_else(|| missing(NODE_LINK_FILE))?,
                world: world.ok_or_else(|| missing(WORLD_FILE))?,
            })
        })
    }

    /// country_code -> display name, from the summary collection.
    pub fn country_names(&self) -> HashMap<String, String> {
        self.summary
            .iter()
            .map(|s| (s.country_code.clone(), s.country.clone()))
            .collect()
    }

    pub fn summary_for(&self, code: &str) -> Option<&CountrySummary> {
        self.summary.iter().find(|s| s.country_code == code)
    }
}
