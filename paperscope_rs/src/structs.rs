use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// One (country, year) row of the absolute paper counts. Unique per
/// (country_code, year) in the source collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryYearRecord {
    pub country_code: String,
    pub country: String,
    pub year: u16,
    pub papers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub country_code: String,
    pub country: String,
    pub total_papers: u64,
    pub growth_ratio: f64,
}

/// Finer partition of [`CountryYearRecord`] by research subfield. The
/// subfield taxonomy is partial: per-year subfield sums are not
/// guaranteed to add up to the country total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubfieldYearRecord {
    pub country_code: String,
    pub subfield: String,
    pub year: u16,
    pub papers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Main,
    Sub,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Field -> subfield edge. Links never connect two fields or two
/// subfields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub links: Vec<GraphLink>,
}

/// Per-country node-link payload. The current exports key graphs by
/// year string; older exports carried a single flat graph. Shape
/// detection happens at parse time: a `nodes` member marks the flat
/// legacy form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountryGraphs {
    Flat(NodeLinkGraph),
    ByYear(HashMap<String, NodeLinkGraph>),
}

impl CountryGraphs {
    /// Graph for the exact year if the year dimension exists, the flat
    /// graph otherwise. `None` means nothing to show for this year.
    pub fn for_year(&self, year: u16) -> Option<&NodeLinkGraph> {
        match self {
            CountryGraphs::ByYear(by_year) => by_year.get(year.to_string().as_str()),
            CountryGraphs::Flat(graph) => Some(graph),
        }
    }
}
