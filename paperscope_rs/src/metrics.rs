//! Pure metric aggregation over the raw record collections. Everything
//! here is re-derived on each relevant state change; the dataset is
//! small enough that no incremental caching is worth the bookkeeping.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::structs::{CountrySummary, CountryYearRecord, SubfieldYearRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Absolute,
    Growth,
}

/// Per-year point of a country series. `value` is `None` where the
/// metric is undefined (first point of a growth series, or a prior
/// year with zero papers); undefined is never coerced to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub year: u16,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountrySeries {
    pub code: String,
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

/// Anything with a (country, year, papers) shape; lets the same series
/// and snapshot logic run over the full counts or a subfield slice.
pub trait YearlyRecord {
    fn code(&self) -> &str;
    fn year(&self) -> u16;
    fn papers(&self) -> u32;
    fn display_name(&self) -> Option<&str> {
        None
    }
}

impl YearlyRecord for CountryYearRecord {
    fn code(&self) -> &str {
        &self.country_code
    }
    fn year(&self) -> u16 {
        self.year
    }
    fn papers(&self) -> u32 {
        self.papers
    }
    fn display_name(&self) -> Option<&str> {
        Some(&self.country)
    }
}

impl<R: YearlyRecord> YearlyRecord for &R {
    fn code(&self) -> &str {
        (*self).code()
    }
    fn year(&self) -> u16 {
        (*self).year()
    }
    fn papers(&self) -> u32 {
        (*self).papers()
    }
    fn display_name(&self) -> Option<&str> {
        (*self).display_name()
    }
}

impl YearlyRecord for SubfieldYearRecord {
    fn code(&self) -> &str {
        &self.country_code
    }
    fn year(&self) -> u16 {
        self.year
    }
    fn papers(&self) -> u32 {
        self.papers
    }
}

/// Per-country absolute values for one year. With a subfield filter
/// set (and subfield data present) the subfield slice is the source,
/// otherwise the country totals. At most one value per code; the
/// collections guarantee (code, year) uniqueness.
pub fn snapshot_for_year(
    records: &[CountryYearRecord],
    subfield_records: &[SubfieldYearRecord],
    year: u16,
    subfield: Option<&str>,
) -> HashMap<String, u32> {
    match subfield {
        Some(sf) if !subfield_records.is_empty() => subfield_records
            .iter()
            .filter(|r| r.subfield == sf && r.year == year)
            .map(|r| (r.country_code.clone(), r.papers))
            .collect(),
        _ => records
            .iter()
            .filter(|r| r.year == year)
            .map(|r| (r.country_code.clone(), r.papers))
            .collect(),
    }
}

/// Year-over-year growth percentages. A country appears only if it has
/// a record in `year` and a record in `year - 1` with papers > 0;
/// undefined growth is absent from the map, not zero.
pub fn growth_for_year(records: &[CountryYearRecord], year: u16) -> HashMap<String, f64> {
    let prev: HashMap<&str, u32> = records
        .iter()
        .filter(|r| r.year == year.wrapping_sub(1))
        .map(|r| (r.country_code.as_str(), r.papers))
        .collect();
    let mut out = HashMap::new();
    for r in records.iter().filter(|r| r.year == year) {
        if let Some(&p) = prev.get(r.country_code.as_str()) {
            if p > 0 {
                out.insert(
                    r.country_code.clone(),
                    (r.papers as f64 - p as f64) / p as f64 * 100.0,
                );
            }
        }
    }
    out
}

/// Multi-year series for the compared countries, in comparison order.
/// Growth mode computes consecutive-record growth; the first record of
/// every series stays in the output with an undefined value so the
/// row count matches the underlying data.
pub fn series_for_countries<R: YearlyRecord>(
    records: &[R],
    codes: &[String],
    mode: ViewMode,
) -> Vec<CountrySeries> {
    codes
        .iter()
        .map(|code| {
            let mut rows: Vec<&R> = records.iter().filter(|r| r.code() == code).collect();
            rows.sort_by_key(|r| r.year());
            let name = rows
                .first()
                .and_then(|r| r.display_name())
                .unwrap_or(code)
                .to_string();
            let points = match mode {
                ViewMode::Absolute => rows
                    .iter()
                    .map(|r| SeriesPoint {
                        year: r.year(),
                        value: Some(r.papers() as f64),
                    })
                    .collect(),
                ViewMode::Growth => rows
                    .iter()
                    .enumerate()
                    .map(|(i, r)| {
                        let value = if i == 0 {
                            None
                        } else {
                            let prev = rows[i - 1].papers();
                            if prev > 0 {
                                Some((r.papers() as f64 - prev as f64) / prev as f64 * 100.0)
                            } else {
                                None
                            }
                        };
                        SeriesPoint {
                            year: r.year(),
                            value,
                        }
                    })
                    .collect(),
            };
            CountrySeries {
                code: code.clone(),
                name,
                points,
            }
        })
        .collect()
}

pub fn country_year_record<'a>(
    records: &'a [CountryYearRecord],
    year: u16,
    code: &str,
) -> Option<&'a CountryYearRecord> {
    records
        .iter()
        .find(|r| r.year == year && r.country_code == code)
}

pub fn top_countries(summary: &[CountrySummary], n: usize) -> Vec<&CountrySummary> {
    let mut sorted: Vec<&CountrySummary> = summary.iter().collect();
    sorted.sort_by(|a, b| b.total_papers.cmp(&a.total_papers));
    sorted.truncate(n);
    sorted
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthStats {
    pub country_code: String,
    pub start_papers: u32,
    pub end_papers: u32,
    pub growth_ratio: f64,
    pub cagr: f64,
    pub total_papers: u64,
}

/// Window growth metrics for one country: end/start ratio, compound
/// annual growth rate, lifetime total. Bounds are normalized; ratio
/// and CAGR are zero when the start year has no papers, CAGR alone
/// when the window spans a single year.
pub fn growth_stats(
    records: &[CountryYearRecord],
    code: &str,
    start_year: u16,
    end_year: u16,
) -> GrowthStats {
    let (lo, hi) = (start_year.min(end_year), start_year.max(end_year));
    let rows: Vec<&CountryYearRecord> = records
        .iter()
        .filter(|r| r.country_code == code)
        .collect();
    let papers_at = |y: u16| rows.iter().find(|r| r.year == y).map_or(0, |r| r.papers);
    let start = papers_at(lo);
    let end = papers_at(hi);
    let (growth_ratio, cagr) = if start > 0 {
        let ratio = end as f64 / start as f64;
        let span = (hi - lo) as f64;
        (
            ratio,
            if span > 0.0 {
                ratio.powf(1.0 / span) - 1.0
            } else {
                0.0
            },
        )
    } else {
        (0.0, 0.0)
    };
    GrowthStats {
        country_code: code.to_string(),
        start_papers: start,
        end_papers: end,
        growth_ratio,
        cagr,
        total_papers: rows.iter().map(|r| r.papers as u64).sum(),
    }
}

/// Per-subfield totals for one country over a year range, descending.
pub fn subfield_totals(
    records: &[SubfieldYearRecord],
    code: &str,
    year_range: (u16, u16),
) -> Vec<(String, u64)> {
    let mut by_subfield: HashMap<&str, u64> = HashMap::new();
    for r in records.iter().filter(|r| {
        r.country_code == code && r.year >= year_range.0 && r.year <= year_range.1
    }) {
        *by_subfield.entry(r.subfield.as_str()).or_insert(0) += r.papers as u64;
    }
    let mut out: Vec<(String, u64)> = by_subfield
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// 1234567 -> "1.2M", 4321 -> "4.3K".
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Thousands-grouped rendering for tooltips and captions.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Short in-node label variant: 12345 -> "12K".
pub fn compact_count(n: u64) -> String {
    if n >= 1_000 {
        format!("{}K", (n as f64 / 1_000.0).round() as u64)
    } else {
        n.to_string()
    }
}
