use std::io::Write;

use hashbrown::HashMap;
use paperscope_rs::geo::{alpha2_from_numeric, resolve_code, resolve_name};
use paperscope_rs::metrics::{
    compact_count, format_count, growth_for_year, growth_stats, series_for_countries,
    snapshot_for_year, subfield_totals, thousands, top_countries,
};
use paperscope_rs::scale::{ColorScale, LinearScale, SqrtScale};
use paperscope_rs::stowage::{self, Archive};
use paperscope_rs::structs::{
    CountryGraphs, CountrySummary, CountryYearRecord, SubfieldYearRecord,
};
use paperscope_rs::topo::{Feature, Topology};
use paperscope_rs::ViewMode;

fn rec(code: &str, year: u16, papers: u32) -> CountryYearRecord {
    CountryYearRecord {
        country_code: code.to_string(),
        country: format!("{} Land", code),
        year,
        papers,
    }
}

fn sub_rec(code: &str, subfield: &str, year: u16, papers: u32) -> SubfieldYearRecord {
    SubfieldYearRecord {
        country_code: code.to_string(),
        subfield: subfield.to_string(),
        year,
        papers,
    }
}

#[test]
fn growth_is_undefined_without_a_positive_prior_year() {
    let recs = vec![rec("US", 2010, 100), rec("US", 2011, 150), rec("US", 2012, 90)];
    let g11 = growth_for_year(&recs, 2011);
    assert_eq!(g11.get("US"), Some(&50.0));
    let g12 = growth_for_year(&recs, 2012);
    assert_eq!(g12.get("US"), Some(&-40.0));
    assert!(growth_for_year(&recs, 2010).get("US").is_none());

    let zero_start = vec![rec("XX", 2013, 0), rec("XX", 2014, 40)];
    assert!(growth_for_year(&zero_start, 2014).get("XX").is_none());
}

#[test]
fn snapshot_switches_to_the_subfield_slice() {
    let recs = vec![rec("US", 2015, 100), rec("CN", 2015, 80), rec("US", 2016, 110)];
    let subs = vec![
        sub_rec("US", "Computer Vision", 2015, 30),
        sub_rec("US", "Robotics", 2015, 10),
        sub_rec("CN", "Computer Vision", 2015, 25),
    ];

    let plain = snapshot_for_year(&recs, &subs, 2015, None);
    assert_eq!(plain.get("US"), Some(&100));
    assert_eq!(plain.get("CN"), Some(&80));
    assert_eq!(plain.len(), 2);

    let filtered = snapshot_for_year(&recs, &subs, 2015, Some("Computer Vision"));
    assert_eq!(filtered.get("US"), Some(&30));
    assert_eq!(filtered.get("CN"), Some(&25));

    // no subfield data at all: the filter is ignored, not emptied
    let unfiltered = snapshot_for_year(&recs, &[], 2015, Some("Computer Vision"));
    assert_eq!(unfiltered.get("US"), Some(&100));
}

#[test]
fn growth_series_starts_undefined() {
    let recs = vec![rec("US", 2010, 100), rec("US", 2011, 150), rec("US", 2012, 90)];
    let codes = vec!["US".to_string()];
    let series = series_for_countries(&recs, &codes, ViewMode::Growth);
    assert_eq!(series.len(), 1);
    let points = &series[0].points;
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].value, None);
    assert_eq!(points[1].value, Some(50.0));
    assert_eq!(points[2].value, Some(-40.0));
}

#[test]
fn series_sorts_by_year_and_keeps_comparison_order() {
    let recs = vec![rec("CN", 2012, 50), rec("CN", 2010, 20), rec("US", 2010, 100)];
    let codes = vec!["US".to_string(), "CN".to_string()];
    let series = series_for_countries(&recs, &codes, ViewMode::Absolute);
    assert_eq!(series[0].code, "US");
    assert_eq!(series[1].code, "CN");
    let years: Vec<u16> = series[1].points.iter().map(|p| p.year).collect();
    assert_eq!(years, vec![2010, 2012]);
    assert_eq!(series[1].name, "CN Land");
}

#[test]
fn growth_stats_over_a_window() {
    let recs = vec![rec("US", 2010, 100), rec("US", 2011, 150), rec("US", 2012, 90)];
    let stats = growth_stats(&recs, "US", 2010, 2012);
    assert_eq!(stats.start_papers, 100);
    assert_eq!(stats.end_papers, 90);
    assert_eq!(stats.growth_ratio, 0.9);
    assert!((stats.cagr - (0.9_f64.powf(0.5) - 1.0)).abs() < 1e-12);
    assert_eq!(stats.total_papers, 340);

    // zero-paper start year defines neither ratio nor CAGR
    let cold = vec![rec("XX", 2010, 0), rec("XX", 2012, 40)];
    let stats = growth_stats(&cold, "XX", 2010, 2012);
    assert_eq!(stats.growth_ratio, 0.0);
    assert_eq!(stats.cagr, 0.0);
}

#[test]
fn growth_stats_degenerate_windows_stay_finite() {
    let recs = vec![rec("US", 2010, 100), rec("US", 2012, 90)];

    let single = growth_stats(&recs, "US", 2012, 2012);
    assert_eq!(single.growth_ratio, 1.0);
    assert_eq!(single.cagr, 0.0);

    // reversed bounds normalize instead of underflowing
    let reversed = growth_stats(&recs, "US", 2012, 2010);
    assert_eq!(reversed.start_papers, 100);
    assert_eq!(reversed.end_papers, 90);
    assert_eq!(reversed.growth_ratio, 0.9);
    assert!(reversed.cagr.is_finite());
}

#[test]
fn subfield_totals_sort_descending() {
    let subs = vec![
        sub_rec("US", "Robotics", 2015, 10),
        sub_rec("US", "Computer Vision", 2015, 30),
        sub_rec("US", "Computer Vision", 2016, 20),
        sub_rec("US", "Theory", 2015, 50),
        sub_rec("CN", "Theory", 2015, 99),
    ];
    let totals = subfield_totals(&subs, "US", (2010, 2025));
    assert_eq!(
        totals,
        vec![
            ("Computer Vision".to_string(), 50),
            ("Theory".to_string(), 50),
            ("Robotics".to_string(), 10),
        ]
    );
    let windowed = subfield_totals(&subs, "US", (2016, 2016));
    assert_eq!(windowed, vec![("Computer Vision".to_string(), 20)]);
}

#[test]
fn top_countries_ranks_by_total() {
    let summary = vec![
        CountrySummary {
            country_code: "US".to_string(),
            country: "United States".to_string(),
            total_papers: 500,
            growth_ratio: 2.0,
        },
        CountrySummary {
            country_code: "CN".to_string(),
            country: "China".to_string(),
            total_papers: 900,
            growth_ratio: 5.0,
        },
    ];
    let top = top_countries(&summary, 1);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].country_code, "CN");
}

#[test]
fn count_formatting() {
    assert_eq!(format_count(1_234_567), "1.2M");
    assert_eq!(format_count(4_321), "4.3K");
    assert_eq!(format_count(999), "999");
    assert_eq!(thousands(1_234_567), "1,234,567");
    assert_eq!(thousands(42), "42");
    assert_eq!(compact_count(12_345), "12K");
    assert_eq!(compact_count(850), "850");
}

#[test]
fn numeric_country_ids_resolve() {
    assert_eq!(alpha2_from_numeric(840), Some("US"));
    assert_eq!(alpha2_from_numeric(156), Some("CN"));
    assert_eq!(alpha2_from_numeric(276), Some("DE"));
    assert_eq!(alpha2_from_numeric(999), None);
}

fn bare_feature(id: Option<&str>, name: Option<&str>) -> Feature {
    Feature {
        id: id.map(str::to_string),
        name: name.map(str::to_string),
        polygons: Vec::new(),
    }
}

#[test]
fn name_resolution_falls_back_gracefully() {
    let mut names = HashMap::new();
    names.insert("US".to_string(), "United States".to_string());

    let us = bare_feature(Some("840"), Some("U.S.A."));
    assert_eq!(resolve_code(&us), Some("US"));
    assert_eq!(resolve_name(&us, &names), "United States");

    let fr = bare_feature(Some("250"), Some("France"));
    assert_eq!(resolve_name(&fr, &names), "France");

    let unnamed = bare_feature(Some("250"), None);
    assert_eq!(resolve_name(&unnamed, &names), "FR");

    let mystery = bare_feature(Some("-1"), None);
    assert_eq!(resolve_code(&mystery), None);
    assert_eq!(resolve_name(&mystery, &names), "Unknown");
}

#[test]
fn empty_snapshot_gets_the_no_data_scale() {
    let scale = ColorScale::for_counts(std::iter::empty());
    assert!(matches!(scale, ColorScale::NoData));
    assert_eq!(scale.color(123.0), ColorScale::no_data_color());

    let zeros = ColorScale::for_counts([0u32, 0, 0].into_iter());
    assert!(matches!(zeros, ColorScale::NoData));
}

#[test]
fn count_scale_hits_the_palette_endpoints() {
    let scale = ColorScale::for_counts([1u32, 50, 1000].into_iter());
    assert_eq!(scale.color(1.0).hex(), "#0a0e1a");
    assert_eq!(scale.color(1000.0).hex(), "#a5f3fc");
}

#[test]
fn growth_scale_is_observation_independent() {
    let scale = ColorScale::for_growth();
    let at_zero = scale.color(0.0);
    // same scale regardless of what the data looks like this year
    assert_eq!(ColorScale::for_growth().color(0.0), at_zero);
    let stops = scale.legend_stops();
    assert_eq!(stops.len(), 3);
    assert_eq!(stops[0].0, 0.0);
    assert_eq!(stops[1].0, 0.5);
    assert_eq!(stops[2].0, 1.0);
}

#[test]
fn linear_scale_nice_and_ticks() {
    let scale = LinearScale::new((0.0, 98.0), (0.0, 100.0)).nice(5);
    assert_eq!(scale.domain, (0.0, 100.0));
    assert_eq!(scale.ticks(5), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
    assert_eq!(scale.scale(50.0), 50.0);
}

#[test]
fn sqrt_scale_radii() {
    let scale = SqrtScale::new(100.0, (10.0, 30.0));
    assert_eq!(scale.radius(100.0), 30.0);
    assert_eq!(scale.radius(25.0), 20.0);
    assert_eq!(scale.radius(0.0), 10.0);
}

#[test]
fn topology_arcs_decode_and_stitch() {
    let topo: Topology = serde_json::from_value(serde_json::json!({
        "type": "Topology",
        "transform": { "scale": [1.0, 1.0], "translate": [0.0, 0.0] },
        "arcs": [
            [[0, 0], [1, 0]],
            [[1, 0], [-1, 1]]
        ],
        "objects": {
            "countries": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "id": 840, "arcs": [[0, 1]] },
                    { "type": "Polygon", "id": 250, "arcs": [[-2]] }
                ]
            }
        }
    }))
    .unwrap();

    let decoded = topo.decoded_arcs();
    assert_eq!(decoded[0], vec![[0.0, 0.0], [1.0, 0.0]]);
    assert_eq!(decoded[1], vec![[1.0, 0.0], [0.0, 1.0]]);

    let features = topo.features("countries");
    assert_eq!(features.len(), 2);
    assert_eq!(features[0].id.as_deref(), Some("840"));
    // shared junction point dropped when arcs are stitched
    assert_eq!(
        features[0].polygons[0][0],
        vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
    );
    // negative index walks the arc backwards
    assert_eq!(
        features[1].polygons[0][0],
        vec![[0.0, 1.0], [1.0, 0.0]]
    );
}

#[test]
fn country_graphs_shape_detection() {
    let flat: CountryGraphs = serde_json::from_value(serde_json::json!({
        "nodes": [{ "id": "Computer Vision", "type": "main", "count": 10 }]
    }))
    .unwrap();
    assert!(flat.for_year(2015).is_some());
    assert!(flat.for_year(2024).is_some());

    let by_year: CountryGraphs = serde_json::from_value(serde_json::json!({
        "2015": { "nodes": [{ "id": "Robotics", "type": "main", "count": 5 }] }
    }))
    .unwrap();
    assert_eq!(by_year.for_year(2015).unwrap().nodes[0].id, "Robotics");
    assert!(by_year.for_year(2016).is_none());
}

fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("paperscope-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn archive_loads_plain_and_gzipped_collections() {
    let dir = scratch_dir("load");
    let write = |name: &str, body: &str| {
        std::fs::write(dir.join(name), body).unwrap();
    };
    write(
        stowage::COUNTRY_YEAR_FILE,
        r#"[{"country_code":"US","country":"United States","year":2015,"papers":100}]"#,
    );
    write(
        stowage::SUMMARY_FILE,
        r#"[{"country_code":"US","country":"United States","total_papers":100,"growth_ratio":1.5}]"#,
    );
    write(stowage::SUBFIELD_FILE, "[]");
    write(stowage::NODE_LINK_FILE, "{}");

    // the topology arrives gzipped
    let world = serde_json::json!({
        "arcs": [[[0.0, 0.0], [1.0, 0.0]]],
        "objects": { "countries": { "geometries": [] } }
    });
    let gz_path = dir.join(format!("{}.gz", stowage::WORLD_FILE));
    let mut enc = flate2::write::GzEncoder::new(
        std::fs::File::create(&gz_path).unwrap(),
        flate2::Compression::default(),
    );
    enc.write_all(world.to_string().as_bytes()).unwrap();
    enc.finish().unwrap();

    let archive = Archive::load(&dir).unwrap();
    assert_eq!(archive.country_year.len(), 1);
    assert_eq!(archive.summary_for("US").unwrap().total_papers, 100);
    assert_eq!(archive.country_names().get("US").unwrap(), "United States");
    assert_eq!(archive.world.arcs.len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn archive_load_reports_the_missing_file() {
    let dir = scratch_dir("missing");
    std::fs::write(dir.join(stowage::COUNTRY_YEAR_FILE), "[]").unwrap();
    let err = Archive::load(&dir).unwrap_err();
    assert!(!err.file.is_empty());
    assert_ne!(err.file, stowage::COUNTRY_YEAR_FILE);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn bad_json_errors_carry_the_element_path() {
    let dir = scratch_dir("badjson");
    std::fs::write(
        dir.join(stowage::COUNTRY_YEAR_FILE),
        r#"[{"country_code":"US","country":"United States","year":"not a year","papers":1}]"#,
    )
    .unwrap();
    let err: Result<Vec<CountryYearRecord>, _> =
        stowage::load_json(&dir, stowage::COUNTRY_YEAR_FILE);
    let reason = err.unwrap_err().reason;
    assert!(reason.contains("year"), "path missing from: {}", reason);
    let _ = std::fs::remove_dir_all(&dir);
}
