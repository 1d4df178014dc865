use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;

use paperscope_rs::stowage::{Archive, NodeLinkData};
use paperscope_rs::structs::{
    CountryGraphs, CountrySummary, CountryYearRecord, GraphLink, GraphNode, NodeKind,
    NodeLinkGraph,
};
use paperscope_rs::topo::Topology;
use paperscope_rs::ViewMode;

use paperscope_views::dashboard::{Dashboard, PanelSizes};
use paperscope_views::force::{SimLink, Simulation, EDGE_MARGIN, LABEL_MARGIN};
use paperscope_views::map::MapView;
use paperscope_views::nodelink::{visible_graph, GraphClick, GraphView};
use paperscope_views::player::{next_loop_year, Autoplay};
use paperscope_views::state::{SelectionState, MAX_COMPARED};
use paperscope_views::timeseries::TimeSeriesView;

use paperscope_rs::metrics::{CountrySeries, SeriesPoint};

fn select_all(state: &mut SelectionState, codes: &[&str]) {
    for code in codes {
        state.select_country(code);
    }
}

#[test]
fn comparison_list_evicts_oldest_beyond_cap() {
    let mut state = SelectionState::default();
    select_all(&mut state, &["US", "CN", "JP", "DE", "FR"]);
    assert_eq!(state.compared_countries.len(), MAX_COMPARED);
    state.select_country("GB");
    assert_eq!(state.compared_countries, vec!["CN", "JP", "DE", "FR", "GB"]);
    assert_eq!(state.selected_country.as_deref(), Some("GB"));
}

#[test]
fn reselecting_toggles_off_but_keeps_the_comparison() {
    let mut state = SelectionState::default();
    state.select_country("US");
    state.select_country("US");
    assert_eq!(state.selected_country, None);
    assert_eq!(state.compared_countries, vec!["US"]);
    // already compared, so selecting again does not duplicate
    state.select_country("US");
    assert_eq!(state.compared_countries, vec!["US"]);
    assert_eq!(state.selected_country.as_deref(), Some("US"));
}

#[test]
fn removing_the_selected_comparison_clears_both() {
    let mut state = SelectionState::default();
    select_all(&mut state, &["US", "CN"]);
    state.remove_comparison("CN");
    assert_eq!(state.selected_country, None);
    assert_eq!(state.compared_countries, vec!["US"]);
    state.remove_comparison("US");
    assert!(state.compared_countries.is_empty());
}

#[test]
fn background_clear_resets_subfield_too() {
    let mut state = SelectionState::default();
    state.select_country("US");
    state.select_subfield("Image Segmentation");
    state.clear_selection();
    assert_eq!(state.selected_country, None);
    assert!(state.compared_countries.is_empty());
    assert_eq!(state.selected_subfield, None);
}

#[test]
fn expansion_survives_year_scrubbing_but_not_a_country_switch() {
    let mut state = SelectionState::default();
    state.select_country("US");
    state.toggle_field("Computer Vision");
    state.set_year(2020);
    state.set_view_mode(ViewMode::Growth);
    assert!(state.is_expanded("Computer Vision"));
    state.select_country("CN");
    assert!(state.expanded_fields.is_empty());
}

#[test]
fn year_setters_clamp_to_the_data_window() {
    let mut state = SelectionState::default();
    state.set_year(1999);
    assert_eq!(state.selected_year, 2010);
    state.set_year(2030);
    assert_eq!(state.selected_year, 2025);
    state.set_year_range(2030, 2005);
    assert_eq!(state.year_range, (2010, 2025));
}

fn sample_graph() -> NodeLinkGraph {
    let main = |id: &str, count: u32| GraphNode {
        id: id.to_string(),
        kind: NodeKind::Main,
        count,
        parent: None,
    };
    let sub = |id: &str, parent: &str, count: u32| GraphNode {
        id: id.to_string(),
        kind: NodeKind::Sub,
        count,
        parent: Some(parent.to_string()),
    };
    let link = |source: &str, target: &str| GraphLink {
        source: source.to_string(),
        target: target.to_string(),
    };
    NodeLinkGraph {
        nodes: vec![
            main("Computer Vision", 100),
            main("Natural Language Processing", 50),
            sub("Image Segmentation", "Computer Vision", 30),
            sub("Object Detection", "Computer Vision", 20),
        ],
        links: vec![
            link("Computer Vision", "Image Segmentation"),
            link("Computer Vision", "Object Detection"),
        ],
    }
}

#[test]
fn collapsed_graph_shows_only_fields_and_no_links() {
    let graph = sample_graph();
    let visible = visible_graph(&graph, &[]);
    assert_eq!(visible.nodes.len(), 2);
    assert!(visible.links.is_empty());
    assert!(visible.nodes.iter().all(|n| n.kind == NodeKind::Main));
}

#[test]
fn expanding_a_field_reveals_its_subfields_and_links() {
    let graph = sample_graph();
    let expanded = vec!["Computer Vision".to_string()];
    let visible = visible_graph(&graph, &expanded);
    assert_eq!(visible.nodes.len(), 4);
    assert_eq!(visible.links.len(), 2);
    for l in &visible.links {
        assert!(l.source < visible.nodes.len());
        assert!(l.target < visible.nodes.len());
    }
}

#[test]
fn radii_are_stable_across_expansion() {
    let graph = sample_graph();
    let collapsed = visible_graph(&graph, &[]);
    let expanded = visible_graph(&graph, &["Computer Vision".to_string()]);
    let radius_of = |g: &paperscope_views::nodelink::VisibleGraph, id: &str| {
        g.nodes.iter().find(|n| n.id == id).map(|n| n.radius)
    };
    // the biggest field pins the top of the range either way
    assert_eq!(radius_of(&collapsed, "Computer Vision"), Some(55.0));
    assert_eq!(
        radius_of(&collapsed, "Computer Vision"),
        radius_of(&expanded, "Computer Vision")
    );
    assert_eq!(
        radius_of(&collapsed, "Natural Language Processing"),
        radius_of(&expanded, "Natural Language Processing")
    );
    // biggest subfield pins the top of the subfield range
    assert_eq!(radius_of(&expanded, "Image Segmentation"), Some(30.0));
}

fn node_link_for(code: &str) -> NodeLinkData {
    let mut data = NodeLinkData::new();
    data.insert(code.to_string(), CountryGraphs::Flat(sample_graph()));
    data
}

#[test]
fn graph_view_prompts_until_a_country_is_selected() {
    let mut view = GraphView::new(300.0, 300.0);
    let state = SelectionState::default();
    view.sync(&node_link_for("US"), &state);
    assert!(view.render(&state).contains("Select a country to explore"));
}

#[test]
fn graph_view_reports_missing_field_data() {
    let mut view = GraphView::new(300.0, 300.0);
    let mut state = SelectionState::default();
    state.select_country("US");
    view.sync(&NodeLinkData::new(), &state);
    assert!(view.render(&state).contains("No field data for this year"));
}

#[test]
fn graph_view_expand_collapse_flow() {
    let data = node_link_for("US");
    let mut view = GraphView::new(400.0, 400.0);
    let mut state = SelectionState::default();
    state.select_country("US");

    view.sync(&data, &state);
    assert_eq!(view.visible().nodes.len(), 2);

    // clicking the big field toggles its expansion
    let field_ix = view
        .visible()
        .nodes
        .iter()
        .position(|n| n.id == "Computer Vision")
        .unwrap();
    match view.click(field_ix) {
        Some(GraphClick::ToggleField(field)) => state.toggle_field(&field),
        other => panic!("unexpected click result: {:?}", other),
    }
    view.sync(&data, &state);
    assert_eq!(view.visible().nodes.len(), 4);

    let svg = view.render(&state);
    assert!(svg.contains("NLP"));
    assert!(svg.contains("Image Segme"));
}

#[test]
fn settled_simulation_keeps_nodes_inside_the_viewport() {
    let (w, h) = (300.0, 250.0);
    let radii = vec![20.0, 15.0, 10.0, 10.0];
    let links = vec![
        SimLink { source: 0, target: 2 },
        SimLink { source: 0, target: 3 },
        SimLink { source: 1, target: 2 },
    ];
    let mut sim = Simulation::new(&radii, links, w, h);
    sim.settle();
    assert!(sim.is_stopped());
    for (node, r) in sim.nodes().iter().zip(radii) {
        assert!(node.x >= r + EDGE_MARGIN - 1e-9);
        assert!(node.x <= w - r - EDGE_MARGIN + 1e-9);
        assert!(node.y >= r + EDGE_MARGIN - 1e-9);
        assert!(node.y <= h - r - LABEL_MARGIN + 1e-9);
    }
}

#[test]
fn stopped_simulation_never_moves() {
    let mut sim = Simulation::new(&[10.0, 10.0], Vec::new(), 200.0, 200.0);
    sim.settle();
    let before: Vec<(f64, f64)> = sim.nodes().iter().map(|n| (n.x, n.y)).collect();
    assert!(!sim.step());
    let after: Vec<(f64, f64)> = sim.nodes().iter().map(|n| (n.x, n.y)).collect();
    assert_eq!(before, after);
}

#[test]
fn dragged_node_follows_the_pointer() {
    let mut sim = Simulation::new(&[10.0, 10.0, 10.0], Vec::new(), 200.0, 200.0);
    sim.settle();
    sim.drag_start(0);
    sim.drag_to(0, 50.0, 60.0);
    sim.step();
    let node = &sim.nodes()[0];
    assert_eq!((node.x, node.y), (50.0, 60.0));
    sim.drag_end(0);
}

#[test]
fn playhead_wraps_past_the_undefined_first_year() {
    assert_eq!(next_loop_year(2015), 2016);
    assert_eq!(next_loop_year(2024), 2025);
    assert_eq!(next_loop_year(2025), 2011);
}

#[test]
fn autoplay_ticks_and_joins_on_drop() {
    let player = Autoplay::start(Duration::from_millis(5));
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    let mut ticked = false;
    while std::time::Instant::now() < deadline {
        if player.try_tick() {
            ticked = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(ticked);
    drop(player);
}

fn series(code: &str, name: &str, points: &[(u16, Option<f64>)]) -> CountrySeries {
    CountrySeries {
        code: code.to_string(),
        name: name.to_string(),
        points: points
            .iter()
            .map(|&(year, value)| SeriesPoint { year, value })
            .collect(),
    }
}

#[test]
fn empty_trend_panel_prompts_for_countries() {
    let view = TimeSeriesView::new(500.0, 300.0);
    let state = SelectionState::default();
    let svg = view.render(&state, &[]);
    assert!(svg.contains("Click countries on the map to compare trends"));
}

#[test]
fn undefined_growth_points_are_not_drawn() {
    let view = TimeSeriesView::new(500.0, 300.0);
    let mut state = SelectionState::default();
    state.set_view_mode(ViewMode::Growth);
    state.set_year(2012);
    let s = vec![series(
        "US",
        "United States",
        &[(2010, None), (2011, Some(50.0)), (2012, Some(25.0))],
    )];
    let svg = view.render(&state, &s);
    assert!(svg.contains("YoY Growth Rate"));
    // two data dots plus the year-marker highlight, nothing for 2010
    assert_eq!(svg.matches("<circle").count(), 3);
    assert!(svg.contains(">2012<"));
}

#[test]
fn legend_rows_hit_test_in_comparison_order() {
    let view = TimeSeriesView::new(500.0, 300.0);
    let s = vec![
        series("US", "United States", &[(2010, Some(1.0))]),
        series("CN", "China", &[(2010, Some(2.0))]),
    ];
    // legend column starts right of the inner plot area
    assert_eq!(view.legend_at(&s, 420.0, 25.0), Some("US"));
    assert_eq!(view.legend_at(&s, 420.0, 47.0), Some("CN"));
    assert_eq!(view.legend_at(&s, 100.0, 25.0), None);
}

fn square_world() -> Topology {
    serde_json::from_value(serde_json::json!({
        "arcs": [
            [[-10.0, -10.0], [10.0, -10.0], [10.0, 10.0], [-10.0, 10.0], [-10.0, -10.0]]
        ],
        "objects": {
            "countries": {
                "geometries": [
                    { "type": "Polygon", "id": 840, "arcs": [[0]] }
                ]
            }
        }
    }))
    .unwrap()
}

fn us_names() -> HashMap<String, String> {
    let mut names = HashMap::new();
    names.insert("US".to_string(), "United States".to_string());
    names
}

#[test]
fn map_click_selects_and_background_clears() {
    let world = square_world();
    let mut map = MapView::new(&world, us_names(), 400.0, 300.0);
    let mut state = SelectionState::default();

    // the single feature is centered in the fitted viewport
    map.click(190.0, 125.0, &mut state);
    assert_eq!(state.selected_country.as_deref(), Some("US"));
    assert_eq!(state.compared_countries, vec!["US"]);

    map.click(2.0, 2.0, &mut state);
    assert_eq!(state.selected_country, None);
    assert!(state.compared_countries.is_empty());
}

#[test]
fn map_hover_publishes_the_code_and_tooltips_the_name() {
    let world = square_world();
    let mut map = MapView::new(&world, us_names(), 400.0, 300.0);
    let mut state = SelectionState::default();

    map.pointer_move(190.0, 125.0, &mut state);
    assert_eq!(state.hovered_country.as_deref(), Some("US"));

    let snapshot = HashMap::new();
    let growth = HashMap::new();
    let scale = paperscope_rs::scale::ColorScale::for_counts(std::iter::empty());
    let svg = map.render(&state, &scale, &snapshot, &growth, &[]);
    assert!(svg.contains("United States"));

    map.pointer_leave(&mut state);
    assert_eq!(state.hovered_country, None);
}

#[test]
fn legend_gradient_ids_differ_between_render_passes() {
    let world = square_world();
    let mut map = MapView::new(&world, us_names(), 400.0, 300.0);
    let state = SelectionState::default();
    let snapshot = HashMap::new();
    let growth = HashMap::new();
    let scale = paperscope_rs::scale::ColorScale::for_counts(std::iter::empty());

    let first = map.render(&state, &scale, &snapshot, &growth, &[]);
    let second = map.render(&state, &scale, &snapshot, &growth, &[]);
    assert!(first.contains("legend-gradient-absolute-1"));
    assert!(second.contains("legend-gradient-absolute-2"));
}

fn tooltip_origin(svg: &str) -> (f64, f64) {
    let attr = |line: &str, name: &str| -> f64 {
        let pat = format!("{}=\"", name);
        let start = line.find(&pat).unwrap() + pat.len();
        let end = line[start..].find('"').unwrap() + start;
        line[start..end].parse().unwrap()
    };
    let rect = svg
        .lines()
        .find(|l| l.starts_with("<rect") && l.contains("rgba(10,14,26,0.95)"))
        .expect("no tooltip rect rendered");
    (attr(rect, "x"), attr(rect, "y"))
}

#[test]
fn tooltip_flips_away_from_the_far_edges() {
    let world = square_world();
    let mut map = MapView::new(&world, us_names(), 400.0, 300.0);
    let mut state = SelectionState::default();
    let snapshot = HashMap::new();
    let growth = HashMap::new();
    let scale = paperscope_rs::scale::ColorScale::for_counts(std::iter::empty());

    // hovering near the bottom-right corner of the feature
    map.pointer_move(290.0, 240.0, &mut state);
    let svg = map.render(&state, &scale, &snapshot, &growth, &[]);
    let (x, y) = tooltip_origin(&svg);
    assert!(x >= 10.0 && x + 180.0 <= 400.0 - 10.0, "x = {}", x);
    assert!(y >= 10.0 && y + 100.0 <= 300.0 - 10.0, "y = {}", y);
    // flipped to the left of and above the pointer
    assert!(x < 290.0);
    assert!(y < 240.0);
}

#[test]
fn tooltip_never_leaves_the_render_surface() {
    let world = square_world();
    let mut map = MapView::new(&world, us_names(), 400.0, 300.0);
    let mut state = SelectionState::default();
    let snapshot = HashMap::new();
    let growth = HashMap::new();
    let scale = paperscope_rs::scale::ColorScale::for_counts(std::iter::empty());

    // here the left flip would overshoot past the origin, so the
    // margin floor catches it
    map.pointer_move(200.0, 100.0, &mut state);
    let svg = map.render(&state, &scale, &snapshot, &growth, &[]);
    let (x, y) = tooltip_origin(&svg);
    assert_eq!(x, 10.0);
    assert_eq!(y, 115.0);
}

fn archive_fixture() -> Arc<Archive> {
    let rec = |code: &str, name: &str, year: u16, papers: u32| CountryYearRecord {
        country_code: code.to_string(),
        country: name.to_string(),
        year,
        papers,
    };
    Arc::new(Archive {
        country_year: vec![
            rec("US", "United States", 2010, 100),
            rec("US", "United States", 2011, 150),
            rec("US", "United States", 2012, 90),
        ],
        summary: vec![CountrySummary {
            country_code: "US".to_string(),
            country: "United States".to_string(),
            total_papers: 340,
            growth_ratio: 0.9,
        }],
        subfield: Vec::new(),
        node_link: node_link_for("US"),
        world: square_world(),
    })
}

fn small_panels() -> PanelSizes {
    PanelSizes {
        map: (400.0, 300.0),
        graph: (300.0, 300.0),
        series: (500.0, 300.0),
    }
}

#[test]
fn dashboard_routes_map_clicks_into_every_panel() {
    let mut dashboard = Dashboard::new(archive_fixture(), small_panels());
    dashboard.map_click(190.0, 125.0);
    assert_eq!(dashboard.state.selected_country.as_deref(), Some("US"));

    let series = dashboard.comparison_series();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].name, "United States");

    assert!(dashboard.render_series().contains("United Sta"));
    assert!(dashboard.render_graph().contains("Computer Vision"));
    assert!(dashboard.render_map().contains("Click empty area to clear selection"));
}

#[test]
fn dashboard_growth_mode_switches_scale_and_legend() {
    let mut dashboard = Dashboard::new(archive_fixture(), small_panels());
    dashboard.state.set_view_mode(ViewMode::Growth);
    dashboard.state.set_year(2011);
    let svg = dashboard.render_map();
    assert!(svg.contains("Year-over-Year Growth"));
    assert!(svg.contains("-30%"));
    assert!(svg.contains("+60%"));
}

#[test]
fn dashboard_playback_rewinds_from_the_final_year() {
    let mut dashboard = Dashboard::new(archive_fixture(), small_panels());
    dashboard.state.set_year(2025);
    dashboard.toggle_play();
    assert!(dashboard.is_playing());
    assert_eq!(dashboard.state.selected_year, 2010);
    dashboard.toggle_play();
    assert!(!dashboard.is_playing());
}
