use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{net::SocketAddr, path::Path, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    CompressionLevel,
};

use paperscope_rs::{stowage::Archive, ViewMode};
use paperscope_views::{
    dashboard::{Dashboard, PanelSizes},
    SelectionState,
};

#[derive(Deserialize)]
struct DataQ {
    #[serde(rename = "type")]
    kind: Option<String>,
    country: Option<String>,
    year: Option<u16>,
}

#[derive(Deserialize)]
struct RenderQ {
    year: Option<u16>,
    mode: Option<String>,
    country: Option<String>,
    /// Comma separated comparison codes, oldest first.
    compare: Option<String>,
    subfield: Option<String>,
    /// Comma separated expanded field names.
    expand: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Serialize, Clone)]
struct CountryOut {
    code: String,
    name: String,
    #[serde(rename = "totalPapers")]
    total_papers: u64,
    #[serde(rename = "growthRatio")]
    growth_ratio: f64,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

#[tokio::main]
async fn main() {
    let path: String = std::env::args().last().unwrap();
    println!("read from path: {}", path);
    let archive = match Archive::load(Path::new(&path)) {
        Ok(a) => Arc::new(a),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    println!(
        "loaded {} country-year rows, {} countries, {} subfield rows, {} graphs",
        archive.country_year.len(),
        archive.summary.len(),
        archive.subfield.len(),
        archive.node_link.len(),
    );

    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);
    let compression = CompressionLayer::new()
        .gzip(true)
        .quality(CompressionLevel::Fastest);

    let api = Router::new()
        .route("/data", get(data_get))
        .route("/countries", get(countries_get))
        .route("/render/map", get(render_map_get))
        .route("/render/series", get(render_series_get))
        .route("/render/graph", get(render_graph_get))
        .with_state(archive)
        .layer(ServiceBuilder::new().layer(cors).layer(compression));

    let app = Router::new().nest("/v1", api);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3039));
    println!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Raw collection passthrough, filtered like the file-backed API this
/// replaces: optional country and year narrow the row sets, `all`
/// bundles the three tabular collections.
async fn data_get(
    q: Query<DataQ>,
    State(archive): State<Arc<Archive>>,
) -> Result<Json<Value>, ApiError> {
    let country = q.country.as_deref();
    let year = q.year;
    let rows = |v: Value| -> Value {
        match v {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .filter(|r| {
                        country.map_or(true, |c| r["country_code"] == c)
                            && year.map_or(true, |y| r["year"] == y)
                    })
                    .collect(),
            ),
            other => other,
        }
    };
    let country_year = || rows(json!(archive.country_year));
    let summary = || rows(json!(archive.summary));
    let subfield = || rows(json!(archive.subfield));

    let out = match q.kind.as_deref().unwrap_or("all") {
        "country-year" => country_year(),
        "summary" => summary(),
        "subfield" => subfield(),
        "nodelink" => match country {
            Some(c) => match archive.node_link.get(c) {
                Some(graphs) => json!(graphs),
                None => {
                    return Err(api_error(StatusCode::NOT_FOUND, "no graphs for country"))
                }
            },
            None => json!(archive.node_link),
        },
        "all" => json!({
            "countryYear": country_year(),
            "summary": summary(),
            "subfield": subfield(),
        }),
        _ => return Err(api_error(StatusCode::BAD_REQUEST, "unknown data type")),
    };
    Ok(Json(out))
}

async fn countries_get(State(archive): State<Arc<Archive>>) -> Json<Value> {
    let countries: Vec<CountryOut> = archive
        .summary
        .iter()
        .map(|s| CountryOut {
            code: s.country_code.clone(),
            name: s.country.clone(),
            total_papers: s.total_papers,
            growth_ratio: s.growth_ratio,
        })
        .collect();
    Json(json!({ "countries": countries }))
}

/// Reconstructs a selection from the query string. Country selection
/// runs through the regular transition, then the drill-down expansion
/// is applied on top so it is not lost to the country-change reset.
fn state_from(q: &RenderQ) -> SelectionState {
    let mut state = SelectionState::default();
    if let Some(mode) = q.mode.as_deref() {
        state.set_view_mode(match mode {
            "growth" => ViewMode::Growth,
            _ => ViewMode::Absolute,
        });
    }
    if let Some(year) = q.year {
        state.set_year(year);
    }
    if let Some(compare) = q.compare.as_deref() {
        for code in compare.split(',').filter(|c| !c.is_empty()) {
            state.select_country(code);
        }
        state.selected_country = None;
    }
    if let Some(country) = q.country.as_deref() {
        if !state.is_compared(country) {
            state.select_country(country);
        } else {
            state.selected_country = Some(country.to_string());
        }
    }
    if let Some(sf) = q.subfield.as_deref() {
        state.select_subfield(sf);
    }
    if let Some(expand) = q.expand.as_deref() {
        for field in expand.split(',').filter(|f| !f.is_empty()) {
            state.toggle_field(field);
        }
    }
    state
}

fn dashboard_for(archive: Arc<Archive>, q: &RenderQ, panel: &str) -> Dashboard {
    let mut sizes = PanelSizes::default();
    let (w, h) = match panel {
        "map" => &mut sizes.map,
        "graph" => &mut sizes.graph,
        _ => &mut sizes.series,
    };
    if let Some(qw) = q.width {
        *w = qw.clamp(100.0, 4000.0);
    }
    if let Some(qh) = q.height {
        *h = qh.clamp(100.0, 4000.0);
    }
    let mut dashboard = Dashboard::new(archive, sizes);
    dashboard.state = state_from(q);
    dashboard
}

fn svg_response(svg: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg)
}

async fn render_map_get(
    q: Query<RenderQ>,
    State(archive): State<Arc<Archive>>,
) -> impl IntoResponse {
    let mut dashboard = dashboard_for(archive, &q, "map");
    svg_response(dashboard.render_map())
}

async fn render_series_get(
    q: Query<RenderQ>,
    State(archive): State<Arc<Archive>>,
) -> impl IntoResponse {
    let dashboard = dashboard_for(archive, &q, "series");
    svg_response(dashboard.render_series())
}

async fn render_graph_get(
    q: Query<RenderQ>,
    State(archive): State<Arc<Archive>>,
) -> impl IntoResponse {
    let mut dashboard = dashboard_for(archive, &q, "graph");
    svg_response(dashboard.render_graph())
}
