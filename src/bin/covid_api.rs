use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use covid_trends::config::AppConfig;
use covid_trends::io::load_dataset;
use covid_trends::{Column, CovidError, Metric, MetricsEngine, ScaleOptions};

#[derive(Clone)]
struct AppState {
    engine: Arc<MetricsEngine>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    term: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeriesQuery {
    scale_by: Option<Column>,
    factor: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "covid_trends=info,covid_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_file = std::env::var_os("COVID_CONFIG").map(std::path::PathBuf::from);
    let config = AppConfig::load(config_file.as_deref())?;

    // CSV parsing is blocking; keep it off the async workers
    let data_cfg = config.data.clone();
    let dataset = tokio::task::spawn_blocking(move || load_dataset(&data_cfg))
        .await
        .context("dataset loader panicked")?
        .context("failed to load dataset")?;
    let engine = MetricsEngine::new(dataset, config.analysis.clone())?;

    let state = AppState {
        engine: Arc::new(engine),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/countries", get(countries))
        .route("/countries/search", get(search))
        .route("/countries/:name/rows", get(rows))
        .route("/countries/:name/series/:metric", get(series))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server host/port")?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.context("bind failed")?;
    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}

fn error_response(e: CovidError) -> (StatusCode, Json<serde_json::Value>) {
    let code = match e {
        CovidError::UnknownCountry(_) => StatusCode::NOT_FOUND,
        CovidError::UnknownMetric(_) | CovidError::InvalidWindowSize { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, Json(json!({"error": e.to_string()})))
}

async fn healthz() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

async fn countries(State(st): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "countries": st.engine.all_countries(),
        "dropped": st.engine.dataset().unmatched_countries(),
    }))
}

async fn search(State(st): State<AppState>, Query(q): Query<SearchQuery>) -> impl IntoResponse {
    let term = q.term.unwrap_or_default();
    Json(st.engine.find_country(&term).into_iter().map(String::from).collect::<Vec<_>>())
}

async fn rows(State(st): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    match st.engine.by_country(&name) {
        Ok(rows) => (StatusCode::OK, Json(json!(rows))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn series(
    State(st): State<AppState>,
    Path((name, metric)): Path<(String, String)>,
    Query(q): Query<SeriesQuery>,
) -> impl IntoResponse {
    let metric: Metric = match metric.parse() {
        Ok(m) => m,
        Err(e) => return error_response(e).into_response(),
    };
    let opts = ScaleOptions {
        scale_by: q.scale_by,
        factor: q.factor.unwrap_or(1.0),
    };
    match st.engine.series(&name, metric, &opts) {
        Ok(s) => {
            let dates: Vec<String> = st
                .engine
                .by_country(&name)
                .map(|rows| rows.iter().skip(s.offset).take(s.len()).map(|r| r.date.to_string()).collect())
                .unwrap_or_default();
            // NaN values (undefined rates) serialize as null
            (StatusCode::OK, Json(json!({"series": s, "dates": dates}))).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}
