#![cfg(feature = "web")]
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};

use crate::aggregate::{self, FixationPath};
use crate::config::Config;
use crate::graph::{self, Figure};
use crate::loader::Dataset;
use crate::pages::{self, APP_TITLE, ChartKind, Page, Route, Selector};

const ERROR_IMAGE_URL: &str = "/assets/error.png";
const LOGO_URL: &str = "https://upload.wikimedia.org/wikipedia/commons/6/6a/Durga_eyes.svg";

/// Shared, read-only state handed to every request
pub struct AppState {
    pub dataset: Dataset,
    pub config: Config,
}

#[derive(Deserialize)]
struct SelectionQuery {
    user: Option<String>,
    map: Option<String>,
}

#[derive(Deserialize)]
struct PageQuery {
    path: Option<String>,
}

#[derive(Deserialize, Default)]
struct TableQuery {
    filter: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct OptionsResponse<'a> {
    users: &'a [String],
    maps: &'a [String],
}

#[derive(Serialize)]
struct TableResponse<'a> {
    columns: &'a [String],
    total: usize,
    offset: usize,
    rows: &'a [&'a [String]],
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

/// Build the dashboard's router over the given state
pub fn router(state: Arc<AppState>) -> Router {
    let stimuli = ServeDir::new(&state.config.stimuli_dir);
    let error_image = ServeFile::new(&state.config.error_image);

    Router::new()
        .route("/api/page", get(get_page))
        .route("/api/options", get(get_options))
        .route("/api/dataset", get(get_dataset))
        .route("/api/figure/path", get(path_figure))
        .route("/api/figure/user", get(user_figure))
        .route("/api/figure/map", get(map_figure))
        .route("/chart/path.png", get(path_chart))
        .route("/chart/user.png", get(user_chart))
        .route("/chart/map.png", get(map_chart))
        .route_service(ERROR_IMAGE_URL, error_image)
        .nest_service("/stimuli", stimuli)
        .fallback(serve_page)
        .with_state(state)
}

/// Serve the dashboard until the process is stopped
pub async fn run(dataset: Dataset, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let app = router(Arc::new(AppState { dataset, config }));

    let listener = TcpListener::bind(bind_addr.as_str()).await?;
    log::info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// Selected value, or the first option when nothing was chosen
fn selected(value: Option<String>, options: &[String]) -> String {
    value
        .filter(|v| !v.is_empty())
        .or_else(|| options.first().cloned())
        .unwrap_or_default()
}

fn image_url(config: &Config, image: &Path) -> String {
    if image == config.error_image {
        return ERROR_IMAGE_URL.to_string();
    }
    let name = image
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    format!("/stimuli/{}", urlencoding::encode(&name))
}

fn selection_path(state: &AppState, query: SelectionQuery) -> FixationPath {
    let user = selected(query.user, &state.dataset.users);
    let map = selected(query.map, &state.dataset.maps);
    aggregate::fixation_path(&state.dataset, &state.config, &user, &map)
}

async fn get_page(
    Query(query): Query<PageQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let path = query.path.unwrap_or_else(|| "/".to_string());
    Json(pages::page_for(&path, &state.dataset))
}

async fn get_options(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(OptionsResponse {
        users: &state.dataset.users,
        maps: &state.dataset.maps,
    })
    .into_response()
}

async fn get_dataset(
    Query(query): Query<TableQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rows = state.dataset.table_rows(query.filter.as_deref().unwrap_or(""));
    let offset = query.offset.unwrap_or(0).min(rows.len());
    let limit = query.limit.unwrap_or(state.config.table_page_size);
    let end = offset.saturating_add(limit).min(rows.len());

    Json(TableResponse {
        columns: &state.dataset.columns,
        total: rows.len(),
        offset,
        rows: &rows[offset..end],
    })
    .into_response()
}

async fn path_figure(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let path = selection_path(&state, query);
    Json(Figure::fixation_path(&path, |image| image_url(&state.config, image)))
}

async fn user_figure(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user = selected(query.user, &state.dataset.users);
    Json(Figure::user_average(&aggregate::user_average(&state.dataset, &user)))
}

async fn map_figure(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let map = selected(query.map, &state.dataset.maps);
    Json(Figure::map_average(&aggregate::map_average(&state.dataset, &map)))
}

async fn path_chart(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let path = selection_path(&state, query);
    png_response(graph::render_fixation_path(&path))
}

async fn user_chart(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let user = selected(query.user, &state.dataset.users);
    let avg = aggregate::user_average(&state.dataset, &user);
    png_response(graph::render_user_average(
        &avg,
        state.config.chart_width,
        state.config.chart_height,
    ))
}

async fn map_chart(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let map = selected(query.map, &state.dataset.maps);
    let avg = aggregate::map_average(&state.dataset, &map);
    png_response(graph::render_map_average(
        &avg,
        state.config.chart_width,
        state.config.chart_height,
    ))
}

fn png_response(result: Result<Vec<u8>, Box<dyn std::error::Error>>) -> Response {
    match result {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e) => {
            log::error!("Chart rendering failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: "error".to_string(),
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// HTML pages: every path not claimed by the API goes through the router
async fn serve_page(
    uri: Uri,
    State(state): State<Arc<AppState>>,
    query: Option<Query<TableQuery>>,
) -> Response {
    let path = uri.path();
    let page = pages::page_for(path, &state.dataset);
    let table_query = query.map(|Query(q)| q).unwrap_or_default();

    let mut content = String::new();
    render_page(&mut content, &page, &state, table_query);

    let html = include_str!("./static/index.html")
        .replace("{{title}}", &escape(APP_TITLE))
        .replace("{{sidebar}}", &render_sidebar(page.route))
        .replace("{{content}}", &content);

    let status = if page.route == Route::NotFound {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (status, Html(html)).into_response()
}

fn render_sidebar(active: Route) -> String {
    let mut html = String::from("<div class=\"sidebar\">\n");
    let _ = writeln!(html, "<img src=\"{}\" alt=\"\">\n<hr>", LOGO_URL);
    html.push_str("<p>FHGR CDS-202 - Eyetracking Datensatz</p>\n<nav>\n");
    for route in Route::NAVIGATION {
        let class = if route == active { " class=\"active\"" } else { "" };
        let _ = writeln!(
            html,
            "<a href=\"{}\"{}>{}</a>",
            route.path().unwrap_or("/"),
            class,
            route.nav_label()
        );
    }
    html.push_str("</nav>\n</div>");
    html
}

fn render_page(out: &mut String, page: &Page, state: &AppState, table: TableQuery) {
    if page.route == Route::NotFound {
        let _ = writeln!(out, "<div class=\"not-found\">\n<h1>{}</h1>\n<hr>", escape(&page.title));
        for text in &page.text {
            let _ = writeln!(out, "<p class=\"lead\">{}</p>", escape(&text.text));
        }
        out.push_str("</div>");
        return;
    }

    let _ = writeln!(out, "<h1>{}</h1>", escape(&page.title));
    if page.route == Route::Home {
        out.push_str("<br>\n");
    }
    for text in &page.text {
        match text.level {
            1..=6 => {
                let _ = writeln!(out, "<h{0}>{1}</h{0}>", text.level, escape(&text.text));
            }
            _ => {
                let _ = writeln!(out, "<p>{}</p>", escape(&text.text));
            }
        }
    }

    for selector in &page.selectors {
        render_selector(out, selector);
    }

    if let Some(chart) = page.chart {
        render_chart(out, chart, &page.selectors);
    }

    if page.table {
        render_table(out, state, table);
    }
}

fn render_selector(out: &mut String, selector: &Selector) {
    if let Some(label) = selector.label {
        let _ = writeln!(out, "<h5><label for=\"{}\">{}</label></h5>", selector.id, escape(label));
    }
    let _ = writeln!(
        out,
        "<select id=\"{}\" name=\"{}\" class=\"selector\">",
        selector.id,
        selector.kind.param()
    );
    for option in &selector.options {
        let chosen = if selector.value.as_ref() == Some(option) {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "<option value=\"{0}\"{1}>{0}</option>",
            escape(option),
            chosen
        );
    }
    out.push_str("</select>\n");
}

fn render_chart(out: &mut String, chart: ChartKind, selectors: &[Selector]) {
    let endpoint = format!("/chart/{}.png", chart.endpoint());
    let query: Vec<String> = selectors
        .iter()
        .filter_map(|s| {
            let value = s.value.as_deref()?;
            Some(format!("{}={}", s.kind.param(), urlencoding::encode(value)))
        })
        .collect();
    let _ = writeln!(
        out,
        "<div><img id=\"{}\" class=\"chart\" data-endpoint=\"{}\" src=\"{}?{}\" alt=\"\"></div>",
        chart.id(),
        endpoint,
        endpoint,
        escape(&query.join("&"))
    );
}

fn render_table(out: &mut String, state: &AppState, query: TableQuery) {
    let filter = query.filter.unwrap_or_default();
    let rows = state.dataset.table_rows(&filter);
    let limit = query.limit.unwrap_or(state.config.table_page_size).max(1);
    let offset = query.offset.unwrap_or(0).min(rows.len());
    let end = offset.saturating_add(limit).min(rows.len());

    let _ = writeln!(
        out,
        "<form method=\"get\" action=\"{}\"><input name=\"filter\" value=\"{}\" placeholder=\"filter data...\"></form>",
        Route::Data.path().unwrap_or("/data"),
        escape(&filter)
    );

    out.push_str("<table id=\"tbl\">\n<thead><tr>");
    for column in &state.dataset.columns {
        let _ = write!(out, "<th>{}</th>", escape(column));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in &rows[offset..end] {
        out.push_str("<tr>");
        for cell in row.iter() {
            let _ = write!(out, "<td>{}</td>", escape(cell));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");

    let _ = write!(out, "<p>{}-{} / {}", if end > offset { offset + 1 } else { 0 }, end, rows.len());
    let filter_param = urlencoding::encode(&filter);
    if offset > 0 {
        let _ = write!(
            out,
            " <a href=\"/data?filter={}&amp;offset={}&amp;limit={}\">&laquo;</a>",
            filter_param,
            offset.saturating_sub(limit),
            limit
        );
    }
    if end < rows.len() {
        let _ = write!(
            out,
            " <a href=\"/data?filter={}&amp;offset={}&amp;limit={}\">&raquo;</a>",
            filter_param, end, limit
        );
    }
    out.push_str("</p>\n");
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn selection_falls_back_to_first_option() {
        let options = vec!["u1".to_string(), "u2".to_string()];
        assert_eq!(selected(None, &options), "u1");
        assert_eq!(selected(Some(String::new()), &options), "u1");
        assert_eq!(selected(Some("u2".to_string()), &options), "u2");
        assert_eq!(selected(None, &[]), "");
    }

    #[test]
    fn sidebar_marks_exact_route_active() {
        let html = render_sidebar(Route::Map);
        assert!(html.contains("<a href=\"/map\" class=\"active\">Average Maps</a>"));
        assert!(html.contains("<a href=\"/\">Startseite</a>"));

        let html = render_sidebar(Route::NotFound);
        assert!(!html.contains("active"));
    }

    #[test]
    fn image_urls() {
        let config = Config::default();
        assert_eq!(image_url(&config, &config.error_image), ERROR_IMAGE_URL);
        assert_eq!(
            image_url(&config, &config.stimuli_dir.join("03_Köln S1.jpg")),
            "/stimuli/03_K%C3%B6ln%20S1.jpg"
        );
    }
}
