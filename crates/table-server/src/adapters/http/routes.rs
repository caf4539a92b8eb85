//! HTTP routes for paged table access
//!
//! ## Endpoints
//!
//! - `GET /tables/{table}?startRow=&rowLimit=&sortby=<col>+<asc|desc>` - One formatted page as JSON
//! - `GET /table_viewer?table_name=<name>` - Viewer page for a table
//! - anything else - static files from the configured directory

use std::{
    path::{Path as FsPath, PathBuf},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use super::viewer::ViewerTemplate;
use crate::{
    core::{
        connection::ConnectionPool,
        limits::{DEFAULT_ROW_LIMIT, DEFAULT_START_ROW},
        types::{PageRequest, PageResponse, SortDirection},
    },
    error::{AppError, AppResult},
};

/// Shared state for the table routes.
#[derive(Clone)]
pub struct TableApiState {
    pub pool: ConnectionPool,
    pub db_path: PathBuf,
    pub viewer: Arc<ViewerTemplate>,
}

/// Raw query parameters; numbers are parsed by hand so bad input maps to a 400 with our error body.
#[derive(Debug, Default, Deserialize)]
pub struct TableQuery {
    #[serde(rename = "startRow")]
    pub start_row: Option<String>,
    #[serde(rename = "rowLimit")]
    pub row_limit: Option<String>,
    #[serde(default)]
    pub sortby: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewerQuery {
    #[serde(default)]
    pub table_name: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

pub fn create_table_router(state: TableApiState, static_dir: &FsPath) -> Router {
    Router::new()
        .route("/tables/:table_name", get(table_data_handler))
        .route("/table_viewer", get(table_viewer_handler))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

async fn table_data_handler(
    State(state): State<TableApiState>,
    Path(table_name): Path<String>,
    Query(query): Query<TableQuery>,
) -> Result<Json<PageResponse>, ApiError> {
    let request = page_request(&query)?;
    let worker = state.pool.worker(&state.db_path)?;
    let page = worker.page(table_name.clone(), request.clone()).await?;

    tracing::debug!(
        table = %table_name,
        start_row = page.request.start_row,
        row_limit = page.request.row_limit,
        sort = ?request.sort_column.as_ref().zip(request.sort_direction),
        rows = page.results.len(),
        worker = worker.index,
        "served page"
    );
    Ok(Json(page))
}

async fn table_viewer_handler(
    State(state): State<TableApiState>,
    Query(query): Query<ViewerQuery>,
) -> Html<String> {
    Html(state.viewer.render(&query.table_name))
}

fn page_request(query: &TableQuery) -> AppResult<PageRequest> {
    let (sort_column, sort_direction) = parse_sort_token(&query.sortby);
    Ok(PageRequest {
        sort_column,
        sort_direction,
        start_row: parse_bound("startRow", query.start_row.as_deref(), DEFAULT_START_ROW)?,
        row_limit: parse_bound("rowLimit", query.row_limit.as_deref(), DEFAULT_ROW_LIMIT)?,
    })
}

fn parse_bound(name: &str, raw: Option<&str>, default: i64) -> AppResult<i64> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| AppError::InvalidRequest(format!("{name} must be an integer, got {s:?}"))),
    }
}

/// Split `<column>+<direction>`. A space separator is accepted too, since a bare `+`
/// in a query string decodes to a space. Malformed tokens yield no sort.
pub fn parse_sort_token(token: &str) -> (Option<String>, Option<SortDirection>) {
    let token = token.trim();
    let Some((col, dir)) = token.rsplit_once(|c: char| c == '+' || c == ' ') else {
        return (None, None);
    };
    let col = col.trim();
    if col.is_empty() {
        return (None, None);
    }
    (Some(col.to_string()), SortDirection::parse(dir))
}

// ── Error type ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TableNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code(),
        });
        (status, body).into_response()
    }
}
