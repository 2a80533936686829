//! HTTP boundary of the report renderer.
//!
//! `POST /api/pdf` renders the rounds report; `POST /api/pdf/{template}` selects any template.
//! Bodies may be form encoded or JSON.  Rendering runs on the blocking thread pool.

use std::io;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use log::{error, info, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::net::TcpListener;

use rtl_report::templates::UnknownTemplate;
use rtl_report::{Clock, RenderedDocument, ReportError, ReportRenderer, ReportTemplate, SystemClock};

/// Characters kept verbatim in the `filename*` parameter.
const FILENAME_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Shared, read-only state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    renderer: Arc<ReportRenderer>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(renderer: ReportRenderer) -> Self {
        Self::with_clock(renderer, Arc::new(SystemClock))
    }

    pub fn with_clock(renderer: ReportRenderer, clock: Arc<dyn Clock>) -> Self {
        Self {
            renderer: Arc::new(renderer),
            clock,
        }
    }
}

/// Errors returned to HTTP clients as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    UnknownTemplate(#[from] UnknownTemplate),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Render(#[from] ReportError),
    #[error("render task failed: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UnknownTemplate(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Render(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Render(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("rejected request: {self}");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/pdf", post(render_rounds))
        .route("/api/pdf/:template", post(render_named))
        .with_state(state)
}

/// Serves the API until the listener fails.
pub async fn serve(listener: TcpListener, state: AppState) -> io::Result<()> {
    if let Ok(address) = listener.local_addr() {
        info!("Listening on http://{address}");
    }
    axum::serve(listener, router(state)).await
}

async fn render_rounds(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    render(state, ReportTemplate::Rounds, &headers, &body).await
}

async fn render_named(
    State(state): State<AppState>,
    Path(template): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let template: ReportTemplate = template.parse()?;
    render(state, template, &headers, &body).await
}

async fn render(
    state: AppState,
    template: ReportTemplate,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ApiError> {
    let fields = decode_fields(headers, body)?;
    let AppState { renderer, clock } = state;
    let document = tokio::task::spawn_blocking(move || {
        renderer.render_fields(template, &fields, clock.as_ref())
    })
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))??;

    info!(
        "{template}: {} pages, {} bytes",
        document.page_count,
        document.bytes.len()
    );
    pdf_response(document)
}

/// Decodes a JSON object or a form body into one field map.
///
/// Form values are kept as strings; JSON values keep their type.
pub fn decode_fields(headers: &HeaderMap, body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with("application/json"));

    if is_json {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        return match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(ApiError::BadRequest(
                "request body must be a JSON object".to_string(),
            )),
            Err(err) => Err(ApiError::BadRequest(format!("invalid JSON body: {err}"))),
        };
    }

    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|err| ApiError::BadRequest(format!("invalid form body: {err}")))?;
    Ok(pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect())
}

/// `attachment; filename*=UTF-8''<percent-encoded name>`
pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}",
        utf8_percent_encode(filename, FILENAME_SAFE)
    )
}

fn pdf_response(document: RenderedDocument) -> Result<Response, ApiError> {
    let disposition = HeaderValue::from_str(&content_disposition(&document.filename))
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}
