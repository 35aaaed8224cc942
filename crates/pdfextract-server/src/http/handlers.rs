use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use pdfextract_core::model::Schema;
use serde_json::json;

use super::AppState;

static REQUESTS_SERVED: OnceLock<AtomicU64> = OnceLock::new();

fn requests_served() -> &'static AtomicU64 {
    REQUESTS_SERVED.get_or_init(|| AtomicU64::new(0))
}

fn json_error(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "success": false, "error": format!("{message}") }))).into_response()
}

/// `GET /`
pub(super) async fn root() -> Response {
    Json(json!({
        "service": "pdfextract",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// `GET /health`
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let status = match state.templates.stats() {
        Ok(_) => "healthy",
        Err(e) => {
            warn!("health check: template store unreachable: {e}");
            "degraded"
        }
    };
    Json(json!({ "status": status, "version": env!("CARGO_PKG_VERSION") })).into_response()
}

/// `GET /stats`
pub(super) async fn stats(State(state): State<AppState>) -> Response {
    let cache_stats = state.cache.stats();
    let template_stats = match state.templates.stats() {
        Ok(stats) => Some(stats),
        Err(e) => {
            error!("failed to read template store stats: {e}");
            None
        }
    };

    Json(json!({
        "pipeline": { "requests_served": requests_served().load(Ordering::Relaxed) },
        "cache": cache_stats,
        "templates": template_stats,
    }))
    .into_response()
}

/// `POST /extract`
pub(super) async fn extract(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut label: Option<String> = None;
    let mut schema_raw: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("malformed multipart body: {e}")),
        };

        match field.name() {
            Some("file") => {
                file_name = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                    Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("failed to read file part: {e}")),
                }
            }
            Some("label") => match field.text().await {
                Ok(text) => label = Some(text),
                Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("failed to read label part: {e}")),
            },
            Some("extraction_schema") => match field.text().await {
                Ok(text) => schema_raw = Some(text),
                Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("failed to read extraction_schema part: {e}")),
            },
            _ => {}
        }
    }

    let file_bytes = match file_bytes {
        Some(bytes) => bytes,
        None => return json_error(StatusCode::UNPROCESSABLE_ENTITY, "missing required form part: file"),
    };
    let label = match label {
        Some(label) => label,
        None => return json_error(StatusCode::UNPROCESSABLE_ENTITY, "missing required form part: label"),
    };
    let schema_raw = match schema_raw {
        Some(raw) => raw,
        None => return json_error(StatusCode::UNPROCESSABLE_ENTITY, "missing required form part: extraction_schema"),
    };

    let schema = match parse_schema(&schema_raw) {
        Ok(schema) => schema,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("invalid extraction_schema: {e}")),
    };

    let schema_fields: Vec<&str> = schema.fields().collect();
    let file_size = file_bytes.len();
    let request_time = now_rfc3339_like();

    requests_served().fetch_add(1, Ordering::Relaxed);

    match state.pipeline.extract(file_bytes, label.clone(), schema).await {
        Ok(output) => Json(json!({
            "success": true,
            "data": output.data,
            "metadata": {
                "request_time": request_time,
                "file_name": file_name,
                "file_size": file_size,
                "label": label,
                "schema_fields": schema_fields,
                "_pipeline": { "method": output.method, "steps": output.steps },
            },
        }))
        .into_response(),
        Err(e) => {
            error!("extraction failed for label {label:?}: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

fn parse_schema(raw: &str) -> Result<Schema, String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let object = value.as_object().ok_or("extraction_schema must be a JSON object")?;

    let mut schema = Schema::new();
    for (field, description) in object {
        let description = description.as_str().ok_or_else(|| {
            format!("extraction_schema[{field}] must be a string description")
        })?;
        schema.insert(field.clone(), description.to_string());
    }
    Ok(schema)
}

fn now_rfc3339_like() -> String {
    let since_epoch =
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    format!("{}", since_epoch.as_secs())
}
