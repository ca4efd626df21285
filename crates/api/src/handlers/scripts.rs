//! Handlers for the script endpoints.

use std::collections::{BTreeMap, HashMap};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use jojo_core::scripting::{ExecutionResult, ScriptMetadata};

use crate::error::{AppError, AppResult};
use crate::query::ScriptListParams;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ScriptsResponse {
    pub scripts: BTreeMap<String, ScriptMetadata>,
}

#[derive(Debug, Serialize)]
pub struct NamesResponse {
    pub names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ScriptResponse {
    pub script: ScriptMetadata,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    pub scripts: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /scripts
///
/// Metadata for every script matching the tag filter, or just the names
/// with `?names=true`.
pub async fn list_scripts(
    State(state): State<AppState>,
    Query(params): Query<ScriptListParams>,
) -> Response {
    let registry = state.registry.current().await;
    let filter = params.tag_filter();

    if params.names {
        Json(NamesResponse {
            names: registry.query_names(&filter),
        })
        .into_response()
    } else {
        Json(ScriptsResponse {
            scripts: registry.query(&filter),
        })
        .into_response()
    }
}

/// GET /scripts/{name}
pub async fn get_script(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ScriptResponse>> {
    let registry = state.registry.current().await;
    let script = registry.require(&name)?.metadata();
    Ok(Json(ScriptResponse { script }))
}

/// POST|PUT|DELETE /scripts/{name}
///
/// Run the script. Parameters come from the query string, overridden by a
/// JSON object body when one is sent.
pub async fn run_script(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ExecutionResult>> {
    let mut params = query;
    params.extend(body_params(&headers, &body)?);

    let registry = state.registry.current().await;
    let script = registry.require(&name)?;

    let result = state.engine.execute(script, &params).await?;
    Ok(Json(result))
}

/// POST /reload
///
/// Rescan the script directory and swap in the new registry.
pub async fn reload(State(state): State<AppState>) -> AppResult<Json<ReloadResponse>> {
    let registry = state.registry.reload().await?;
    Ok(Json(ReloadResponse {
        status: "ok",
        scripts: registry.len(),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a JSON object body into string parameters.
///
/// An empty body yields no parameters. Strings are taken verbatim, `null`
/// becomes an empty string, and other values use their JSON text.
fn body_params(headers: &HeaderMap, body: &[u8]) -> AppResult<HashMap<String, String>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(HashMap::new());
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");
    if !content_type.starts_with("application/json") {
        return Err(AppError::BadRequest(format!(
            "Unsupported content type '{content_type}', expected application/json"
        )));
    }

    let object: serde_json::Map<String, Value> = serde_json::from_slice(body)
        .map_err(|err| AppError::BadRequest(format!("Invalid JSON body: {err}")))?;

    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
