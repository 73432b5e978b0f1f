use crate::{ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use domain::{CategoryNode, DomainError, ListQuery};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

type HandlerResult = Result<Response, ApiError>;

/// Malformed or missing JSON bodies are client errors, not extractor rejections.
fn json_body(state: &AppState, body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| state.fail(DomainError::invalid_request(rejection.body_text())))
}

fn success(data: impl serde::Serialize) -> Json<Value> {
    Json(json!({ "status": "Success", "data": data }))
}

pub async fn create_category(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> HandlerResult {
    let payload = json_body(&state, body)?;
    let category = state
        .app
        .categories
        .create(&payload)
        .await
        .map_err(|e| state.fail(e))?;

    Ok((StatusCode::CREATED, success(category)).into_response())
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    let node = state
        .app
        .categories
        .get_by_id(&id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(success(node).into_response())
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> HandlerResult {
    let payload = json_body(&state, body)?;
    let category = state
        .app
        .categories
        .update(&id, &payload)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(success(json!(["Updated successfully", category])).into_response())
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let query = ListQuery::from_params(&params).map_err(|e| state.fail(e))?;
    let nodes = state
        .app
        .categories
        .get_all(&query)
        .await
        .map_err(|e| state.fail(e))?;
    let data = project(&nodes, query.fields.as_deref()).map_err(|e| state.fail(e))?;

    Ok(Json(json!({
        "status": "Success",
        "results": data.len(),
        "data": data
    }))
    .into_response())
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    let deleted = state
        .app
        .categories
        .delete(&id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(deleted_response(json!(deleted)))
}

pub async fn delete_categories(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> HandlerResult {
    let payload = json_body(&state, body)?;
    let ids = requested_ids(&payload).map_err(|e| state.fail(e))?;
    let deleted = state
        .app
        .categories
        .delete_many(&ids)
        .await
        .map_err(|e| state.fail(e))?;
    info!(count = deleted.len(), "bulk delete finished");

    Ok(deleted_response(json!(deleted)))
}

pub async fn search_categories(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> HandlerResult {
    let matches = state
        .app
        .categories
        .search(&key)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(success(matches).into_response())
}

fn deleted_response(snapshot: Value) -> Response {
    Json(json!({
        "status": "Success",
        "message": ["Deleted successfully", snapshot]
    }))
    .into_response()
}

/// `ids` from a bulk-delete body. A missing or non-array field yields no ids,
/// which the manager rejects.
fn requested_ids(payload: &Value) -> Result<Vec<String>, DomainError> {
    let Some(items) = payload.get("ids").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(id) => Ok(id.clone()),
            other => Err(DomainError::InvalidId {
                field: "id".to_string(),
                value: other.to_string(),
            }),
        })
        .collect()
}

/// Serialize root nodes, keeping only the requested top-level keys (plus `id`).
fn project(nodes: &[CategoryNode], fields: Option<&[String]>) -> Result<Vec<Value>, DomainError> {
    nodes
        .iter()
        .map(|node| {
            let mut value = serde_json::to_value(node).map_err(DomainError::repository)?;
            if let (Some(fields), Value::Object(object)) = (fields, &mut value) {
                object.retain(|key, _| key == "id" || fields.iter().any(|field| field == key));
            }
            Ok(value)
        })
        .collect()
}
