//! HTTP route handlers
//!
//! All responses share the `{status, data}` envelope; list responses add a
//! `results` count. Handlers take raw JSON bodies and decode through
//! `parse`, so a malformed payload reports through the error taxonomy
//! instead of the framework's rejection.

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod users;

use axum::{Json, Router, extract::State, http::Uri, routing::get};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Assemble the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", auth::router(state.clone()))
        .nest("/api/v1/bootcamps", bootcamps::router(state.clone()))
        .nest("/api/v1/courses", courses::router(state.clone()))
        .nest("/api/v1/reviews", reviews::router(state.clone()))
        .nest("/api/v1/users", users::router(state.clone()))
        .fallback(unknown_route)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    common::database::health_check(state.store.pool())
        .await
        .map_err(ApiError::from)?;
    Ok(Json(json!({ "status": "success" })))
}

async fn unknown_route(uri: Uri) -> ApiError {
    ApiError::UnknownRoute(uri.path().to_string())
}

/// Decode a JSON body into a payload type; failures report as 400s
pub(crate) fn parse<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("Invalid input data: {e}")))
}

pub(crate) fn collection_body(key: &str, docs: Vec<Value>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "results": docs.len(),
        "data": { key: docs }
    }))
}

pub(crate) fn entity_body(key: &str, doc: Value) -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": { key: doc }
    }))
}

pub(crate) fn deleted_body() -> Json<Value> {
    Json(json!({ "status": "success", "data": null }))
}
