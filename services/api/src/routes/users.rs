//! Admin user management. Every route sits behind the auth gate plus the
//! admin role check.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{authenticate, require_admin};
use crate::models::user::{Role, User, hash_password};
use crate::query::build_list_query;
use crate::routes::{collection_body, deleted_body, entity_body, parse};
use crate::service::Populate;
use crate::state::AppState;
use crate::validation::validate_password;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[derive(Debug, Deserialize)]
struct CreateUserPayload {
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    role: Role,
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let query = build_list_query(&params);
    let docs = state.users.list(&query).await?;
    Ok(collection_body("users", docs))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    let doc = state.users.get_doc(id, Populate::None).await?;
    Ok(entity_body("user", doc))
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let payload: CreateUserPayload = parse(body)?;
    validate_password(&payload.password).map_err(ApiError::Validation)?;
    let user = User::new(
        payload.name,
        payload.email,
        payload.role,
        hash_password(&payload.password)?,
    );
    let doc = state.users.create(user).await?;
    Ok((StatusCode::CREATED, entity_body("user", doc)))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let doc = state.users.update(id, body).await?;
    Ok(entity_body("user", doc))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state.users.delete(id).await?;
    Ok(deleted_body())
}
