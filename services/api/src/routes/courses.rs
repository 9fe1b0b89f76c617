//! Course routes. Creation happens through the nested bootcamp route;
//! the flat routes cover listing, reads, and mutations by id.

use std::collections::HashMap;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, patch},
};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::guards::check_ownership;
use crate::middleware::{CurrentUser, authenticate, require_publisher};
use crate::models::bootcamp::Bootcamp;
use crate::models::course::CreateCourse;
use crate::query::build_list_query;
use crate::routes::bootcamps::scope_to_bootcamp;
use crate::routes::{collection_body, deleted_body, entity_body, parse};
use crate::service::{Populate, Resource};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/:id", patch(update_course).delete(delete_course))
        .route_layer(middleware::from_fn(require_publisher))
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    Router::new()
        .route("/", get(list_courses))
        .route("/:id", get(get_course))
        .merge(protected)
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let query = build_list_query(&params);
    let docs = state.courses.list(&query).await?;
    Ok(collection_body("courses", docs))
}

pub(crate) async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let mut query = build_list_query(&params);
    scope_to_bootcamp(&mut query.filters, bootcamp_id);
    let docs = state.courses.list(&query).await?;
    Ok(collection_body("courses", docs))
}

async fn get_course(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    let doc = state
        .courses
        .get_doc(
            id,
            Populate::Parent {
                collection: Bootcamp::COLLECTION,
                field: "bootcamp",
                select: &["name", "description"],
            },
        )
        .await?;
    Ok(entity_body("course", doc))
}

/// Adding a course requires ownership of the parent bootcamp, which also
/// proves the bootcamp exists
pub(crate) async fn create_for_bootcamp(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(bootcamp_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let bootcamp = check_ownership(&state.bootcamps, bootcamp_id, &current.0).await?;
    let payload: CreateCourse = parse(body)?;
    let doc = state
        .courses
        .create(payload.into_course(bootcamp.id, current.0.id))
        .await?;
    Ok((StatusCode::CREATED, entity_body("course", doc)))
}

async fn update_course(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    check_ownership(&state.courses, id, &current.0).await?;
    let doc = state.courses.update(id, body).await?;
    Ok(entity_body("course", doc))
}

async fn delete_course(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    check_ownership(&state.courses, id, &current.0).await?;
    state.courses.delete(id).await?;
    Ok(deleted_body())
}
