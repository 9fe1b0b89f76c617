//! Review routes. Creation happens through the nested bootcamp route and
//! is limited to plain users and admins; publishers do not review.

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
use crate::middleware::{CurrentUser, authenticate, require_reviewer};
use crate::models::bootcamp::Bootcamp;
use crate::models::review::CreateReview;
use crate::query::build_list_query;
use crate::routes::bootcamps::scope_to_bootcamp;
use crate::routes::{collection_body, deleted_body, entity_body, parse};
use crate::service::{Populate, Resource};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/:id", patch(update_review).delete(delete_review))
        .route_layer(middleware::from_fn(require_reviewer))
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    Router::new()
        .route("/", get(list_reviews))
        .route("/:id", get(get_review))
        .merge(protected)
}

async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let query = build_list_query(&params);
    let docs = state.reviews.list(&query).await?;
    Ok(collection_body("reviews", docs))
}

pub(crate) async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let mut query = build_list_query(&params);
    scope_to_bootcamp(&mut query.filters, bootcamp_id);
    let docs = state.reviews.list(&query).await?;
    Ok(collection_body("reviews", docs))
}

async fn get_review(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    let doc = state
        .reviews
        .get_doc(
            id,
            Populate::Parent {
                collection: Bootcamp::COLLECTION,
                field: "bootcamp",
                select: &["name", "description"],
            },
        )
        .await?;
    Ok(entity_body("review", doc))
}

/// One review per user and bootcamp; the unique index reports duplicates
pub(crate) async fn create_for_bootcamp(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(bootcamp_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    // Existence check only; anyone may review a bootcamp they don't own
    state.bootcamps.get(bootcamp_id).await?;
    let payload: CreateReview = parse(body)?;
    let doc = state
        .reviews
        .create(payload.into_review(bootcamp_id, current.0.id))
        .await?;
    Ok((StatusCode::CREATED, entity_body("review", doc)))
}

async fn update_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    check_ownership(&state.reviews, id, &current.0).await?;
    let doc = state.reviews.update(id, body).await?;
    Ok(entity_body("review", doc))
}

async fn delete_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    check_ownership(&state.reviews, id, &current.0).await?;
    state.reviews.delete(id).await?;
    Ok(deleted_body())
}
