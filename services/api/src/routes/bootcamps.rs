//! Bootcamp routes

use std::collections::HashMap;

use axum::{
    Extension, Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
};
use serde_json::Value;
use uuid::Uuid;

use common::store::FilterClause;

use crate::error::{ApiError, ApiResult};
use crate::geocoder::{EARTH_RADIUS_KM, EARTH_RADIUS_MILES, within_radius};
use crate::guards::{check_bootcamp_quota, check_ownership};
use crate::middleware::{CurrentUser, authenticate, require_publisher, require_reviewer};
use crate::models::bootcamp::{Bootcamp, CreateBootcamp};
use crate::models::course::Course;
use crate::query::build_list_query;
use crate::routes::{collection_body, deleted_body, entity_body, parse};
use crate::service::{Populate, Resource};
use crate::state::AppState;

use super::{courses, reviews};

pub fn router(state: AppState) -> Router<AppState> {
    let publisher_routes = Router::new()
        .route("/", post(create_bootcamp))
        .route(
            "/:bootcampId",
            patch(update_bootcamp).delete(delete_bootcamp),
        )
        .route("/:bootcampId/photo", patch(upload_photo))
        .route("/:bootcampId/courses", post(courses::create_for_bootcamp))
        .route_layer(middleware::from_fn(require_publisher));

    let reviewer_routes = Router::new()
        .route("/:bootcampId/reviews", post(reviews::create_for_bootcamp))
        .route_layer(middleware::from_fn(require_reviewer));

    let protected = publisher_routes
        .merge(reviewer_routes)
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    Router::new()
        .route("/", get(list_bootcamps))
        .route("/:bootcampId", get(get_bootcamp))
        .route("/:bootcampId/courses", get(courses::list_for_bootcamp))
        .route("/:bootcampId/reviews", get(reviews::list_for_bootcamp))
        .route(
            "/within/:distance/zipcode/:zipcode/unit/:unit",
            get(bootcamps_within_radius),
        )
        .merge(protected)
}

async fn list_bootcamps(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let query = build_list_query(&params);
    let docs = state.bootcamps.list(&query).await?;
    Ok(collection_body("bootcamps", docs))
}

async fn get_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let doc = state
        .bootcamps
        .get_doc(
            id,
            Populate::Children {
                collection: Course::COLLECTION,
                foreign_key: "bootcamp",
                key: "courses",
            },
        )
        .await?;
    Ok(entity_body("bootcamp", doc))
}

async fn create_bootcamp(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    check_bootcamp_quota(&state.store, &current.0).await?;
    let payload: CreateBootcamp = parse(body)?;
    let doc = state
        .bootcamps
        .create(payload.into_bootcamp(current.0.id))
        .await?;
    Ok((StatusCode::CREATED, entity_body("bootcamp", doc)))
}

async fn update_bootcamp(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    check_ownership(&state.bootcamps, id, &current.0).await?;
    let doc = state.bootcamps.update(id, body).await?;
    Ok(entity_body("bootcamp", doc))
}

async fn delete_bootcamp(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    check_ownership(&state.bootcamps, id, &current.0).await?;
    state.bootcamps.delete(id).await?;
    Ok(deleted_body())
}

/// Geocode the zipcode, then keep bootcamps whose stored location falls
/// inside the great-circle radius
async fn bootcamps_within_radius(
    State(state): State<AppState>,
    Path((distance, zipcode, unit)): Path<(f64, String, String)>,
) -> ApiResult<Json<Value>> {
    let sphere_radius = match unit.as_str() {
        "mi" => EARTH_RADIUS_MILES,
        "km" => EARTH_RADIUS_KM,
        _ => {
            return Err(ApiError::Validation(
                "Unit must be either mi or km".to_string(),
            ));
        }
    };
    if distance <= 0.0 {
        return Err(ApiError::Validation(
            "Distance must be greater than 0".to_string(),
        ));
    }

    let center = state.geocoder.geocode(&zipcode).await?.coordinates;
    let docs = state.store.find_all(Bootcamp::COLLECTION).await?;
    let matched: Vec<Value> = docs
        .into_iter()
        .filter(|doc| match coordinates(doc) {
            Some(point) => within_radius(center, point, distance, sphere_radius),
            None => false,
        })
        .collect();

    Ok(collection_body("bootcamps", matched))
}

fn coordinates(doc: &Value) -> Option<[f64; 2]> {
    let coords = doc.get("location")?.get("coordinates")?.as_array()?;
    Some([coords.first()?.as_f64()?, coords.get(1)?.as_f64()?])
}

/// Accept a multipart image upload, store it under the configured upload
/// directory, and record the filename on the bootcamp
async fn upload_photo(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    check_ownership(&state.bootcamps, id, &current.0).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid upload: {e}")))?
    {
        let Some(content_type) = field.content_type().map(str::to_string) else {
            continue;
        };
        let Some(subtype) = content_type.strip_prefix("image/") else {
            return Err(ApiError::Validation(
                "Please upload an image file".to_string(),
            ));
        };
        let extension: String = subtype
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Invalid upload: {e}")))?;
        if data.len() > state.config.max_file_upload {
            return Err(ApiError::Validation(format!(
                "Please upload an image less than {} bytes",
                state.config.max_file_upload
            )));
        }

        let filename = format!("photo_{id}.{extension}");
        let dir = std::path::Path::new(&state.config.file_upload_path);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
        tokio::fs::write(dir.join(&filename), &data)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;

        state
            .store
            .set_field(
                Bootcamp::COLLECTION,
                id,
                "photo",
                &Value::String(filename.clone()),
            )
            .await?;

        return Ok(entity_body("photo", Value::String(filename)));
    }

    Err(ApiError::Validation("Please upload a file".to_string()))
}

/// Restrict a list query to children of one bootcamp
pub(crate) fn scope_to_bootcamp(filters: &mut Vec<FilterClause>, bootcamp: Uuid) {
    filters.push(FilterClause::eq_id("bootcamp", bootcamp));
}
