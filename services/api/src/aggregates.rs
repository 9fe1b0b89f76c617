//! Derived-aggregate recomputation
//!
//! A bootcamp's `averageCost` and `averageRating` are means over its
//! child courses and reviews, recomputed synchronously after every child
//! write or delete. When the last child disappears the field is cleared
//! to null. Each recompute reads the current sibling set, so a stale
//! value self-heals on the next write.

use serde_json::Value;
use uuid::Uuid;

use common::store::{DocumentStore, FilterClause};

use crate::error::ApiResult;
use crate::models::bootcamp::Bootcamp;
use crate::models::course::Course;
use crate::models::review::Review;
use crate::service::Resource;

/// Mean course tuition, stored as-is
pub async fn recompute_average_cost(store: &DocumentStore, bootcamp: Uuid) -> ApiResult<()> {
    let mean = store
        .mean(
            Course::COLLECTION,
            "tuition",
            &[FilterClause::eq_id("bootcamp", bootcamp)],
        )
        .await?;
    write_aggregate(store, bootcamp, "averageCost", mean).await
}

/// Mean review rating, stored as-is
pub async fn recompute_average_rating(store: &DocumentStore, bootcamp: Uuid) -> ApiResult<()> {
    let mean = store
        .mean(
            Review::COLLECTION,
            "rating",
            &[FilterClause::eq_id("bootcamp", bootcamp)],
        )
        .await?;
    write_aggregate(store, bootcamp, "averageRating", mean).await
}

async fn write_aggregate(
    store: &DocumentStore,
    bootcamp: Uuid,
    field: &str,
    value: Option<f64>,
) -> ApiResult<()> {
    let value = value.map(Value::from).unwrap_or(Value::Null);
    // The parent may already be gone when a cascade delete races this
    // write; a missed update is fine then.
    store
        .set_field(Bootcamp::COLLECTION, bootcamp, field, &value)
        .await?;
    Ok(())
}
