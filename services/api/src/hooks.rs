//! Per-entity write hooks
//!
//! All side effects of a write live here: slug and geocode on bootcamp
//! creation, cascade delete of children, and aggregate recomputation
//! after course and review writes. Hooks run synchronously inside the
//! service pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use common::store::{DocumentStore, FilterClause};

use crate::aggregates::{recompute_average_cost, recompute_average_rating};
use crate::error::ApiResult;
use crate::geocoder::Geocoder;
use crate::models::bootcamp::{Bootcamp, slugify};
use crate::models::course::Course;
use crate::models::review::Review;
use crate::service::{Resource, WriteHooks};

pub struct BootcampHooks {
    pub geocoder: Arc<dyn Geocoder>,
}

#[async_trait]
impl WriteHooks<Bootcamp> for BootcampHooks {
    async fn before_create(&self, _store: &DocumentStore, entity: &mut Bootcamp) -> ApiResult<()> {
        entity.slug = slugify(&entity.name);
        entity.location = Some(self.geocoder.geocode(&entity.address).await?);
        Ok(())
    }

    async fn after_delete(&self, store: &DocumentStore, entity: &Bootcamp) -> ApiResult<()> {
        let children = [FilterClause::eq_id("bootcamp", entity.id)];
        let courses = store.delete_where(Course::COLLECTION, &children).await?;
        let reviews = store.delete_where(Review::COLLECTION, &children).await?;
        info!(
            bootcamp = %entity.id,
            courses, reviews, "Cascade deleted bootcamp children"
        );
        Ok(())
    }
}

pub struct CourseHooks;

#[async_trait]
impl WriteHooks<Course> for CourseHooks {
    async fn after_write(&self, store: &DocumentStore, entity: &Course) -> ApiResult<()> {
        recompute_average_cost(store, entity.bootcamp).await
    }

    async fn after_delete(&self, store: &DocumentStore, entity: &Course) -> ApiResult<()> {
        recompute_average_cost(store, entity.bootcamp).await
    }
}

pub struct ReviewHooks;

#[async_trait]
impl WriteHooks<Review> for ReviewHooks {
    async fn after_write(&self, store: &DocumentStore, entity: &Review) -> ApiResult<()> {
        recompute_average_rating(store, entity.bootcamp).await
    }

    async fn after_delete(&self, store: &DocumentStore, entity: &Review) -> ApiResult<()> {
        recompute_average_rating(store, entity.bootcamp).await
    }
}
