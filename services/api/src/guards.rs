//! Ownership and quota guards
//!
//! These run strictly after the auth gate and before any mutating service
//! call. Admins bypass ownership but not existence.

use uuid::Uuid;

use common::store::{DocumentStore, FilterClause};

use crate::error::{ApiError, ApiResult};
use crate::models::bootcamp::Bootcamp;
use crate::models::user::{Role, User};
use crate::service::{CollectionService, Resource};

/// Load an entity and verify the acting principal may mutate it. Absent
/// entity is NotFound before any ownership question; a present entity
/// owned by someone else is Forbidden.
pub async fn check_ownership<R: Resource>(
    service: &CollectionService<R>,
    id: Uuid,
    principal: &User,
) -> ApiResult<R> {
    let entity = service.get(id).await?;
    if is_permitted(entity.owner(), principal) {
        Ok(entity)
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Non-admin publishers may own at most one bootcamp
pub async fn check_bootcamp_quota(store: &DocumentStore, principal: &User) -> ApiResult<()> {
    if principal.role == Role::Admin {
        return Ok(());
    }
    let already_published = store
        .exists(
            Bootcamp::COLLECTION,
            &[FilterClause::eq_id("user", principal.id)],
        )
        .await?;
    if already_published {
        return Err(ApiError::Validation(format!(
            "The user with ID {} has already published a bootcamp",
            principal.id
        )));
    }
    Ok(())
}

/// Pure ownership decision, shared by the async guard and tests
pub fn is_permitted(owner: Option<Uuid>, principal: &User) -> bool {
    if principal.role == Role::Admin {
        return true;
    }
    owner == Some(principal.id)
}
