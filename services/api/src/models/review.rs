//! Review model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::service::Resource;
use crate::validation::validate_length;

/// Review entity. One per (bootcamp, user) pair, enforced by a unique
/// index; every write or delete triggers recomputation of the parent's
/// average rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    /// 1 to 10
    pub rating: f64,
    /// Parent bootcamp
    pub bootcamp: Uuid,
    /// Authoring principal
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Resource for Review {
    const COLLECTION: &'static str = "reviews";
    const SINGULAR: &'static str = "review";
    const READ_ONLY_FIELDS: &'static [&'static str] = &["id", "bootcamp", "user", "createdAt"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        Some(self.user)
    }

    fn parent(&self) -> Option<Uuid> {
        Some(self.bootcamp)
    }

    fn validate(&self) -> ApiResult<()> {
        validate_length("Review title", &self.title, 4, 100).map_err(ApiError::Validation)?;
        validate_length("Review text", &self.text, 1, 500).map_err(ApiError::Validation)?;
        if !(1.0..=10.0).contains(&self.rating) {
            return Err(ApiError::Validation(
                "Rating must be between 1 and 10".to_string(),
            ));
        }
        Ok(())
    }
}

/// Creation payload accepted from clients
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    pub title: String,
    pub text: String,
    pub rating: f64,
}

impl CreateReview {
    pub fn into_review(self, bootcamp: Uuid, author: Uuid) -> Review {
        Review {
            id: Uuid::new_v4(),
            title: self.title,
            text: self.text,
            rating: self.rating,
            bootcamp,
            user: author,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review() -> Review {
        CreateReview {
            title: "Great instructors".to_string(),
            text: "Learned a lot in twelve weeks".to_string(),
            rating: 9.0,
        }
        .into_review(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn valid_review_passes_validation() {
        assert!(review().validate().is_ok());
    }

    #[test]
    fn rating_bounds_are_enforced() {
        for bad in [0.0, 0.9, 10.1, -3.0] {
            let mut r = review();
            r.rating = bad;
            assert!(r.validate().is_err(), "rating={bad}");
        }
        for ok in [1.0, 5.5, 10.0] {
            let mut r = review();
            r.rating = ok;
            assert!(r.validate().is_ok(), "rating={ok}");
        }
    }

    #[test]
    fn title_requires_at_least_four_characters() {
        let mut r = review();
        r.title = "Meh".to_string();
        assert!(r.validate().is_err());
    }

    #[test]
    fn parent_and_owner_come_from_the_route_context() {
        let bootcamp = Uuid::new_v4();
        let author = Uuid::new_v4();
        let r = CreateReview {
            title: "Solid curriculum".to_string(),
            text: "Would recommend".to_string(),
            rating: 8.0,
        }
        .into_review(bootcamp, author);
        assert_eq!(r.parent(), Some(bootcamp));
        assert_eq!(r.owner(), Some(author));
    }
}
