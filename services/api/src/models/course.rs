//! Course model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::service::Resource;
use crate::validation::validate_length;

/// Skill level required to enroll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    Beginner,
    Intermediate,
    Advanced,
}

/// Course entity. Belongs to exactly one bootcamp; every write or delete
/// triggers recomputation of the parent's average cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: u32,
    pub tuition: f64,
    pub minimum_skill: MinimumSkill,
    #[serde(default)]
    pub scholarship_available: bool,
    /// Parent bootcamp
    pub bootcamp: Uuid,
    /// Owning principal
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Resource for Course {
    const COLLECTION: &'static str = "courses";
    const SINGULAR: &'static str = "course";
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
        validate_length("Course title", &self.title, 2, 100).map_err(ApiError::Validation)?;
        validate_length("Course description", &self.description, 1, 500)
            .map_err(ApiError::Validation)?;
        if self.weeks < 1 {
            return Err(ApiError::Validation(
                "Number of weeks cannot be less than 1".to_string(),
            ));
        }
        if self.tuition < 0.0 {
            return Err(ApiError::Validation(
                "Tuition cannot be less than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Creation payload accepted from clients. The bootcamp id always comes
/// from the nested route, never from the body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourse {
    pub title: String,
    pub description: String,
    pub weeks: u32,
    pub tuition: f64,
    pub minimum_skill: MinimumSkill,
    #[serde(default)]
    pub scholarship_available: bool,
}

impl CreateCourse {
    pub fn into_course(self, bootcamp: Uuid, owner: Uuid) -> Course {
        Course {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            weeks: self.weeks,
            tuition: self.tuition,
            minimum_skill: self.minimum_skill,
            scholarship_available: self.scholarship_available,
            bootcamp,
            user: owner,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        CreateCourse {
            title: "Front End Web Development".to_string(),
            description: "HTML, CSS, JavaScript".to_string(),
            weeks: 8,
            tuition: 8000.0,
            minimum_skill: MinimumSkill::Beginner,
            scholarship_available: true,
        }
        .into_course(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn valid_course_passes_validation() {
        assert!(course().validate().is_ok());
    }

    #[test]
    fn title_bounds_are_enforced() {
        let mut c = course();
        c.title = "a".to_string();
        assert!(c.validate().is_err());

        let mut c = course();
        c.title = "x".repeat(101);
        assert!(c.validate().is_err());
    }

    #[test]
    fn tuition_must_not_be_negative() {
        let mut c = course();
        c.tuition = -1.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn weeks_must_be_at_least_one() {
        let mut c = course();
        c.weeks = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn minimum_skill_rejects_unknown_values() {
        assert!(serde_json::from_value::<MinimumSkill>(serde_json::json!("expert")).is_err());
        assert_eq!(
            serde_json::from_value::<MinimumSkill>(serde_json::json!("advanced")).unwrap(),
            MinimumSkill::Advanced
        );
    }

    #[test]
    fn nested_route_supplies_the_parent_id() {
        let bootcamp = Uuid::new_v4();
        let c = CreateCourse {
            title: "Data Science".to_string(),
            description: "Python and statistics".to_string(),
            weeks: 10,
            tuition: 9000.0,
            minimum_skill: MinimumSkill::Intermediate,
            scholarship_available: false,
        }
        .into_course(bootcamp, Uuid::new_v4());
        assert_eq!(c.parent(), Some(bootcamp));
    }
}
