//! Bootcamp model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::service::Resource;
use crate::validation::{validate_email, validate_length, validate_phone, validate_url};

/// Career tracks a bootcamp can teach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Career {
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Data science")]
    DataScience,
    Business,
    #[serde(rename = "UI/UX")]
    UiUx,
    Other,
}

/// Geocoded location of a bootcamp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Bootcamp entity. `averageCost` and `averageRating` are derived from
/// child documents and never accepted from clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub careers: Vec<Career>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub average_cost: Option<f64>,
    #[serde(default = "default_photo")]
    pub photo: String,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
    /// Owning principal
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
}

fn default_photo() -> String {
    "no-photo.jpg".to_string()
}

impl Resource for Bootcamp {
    const COLLECTION: &'static str = "bootcamps";
    const SINGULAR: &'static str = "bootcamp";
    const READ_ONLY_FIELDS: &'static [&'static str] = &[
        "id",
        "slug",
        "location",
        "averageCost",
        "averageRating",
        "photo",
        "user",
        "createdAt",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        Some(self.user)
    }

    fn validate(&self) -> ApiResult<()> {
        validate_length("Name", &self.name, 1, 50).map_err(ApiError::Validation)?;
        if let Some(description) = &self.description {
            validate_length("Description", description, 0, 500).map_err(ApiError::Validation)?;
        }
        if let Some(website) = &self.website {
            validate_url(website).map_err(ApiError::Validation)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone).map_err(ApiError::Validation)?;
        }
        if let Some(email) = &self.email {
            validate_email(email).map_err(ApiError::Validation)?;
        }
        validate_length("Address", &self.address, 1, 500).map_err(ApiError::Validation)?;
        if self.careers.is_empty() {
            return Err(ApiError::Validation(
                "Please provide at least one career".to_string(),
            ));
        }
        if let Some(rating) = self.average_rating {
            if !(1.0..=10.0).contains(&rating) {
                return Err(ApiError::Validation(
                    "Average rating must be between 1 and 10".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Creation payload accepted from clients
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBootcamp {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    pub careers: Vec<Career>,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
}

impl CreateBootcamp {
    /// Build the entity owned by the acting principal. Slug and location
    /// are filled by the pre-create pipeline step.
    pub fn into_bootcamp(self, owner: Uuid) -> Bootcamp {
        Bootcamp {
            id: Uuid::new_v4(),
            name: self.name,
            slug: String::new(),
            description: self.description,
            website: self.website,
            phone: self.phone,
            email: self.email,
            address: self.address,
            location: None,
            careers: self.careers,
            average_rating: None,
            average_cost: None,
            photo: default_photo(),
            housing: self.housing,
            job_assistance: self.job_assistance,
            job_guarantee: self.job_guarantee,
            accept_gi: self.accept_gi,
            user: owner,
            created_at: Utc::now(),
        }
    }
}

/// Derive the URL slug from a bootcamp name. Deterministic: lowercase,
/// alphanumerics kept, separator runs collapsed to one dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
