//! User model and related functionality
//!
//! Users are soft-deleted by flipping `active` off, never removed by
//! self-service. There is deliberately no ambient "active only" query
//! rewriting: every lookup helper takes an explicit `UserScope`, so each
//! call site states which population it reads.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use common::store::{DocumentStore, FilterClause};

use crate::error::{ApiError, ApiResult};
use crate::service::Resource;
use crate::validation::{validate_email, validate_length};

/// Minutes a password reset token stays valid
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Role of a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_photo")]
    pub photo: String,
    /// Argon2 hash, never a plain password
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn default_photo() -> String {
    "default.jpg".to_string()
}

fn default_active() -> bool {
    true
}

impl User {
    /// Create a new user with an already-hashed password
    pub fn new(name: String, email: String, role: Role, password_hash: String) -> Self {
        User {
            id: Uuid::new_v4(),
            name,
            email,
            role,
            photo: default_photo(),
            password: password_hash,
            active: true,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Compare a plain password against the stored hash
    pub fn verify_password(&self, password: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.password) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Whether the password changed after a token with the given
    /// issued-at timestamp was signed
    pub fn changed_password_after(&self, token_iat_secs: u64) -> bool {
        match self.password_changed_at {
            Some(changed_at) => changed_at.timestamp().max(0) as u64 > token_iat_secs,
            None => false,
        }
    }

    /// Install a new password hash and invalidate previously issued tokens.
    /// The change timestamp is backdated one second, since signing a token
    /// can beat the store write within the same second.
    pub fn set_password(&mut self, password_hash: String) {
        self.password = password_hash;
        self.password_changed_at = Some(Utc::now() - Duration::seconds(1));
        self.clear_reset_token();
    }

    /// Generate a password reset token, storing only its digest. Returns
    /// the plain token for the emailed link.
    pub fn create_reset_token(&mut self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        let token = hex::encode(bytes);

        self.password_reset_token = Some(hash_reset_token(&token));
        self.password_reset_expires_at =
            Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));
        token
    }

    pub fn clear_reset_token(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires_at = None;
    }

    /// Whether the stored reset token is still within its expiry window
    pub fn reset_token_valid(&self) -> bool {
        self.password_reset_expires_at
            .map(|expires| expires > Utc::now())
            .unwrap_or(false)
    }
}

impl Resource for User {
    const COLLECTION: &'static str = "users";
    const SINGULAR: &'static str = "user";
    const READ_ONLY_FIELDS: &'static [&'static str] = &[
        "id",
        "password",
        "passwordChangedAt",
        "passwordResetToken",
        "passwordResetExpiresAt",
        "createdAt",
    ];
    const PRIVATE_FIELDS: &'static [&'static str] = &[
        "password",
        "active",
        "passwordChangedAt",
        "passwordResetToken",
        "passwordResetExpiresAt",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> ApiResult<()> {
        validate_length("Name", &self.name, 1, 100).map_err(ApiError::Validation)?;
        validate_email(&self.email).map_err(ApiError::Validation)?;
        Ok(())
    }
}

/// Hash a plain password with argon2
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Digest a plain reset token the way it is stored
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Which user population a lookup reads. Required at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserScope {
    ActiveOnly,
    IncludeInactive,
}

impl UserScope {
    fn apply(self, mut filters: Vec<FilterClause>) -> Vec<FilterClause> {
        if self == UserScope::ActiveOnly {
            filters.push(FilterClause::eq("active", "true"));
        }
        filters
    }
}

fn decode(doc: Value) -> ApiResult<User> {
    serde_json::from_value(doc).map_err(|e| ApiError::Internal(e.into()))
}

/// Find a user by id
pub async fn find_by_id(
    store: &DocumentStore,
    id: Uuid,
    scope: UserScope,
) -> ApiResult<Option<User>> {
    let filters = scope.apply(vec![FilterClause::eq_id("id", id)]);
    let doc = store.find_one(User::COLLECTION, &filters).await?;
    doc.map(decode).transpose()
}

/// Find a user by email address
pub async fn find_by_email(
    store: &DocumentStore,
    email: &str,
    scope: UserScope,
) -> ApiResult<Option<User>> {
    let filters = scope.apply(vec![FilterClause::eq("email", email)]);
    let doc = store.find_one(User::COLLECTION, &filters).await?;
    doc.map(decode).transpose()
}

/// Find a user by the digest of a password reset token
pub async fn find_by_reset_digest(
    store: &DocumentStore,
    digest: &str,
    scope: UserScope,
) -> ApiResult<Option<User>> {
    let filters = scope.apply(vec![FilterClause::eq("passwordResetToken", digest)]);
    let doc = store.find_one(User::COLLECTION, &filters).await?;
    doc.map(decode).transpose()
}

/// Persist an updated user document
pub async fn save(store: &DocumentStore, user: &User) -> ApiResult<()> {
    let doc = serde_json::to_value(user).map_err(|e| ApiError::Internal(e.into()))?;
    store
        .replace(User::COLLECTION, user.id, &doc)
        .await?
        .ok_or(ApiError::NotFound(User::SINGULAR))?;
    Ok(())
}
