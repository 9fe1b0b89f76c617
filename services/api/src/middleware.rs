//! Middleware for JWT token validation and role checks
//!
//! The auth gate walks a fixed sequence: bearer extraction, signature and
//! expiry verification, principal load, credential staleness. Each failure
//! maps to its own taxonomy kind so clients can tell a missing token from
//! a stale one. Role middlewares sit inside the gate and only read the
//! `CurrentUser` extension it installed.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};

use crate::error::{ApiError, ApiResult};
use crate::models::user::{self, Role, User, UserScope};
use crate::state::AppState;

/// Authenticated principal of the current request
#[derive(Clone)]
pub struct CurrentUser(pub Arc<User>);

/// Extract and validate the bearer token, then install `CurrentUser`
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthenticated)?;
    let claims = state.jwt.verify(token)?;

    let principal = user::find_by_id(&state.store, claims.sub, UserScope::ActiveOnly)
        .await?
        .ok_or(ApiError::PrincipalGone)?;
    if principal.changed_password_after(claims.iat) {
        return Err(ApiError::CredentialsChanged);
    }

    req.extensions_mut().insert(CurrentUser(Arc::new(principal)));
    Ok(next.run(req).await)
}

/// Allow publishers and admins through
pub async fn require_publisher(req: Request<Body>, next: Next) -> ApiResult<Response> {
    restrict_to(&req, &[Role::Publisher, Role::Admin])?;
    Ok(next.run(req).await)
}

/// Allow plain users and admins through (review routes)
pub async fn require_reviewer(req: Request<Body>, next: Next) -> ApiResult<Response> {
    restrict_to(&req, &[Role::User, Role::Admin])?;
    Ok(next.run(req).await)
}

/// Allow admins only
pub async fn require_admin(req: Request<Body>, next: Next) -> ApiResult<Response> {
    restrict_to(&req, &[Role::Admin])?;
    Ok(next.run(req).await)
}

fn restrict_to(req: &Request<Body>, allowed: &[Role]) -> ApiResult<()> {
    let current = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(ApiError::Unauthenticated)?;
    if allowed.contains(&current.0.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Pull the token out of an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(v) = value {
            map.insert(header::AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn bearer_token_is_extracted() {
        let map = headers(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&map), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_header_yields_none() {
        assert_eq!(bearer_token(&headers(None)), None);
    }

    #[test]
    fn non_bearer_schemes_are_rejected() {
        assert_eq!(bearer_token(&headers(Some("Basic dXNlcg=="))), None);
        assert_eq!(bearer_token(&headers(Some("Bearer"))), None);
        assert_eq!(bearer_token(&headers(Some("Bearer "))), None);
    }

    #[test]
    fn role_check_reads_the_installed_principal() {
        let user = User::new(
            "Test".to_string(),
            "t@devcamp.io".to_string(),
            Role::Publisher,
            "$argon2id$fake".to_string(),
        );
        let mut req = Request::new(Body::empty());
        req.extensions_mut().insert(CurrentUser(Arc::new(user)));

        assert!(restrict_to(&req, &[Role::Publisher, Role::Admin]).is_ok());
        assert!(matches!(
            restrict_to(&req, &[Role::Admin]),
            Err(ApiError::Forbidden)
        ));

        let bare = Request::new(Body::empty());
        assert!(matches!(
            restrict_to(&bare, &[Role::Admin]),
            Err(ApiError::Unauthenticated)
        ));
    }
}
