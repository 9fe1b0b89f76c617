//! Authentication and account routes
//!
//! Token responses carry the JWT in the body and mirror it into an
//! httpOnly `jwt` cookie. Password resets store only the token digest;
//! the plain token travels exclusively in the emailed link.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, authenticate};
use crate::models::user::{
    self, Role, User, UserScope, hash_password, hash_reset_token,
};
use crate::routes::{entity_body, parse};
use crate::service::{Resource, strip_private};
use crate::state::AppState;
use crate::validation::validate_password;

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/updateMe", patch(update_me))
        .route("/deleteMe", delete(delete_me))
        .route("/updatePassword", patch(update_password))
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/forgotPassword", post(forgot_password))
        .route("/resetPassword/:token", patch(reset_password))
        .merge(protected)
}

#[derive(Debug, Deserialize)]
struct SignupPayload {
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    role: Role,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordPayload {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordPayload {
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordPayload {
    current_password: String,
    new_password: String,
}

/// Sign a token for the user and mirror it into the `jwt` cookie
fn token_response(
    state: &AppState,
    jar: CookieJar,
    user: &User,
    status: StatusCode,
) -> ApiResult<(StatusCode, CookieJar, Json<Value>)> {
    let token = state.jwt.sign(user.id)?;
    let cookie = Cookie::build(("jwt", token.clone()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::days(state.config.cookie_max_age_days))
        .build();

    let mut doc = serde_json::to_value(user).map_err(|e| ApiError::Internal(e.into()))?;
    strip_private::<User>(&mut doc);

    Ok((
        status,
        jar.add(cookie),
        Json(json!({
            "status": "success",
            "token": token,
            "data": { "user": doc }
        })),
    ))
}

async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, CookieJar, Json<Value>)> {
    let payload: SignupPayload = parse(body)?;
    if payload.role == Role::Admin {
        return Err(ApiError::Validation(
            "Role must be either user or publisher".to_string(),
        ));
    }
    validate_password(&payload.password).map_err(ApiError::Validation)?;

    let user = User::new(
        payload.name,
        payload.email,
        payload.role,
        hash_password(&payload.password)?,
    );
    state.users.create(user.clone()).await?;

    // Best effort; a failed welcome email never fails the signup
    if let Err(e) = state
        .mailer
        .send(
            &user.email,
            "Welcome to DevCamp",
            &format!("Hi {}, welcome to DevCamp!", user.name),
        )
        .await
    {
        warn!(email = %user.email, error = %e, "Failed to send welcome email");
    }

    token_response(&state, jar, &user, StatusCode::CREATED)
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, CookieJar, Json<Value>)> {
    let payload: LoginPayload = parse(body)?;
    let user = user::find_by_email(&state.store, &payload.email, UserScope::ActiveOnly)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !user.verify_password(&payload.password) {
        return Err(ApiError::InvalidCredentials);
    }
    token_response(&state, jar, &user, StatusCode::OK)
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let cookie = Cookie::build(("jwt", "none"))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(10))
        .build();
    (jar.add(cookie), Json(json!({ "status": "success", "data": null })))
}

async fn me(Extension(current): Extension<CurrentUser>) -> ApiResult<Json<Value>> {
    let mut doc =
        serde_json::to_value(current.0.as_ref()).map_err(|e| ApiError::Internal(e.into()))?;
    strip_private::<User>(&mut doc);
    Ok(entity_body("user", doc))
}

/// Profile updates only; password changes go through /updatePassword
async fn update_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    if body.get("password").is_some() || body.get("currentPassword").is_some() {
        return Err(ApiError::Validation(
            "This route is not for password updates. Please use /updatePassword.".to_string(),
        ));
    }

    let mut patch = serde_json::Map::new();
    if let Value::Object(fields) = body {
        for key in ["name", "email", "photo"] {
            if let Some(value) = fields.get(key) {
                patch.insert(key.to_string(), value.clone());
            }
        }
    }

    let doc = state
        .users
        .update(current.0.id, Value::Object(patch))
        .await?;
    Ok(entity_body("user", doc))
}

/// Soft delete: the account stays in the store with `active` off
async fn delete_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    state
        .store
        .set_field(User::COLLECTION, current.0.id, "active", &json!(false))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, CookieJar, Json<Value>)> {
    let payload: UpdatePasswordPayload = parse(body)?;

    let mut user = (*current.0).clone();
    if !user.verify_password(&payload.current_password) {
        return Err(ApiError::InvalidCredentials);
    }
    validate_password(&payload.new_password).map_err(ApiError::Validation)?;

    user.set_password(hash_password(&payload.new_password)?);
    user::save(&state.store, &user).await?;

    token_response(&state, jar, &user, StatusCode::OK)
}

/// Issue a reset token and email the link. If the send fails the token is
/// rolled back so a half-issued reset cannot linger.
async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let payload: ForgotPasswordPayload = parse(body)?;
    let mut user = user::find_by_email(&state.store, &payload.email, UserScope::ActiveOnly)
        .await?
        .ok_or(ApiError::NotFound(User::SINGULAR))?;

    let token = user.create_reset_token();
    user::save(&state.store, &user).await?;

    let reset_url = format!(
        "{}/api/v1/auth/resetPassword/{}",
        state.config.public_url, token
    );
    let message = format!(
        "Forgot your password? Submit a request with your new password to {reset_url}\n\
         If you didn't forget your password, please ignore this email."
    );

    if let Err(e) = state
        .mailer
        .send(&user.email, "Your password reset token (valid for 10 min)", &message)
        .await
    {
        user.clear_reset_token();
        user::save(&state.store, &user).await?;
        return Err(e);
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Token sent to email"
    })))
}

async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(token): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, CookieJar, Json<Value>)> {
    let payload: ResetPasswordPayload = parse(body)?;

    let digest = hash_reset_token(&token);
    let mut user = user::find_by_reset_digest(&state.store, &digest, UserScope::ActiveOnly)
        .await?
        .filter(User::reset_token_valid)
        .ok_or_else(|| ApiError::Validation("Token is invalid or has expired".to_string()))?;

    validate_password(&payload.password).map_err(ApiError::Validation)?;
    user.set_password(hash_password(&payload.password)?);
    user::save(&state.store, &user).await?;

    token_response(&state, jar, &user, StatusCode::OK)
}
