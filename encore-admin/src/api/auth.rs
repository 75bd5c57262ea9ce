//! Session authentication and password reset
//!
//! Login issues an opaque token stored in the `sessions` collection; the
//! middleware resolves it on every protected request. Reset tokens are
//! single use and expire after an hour. The reset-request endpoint answers
//! 202 whether or not the email is known, so it cannot be used to probe for
//! accounts.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use bson::{doc, oid::ObjectId};
use encore_common::auth as credentials;
use encore_common::db::models::{collections, Admin, ResetToken, Session};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// Authenticated admin, attached to the request by the middleware
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub admin_id: ObjectId,
    pub email: String,
    pub token: String,
}

/// Authentication middleware for protected routes
///
/// Expects `Authorization: Bearer <token>`; the token must resolve to an
/// unexpired session whose admin still exists.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?
        .to_string();

    let session = state
        .db
        .collection::<Session>(collections::SESSIONS)
        .find_one(doc! { "token": &token }, None)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid session token".to_string()))?;

    if session.expires_at < bson::DateTime::now() {
        return Err(ApiError::Unauthorized("Session expired".to_string()));
    }

    let admin = state
        .db
        .collection::<Admin>(collections::ADMINS)
        .find_one(doc! { "_id": session.admin_id }, None)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    request.extensions_mut().insert(AdminIdentity {
        admin_id: session.admin_id,
        email: admin.email,
        token,
    });

    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub expires_at: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = request.email.trim().to_lowercase();

    // One message for both unknown email and wrong password
    fn rejected() -> ApiError {
        ApiError::Unauthorized("Invalid email or password".to_string())
    }

    let admin = state
        .db
        .collection::<Admin>(collections::ADMINS)
        .find_one(doc! { "email": &email }, None)
        .await?
        .ok_or_else(rejected)?;

    if !credentials::verify_password(&request.password, &admin.salt, &admin.password_digest) {
        return Err(rejected());
    }

    let admin_id = admin
        .id
        .ok_or_else(|| ApiError::Internal("Admin document without id".to_string()))?;

    let expires_at = credentials::expiry_after(state.session_ttl_minutes);
    let session = Session {
        id: None,
        token: credentials::generate_token(),
        admin_id,
        expires_at: bson::DateTime::from_chrono(expires_at),
    };

    state
        .db
        .collection::<Session>(collections::SESSIONS)
        .insert_one(&session, None)
        .await?;

    info!("Admin {} logged in", email);

    Ok(Json(LoginResponse {
        token: session.token,
        email,
        expires_at: expires_at.to_rfc3339(),
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
) -> Result<Json<Value>, ApiError> {
    state
        .db
        .collection::<Session>(collections::SESSIONS)
        .delete_one(doc! { "token": &identity.token }, None)
        .await?;

    Ok(Json(json!({ "status": "ok" })))
}

/// GET /api/auth/session - who am I
pub async fn session(
    Extension(identity): Extension<AdminIdentity>,
) -> Json<Value> {
    Json(json!({
        "admin_id": identity.admin_id.to_hex(),
        "email": identity.email,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
    pub email: String,
}

/// POST /api/auth/reset-request
///
/// Answers 202 regardless of whether the email matches an account. The
/// token is written to the log; mail delivery happens outside this service.
pub async fn reset_request(
    State(state): State<AppState>,
    Json(request): Json<ResetRequestBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    super::validate_email(request.email.trim())?;
    let email = request.email.trim().to_lowercase();

    let admin = state
        .db
        .collection::<Admin>(collections::ADMINS)
        .find_one(doc! { "email": &email }, None)
        .await?;

    if let Some(admin) = admin {
        if let Some(admin_id) = admin.id {
            let tokens = state
                .db
                .collection::<ResetToken>(collections::RESET_TOKENS);

            // One outstanding token per account
            tokens.delete_many(doc! { "admin_id": admin_id }, None).await?;

            let token = ResetToken {
                id: None,
                token: credentials::generate_token(),
                admin_id,
                expires_at: bson::DateTime::from_chrono(credentials::expiry_after(
                    credentials::RESET_TOKEN_TTL_MINUTES,
                )),
            };
            tokens.insert_one(&token, None).await?;

            info!("Password reset token for {}: {}", email, token.token);
        }
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
}

#[derive(Debug, Deserialize)]
pub struct ResetBody {
    pub token: String,
    pub password: String,
}

/// POST /api/auth/reset
///
/// Consumes the token, replaces the password digest, and revokes every
/// session of the account.
pub async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetBody>,
) -> Result<Json<Value>, ApiError> {
    if request.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let tokens = state
        .db
        .collection::<ResetToken>(collections::RESET_TOKENS);

    let reset_token = tokens
        .find_one(doc! { "token": &request.token }, None)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired reset token".to_string()))?;

    if reset_token.expires_at < bson::DateTime::now() {
        return Err(ApiError::Unauthorized(
            "Invalid or expired reset token".to_string(),
        ));
    }

    let salt = credentials::generate_salt();
    let digest = credentials::hash_password(&request.password, &salt);

    state
        .db
        .collection::<Admin>(collections::ADMINS)
        .update_one(
            doc! { "_id": reset_token.admin_id },
            doc! { "$set": { "salt": salt, "password_digest": digest } },
            None,
        )
        .await?;

    tokens.delete_one(doc! { "token": &request.token }, None).await?;

    // Force re-login everywhere after a password change
    state
        .db
        .collection::<Session>(collections::SESSIONS)
        .delete_many(doc! { "admin_id": reset_token.admin_id }, None)
        .await?;

    info!("Password reset completed for admin {}", reset_token.admin_id.to_hex());

    Ok(Json(json!({ "status": "ok" })))
}
