//! Admin account endpoints
//!
//! Listings never include the salt or password digest.

use crate::api::auth::AdminIdentity;
use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use bson::doc;
use encore_common::auth as credentials;
use encore_common::db::models::{collections, Admin, Session};
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// GET /api/admins
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let admins: Vec<Admin> = state
        .db
        .collection::<Admin>(collections::ADMINS)
        .find(
            doc! {},
            FindOptions::builder().sort(doc! { "email": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?;

    let admins: Vec<Value> = admins
        .iter()
        .map(|admin| {
            json!({
                "id": admin.id.map(|id| id.to_hex()).unwrap_or_default(),
                "email": admin.email,
                "created_at": admin.created_at.try_to_rfc3339_string().ok(),
            })
        })
        .collect();

    Ok(Json(json!({ "admins": admins })))
}

#[derive(Debug, Deserialize)]
pub struct AdminPayload {
    pub email: String,
    pub password: String,
}

/// POST /api/admins
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<AdminPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    super::validate_email(payload.email.trim())?;
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let salt = credentials::generate_salt();
    let admin = Admin {
        id: None,
        email: payload.email.trim().to_lowercase(),
        password_digest: credentials::hash_password(&payload.password, &salt),
        salt,
        created_at: bson::DateTime::now(),
    };

    let result = state
        .db
        .collection::<Admin>(collections::ADMINS)
        .insert_one(&admin, None)
        .await?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    info!("Admin account created: {}", admin.email);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id.to_hex(), "email": admin.email })),
    ))
}

/// DELETE /api/admins/:id - an admin cannot delete their own account
pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;

    if id == identity.admin_id {
        return Err(ApiError::Conflict(
            "Cannot delete your own account".to_string(),
        ));
    }

    let admins = state.db.collection::<Admin>(collections::ADMINS);
    let admin = admins
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("admin {}", id.to_hex())))?;

    admins.delete_one(doc! { "_id": id }, None).await?;

    // Their sessions die with the account
    state
        .db
        .collection::<Session>(collections::SESSIONS)
        .delete_many(doc! { "admin_id": id }, None)
        .await?;

    info!("Admin account removed: {}", admin.email);

    Ok(Json(json!({ "status": "deleted" })))
}
