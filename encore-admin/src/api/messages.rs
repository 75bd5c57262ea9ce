//! Fan message endpoints
//!
//! Submission is the one write the public site performs against this
//! service. Deleting a message only marks it, pending manual review; a
//! purge is allowed once the message has been soft-deleted.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bson::{doc, oid::ObjectId, Document};
use encore_common::db::models::{collections, FanMessage};
use encore_common::normalize;
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};

/// Longest accepted message body
const MAX_BODY_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct SubmitPayload {
    pub author: String,
    pub email: String,
    pub body: String,
}

/// POST /api/messages/submit - public, used by the fan site's form
pub async fn submit(
    State(state): State<AppState>,
    Json(payload): Json<SubmitPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    super::require_nonempty("author", &payload.author)?;
    super::require_nonempty("body", &payload.body)?;
    super::validate_email(payload.email.trim())?;

    if payload.body.chars().count() > MAX_BODY_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message body exceeds {} characters",
            MAX_BODY_CHARS
        )));
    }

    let message = FanMessage {
        id: None,
        author: payload.author.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        body: payload.body,
        submitted_at: bson::DateTime::now(),
        deleted: false,
        deleted_at: None,
    };

    state
        .db
        .collection::<FanMessage>(collections::MESSAGES)
        .insert_one(&message, None)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "status": "received" }))))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Include soft-deleted messages in the listing
    #[serde(default)]
    pub include_deleted: bool,
}

/// GET /api/messages - newest first
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = if query.include_deleted {
        doc! {}
    } else {
        doc! { "deleted": { "$ne": true } }
    };

    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::MESSAGES)
        .find(
            filter,
            FindOptions::builder()
                .sort(doc! { "submitted_at": -1 })
                .build(),
        )
        .await?
        .try_collect()
        .await?;

    let messages: Vec<Value> = docs.iter().map(normalize::message).collect();
    Ok(Json(json!({ "messages": messages })))
}

/// DELETE /api/messages/:id - soft delete
pub async fn soft_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let messages = state.db.collection::<Document>(collections::MESSAGES);

    find_message(&state, id).await?;

    messages
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "deleted": true, "deleted_at": bson::DateTime::now() } },
            None,
        )
        .await?;

    Ok(Json(json!({ "status": "deleted" })))
}

/// POST /api/messages/:id/restore
pub async fn restore(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let messages = state.db.collection::<Document>(collections::MESSAGES);

    find_message(&state, id).await?;

    messages
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "deleted": false }, "$unset": { "deleted_at": "" } },
            None,
        )
        .await?;

    Ok(Json(json!({ "status": "restored" })))
}

/// DELETE /api/messages/:id/purge - hard delete, soft-deleted messages only
pub async fn purge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let messages = state.db.collection::<Document>(collections::MESSAGES);

    let message = find_message(&state, id).await?;
    if !encore_common::normalize::bool_or(&message, "deleted", false) {
        return Err(ApiError::Conflict(
            "Message must be soft-deleted before purge".to_string(),
        ));
    }

    messages.delete_one(doc! { "_id": id }, None).await?;

    Ok(Json(json!({ "status": "purged" })))
}

/// Raw read: legacy messages do not all fit the typed model
async fn find_message(state: &AppState, id: ObjectId) -> Result<Document, ApiError> {
    state
        .db
        .collection::<Document>(collections::MESSAGES)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("message {}", id.to_hex())))
}
