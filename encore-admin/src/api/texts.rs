//! Text page endpoints (news items, essays, biography sections)

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bson::{doc, oid::ObjectId, Document};
use encore_common::db::models::{collections, Text};
use encore_common::normalize;
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct TextPayload {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub category: String,
    pub body: String,
}

impl TextPayload {
    fn validate(&self) -> Result<(), ApiError> {
        super::require_nonempty("title", &self.title)?;
        super::validate_slug(&self.slug)?;
        super::require_nonempty("body", &self.body)
    }
}

/// GET /api/texts
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::TEXTS)
        .find(
            doc! {},
            FindOptions::builder()
                .sort(doc! { "category": 1, "title": 1 })
                .build(),
        )
        .await?
        .try_collect()
        .await?;

    let texts: Vec<Value> = docs.iter().map(normalize::text).collect();
    Ok(Json(json!({ "texts": texts })))
}

/// GET /api/texts/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    Ok(Json(fetch_normalized(&state, id).await?))
}

/// POST /api/texts
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<TextPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    payload.validate()?;

    let text = Text {
        id: None,
        title: payload.title,
        slug: payload.slug,
        category: payload.category,
        body: payload.body,
    };

    let result = state
        .db
        .collection::<Text>(collections::TEXTS)
        .insert_one(&text, None)
        .await?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    Ok((StatusCode::CREATED, Json(fetch_normalized(&state, id).await?)))
}

/// PUT /api/texts/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TextPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    payload.validate()?;

    let texts = state.db.collection::<Text>(collections::TEXTS);
    texts
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("text {}", id.to_hex())))?;

    let updated = Text {
        id: Some(id),
        title: payload.title,
        slug: payload.slug,
        category: payload.category,
        body: payload.body,
    };
    texts.replace_one(doc! { "_id": id }, &updated, None).await?;

    Ok(Json(fetch_normalized(&state, id).await?))
}

/// DELETE /api/texts/:id
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;

    let texts = state.db.collection::<Text>(collections::TEXTS);
    texts
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("text {}", id.to_hex())))?;

    texts.delete_one(doc! { "_id": id }, None).await?;

    Ok(Json(json!({ "status": "deleted" })))
}

async fn fetch_normalized(state: &AppState, id: ObjectId) -> Result<Value, ApiError> {
    let doc = state
        .db
        .collection::<Document>(collections::TEXTS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("text {}", id.to_hex())))?;

    Ok(normalize::text(&doc))
}
