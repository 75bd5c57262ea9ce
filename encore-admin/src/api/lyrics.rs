//! Lyrics catalog endpoints

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bson::{doc, oid::ObjectId, Document};
use encore_common::db::models::{collections, Lyric};
use encore_common::normalize;
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct LyricPayload {
    pub title: String,
    pub slug: String,
    pub body: String,
    #[serde(default)]
    pub year: Option<i32>,
}

impl LyricPayload {
    fn validate(&self) -> Result<(), ApiError> {
        super::require_nonempty("title", &self.title)?;
        super::validate_slug(&self.slug)?;
        super::require_nonempty("body", &self.body)
    }
}

/// GET /api/lyrics
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::LYRICS)
        .find(
            doc! {},
            FindOptions::builder().sort(doc! { "title": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?;

    let lyrics: Vec<Value> = docs.iter().map(normalize::lyric).collect();
    Ok(Json(json!({ "lyrics": lyrics })))
}

/// GET /api/lyrics/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    Ok(Json(fetch_normalized(&state, id).await?))
}

/// POST /api/lyrics
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<LyricPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    payload.validate()?;

    let lyric = Lyric {
        id: None,
        title: payload.title,
        slug: payload.slug,
        body: payload.body,
        year: payload.year,
    };

    let result = state
        .db
        .collection::<Lyric>(collections::LYRICS)
        .insert_one(&lyric, None)
        .await?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    Ok((StatusCode::CREATED, Json(fetch_normalized(&state, id).await?)))
}

/// PUT /api/lyrics/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<LyricPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    payload.validate()?;

    let lyrics = state.db.collection::<Lyric>(collections::LYRICS);
    lyrics
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("lyric {}", id.to_hex())))?;

    let updated = Lyric {
        id: Some(id),
        title: payload.title,
        slug: payload.slug,
        body: payload.body,
        year: payload.year,
    };
    lyrics.replace_one(doc! { "_id": id }, &updated, None).await?;

    Ok(Json(fetch_normalized(&state, id).await?))
}

/// DELETE /api/lyrics/:id
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;

    let lyrics = state.db.collection::<Lyric>(collections::LYRICS);
    lyrics
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("lyric {}", id.to_hex())))?;

    lyrics.delete_one(doc! { "_id": id }, None).await?;

    Ok(Json(json!({ "status": "deleted" })))
}

async fn fetch_normalized(state: &AppState, id: ObjectId) -> Result<Value, ApiError> {
    let doc = state
        .db
        .collection::<Document>(collections::LYRICS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("lyric {}", id.to_hex())))?;

    Ok(normalize::lyric(&doc))
}
