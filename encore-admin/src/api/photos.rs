//! Photo catalog endpoints
//!
//! Unlike covers and posters, a photo's file is not optional: the photo IS
//! the media asset plus its caption data.

use crate::api::files;
use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bson::{doc, oid::ObjectId, Document};
use encore_common::db::models::{collections, Photo, RelatedRef};
use encore_common::normalize;
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct PhotoPayload {
    pub title: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub file_id: String,
}

impl PhotoPayload {
    fn validate(&self) -> Result<ObjectId, ApiError> {
        super::require_nonempty("title", &self.title)?;
        super::parse_object_id(&self.file_id)
    }
}

/// GET /api/photos
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::PHOTOS)
        .find(
            doc! {},
            FindOptions::builder()
                .sort(doc! { "year": -1, "title": 1 })
                .build(),
        )
        .await?
        .try_collect()
        .await?;

    let photos: Vec<Value> = docs.iter().map(normalize::photo).collect();
    Ok(Json(json!({ "photos": photos })))
}

/// GET /api/photos/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    Ok(Json(fetch_normalized(&state, id).await?))
}

/// POST /api/photos
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<PhotoPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let file_id = payload.validate()?;
    files::ensure_exists(&state, file_id).await?;

    let photo = Photo {
        id: None,
        title: payload.title,
        caption: payload.caption,
        year: payload.year,
        file_id,
    };

    let result = state
        .db
        .collection::<Photo>(collections::PHOTOS)
        .insert_one(&photo, None)
        .await?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    files::attach_to(&state, file_id, RelatedRef::new(collections::PHOTOS, id)).await?;

    Ok((StatusCode::CREATED, Json(fetch_normalized(&state, id).await?)))
}

/// PUT /api/photos/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<PhotoPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let file_id = payload.validate()?;

    // Existing records are read raw; legacy field shapes must still update
    let existing = state
        .db
        .collection::<Document>(collections::PHOTOS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("photo {}", id.to_hex())))?;
    let existing_file = super::legacy_ref(&existing, &["file_id", "file", "image"]);

    if Some(file_id) != existing_file {
        files::ensure_exists(&state, file_id).await?;
    }

    let updated = Photo {
        id: Some(id),
        title: payload.title,
        caption: payload.caption,
        year: payload.year,
        file_id,
    };
    state
        .db
        .collection::<Photo>(collections::PHOTOS)
        .replace_one(doc! { "_id": id }, &updated, None)
        .await?;

    if Some(file_id) != existing_file {
        let owner = RelatedRef::new(collections::PHOTOS, id);
        files::attach_to(&state, file_id, owner.clone()).await?;
        if let Some(old_file) = existing_file {
            files::detach_and_reap(&state, old_file, &owner).await?;
        }
    }

    Ok(Json(fetch_normalized(&state, id).await?))
}

/// DELETE /api/photos/:id
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;

    let photos = state.db.collection::<Document>(collections::PHOTOS);
    let existing = photos
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("photo {}", id.to_hex())))?;

    photos.delete_one(doc! { "_id": id }, None).await?;

    if let Some(file_id) = super::legacy_ref(&existing, &["file_id", "file", "image"]) {
        files::detach_and_reap(&state, file_id, &RelatedRef::new(collections::PHOTOS, id)).await?;
    }

    Ok(Json(json!({ "status": "deleted" })))
}

async fn fetch_normalized(state: &AppState, id: ObjectId) -> Result<Value, ApiError> {
    let doc = state
        .db
        .collection::<Document>(collections::PHOTOS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("photo {}", id.to_hex())))?;

    Ok(normalize::photo(&doc))
}
