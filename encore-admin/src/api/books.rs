//! Book catalog endpoints

use crate::api::files;
use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bson::{doc, oid::ObjectId, Document};
use encore_common::db::models::{collections, Book, RelatedRef};
use encore_common::normalize;
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct BookPayload {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_id: Option<String>,
}

impl BookPayload {
    fn validate(&self) -> Result<Option<ObjectId>, ApiError> {
        super::require_nonempty("title", &self.title)?;
        super::validate_slug(&self.slug)?;
        self.cover_id
            .as_deref()
            .map(super::parse_object_id)
            .transpose()
    }

    fn into_model(self, id: Option<ObjectId>, cover_id: Option<ObjectId>) -> Book {
        Book {
            id,
            title: self.title,
            slug: self.slug,
            author: self.author,
            year: self.year,
            description: self.description,
            cover_id,
        }
    }
}

/// GET /api/books
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::BOOKS)
        .find(
            doc! {},
            FindOptions::builder().sort(doc! { "title": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?;

    let books: Vec<Value> = docs.iter().map(normalize::book).collect();
    Ok(Json(json!({ "books": books })))
}

/// GET /api/books/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    Ok(Json(fetch_normalized(&state, id).await?))
}

/// POST /api/books
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<BookPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let cover_id = payload.validate()?;
    if let Some(cover) = cover_id {
        files::ensure_exists(&state, cover).await?;
    }

    let book = payload.into_model(None, cover_id);
    let result = state
        .db
        .collection::<Book>(collections::BOOKS)
        .insert_one(&book, None)
        .await?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    if let Some(cover) = cover_id {
        files::attach_to(&state, cover, RelatedRef::new(collections::BOOKS, id)).await?;
    }

    Ok((StatusCode::CREATED, Json(fetch_normalized(&state, id).await?)))
}

/// PUT /api/books/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let cover_id = payload.validate()?;

    // Existing records are read raw; legacy field shapes must still update
    let existing = state
        .db
        .collection::<Document>(collections::BOOKS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {}", id.to_hex())))?;
    let existing_cover = super::legacy_ref(&existing, &["cover_id", "cover"]);

    if cover_id != existing_cover {
        if let Some(cover) = cover_id {
            files::ensure_exists(&state, cover).await?;
        }
    }

    let updated = payload.into_model(Some(id), cover_id);
    state
        .db
        .collection::<Book>(collections::BOOKS)
        .replace_one(doc! { "_id": id }, &updated, None)
        .await?;

    if cover_id != existing_cover {
        let owner = RelatedRef::new(collections::BOOKS, id);
        if let Some(cover) = cover_id {
            files::attach_to(&state, cover, owner.clone()).await?;
        }
        if let Some(old_cover) = existing_cover {
            files::detach_and_reap(&state, old_cover, &owner).await?;
        }
    }

    Ok(Json(fetch_normalized(&state, id).await?))
}

/// DELETE /api/books/:id
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;

    let books = state.db.collection::<Document>(collections::BOOKS);
    let existing = books
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {}", id.to_hex())))?;

    books.delete_one(doc! { "_id": id }, None).await?;

    if let Some(cover) = super::legacy_ref(&existing, &["cover_id", "cover"]) {
        files::detach_and_reap(&state, cover, &RelatedRef::new(collections::BOOKS, id)).await?;
    }

    Ok(Json(json!({ "status": "deleted" })))
}

async fn fetch_normalized(state: &AppState, id: ObjectId) -> Result<Value, ApiError> {
    let doc = state
        .db
        .collection::<Document>(collections::BOOKS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {}", id.to_hex())))?;

    Ok(normalize::book(&doc))
}
