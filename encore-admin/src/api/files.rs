//! Media file management
//!
//! Files live on the media host; the `files` collection records the asset
//! and the list of records referencing it. A file with active references
//! cannot be hard-deleted. Owner modules call [`attach_to`] and
//! [`detach_and_reap`] instead of touching the collection directly.

use crate::error::ApiError;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bson::{doc, oid::ObjectId, Document};
use encore_common::db::models::{collections, RelatedRef, StoredFile};
use encore_common::db::relations;
use encore_common::normalize;
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

/// GET /api/files
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::FILES)
        .find(
            doc! {},
            FindOptions::builder().sort(doc! { "uploaded_at": -1 }).build(),
        )
        .await?
        .try_collect()
        .await?;

    let files: Vec<Value> = docs.iter().map(normalize::file).collect();
    Ok(Json(json!({ "files": files })))
}

/// GET /api/files/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;

    let doc = state
        .db
        .collection::<Document>(collections::FILES)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("file {}", id.to_hex())))?;

    Ok(Json(normalize::file(&doc)))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

/// POST /api/files?filename=cover.jpg
///
/// Body is the raw asset; it is passed through to the media host unchanged
/// and recorded with an empty reference list.
pub async fn upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    super::require_nonempty("filename", &query.filename)?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty upload body".to_string()));
    }

    let (stem, extension) = split_filename(&query.filename);
    let public_id = format!("{}-{}", stem, Uuid::new_v4());

    let asset = state.media.upload(body.to_vec(), &public_id).await?;

    let file = StoredFile {
        id: None,
        public_id: asset.public_id,
        url: asset.url,
        format: if asset.format.is_empty() {
            extension
        } else {
            asset.format
        },
        bytes: if asset.bytes > 0 {
            asset.bytes
        } else {
            body.len() as i64
        },
        uploaded_at: bson::DateTime::now(),
        related: Vec::new(),
    };

    let result = state
        .db
        .collection::<StoredFile>(collections::FILES)
        .insert_one(&file, None)
        .await?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    let doc = state
        .db
        .collection::<Document>(collections::FILES)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::Internal("Uploaded file vanished".to_string()))?;

    Ok((StatusCode::CREATED, Json(normalize::file(&doc))))
}

/// DELETE /api/files/:id
///
/// Refused with 409 while any record still references the file.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let files = state.db.collection::<StoredFile>(collections::FILES);

    let file = files
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("file {}", id.to_hex())))?;

    if !file.related.is_empty() {
        return Err(ApiError::Conflict(format!(
            "File is referenced by {} record(s)",
            file.related.len()
        )));
    }

    state.media.destroy(&file.public_id).await?;
    files.delete_one(doc! { "_id": id }, None).await?;

    Ok(Json(json!({ "status": "deleted" })))
}

// ========================================
// Helpers for owner modules
// ========================================

/// 400 when a client-supplied file id does not exist
pub(crate) async fn ensure_exists(state: &AppState, file_id: ObjectId) -> Result<(), ApiError> {
    let found = state
        .db
        .collection::<Document>(collections::FILES)
        .find_one(doc! { "_id": file_id }, None)
        .await?;

    if found.is_none() {
        return Err(ApiError::BadRequest(format!(
            "Unknown file id: {}",
            file_id.to_hex()
        )));
    }
    Ok(())
}

/// Record that `owner` references the file
pub(crate) async fn attach_to(
    state: &AppState,
    file_id: ObjectId,
    owner: RelatedRef,
) -> Result<(), ApiError> {
    relations::attach_file(&state.db, file_id, owner).await?;
    Ok(())
}

/// Drop `owner`'s reference; reap the file once nothing references it
///
/// Asset cleanup on the media host is best-effort: a host failure is logged
/// and the document is removed anyway.
pub(crate) async fn detach_and_reap(
    state: &AppState,
    file_id: ObjectId,
    owner: &RelatedRef,
) -> Result<(), ApiError> {
    let files = state.db.collection::<StoredFile>(collections::FILES);

    let Some(file) = files.find_one(doc! { "_id": file_id }, None).await? else {
        return Ok(());
    };

    let orphaned = relations::detach_file(&state.db, file_id, owner).await?;
    if orphaned {
        if let Err(e) = state.media.destroy(&file.public_id).await {
            warn!("Could not delete media asset {}: {}", file.public_id, e);
        }
        files.delete_one(doc! { "_id": file_id }, None).await?;
    }

    Ok(())
}

fn split_filename(filename: &str) -> (String, String) {
    let (stem, extension) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_ascii_lowercase()),
        _ => (filename, String::new()),
    };

    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    (stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_filename() {
        assert_eq!(
            split_filename("Cover Art.JPG"),
            ("cover-art".to_string(), "jpg".to_string())
        );
        assert_eq!(
            split_filename("photo.tar.gz"),
            ("photo-tar".to_string(), "gz".to_string())
        );
        assert_eq!(
            split_filename("noextension"),
            ("noextension".to_string(), String::new())
        );
        assert_eq!(
            split_filename(".hidden"),
            ("-hidden".to_string(), String::new())
        );
    }
}
