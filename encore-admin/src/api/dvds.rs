//! DVD catalog endpoints
//!
//! Same shape as the CD endpoints; DVDs carry a runtime and their track
//! list holds the chapter entries.

use crate::api::{cds, files};
use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bson::{doc, oid::ObjectId, Document};
use encore_common::db::models::{collections, Dvd, RelatedRef, Track};
use encore_common::normalize;
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct DvdPayload {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub runtime_minutes: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_id: Option<String>,
}

impl DvdPayload {
    fn validate(&self) -> Result<Option<ObjectId>, ApiError> {
        super::require_nonempty("title", &self.title)?;
        super::validate_slug(&self.slug)?;
        self.cover_id
            .as_deref()
            .map(super::parse_object_id)
            .transpose()
    }
}

/// GET /api/dvds
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::DVDS)
        .find(
            doc! {},
            FindOptions::builder()
                .sort(doc! { "year": -1, "title": 1 })
                .build(),
        )
        .await?
        .try_collect()
        .await?;

    let dvds: Vec<Value> = docs.iter().map(normalize::dvd).collect();
    Ok(Json(json!({ "dvds": dvds })))
}

/// GET /api/dvds/:id - chapters embedded in order
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let mut value = fetch_normalized(&state, id).await?;
    value["tracks"] = cds::embedded_tracks(&state, &value["tracks"]).await?;
    Ok(Json(value))
}

/// POST /api/dvds
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<DvdPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let cover_id = payload.validate()?;
    if let Some(cover) = cover_id {
        files::ensure_exists(&state, cover).await?;
    }

    let dvd = Dvd {
        id: None,
        title: payload.title,
        slug: payload.slug,
        year: payload.year,
        runtime_minutes: payload.runtime_minutes,
        description: payload.description,
        tracks: Vec::new(),
        cover_id,
    };

    let result = state
        .db
        .collection::<Dvd>(collections::DVDS)
        .insert_one(&dvd, None)
        .await?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    if let Some(cover) = cover_id {
        files::attach_to(&state, cover, RelatedRef::new(collections::DVDS, id)).await?;
    }

    Ok((StatusCode::CREATED, Json(fetch_normalized(&state, id).await?)))
}

/// PUT /api/dvds/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<DvdPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let cover_id = payload.validate()?;

    // Existing records are read raw; legacy field shapes must still update
    let existing = state
        .db
        .collection::<Document>(collections::DVDS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("dvd {}", id.to_hex())))?;
    let existing_cover = super::legacy_ref(&existing, &["cover_id", "cover"]);

    if cover_id != existing_cover {
        if let Some(cover) = cover_id {
            files::ensure_exists(&state, cover).await?;
        }
    }

    let updated = Dvd {
        id: Some(id),
        title: payload.title,
        slug: payload.slug,
        year: payload.year,
        runtime_minutes: payload.runtime_minutes,
        description: payload.description,
        tracks: super::legacy_id_list(&existing, "tracks"),
        cover_id,
    };
    state
        .db
        .collection::<Dvd>(collections::DVDS)
        .replace_one(doc! { "_id": id }, &updated, None)
        .await?;

    if cover_id != existing_cover {
        let owner = RelatedRef::new(collections::DVDS, id);
        if let Some(cover) = cover_id {
            files::attach_to(&state, cover, owner.clone()).await?;
        }
        if let Some(old_cover) = existing_cover {
            files::detach_and_reap(&state, old_cover, &owner).await?;
        }
    }

    Ok(Json(fetch_normalized(&state, id).await?))
}

/// DELETE /api/dvds/:id - removes the DVD's chapters with it
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;

    let dvds = state.db.collection::<Document>(collections::DVDS);
    let existing = dvds
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("dvd {}", id.to_hex())))?;

    dvds.delete_one(doc! { "_id": id }, None).await?;

    let track_ids = super::legacy_id_list(&existing, "tracks");
    if !track_ids.is_empty() {
        state
            .db
            .collection::<Track>(collections::TRACKS)
            .delete_many(doc! { "_id": { "$in": track_ids } }, None)
            .await?;
    }

    if let Some(cover) = super::legacy_ref(&existing, &["cover_id", "cover"]) {
        files::detach_and_reap(&state, cover, &RelatedRef::new(collections::DVDS, id)).await?;
    }

    Ok(Json(json!({ "status": "deleted" })))
}

/// POST /api/dvds/:id/tracks
pub async fn add_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<cds::TrackPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = super::parse_object_id(&id)?;
    super::require_nonempty("title", &payload.title)?;

    let dvds = state.db.collection::<Document>(collections::DVDS);
    let dvd = dvds
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("dvd {}", id.to_hex())))?;
    let track_count = super::legacy_id_list(&dvd, "tracks").len();

    let track = Track {
        id: None,
        title: payload.title,
        position: payload.position.unwrap_or(track_count as i32 + 1),
        duration_seconds: payload.duration_seconds,
        comment: payload.comment,
    };

    let result = state
        .db
        .collection::<Track>(collections::TRACKS)
        .insert_one(&track, None)
        .await?;

    let track_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    dvds.update_one(
        doc! { "_id": id },
        doc! { "$push": { "tracks": track_id } },
        None,
    )
    .await?;

    let doc = state
        .db
        .collection::<Document>(collections::TRACKS)
        .find_one(doc! { "_id": track_id }, None)
        .await?
        .ok_or_else(|| ApiError::Internal("Inserted track vanished".to_string()))?;

    Ok((StatusCode::CREATED, Json(normalize::track(&doc))))
}

/// DELETE /api/dvds/:id/tracks/:track_id
pub async fn remove_track(
    State(state): State<AppState>,
    Path((id, track_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let track_id = super::parse_object_id(&track_id)?;

    let dvds = state.db.collection::<Document>(collections::DVDS);
    let dvd = dvds
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("dvd {}", id.to_hex())))?;

    if !super::legacy_id_list(&dvd, "tracks").contains(&track_id) {
        return Err(ApiError::NotFound(format!(
            "track {} on dvd {}",
            track_id.to_hex(),
            id.to_hex()
        )));
    }

    dvds.update_one(
        doc! { "_id": id },
        doc! { "$pull": { "tracks": track_id } },
        None,
    )
    .await?;

    state
        .db
        .collection::<Track>(collections::TRACKS)
        .delete_one(doc! { "_id": track_id }, None)
        .await?;

    Ok(Json(json!({ "status": "deleted" })))
}

async fn fetch_normalized(state: &AppState, id: ObjectId) -> Result<Value, ApiError> {
    let doc = state
        .db
        .collection::<Document>(collections::DVDS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("dvd {}", id.to_hex())))?;

    Ok(normalize::dvd(&doc))
}
