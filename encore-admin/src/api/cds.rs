//! CD catalog endpoints
//!
//! A CD references its tracks by id; the detail view embeds the full track
//! documents in playing order, the list view leaves the id references as-is.

use crate::api::files;
use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bson::{doc, oid::ObjectId, Document};
use encore_common::db::models::{collections, Cd, RelatedRef, Track};
use encore_common::normalize;
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct CdPayload {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_id: Option<String>,
}

impl CdPayload {
    fn validate(&self) -> Result<Option<ObjectId>, ApiError> {
        super::require_nonempty("title", &self.title)?;
        super::validate_slug(&self.slug)?;
        self.cover_id
            .as_deref()
            .map(super::parse_object_id)
            .transpose()
    }
}

/// Track creation body, shared with the DVD endpoints
#[derive(Debug, Deserialize)]
pub struct TrackPayload {
    pub title: String,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// GET /api/cds
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::CDS)
        .find(
            doc! {},
            FindOptions::builder()
                .sort(doc! { "year": -1, "title": 1 })
                .build(),
        )
        .await?
        .try_collect()
        .await?;

    let cds: Vec<Value> = docs.iter().map(normalize::cd).collect();
    Ok(Json(json!({ "cds": cds })))
}

/// GET /api/cds/:id - tracks embedded in playing order
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let mut value = fetch_normalized(&state, id).await?;
    value["tracks"] = embedded_tracks(&state, &value["tracks"]).await?;
    Ok(Json(value))
}

/// POST /api/cds
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CdPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let cover_id = payload.validate()?;
    if let Some(cover) = cover_id {
        files::ensure_exists(&state, cover).await?;
    }

    let cd = Cd {
        id: None,
        title: payload.title,
        slug: payload.slug,
        year: payload.year,
        label: payload.label,
        description: payload.description,
        tracks: Vec::new(),
        cover_id,
    };

    let result = state
        .db
        .collection::<Cd>(collections::CDS)
        .insert_one(&cd, None)
        .await?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    if let Some(cover) = cover_id {
        files::attach_to(&state, cover, RelatedRef::new(collections::CDS, id)).await?;
    }

    Ok((StatusCode::CREATED, Json(fetch_normalized(&state, id).await?)))
}

/// PUT /api/cds/:id - the track list is managed via the track endpoints
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CdPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let cover_id = payload.validate()?;

    // Existing records are read raw; legacy field shapes must still update
    let existing = state
        .db
        .collection::<Document>(collections::CDS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("cd {}", id.to_hex())))?;
    let existing_cover = super::legacy_ref(&existing, &["cover_id", "cover"]);

    if cover_id != existing_cover {
        if let Some(cover) = cover_id {
            files::ensure_exists(&state, cover).await?;
        }
    }

    let updated = Cd {
        id: Some(id),
        title: payload.title,
        slug: payload.slug,
        year: payload.year,
        label: payload.label,
        description: payload.description,
        tracks: super::legacy_id_list(&existing, "tracks"),
        cover_id,
    };
    state
        .db
        .collection::<Cd>(collections::CDS)
        .replace_one(doc! { "_id": id }, &updated, None)
        .await?;

    if cover_id != existing_cover {
        let owner = RelatedRef::new(collections::CDS, id);
        if let Some(cover) = cover_id {
            files::attach_to(&state, cover, owner.clone()).await?;
        }
        if let Some(old_cover) = existing_cover {
            files::detach_and_reap(&state, old_cover, &owner).await?;
        }
    }

    Ok(Json(fetch_normalized(&state, id).await?))
}

/// DELETE /api/cds/:id - removes the CD's tracks with it
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;

    let cds = state.db.collection::<Document>(collections::CDS);
    let existing = cds
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("cd {}", id.to_hex())))?;

    cds.delete_one(doc! { "_id": id }, None).await?;

    let track_ids = super::legacy_id_list(&existing, "tracks");
    if !track_ids.is_empty() {
        state
            .db
            .collection::<Track>(collections::TRACKS)
            .delete_many(doc! { "_id": { "$in": track_ids } }, None)
            .await?;
    }

    if let Some(cover) = super::legacy_ref(&existing, &["cover_id", "cover"]) {
        files::detach_and_reap(&state, cover, &RelatedRef::new(collections::CDS, id)).await?;
    }

    Ok(Json(json!({ "status": "deleted" })))
}

/// POST /api/cds/:id/tracks
pub async fn add_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TrackPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = super::parse_object_id(&id)?;
    super::require_nonempty("title", &payload.title)?;

    let cds = state.db.collection::<Document>(collections::CDS);
    let cd = cds
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("cd {}", id.to_hex())))?;
    let track_count = super::legacy_id_list(&cd, "tracks").len();

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

    cds.update_one(
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

/// DELETE /api/cds/:id/tracks/:track_id
pub async fn remove_track(
    State(state): State<AppState>,
    Path((id, track_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let track_id = super::parse_object_id(&track_id)?;

    let cds = state.db.collection::<Document>(collections::CDS);
    let cd = cds
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("cd {}", id.to_hex())))?;

    if !super::legacy_id_list(&cd, "tracks").contains(&track_id) {
        return Err(ApiError::NotFound(format!(
            "track {} on cd {}",
            track_id.to_hex(),
            id.to_hex()
        )));
    }

    cds.update_one(
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
        .collection::<Document>(collections::CDS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("cd {}", id.to_hex())))?;

    Ok(normalize::cd(&doc))
}

/// Resolve a normalized id list into full track documents, sorted by
/// position
pub(crate) async fn embedded_tracks(
    state: &AppState,
    track_ids: &Value,
) -> Result<Value, ApiError> {
    let ids: Vec<ObjectId> = track_ids
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| ObjectId::parse_str(s).ok())
                .collect()
        })
        .unwrap_or_default();

    if ids.is_empty() {
        return Ok(json!([]));
    }

    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::TRACKS)
        .find(
            doc! { "_id": { "$in": ids } },
            FindOptions::builder().sort(doc! { "position": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?;

    Ok(Value::Array(docs.iter().map(normalize::track).collect()))
}
