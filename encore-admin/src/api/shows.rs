//! Show (concert) catalog endpoints

use crate::api::files;
use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bson::{doc, oid::ObjectId, Document};
use encore_common::db::models::{collections, RelatedRef, Show};
use encore_common::normalize;
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ShowPayload {
    /// RFC 3339 timestamp or plain `YYYY-MM-DD`
    pub date: String,
    pub venue: String,
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub poster_id: Option<String>,
}

impl ShowPayload {
    fn validate(&self) -> Result<(bson::DateTime, Option<ObjectId>), ApiError> {
        super::require_nonempty("venue", &self.venue)?;
        super::require_nonempty("city", &self.city)?;

        let date = parse_show_date(&self.date)?;
        let poster_id = self
            .poster_id
            .as_deref()
            .map(super::parse_object_id)
            .transpose()?;

        Ok((date, poster_id))
    }

    fn into_model(self, id: Option<ObjectId>, date: bson::DateTime, poster_id: Option<ObjectId>) -> Show {
        Show {
            id,
            date,
            venue: self.venue,
            city: self.city,
            country: self.country,
            notes: self.notes,
            poster_id,
        }
    }
}

/// Accept a full timestamp or a bare date; shows rarely carry a time
fn parse_show_date(raw: &str) -> Result<bson::DateTime, ApiError> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(bson::DateTime::from_chrono(dt.with_timezone(&chrono::Utc)));
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let dt = date.and_time(chrono::NaiveTime::MIN).and_utc();
        return Ok(bson::DateTime::from_chrono(dt));
    }

    Err(ApiError::BadRequest(format!("Invalid show date: {}", raw)))
}

/// GET /api/shows - newest first
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let docs: Vec<Document> = state
        .db
        .collection::<Document>(collections::SHOWS)
        .find(
            doc! {},
            FindOptions::builder().sort(doc! { "date": -1 }).build(),
        )
        .await?
        .try_collect()
        .await?;

    let shows: Vec<Value> = docs.iter().map(normalize::show).collect();
    Ok(Json(json!({ "shows": shows })))
}

/// GET /api/shows/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    Ok(Json(fetch_normalized(&state, id).await?))
}

/// POST /api/shows
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<ShowPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (date, poster_id) = payload.validate()?;
    if let Some(poster) = poster_id {
        files::ensure_exists(&state, poster).await?;
    }

    let show = payload.into_model(None, date, poster_id);
    let result = state
        .db
        .collection::<Show>(collections::SHOWS)
        .insert_one(&show, None)
        .await?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Insert returned no id".to_string()))?;

    if let Some(poster) = poster_id {
        files::attach_to(&state, poster, RelatedRef::new(collections::SHOWS, id)).await?;
    }

    Ok((StatusCode::CREATED, Json(fetch_normalized(&state, id).await?)))
}

/// PUT /api/shows/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ShowPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;
    let (date, poster_id) = payload.validate()?;

    // Existing records are read raw; legacy field shapes must still update
    let existing = state
        .db
        .collection::<Document>(collections::SHOWS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("show {}", id.to_hex())))?;
    let existing_poster = super::legacy_ref(&existing, &["poster_id", "poster"]);

    if poster_id != existing_poster {
        if let Some(poster) = poster_id {
            files::ensure_exists(&state, poster).await?;
        }
    }

    let updated = payload.into_model(Some(id), date, poster_id);
    state
        .db
        .collection::<Show>(collections::SHOWS)
        .replace_one(doc! { "_id": id }, &updated, None)
        .await?;

    if poster_id != existing_poster {
        let owner = RelatedRef::new(collections::SHOWS, id);
        if let Some(poster) = poster_id {
            files::attach_to(&state, poster, owner.clone()).await?;
        }
        if let Some(old_poster) = existing_poster {
            files::detach_and_reap(&state, old_poster, &owner).await?;
        }
    }

    Ok(Json(fetch_normalized(&state, id).await?))
}

/// DELETE /api/shows/:id
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = super::parse_object_id(&id)?;

    let shows = state.db.collection::<Document>(collections::SHOWS);
    let existing = shows
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("show {}", id.to_hex())))?;

    shows.delete_one(doc! { "_id": id }, None).await?;

    if let Some(poster) = super::legacy_ref(&existing, &["poster_id", "poster"]) {
        files::detach_and_reap(&state, poster, &RelatedRef::new(collections::SHOWS, id)).await?;
    }

    Ok(Json(json!({ "status": "deleted" })))
}

async fn fetch_normalized(state: &AppState, id: ObjectId) -> Result<Value, ApiError> {
    let doc = state
        .db
        .collection::<Document>(collections::SHOWS)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("show {}", id.to_hex())))?;

    Ok(normalize::show(&doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show_date_bare_date() {
        let date = parse_show_date("1998-05-17").unwrap();
        let rfc = date.try_to_rfc3339_string().unwrap();
        assert!(rfc.starts_with("1998-05-17T00:00:00"));
    }

    #[test]
    fn test_parse_show_date_rfc3339() {
        let date = parse_show_date("2004-11-02T20:30:00Z").unwrap();
        let rfc = date.try_to_rfc3339_string().unwrap();
        assert!(rfc.starts_with("2004-11-02T20:30:00"));
    }

    #[test]
    fn test_parse_show_date_rejects_garbage() {
        assert!(parse_show_date("someday").is_err());
        assert!(parse_show_date("17/05/1998").is_err());
        assert!(parse_show_date("").is_err());
    }
}
