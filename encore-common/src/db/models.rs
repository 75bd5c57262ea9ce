//! Document models
//!
//! All catalog documents are flat and denormalized; relationships are plain
//! references by ObjectId. Optional fields default on deserialization so
//! legacy documents missing them still load.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Collection names
pub mod collections {
    pub const BOOKS: &str = "books";
    pub const CDS: &str = "cds";
    pub const DVDS: &str = "dvds";
    pub const TRACKS: &str = "tracks";
    pub const PHOTOS: &str = "photos";
    pub const LYRICS: &str = "lyrics";
    pub const SHOWS: &str = "shows";
    pub const TEXTS: &str = "texts";
    pub const MESSAGES: &str = "messages";
    pub const FILES: &str = "files";
    pub const ADMINS: &str = "admins";
    pub const SESSIONS: &str = "sessions";
    pub const RESET_TOKENS: &str = "reset_tokens";
}

/// A record that references a shared media file
///
/// Stored inside the file document's `related` list; a file may only be
/// removed once this list is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedRef {
    /// Collection the owning record lives in
    pub collection: String,
    /// `_id` of the owning record
    pub id: ObjectId,
}

impl RelatedRef {
    pub fn new(collection: &str, id: ObjectId) -> Self {
        Self {
            collection: collection.to_string(),
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cd {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tracks: Vec<ObjectId>,
    #[serde(default)]
    pub cover_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dvd {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub runtime_minutes: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tracks: Vec<ObjectId>,
    #[serde(default)]
    pub cover_id: Option<ObjectId>,
}

/// Track referenced by a CD or DVD
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub position: i32,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub file_id: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lyric {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    pub body: String,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub date: bson::DateTime,
    pub venue: String,
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub poster_id: Option<ObjectId>,
}

/// Free-form text page (news item, essay, biography section)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub category: String,
    pub body: String,
}

/// Fan message, soft-deleted pending manual review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub author: String,
    pub email: String,
    pub body: String,
    pub submitted_at: bson::DateTime,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<bson::DateTime>,
}

/// Media file hosted on the third-party media host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Identifier of the asset on the media host
    pub public_id: String,
    pub url: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub bytes: i64,
    pub uploaded_at: bson::DateTime,
    /// Owning records; the reference count
    #[serde(default)]
    pub related: Vec<RelatedRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub salt: String,
    pub password_digest: String,
    pub created_at: bson::DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub token: String,
    pub admin_id: ObjectId,
    pub expires_at: bson::DateTime,
}

/// Single-use password-reset token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetToken {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub token: String,
    pub admin_id: ObjectId,
    pub expires_at: bson::DateTime,
}
