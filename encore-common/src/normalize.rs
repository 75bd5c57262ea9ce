//! Legacy document normalization
//!
//! The catalog collections accumulated years of hand-edited and
//! script-imported documents, so the same field shows up in several shapes:
//! years stored as int32, int64, double, or numeric string; file references
//! stored as an ObjectId, a hex string, or an embedded `{ file_id: ... }`
//! subdocument; track lists as arrays of ObjectIds or of embedded
//! subdocuments; renamed fields (`name` vs `title`, `text` vs `body`);
//! missing optional fields.
//!
//! One normalizer per collection maps any such document onto the stable JSON
//! shape the admin UI consumes:
//!
//! - `id` fields are hex strings, never ObjectIds
//! - missing strings become `""`, missing numbers `null`, missing lists `[]`
//! - timestamps are RFC 3339 strings
//!
//! Normalizers are pure and never fail; every GET handler runs raw documents
//! through them instead of deserializing into the typed models.

use bson::{Bson, Document};
use serde_json::{json, Value};

// ========================================
// Lenient field readers
// ========================================

/// Hex form of the document's `_id`
///
/// Documents always carry an `_id` in practice; an absent or unusable one
/// yields `""` rather than an error.
pub fn id_hex(doc: &Document) -> String {
    doc.get("_id").and_then(object_ref).unwrap_or_default()
}

/// Read a reference to another document from any of its legacy shapes
///
/// Accepts an ObjectId, a 24-char hex string, or a subdocument carrying the
/// id under `file_id`, `id`, or `_id`.
pub fn object_ref(value: &Bson) -> Option<String> {
    match value {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(s) if s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit()) => {
            Some(s.clone())
        }
        Bson::Document(sub) => ["file_id", "id", "_id"]
            .iter()
            .find_map(|key| sub.get(key).and_then(object_ref)),
        _ => None,
    }
}

/// First present key as a string; numbers are rendered, anything else is the
/// default
pub fn str_or(doc: &Document, keys: &[&str], default: &str) -> String {
    for key in keys {
        match doc.get(key) {
            Some(Bson::String(s)) => return s.clone(),
            Some(Bson::Int32(n)) => return n.to_string(),
            Some(Bson::Int64(n)) => return n.to_string(),
            Some(Bson::Double(n)) => return n.to_string(),
            Some(_) | None => continue,
        }
    }
    default.to_string()
}

/// First present key as an integer
///
/// Handles int32, int64, doubles holding whole numbers, and numeric strings.
pub fn opt_int(doc: &Document, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match doc.get(key) {
            Some(Bson::Int32(n)) => return Some(i64::from(*n)),
            Some(Bson::Int64(n)) => return Some(*n),
            Some(Bson::Double(n)) => return Some(*n as i64),
            Some(Bson::String(s)) => {
                if let Ok(n) = s.trim().parse::<i64>() {
                    return Some(n);
                }
            }
            Some(_) | None => continue,
        }
    }
    None
}

/// Boolean that may be stored as a bool or a legacy 0/1 integer
pub fn bool_or(doc: &Document, key: &str, default: bool) -> bool {
    match doc.get(key) {
        Some(Bson::Boolean(b)) => *b,
        Some(Bson::Int32(n)) => *n != 0,
        Some(Bson::Int64(n)) => *n != 0,
        _ => default,
    }
}

/// First present key as an RFC 3339 timestamp
///
/// BSON datetimes are formatted; strings (legacy imports stored dates as
/// text) pass through unchanged.
pub fn opt_date(doc: &Document, keys: &[&str]) -> Option<String> {
    for key in keys {
        match doc.get(key) {
            Some(Bson::DateTime(dt)) => return dt.try_to_rfc3339_string().ok(),
            Some(Bson::String(s)) => return Some(s.clone()),
            Some(_) | None => continue,
        }
    }
    None
}

/// Reference list in any of its legacy shapes
///
/// Elements may be ObjectIds, hex strings, or subdocuments; anything
/// unresolvable is skipped.
pub fn id_list(doc: &Document, key: &str) -> Vec<String> {
    match doc.get(key) {
        Some(Bson::Array(items)) => items.iter().filter_map(object_ref).collect(),
        _ => Vec::new(),
    }
}

fn opt_ref(doc: &Document, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| doc.get(key).and_then(object_ref))
}

// ========================================
// Per-collection normalizers
// ========================================

pub fn book(doc: &Document) -> Value {
    json!({
        "id": id_hex(doc),
        "title": str_or(doc, &["title", "name"], ""),
        "slug": str_or(doc, &["slug"], ""),
        "author": str_or(doc, &["author"], ""),
        "year": opt_int(doc, &["year"]),
        "description": str_or(doc, &["description", "summary"], ""),
        "cover_id": opt_ref(doc, &["cover_id", "cover"]),
    })
}

pub fn cd(doc: &Document) -> Value {
    json!({
        "id": id_hex(doc),
        "title": str_or(doc, &["title", "name"], ""),
        "slug": str_or(doc, &["slug"], ""),
        "year": opt_int(doc, &["year"]),
        "label": str_or(doc, &["label"], ""),
        "description": str_or(doc, &["description", "summary"], ""),
        "tracks": id_list(doc, "tracks"),
        "cover_id": opt_ref(doc, &["cover_id", "cover"]),
    })
}

pub fn dvd(doc: &Document) -> Value {
    json!({
        "id": id_hex(doc),
        "title": str_or(doc, &["title", "name"], ""),
        "slug": str_or(doc, &["slug"], ""),
        "year": opt_int(doc, &["year"]),
        "runtime_minutes": opt_int(doc, &["runtime_minutes", "runtime"]),
        "description": str_or(doc, &["description", "summary"], ""),
        "tracks": id_list(doc, "tracks"),
        "cover_id": opt_ref(doc, &["cover_id", "cover"]),
    })
}

pub fn track(doc: &Document) -> Value {
    json!({
        "id": id_hex(doc),
        "title": str_or(doc, &["title", "name"], ""),
        "position": opt_int(doc, &["position", "number"]).unwrap_or(0),
        "duration_seconds": opt_int(doc, &["duration_seconds", "duration"]),
        "comment": str_or(doc, &["comment"], ""),
    })
}

pub fn photo(doc: &Document) -> Value {
    json!({
        "id": id_hex(doc),
        "title": str_or(doc, &["title", "name"], ""),
        "caption": str_or(doc, &["caption"], ""),
        "year": opt_int(doc, &["year"]),
        "file_id": opt_ref(doc, &["file_id", "file", "image"]),
    })
}

pub fn lyric(doc: &Document) -> Value {
    json!({
        "id": id_hex(doc),
        "title": str_or(doc, &["title", "song", "name"], ""),
        "slug": str_or(doc, &["slug"], ""),
        "body": str_or(doc, &["body", "text"], ""),
        "year": opt_int(doc, &["year"]),
    })
}

pub fn show(doc: &Document) -> Value {
    json!({
        "id": id_hex(doc),
        "date": opt_date(doc, &["date"]),
        "venue": str_or(doc, &["venue"], ""),
        "city": str_or(doc, &["city"], ""),
        "country": str_or(doc, &["country"], ""),
        "notes": str_or(doc, &["notes"], ""),
        "poster_id": opt_ref(doc, &["poster_id", "poster"]),
    })
}

pub fn text(doc: &Document) -> Value {
    json!({
        "id": id_hex(doc),
        "title": str_or(doc, &["title", "name"], ""),
        "slug": str_or(doc, &["slug"], ""),
        "category": str_or(doc, &["category"], ""),
        "body": str_or(doc, &["body", "text"], ""),
    })
}

pub fn message(doc: &Document) -> Value {
    json!({
        "id": id_hex(doc),
        "author": str_or(doc, &["author", "name"], ""),
        "email": str_or(doc, &["email"], ""),
        "body": str_or(doc, &["body", "message"], ""),
        "submitted_at": opt_date(doc, &["submitted_at", "created_at"]),
        "deleted": bool_or(doc, "deleted", false),
        "deleted_at": opt_date(doc, &["deleted_at"]),
    })
}

pub fn file(doc: &Document) -> Value {
    let related = related_refs(doc);
    json!({
        "id": id_hex(doc),
        "public_id": str_or(doc, &["public_id"], ""),
        "url": str_or(doc, &["url", "secure_url"], ""),
        "format": str_or(doc, &["format"], ""),
        "bytes": opt_int(doc, &["bytes", "size"]).unwrap_or(0),
        "uploaded_at": opt_date(doc, &["uploaded_at", "created_at"]),
        "reference_count": related.len(),
        "related": related,
    })
}

/// A file's owner list in any of its legacy shapes
///
/// Owners were stored as `{ collection, id }` subdocuments, or in the oldest
/// records as `"collection:hex"` strings.
fn related_refs(doc: &Document) -> Vec<Value> {
    let Some(Bson::Array(items)) = doc.get("related") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Bson::Document(sub) => {
                let id = sub.get("id").and_then(object_ref)?;
                Some(json!({
                    "collection": str_or(sub, &["collection"], ""),
                    "id": id,
                }))
            }
            Bson::String(s) => {
                let (collection, id) = s.split_once(':')?;
                if id.len() != 24 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
                    return None;
                }
                Some(json!({ "collection": collection, "id": id }))
            }
            _ => None,
        })
        .collect()
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use bson::{doc, DateTime};

    #[test]
    fn test_book_modern_document() {
        let id = ObjectId::new();
        let cover = ObjectId::new();
        let doc = doc! {
            "_id": id,
            "title": "On the Road",
            "slug": "on-the-road",
            "author": "J. K.",
            "year": 1957i32,
            "description": "A travelogue",
            "cover_id": cover,
        };

        let value = book(&doc);
        assert_eq!(value["id"], id.to_hex());
        assert_eq!(value["title"], "On the Road");
        assert_eq!(value["year"], 1957);
        assert_eq!(value["cover_id"], cover.to_hex());
    }

    #[test]
    fn test_book_legacy_field_names_and_types() {
        // Oldest imports: "name" instead of "title", year as string,
        // cover as a hex string under "cover"
        let doc = doc! {
            "_id": ObjectId::new(),
            "name": "Tour Diary",
            "slug": "tour-diary",
            "year": "2003",
            "summary": "Photos and notes",
            "cover": "507f1f77bcf86cd799439011",
        };

        let value = book(&doc);
        assert_eq!(value["title"], "Tour Diary");
        assert_eq!(value["year"], 2003);
        assert_eq!(value["description"], "Photos and notes");
        assert_eq!(value["cover_id"], "507f1f77bcf86cd799439011");
    }

    #[test]
    fn test_book_missing_optionals_default() {
        let doc = doc! { "_id": ObjectId::new(), "title": "Untitled", "slug": "untitled" };

        let value = book(&doc);
        assert_eq!(value["author"], "");
        assert_eq!(value["year"], Value::Null);
        assert_eq!(value["description"], "");
        assert_eq!(value["cover_id"], Value::Null);
    }

    #[test]
    fn test_empty_document_still_normalizes() {
        let value = book(&doc! {});
        assert_eq!(value["id"], "");
        assert_eq!(value["title"], "");
        assert_eq!(value["year"], Value::Null);
    }

    #[test]
    fn test_year_type_variants() {
        for year in [
            Bson::Int32(1999),
            Bson::Int64(1999),
            Bson::Double(1999.0),
            Bson::String("1999".to_string()),
            Bson::String(" 1999".to_string()),
        ] {
            let doc = doc! { "_id": ObjectId::new(), "year": year.clone() };
            assert_eq!(book(&doc)["year"], 1999, "variant: {:?}", year);
        }
    }

    #[test]
    fn test_unparseable_year_becomes_null() {
        let doc = doc! { "_id": ObjectId::new(), "year": "unknown" };
        assert_eq!(book(&doc)["year"], Value::Null);
    }

    #[test]
    fn test_cd_track_list_of_object_ids() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let doc = doc! {
            "_id": ObjectId::new(),
            "title": "Live 2001",
            "slug": "live-2001",
            "tracks": [a, b],
        };

        let value = cd(&doc);
        assert_eq!(value["tracks"], json!([a.to_hex(), b.to_hex()]));
    }

    #[test]
    fn test_cd_track_list_of_embedded_subdocuments() {
        let a = ObjectId::new();
        let doc = doc! {
            "_id": ObjectId::new(),
            "name": "Demos",
            "tracks": [
                { "_id": a, "title": "Intro" },
                { "title": "No id, skipped" },
            ],
        };

        let value = cd(&doc);
        assert_eq!(value["tracks"], json!([a.to_hex()]));
    }

    #[test]
    fn test_cd_missing_track_list() {
        let doc = doc! { "_id": ObjectId::new(), "title": "Single" };
        assert_eq!(cd(&doc)["tracks"], json!([]));
    }

    #[test]
    fn test_track_position_and_duration_variants() {
        let doc = doc! {
            "_id": ObjectId::new(),
            "title": "Opener",
            "number": 1i64,
            "duration": 245.0,
        };

        let value = track(&doc);
        assert_eq!(value["position"], 1);
        assert_eq!(value["duration_seconds"], 245);
    }

    #[test]
    fn test_photo_file_reference_variants() {
        let file_id = ObjectId::new();

        // Embedded subdocument shape from the first site version
        let legacy = doc! {
            "_id": ObjectId::new(),
            "title": "Backstage",
            "image": { "file_id": file_id },
        };
        assert_eq!(photo(&legacy)["file_id"], file_id.to_hex());

        // Plain ObjectId shape
        let modern = doc! { "_id": ObjectId::new(), "title": "Stage", "file_id": file_id };
        assert_eq!(photo(&modern)["file_id"], file_id.to_hex());
    }

    #[test]
    fn test_lyric_body_under_text_key() {
        let doc = doc! {
            "_id": ObjectId::new(),
            "song": "Falling",
            "text": "First verse...",
        };

        let value = lyric(&doc);
        assert_eq!(value["title"], "Falling");
        assert_eq!(value["body"], "First verse...");
    }

    #[test]
    fn test_show_date_as_bson_datetime() {
        let doc = doc! {
            "_id": ObjectId::new(),
            "date": DateTime::from_millis(1_000_000_000_000),
            "venue": "Paradiso",
            "city": "Amsterdam",
        };

        let value = show(&doc);
        let date = value["date"].as_str().unwrap();
        assert!(date.starts_with("2001-09-09"), "got {}", date);
    }

    #[test]
    fn test_show_date_as_legacy_string() {
        let doc = doc! { "_id": ObjectId::new(), "date": "1998-05-17", "venue": "Roxy" };
        assert_eq!(show(&doc)["date"], "1998-05-17");
    }

    #[test]
    fn test_message_legacy_keys_and_integer_deleted_flag() {
        let doc = doc! {
            "_id": ObjectId::new(),
            "name": "A fan",
            "email": "fan@example.com",
            "message": "Great show!",
            "created_at": DateTime::from_millis(1_500_000_000_000),
            "deleted": 1i32,
        };

        let value = message(&doc);
        assert_eq!(value["author"], "A fan");
        assert_eq!(value["body"], "Great show!");
        assert_eq!(value["deleted"], true);
        assert!(value["submitted_at"].as_str().unwrap().starts_with("2017"));
    }

    #[test]
    fn test_message_defaults() {
        let value = message(&doc! { "_id": ObjectId::new() });
        assert_eq!(value["deleted"], false);
        assert_eq!(value["deleted_at"], Value::Null);
    }

    #[test]
    fn test_file_related_subdocuments() {
        let book_id = ObjectId::new();
        let doc = doc! {
            "_id": ObjectId::new(),
            "public_id": "covers/abc123",
            "url": "https://media.example.com/covers/abc123.jpg",
            "format": "jpg",
            "bytes": 52_000i64,
            "related": [ { "collection": "books", "id": book_id } ],
        };

        let value = file(&doc);
        assert_eq!(value["reference_count"], 1);
        assert_eq!(value["related"][0]["collection"], "books");
        assert_eq!(value["related"][0]["id"], book_id.to_hex());
    }

    #[test]
    fn test_file_related_legacy_strings() {
        let doc = doc! {
            "_id": ObjectId::new(),
            "public_id": "photos/x",
            "related": [
                "photos:507f1f77bcf86cd799439011",
                "garbage-entry",
            ],
        };

        let value = file(&doc);
        assert_eq!(value["reference_count"], 1);
        assert_eq!(value["related"][0]["collection"], "photos");
        assert_eq!(value["related"][0]["id"], "507f1f77bcf86cd799439011");
    }

    #[test]
    fn test_file_size_under_legacy_key() {
        let doc = doc! { "_id": ObjectId::new(), "size": 1024i32 };
        assert_eq!(file(&doc)["bytes"], 1024);
    }

    #[test]
    fn test_object_ref_rejects_non_hex_strings() {
        assert_eq!(object_ref(&Bson::String("not-an-id".to_string())), None);
        // Correct length but not hex
        assert_eq!(
            object_ref(&Bson::String("zzzzzzzzzzzzzzzzzzzzzzzz".to_string())),
            None
        );
    }
}
