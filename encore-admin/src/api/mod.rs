//! HTTP request handlers
//!
//! One module per resource; shared request validation helpers live here.

pub mod admins;
pub mod auth;
pub mod books;
pub mod cds;
pub mod dvds;
pub mod files;
pub mod health;
pub mod lyrics;
pub mod messages;
pub mod photos;
pub mod shows;
pub mod texts;

use crate::error::ApiError;
use bson::oid::ObjectId;
use bson::Document;
use encore_common::normalize;

/// Parse a path or body id, mapping failure to a 400
pub(crate) fn parse_object_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid id: {}", raw)))
}

/// File reference from an existing document, in any legacy shape
///
/// Write paths load existing records as raw documents so heterogeneous
/// legacy entries can still be updated and deleted; this resolves their
/// file reference the same way the normalizers do.
pub(crate) fn legacy_ref(doc: &Document, keys: &[&str]) -> Option<ObjectId> {
    keys.iter()
        .find_map(|key| doc.get(key).and_then(normalize::object_ref))
        .and_then(|hex| ObjectId::parse_str(hex).ok())
}

/// Track reference list from an existing document, in any legacy shape
pub(crate) fn legacy_id_list(doc: &Document, key: &str) -> Vec<ObjectId> {
    normalize::id_list(doc, key)
        .iter()
        .filter_map(|hex| ObjectId::parse_str(hex).ok())
        .collect()
}

/// Reject empty or whitespace-only required fields
pub(crate) fn require_nonempty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("Field '{}' is required", field)));
    }
    Ok(())
}

/// Slugs are lowercase alphanumerics and hyphens, at most 100 chars
pub(crate) fn validate_slug(slug: &str) -> Result<(), ApiError> {
    let valid = !slug.is_empty()
        && slug.len() <= 100
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');

    if !valid {
        return Err(ApiError::BadRequest(format!("Invalid slug: {}", slug)));
    }
    Ok(())
}

/// Shallow email shape check; deliverability is not this service's problem
pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email.len() <= 254
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            None => false,
        };

    if !valid {
        return Err(ApiError::BadRequest(format!("Invalid email address: {}", email)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_id() {
        assert!(parse_object_id("507f1f77bcf86cd799439011").is_ok());
        assert!(parse_object_id("not-an-id").is_err());
        assert!(parse_object_id("").is_err());
    }

    #[test]
    fn test_require_nonempty() {
        assert!(require_nonempty("title", "On the Road").is_ok());
        assert!(require_nonempty("title", "").is_err());
        assert!(require_nonempty("title", "   ").is_err());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("live-2001").is_ok());
        assert!(validate_slug("a").is_ok());

        assert!(validate_slug("").is_err());
        assert!(validate_slug("Has-Caps").is_err());
        assert!(validate_slug("spaced out").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("trailing-").is_err());
        assert!(validate_slug(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_legacy_ref_shapes() {
        let id = ObjectId::new();

        let modern = bson::doc! { "cover_id": id };
        assert_eq!(legacy_ref(&modern, &["cover_id", "cover"]), Some(id));

        let hex_string = bson::doc! { "cover": id.to_hex() };
        assert_eq!(legacy_ref(&hex_string, &["cover_id", "cover"]), Some(id));

        let absent = bson::doc! { "title": "no cover" };
        assert_eq!(legacy_ref(&absent, &["cover_id", "cover"]), None);
    }

    #[test]
    fn test_legacy_id_list_skips_garbage() {
        let a = ObjectId::new();
        let doc = bson::doc! { "tracks": [a, "not-an-id"] };
        assert_eq!(legacy_id_list(&doc, "tracks"), vec![a]);
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("fan@example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("fan@nodot").is_err());
        assert!(validate_email("fan@.com").is_err());
    }
}
