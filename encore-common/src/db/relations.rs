//! Related-file reference bookkeeping
//!
//! A media file's document carries the list of records that reference it.
//! Attaching and detaching owners goes through these helpers so a file is
//! only ever reported orphaned when the last reference is gone; a file with
//! active references must not be hard-deleted.
//!
//! The list manipulation itself is pure; the `*_file` functions apply it to
//! the `files` collection.

use crate::db::models::{collections, RelatedRef, StoredFile};
use crate::{Error, Result};
use bson::{doc, oid::ObjectId};
use mongodb::Database;

/// Result of removing an owner from a file's reference list
#[derive(Debug, PartialEq, Eq)]
pub enum Detach {
    /// Owner removed; `orphaned` is true when no references remain
    Removed { orphaned: bool },
    /// Owner was not in the list
    NotReferenced,
}

/// Add an owner to a reference list
///
/// Idempotent: attaching an owner that is already present changes nothing.
/// Returns true when the list was modified.
pub fn attach(related: &mut Vec<RelatedRef>, owner: RelatedRef) -> bool {
    if related.contains(&owner) {
        return false;
    }
    related.push(owner);
    true
}

/// Remove an owner from a reference list
pub fn detach(related: &mut Vec<RelatedRef>, owner: &RelatedRef) -> Detach {
    let before = related.len();
    related.retain(|r| r != owner);

    if related.len() == before {
        Detach::NotReferenced
    } else {
        Detach::Removed {
            orphaned: related.is_empty(),
        }
    }
}

/// Record that `owner` references the file
///
/// Fails with [`Error::NotFound`] when the file document does not exist.
pub async fn attach_file(db: &Database, file_id: ObjectId, owner: RelatedRef) -> Result<()> {
    let files = db.collection::<StoredFile>(collections::FILES);

    let mut file = files
        .find_one(doc! { "_id": file_id }, None)
        .await?
        .ok_or_else(|| Error::NotFound(format!("file {}", file_id.to_hex())))?;

    if attach(&mut file.related, owner) {
        files
            .update_one(
                doc! { "_id": file_id },
                doc! { "$set": { "related": to_bson(&file.related)? } },
                None,
            )
            .await?;
    }

    Ok(())
}

/// Remove `owner` from the file's reference list
///
/// Returns true when the file is now orphaned and may be reaped. A missing
/// file document is treated as already detached.
pub async fn detach_file(db: &Database, file_id: ObjectId, owner: &RelatedRef) -> Result<bool> {
    let files = db.collection::<StoredFile>(collections::FILES);

    let Some(mut file) = files.find_one(doc! { "_id": file_id }, None).await? else {
        return Ok(false);
    };

    match detach(&mut file.related, owner) {
        Detach::NotReferenced => Ok(false),
        Detach::Removed { orphaned } => {
            files
                .update_one(
                    doc! { "_id": file_id },
                    doc! { "$set": { "related": to_bson(&file.related)? } },
                    None,
                )
                .await?;
            Ok(orphaned)
        }
    }
}

/// True when any record still references the file
pub async fn is_referenced(db: &Database, file_id: ObjectId) -> Result<bool> {
    let files = db.collection::<StoredFile>(collections::FILES);

    let file = files
        .find_one(doc! { "_id": file_id }, None)
        .await?
        .ok_or_else(|| Error::NotFound(format!("file {}", file_id.to_hex())))?;

    Ok(!file.related.is_empty())
}

fn to_bson(related: &[RelatedRef]) -> Result<bson::Bson> {
    bson::to_bson(related).map_err(|e| Error::Internal(format!("BSON encode: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(collection: &str) -> RelatedRef {
        RelatedRef::new(collection, ObjectId::new())
    }

    #[test]
    fn test_attach_adds_owner() {
        let mut related = Vec::new();
        assert!(attach(&mut related, owner("books")));
        assert_eq!(related.len(), 1);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut related = Vec::new();
        let book = owner("books");

        assert!(attach(&mut related, book.clone()));
        assert!(!attach(&mut related, book));
        assert_eq!(related.len(), 1);
    }

    #[test]
    fn test_same_id_different_collection_is_distinct() {
        let id = ObjectId::new();
        let mut related = Vec::new();

        assert!(attach(&mut related, RelatedRef::new("cds", id)));
        assert!(attach(&mut related, RelatedRef::new("dvds", id)));
        assert_eq!(related.len(), 2);
    }

    #[test]
    fn test_detach_last_owner_reports_orphaned() {
        let book = owner("books");
        let mut related = vec![book.clone()];

        assert_eq!(
            detach(&mut related, &book),
            Detach::Removed { orphaned: true }
        );
        assert!(related.is_empty());
    }

    #[test]
    fn test_detach_with_remaining_owners_not_orphaned() {
        let book = owner("books");
        let cd = owner("cds");
        let mut related = vec![book.clone(), cd];

        assert_eq!(
            detach(&mut related, &book),
            Detach::Removed { orphaned: false }
        );
        assert_eq!(related.len(), 1);
    }

    #[test]
    fn test_detach_unknown_owner() {
        let mut related = vec![owner("books")];

        assert_eq!(detach(&mut related, &owner("photos")), Detach::NotReferenced);
        assert_eq!(related.len(), 1);
    }
}
