//! Database connection and index setup

use crate::db::models::collections;
use crate::Result;
use bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};
use std::time::Duration;
use tracing::info;

/// Connect to MongoDB and verify the server answers
pub async fn connect(uri: &str, database: &str) -> Result<Database> {
    let mut options = ClientOptions::parse(uri).await?;
    options.app_name = Some("encore".to_string());
    options.server_selection_timeout = Some(Duration::from_secs(5));

    let client = Client::with_options(options)?;
    let db = client.database(database);

    // The driver connects lazily; ping so a bad URI fails at startup
    db.run_command(doc! { "ping": 1 }, None).await?;
    info!("Connected to MongoDB database '{}'", database);

    Ok(db)
}

/// Create the indexes the data model relies on
///
/// Idempotent: MongoDB treats creating an existing index as a no-op.
/// Slug and email uniqueness are enforced here rather than by lookups.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    for coll in [
        collections::BOOKS,
        collections::CDS,
        collections::DVDS,
        collections::LYRICS,
        collections::TEXTS,
    ] {
        unique_index(db, coll, "slug").await?;
    }

    unique_index(db, collections::ADMINS, "email").await?;
    unique_index(db, collections::SESSIONS, "token").await?;
    unique_index(db, collections::RESET_TOKENS, "token").await?;

    // Sessions and reset tokens expire server-side at their stored timestamp
    expiry_index(db, collections::SESSIONS).await?;
    expiry_index(db, collections::RESET_TOKENS).await?;

    info!("Database indexes ensured");
    Ok(())
}

async fn unique_index(db: &Database, collection: &str, field: &str) -> Result<()> {
    let model = IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();

    db.collection::<bson::Document>(collection)
        .create_index(model, None)
        .await?;
    Ok(())
}

async fn expiry_index(db: &Database, collection: &str) -> Result<()> {
    let model = IndexModel::builder()
        .keys(doc! { "expires_at": 1 })
        .options(
            IndexOptions::builder()
                .expire_after(Duration::from_secs(0))
                .build(),
        )
        .build();

    db.collection::<bson::Document>(collection)
        .create_index(model, None)
        .await?;
    Ok(())
}

/// True when the underlying error is a unique-index violation
///
/// Used to turn an insert/update failure into a "slug or email taken"
/// response instead of a server error.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::Command(command_error) => command_error.code == 11000,
        _ => false,
    }
}
