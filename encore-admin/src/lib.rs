//! encore-admin library - admin REST service for the Encore fan site
//!
//! Serves the catalog collections (books, CDs, DVDs, photos, lyrics, shows,
//! texts), the fan message review queue, media file management, and admin
//! account management. The router is exported so integration tests can drive
//! it without a listening socket.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use mongodb::Database;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod media;

/// Largest accepted upload body (media host enforces its own limit too)
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database handle
    pub db: Database,
    /// Media host client
    pub media: Arc<media::MediaClient>,
    /// Session lifetime in minutes
    pub session_ttl_minutes: i64,
}

impl AppState {
    /// Create new application state
    pub fn new(db: Database, media: media::MediaClient, session_ttl_minutes: i64) -> Self {
        Self {
            db,
            media: Arc::new(media),
            session_ttl_minutes,
        }
    }
}

/// Build application router
///
/// Health, login, password reset, and fan message submission are public;
/// everything else requires a session token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post};

    // Protected routes (require a session)
    let protected = Router::new()
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/session", get(api::auth::session))
        .route("/api/books", get(api::books::list).post(api::books::create))
        .route(
            "/api/books/:id",
            get(api::books::get).put(api::books::update).delete(api::books::remove),
        )
        .route("/api/cds", get(api::cds::list).post(api::cds::create))
        .route(
            "/api/cds/:id",
            get(api::cds::get).put(api::cds::update).delete(api::cds::remove),
        )
        .route("/api/cds/:id/tracks", post(api::cds::add_track))
        .route("/api/cds/:id/tracks/:track_id", delete(api::cds::remove_track))
        .route("/api/dvds", get(api::dvds::list).post(api::dvds::create))
        .route(
            "/api/dvds/:id",
            get(api::dvds::get).put(api::dvds::update).delete(api::dvds::remove),
        )
        .route("/api/dvds/:id/tracks", post(api::dvds::add_track))
        .route("/api/dvds/:id/tracks/:track_id", delete(api::dvds::remove_track))
        .route("/api/photos", get(api::photos::list).post(api::photos::create))
        .route(
            "/api/photos/:id",
            get(api::photos::get).put(api::photos::update).delete(api::photos::remove),
        )
        .route("/api/lyrics", get(api::lyrics::list).post(api::lyrics::create))
        .route(
            "/api/lyrics/:id",
            get(api::lyrics::get).put(api::lyrics::update).delete(api::lyrics::remove),
        )
        .route("/api/shows", get(api::shows::list).post(api::shows::create))
        .route(
            "/api/shows/:id",
            get(api::shows::get).put(api::shows::update).delete(api::shows::remove),
        )
        .route("/api/texts", get(api::texts::list).post(api::texts::create))
        .route(
            "/api/texts/:id",
            get(api::texts::get).put(api::texts::update).delete(api::texts::remove),
        )
        .route("/api/messages", get(api::messages::list))
        .route("/api/messages/:id", delete(api::messages::soft_delete))
        .route("/api/messages/:id/restore", post(api::messages::restore))
        .route("/api/messages/:id/purge", delete(api::messages::purge))
        .route("/api/files", get(api::files::list).post(api::files::upload))
        .route("/api/files/:id", get(api::files::get).delete(api::files::remove))
        .route("/api/admins", get(api::admins::list).post(api::admins::create))
        .route("/api/admins/:id", delete(api::admins::remove))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::require_session,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/health", get(api::health::health))
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/reset-request", post(api::auth::reset_request))
        .route("/api/auth/reset", post(api::auth::reset))
        .route("/api/messages/submit", post(api::messages::submit));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
