//! Integration tests for the encore-admin API
//!
//! Tests cover:
//! - Health endpoint (no auth required)
//! - Authentication middleware on protected routes
//! - Public fan message submission validation
//! - Full CRUD contracts against a live database
//!
//! Router-only tests run everywhere: the MongoDB driver connects lazily, so
//! paths that never reach the database need no server. The CRUD contract
//! tests require a reachable MongoDB and are skipped unless
//! `ENCORE_TEST_MONGODB_URI` is set.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use encore_admin::{build_router, media::MediaClient, AppState};
use encore_common::config::MediaConfig;
use mongodb::Database;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over a lazily-connected database that is never reached
async fn setup_offline_app() -> axum::Router {
    let client = mongodb::Client::with_uri_str("mongodb://127.0.0.1:1")
        .await
        .expect("Should parse URI");
    let media = MediaClient::new(MediaConfig::default()).expect("Should build media client");

    build_router(AppState::new(client.database("encore_offline"), media, 60))
}

/// Test helper: database from ENCORE_TEST_MONGODB_URI, or None to skip
async fn setup_test_db(test_name: &str) -> Option<Database> {
    let uri = match std::env::var("ENCORE_TEST_MONGODB_URI") {
        Ok(uri) => uri,
        Err(_) => {
            eprintln!("skipping {}: ENCORE_TEST_MONGODB_URI not set", test_name);
            return None;
        }
    };

    let client = mongodb::Client::with_uri_str(&uri)
        .await
        .expect("Should connect to test database");
    let db = client.database(&format!("encore_test_{}", test_name));

    // Start from a clean slate; ensure_indexes recreates the constraints
    db.drop(None).await.expect("Should drop test database");
    encore_common::db::ensure_indexes(&db)
        .await
        .expect("Should create indexes");

    Some(db)
}

fn setup_app(db: Database) -> axum::Router {
    let media = MediaClient::new(MediaConfig::default()).expect("Should build media client");
    build_router(AppState::new(db, media, 60))
}

/// Test helper: request without a body
fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: JSON request, optionally with a session token
fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Test helper: extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: seed an admin account and log in through the API
async fn login(db: &Database, app: &axum::Router) -> String {
    use encore_common::auth as credentials;
    use encore_common::db::models::{collections, Admin};

    let salt = credentials::generate_salt();
    let admin = Admin {
        id: None,
        email: "admin@example.com".to_string(),
        password_digest: credentials::hash_password("test-password", &salt),
        salt,
        created_at: bson::DateTime::now(),
    };
    db.collection::<Admin>(collections::ADMINS)
        .insert_one(&admin, None)
        .await
        .expect("Should insert admin");

    let request = json_request(
        "POST",
        "/api/auth/login",
        &json!({ "email": "admin@example.com", "password": "test-password" }),
        None,
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    body["token"].as_str().expect("Should issue token").to_string()
}

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = setup_offline_app().await;

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "encore-admin");
    assert!(body["version"].is_string());
}

// =============================================================================
// Authentication Middleware Tests
// =============================================================================

#[tokio::test]
async fn test_protected_route_without_token_rejected() {
    let app = setup_offline_app().await;

    let response = app.oneshot(get_request("/api/books")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("session token"));
}

#[tokio::test]
async fn test_protected_route_with_wrong_scheme_rejected() {
    let app = setup_offline_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/files")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_all_catalog_collections_are_protected() {
    let app = setup_offline_app().await;

    for uri in [
        "/api/books",
        "/api/cds",
        "/api/dvds",
        "/api/photos",
        "/api/lyrics",
        "/api/shows",
        "/api/texts",
        "/api/messages",
        "/api/files",
        "/api/admins",
    ] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri: {}", uri);
    }
}

// =============================================================================
// Public Message Submission Tests
// =============================================================================

#[tokio::test]
async fn test_submit_message_invalid_email_rejected() {
    let app = setup_offline_app().await;

    let request = json_request(
        "POST",
        "/api/messages/submit",
        &json!({ "author": "A fan", "email": "not-an-email", "body": "Hi!" }),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("Invalid email"));
}

#[tokio::test]
async fn test_submit_message_empty_author_rejected() {
    let app = setup_offline_app().await;

    let request = json_request(
        "POST",
        "/api/messages/submit",
        &json!({ "author": "  ", "email": "fan@example.com", "body": "Hi!" }),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_message_missing_fields_rejected() {
    let app = setup_offline_app().await;

    let request = json_request("POST", "/api/messages/submit", &json!({}), None);
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}

// =============================================================================
// CRUD Contract Tests (require a live database)
// =============================================================================

#[tokio::test]
async fn test_book_crud_roundtrip() {
    let Some(db) = setup_test_db("book_crud").await else {
        return;
    };
    let app = setup_app(db.clone());
    let token = login(&db, &app).await;

    // Create
    let request = json_request(
        "POST",
        "/api/books",
        &json!({
            "title": "Tour Diary",
            "slug": "tour-diary",
            "author": "The band",
            "year": 2003,
            "description": "Photos and notes from the road",
        }),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = extract_json(response.into_body()).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["title"], "Tour Diary");
    assert_eq!(created["year"], 2003);

    // Read returns the same fields
    let request = json_request("GET", &format!("/api/books/{}", id), &json!({}), Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = extract_json(response.into_body()).await;
    assert_eq!(fetched, created);

    // Update, then re-read reflects the change
    let request = json_request(
        "PUT",
        &format!("/api/books/{}", id),
        &json!({ "title": "Tour Diary (revised)", "slug": "tour-diary", "year": 2004 }),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = json_request("GET", &format!("/api/books/{}", id), &json!({}), Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    let updated = extract_json(response.into_body()).await;
    assert_eq!(updated["title"], "Tour Diary (revised)");
    assert_eq!(updated["year"], 2004);
    // Cleared optional falls back to its default
    assert_eq!(updated["author"], "");

    // Delete, then read 404s
    let request = json_request(
        "DELETE",
        &format!("/api/books/{}", id),
        &json!({}),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = json_request("GET", &format!("/api/books/{}", id), &json!({}), Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    db.drop(None).await.unwrap();
}

#[tokio::test]
async fn test_duplicate_slug_conflicts() {
    let Some(db) = setup_test_db("duplicate_slug").await else {
        return;
    };
    let app = setup_app(db.clone());
    let token = login(&db, &app).await;

    let payload = json!({ "title": "Live 2001", "slug": "live-2001", "body": "..." });

    let request = json_request("POST", "/api/lyrics", &payload, Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = json_request("POST", "/api/lyrics", &payload, Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    db.drop(None).await.unwrap();
}

#[tokio::test]
async fn test_message_review_flow() {
    let Some(db) = setup_test_db("message_review").await else {
        return;
    };
    let app = setup_app(db.clone());

    // Fan submits through the public endpoint
    let request = json_request(
        "POST",
        "/api/messages/submit",
        &json!({ "author": "A fan", "email": "fan@example.com", "body": "Great show!" }),
        None,
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let token = login(&db, &app).await;

    // Visible in the review listing
    let request = json_request("GET", "/api/messages", &json!({}), Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    let id = messages[0]["id"].as_str().unwrap().to_string();

    // Purge before soft delete is refused
    let request = json_request(
        "DELETE",
        &format!("/api/messages/{}/purge", id),
        &json!({}),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Soft delete hides it from the default listing
    let request = json_request(
        "DELETE",
        &format!("/api/messages/{}", id),
        &json!({}),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = json_request("GET", "/api/messages", &json!({}), Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);

    // Still there with include_deleted
    let request = json_request(
        "GET",
        "/api/messages?include_deleted=true",
        &json!({}),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["deleted"], true);

    // Purge is allowed now
    let request = json_request(
        "DELETE",
        &format!("/api/messages/{}/purge", id),
        &json!({}),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    db.drop(None).await.unwrap();
}

#[tokio::test]
async fn test_cd_track_management() {
    let Some(db) = setup_test_db("cd_tracks").await else {
        return;
    };
    let app = setup_app(db.clone());
    let token = login(&db, &app).await;

    let request = json_request(
        "POST",
        "/api/cds",
        &json!({ "title": "Live 2001", "slug": "live-2001", "year": 2001 }),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let cd = extract_json(response.into_body()).await;
    let cd_id = cd["id"].as_str().unwrap().to_string();

    // Add two tracks; position defaults to the end of the list
    let request = json_request(
        "POST",
        &format!("/api/cds/{}/tracks", cd_id),
        &json!({ "title": "Intro" }),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = extract_json(response.into_body()).await;
    assert_eq!(first["position"], 1);

    let request = json_request(
        "POST",
        &format!("/api/cds/{}/tracks", cd_id),
        &json!({ "title": "Opener", "duration_seconds": 245 }),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    let second = extract_json(response.into_body()).await;
    assert_eq!(second["position"], 2);
    let second_id = second["id"].as_str().unwrap().to_string();

    // Detail view embeds tracks in order
    let request = json_request("GET", &format!("/api/cds/{}", cd_id), &json!({}), Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    let detail = extract_json(response.into_body()).await;
    let tracks = detail["tracks"].as_array().unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0]["title"], "Intro");
    assert_eq!(tracks[1]["title"], "Opener");

    // Remove a track
    let request = json_request(
        "DELETE",
        &format!("/api/cds/{}/tracks/{}", cd_id, second_id),
        &json!({}),
        Some(&token),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = json_request("GET", &format!("/api/cds/{}", cd_id), &json!({}), Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    let detail = extract_json(response.into_body()).await;
    assert_eq!(detail["tracks"].as_array().unwrap().len(), 1);

    db.drop(None).await.unwrap();
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let Some(db) = setup_test_db("logout").await else {
        return;
    };
    let app = setup_app(db.clone());
    let token = login(&db, &app).await;

    let request = json_request("POST", "/api/auth/logout", &json!({}), Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = json_request("GET", "/api/books", &json!({}), Some(&token));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    db.drop(None).await.unwrap();
}
