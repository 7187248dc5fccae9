//! The internal HTTP surface consumed by the dashboard UI.
//!
//! Thin route handlers over the library components: the redirect-based
//! auth flow, logout, single-scrobble deletion, batch and manual
//! scrobble submission, and the full bulk-edit pipeline. Each handler
//! builds a [`SessionContext`] from the inbound cookies once and passes
//! it along explicitly.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::LastFmApiClient;
use crate::config::AppConfig;
use crate::deleter::ScrobbleDeleter;
use crate::orchestrator::{BulkEditOrchestrator, EditPhase};
use crate::session::{self, SessionContext};
use crate::types::{CorrectedScrobble, EditCriteria, ScrobbleRecord};
use crate::ScrobbleMendError;

/// Shared state for the route handlers.
#[derive(Clone)]
pub struct AppState {
    pub api: LastFmApiClient,
    pub deleter: Arc<ScrobbleDeleter>,
    pub orchestrator: Arc<BulkEditOrchestrator>,
    pub config: Arc<AppConfig>,
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/lastfm", get(auth_login))
        .route("/api/auth/lastfm/callback", get(auth_callback))
        .route("/api/auth/logout", post(logout))
        .route("/api/delete-scrobble", post(delete_scrobble))
        .route("/api/batch-scrobble", post(batch_scrobble))
        .route("/api/manual-scrobble", post(manual_scrobble))
        .route("/api/edit-scrobbles", post(edit_scrobbles))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the router until the process exits.
pub async fn serve(state: AppState, bind: &str) -> crate::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn session_from_headers(headers: &HeaderMap) -> SessionContext {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());
    SessionContext::from_cookie_header(cookie_header)
}

fn status_for(error: &ScrobbleMendError) -> StatusCode {
    match error {
        ScrobbleMendError::Validation(_) => StatusCode::BAD_REQUEST,
        ScrobbleMendError::Auth(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_redirect(state: &AppState, message: &str) -> String {
    format!(
        "{}/error?message={}",
        state.config.server.public_url,
        urlencoding::encode(message)
    )
}

/// `GET /api/auth/lastfm` — send the user to the upstream auth page.
async fn auth_login(State(state): State<AppState>) -> Redirect {
    let callback = format!("{}/api/auth/lastfm/callback", state.config.server.public_url);
    let auth_url = format!(
        "{}/api/auth/?api_key={}&cb={}",
        state.config.lastfm.www_url,
        state.config.lastfm.api_key,
        urlencoding::encode(&callback)
    );
    Redirect::temporary(&auth_url)
}

#[derive(Deserialize)]
struct CallbackParams {
    token: Option<String>,
}

/// `GET /api/auth/lastfm/callback?token=` — finish the auth flow.
///
/// Exchanges the one-time token for session credentials, persists them
/// in the 30-day session cookie, and lands the user on their tools page.
async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(token) = params.token else {
        return Redirect::temporary(&error_redirect(&state, "Failed to get Last.fm token"))
            .into_response();
    };

    match state.api.get_session(&token).await {
        Ok(credentials) => match session::session_cookie(&credentials) {
            Ok(cookie) => {
                let target = format!(
                    "{}/{}/tools",
                    state.config.server.public_url, credentials.username
                );
                (
                    AppendHeaders([(header::SET_COOKIE, cookie)]),
                    Redirect::temporary(&target),
                )
                    .into_response()
            }
            Err(e) => {
                log::error!("failed to build session cookie: {e}");
                Redirect::temporary(&error_redirect(&state, "Error during authentication"))
                    .into_response()
            }
        },
        Err(e) => {
            log::error!("auth.getSession exchange failed: {e}");
            Redirect::temporary(&error_redirect(&state, "Error during authentication"))
                .into_response()
        }
    }
}

/// `POST /api/auth/logout` — clear the session cookie.
async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, session::clear_session_cookie())]),
        Json(json!({ "success": true })),
    )
}

#[derive(Deserialize)]
struct DeleteScrobbleRequest {
    scrobble: Option<ScrobbleRecord>,
    username: Option<String>,
    #[serde(default)]
    cookies: String,
}

/// `POST /api/delete-scrobble` — delete one scrobble via the web endpoint.
async fn delete_scrobble(
    State(state): State<AppState>,
    Json(body): Json<DeleteScrobbleRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (Some(scrobble), Some(username)) = (body.scrobble, body.username) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing parameters" })),
        );
    };

    match state
        .deleter
        .delete_one(&scrobble, &username, &body.cookies)
        .await
    {
        Ok(response) => (
            StatusCode::OK,
            Json(json!({ "success": true, "response": response })),
        ),
        Err(e) => {
            log::error!("delete-scrobble failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

#[derive(Deserialize)]
struct IncomingScrobble {
    #[serde(default)]
    artist: String,
    #[serde(default)]
    track: String,
    timestamp: Option<u64>,
    album: Option<String>,
}

#[derive(Deserialize)]
struct BatchScrobbleRequest {
    #[serde(default)]
    tracks: Vec<IncomingScrobble>,
}

/// `POST /api/batch-scrobble` — submit a batch of scrobbles.
async fn batch_scrobble(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BatchScrobbleRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let context = session_from_headers(&headers);
    let Some(credentials) = context.credentials() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        );
    };

    if body.tracks.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "tracks must be a non-empty array" })),
        );
    }

    let now = chrono::Utc::now().timestamp() as u64;
    let mut submissions = Vec::with_capacity(body.tracks.len());
    for track in &body.tracks {
        if track.artist.is_empty() || track.track.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "every entry needs an artist and a track" })),
            );
        }
        submissions.push(CorrectedScrobble {
            artist: track.artist.clone(),
            track: track.track.clone(),
            timestamp: track.timestamp.unwrap_or(now),
            album: track.album.clone(),
        });
    }

    match state
        .api
        .scrobble_batch(&credentials.session_key, &submissions)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)),
        Err(e) => {
            log::error!("batch-scrobble failed: {e}");
            (status_for(&e), Json(json!({ "error": e.to_string() })))
        }
    }
}

#[derive(Deserialize)]
struct ManualScrobbleRequest {
    #[serde(default)]
    artist: String,
    #[serde(default)]
    track: String,
    timestamp: Option<u64>,
}

/// `POST /api/manual-scrobble` — submit a single scrobble.
async fn manual_scrobble(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ManualScrobbleRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let context = session_from_headers(&headers);
    let Some(credentials) = context.credentials() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        );
    };

    if body.artist.is_empty() || body.track.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Artist and track are required" })),
        );
    }

    let timestamp = body
        .timestamp
        .unwrap_or_else(|| chrono::Utc::now().timestamp() as u64);

    match state
        .api
        .scrobble_single(&credentials.session_key, &body.artist, &body.track, timestamp)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)),
        Err(e) => {
            log::error!("manual-scrobble failed: {e}");
            (status_for(&e), Json(json!({ "error": e.to_string() })))
        }
    }
}

#[derive(Deserialize)]
struct EditScrobblesRequest {
    #[serde(flatten)]
    criteria: EditCriteria,
    #[serde(default)]
    cookies: String,
}

/// `POST /api/edit-scrobbles` — run the full bulk-edit pipeline.
///
/// Failures echo the submitted criteria back so the UI can repopulate
/// the form for a retry without re-typing.
async fn edit_scrobbles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<EditScrobblesRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let context = session_from_headers(&headers);
    let Some(credentials) = context.credentials() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        );
    };

    match state
        .orchestrator
        .run(credentials, &body.criteria, &body.cookies)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "phase": EditPhase::Succeeded,
                "matched": outcome.matched,
                "deleted": outcome.deleted,
                "created": outcome.created,
            })),
        ),
        Err(e) => {
            log::error!("edit-scrobbles failed: {e}");
            (
                status_for(&e),
                Json(json!({
                    "phase": EditPhase::Failed,
                    "failedDuring": EditPhase::of_failure(&e),
                    "error": e.to_string(),
                    "criteria": body.criteria,
                })),
            )
        }
    }
}
