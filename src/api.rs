//! Client for the upstream web-service API.
//!
//! All traffic to `ws.audioscrobbler.com` goes through here: the signed
//! session exchange and scrobble submissions, plus the unsigned
//! recent-tracks, user-info, and ranked top-list reads. The unofficial
//! website delete endpoint is deliberately *not* here — see
//! [`crate::deleter`].

use http_client::{HttpClient, Request};
use http_types::{Method, Url};
use serde::Deserialize;
use std::sync::Arc;

use crate::signature::api_signature;
use crate::types::{CorrectedScrobble, RankedItem, RankedKind, ScrobbleRecord, UserInfo};
use crate::{Result, ScrobbleMendError, SessionCredentials};

/// One page of a user's scrobble history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrobblePage {
    /// Records on this page, in upstream order (newest first)
    pub records: Vec<ScrobbleRecord>,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Total number of pages reported by the response envelope
    pub total_pages: u32,
}

/// Client for the upstream web-service API.
///
/// Cheap to clone; the underlying HTTP client is shared.
///
/// # Examples
///
/// ```rust,no_run
/// use scrobble_mend::LastFmApiClient;
///
/// let http_client = http_client::native::NativeClient::new();
/// let api = LastFmApiClient::new(Box::new(http_client), "api_key", "api_secret");
/// ```
#[derive(Clone)]
pub struct LastFmApiClient {
    http: Arc<dyn HttpClient + Send + Sync>,
    api_key: String,
    api_secret: String,
    api_url: String,
}

impl LastFmApiClient {
    /// Create a client against the default upstream web-service root.
    pub fn new(
        http: Box<dyn HttpClient + Send + Sync>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self::with_api_url(
            http,
            api_key,
            api_secret,
            "https://ws.audioscrobbler.com/2.0/",
        )
    }

    /// Create a client against a custom web-service root (testing).
    pub fn with_api_url(
        http: Box<dyn HttpClient + Send + Sync>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            http: Arc::from(http),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_url: api_url.into(),
        }
    }

    /// The HTTP client shared with other components.
    pub fn http(&self) -> Arc<dyn HttpClient + Send + Sync> {
        self.http.clone()
    }

    /// Exchange an auth-flow token for session credentials.
    ///
    /// This is the signed `auth.getSession` call performed once at the end
    /// of the redirect-based login flow.
    pub async fn get_session(&self, token: &str) -> Result<SessionCredentials> {
        let params = self.signed_params(vec![
            ("method".to_string(), "auth.getSession".to_string()),
            ("token".to_string(), token.to_string()),
        ]);
        let body = self.send_get(&params).await?;
        if let Some(message) = api_error_message(&body) {
            return Err(ScrobbleMendError::Auth(message));
        }

        let envelope: SessionResponse =
            serde_json::from_str(&body).map_err(|e| ScrobbleMendError::Parse(e.to_string()))?;
        log::debug!("established session for {}", envelope.session.name);
        Ok(SessionCredentials::new(
            envelope.session.name,
            envelope.session.key,
        ))
    }

    /// Submit a batch of corrected scrobbles in one signed request.
    ///
    /// Each entry becomes an indexed parameter group (`artist[i]`,
    /// `track[i]`, `timestamp[i]`, optional `album[i]`); the signature
    /// covers the full indexed set.
    pub async fn scrobble_batch(
        &self,
        session_key: &str,
        tracks: &[CorrectedScrobble],
    ) -> Result<serde_json::Value> {
        let mut params = vec![
            ("method".to_string(), "track.scrobble".to_string()),
            ("sk".to_string(), session_key.to_string()),
        ];
        for (index, track) in tracks.iter().enumerate() {
            params.push((format!("artist[{index}]"), track.artist.clone()));
            params.push((format!("track[{index}]"), track.track.clone()));
            params.push((format!("timestamp[{index}]"), track.timestamp.to_string()));
            if let Some(album) = &track.album {
                params.push((format!("album[{index}]"), album.clone()));
            }
        }
        let params = self.signed_params(params);

        log::debug!("submitting batch of {} scrobbles", tracks.len());
        let body = self.send_post(&params).await.map_err(as_submit_error)?;
        if let Some(message) = api_error_message(&body) {
            return Err(ScrobbleMendError::Submit(message));
        }
        serde_json::from_str(&body).map_err(|e| ScrobbleMendError::Parse(e.to_string()))
    }

    /// Submit a single scrobble (the manual-scrobble path).
    pub async fn scrobble_single(
        &self,
        session_key: &str,
        artist: &str,
        track: &str,
        timestamp: u64,
    ) -> Result<serde_json::Value> {
        let params = self.signed_params(vec![
            ("method".to_string(), "track.scrobble".to_string()),
            ("sk".to_string(), session_key.to_string()),
            ("artist".to_string(), artist.to_string()),
            ("track".to_string(), track.to_string()),
            ("timestamp".to_string(), timestamp.to_string()),
        ]);

        let body = self.send_post(&params).await.map_err(as_submit_error)?;
        if let Some(message) = api_error_message(&body) {
            return Err(ScrobbleMendError::Submit(message));
        }
        serde_json::from_str(&body).map_err(|e| ScrobbleMendError::Parse(e.to_string()))
    }

    /// Fetch one page of a user's scrobble history inside `[from, to]`.
    ///
    /// Now-playing entries are kept (with no timestamp); it is the
    /// caller's job to exclude them before matching.
    pub async fn recent_tracks_page(
        &self,
        username: &str,
        page: u32,
        from: u64,
        to: u64,
        limit: u32,
    ) -> Result<ScrobblePage> {
        let params = vec![
            ("method".to_string(), "user.getrecenttracks".to_string()),
            ("user".to_string(), username.to_string()),
            ("from".to_string(), from.to_string()),
            ("to".to_string(), to.to_string()),
            ("limit".to_string(), limit.to_string()),
            ("page".to_string(), page.to_string()),
            ("api_key".to_string(), self.api_key.clone()),
            ("format".to_string(), "json".to_string()),
        ];

        log::debug!("fetching scrobble page {page} for {username}");
        let body = self.send_get(&params).await.map_err(as_fetch_error)?;
        if let Some(message) = api_error_message(&body) {
            return Err(ScrobbleMendError::Fetch(message));
        }
        parse_recent_tracks_response(&body)
    }

    /// Fetch a user's profile info (play count sizes full-history fetches).
    pub async fn user_info(&self, username: &str) -> Result<UserInfo> {
        let params = vec![
            ("method".to_string(), "user.getInfo".to_string()),
            ("user".to_string(), username.to_string()),
            ("api_key".to_string(), self.api_key.clone()),
            ("format".to_string(), "json".to_string()),
        ];

        let body = self.send_get(&params).await?;
        if let Some(message) = api_error_message(&body) {
            return Err(ScrobbleMendError::Fetch(message));
        }
        let envelope: UserInfoResponse =
            serde_json::from_str(&body).map_err(|e| ScrobbleMendError::Parse(e.to_string()))?;
        Ok(UserInfo {
            name: envelope.user.name,
            playcount: envelope.user.playcount.parse().unwrap_or(0),
        })
    }

    /// Fetch a ranked top-list for a user.
    ///
    /// The three ranked endpoints are near-identical; [`RankedKind`]
    /// selects between them.
    pub async fn fetch_ranked(
        &self,
        username: &str,
        kind: RankedKind,
        period: &str,
        limit: u32,
    ) -> Result<Vec<RankedItem>> {
        let params = vec![
            ("method".to_string(), kind.method().to_string()),
            ("user".to_string(), username.to_string()),
            ("period".to_string(), period.to_string()),
            ("limit".to_string(), limit.to_string()),
            ("api_key".to_string(), self.api_key.clone()),
            ("format".to_string(), "json".to_string()),
        ];

        let body = self.send_get(&params).await?;
        if let Some(message) = api_error_message(&body) {
            return Err(ScrobbleMendError::Fetch(message));
        }
        parse_ranked_response(kind, &body)
    }

    /// Append `api_key`, `api_sig`, and `format` to a parameter set.
    ///
    /// `format` is appended after signing; it never participates in the
    /// signature base string.
    fn signed_params(&self, mut params: Vec<(String, String)>) -> Vec<(String, String)> {
        params.push(("api_key".to_string(), self.api_key.clone()));
        let signature = api_signature(&params, &self.api_secret);
        params.push(("api_sig".to_string(), signature));
        params.push(("format".to_string(), "json".to_string()));
        params
    }

    async fn send_get(&self, params: &[(String, String)]) -> Result<String> {
        let url = format!("{}?{}", self.api_url, encode_params(params));
        let url = url
            .parse::<Url>()
            .map_err(|e| ScrobbleMendError::Http(e.to_string()))?;
        let request = Request::new(Method::Get, url);
        self.send(request).await
    }

    async fn send_post(&self, params: &[(String, String)]) -> Result<String> {
        let url = self
            .api_url
            .parse::<Url>()
            .map_err(|e| ScrobbleMendError::Http(e.to_string()))?;
        let mut request = Request::new(Method::Post, url);
        request.insert_header("Content-Type", "application/x-www-form-urlencoded");
        request.set_body(encode_params(params));
        self.send(request).await
    }

    async fn send(&self, request: Request) -> Result<String> {
        let mut response = self
            .http
            .send(request)
            .await
            .map_err(|e| ScrobbleMendError::Http(e.to_string()))?;
        let body = response
            .body_string()
            .await
            .map_err(|e| ScrobbleMendError::Http(e.to_string()))?;

        if !response.status().is_success() {
            // Prefer the structured upstream message when one is present.
            let message = api_error_message(&body)
                .unwrap_or_else(|| format!("upstream returned {}", response.status()));
            return Err(ScrobbleMendError::Http(message));
        }
        Ok(body)
    }
}

impl std::fmt::Debug for LastFmApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastFmApiClient")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// URL-encode a parameter list as a query/form string.
fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// The upstream's structured error envelope, returned on both error
/// status codes and `200 OK` bodies.
#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: i64,
    message: String,
}

fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .map(|envelope| format!("{} (code {})", envelope.message, envelope.error))
}

/// Reclassify a transport failure as a history-fetch failure.
fn as_fetch_error(error: ScrobbleMendError) -> ScrobbleMendError {
    match error {
        ScrobbleMendError::Http(message) => ScrobbleMendError::Fetch(message),
        other => other,
    }
}

/// Reclassify a transport failure as a submission failure.
fn as_submit_error(error: ScrobbleMendError) -> ScrobbleMendError {
    match error {
        ScrobbleMendError::Http(message) => ScrobbleMendError::Submit(message),
        other => other,
    }
}

// =============================================================================
// Response envelopes
// =============================================================================

#[derive(Deserialize)]
struct SessionResponse {
    session: SessionPayload,
}

#[derive(Deserialize)]
struct SessionPayload {
    name: String,
    key: String,
}

#[derive(Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracks,
}

#[derive(Deserialize)]
struct RecentTracks {
    #[serde(default)]
    track: Vec<ApiTrack>,
    #[serde(rename = "@attr")]
    attr: PaginationAttr,
}

#[derive(Deserialize)]
struct ApiTrack {
    name: String,
    artist: TextField,
    album: AlbumField,
    date: Option<ApiDate>,
    #[serde(rename = "@attr")]
    attr: Option<TrackAttr>,
}

#[derive(Deserialize)]
struct TextField {
    #[serde(rename = "#text")]
    text: String,
}

#[derive(Deserialize)]
struct AlbumField {
    #[serde(rename = "#text")]
    text: String,
    #[serde(default)]
    mbid: String,
}

#[derive(Deserialize)]
struct ApiDate {
    uts: String,
}

#[derive(Deserialize)]
struct TrackAttr {
    nowplaying: Option<String>,
}

#[derive(Deserialize)]
struct PaginationAttr {
    page: String,
    #[serde(rename = "totalPages")]
    total_pages: String,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    user: UserInfoPayload,
}

#[derive(Deserialize)]
struct UserInfoPayload {
    name: String,
    #[serde(default)]
    playcount: String,
}

#[derive(Deserialize)]
struct RankRef {
    rank: String,
}

#[derive(Deserialize)]
struct ArtistNameRef {
    name: String,
}

#[derive(Deserialize)]
struct TopArtistsResponse {
    topartists: TopArtistsPayload,
}

#[derive(Deserialize)]
struct TopArtistsPayload {
    #[serde(default)]
    artist: Vec<RankedArtistRow>,
}

#[derive(Deserialize)]
struct RankedArtistRow {
    name: String,
    #[serde(default)]
    playcount: String,
    #[serde(rename = "@attr")]
    attr: Option<RankRef>,
}

#[derive(Deserialize)]
struct TopAlbumsResponse {
    topalbums: TopAlbumsPayload,
}

#[derive(Deserialize)]
struct TopAlbumsPayload {
    #[serde(default)]
    album: Vec<RankedAlbumRow>,
}

#[derive(Deserialize)]
struct RankedAlbumRow {
    name: String,
    #[serde(default)]
    playcount: String,
    artist: ArtistNameRef,
    #[serde(rename = "@attr")]
    attr: Option<RankRef>,
}

#[derive(Deserialize)]
struct TopTracksResponse {
    toptracks: TopTracksPayload,
}

#[derive(Deserialize)]
struct TopTracksPayload {
    #[serde(default)]
    track: Vec<RankedTrackRow>,
}

#[derive(Deserialize)]
struct RankedTrackRow {
    name: String,
    #[serde(default)]
    playcount: String,
    artist: ArtistNameRef,
    #[serde(rename = "@attr")]
    attr: Option<RankRef>,
}

/// Parse a `user.getrecenttracks` response body into a [`ScrobblePage`].
///
/// Now-playing entries (flagged by `@attr.nowplaying` or a missing date)
/// are retained as records without a timestamp.
pub fn parse_recent_tracks_response(json: &str) -> Result<ScrobblePage> {
    let response: RecentTracksResponse =
        serde_json::from_str(json).map_err(|e| ScrobbleMendError::Parse(e.to_string()))?;

    let page: u32 = response.recenttracks.attr.page.parse().unwrap_or(1);
    let total_pages: u32 = response.recenttracks.attr.total_pages.parse().unwrap_or(1);

    let records = response
        .recenttracks
        .track
        .into_iter()
        .map(|track| {
            let now_playing = track
                .attr
                .as_ref()
                .and_then(|attr| attr.nowplaying.as_deref())
                == Some("true");
            let timestamp = if now_playing {
                None
            } else {
                track.date.and_then(|date| date.uts.parse().ok())
            };
            ScrobbleRecord {
                track: track.name,
                artist: track.artist.text,
                album: track.album.text,
                album_id: track.album.mbid,
                timestamp,
            }
        })
        .collect();

    Ok(ScrobblePage {
        records,
        page,
        total_pages,
    })
}

/// Parse one of the three ranked top-list response bodies.
pub fn parse_ranked_response(kind: RankedKind, json: &str) -> Result<Vec<RankedItem>> {
    let parse_err = |e: serde_json::Error| ScrobbleMendError::Parse(e.to_string());
    let rank_or = |attr: Option<RankRef>, index: usize| -> u32 {
        attr.and_then(|a| a.rank.parse().ok())
            .unwrap_or(index as u32 + 1)
    };

    let items = match kind {
        RankedKind::Artists => {
            let response: TopArtistsResponse = serde_json::from_str(json).map_err(parse_err)?;
            response
                .topartists
                .artist
                .into_iter()
                .enumerate()
                .map(|(index, row)| RankedItem {
                    rank: rank_or(row.attr, index),
                    name: row.name,
                    artist: None,
                    playcount: row.playcount.parse().unwrap_or(0),
                })
                .collect()
        }
        RankedKind::Albums => {
            let response: TopAlbumsResponse = serde_json::from_str(json).map_err(parse_err)?;
            response
                .topalbums
                .album
                .into_iter()
                .enumerate()
                .map(|(index, row)| RankedItem {
                    rank: rank_or(row.attr, index),
                    name: row.name,
                    artist: Some(row.artist.name),
                    playcount: row.playcount.parse().unwrap_or(0),
                })
                .collect()
        }
        RankedKind::Tracks => {
            let response: TopTracksResponse = serde_json::from_str(json).map_err(parse_err)?;
            response
                .toptracks
                .track
                .into_iter()
                .enumerate()
                .map(|(index, row)| RankedItem {
                    rank: rank_or(row.attr, index),
                    name: row.name,
                    artist: Some(row.artist.name),
                    playcount: row.playcount.parse().unwrap_or(0),
                })
                .collect()
        }
    };
    Ok(items)
}
