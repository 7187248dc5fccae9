//! Scripted HTTP client for integration tests.
//!
//! Returns queued responses in FIFO order and records every request it
//! receives, so tests can drive the real fetch/delete/recreate code
//! paths and then assert on the exact wire traffic.

use async_trait::async_trait;
use http_client::HttpClient;
use http_types::{Error, Request, Response, StatusCode};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the client observed about one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
    pub cookie: Option<String>,
    pub referer: Option<String>,
}

#[derive(Debug, Default)]
struct ScriptedState {
    responses: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Clonable handle to shared scripted state; clone one copy into the
/// client under test and keep another for assertions.
#[derive(Debug, Default, Clone)]
pub struct ScriptedHttpClient {
    state: Arc<ScriptedState>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response to hand out.
    pub fn push_response(&self, status: u16, body: &str) {
        self.state
            .responses
            .lock()
            .unwrap()
            .push_back((status, body.to_string()));
    }

    /// Everything sent through this client so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn send(&self, mut req: Request) -> Result<Response, Error> {
        let body = req.body_string().await?;
        let header_string = |name: &str| {
            req.header(name)
                .map(|values| values.last().as_str().to_string())
        };

        self.state.requests.lock().unwrap().push(RecordedRequest {
            method: req.method().to_string(),
            url: req.url().to_string(),
            body,
            cookie: header_string("Cookie"),
            referer: header_string("Referer"),
        });

        let scripted = self.state.responses.lock().unwrap().pop_front();
        match scripted {
            Some((status, body)) => {
                let mut response = Response::new(status);
                response.insert_header("Content-Type", "application/json");
                response.set_body(body);
                Ok(response)
            }
            None => Err(Error::from_str(
                StatusCode::InternalServerError,
                "no scripted response left",
            )),
        }
    }
}

/// A recent-tracks page body with the given tracks and page metadata.
///
/// Each entry is (track, artist, album, timestamp); a `None` timestamp
/// renders the upstream's now-playing shape.
pub fn recent_tracks_page(
    tracks: &[(&str, &str, &str, Option<u64>)],
    page: u32,
    total_pages: u32,
) -> String {
    let rows: Vec<String> = tracks
        .iter()
        .map(|(track, artist, album, timestamp)| match timestamp {
            Some(uts) => format!(
                r##"{{"name": "{track}", "artist": {{"#text": "{artist}", "mbid": ""}}, "album": {{"#text": "{album}", "mbid": ""}}, "date": {{"uts": "{uts}", "#text": ""}}}}"##
            ),
            None => format!(
                r##"{{"name": "{track}", "artist": {{"#text": "{artist}", "mbid": ""}}, "album": {{"#text": "{album}", "mbid": ""}}, "@attr": {{"nowplaying": "true"}}}}"##
            ),
        })
        .collect();

    format!(
        r##"{{"recenttracks": {{"track": [{}], "@attr": {{"user": "testuser", "page": "{page}", "perPage": "1000", "totalPages": "{total_pages}", "total": "0"}}}}}}"##,
        rows.join(",")
    )
}
