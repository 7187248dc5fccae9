//! Removal of scrobbles via the website's own delete endpoint.
//!
//! The public API offers no delete operation, so this module mimics the
//! authenticated web UI's delete form: a cookie-authenticated POST to
//! `/user/{username}/library/delete` with the CSRF token from the
//! user's browser cookies. That endpoint is undocumented and could
//! change upstream without notice — every detail of the request lives
//! here and nowhere else.

use std::sync::Arc;
use std::time::Duration;

use http_client::{HttpClient, Request};
use http_types::{Method, Url};

use crate::cancel::{sleep_unless_cancelled, CancellationState};
use crate::types::ScrobbleRecord;
use crate::{cookie, headers, Result, ScrobbleMendError};

/// Pacing for the sequential delete loop.
///
/// A fixed pause between consecutive requests keeps the loop under the
/// upstream's rate limits and below its bot-detection thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePolicy {
    /// Pause inserted after each successful deletion
    pub delay: Duration,
}

impl Default for DeletePolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
        }
    }
}

impl DeletePolicy {
    pub fn with_delay_ms(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }
}

/// Sequential deleter for matched scrobbles.
#[derive(Clone)]
pub struct ScrobbleDeleter {
    http: Arc<dyn HttpClient + Send + Sync>,
    www_url: String,
    policy: DeletePolicy,
    cancel: CancellationState,
}

impl ScrobbleDeleter {
    pub fn new(http: Arc<dyn HttpClient + Send + Sync>, www_url: impl Into<String>) -> Self {
        Self {
            http,
            www_url: www_url.into(),
            policy: DeletePolicy::default(),
            cancel: CancellationState::new(),
        }
    }

    pub fn with_policy(mut self, policy: DeletePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The cancellation flag consulted between deletions.
    pub fn cancellation(&self) -> CancellationState {
        self.cancel.clone()
    }

    /// Delete every record in order, pausing between requests.
    ///
    /// Strictly sequential, never concurrent. The first failure aborts
    /// the remaining loop immediately; the returned error carries how
    /// many deletions had already succeeded, since the upstream cannot
    /// roll them back.
    pub async fn delete_all(
        &self,
        records: &[ScrobbleRecord],
        username: &str,
        cookies: &str,
    ) -> Result<usize> {
        let mut completed = 0;

        for (index, record) in records.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(ScrobbleMendError::Delete {
                    completed,
                    message: "cancelled".to_string(),
                });
            }

            self.delete_one(record, username, cookies)
                .await
                .map_err(|e| ScrobbleMendError::Delete {
                    completed,
                    message: e.to_string(),
                })?;
            completed += 1;

            log::debug!(
                "deleted scrobble {completed}/{}: '{}' by '{}'",
                records.len(),
                record.track,
                record.artist
            );

            if index < records.len() - 1
                && !sleep_unless_cancelled(self.cancel.subscribe(), self.policy.delay).await
            {
                return Err(ScrobbleMendError::Delete {
                    completed,
                    message: "cancelled".to_string(),
                });
            }
        }

        Ok(completed)
    }

    /// Issue a single deletion request, returning the upstream response
    /// body.
    ///
    /// Form fields and headers mirror the web UI's own delete action:
    /// artist, track, and original timestamp, authorized by the raw
    /// browser cookies and the CSRF token extracted from them.
    pub async fn delete_one(
        &self,
        record: &ScrobbleRecord,
        username: &str,
        cookies: &str,
    ) -> Result<String> {
        let profile_url = format!("{}/user/{}", self.www_url, username);
        let delete_url = format!("{profile_url}/library/delete");
        let url = delete_url
            .parse::<Url>()
            .map_err(|e| ScrobbleMendError::Http(e.to_string()))?;

        let csrf = cookie::csrf_token(cookies);
        let timestamp = record.timestamp.unwrap_or(0).to_string();
        let form_data = [
            ("csrfmiddlewaretoken", csrf.as_str()),
            ("artist_name", record.artist.as_str()),
            ("track_name", record.track.as_str()),
            ("timestamp", timestamp.as_str()),
        ];
        let form_string: String = form_data
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut request = Request::new(Method::Post, url);
        headers::add_form_headers(&mut request, &profile_url);
        headers::add_raw_cookies(&mut request, cookies);
        request.set_body(form_string);

        let mut response = self
            .http
            .send(request)
            .await
            .map_err(|e| ScrobbleMendError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScrobbleMendError::Http(format!(
                "delete endpoint returned {}",
                response.status()
            )));
        }
        response
            .body_string()
            .await
            .map_err(|e| ScrobbleMendError::Http(e.to_string()))
    }
}

impl std::fmt::Debug for ScrobbleDeleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrobbleDeleter")
            .field("www_url", &self.www_url)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_one_second() {
        assert_eq!(DeletePolicy::default().delay, Duration::from_secs(1));
        assert_eq!(
            DeletePolicy::with_delay_ms(250).delay,
            Duration::from_millis(250)
        );
    }
}
