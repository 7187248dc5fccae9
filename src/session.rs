//! Authenticated session state and its cookie representation.
//!
//! The session key obtained from the `auth.getSession` exchange is
//! persisted client-side in a 30-day http-only cookie. Route handlers
//! build a [`SessionContext`] from the inbound `Cookie` header once per
//! request and pass it explicitly to whatever needs it, rather than
//! re-parsing cookies ad hoc at every call site.

use serde::{Deserialize, Serialize};

use crate::{cookie, Result, ScrobbleMendError};

/// Name of the session cookie set by the auth callback.
pub const SESSION_COOKIE: &str = "lastfm_session";

/// Session cookie lifetime: 30 days, matching the upstream grant.
const SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// The authenticated identity: username plus the long-lived session key
/// required to sign state-changing API calls.
///
/// Obtained once via the redirect-based authentication flow; borrowed
/// read-only by request signing for the lifetime of each call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    /// The authenticated username
    #[serde(rename = "name")]
    pub username: String,
    /// Secret session key for signed submissions
    #[serde(rename = "key")]
    pub session_key: String,
}

impl SessionCredentials {
    pub fn new(username: String, session_key: String) -> Self {
        Self {
            username,
            session_key,
        }
    }

    /// Basic shape check; does not verify the key against the server.
    pub fn is_valid(&self) -> bool {
        !self.username.is_empty() && !self.session_key.is_empty()
    }
}

/// Render the `Set-Cookie` header value that persists a session.
pub fn session_cookie(credentials: &SessionCredentials) -> Result<String> {
    let payload = serde_json::to_string(credentials)
        .map_err(|e| ScrobbleMendError::Parse(e.to_string()))?;
    Ok(format!(
        "{SESSION_COOKIE}={}; Path=/; Max-Age={SESSION_MAX_AGE_SECS}; HttpOnly; Secure; SameSite=Lax",
        urlencoding::encode(&payload)
    ))
}

/// Render the `Set-Cookie` header value that clears the session (logout).
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=Lax")
}

/// Per-request view of the caller's authentication state.
///
/// Constructed once from the inbound `Cookie` header; a malformed or
/// absent session cookie yields an unauthenticated context, never an
/// error.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    credentials: Option<SessionCredentials>,
}

impl SessionContext {
    /// Parse the session out of a raw `Cookie` header, if present.
    pub fn from_cookie_header(cookie_header: Option<&str>) -> Self {
        let credentials = cookie_header
            .and_then(|header| cookie::cookie_value(header, SESSION_COOKIE))
            .and_then(|raw| urlencoding::decode(raw).ok())
            .and_then(|json| serde_json::from_str::<SessionCredentials>(&json).ok())
            .filter(SessionCredentials::is_valid);
        Self { credentials }
    }

    /// The credentials, if the caller is authenticated.
    pub fn credentials(&self) -> Option<&SessionCredentials> {
        self.credentials.as_ref()
    }

    /// The credentials, or an [`ScrobbleMendError::Auth`] for the 401 path.
    pub fn require(&self) -> Result<&SessionCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ScrobbleMendError::Auth("no active session".to_string()))
    }
}
