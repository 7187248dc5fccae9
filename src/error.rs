use thiserror::Error;

/// Error types for scrobble reconciliation operations.
///
/// This enum covers every failure class the bulk-edit pipeline can hit:
/// configuration problems, invalid user input, network issues, and
/// upstream rejections at each pipeline stage.
///
/// # Error Handling Examples
///
/// ```rust,no_run
/// use scrobble_mend::{AppConfig, ScrobbleMendError};
///
/// match AppConfig::load() {
///     Ok(config) => println!("configured for {}", config.lastfm.api_url),
///     Err(ScrobbleMendError::Config(msg)) => eprintln!("fix your configuration: {msg}"),
///     Err(e) => eprintln!("unexpected error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum ScrobbleMendError {
    /// Missing or invalid configuration (API key/secret).
    ///
    /// This is fatal: no request may be attempted until the configuration
    /// is corrected. It is never produced at request time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// User-correctable input problem.
    ///
    /// Raised before any network call is made, e.g. when a required
    /// edit-criteria field is empty.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// HTTP/network related errors.
    ///
    /// Connection failures, timeouts, DNS errors, and other low-level
    /// transport issues.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failures.
    ///
    /// Missing or expired session, or a rejected `auth.getSession`
    /// exchange. Surfaced as 401 at the route boundary.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// History retrieval failed.
    ///
    /// Any non-success response while paging through recent tracks aborts
    /// the whole fetch; partial history is never used.
    #[error("History fetch failed: {0}")]
    Fetch(String),

    /// A deletion request failed part-way through the batch.
    ///
    /// `completed` counts the scrobbles already removed upstream before the
    /// failure; those deletions cannot be rolled back, so the caller must
    /// skip recreation and surface this error verbatim.
    #[error("Deletion aborted after {completed} scrobbles: {message}")]
    Delete {
        /// Number of scrobbles successfully deleted before the failure
        completed: usize,
        /// Description of the failing request
        message: String,
    },

    /// The batched scrobble submission was rejected.
    ///
    /// Never retried automatically: the upstream has no idempotency key,
    /// so a retry could create duplicate scrobbles.
    #[error("Scrobble submission failed: {0}")]
    Submit(String),

    /// Failed to parse an upstream response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// File system I/O errors (edit-history persistence).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
