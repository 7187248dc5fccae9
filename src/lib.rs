pub mod api;
pub mod cancel;
pub mod config;
pub mod cookie;
pub mod deleter;
pub mod edit_history;
pub mod error;
pub mod headers;
pub mod history;
pub mod matcher;
pub mod orchestrator;
pub mod recreator;
pub mod session;
pub mod signature;
pub mod types;
pub mod web;

pub use api::{LastFmApiClient, ScrobblePage};
pub use cancel::CancellationState;
pub use config::AppConfig;
pub use deleter::{DeletePolicy, ScrobbleDeleter};
pub use edit_history::EditHistoryStore;
pub use error::ScrobbleMendError;
pub use history::{HistoryFetcher, EDITABLE_WINDOW_DAYS};
pub use matcher::find_matches;
pub use orchestrator::{BulkEditOrchestrator, BulkEditOutcome, EditPhase};
pub use recreator::ScrobbleRecreator;
pub use session::{SessionContext, SessionCredentials};
pub use types::{
    CorrectedScrobble, EditCriteria, EditHistoryEntry, RankedItem, RankedKind, ScrobbleRecord,
    UserInfo,
};
pub use web::AppState;

pub type Result<T> = std::result::Result<T, ScrobbleMendError>;
