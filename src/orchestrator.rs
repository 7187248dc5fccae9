//! The bulk-edit pipeline: fetch, match, delete, recreate.
//!
//! One user-facing operation composed from the lower components, run to
//! completion or aborted at the first failure. The phases form a fixed
//! sequence:
//!
//! ```text
//! Idle -> Fetching -> Matching -> Deleting -> Recreating -> Succeeded
//!              \                      \             \
//!               +----------------------+-------------+--> Failed
//! ```
//!
//! Matching proceeds to Deleting even with zero matches (the empty
//! delete and recreate are no-ops). A deletion failure skips recreation
//! entirely: the already-deleted scrobbles cannot be restored, and
//! recreating a partial set would desynchronize counts.

use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;

use crate::cancel::CancellationState;
use crate::deleter::ScrobbleDeleter;
use crate::edit_history::EditHistoryStore;
use crate::history::HistoryFetcher;
use crate::matcher::find_matches;
use crate::recreator::ScrobbleRecreator;
use crate::types::{EditCriteria, EditHistoryEntry};
use crate::{Result, ScrobbleMendError, SessionCredentials};

/// Pipeline phase, reported alongside outcomes and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditPhase {
    Idle,
    Fetching,
    Matching,
    Deleting,
    Recreating,
    Succeeded,
    Failed,
}

impl EditPhase {
    /// Which phase a failure belongs to, judged by its error class.
    pub fn of_failure(error: &ScrobbleMendError) -> EditPhase {
        match error {
            ScrobbleMendError::Config(_)
            | ScrobbleMendError::Validation(_)
            | ScrobbleMendError::Auth(_) => EditPhase::Idle,
            ScrobbleMendError::Fetch(_) | ScrobbleMendError::Http(_) => EditPhase::Fetching,
            ScrobbleMendError::Delete { .. } => EditPhase::Deleting,
            ScrobbleMendError::Submit(_) => EditPhase::Recreating,
            ScrobbleMendError::Parse(_) | ScrobbleMendError::Io(_) => EditPhase::Fetching,
        }
    }
}

/// Result of a completed bulk edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkEditOutcome {
    /// Scrobbles in the editable window that matched the criteria
    pub matched: usize,
    /// Scrobbles deleted upstream
    pub deleted: usize,
    /// Corrected scrobbles submitted
    pub created: usize,
}

/// Composes the fetcher, matcher, deleter, and recreator into one
/// atomic-looking user operation.
#[derive(Debug)]
pub struct BulkEditOrchestrator {
    fetcher: HistoryFetcher,
    deleter: ScrobbleDeleter,
    recreator: ScrobbleRecreator,
    /// Root directory for edit-history persistence; `None` means the
    /// XDG data directory.
    history_root: Option<PathBuf>,
}

impl BulkEditOrchestrator {
    pub fn new(
        fetcher: HistoryFetcher,
        deleter: ScrobbleDeleter,
        recreator: ScrobbleRecreator,
    ) -> Self {
        Self {
            fetcher,
            deleter,
            recreator,
            history_root: None,
        }
    }

    /// Persist edit history under an explicit root instead of the XDG
    /// data directory (testing).
    pub fn with_history_root(mut self, root: PathBuf) -> Self {
        self.history_root = Some(root);
        self
    }

    /// The cancellation flag shared with the delete loop.
    pub fn cancellation(&self) -> CancellationState {
        self.deleter.cancellation()
    }

    /// Run one bulk edit to completion.
    ///
    /// Validates the criteria before any network call, fetches the
    /// 14-day editable window, filters it down to exact matches, deletes
    /// the matches sequentially, and recreates them under the corrected
    /// metadata with their original timestamps. A successful run upserts
    /// the user's local edit history.
    pub async fn run(
        &self,
        session: &SessionCredentials,
        criteria: &EditCriteria,
        cookies: &str,
    ) -> Result<BulkEditOutcome> {
        criteria.validate()?;
        if cookies.trim().is_empty() {
            return Err(ScrobbleMendError::Validation(
                "session cookies are required".to_string(),
            ));
        }

        log::debug!("phase: {:?}", EditPhase::Fetching);
        let records = self.fetcher.fetch_editable_window(&session.username).await?;

        log::debug!("phase: {:?}", EditPhase::Matching);
        let matches = find_matches(&records, criteria);
        log::info!(
            "bulk edit for {}: {} of {} scrobbles match '{}' / '{}' / '{}'",
            session.username,
            matches.len(),
            records.len(),
            criteria.original_artist,
            criteria.original_album,
            criteria.original_track
        );

        log::debug!("phase: {:?}", EditPhase::Deleting);
        let deleted = self
            .deleter
            .delete_all(&matches, &session.username, cookies)
            .await?;

        log::debug!("phase: {:?}", EditPhase::Recreating);
        let created = self.recreator.recreate(session, &matches, criteria).await?;

        self.record_history(&session.username, criteria);

        log::info!(
            "bulk edit for {} succeeded: {} matched, {deleted} deleted, {created} recreated",
            session.username,
            matches.len()
        );
        Ok(BulkEditOutcome {
            matched: matches.len(),
            deleted,
            created,
        })
    }

    /// Upsert the edit into the user's local history.
    ///
    /// The upstream edit already happened at this point, so a failing
    /// local write is logged rather than turned into an operation
    /// failure.
    fn record_history(&self, username: &str, criteria: &EditCriteria) {
        let entry = EditHistoryEntry::from_criteria(criteria, Utc::now().timestamp() as u64);
        let store = match &self.history_root {
            Some(root) => EditHistoryStore::open_under(root, username),
            None => EditHistoryStore::open_for_user(username),
        };
        let result = store.and_then(|mut store| store.upsert(entry));
        if let Err(e) = result {
            log::warn!("failed to record edit history for {username}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_phase_classification() {
        assert_eq!(
            EditPhase::of_failure(&ScrobbleMendError::Validation("x".into())),
            EditPhase::Idle
        );
        assert_eq!(
            EditPhase::of_failure(&ScrobbleMendError::Fetch("x".into())),
            EditPhase::Fetching
        );
        assert_eq!(
            EditPhase::of_failure(&ScrobbleMendError::Delete {
                completed: 1,
                message: "x".into()
            }),
            EditPhase::Deleting
        );
        assert_eq!(
            EditPhase::of_failure(&ScrobbleMendError::Submit("x".into())),
            EditPhase::Recreating
        );
    }

    #[test]
    fn test_phase_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&EditPhase::Succeeded).unwrap(),
            "\"succeeded\""
        );
    }
}
