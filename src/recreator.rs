//! Recreating deleted scrobbles under corrected metadata.

use chrono::Utc;

use crate::api::LastFmApiClient;
use crate::types::{CorrectedScrobble, EditCriteria, ScrobbleRecord};
use crate::{Result, SessionCredentials};

/// Builds and submits the corrected replacements for deleted scrobbles.
#[derive(Debug, Clone)]
pub struct ScrobbleRecreator {
    api: LastFmApiClient,
}

/// Map deleted records to corrected submissions.
///
/// Every submission reuses its source record's **original** timestamp so
/// the corrected entry lands at the same point in the listening
/// timeline. A source record that somehow lacks a timestamp falls back
/// to the current time — degraded, but defined.
pub fn corrected_submissions(
    records: &[ScrobbleRecord],
    criteria: &EditCriteria,
) -> Vec<CorrectedScrobble> {
    let fallback = Utc::now().timestamp() as u64;
    records
        .iter()
        .map(|record| CorrectedScrobble {
            artist: criteria.corrected_artist.clone(),
            track: criteria.corrected_track.clone(),
            album: if criteria.corrected_album.is_empty() {
                None
            } else {
                Some(criteria.corrected_album.clone())
            },
            timestamp: record.timestamp.unwrap_or(fallback),
        })
        .collect()
}

impl ScrobbleRecreator {
    pub fn new(api: LastFmApiClient) -> Self {
        Self { api }
    }

    /// Submit corrected replacements for `records` in one batched signed
    /// request. Returns the number of scrobbles submitted.
    ///
    /// An empty record set submits nothing and reports zero. A rejected
    /// batch is a hard failure; it is never retried here because the
    /// upstream has no idempotency key.
    pub async fn recreate(
        &self,
        session: &SessionCredentials,
        records: &[ScrobbleRecord],
        criteria: &EditCriteria,
    ) -> Result<usize> {
        let submissions = corrected_submissions(records, criteria);
        if submissions.is_empty() {
            log::debug!("no scrobbles to recreate");
            return Ok(0);
        }

        self.api
            .scrobble_batch(&session.session_key, &submissions)
            .await?;
        log::info!(
            "recreated {} scrobbles as '{}' by '{}'",
            submissions.len(),
            criteria.corrected_track,
            criteria.corrected_artist
        );
        Ok(submissions.len())
    }
}
