//! Core data model for scrobble reconciliation.
//!
//! These are the types that cross module boundaries: historical play
//! records, user-supplied edit criteria, corrected submissions, and the
//! locally persisted edit history.

use serde::{Deserialize, Serialize};

use crate::{Result, ScrobbleMendError};

/// A single historical play event as reported by the upstream service.
///
/// A record without a `timestamp` represents the currently playing track
/// rather than a completed scrobble. Such records are retained by the
/// page fetcher but are never eligible for matching, deletion, or
/// recreation.
///
/// # Examples
///
/// ```rust
/// use scrobble_mend::ScrobbleRecord;
///
/// let record = ScrobbleRecord {
///     track: "Paranoid Android".to_string(),
///     artist: "Radiohead".to_string(),
///     album: "OK Computer".to_string(),
///     album_id: String::new(),
///     timestamp: Some(1640995200),
/// };
/// assert!(record.is_historical());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrobbleRecord {
    /// The track name/title
    pub track: String,
    /// The artist name
    pub artist: String,
    /// The album name (may be empty)
    #[serde(default)]
    pub album: String,
    /// Opaque external album identifier (may be empty)
    #[serde(default)]
    pub album_id: String,
    /// Unix timestamp of the play, absent for the now-playing entry
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl ScrobbleRecord {
    /// Whether this record is a completed scrobble rather than the
    /// now-playing entry.
    pub fn is_historical(&self) -> bool {
        self.timestamp.is_some()
    }
}

/// User input describing a correction: which scrobbles to replace and
/// what to replace them with.
///
/// Match keys are compared by exact string equality against the record
/// fields. No fuzzy matching, no case normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCriteria {
    /// Track name to match
    pub original_track: String,
    /// Album name to match
    pub original_album: String,
    /// Artist name to match
    pub original_artist: String,
    /// Replacement track name
    pub corrected_track: String,
    /// Replacement album name
    pub corrected_album: String,
    /// Replacement artist name
    pub corrected_artist: String,
}

impl EditCriteria {
    /// Reject criteria with any empty field before any network call is made.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("originalTrack", &self.original_track),
            ("originalAlbum", &self.original_album),
            ("originalArtist", &self.original_artist),
            ("correctedTrack", &self.corrected_track),
            ("correctedAlbum", &self.corrected_album),
            ("correctedArtist", &self.corrected_artist),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ScrobbleMendError::Validation(format!("{name} is required")));
            }
        }
        Ok(())
    }
}

/// A corrected scrobble ready for submission to the signed scrobble API.
///
/// `timestamp` carries the deleted record's original play time so the
/// replacement occupies the same point in the listening timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectedScrobble {
    /// Artist name to submit
    pub artist: String,
    /// Track name to submit
    pub track: String,
    /// Unix timestamp of the play being recreated
    pub timestamp: u64,
    /// Album name, omitted from the submission when `None`
    pub album: Option<String>,
}

/// A locally persisted record of a previously performed correction.
///
/// Entries are keyed by the (originalArtist, originalAlbum, originalTrack)
/// triple: a later edit on the same triple overwrites the stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditHistoryEntry {
    pub original_track: String,
    pub original_album: String,
    pub original_artist: String,
    pub corrected_track: String,
    pub corrected_album: String,
    pub corrected_artist: String,
    /// Unix timestamp of when the edit was performed
    pub edited_at: u64,
}

impl EditHistoryEntry {
    /// Build a history entry from the criteria that drove an edit.
    pub fn from_criteria(criteria: &EditCriteria, edited_at: u64) -> Self {
        Self {
            original_track: criteria.original_track.clone(),
            original_album: criteria.original_album.clone(),
            original_artist: criteria.original_artist.clone(),
            corrected_track: criteria.corrected_track.clone(),
            corrected_album: criteria.corrected_album.clone(),
            corrected_artist: criteria.corrected_artist.clone(),
            edited_at,
        }
    }

    /// The uniqueness key for this entry.
    pub fn key(&self) -> (&str, &str, &str) {
        (
            &self.original_artist,
            &self.original_album,
            &self.original_track,
        )
    }
}

/// Which ranked top-list to fetch.
///
/// The upstream offers three near-identical ranked endpoints; callers
/// select one with this enum instead of passing fetch functions around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankedKind {
    Artists,
    Albums,
    Tracks,
}

impl RankedKind {
    /// The upstream API method name for this kind.
    pub fn method(self) -> &'static str {
        match self {
            RankedKind::Artists => "user.getTopArtists",
            RankedKind::Albums => "user.getTopAlbums",
            RankedKind::Tracks => "user.getTopTracks",
        }
    }
}

/// One row of a ranked top-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    /// 1-based chart position
    pub rank: u32,
    /// Artist, album, or track name depending on the list kind
    pub name: String,
    /// Owning artist for album and track lists, `None` for artist lists
    pub artist: Option<String>,
    /// Play count over the requested period
    pub playcount: u64,
}

/// Basic profile data for a user, used to size full-history fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub playcount: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> EditCriteria {
        EditCriteria {
            original_track: "Wonderwall".to_string(),
            original_album: "(What's the Story) Morning Glory?".to_string(),
            original_artist: "Oasis".to_string(),
            corrected_track: "Wonderwall (Remastered)".to_string(),
            corrected_album: "(What's the Story) Morning Glory?".to_string(),
            corrected_artist: "Oasis".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_criteria() {
        assert!(criteria().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut c = criteria();
        c.corrected_artist = "  ".to_string();
        match c.validate() {
            Err(ScrobbleMendError::Validation(msg)) => {
                assert!(msg.contains("correctedArtist"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_history_entry_key_uses_original_triple() {
        let entry = EditHistoryEntry::from_criteria(&criteria(), 1700000000);
        assert_eq!(
            entry.key(),
            (
                "Oasis",
                "(What's the Story) Morning Glory?",
                "Wonderwall"
            )
        );
        assert_eq!(entry.edited_at, 1700000000);
    }

    #[test]
    fn test_record_serde_uses_camel_case() {
        let record = ScrobbleRecord {
            track: "Stressed Out".to_string(),
            artist: "twenty one pilots".to_string(),
            album: "Blurryface".to_string(),
            album_id: "136434d5-9ddf-4c62-8dcc-021ead11fe0c".to_string(),
            timestamp: Some(1743215535),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"albumId\""));
        let back: ScrobbleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
