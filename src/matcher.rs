//! Selecting the scrobbles an edit applies to.

use crate::types::{EditCriteria, ScrobbleRecord};

/// Filter `records` down to the ones the criteria describe.
///
/// A record matches when its artist, album, and track all exactly equal
/// the criteria's original values — case-sensitive, no normalization —
/// and it carries a timestamp (now-playing entries never match). Input
/// order is preserved. An empty result is not an error: the edit
/// pipeline treats zero matches as a no-op.
///
/// # Examples
///
/// ```rust
/// use scrobble_mend::{find_matches, EditCriteria, ScrobbleRecord};
///
/// let records = vec![ScrobbleRecord {
///     track: "Bohemian Rhapsody".to_string(),
///     artist: "Queen".to_string(),
///     album: "A Night at the Opera".to_string(),
///     album_id: String::new(),
///     timestamp: Some(100),
/// }];
/// let criteria = EditCriteria {
///     original_track: "Bohemian Rhapsody".to_string(),
///     original_album: "A Night at the Opera".to_string(),
///     original_artist: "Queen".to_string(),
///     corrected_track: "Bohemian Rhapsody (Remastered)".to_string(),
///     corrected_album: "A Night at the Opera".to_string(),
///     corrected_artist: "Queen".to_string(),
/// };
/// assert_eq!(find_matches(&records, &criteria).len(), 1);
/// ```
pub fn find_matches(records: &[ScrobbleRecord], criteria: &EditCriteria) -> Vec<ScrobbleRecord> {
    records
        .iter()
        .filter(|record| {
            record.is_historical()
                && record.artist == criteria.original_artist
                && record.album == criteria.original_album
                && record.track == criteria.original_track
        })
        .cloned()
        .collect()
}
