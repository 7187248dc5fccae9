//! Paginated retrieval of a user's scrobble history.
//!
//! Two access patterns with different pacing requirements:
//!
//! - the **editable window** (14 days, what the upstream lets users
//!   edit) is paged strictly sequentially — the total page count is only
//!   discovered on page 1, and bursting requests risks rate limiting;
//! - the **full history** used for statistics fans out all pages
//!   concurrently once the page count is known from the user's play
//!   count, since aggregation does not care about ordering.
//!
//! A failed page fetch aborts the whole operation in both cases; a
//! silently truncated history would corrupt matching and statistics.

use chrono::Utc;

use crate::api::LastFmApiClient;
use crate::types::ScrobbleRecord;
use crate::Result;

/// The upstream only allows edits to scrobbles from the last 14 days.
pub const EDITABLE_WINDOW_DAYS: i64 = 14;

/// Maximum records per page accepted by the recent-tracks endpoint.
pub const PAGE_LIMIT: u32 = 1000;

/// Window start for full-history fetches; the service has no data
/// earlier than the year 2000.
const FULL_HISTORY_FROM: u64 = 946_681_200;

/// Paginated reader of a user's scrobble history.
#[derive(Debug, Clone)]
pub struct HistoryFetcher {
    api: LastFmApiClient,
}

impl HistoryFetcher {
    pub fn new(api: LastFmApiClient) -> Self {
        Self { api }
    }

    /// Fetch every scrobble in the upstream's 14-day editable window.
    pub async fn fetch_editable_window(&self, username: &str) -> Result<Vec<ScrobbleRecord>> {
        let since = (Utc::now() - chrono::Duration::days(EDITABLE_WINDOW_DAYS)).timestamp() as u64;
        self.fetch_window(username, since).await
    }

    /// Fetch every scrobble in `[since, now]`, page by page.
    ///
    /// Pages are fetched sequentially and concatenated in page order.
    /// The now-playing entry, which the upstream repeats at the top of
    /// every page, is kept only once.
    pub async fn fetch_window(&self, username: &str, since: u64) -> Result<Vec<ScrobbleRecord>> {
        let now = Utc::now().timestamp() as u64;

        let first = self
            .api
            .recent_tracks_page(username, 1, since, now, PAGE_LIMIT)
            .await?;
        let total_pages = first.total_pages;
        let mut records = first.records;

        for page in 2..=total_pages {
            let next = self
                .api
                .recent_tracks_page(username, page, since, now, PAGE_LIMIT)
                .await?;
            records.extend(next.records);
        }

        log::debug!(
            "fetched {} scrobbles across {} pages for {username}",
            records.len(),
            total_pages.max(1)
        );
        Ok(dedup_now_playing(records))
    }

    /// Fetch a user's entire scrobble history for statistics.
    ///
    /// The page count comes from the user's total play count, so all
    /// pages can be requested concurrently. Aggregate order across pages
    /// is not meaningful here.
    pub async fn fetch_full_history(&self, username: &str) -> Result<Vec<ScrobbleRecord>> {
        let info = self.api.user_info(username).await?;
        let total_pages = info.playcount.div_ceil(u64::from(PAGE_LIMIT)).max(1) as u32;
        let now = Utc::now().timestamp() as u64;

        log::debug!(
            "fetching full history for {username}: {} plays, {total_pages} pages",
            info.playcount
        );

        let fetches = (1..=total_pages).map(|page| {
            self.api
                .recent_tracks_page(username, page, FULL_HISTORY_FROM, now, PAGE_LIMIT)
        });
        let pages = futures::future::try_join_all(fetches).await?;

        Ok(dedup_now_playing(
            pages.into_iter().flat_map(|page| page.records).collect(),
        ))
    }
}

/// Keep only the first now-playing entry across concatenated pages.
///
/// Historical records pass through untouched, in their original order.
fn dedup_now_playing(records: Vec<ScrobbleRecord>) -> Vec<ScrobbleRecord> {
    let mut seen_now_playing = false;
    records
        .into_iter()
        .filter(|record| {
            if record.is_historical() {
                true
            } else if seen_now_playing {
                false
            } else {
                seen_now_playing = true;
                true
            }
        })
        .collect()
}
