//! End-to-end bulk-edit pipeline against a scripted upstream.

mod common;

use common::{recent_tracks_page, ScriptedHttpClient};
use scrobble_mend::{
    BulkEditOrchestrator, DeletePolicy, EditCriteria, EditHistoryStore, HistoryFetcher,
    LastFmApiClient, ScrobbleDeleter, ScrobbleMendError, ScrobbleRecord, ScrobbleRecreator,
    SessionCredentials,
};
use std::path::PathBuf;

const WWW_URL: &str = "https://www.example.test";

fn api(http: &ScriptedHttpClient) -> LastFmApiClient {
    LastFmApiClient::with_api_url(
        Box::new(http.clone()),
        "test_key",
        "test_secret",
        "https://ws.example.test/2.0/",
    )
}

fn orchestrator(http: &ScriptedHttpClient, history_root: PathBuf) -> BulkEditOrchestrator {
    let api = api(http);
    let deleter = ScrobbleDeleter::new(api.http(), WWW_URL)
        .with_policy(DeletePolicy::with_delay_ms(1));
    BulkEditOrchestrator::new(
        HistoryFetcher::new(api.clone()),
        deleter,
        ScrobbleRecreator::new(api),
    )
    .with_history_root(history_root)
}

fn temp_root(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!(
        "scrobble-mend-it-{}-{name}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&root);
    root
}

fn session() -> SessionCredentials {
    SessionCredentials::new("testuser".to_string(), "test_session_key".to_string())
}

fn wonderwall_criteria() -> EditCriteria {
    EditCriteria {
        original_track: "Wonderwall".to_string(),
        original_album: "(What's the Story) Morning Glory?".to_string(),
        original_artist: "Oasis".to_string(),
        corrected_track: "Wonderwall (Remastered)".to_string(),
        corrected_album: "(What's the Story) Morning Glory?".to_string(),
        corrected_artist: "Oasis".to_string(),
    }
}

const COOKIES: &str = "csrftoken=abc; sessionid=xyz";

#[tokio::test]
async fn test_full_bulk_edit_round_trip() {
    let http = ScriptedHttpClient::new();

    // 14-day window: one matching scrobble among others.
    http.push_response(
        200,
        &recent_tracks_page(
            &[
                ("Some Other Song", "Blur", "Parklife", Some(1700000100)),
                (
                    "Wonderwall",
                    "Oasis",
                    "(What's the Story) Morning Glory?",
                    Some(1699999999),
                ),
                ("Live Forever", "Oasis", "Definitely Maybe", Some(1699999000)),
            ],
            1,
            1,
        ),
    );
    // The web delete, then the batched recreation.
    http.push_response(200, "{}");
    http.push_response(
        200,
        r#"{"scrobbles": {"@attr": {"accepted": 1, "ignored": 0}}}"#,
    );

    let root = temp_root("round-trip");
    let outcome = orchestrator(&http, root.clone())
        .run(&session(), &wonderwall_criteria(), COOKIES)
        .await
        .unwrap();

    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.created, 1);

    let requests = http.requests();
    assert_eq!(requests.len(), 3);

    // Deletion goes to the cookie-authenticated web endpoint with the
    // CSRF token from the cookie string and the original timestamp.
    let delete = &requests[1];
    assert_eq!(delete.method, "POST");
    assert_eq!(
        delete.url,
        "https://www.example.test/user/testuser/library/delete"
    );
    assert_eq!(delete.cookie.as_deref(), Some(COOKIES));
    assert_eq!(
        delete.referer.as_deref(),
        Some("https://www.example.test/user/testuser")
    );
    assert!(delete.body.contains("csrfmiddlewaretoken=abc"));
    assert!(delete.body.contains("artist_name=Oasis"));
    assert!(delete.body.contains("track_name=Wonderwall"));
    assert!(delete.body.contains("timestamp=1699999999"));

    // Recreation is one signed batch preserving the original timestamp.
    let submit = &requests[2];
    assert_eq!(submit.method, "POST");
    assert!(submit.url.starts_with("https://ws.example.test/2.0/"));
    assert!(submit.body.contains("method=track.scrobble"));
    assert!(submit.body.contains("sk=test_session_key"));
    assert!(submit
        .body
        .contains("track%5B0%5D=Wonderwall%20%28Remastered%29"));
    assert!(submit.body.contains("timestamp%5B0%5D=1699999999"));
    assert!(submit.body.contains("api_sig="));
    assert!(submit.body.contains("format=json"));

    // The edit landed in the local history, keyed by the original triple.
    let store = EditHistoryStore::open_under(&root, "testuser").unwrap();
    assert_eq!(store.entries().len(), 1);
    assert_eq!(
        store.entries()[0].key(),
        ("Oasis", "(What's the Story) Morning Glory?", "Wonderwall")
    );
    assert_eq!(
        store.entries()[0].corrected_track,
        "Wonderwall (Remastered)"
    );
}

#[tokio::test]
async fn test_zero_matches_is_noop_success() {
    let http = ScriptedHttpClient::new();
    http.push_response(
        200,
        &recent_tracks_page(
            &[("Some Other Song", "Blur", "Parklife", Some(1700000100))],
            1,
            1,
        ),
    );

    let root = temp_root("zero-match");
    let outcome = orchestrator(&http, root.clone())
        .run(&session(), &wonderwall_criteria(), COOKIES)
        .await
        .unwrap();

    assert_eq!(outcome.matched, 0);
    assert_eq!(outcome.deleted, 0);
    assert_eq!(outcome.created, 0);

    // Only the history fetch went out: nothing to delete or recreate.
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn test_delete_failure_is_fail_fast_and_skips_recreation() {
    let http = ScriptedHttpClient::new();

    // Five matching scrobbles in the window.
    let tracks: Vec<(&str, &str, &str, Option<u64>)> = (0..5)
        .map(|i| {
            (
                "Wonderwall",
                "Oasis",
                "(What's the Story) Morning Glory?",
                Some(1699999000 + i as u64),
            )
        })
        .collect();
    http.push_response(200, &recent_tracks_page(&tracks, 1, 1));

    // First delete succeeds, second fails; no further responses queued.
    http.push_response(200, "{}");
    http.push_response(403, "");

    let root = temp_root("fail-fast");
    let result = orchestrator(&http, root.clone())
        .run(&session(), &wonderwall_criteria(), COOKIES)
        .await;

    match result {
        Err(ScrobbleMendError::Delete { completed, .. }) => assert_eq!(completed, 1),
        other => panic!("expected delete error, got {other:?}"),
    }

    // Exactly one fetch and two delete attempts: records 3-5 were never
    // tried, and no recreation request was sent.
    let requests = http.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1].url.ends_with("/library/delete"));
    assert!(requests[2].url.ends_with("/library/delete"));
    assert!(!requests
        .iter()
        .any(|r| r.body.contains("method=track.scrobble")));

    // Nothing recorded in history for a failed edit.
    let store = EditHistoryStore::open_under(&root, "testuser").unwrap();
    assert!(store.entries().is_empty());
}

#[tokio::test]
async fn test_validation_rejects_before_any_network_call() {
    let http = ScriptedHttpClient::new();
    let root = temp_root("validation");

    let mut criteria = wonderwall_criteria();
    criteria.original_artist = String::new();

    let result = orchestrator(&http, root)
        .run(&session(), &criteria, COOKIES)
        .await;
    assert!(matches!(result, Err(ScrobbleMendError::Validation(_))));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_missing_cookies_rejected_before_network() {
    let http = ScriptedHttpClient::new();
    let root = temp_root("no-cookies");

    let result = orchestrator(&http, root)
        .run(&session(), &wonderwall_criteria(), "  ")
        .await;
    assert!(matches!(result, Err(ScrobbleMendError::Validation(_))));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_rejected_batch_submission_is_hard_failure() {
    let http = ScriptedHttpClient::new();
    http.push_response(
        200,
        &recent_tracks_page(
            &[(
                "Wonderwall",
                "Oasis",
                "(What's the Story) Morning Glory?",
                Some(1699999999),
            )],
            1,
            1,
        ),
    );
    http.push_response(200, "{}");
    http.push_response(200, r#"{"error": 9, "message": "Invalid session key"}"#);

    let root = temp_root("submit-reject");
    let result = orchestrator(&http, root.clone())
        .run(&session(), &wonderwall_criteria(), COOKIES)
        .await;

    match result {
        Err(ScrobbleMendError::Submit(message)) => {
            assert!(message.contains("Invalid session key"));
        }
        other => panic!("expected submit error, got {other:?}"),
    }

    // No retry: exactly one submission attempt went out.
    let submissions = http
        .requests()
        .iter()
        .filter(|r| r.body.contains("method=track.scrobble"))
        .count();
    assert_eq!(submissions, 1);

    // A failed edit is not recorded in history.
    let store = EditHistoryStore::open_under(&root, "testuser").unwrap();
    assert!(store.entries().is_empty());
}

#[tokio::test]
async fn test_now_playing_record_is_never_deleted() {
    let http = ScriptedHttpClient::new();
    http.push_response(
        200,
        &recent_tracks_page(
            &[
                // Now playing the very track being edited.
                (
                    "Wonderwall",
                    "Oasis",
                    "(What's the Story) Morning Glory?",
                    None,
                ),
                (
                    "Wonderwall",
                    "Oasis",
                    "(What's the Story) Morning Glory?",
                    Some(1699999999),
                ),
            ],
            1,
            1,
        ),
    );
    http.push_response(200, "{}");
    http.push_response(
        200,
        r#"{"scrobbles": {"@attr": {"accepted": 1, "ignored": 0}}}"#,
    );

    let root = temp_root("now-playing");
    let outcome = orchestrator(&http, root)
        .run(&session(), &wonderwall_criteria(), COOKIES)
        .await
        .unwrap();

    // Only the completed scrobble was touched.
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.deleted, 1);

    let deletes: Vec<_> = http
        .requests()
        .into_iter()
        .filter(|r| r.url.ends_with("/library/delete"))
        .collect();
    assert_eq!(deletes.len(), 1);
    assert!(deletes[0].body.contains("timestamp=1699999999"));
}

#[tokio::test]
async fn test_cancellation_stops_delete_loop_before_first_request() {
    let http = ScriptedHttpClient::new();
    http.push_response(
        200,
        &recent_tracks_page(
            &[(
                "Wonderwall",
                "Oasis",
                "(What's the Story) Morning Glory?",
                Some(1699999999),
            )],
            1,
            1,
        ),
    );

    let root = temp_root("cancelled");
    let orchestrator = orchestrator(&http, root);
    orchestrator.cancellation().cancel();

    let result = orchestrator
        .run(&session(), &wonderwall_criteria(), COOKIES)
        .await;
    match result {
        Err(ScrobbleMendError::Delete { completed, message }) => {
            assert_eq!(completed, 0);
            assert!(message.contains("cancelled"));
        }
        other => panic!("expected cancelled delete, got {other:?}"),
    }

    // The fetch happened, but no delete request was ever sent.
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn test_session_exchange_builds_signed_request() {
    let http = ScriptedHttpClient::new();
    http.push_response(
        200,
        r#"{"session": {"name": "testuser", "key": "the_session_key", "subscriber": 0}}"#,
    );

    let credentials = api(&http).get_session("one_time_token").await.unwrap();
    assert_eq!(
        credentials,
        SessionCredentials::new("testuser".to_string(), "the_session_key".to_string())
    );

    let request = &http.requests()[0];
    assert_eq!(request.method, "GET");
    assert!(request.url.contains("method=auth.getSession"));
    assert!(request.url.contains("token=one_time_token"));
    assert!(request.url.contains("api_key=test_key"));
    assert!(request.url.contains("api_sig="));
    assert!(request.url.contains("format=json"));
}

#[tokio::test]
async fn test_delete_target_derived_from_username() {
    // delete_one builds its target from the username, not from the record.
    let http = ScriptedHttpClient::new();
    http.push_response(200, "{}");

    let deleter = ScrobbleDeleter::new(api(&http).http(), WWW_URL);
    let record = ScrobbleRecord {
        track: "Wonderwall".to_string(),
        artist: "Oasis".to_string(),
        album: "(What's the Story) Morning Glory?".to_string(),
        album_id: String::new(),
        timestamp: Some(1699999999),
    };
    deleter
        .delete_one(&record, "someone_else", COOKIES)
        .await
        .unwrap();

    assert_eq!(
        http.requests()[0].url,
        "https://www.example.test/user/someone_else/library/delete"
    );
}
