//! Request headers for the unofficial web endpoint.
//!
//! The delete call mimics the authenticated web UI's own form
//! submission, so it has to look like a browser: realistic user agent,
//! the usual accept headers, the profile page as referer, and the raw
//! browser cookies passed straight through.

use http_client::Request;

/// Common Chrome user agent string for all web-endpoint requests
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

const SEC_CH_UA: &str =
    "\"Not)A;Brand\";v=\"8\", \"Chromium\";v=\"138\", \"Google Chrome\";v=\"138\"";
const SEC_CH_UA_MOBILE: &str = "?0";
const SEC_CH_UA_PLATFORM: &str = "\"Linux\"";

/// Add common browser headers to a request
pub fn add_common_headers(request: &mut Request) {
    let _ = request.insert_header("User-Agent", USER_AGENT);
    let _ = request.insert_header("Accept-Language", "en-US,en;q=0.9");
    let _ = request.insert_header("Accept-Encoding", "gzip, deflate, br");
    let _ = request.insert_header("DNT", "1");
    let _ = request.insert_header("Connection", "keep-alive");
    let _ = request.insert_header("sec-ch-ua", SEC_CH_UA);
    let _ = request.insert_header("sec-ch-ua-mobile", SEC_CH_UA_MOBILE);
    let _ = request.insert_header("sec-ch-ua-platform", SEC_CH_UA_PLATFORM);
}

/// Add headers for a form POST against the web UI's own endpoints
pub fn add_form_headers(request: &mut Request, referer_url: &str) {
    add_common_headers(request);
    let _ = request.insert_header("Accept", "*/*");
    let _ = request.insert_header(
        "Content-Type",
        "application/x-www-form-urlencoded;charset=UTF-8",
    );
    let _ = request.insert_header("Sec-Fetch-Dest", "empty");
    let _ = request.insert_header("Sec-Fetch-Mode", "cors");
    let _ = request.insert_header("Sec-Fetch-Site", "same-origin");
    let _ = request.insert_header("Referer", referer_url);
}

/// Attach a raw browser cookie string to a request if non-empty
pub fn add_raw_cookies(request: &mut Request, cookie_header: &str) {
    if !cookie_header.is_empty() {
        let _ = request.insert_header("Cookie", cookie_header);
    }
}
