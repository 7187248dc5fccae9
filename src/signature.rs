//! API request signing for the upstream web service.
//!
//! Authenticated calls carry an `api_sig` parameter: the MD5 digest of all
//! request parameters sorted by key and concatenated as `key` + `value`
//! with no separators, followed by the shared secret. MD5 here is wire
//! compatibility with the upstream protocol, not a security boundary.

use std::collections::BTreeMap;

/// Parameters the upstream excludes from the signature base string.
const UNSIGNED_PARAMS: &[&str] = &["format", "callback"];

/// Compute the `api_sig` value for a parameter set.
///
/// Keys are sorted in byte order before concatenation, so the order of
/// `params` never affects the result. The digest is rendered as lowercase
/// hexadecimal.
///
/// # Examples
///
/// ```rust
/// use scrobble_mend::signature::api_signature;
///
/// let a = vec![
///     ("a".to_string(), "1".to_string()),
///     ("b".to_string(), "2".to_string()),
/// ];
/// let b = vec![
///     ("b".to_string(), "2".to_string()),
///     ("a".to_string(), "1".to_string()),
/// ];
/// assert_eq!(api_signature(&a, "secret"), api_signature(&b, "secret"));
/// ```
pub fn api_signature(params: &[(String, String)], secret: &str) -> String {
    let sorted: BTreeMap<&str, &str> = params
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();

    let mut base = String::new();
    for (key, value) in sorted {
        if UNSIGNED_PARAMS.contains(&key) {
            continue;
        }
        base.push_str(key);
        base.push_str(value);
    }
    base.push_str(secret);

    format!("{:x}", md5::compute(base.as_bytes()))
}
