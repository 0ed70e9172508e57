//! Helpers for object keys.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except unreserved characters and `/`.
static KEY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Percent-encode an object key for use in a URL path.
///
/// Every byte except unreserved characters is encoded, but `/` is kept
/// literally so the key reads as a path.
///
/// ```
/// assert_eq!(qcos::encode_key("photos/2024/a b.jpg"), "photos/2024/a%20b.jpg");
/// ```
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, &KEY_ENCODE_SET).to_string()
}

/// Decode a key or key segment produced by [`encode_key`].
pub fn decode_key(key: &str) -> String {
    percent_decode_str(key).decode_utf8_lossy().into_owned()
}

/// Split a key into its path segments.
///
/// One leading `/` is stripped first, so `"/"` yields a single empty segment.
pub fn explode_key(key: &str) -> Vec<&str> {
    key.strip_prefix('/').unwrap_or(key).split('/').collect()
}
