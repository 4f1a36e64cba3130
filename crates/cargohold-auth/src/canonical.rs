//! Canonical request construction for AWS Signature Version 4.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters that must be percent-encoded in URI path segments: everything
/// except unreserved characters (`A-Z a-z 0-9 - _ . ~`). Forward slashes in
/// the path are preserved.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Build the full canonical request string from its components.
///
/// ```
/// use cargohold_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     &[("host", "examplebucket.s3.amazonaws.com")],
///     &["host"],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(uri);
    let canonical_query = build_canonical_query_string(query_string);
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI by percent-encoding each path segment individually.
///
/// Forward slashes are preserved; an empty path normalizes to `/`.
///
/// ```
/// use cargohold_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/test.txt"), "/test.txt");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            // Decode first so an already-encoded path doesn't get double-encoded.
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            uri_encode(&decoded)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string: sort parameters by key, then value.
///
/// Raw values are preserved as-is; different clients percent-encode
/// differently when signing (AWS SDKs encode `:` and `*`, some S3-compatible
/// clients don't), and the server must reproduce exactly what the client
/// signed rather than re-normalize it.
///
/// ```
/// use cargohold_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string("b=2&a=1"), "a=1&b=2");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();

    params.sort_unstable();

    params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

/// Build the canonical headers string: lowercase names, collapsed
/// whitespace values, sorted by name, one `name:value` line per signed
/// header (no trailing newline — the caller adds the blank-line separator).
///
/// ```
/// use cargohold_auth::canonical::build_canonical_headers;
///
/// let headers = vec![("Host", "example.com"), ("X-Amz-Date", "20130524T000000Z")];
/// let signed = vec!["host", "x-amz-date"];
/// let result = build_canonical_headers(&headers, &signed);
/// assert!(result.contains("host:example.com"));
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let lower_name = name.to_lowercase();
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(lower_name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the `SignedHeaders` string: lowercase names, semicolon-separated, sorted.
///
/// ```
/// use cargohold_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(build_signed_headers_string(&["x-amz-date", "host"]), "host;x-amz-date");
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
