//! `aws-chunked` streaming payload decode and per-chunk signature
//! verification.
//!
//! Stripping the wire framing is only half the job: every chunk (and, in
//! trailer mode, the trailer block) is verified against a rolling HMAC
//! chain seeded by the outer request's `Authorization` signature, using the
//! same SigV4 primitives the header/presigned validators use.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};
use cargohold_auth::sigv4::{compute_signature, derive_signing_key, hash_payload};
use subtle::ConstantTimeEq;

/// Everything the chunk validator needs that isn't in the chunked body
/// itself: the signing key material and the seed signature carried over
/// from the outer request's `Authorization` header.
#[derive(Debug, Clone)]
pub struct ChunkSigningContext {
    /// The secret key of the request's authenticated user.
    pub secret_key: String,
    /// Credential scope date, `YYYYMMDD`.
    pub date: String,
    /// Credential scope region.
    pub region: String,
    /// Credential scope service (always `s3`).
    pub service: String,
    /// The full `x-amz-date` timestamp, e.g. `20230101T000000Z`.
    pub amz_date: String,
    /// The outer request's signature; the seed for chunk 0's `prevSignature`.
    pub seed_signature: String,
    /// Trailer names declared via `x-amz-trailer`, in the order they were
    /// listed. Empty when the request isn't in trailer mode.
    pub trailer_names: Vec<String>,
}

/// The decoded payload plus any trailer key/value pairs that followed it.
#[derive(Debug, Clone)]
pub struct DecodedChunkedBody {
    /// The concatenated, verified chunk payload.
    pub payload: Bytes,
    /// Trailer values, present only in trailer mode.
    pub trailers: BTreeMap<String, String>,
}

/// An error decoding or verifying an `aws-chunked` body.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChunkedError {
    /// The chunk framing itself was malformed.
    #[error("malformed chunked body: {0}")]
    Malformed(String),
    /// A chunk's or the trailer's signature did not match.
    #[error("chunk signature does not match")]
    SignatureMismatch,
}

/// Whether `x-amz-content-sha256` declares an `aws-chunked` streaming body.
#[must_use]
pub fn is_streaming_payload(content_sha256: &str) -> bool {
    content_sha256.starts_with("STREAMING-")
}

/// Decode and verify an `aws-chunked` body against `ctx`.
///
/// # Errors
///
/// Returns [`ChunkedError`] on malformed framing or a chunk/trailer
/// signature mismatch.
pub fn decode_and_verify(body: &[u8], ctx: &ChunkSigningContext) -> Result<DecodedChunkedBody, ChunkedError> {
    let credential_scope = format!("{}/{}/{}/aws4_request", ctx.date, ctx.region, ctx.service);
    let signing_key = derive_signing_key(&ctx.secret_key, &ctx.date, &ctx.region, &ctx.service);

    let mut cursor = 0usize;
    let mut prev_signature = ctx.seed_signature.clone();
    let mut payload = BytesMut::new();

    loop {
        let (size, chunk_signature, header_len) = parse_chunk_header(&body[cursor..])?;
        cursor += header_len;

        if cursor + size > body.len() {
            return Err(ChunkedError::Malformed("chunk data runs past end of body".to_owned()));
        }
        let data = &body[cursor..cursor + size];
        cursor += size;
        cursor += expect_crlf(&body[cursor..])?;

        verify_chunk_signature(&signing_key, &ctx.amz_date, &credential_scope, &prev_signature, data, &chunk_signature)?;
        prev_signature = chunk_signature;

        if size == 0 {
            let trailers = if ctx.trailer_names.is_empty() {
                BTreeMap::new()
            } else {
                let (trailers, consumed) = parse_trailers(&body[cursor..], &ctx.trailer_names)?;
                cursor += consumed;
                verify_trailer_signature(&signing_key, &ctx.amz_date, &credential_scope, &prev_signature, &trailers, &ctx.trailer_names, &body[cursor..])?;
                trailers
            };
            return Ok(DecodedChunkedBody { payload: payload.freeze(), trailers });
        }

        payload.extend_from_slice(data);
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn expect_crlf(buf: &[u8]) -> Result<usize, ChunkedError> {
    if buf.len() >= 2 && &buf[..2] == b"\r\n" {
        Ok(2)
    } else {
        Err(ChunkedError::Malformed("expected CRLF after chunk data".to_owned()))
    }
}

/// Parse a `<hexSize>;chunk-signature=<hex>\r\n` line. Returns the chunk
/// size, its signature, and the number of bytes the header line occupied
/// (including the trailing CRLF).
fn parse_chunk_header(buf: &[u8]) -> Result<(usize, String, usize), ChunkedError> {
    let line_end = find_crlf(buf).ok_or_else(|| ChunkedError::Malformed("missing chunk header CRLF".to_owned()))?;
    let line = std::str::from_utf8(&buf[..line_end]).map_err(|_| ChunkedError::Malformed("non-UTF-8 chunk header".to_owned()))?;

    let (size_str, ext) = line.split_once(';').ok_or_else(|| ChunkedError::Malformed("missing chunk-signature extension".to_owned()))?;
    let size = usize::from_str_radix(size_str.trim(), 16).map_err(|_| ChunkedError::Malformed(format!("invalid chunk size '{size_str}'")))?;

    let signature = ext
        .trim()
        .strip_prefix("chunk-signature=")
        .ok_or_else(|| ChunkedError::Malformed("missing chunk-signature=".to_owned()))?
        .to_owned();

    Ok((size, signature, line_end + 2))
}

fn verify_chunk_signature(
    signing_key: &[u8],
    amz_date: &str,
    credential_scope: &str,
    prev_signature: &str,
    data: &[u8],
    signature: &str,
) -> Result<(), ChunkedError> {
    let string_to_sign = build_chunk_string_to_sign(amz_date, credential_scope, prev_signature, &hash_payload(data));
    let expected = compute_signature(signing_key, &string_to_sign);
    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(ChunkedError::SignatureMismatch)
    }
}

fn build_chunk_string_to_sign(amz_date: &str, credential_scope: &str, prev_signature: &str, payload_hash: &str) -> String {
    format!(
        "AWS4-HMAC-SHA256-PAYLOAD\n{amz_date}\n{credential_scope}\n{prev_signature}\n{}\n{payload_hash}",
        hash_payload(b"")
    )
}

/// Parse `[<trailerName>: <val>\r\n]*` lines up to (and including) the
/// blank-line terminator that precedes `x-amz-trailer-signature`. Returns
/// the parsed trailers and the number of bytes consumed.
fn parse_trailers(buf: &[u8], expected_names: &[String]) -> Result<(BTreeMap<String, String>, usize), ChunkedError> {
    let mut cursor = 0usize;
    let mut trailers = BTreeMap::new();

    for _ in expected_names {
        let line_end = find_crlf(&buf[cursor..]).ok_or_else(|| ChunkedError::Malformed("missing trailer line CRLF".to_owned()))?;
        let line = std::str::from_utf8(&buf[cursor..cursor + line_end]).map_err(|_| ChunkedError::Malformed("non-UTF-8 trailer".to_owned()))?;
        let (name, value) = line.split_once(':').ok_or_else(|| ChunkedError::Malformed("malformed trailer line".to_owned()))?;
        trailers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        cursor += line_end + 2;
    }

    Ok((trailers, cursor))
}

fn verify_trailer_signature(
    signing_key: &[u8],
    amz_date: &str,
    credential_scope: &str,
    prev_signature: &str,
    trailers: &BTreeMap<String, String>,
    trailer_names: &[String],
    buf: &[u8],
) -> Result<(), ChunkedError> {
    let line_end = find_crlf(buf).ok_or_else(|| ChunkedError::Malformed("missing trailer signature CRLF".to_owned()))?;
    let line = std::str::from_utf8(&buf[..line_end]).map_err(|_| ChunkedError::Malformed("non-UTF-8 trailer signature".to_owned()))?;
    let signature = line
        .split_once(':')
        .map(|(_, v)| v.trim())
        .ok_or_else(|| ChunkedError::Malformed("missing x-amz-trailer-signature".to_owned()))?;

    let serialized = serialize_trailers(trailers, trailer_names);
    let string_to_sign = build_chunk_string_to_sign(amz_date, credential_scope, prev_signature, &hash_payload(serialized.as_bytes()));
    let expected = compute_signature(signing_key, &string_to_sign);

    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(ChunkedError::SignatureMismatch)
    }
}

fn serialize_trailers(trailers: &BTreeMap<String, String>, trailer_names: &[String]) -> String {
    let mut out = String::new();
    for name in trailer_names {
        let key = name.to_ascii_lowercase();
        if let Some(value) = trailers.get(&key) {
            out.push_str(&key);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
    }
    out
}
