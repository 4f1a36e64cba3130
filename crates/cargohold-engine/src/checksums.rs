//! Streaming and one-shot checksum computation.
//!
//! MD5 (for ETags) is always computed; the four additional algorithms plus
//! CRC64NVME are opt-in via [`ChecksumAlgorithm`]. Values are exchanged as
//! standard base64, matching the `x-amz-checksum-<alg>` wire format.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use cargohold_model::types::ChecksumAlgorithm;
use digest::Digest;

/// Compute the hex-encoded MD5 digest of `data`.
#[must_use]
pub fn compute_md5_hex(data: &[u8]) -> String {
    hex::encode(md5::Md5::digest(data))
}

/// Compute the quoted ETag for single-part object data.
#[must_use]
pub fn compute_etag(data: &[u8]) -> String {
    format!("\"{}\"", compute_md5_hex(data))
}

/// Compute the composite multipart ETag: MD5 of the concatenated binary
/// MD5s of each part, formatted `"<hex>-<n>"`.
///
/// `part_md5_hexes` are the unquoted hex MD5 of each part, in part-number order.
#[must_use]
pub fn compute_multipart_etag(part_md5_hexes: &[String], part_count: usize) -> String {
    let mut combined = Vec::with_capacity(part_md5_hexes.len() * 16);
    for hex_str in part_md5_hexes {
        if let Ok(bytes) = hex::decode(hex_str.trim_matches('"')) {
            combined.extend_from_slice(&bytes);
        }
    }
    let final_md5 = hex::encode(md5::Md5::digest(&combined));
    format!("\"{final_md5}-{part_count}\"")
}

/// Compute a base64-encoded checksum for one algorithm over one buffer.
#[must_use]
pub fn compute_checksum(algorithm: ChecksumAlgorithm, data: &[u8]) -> String {
    match algorithm {
        ChecksumAlgorithm::Crc32 => {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(data);
            BASE64_STANDARD.encode(hasher.finalize().to_be_bytes())
        }
        ChecksumAlgorithm::Crc32c => BASE64_STANDARD.encode(crc32c::crc32c(data).to_be_bytes()),
        ChecksumAlgorithm::Crc64Nvme => {
            let mut digest = crc64fast_nvme::Digest::new();
            digest.write(data);
            BASE64_STANDARD.encode(digest.sum64().to_be_bytes())
        }
        ChecksumAlgorithm::Sha1 => BASE64_STANDARD.encode(sha1::Sha1::digest(data)),
        ChecksumAlgorithm::Sha256 => BASE64_STANDARD.encode(sha2::Sha256::digest(data)),
    }
}

/// Compute the composite checksum for a completed multipart upload: the
/// checksum of the concatenated *decoded* per-part checksums, suffixed with
/// `-<part_count>`.
#[must_use]
pub fn compute_composite_checksum(algorithm: ChecksumAlgorithm, part_checksums_b64: &[String]) -> String {
    let mut combined = Vec::new();
    for b64 in part_checksums_b64 {
        if let Ok(bytes) = BASE64_STANDARD.decode(b64) {
            combined.extend_from_slice(&bytes);
        }
    }
    format!("{}-{}", compute_checksum(algorithm, &combined), part_checksums_b64.len())
}

/// The result of finalizing a [`StreamingHasher`].
#[derive(Debug, Clone)]
pub struct HasherResult {
    /// Hex-encoded MD5 digest (always computed, used for ETags).
    pub md5_hex: String,
    /// Base64-encoded checksum for each algorithm the hasher was built with.
    pub checksums: Vec<(ChecksumAlgorithm, String)>,
}

/// Incrementally computes MD5 plus a caller-selected subset of the other
/// four algorithms over a stream of buffers, without holding the whole
/// payload in memory.
pub struct StreamingHasher {
    md5: md5::Md5,
    sha1: Option<sha1::Sha1>,
    sha256: Option<sha2::Sha256>,
    crc32: Option<crc32fast::Hasher>,
    crc32c: Option<u32>,
    crc64nvme: Option<crc64fast_nvme::Digest>,
    algorithms: Vec<ChecksumAlgorithm>,
}

impl std::fmt::Debug for StreamingHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingHasher")
            .field("md5", &self.md5)
            .field("sha1", &self.sha1)
            .field("sha256", &self.sha256)
            .field("crc32", &self.crc32)
            .field("crc32c", &self.crc32c)
            .field("crc64nvme", &self.crc64nvme.is_some())
            .field("algorithms", &self.algorithms)
            .finish()
    }
}

impl StreamingHasher {
    /// Build a hasher that always tracks MD5 plus the given `algorithms`.
    #[must_use]
    pub fn new(algorithms: &[ChecksumAlgorithm]) -> Self {
        let mut sha1 = None;
        let mut sha256 = None;
        let mut crc32 = None;
        let mut crc32c = None;
        let mut crc64nvme = None;

        for &algo in algorithms {
            match algo {
                ChecksumAlgorithm::Sha1 => sha1 = Some(sha1::Sha1::new()),
                ChecksumAlgorithm::Sha256 => sha256 = Some(sha2::Sha256::new()),
                ChecksumAlgorithm::Crc32 => crc32 = Some(crc32fast::Hasher::new()),
                ChecksumAlgorithm::Crc32c => crc32c = Some(0),
                ChecksumAlgorithm::Crc64Nvme => crc64nvme = Some(crc64fast_nvme::Digest::new()),
            }
        }

        Self { md5: md5::Md5::new(), sha1, sha256, crc32, crc32c, crc64nvme, algorithms: algorithms.to_vec() }
    }

    /// Feed the next buffer of a streamed body into every tracked algorithm.
    pub fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.md5, data);
        if let Some(h) = &mut self.sha1 {
            Digest::update(h, data);
        }
        if let Some(h) = &mut self.sha256 {
            Digest::update(h, data);
        }
        if let Some(h) = &mut self.crc32 {
            h.update(data);
        }
        if let Some(val) = &mut self.crc32c {
            *val = crc32c::crc32c_append(*val, data);
        }
        if let Some(d) = &mut self.crc64nvme {
            d.write(data);
        }
    }

    /// Finalize and return the MD5 hex digest plus any requested checksums.
    #[must_use]
    pub fn finish(self) -> HasherResult {
        let md5_hex = hex::encode(Digest::finalize(self.md5));

        let mut checksums = Vec::with_capacity(self.algorithms.len());
        for algo in &self.algorithms {
            let value = match algo {
                ChecksumAlgorithm::Sha1 => BASE64_STANDARD.encode(Digest::finalize(self.sha1.clone().unwrap_or_default())),
                ChecksumAlgorithm::Sha256 => BASE64_STANDARD.encode(Digest::finalize(self.sha256.clone().unwrap_or_default())),
                ChecksumAlgorithm::Crc32 => {
                    let val = self.crc32.as_ref().map_or(0, |h| h.clone().finalize());
                    BASE64_STANDARD.encode(val.to_be_bytes())
                }
                ChecksumAlgorithm::Crc32c => BASE64_STANDARD.encode(self.crc32c.unwrap_or(0).to_be_bytes()),
                ChecksumAlgorithm::Crc64Nvme => {
                    let val = self.crc64nvme.as_ref().map_or(0, crc64fast_nvme::Digest::sum64);
                    BASE64_STANDARD.encode(val.to_be_bytes())
                }
            };
            checksums.push((*algo, value));
        }

        HasherResult { md5_hex, checksums }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_compute_md5_known_vectors() {
        assert_eq!(compute_md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(compute_md5_hex(b"Hello World"), "b10a8db164e0754105b7a99be72e3fe5");
    }

    #[test]
    fn test_should_compute_quoted_etag() {
        assert_eq!(compute_etag(b"Hello World"), "\"b10a8db164e0754105b7a99be72e3fe5\"");
    }

    #[test]
    fn test_should_compute_multipart_etag_with_part_count_suffix() {
        let p1 = compute_md5_hex(b"Part 1 ");
        let p2 = compute_md5_hex(b"Part 2");
        let etag = compute_multipart_etag(&[p1, p2], 2);
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with("-2\""));
    }

    #[test]
    fn test_should_compute_crc32_matching_known_vector() {
        // base64("ShexVg==") decodes to the CRC32 of "Hello World" per AWS docs.
        assert_eq!(compute_checksum(ChecksumAlgorithm::Crc32, b"Hello World"), "ShexVg==");
    }

    #[test]
    fn test_should_round_trip_all_algorithms_through_base64() {
        for algo in ChecksumAlgorithm::ALL {
            let encoded = compute_checksum(algo, b"test data");
            assert!(BASE64_STANDARD.decode(&encoded).is_ok(), "{algo} did not produce valid base64");
        }
    }

    #[test]
    fn test_should_compute_composite_checksum_with_part_count_suffix() {
        let p1 = compute_checksum(ChecksumAlgorithm::Sha256, b"part1");
        let p2 = compute_checksum(ChecksumAlgorithm::Sha256, b"part2");
        let composite = compute_composite_checksum(ChecksumAlgorithm::Sha256, &[p1, p2]);
        assert!(composite.ends_with("-2"));
    }

    #[test]
    fn test_should_match_streaming_and_one_shot_md5() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut hasher = StreamingHasher::new(&[ChecksumAlgorithm::Sha256]);
        hasher.update(&data[..10]);
        hasher.update(&data[10..]);
        let result = hasher.finish();

        assert_eq!(result.md5_hex, compute_md5_hex(data));
        assert_eq!(result.checksums[0], (ChecksumAlgorithm::Sha256, compute_checksum(ChecksumAlgorithm::Sha256, data)));
    }

    #[test]
    fn test_should_stream_with_no_extra_algorithms() {
        let mut hasher = StreamingHasher::new(&[]);
        hasher.update(b"hello");
        let result = hasher.finish();
        assert_eq!(result.md5_hex, compute_md5_hex(b"hello"));
        assert!(result.checksums.is_empty());
    }

    #[test]
    fn test_should_stream_all_five_algorithms() {
        let mut hasher = StreamingHasher::new(&ChecksumAlgorithm::ALL);
        hasher.update(b"test data");
        let result = hasher.finish();
        assert_eq!(result.checksums.len(), 5);
        for (algo, value) in &result.checksums {
            assert_eq!(*value, compute_checksum(*algo, b"test data"));
        }
    }
}
