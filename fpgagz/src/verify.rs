//! Round-trip verification of device output.
//!
//! The device output is trusted only after it decompresses back to exactly
//! the bytes that were sent. Decompression reads every concatenated gzip
//! member to the end and tolerates zero padding after a member.

use {
    crate::error::{Error, Result},
    flate2::bufread::GzDecoder,
    std::{io, io::Read},
};

/// Why a round trip failed.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The response is not a valid gzip stream.
    #[error("decompression failed: {0}")]
    DecompressionFailed(#[source] io::Error),
    /// The response decompressed to something other than the input.
    #[error(
        "content mismatch{} ({actual_len} bytes decompressed, {expected_len} expected)",
        .first_difference.map_or_else(String::new, |offset| format!(" at byte {offset}"))
    )]
    ContentMismatch {
        /// Length of the original input.
        expected_len: usize,
        /// Length of the decompressed response.
        actual_len: usize,
        /// Offset of the first differing byte, if the common prefix differs.
        first_difference: Option<usize>,
    },
}

impl From<VerifyError> for Error {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::DecompressionFailed(e) => Self::DecompressionFailed(e),
            VerifyError::ContentMismatch {
                expected_len,
                actual_len,
                ..
            } => Self::ContentMismatch {
                expected_len,
                actual_len,
            },
        }
    }
}

/// Outcome of a round-trip check.
#[derive(Debug)]
pub struct VerificationResult {
    /// Decompressed bytes; empty if decompression failed.
    pub decompressed: Vec<u8>,
    /// True iff the decompressed bytes equal the original input.
    pub matched: bool,
    /// Failure detail; set exactly when `matched` is false.
    pub error: Option<VerifyError>,
}

impl VerificationResult {
    /// Convert into a `Result` carrying the decompressed bytes.
    pub fn into_result(self) -> Result<Vec<u8>> {
        debug_assert_eq!(self.matched, self.error.is_none());
        match self.error {
            None => Ok(self.decompressed),
            Some(err) => Err(err.into()),
        }
    }
}

/// Decompress everything in `data`, following concatenated members.
///
/// Zero bytes after a complete member are padding and are skipped, the way
/// gzip(1) and Python's `gzip.decompress` do. Anything else after a member
/// must be another member.
pub fn gunzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len().saturating_mul(2));
    let mut rest = data;
    loop {
        let mut member = GzDecoder::new(rest);
        member.read_to_end(&mut out)?;
        rest = member.into_inner();

        let padding = rest
            .iter()
            .take_while(|&&b| b == 0)
            .count();
        rest = &rest[padding..];
        if rest.is_empty() {
            return Ok(out);
        }
    }
}

/// Check that `compressed` decompresses to exactly `original`.
pub fn verify(original: &[u8], compressed: &[u8]) -> VerificationResult {
    let decompressed = match gunzip(compressed) {
        Ok(data) => data,
        Err(e) => {
            log::debug!("Decompression of {} bytes failed: {e}", compressed.len());
            return VerificationResult {
                decompressed: Vec::new(),
                matched: false,
                error: Some(VerifyError::DecompressionFailed(e)),
            };
        },
    };

    if decompressed == original {
        return VerificationResult {
            decompressed,
            matched: true,
            error: None,
        };
    }

    let first_difference = original
        .iter()
        .zip(&decompressed)
        .position(|(a, b)| a != b);
    let error = VerifyError::ContentMismatch {
        expected_len: original.len(),
        actual_len: decompressed.len(),
        first_difference,
    };
    log::debug!("Verification failed: {error}");

    VerificationResult {
        decompressed,
        matched: false,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        flate2::{Compression, write::GzEncoder},
        std::io::Write,
    };

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_verify_matching_stream() {
        let data = b"The quick brown fox jumps over the lazy dog".repeat(20);
        let result = verify(&data, &gzip(&data));

        assert!(result.matched);
        assert!(result.error.is_none());
        assert_eq!(result.decompressed, data);
        assert_eq!(result.into_result().unwrap(), data);
    }

    #[test]
    fn test_verify_content_mismatch() {
        let result = verify(b"abc", &gzip(b"abd"));

        assert!(!result.matched);
        assert_eq!(result.decompressed, b"abd");
        match &result.error {
            Some(VerifyError::ContentMismatch {
                expected_len: 3,
                actual_len: 3,
                first_difference: Some(2),
            }) => {},
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            result.into_result(),
            Err(Error::ContentMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_length_mismatch() {
        let result = verify(b"abcdef", &gzip(b"abc"));

        assert!(!result.matched);
        assert!(matches!(
            result.error,
            Some(VerifyError::ContentMismatch {
                expected_len: 6,
                actual_len: 3,
                first_difference: None,
            })
        ));
    }

    #[test]
    fn test_verify_garbage_is_decompression_failure() {
        let result = verify(b"abc", b"this is not gzip at all");

        assert!(!result.matched);
        assert!(result.decompressed.is_empty());
        assert!(matches!(
            result.error,
            Some(VerifyError::DecompressionFailed(_))
        ));
        let err = result.into_result().unwrap_err();
        assert!(err.is_verification_failure());
    }

    #[test]
    fn test_verify_truncated_stream() {
        let data = vec![7u8; 4096];
        let compressed = gzip(&data);
        let result = verify(&data, &compressed[..compressed.len() - 4]);

        assert!(!result.matched);
        assert!(matches!(
            result.error,
            Some(VerifyError::DecompressionFailed(_))
        ));
    }

    #[test]
    fn test_verify_concatenated_members() {
        let mut compressed = gzip(b"hello, ");
        compressed.extend(gzip(b"world"));

        let result = verify(b"hello, world", &compressed);

        assert!(result.matched);
    }

    #[test]
    fn test_verify_accepts_trailing_zero_padding() {
        let mut compressed = gzip(b"abc");
        compressed.extend([0u8; 8]);

        let result = verify(b"abc", &compressed);

        assert!(result.matched, "padding rejected: {:?}", result.error);
        assert_eq!(result.decompressed, b"abc");
    }

    #[test]
    fn test_verify_accepts_padding_between_members() {
        let mut compressed = gzip(b"hello, ");
        compressed.extend([0u8; 3]);
        compressed.extend(gzip(b"world"));
        compressed.push(0);

        assert!(verify(b"hello, world", &compressed).matched);
    }

    #[test]
    fn test_verify_rejects_garbage_after_member() {
        let mut compressed = gzip(b"abc");
        compressed.extend(b"\0\0junk");

        let result = verify(b"abc", &compressed);

        assert!(!result.matched);
        assert!(matches!(
            result.error,
            Some(VerifyError::DecompressionFailed(_))
        ));
    }

    #[test]
    fn test_verify_empty_input() {
        assert!(verify(b"", &gzip(b"")).matched);
        assert!(!verify(b"", &gzip(b"x")).matched);
    }

    #[test]
    fn test_verify_error_display() {
        let err = VerifyError::ContentMismatch {
            expected_len: 3,
            actual_len: 3,
            first_difference: Some(2),
        };
        assert_eq!(
            err.to_string(),
            "content mismatch at byte 2 (3 bytes decompressed, 3 expected)"
        );

        let err = VerifyError::ContentMismatch {
            expected_len: 6,
            actual_len: 3,
            first_difference: None,
        };
        assert_eq!(
            err.to_string(),
            "content mismatch (3 bytes decompressed, 6 expected)"
        );

        let err = VerifyError::DecompressionFailed(io::Error::new(
            io::ErrorKind::InvalidData,
            "bad header",
        ));
        assert_eq!(err.to_string(), "decompression failed: bad header");
        assert!(std::error::Error::source(&err).is_some());
    }
}
