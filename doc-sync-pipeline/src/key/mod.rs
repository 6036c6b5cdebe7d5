//! Storage key codec.
//!
//! Decodes a raw storage object key of the shape
//! `{siteId}/{branch}/raw/{relativePath}` into its parts, undoing the
//! storage provider's URL-encoding quirks and rejecting identifiers that
//! could smuggle path traversal or injection through the notification.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::PipelineError;
use doc_sync_shared::ObjectKey;

/// Expected overall key shape: `{siteId}/{branch}/raw/{relativePath}`.
static KEY_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^/]+)/([^/]+)/raw/(.+)$").expect("valid key shape regex"));

/// Restrictive charset for site and branch identifiers.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+$").expect("valid identifier regex"));

/// Decode a raw storage key into `(site_id, branch, path)`.
///
/// The provider encodes spaces in object keys as `+`, so literal `+`
/// characters are converted to spaces *before* percent-decoding;
/// percent-decoding alone would turn an encoded `+` (`%2B`) and an encoded
/// space into the same character and corrupt filenames containing spaces.
///
/// The path segment is returned unvalidated beyond the outer match;
/// markdown-suffix filtering happens later in the pipeline.
///
/// # Returns
///
/// * `Ok(ObjectKey)` - The decoded key
/// * `Err(PipelineError::InvalidKeyFormat)` - If the key does not match the
///   expected shape
/// * `Err(PipelineError::InvalidIdentifier)` - If the site or branch segment
///   carries characters outside `[\w-]`
pub fn decode(raw_key: &str) -> Result<ObjectKey, PipelineError> {
    let decoded = urlencoding::decode(&raw_key.replace('+', " "))
        .map_err(|e| PipelineError::invalid_key(format!("{}: {}", raw_key, e)))?;

    let captures = KEY_SHAPE
        .captures(&decoded)
        .ok_or_else(|| PipelineError::invalid_key(decoded.to_string()))?;

    let site_id = captures[1].to_string();
    let branch = captures[2].to_string();
    let path = captures[3].to_string();

    for segment in [&site_id, &branch] {
        if !IDENTIFIER.is_match(segment) {
            return Err(PipelineError::invalid_identifier(segment.clone()));
        }
    }

    Ok(ObjectKey {
        site_id,
        branch,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_simple_key() {
        let key = decode("site1/main/raw/articles/test.md").unwrap();
        assert_eq!(key.site_id, "site1");
        assert_eq!(key.branch, "main");
        assert_eq!(key.path, "articles/test.md");
    }

    #[test]
    fn test_decode_plus_becomes_space() {
        let key = decode("site1/main/raw/my+notes/daily+log.md").unwrap();
        assert_eq!(key.path, "my notes/daily log.md");
    }

    #[test]
    fn test_decode_percent_encoding() {
        let key = decode("site1/main/raw/caf%C3%A9.md").unwrap();
        assert_eq!(key.path, "café.md");
    }

    #[test]
    fn test_decode_plus_before_percent_decoding() {
        // An encoded "+" must survive as a literal "+" while a "+" in the
        // raw key becomes a space.
        let key = decode("site1/main/raw/a%2Bb+c.md").unwrap();
        assert_eq!(key.path, "a+b c.md");
    }

    #[test]
    fn test_decode_missing_raw_segment() {
        let err = decode("site1/main/articles/test.md").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidKeyFormat(_)));
    }

    #[test]
    fn test_decode_empty_segments() {
        assert!(matches!(
            decode("/main/raw/test.md").unwrap_err(),
            PipelineError::InvalidKeyFormat(_)
        ));
        assert!(matches!(
            decode("site1//raw/test.md").unwrap_err(),
            PipelineError::InvalidKeyFormat(_)
        ));
        assert!(matches!(
            decode("site1/main/raw/").unwrap_err(),
            PipelineError::InvalidKeyFormat(_)
        ));
    }

    #[test]
    fn test_decode_rejects_traversal_identifiers() {
        let err = decode("../../etc/main/raw/test.md").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidKeyFormat(_) | PipelineError::InvalidIdentifier(_)
        ));

        let err = decode("site..1/main/raw/test.md").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_decode_rejects_disallowed_chars() {
        let err = decode("site$1/main/raw/test.md").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidIdentifier(_)));

        let err = decode("site1/ma!in/raw/test.md").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_decode_allows_word_chars_and_hyphen() {
        let key = decode("my-site_2/release-v1/raw/doc.md").unwrap();
        assert_eq!(key.site_id, "my-site_2");
        assert_eq!(key.branch, "release-v1");
    }

    #[test]
    fn test_path_returned_unfiltered() {
        // Non-markdown paths decode fine; filtering is the pipeline's job.
        let key = decode("site1/main/raw/images/photo.png").unwrap();
        assert_eq!(key.path, "images/photo.png");
    }
}
