//! Snapshot locators: `scheme://bucket/key` references to ciphertext objects.

use std::fmt;
use url::Url;

use super::error::{PipelineError, Result};

/// A parsed reference to one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLocator {
    raw: String,
    bucket: String,
    key: String,
}

impl SnapshotLocator {
    /// Decompose a locator into bucket (the URL host) and key (the path
    /// without its leading slash, percent-decoded).
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| PipelineError::locator(raw, e.to_string()))?;

        let bucket = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(PipelineError::locator(raw, "missing bucket")),
        };

        let key = urlencoding::decode(url.path().trim_start_matches('/'))
            .map_err(|_| PipelineError::locator(raw, "object key is not valid UTF-8"))?
            .into_owned();
        if key.is_empty() {
            return Err(PipelineError::locator(raw, "missing object key"));
        }

        Ok(Self { raw: raw.to_string(), bucket, key })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for SnapshotLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_key() {
        let locator = SnapshotLocator::parse("s3://bucket1/snap.enc").unwrap();
        assert_eq!(locator.bucket(), "bucket1");
        assert_eq!(locator.key(), "snap.enc");
        assert_eq!(locator.to_string(), "s3://bucket1/snap.enc");
    }

    #[test]
    fn test_parse_nested_key() {
        let locator = SnapshotLocator::parse("storage://bucket1/daily/2024-01-01/snap.enc").unwrap();
        assert_eq!(locator.bucket(), "bucket1");
        assert_eq!(locator.key(), "daily/2024-01-01/snap.enc");
    }

    #[test]
    fn test_parse_decodes_key() {
        let locator = SnapshotLocator::parse("s3://bucket1/snap%201.enc").unwrap();
        assert_eq!(locator.key(), "snap 1.enc");
    }

    #[test]
    fn test_parse_rejects_key_that_decodes_to_invalid_utf8() {
        let err = SnapshotLocator::parse("s3://bucket1/snap%FF.enc").unwrap_err();
        assert!(err.to_string().ends_with("object key is not valid UTF-8"), "{}", err);
    }

    #[test]
    fn test_parse_errors() {
        for raw in ["", "bucket1/snap.enc", "s3://bucket1", "s3://bucket1/", "s3:///snap.enc"] {
            let err = SnapshotLocator::parse(raw).unwrap_err();
            assert!(matches!(err, PipelineError::LocatorParseError { .. }), "{}", raw);
        }
    }

    #[test]
    fn test_parse_error_message_names_locator() {
        let err = SnapshotLocator::parse("s3://bucket1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to parse url (s3://bucket1) for latest snapshot id from backups index: missing object key"
        );
    }
}
