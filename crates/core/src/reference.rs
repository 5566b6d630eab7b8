//! Object references
//!
//! An [`ObjectReference`] names one object as a `{connection, bucket, key}`
//! triple. Its canonical string form, `s3://[connection@]bucket/key`, is the
//! identity used by every cache in this crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// URI scheme accepted by the resolvers
pub const SCHEME: &str = "s3://";

/// Identifies one object in an S3-compatible store
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    /// Logical connection name, empty for the default connection
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub connection: String,

    /// Bucket name
    pub bucket: String,

    /// Object key within the bucket
    pub key: String,
}

impl ObjectReference {
    /// Create a reference on the default connection
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            connection: String::new(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Return a copy of this reference bound to `connection`
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    pub fn is_default_connection(&self) -> bool {
        self.connection.is_empty()
    }

    /// Last path segment of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Key prefix up to and including the last `/`, empty at the bucket root
    pub fn parent_prefix(&self) -> &str {
        match self.key.rfind('/') {
            Some(idx) => &self.key[..=idx],
            None => "",
        }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.connection.is_empty() {
            write!(f, "{SCHEME}{}/{}", self.bucket, self.key)
        } else {
            write!(f, "{SCHEME}{}@{}/{}", self.connection, self.bucket, self.key)
        }
    }
}

impl FromStr for ObjectReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_uri(s, "")
    }
}

/// Parse `s3://[connection@]bucket/key`.
///
/// A missing or empty `connection@` prefix resolves to `default_connection`.
/// The key is everything after the first `/` following the bucket and is
/// kept verbatim, nested separators included.
pub(crate) fn parse_uri(s: &str, default_connection: &str) -> Result<ObjectReference> {
    let rest = s
        .strip_prefix(SCHEME)
        .ok_or_else(|| Error::InvalidAddress(format!("expected {SCHEME} scheme: {s}")))?;

    let (authority, key) = rest
        .split_once('/')
        .ok_or_else(|| Error::InvalidAddress(format!("missing key separator: {s}")))?;

    let (connection, bucket) = match authority.split_once('@') {
        Some((connection, bucket)) => (connection, bucket),
        None => ("", authority),
    };

    if bucket.is_empty() {
        return Err(Error::InvalidAddress(format!("missing bucket: {s}")));
    }

    let connection = if connection.is_empty() {
        default_connection
    } else {
        connection
    };

    Ok(ObjectReference {
        connection: connection.to_string(),
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        let r = ObjectReference::new("bucket", "dir/file.txt");
        assert_eq!(r.to_string(), "s3://bucket/dir/file.txt");

        let r = r.with_connection("prod");
        assert_eq!(r.to_string(), "s3://prod@bucket/dir/file.txt");
    }

    #[test]
    fn test_parse_round_trip() {
        for s in [
            "s3://bucket/key",
            "s3://conn@bucket/key",
            "s3://bucket/a/b/c.txt",
            "s3://conn@bucket/",
            "s3://bucket/trailing/",
        ] {
            let r: ObjectReference = s.parse().unwrap();
            assert_eq!(r.to_string(), s);
        }
    }

    #[test]
    fn test_parse_fields() {
        let r = parse_uri("s3://prod@data/logs/2024/01.gz", "default").unwrap();
        assert_eq!(r.connection, "prod");
        assert_eq!(r.bucket, "data");
        assert_eq!(r.key, "logs/2024/01.gz");

        let r = parse_uri("s3://data/k", "default").unwrap();
        assert_eq!(r.connection, "default");

        let r = parse_uri("s3://@data/k", "default").unwrap();
        assert_eq!(r.connection, "default");
    }

    #[test]
    fn test_parse_invalid() {
        for s in ["s3:///key", "s3://bucket", "http://bucket/key", "", "s3://conn@/key"] {
            let err = parse_uri(s, "").unwrap_err();
            assert!(matches!(err, Error::InvalidAddress(_)), "{s}: {err}");
        }
    }

    #[test]
    fn test_key_helpers() {
        let r = ObjectReference::new("b", "a/b/c.txt");
        assert_eq!(r.file_name(), "c.txt");
        assert_eq!(r.parent_prefix(), "a/b/");

        let r = ObjectReference::new("b", "root.txt");
        assert_eq!(r.file_name(), "root.txt");
        assert_eq!(r.parent_prefix(), "");
    }

    #[test]
    fn test_equal_references_share_identity() {
        let a = ObjectReference::new("b", "k").with_connection("c");
        let b: ObjectReference = "s3://c@b/k".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }
}
