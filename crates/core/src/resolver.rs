//! Address resolution
//!
//! Turns address strings into [`ObjectReference`]s. Three shapes are
//! understood, tried in this order by [`Resolver::resolve`]:
//!
//! - URI: `s3://[connection@]bucket/key`
//! - ARN: `arn:aws:s3:::bucket/key`
//! - bare key: `path/to/key`, combined with the configured default bucket

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::reference::{self, ObjectReference};

/// Parses address strings into object references
pub trait Resolver: Send + Sync {
    /// Parse the `s3://[connection@]bucket/key` form
    fn parse_uri(&self, s: &str) -> Result<ObjectReference>;

    /// Parse the `arn:aws:s3:::bucket/key` form
    fn parse_arn(&self, s: &str) -> Result<ObjectReference>;

    /// Try URI, then ARN, then fall back to a bare key in the default bucket
    fn resolve(&self, s: &str) -> Result<ObjectReference>;
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn parse_uri(&self, s: &str) -> Result<ObjectReference> {
        (**self).parse_uri(s)
    }

    fn parse_arn(&self, s: &str) -> Result<ObjectReference> {
        (**self).parse_arn(s)
    }

    fn resolve(&self, s: &str) -> Result<ObjectReference> {
        (**self).resolve(s)
    }
}

impl<R: Resolver + ?Sized> Resolver for Box<R> {
    fn parse_uri(&self, s: &str) -> Result<ObjectReference> {
        (**self).parse_uri(s)
    }

    fn parse_arn(&self, s: &str) -> Result<ObjectReference> {
        (**self).parse_arn(s)
    }

    fn resolve(&self, s: &str) -> Result<ObjectReference> {
        (**self).resolve(s)
    }
}

/// Resolver with a default connection and an optional default bucket
#[derive(Debug, Clone, Default)]
pub struct DefaultResolver {
    default_connection: String,
    default_bucket: Option<String>,
}

impl DefaultResolver {
    pub fn new(default_connection: impl Into<String>) -> Self {
        Self {
            default_connection: default_connection.into(),
            default_bucket: None,
        }
    }

    /// Set the bucket used for bare keys
    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        self.default_bucket = (!bucket.is_empty()).then_some(bucket);
        self
    }

    pub fn default_connection(&self) -> &str {
        &self.default_connection
    }

    pub fn default_bucket(&self) -> Option<&str> {
        self.default_bucket.as_deref()
    }
}

impl Resolver for DefaultResolver {
    fn parse_uri(&self, s: &str) -> Result<ObjectReference> {
        reference::parse_uri(s, &self.default_connection)
    }

    fn parse_arn(&self, s: &str) -> Result<ObjectReference> {
        let invalid = |reason: &str| Error::InvalidAddress(format!("{reason}: {s}"));

        let rest = s.strip_prefix("arn:").ok_or_else(|| invalid("not an ARN"))?;
        let mut parts = rest.splitn(5, ':');
        let (partition, service, region, account, resource) = match (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) {
            (Some(p), Some(s), Some(r), Some(a), Some(res)) => (p, s, r, a, res),
            _ => return Err(invalid("ARN needs five ':' separated segments")),
        };

        if partition != "aws" {
            return Err(invalid("ARN partition is not aws"));
        }
        if service != "s3" {
            return Err(invalid("ARN service is not s3"));
        }
        if !region.is_empty() || !account.is_empty() {
            return Err(invalid("S3 ARN must have empty region and account"));
        }

        let (bucket, key) = resource
            .split_once('/')
            .ok_or_else(|| invalid("ARN has no object key"))?;
        if bucket.is_empty() {
            return Err(invalid("ARN has no bucket"));
        }

        Ok(ObjectReference {
            connection: self.default_connection.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    fn resolve(&self, s: &str) -> Result<ObjectReference> {
        if let Ok(r) = self.parse_uri(s) {
            return Ok(r);
        }
        if let Ok(r) = self.parse_arn(s) {
            return Ok(r);
        }

        let bucket = self
            .default_bucket
            .as_ref()
            .ok_or_else(|| Error::NoDefaultBucket(s.to_string()))?;

        Ok(ObjectReference {
            connection: self.default_connection.clone(),
            bucket: bucket.clone(),
            key: s.to_string(),
        })
    }
}

/// Rewrites connection names produced by an inner resolver
///
/// Connections found in the alias table are replaced by their target;
/// all others pass through. Wrapping an `AliasResolver` in another one
/// applies the inner table first, then the outer.
#[derive(Debug, Clone)]
pub struct AliasResolver<R> {
    inner: R,
    aliases: HashMap<String, String>,
}

impl<R: Resolver> AliasResolver<R> {
    pub fn new(inner: R, aliases: HashMap<String, String>) -> Self {
        Self { inner, aliases }
    }

    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn rewrite(&self, mut r: ObjectReference) -> ObjectReference {
        if let Some(target) = self.aliases.get(&r.connection) {
            tracing::trace!(
                alias = %r.connection,
                connection = %target,
                "Rewriting connection alias"
            );
            r.connection = target.clone();
        }
        r
    }
}

impl<R: Resolver> Resolver for AliasResolver<R> {
    fn parse_uri(&self, s: &str) -> Result<ObjectReference> {
        self.inner.parse_uri(s).map(|r| self.rewrite(r))
    }

    fn parse_arn(&self, s: &str) -> Result<ObjectReference> {
        self.inner.parse_arn(s).map(|r| self.rewrite(r))
    }

    fn resolve(&self, s: &str) -> Result<ObjectReference> {
        self.inner.resolve(s).map(|r| self.rewrite(r))
    }
}
