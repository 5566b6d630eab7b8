//! Composite provider
//!
//! Bundles independent content, metadata, listing and resolver handles
//! behind one type. Every call is forwarded as-is; a call whose handle was
//! never supplied fails with [`Error::CapabilityMissing`].

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::cache::{CachedContentProvider, CachedMetadataProvider};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::reference::ObjectReference;
use crate::resolver::Resolver;
use crate::stream::ContentStream;
use crate::traits::{ContentProvider, ListOptions, ListProvider, MetadataProvider, ObjectMetadata};

/// Aggregates the four provider capabilities
#[derive(Clone, Default)]
pub struct CompositeProvider {
    content: Option<Arc<dyn ContentProvider>>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    list: Option<Arc<dyn ListProvider>>,
    resolver: Option<Arc<dyn Resolver>>,
}

impl CompositeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.content = Some(provider);
        self
    }

    pub fn with_metadata(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(provider);
        self
    }

    pub fn with_list(mut self, provider: Arc<dyn ListProvider>) -> Self {
        self.list = Some(provider);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Assemble a provider from store handles using `config`
    ///
    /// Content and metadata are wrapped in caches when caching is enabled;
    /// listing is never cached. The resolver comes from [`Config::resolver`].
    pub fn from_config(
        config: &Config,
        content: Arc<dyn ContentProvider>,
        metadata: Arc<dyn MetadataProvider>,
        list: Arc<dyn ListProvider>,
    ) -> Self {
        let (content, metadata): (Arc<dyn ContentProvider>, Arc<dyn MetadataProvider>) =
            if config.cache.enabled {
                (
                    Arc::new(CachedContentProvider::new(content)),
                    Arc::new(CachedMetadataProvider::new(metadata, config.metadata_ttl())),
                )
            } else {
                (content, metadata)
            };

        Self::new()
            .with_content(content)
            .with_metadata(metadata)
            .with_list(list)
            .with_resolver(config.resolver())
    }

    fn content(&self) -> Result<&dyn ContentProvider> {
        self.content
            .as_deref()
            .ok_or(Error::CapabilityMissing("content"))
    }

    fn metadata(&self) -> Result<&dyn MetadataProvider> {
        self.metadata
            .as_deref()
            .ok_or(Error::CapabilityMissing("metadata"))
    }

    fn list(&self) -> Result<&dyn ListProvider> {
        self.list.as_deref().ok_or(Error::CapabilityMissing("list"))
    }

    fn resolver(&self) -> Result<&dyn Resolver> {
        self.resolver
            .as_deref()
            .ok_or(Error::CapabilityMissing("resolver"))
    }
}

impl std::fmt::Debug for CompositeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeProvider")
            .field("content", &self.content.is_some())
            .field("metadata", &self.metadata.is_some())
            .field("list", &self.list.is_some())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

#[async_trait]
impl ContentProvider for CompositeProvider {
    async fn get_content(&self, reference: &ObjectReference) -> Result<Bytes> {
        self.content()?.get_content(reference).await
    }

    async fn get_content_stream(&self, reference: &ObjectReference) -> Result<ContentStream> {
        self.content()?.get_content_stream(reference).await
    }

    async fn get_content_type(&self, reference: &ObjectReference) -> Result<String> {
        self.content()?.get_content_type(reference).await
    }

    async fn get_size(&self, reference: &ObjectReference) -> Result<i64> {
        self.content()?.get_size(reference).await
    }
}

#[async_trait]
impl MetadataProvider for CompositeProvider {
    async fn get_metadata(&self, reference: &ObjectReference) -> Result<ObjectMetadata> {
        self.metadata()?.get_metadata(reference).await
    }

    async fn exists(&self, reference: &ObjectReference) -> Result<bool> {
        self.metadata()?.exists(reference).await
    }

    async fn get_etag(&self, reference: &ObjectReference) -> Result<String> {
        self.metadata()?.get_etag(reference).await
    }
}

#[async_trait]
impl ListProvider for CompositeProvider {
    async fn list_objects(
        &self,
        connection: &str,
        bucket: &str,
        options: &ListOptions,
    ) -> Result<Vec<ObjectMetadata>> {
        self.list()?.list_objects(connection, bucket, options).await
    }

    async fn list_buckets(&self, connection: &str) -> Result<Vec<String>> {
        self.list()?.list_buckets(connection).await
    }
}

impl Resolver for CompositeProvider {
    fn parse_uri(&self, s: &str) -> Result<ObjectReference> {
        self.resolver()?.parse_uri(s)
    }

    fn parse_arn(&self, s: &str) -> Result<ObjectReference> {
        self.resolver()?.parse_arn(s)
    }

    fn resolve(&self, s: &str) -> Result<ObjectReference> {
        self.resolver()?.resolve(s)
    }
}
