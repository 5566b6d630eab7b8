//! Closure-backed providers
//!
//! Adapt plain async functions into the provider traits. Parts that are
//! not supplied fall back to defaults: the content type is
//! [`DEFAULT_CONTENT_TYPE`], and the size is the length of the fetched
//! content. Without a size function a size query costs a full download.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::reference::ObjectReference;
use crate::traits::{ContentProvider, DEFAULT_CONTENT_TYPE, MetadataProvider, ObjectMetadata};

type FetchFn<T> = Arc<dyn Fn(ObjectReference) -> BoxFuture<'static, Result<T>> + Send + Sync>;

fn boxed<T, F, Fut>(f: F) -> FetchFn<T>
where
    T: 'static,
    F: Fn(ObjectReference) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move |r| -> BoxFuture<'static, Result<T>> { Box::pin(f(r)) })
}

/// Content provider built from a fetch function
#[derive(Clone)]
pub struct SimpleContentProvider {
    fetch: FetchFn<Bytes>,
    content_type: Option<FetchFn<String>>,
    size: Option<FetchFn<i64>>,
}

impl SimpleContentProvider {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(ObjectReference) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes>> + Send + 'static,
    {
        Self {
            fetch: boxed(fetch),
            content_type: None,
            size: None,
        }
    }

    /// Use a dedicated content-type lookup
    pub fn with_content_type<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ObjectReference) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.content_type = Some(boxed(f));
        self
    }

    /// Use a dedicated size lookup instead of downloading the content
    pub fn with_size<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ObjectReference) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<i64>> + Send + 'static,
    {
        self.size = Some(boxed(f));
        self
    }
}

impl std::fmt::Debug for SimpleContentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleContentProvider")
            .field("content_type", &self.content_type.is_some())
            .field("size", &self.size.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentProvider for SimpleContentProvider {
    async fn get_content(&self, reference: &ObjectReference) -> Result<Bytes> {
        (self.fetch)(reference.clone()).await
    }

    async fn get_content_type(&self, reference: &ObjectReference) -> Result<String> {
        match &self.content_type {
            Some(f) => f(reference.clone()).await,
            None => Ok(DEFAULT_CONTENT_TYPE.to_string()),
        }
    }

    async fn get_size(&self, reference: &ObjectReference) -> Result<i64> {
        match &self.size {
            Some(f) => f(reference.clone()).await,
            None => Ok(self.get_content(reference).await?.len() as i64),
        }
    }
}

/// Metadata provider built from a fetch function
#[derive(Clone)]
pub struct SimpleMetadataProvider {
    fetch: FetchFn<ObjectMetadata>,
}

impl SimpleMetadataProvider {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(ObjectReference) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ObjectMetadata>> + Send + 'static,
    {
        Self {
            fetch: boxed(fetch),
        }
    }
}

impl std::fmt::Debug for SimpleMetadataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleMetadataProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl MetadataProvider for SimpleMetadataProvider {
    async fn get_metadata(&self, reference: &ObjectReference) -> Result<ObjectMetadata> {
        (self.fetch)(reference.clone()).await
    }
}
