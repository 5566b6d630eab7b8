use async_trait::async_trait;
use bytes::Bytes;

use super::CellMap;
use crate::error::Result;
use crate::reference::ObjectReference;
use crate::traits::ContentProvider;

/// Memoizes object content indefinitely
///
/// Only [`get_content`](ContentProvider::get_content) (and the stream built
/// from it) is cached. Content type and size always go to the inner
/// provider.
pub struct CachedContentProvider<P> {
    inner: P,
    entries: CellMap<Bytes>,
}

impl<P: ContentProvider> CachedContentProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            entries: CellMap::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drop every cached entry
    pub fn clear_cache(&self) {
        self.entries.clear();
        tracing::debug!("Content cache cleared");
    }

    /// Number of references with cached content
    pub fn cached_entries(&self) -> usize {
        self.entries.filled()
    }
}

#[async_trait]
impl<P: ContentProvider> ContentProvider for CachedContentProvider<P> {
    async fn get_content(&self, reference: &ObjectReference) -> Result<Bytes> {
        let key = reference.to_string();
        let slot = self.entries.slot(&key, |_| true);

        if let Some(data) = slot.get() {
            tracing::trace!(reference = %key, "Content cache hit");
            return Ok(data.clone());
        }

        let data = slot
            .get_or_try_init(|| async {
                tracing::debug!(reference = %key, "Content cache miss");
                self.inner.get_content(reference).await
            })
            .await?;
        Ok(data.clone())
    }

    async fn get_content_type(&self, reference: &ObjectReference) -> Result<String> {
        self.inner.get_content_type(reference).await
    }

    async fn get_size(&self, reference: &ObjectReference) -> Result<i64> {
        self.inner.get_size(reference).await
    }
}
