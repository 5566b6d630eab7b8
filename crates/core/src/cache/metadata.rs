use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::CellMap;
use crate::error::Result;
use crate::reference::ObjectReference;
use crate::traits::{MetadataProvider, ObjectMetadata};

struct Entry {
    metadata: ObjectMetadata,
    fetched_at: Instant,
}

/// Memoizes metadata snapshots for a fixed time-to-live
///
/// An entry is served while its age is strictly less than the TTL. Expiry
/// is checked lazily on read; an expired entry is evicted and refetched.
/// [`exists`](MetadataProvider::exists) and
/// [`get_etag`](MetadataProvider::get_etag) go through the cache.
pub struct CachedMetadataProvider<P> {
    inner: P,
    ttl: Duration,
    entries: CellMap<Entry>,
}

impl<P: MetadataProvider> CachedMetadataProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: CellMap::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop every cached entry
    pub fn clear_cache(&self) {
        self.entries.clear();
        tracing::debug!("Metadata cache cleared");
    }

    /// Number of references with a cached snapshot, expired ones included
    pub fn cached_entries(&self) -> usize {
        self.entries.filled()
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        entry.fetched_at.elapsed() < self.ttl
    }
}

#[async_trait]
impl<P: MetadataProvider> MetadataProvider for CachedMetadataProvider<P> {
    async fn get_metadata(&self, reference: &ObjectReference) -> Result<ObjectMetadata> {
        let key = reference.to_string();
        let slot = self.entries.slot(&key, |entry| {
            let fresh = self.is_fresh(entry);
            if !fresh {
                tracing::debug!(reference = %key, "Metadata cache entry expired");
            }
            fresh
        });

        if let Some(entry) = slot.get() {
            tracing::trace!(reference = %key, "Metadata cache hit");
            return Ok(entry.metadata.clone());
        }

        let entry = slot
            .get_or_try_init(|| async {
                tracing::debug!(reference = %key, "Metadata cache miss");
                let metadata = self.inner.get_metadata(reference).await?;
                Ok::<_, crate::error::Error>(Entry {
                    metadata,
                    fetched_at: Instant::now(),
                })
            })
            .await?;
        Ok(entry.metadata.clone())
    }
}
