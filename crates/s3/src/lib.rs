//! objref-s3: S3 SDK adapter for objref
//!
//! This crate implements the provider traits from objref-core using the
//! aws-sdk-s3 crate. It is the only crate that directly depends on the
//! AWS SDK.

pub mod client;

use std::sync::Arc;

use objref_core::{CompositeProvider, Config, Result};

pub use client::S3Store;

/// Connect to the stores in `config` and assemble a cached provider
///
/// Content and metadata reads go through the caches configured in
/// `config.cache`; listings hit the store directly.
pub async fn build_provider(config: &Config) -> Result<CompositeProvider> {
    let store = Arc::new(S3Store::from_config(config).await?);
    Ok(provider_for_store(store, config))
}

/// Assemble a provider around an existing store
pub fn provider_for_store(store: Arc<S3Store>, config: &Config) -> CompositeProvider {
    CompositeProvider::from_config(config, store.clone(), store.clone(), store)
}
