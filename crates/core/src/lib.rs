//! objref-core: object references and caching providers
//!
//! This crate provides the SDK-independent pieces of objref:
//! - Object references and their canonical `s3://` form
//! - Address resolution (URI, ARN and bare-key forms, connection aliases)
//! - Provider capability traits for content, metadata and listing
//! - Caching decorators and the composite provider
//! - Configuration management
//!
//! Store adapters such as `objref-s3` implement the provider traits; everything
//! here can be exercised without a running object store.

pub mod cache;
pub mod composite;
pub mod config;
pub mod error;
pub mod reference;
pub mod resolver;
pub mod simple;
pub mod stream;
pub mod traits;

pub use cache::{CachedContentProvider, CachedMetadataProvider};
pub use composite::CompositeProvider;
pub use config::{CacheConfig, Config, ConfigManager, ConnectionConfig};
pub use error::{Error, Result};
pub use reference::ObjectReference;
pub use resolver::{AliasResolver, DefaultResolver, Resolver};
pub use simple::{SimpleContentProvider, SimpleMetadataProvider};
pub use stream::{ContentReader, ContentStream};
pub use traits::{
    ContentProvider, DEFAULT_CONTENT_TYPE, ListOptions, ListProvider, MetadataProvider,
    ObjectMetadata, ObjectProvider,
};
