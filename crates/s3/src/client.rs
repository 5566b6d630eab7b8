//! S3 store implementation
//!
//! Wraps aws-sdk-s3 and implements the provider traits from objref-core.
//! One SDK client is kept per configured connection.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use bytes::Bytes;
use jiff::Timestamp;
use objref_core::{
    Config, ConnectionConfig, ContentProvider, DEFAULT_CONTENT_TYPE, Error, ListOptions,
    ListProvider, MetadataProvider, ObjectMetadata, ObjectReference, Result,
};

/// Page size requested from ListObjectsV2 when no limit is given
const LIST_PAGE_SIZE: i32 = 1000;

/// Object store backed by one aws-sdk-s3 client per connection
#[derive(Debug, Clone)]
pub struct S3Store {
    clients: HashMap<String, aws_sdk_s3::Client>,
    default_connection: String,
}

impl S3Store {
    /// Build clients for every connection in `config`
    ///
    /// When the default connection has no entry of its own, it is served by a
    /// client configured from the SDK environment (env vars, profile files).
    pub async fn from_config(config: &Config) -> Result<Self> {
        let mut clients = HashMap::new();
        for (name, conn) in &config.connections {
            tracing::debug!(connection = %name, endpoint = %conn.endpoint, "Building S3 client");
            clients.insert(name.clone(), Self::build_client(conn).await);
        }

        if !clients.contains_key(&config.default_connection) {
            tracing::debug!(
                connection = %config.default_connection,
                "Default connection not configured, using SDK environment"
            );
            let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            clients.insert(
                config.default_connection.clone(),
                aws_sdk_s3::Client::new(&sdk_config),
            );
        }

        Ok(Self::from_clients(config.default_connection.clone(), clients))
    }

    /// Use pre-built SDK clients keyed by connection name
    pub fn from_clients(
        default_connection: impl Into<String>,
        clients: HashMap<String, aws_sdk_s3::Client>,
    ) -> Self {
        Self {
            clients,
            default_connection: default_connection.into(),
        }
    }

    pub fn default_connection(&self) -> &str {
        &self.default_connection
    }

    /// Names of all connections with a client
    pub fn connections(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    async fn build_client(conn: &ConnectionConfig) -> aws_sdk_s3::Client {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(conn.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&conn.access_key, &conn.secret_key) {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "objref-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        if !conn.endpoint.is_empty() {
            loader = loader.endpoint_url(&conn.endpoint);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(conn.force_path_style())
            .build();

        aws_sdk_s3::Client::from_conf(s3_config)
    }

    /// Client for `connection`; empty selects the default connection
    fn client(&self, connection: &str) -> Result<&aws_sdk_s3::Client> {
        let name = if connection.is_empty() {
            &self.default_connection
        } else {
            connection
        };
        self.clients
            .get(name)
            .ok_or_else(|| Error::Config(format!("unknown connection '{name}'")))
    }

    async fn head(&self, reference: &ObjectReference) -> Result<HeadObjectOutput> {
        self.client(&reference.connection)?
            .head_object()
            .bucket(&reference.bucket)
            .key(&reference.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, &reference.to_string()))
    }
}

/// Format AWS SDK error into a detailed error message
fn format_sdk_error<E: ProvideErrorMetadata + std::fmt::Display>(error: &SdkError<E>) -> String {
    match error {
        SdkError::ServiceError(service_err) => {
            let err = service_err.err();
            let mut msg = format!("Service error: {err}");
            if let Some(code) = err.code() {
                msg.push_str(&format!(" (code: {code})"));
            }
            if let Some(message) = err.message() {
                msg.push_str(&format!(": {message}"));
            }
            msg
        }
        SdkError::ConstructionFailure(err) => format!("Request construction failed: {err:?}"),
        SdkError::TimeoutError(_) => "Request timeout".to_string(),
        SdkError::DispatchFailure(err) => format!("Network dispatch error: {err:?}"),
        SdkError::ResponseError(err) => format!("Response error: {err:?}"),
        _ => error.to_string(),
    }
}

/// Map an SDK error onto the crate error kinds
fn map_sdk_error<E: ProvideErrorMetadata + std::fmt::Display>(
    error: &SdkError<E>,
    target: &str,
) -> Error {
    if let SdkError::ServiceError(service_err) = error {
        let status = service_err.raw().status().as_u16();
        let code = service_err.err().code().unwrap_or_default();
        if status == 404 || matches!(code, "NotFound" | "NoSuchKey" | "NoSuchBucket") {
            return Error::NotFound(target.to_string());
        }
        if status == 403
            || matches!(
                code,
                "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"
            )
        {
            return Error::Auth(format_sdk_error(error));
        }
    }
    Error::Network(format_sdk_error(error))
}

fn timestamp(dt: &aws_smithy_types::DateTime) -> Option<Timestamp> {
    Timestamp::new(dt.secs(), dt.subsec_nanos() as i32).ok()
}

fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// Build a metadata snapshot from a HeadObject response
fn metadata_from_head(reference: &ObjectReference, head: &HeadObjectOutput) -> ObjectMetadata {
    let mut meta = ObjectMetadata::new(reference.clone(), head.content_length().unwrap_or(0));
    if let Some(ct) = head.content_type() {
        meta.content_type = ct.to_string();
    }
    meta.last_modified = head.last_modified().and_then(timestamp);
    meta.etag = head.e_tag().map(trim_etag).unwrap_or_default();
    meta.custom = head.metadata().cloned().unwrap_or_default();
    meta.storage_class = head.storage_class().map(|sc| sc.as_str().to_string());
    meta.version_id = head.version_id().map(str::to_string);
    meta
}

/// Build a metadata snapshot from a ListObjectsV2 entry
///
/// Listings carry no content type or user metadata; those fields keep their
/// defaults.
fn metadata_from_listing(
    connection: &str,
    bucket: &str,
    object: &aws_sdk_s3::types::Object,
) -> ObjectMetadata {
    let reference =
        ObjectReference::new(bucket, object.key().unwrap_or_default()).with_connection(connection);
    let mut meta = ObjectMetadata::new(reference, object.size().unwrap_or(0));
    meta.last_modified = object.last_modified().and_then(timestamp);
    meta.etag = object.e_tag().map(trim_etag).unwrap_or_default();
    meta.storage_class = object.storage_class().map(|sc| sc.as_str().to_string());
    meta
}

#[async_trait]
impl ContentProvider for S3Store {
    async fn get_content(&self, reference: &ObjectReference) -> Result<Bytes> {
        let response = self
            .client(&reference.connection)?
            .get_object()
            .bucket(&reference.bucket)
            .key(&reference.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, &reference.to_string()))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes();

        Ok(data)
    }

    async fn get_content_type(&self, reference: &ObjectReference) -> Result<String> {
        let head = self.head(reference).await?;
        Ok(head
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string())
    }

    async fn get_size(&self, reference: &ObjectReference) -> Result<i64> {
        Ok(self.head(reference).await?.content_length().unwrap_or(0))
    }
}

#[async_trait]
impl MetadataProvider for S3Store {
    async fn get_metadata(&self, reference: &ObjectReference) -> Result<ObjectMetadata> {
        let head = self.head(reference).await?;
        Ok(metadata_from_head(reference, &head))
    }
}

#[async_trait]
impl ListProvider for S3Store {
    async fn list_objects(
        &self,
        connection: &str,
        bucket: &str,
        options: &ListOptions,
    ) -> Result<Vec<ObjectMetadata>> {
        let client = self.client(connection)?;
        let limit = options.max_keys.map(|n| n.max(0) as usize);
        let mut items = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let remaining = limit.map(|l| l.saturating_sub(items.len()));
            if remaining == Some(0) {
                break;
            }
            let page_size = remaining.map_or(LIST_PAGE_SIZE, |r| {
                i32::try_from(r).unwrap_or(LIST_PAGE_SIZE).min(LIST_PAGE_SIZE)
            });

            let mut request = client
                .list_objects_v2()
                .bucket(bucket)
                .max_keys(page_size);
            if let Some(prefix) = &options.prefix {
                request = request.prefix(prefix);
            }
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| map_sdk_error(&e, &format!("bucket {bucket}")))?;

            items.extend(
                response
                    .contents()
                    .iter()
                    .map(|object| metadata_from_listing(connection, bucket, object)),
            );

            if !response.is_truncated().unwrap_or(false) {
                break;
            }
            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => {
                    tracing::warn!(
                        bucket = %bucket,
                        "Truncated listing without continuation token"
                    );
                    break;
                }
            }
        }

        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn list_buckets(&self, connection: &str) -> Result<Vec<String>> {
        let response = self
            .client(connection)?
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, "buckets"))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::types::{Object, ObjectStorageClass, StorageClass};

    fn test_client() -> aws_sdk_s3::Client {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                "ak", "sk", None, None, "test",
            ))
            .endpoint_url("http://127.0.0.1:1")
            .force_path_style(true)
            .build();
        aws_sdk_s3::Client::from_conf(config)
    }

    fn test_store() -> S3Store {
        let mut clients = HashMap::new();
        clients.insert("main".to_string(), test_client());
        clients.insert("backup".to_string(), test_client());
        S3Store::from_clients("main", clients)
    }

    #[test]
    fn test_client_lookup() {
        let store = test_store();
        assert!(store.client("").is_ok());
        assert!(store.client("backup").is_ok());
        assert!(matches!(store.client("missing"), Err(Error::Config(_))));

        let mut names: Vec<_> = store.connections().collect();
        names.sort();
        assert_eq!(names, ["backup", "main"]);
    }

    #[tokio::test]
    async fn test_unknown_connection_fails_before_request() {
        let store = test_store();
        let r = ObjectReference::new("b", "k").with_connection("nope");
        assert!(matches!(store.get_content(&r).await, Err(Error::Config(_))));
        assert!(matches!(store.get_metadata(&r).await, Err(Error::Config(_))));
        assert!(!store.exists(&r).await.unwrap());
        assert!(matches!(
            store.list_buckets("nope").await,
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_metadata_from_head() {
        let mut user = HashMap::new();
        user.insert("owner".to_string(), "team-a".to_string());

        let head = HeadObjectOutput::builder()
            .content_length(2048)
            .content_type("image/png")
            .e_tag("\"abc123\"")
            .last_modified(aws_smithy_types::DateTime::from_secs(1_700_000_000))
            .set_metadata(Some(user))
            .storage_class(StorageClass::StandardIa)
            .version_id("v1")
            .build();

        let r = ObjectReference::new("b", "img/logo.png").with_connection("main");
        let meta = metadata_from_head(&r, &head);

        assert_eq!(meta.reference, r);
        assert_eq!(meta.size_bytes, 2048);
        assert_eq!(meta.content_type, "image/png");
        assert_eq!(meta.etag, "abc123");
        assert_eq!(meta.custom["owner"], "team-a");
        assert_eq!(meta.storage_class.as_deref(), Some("STANDARD_IA"));
        assert_eq!(meta.version_id.as_deref(), Some("v1"));
        assert_eq!(
            meta.last_modified,
            Some(Timestamp::from_second(1_700_000_000).unwrap())
        );
    }

    #[test]
    fn test_metadata_from_empty_head() {
        let head = HeadObjectOutput::builder().build();
        let meta = metadata_from_head(&ObjectReference::new("b", "k"), &head);
        assert_eq!(meta.size_bytes, 0);
        assert_eq!(meta.content_type, DEFAULT_CONTENT_TYPE);
        assert!(meta.etag.is_empty());
        assert!(meta.last_modified.is_none());
    }

    #[test]
    fn test_metadata_from_listing() {
        let object = Object::builder()
            .key("logs/2024/01.gz")
            .size(512)
            .e_tag("\"deadbeef\"")
            .storage_class(ObjectStorageClass::Glacier)
            .build();

        let meta = metadata_from_listing("", "data", &object);
        assert_eq!(meta.reference.to_string(), "s3://data/logs/2024/01.gz");
        assert_eq!(meta.size_bytes, 512);
        assert_eq!(meta.etag, "deadbeef");
        assert_eq!(meta.storage_class.as_deref(), Some("GLACIER"));
    }
}
