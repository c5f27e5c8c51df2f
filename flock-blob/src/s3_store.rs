use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use flock_core::{FlockConfigSnapshot, FlockResult};

use crate::{BlobError, BlobResult, BlobStore, PutOptions};

/// Connection settings for an S3-compatible object store.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint_url: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Base of public object URLs; defaults to the endpoint (path style)
    pub public_base_url: Option<String>,
    pub force_path_style: bool,
}

impl S3Config {
    /// Reads the `blob.*` keys.
    pub fn from_config(config: &FlockConfigSnapshot) -> FlockResult<Self> {
        Ok(Self {
            endpoint_url: config.require("blob.endpoint_url")?.to_string(),
            region: config.require("blob.region")?.to_string(),
            access_key_id: config.require("blob.access_key_id")?.to_string(),
            secret_access_key: config.require("blob.secret_access_key")?.to_string(),
            public_base_url: config.get_string("blob.public_base_url"),
            force_path_style: config.get_bool("blob.force_path_style").unwrap_or(true),
        })
    }

    fn public_base(&self) -> String {
        self.public_base_url
            .as_deref()
            .unwrap_or(&self.endpoint_url)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Blob store backed by any S3-compatible service; each namespace is a bucket.
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    public_base_url: String,
}

impl S3CompatibleStore {
    pub async fn connect(config: S3Config) -> Self {
        let public_base_url = config.public_base();
        let client = Self::create_client(config).await;
        Self {
            client,
            public_base_url,
        }
    }

    pub fn from_client<S: Into<String>>(client: Client, public_base_url: S) -> Self {
        Self {
            client,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn create_client(config: S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "flock",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url)
            .load()
            .await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.force_path_style)
                .build(),
        )
    }

    fn map_sdk_error<E>(namespace: &str, err: SdkError<E>) -> BlobError
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        if matches!(err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
            return BlobError::unavailable(DisplayErrorContext(&err).to_string());
        }

        let code = err.code().map(str::to_owned);
        match code.as_deref() {
            Some("NoSuchBucket") => BlobError::namespace_not_found(namespace),
            Some("AccessDenied") | Some("Forbidden") => {
                BlobError::permission_denied(DisplayErrorContext(&err).to_string())
            }
            Some("PreconditionFailed") => BlobError::invalid("object already exists"),
            _ => BlobError::backend(err),
        }
    }
}

#[async_trait]
impl BlobStore for S3CompatibleStore {
    async fn put(
        &self,
        namespace: &str,
        object_name: &str,
        bytes: Bytes,
        options: PutOptions,
    ) -> BlobResult<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(namespace)
            .key(object_name)
            .body(AwsByteStream::from(bytes));

        if let Some(content_type) = options.content_type {
            request = request.content_type(content_type);
        }
        if let Some(cache_control) = options.cache_control {
            request = request.cache_control(format!("max-age={cache_control}"));
        }
        if !options.upsert {
            request = request.if_none_match("*");
        }

        request
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(namespace, e))?;
        debug!(namespace, object_name, "object stored");
        Ok(())
    }

    fn public_url(&self, namespace: &str, object_name: &str) -> BlobResult<String> {
        Ok(format!("{}/{namespace}/{object_name}", self.public_base_url))
    }

    async fn remove(&self, namespace: &str, object_names: &[String]) -> BlobResult<()> {
        for name in object_names {
            self.client
                .delete_object()
                .bucket(namespace)
                .key(name)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error(namespace, e))?;
        }
        Ok(())
    }
}
