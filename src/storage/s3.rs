//! AWS S3 storage implementation.
//!
//! Artifacts are stored as `s3://{bucket}/{key}`. The status marker swap uses
//! S3 conditional writes (`If-Match` / `If-None-Match`), so two invocations
//! racing for the marker cannot both win.

use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::storage::ArtifactStore;

/// S3-based artifact store.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Create S3 storage from environment configuration.
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "catalog-artifacts".to_string());

        Ok(Self::new(client, bucket))
    }

    /// Read an object together with its ETag.
    async fn get_with_etag(&self, key: &str) -> Result<Option<(Vec<u8>, Option<String>)>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let etag = output.e_tag().map(str::to_string);
                let bytes = output.body.collect().await.map_err(AppError::storage)?;
                Ok(Some((bytes.into_bytes().to_vec(), etag)))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::info!("No existing object at s3://{}/{}", self.bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::storage(service_err))
                }
            }
        }
    }
}

#[async_trait]
impl ArtifactStore for S3Storage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get_with_etag(key).await?.map(|(bytes, _)| bytes))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let len = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type("application/json; charset=utf-8")
            .send()
            .await
            .map_err(AppError::storage)?;

        log::info!("Uploaded {} bytes to s3://{}/{}", len, self.bucket, key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(AppError::storage(service_err))
                }
            }
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Vec<u8>,
    ) -> Result<bool> {
        let current = self.get_with_etag(key).await?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(new))
            .content_type("application/json; charset=utf-8");

        let request = match (current, expected) {
            (None, None) => request.if_none_match("*"),
            (Some((bytes, Some(etag))), Some(expected)) if bytes == expected => {
                request.if_match(etag)
            }
            _ => return Ok(false),
        };

        match request.send().await {
            Ok(_) => Ok(true),
            Err(err) if is_precondition_failure(&err) => {
                log::warn!("Lost conditional write on s3://{}/{}", self.bucket, key);
                Ok(false)
            }
            Err(err) => Err(AppError::storage(err)),
        }
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

/// 412 Precondition Failed or 409 Conflict from a conditional write.
fn is_precondition_failure<E>(err: &SdkError<E, HttpResponse>) -> bool {
    err.raw_response()
        .map(|r| matches!(r.status().as_u16(), 409 | 412))
        .unwrap_or(false)
}
