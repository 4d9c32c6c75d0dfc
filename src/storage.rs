use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::{presigning::PresigningConfig, primitives::ByteStream};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;

/// StorageError
///
/// Failure of a single object-store call. The message carries the provider's cause for logging.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("put object failed: {0}")]
    Put(String),
    #[error("presigning failed: {0}")]
    Presign(String),
    #[error("delete object failed: {0}")]
    Delete(String),
}

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for every interaction with the object store, so handlers can run against
/// the real S3 client (`S3StorageClient`) or the in-memory `MockStorageService` in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if it is missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// Stores `body` under `key` with the given content type.
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str)
    -> Result<(), StorageError>;

    /// Generates a signed GET URL for `key`, valid for `expires_in`.
    async fn presigned_get_url(&self, key: &str, expires_in: Duration)
    -> Result<String, StorageError>;

    /// Removes `key`. Used to compensate an upload whose database write failed.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// Concrete implementation on the AWS SDK. With an explicit endpoint it targets MinIO (or any
/// S3-compatible gateway) using path-style addressing; without one it talks to AWS directly.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: Option<&str>,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let mut builder = s3::Config::builder()
            .credentials_provider(credentials)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest();

        if let Some(endpoint) = endpoint {
            // MinIO requires path-style addressing (http://endpoint/bucket/key).
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = s3::Client::from_conf(builder.build());

        Self {
            client,
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            // Already-owned buckets land here too.
            tracing::debug!("create_bucket: {:?}", e);
        }
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Put(format!("{:?}", e)))?;
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning =
            PresigningConfig::expires_in(expires_in).map_err(|e| StorageError::Presign(e.to_string()))?;

        let presigned_req = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(format!("{:?}", e)))?;

        Ok(presigned_req.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete(format!("{:?}", e)))?;
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory object store for handler and integration tests. Objects are kept per key with their
/// size, so tests can assert what was uploaded and what was compensated away.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every put returns a simulated provider failure.
    pub should_fail: bool,
    /// When true, puts succeed but every presign request fails.
    pub presign_fails: bool,
    objects: Arc<Mutex<HashMap<String, usize>>>,
    put_calls: Arc<Mutex<usize>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn new_failing_presign() -> Self {
        Self {
            presign_fails: true,
            ..Self::default()
        }
    }

    /// Keys currently stored.
    pub fn keys(&self) -> Vec<String> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = objects.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of `put_object` calls made, successful or not.
    pub fn put_calls(&self) -> usize {
        *self.put_calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        *self.put_calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        if self.should_fail {
            return Err(StorageError::Put(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), body.len());
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        if self.presign_fails {
            return Err(StorageError::Presign(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?X-Amz-Expires={}&signature=fake",
            key,
            expires_in.as_secs()
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

/// StorageState
///
/// The type used to share the object store across the application state.
pub type StorageState = Arc<dyn StorageService>;
