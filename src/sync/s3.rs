//! S3-compatible bucket store (MinIO, R2, AWS S3)

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use aws_sdk_s3::Client as S3Client;

use super::store::BucketStore;
use crate::config::DeployConfig;
use crate::error::{DeployError, Result};

/// Region sent when none is configured; MinIO accepts it by default
const FALLBACK_REGION: &str = "us-east-1";

/// Bucket store backed by the AWS S3 SDK
pub struct S3Bucket {
    client: S3Client,
    bucket: String,
}

impl S3Bucket {
    /// Build a client for the configured endpoint with static credentials.
    ///
    /// Path-style addressing is forced so `http://host:9000/bucket/key` works
    /// against MinIO without wildcard DNS.
    pub async fn connect(config: &DeployConfig) -> Result<Self> {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "minio-deploy",
        );
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| FALLBACK_REGION.to_string());

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        tracing::debug!("S3 client configured for {}", config.endpoint);

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }
}

fn remote_error<E: std::error::Error>(e: E) -> DeployError {
    DeployError::Remote(DisplayErrorContext(e).to_string())
}

#[async_trait]
impl BucketStore for S3Bucket {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(remote_error(e))
                }
            }
        }
    }

    async fn create_bucket(&self, region: Option<&str>) -> Result<bool> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);

        // us-east-1 must not be sent as a location constraint
        if let Some(region) = region.filter(|r| *r != FALLBACK_REGION) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(true),
            Err(e) => match e.as_service_error() {
                Some(se) if se.is_bucket_already_owned_by_you() => Ok(false),
                Some(se) if se.is_bucket_already_exists() => {
                    tracing::warn!(
                        "Bucket '{}' already exists (possibly owned by another account)",
                        self.bucket
                    );
                    Ok(false)
                }
                _ => Err(remote_error(e)),
            },
        }
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(prefix.map(String::from))
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(remote_error)?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(String::from),
            );
        }

        Ok(keys)
    }

    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<u64> {
        let size = tokio::fs::metadata(path).await?.len();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| DeployError::Remote(format!("{}: {}", path.display(), e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(remote_error)?;

        tracing::debug!("Uploaded {} bytes to s3://{}/{}", size, self.bucket, key);
        Ok(size)
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(remote_error)?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(remote_error)?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(remote_error)?;

        if let Some(failure) = output.errors().first() {
            return Err(DeployError::Remote(format!(
                "failed to delete '{}': {} ({} of {} keys failed)",
                failure.key().unwrap_or("<unknown>"),
                failure.message().unwrap_or("unknown error"),
                output.errors().len(),
                keys.len()
            )));
        }

        Ok(())
    }
}
