//! Deploy driver
//!
//! Straight-line flow shared by both binaries' deploy paths: check the source
//! directory, make sure the bucket exists, mirror. Every step returns a typed
//! error; nothing is retried.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{DeployConfig, Settings, Transport};
use crate::error::{DeployError, Result};
use crate::sync::provision::provisioning_error;
use crate::sync::{ensure_bucket, BucketStore, Mirror, MirrorOptions, MirrorReport, SyncPlan};

/// Result of a deploy run
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub transport: Transport,
    pub endpoint: String,
    pub bucket: String,
    pub prefix: String,
    /// Whether this run created the bucket (`None` when unknown)
    pub bucket_created: Option<bool>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Per-file counts, unavailable for the `mc` transport
    pub mirror: Option<MirrorReport>,
}

/// Fail with [`DeployError::SourceNotFound`] unless the source directory exists
pub fn check_source(config: &DeployConfig) -> Result<()> {
    if config.source_dir.is_dir() {
        Ok(())
    } else {
        Err(DeployError::SourceNotFound(config.source_dir.clone()))
    }
}

/// Mirror options derived from the configuration
pub fn mirror_options(config: &DeployConfig, dry_run: bool) -> MirrorOptions {
    MirrorOptions {
        prefix: config.prefix.clone(),
        remove_extra: config.remove_extra,
        concurrency: config.concurrency,
        dry_run,
        ..Default::default()
    }
}

/// Options for a run that must not write. The bucket is only checked; when
/// it does not exist yet, removal is off and nothing is listed.
async fn read_only_options<S>(store: &S, config: &DeployConfig) -> Result<MirrorOptions>
where
    S: BucketStore + ?Sized,
{
    let mut options = mirror_options(config, true);
    let exists = store
        .bucket_exists()
        .await
        .map_err(|e| provisioning_error(&config.bucket, &config.endpoint, e))?;
    if !exists {
        tracing::info!("[dry-run] bucket '{}' would be created", config.bucket);
        options.remove_extra = false;
    }
    Ok(options)
}

/// Deploy `config.source_dir` through `store`.
///
/// The source directory is checked before any remote call. In a dry run the
/// bucket is only checked, never created, and no object is written.
pub async fn deploy_with<S>(store: &S, config: &DeployConfig, dry_run: bool) -> Result<DeployReport>
where
    S: BucketStore + ?Sized,
{
    check_source(config)?;
    let started_at = Utc::now();

    tracing::info!(
        "Deploying '{}' -> '{}'",
        config.source_dir.display(),
        config.destination()
    );

    let (options, bucket_created) = if dry_run {
        (read_only_options(store, config).await?, None)
    } else {
        let created = ensure_bucket(store, config.region.as_deref(), &config.endpoint).await?;
        (mirror_options(config, false), Some(created))
    };

    let mirror = Mirror::new(store, options);
    let report = mirror.run(&config.source_dir).await?;

    if !dry_run {
        tracing::info!("Deploy completed successfully");
    }

    Ok(DeployReport {
        transport: Transport::Sdk,
        endpoint: config.endpoint.clone(),
        bucket: config.bucket.clone(),
        prefix: config.prefix.clone(),
        bucket_created,
        started_at,
        completed_at: Utc::now(),
        mirror: Some(report),
    })
}

/// Build the sync plan for `config` without writing anything
pub async fn plan_with<S>(store: &S, config: &DeployConfig) -> Result<SyncPlan>
where
    S: BucketStore + ?Sized,
{
    check_source(config)?;
    let options = read_only_options(store, config).await?;
    Mirror::new(store, options).plan(&config.source_dir).await
}

/// Resolve `settings` and deploy. Missing or invalid settings fail before any
/// client is built.
pub async fn deploy_settings(settings: Settings, dry_run: bool) -> Result<DeployReport> {
    let config = settings.resolve()?;
    tracing::debug!("Resolved configuration: {:?}", config);
    deploy(&config, dry_run).await
}

/// Deploy using the transport selected in `config`
pub async fn deploy(config: &DeployConfig, dry_run: bool) -> Result<DeployReport> {
    match config.transport {
        Transport::Sdk => deploy_sdk(config, dry_run).await,
        Transport::Mc => crate::mc::deploy(config, dry_run).await,
    }
}

#[cfg(feature = "sdk")]
async fn deploy_sdk(config: &DeployConfig, dry_run: bool) -> Result<DeployReport> {
    check_source(config)?;
    let store = crate::sync::S3Bucket::connect(config).await?;
    deploy_with(&store, config, dry_run).await
}

#[cfg(not(feature = "sdk"))]
async fn deploy_sdk(_config: &DeployConfig, _dry_run: bool) -> Result<DeployReport> {
    Err(DeployError::InvalidConfig(
        "built without the `sdk` feature; set DEPLOY_TRANSPORT=mc".to_string(),
    ))
}

/// Plan against the configured bucket through the S3 client
#[cfg(feature = "sdk")]
pub async fn plan(config: &DeployConfig) -> Result<SyncPlan> {
    check_source(config)?;
    let store = crate::sync::S3Bucket::connect(config).await?;
    plan_with(&store, config).await
}

#[cfg(not(feature = "sdk"))]
pub async fn plan(_config: &DeployConfig) -> Result<SyncPlan> {
    Err(DeployError::InvalidConfig(
        "planning needs the `sdk` feature".to_string(),
    ))
}
