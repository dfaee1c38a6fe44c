//! Mirror execution: overwrite every local file, then drop remote-only keys

use std::path::Path;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use super::keys::listing_prefix;
use super::plan::SyncPlan;
use super::store::BucketStore;
use super::walker::walk_local;
use crate::error::{DeployError, Result};

/// Keys per bulk-delete request (S3 `DeleteObjects` accepts at most 1000)
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Knobs for one mirror run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Normalized key prefix, may be empty
    pub prefix: String,
    /// Delete remote keys that have no local counterpart
    pub remove_extra: bool,
    /// Uploads in flight at once
    pub concurrency: usize,
    /// Plan only, write nothing
    pub dry_run: bool,
    pub delete_batch_size: usize,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            remove_extra: false,
            concurrency: 8,
            dry_run: false,
            delete_batch_size: DELETE_BATCH_SIZE,
        }
    }
}

/// Outcome of a mirror run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorReport {
    pub uploaded: usize,
    pub deleted: usize,
    pub bytes_uploaded: u64,
    pub dry_run: bool,
}

/// Mirrors a local directory onto a bucket prefix
pub struct Mirror<'a, S: BucketStore + ?Sized> {
    store: &'a S,
    options: MirrorOptions,
}

impl<'a, S: BucketStore + ?Sized> Mirror<'a, S> {
    pub fn new(store: &'a S, options: MirrorOptions) -> Self {
        Self { store, options }
    }

    /// Walk `root`, list the remote prefix when removal is enabled, and
    /// build the plan. No writes happen here.
    pub async fn plan(&self, root: &Path) -> Result<SyncPlan> {
        let files = walk_local(root)?;

        let remote = if self.options.remove_extra {
            let prefix = listing_prefix(&self.options.prefix);
            let keys = self.store.list_keys(prefix.as_deref()).await?;
            tracing::debug!("Listed {} remote keys", keys.len());
            Some(keys)
        } else {
            None
        };

        Ok(SyncPlan::build(files, &self.options.prefix, remote.as_deref()))
    }

    /// Plan and execute a mirror of `root`
    pub async fn run(&self, root: &Path) -> Result<MirrorReport> {
        let plan = self.plan(root).await?;
        self.execute(&plan).await
    }

    /// Execute a plan: all uploads first, then deletions in batches.
    ///
    /// The first failing operation aborts the rest; the error says how many
    /// operations completed before it.
    pub async fn execute(&self, plan: &SyncPlan) -> Result<MirrorReport> {
        let total = plan.uploads.len() + plan.deletions.len();

        if self.options.dry_run {
            for upload in &plan.uploads {
                tracing::info!("[dry-run] upload {} ({})", upload.key, upload.content_type);
            }
            for key in &plan.deletions {
                tracing::info!("[dry-run] delete {}", key);
            }
            return Ok(MirrorReport {
                dry_run: true,
                ..Default::default()
            });
        }

        let mut report = MirrorReport::default();
        let store = self.store;

        let mut uploads = stream::iter(plan.uploads.iter())
            .map(|upload| async move {
                store
                    .put_file(&upload.key, &upload.file.absolute_path, upload.content_type)
                    .await
                    .map(|bytes| (upload, bytes))
                    .map_err(|e| (upload.key.clone(), e))
            })
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some(result) = uploads.next().await {
            match result {
                Ok((upload, bytes)) => {
                    tracing::debug!("Uploaded {} ({} bytes)", upload.key, bytes);
                    report.uploaded += 1;
                    report.bytes_uploaded += bytes;
                }
                Err((key, e)) => {
                    return Err(transfer_error(key, report.uploaded, total, e));
                }
            }
        }
        tracing::info!(
            "Uploaded {} files ({} bytes)",
            report.uploaded,
            report.bytes_uploaded
        );

        for batch in plan.deletions.chunks(self.options.delete_batch_size.max(1)) {
            if let Err(e) = store.delete_keys(batch).await {
                let completed = report.uploaded + report.deleted;
                return Err(transfer_error(batch[0].clone(), completed, total, e));
            }
            report.deleted += batch.len();
            tracing::debug!("Deleted batch of {} keys", batch.len());
        }
        if report.deleted > 0 {
            tracing::info!("Removed {} remote-only objects", report.deleted);
        }

        Ok(report)
    }
}

fn transfer_error(key: String, completed: usize, total: usize, e: DeployError) -> DeployError {
    let message = match e {
        DeployError::Remote(message) => message,
        other => other.to_string(),
    };
    tracing::error!("Transfer of '{}' failed: {}", key, message);
    DeployError::Transfer {
        key,
        completed,
        total,
        message,
    }
}
