//! Sync planning: which files to upload and which remote keys to delete

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::content_type::content_type_for;
use super::keys::{in_namespace, map_key};
use super::walker::LocalFile;

/// A local file and the remote key it is written to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpload {
    pub file: LocalFile,
    pub key: String,
    pub content_type: &'static str,
}

/// Work for one mirror run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    /// Always one entry per local file
    pub uploads: Vec<PlannedUpload>,
    /// Remote-only keys, empty unless removal was requested
    pub deletions: Vec<String>,
}

impl SyncPlan {
    /// Build a plan for `files` under `prefix`.
    ///
    /// `remote_keys` is the complete listing of the prefix, or `None` when
    /// remote-only keys should be kept.
    pub fn build(files: Vec<LocalFile>, prefix: &str, remote_keys: Option<&[String]>) -> Self {
        let uploads: Vec<PlannedUpload> = files
            .into_iter()
            .map(|file| {
                let key = map_key(&file.relative_path, prefix);
                let content_type = content_type_for(&file.relative_path);
                PlannedUpload {
                    file,
                    key,
                    content_type,
                }
            })
            .collect();

        let deletions = match remote_keys {
            Some(remote) => {
                let local: HashSet<&str> = uploads.iter().map(|u| u.key.as_str()).collect();
                keys_to_delete(remote, &local, prefix)
            }
            None => Vec::new(),
        };

        Self { uploads, deletions }
    }

    pub fn local_keys(&self) -> impl Iterator<Item = &str> {
        self.uploads.iter().map(|u| u.key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.deletions.is_empty()
    }
}

/// Remote keys in the `prefix` namespace that have no local counterpart.
///
/// The result never contains a key from `local`. It is sorted and free of
/// duplicates.
pub fn keys_to_delete<S: AsRef<str>>(
    remote: &[S],
    local: &HashSet<&str>,
    prefix: &str,
) -> Vec<String> {
    remote
        .iter()
        .map(|key| key.as_ref())
        .filter(|key| in_namespace(key, prefix))
        .filter(|key| !local.contains(key))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(String::from)
        .collect()
}
