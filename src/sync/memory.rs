//! In-memory bucket store
//!
//! Backs the test-suite. Failures can be injected per key to exercise the
//! fail-fast paths, and calls are counted so tests can assert that nothing
//! reached the remote.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::store::BucketStore;
use crate::error::{DeployError, Result};

/// Object stored in a [`MemoryBucket`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Counters for the calls made against a [`MemoryBucket`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub exists_checks: usize,
    pub creates: usize,
    pub listings: usize,
    pub puts: usize,
    pub delete_batches: Vec<usize>,
}

impl CallLog {
    /// Total number of remote calls
    pub fn total(&self) -> usize {
        self.exists_checks + self.creates + self.listings + self.puts + self.delete_batches.len()
    }
}

#[derive(Debug, Default)]
struct State {
    exists: bool,
    objects: BTreeMap<String, StoredObject>,
    failing_keys: HashSet<String>,
    provisioning_error: Option<String>,
    calls: CallLog,
}

/// Bucket kept in memory
#[derive(Debug)]
pub struct MemoryBucket {
    name: String,
    page_size: usize,
    state: Mutex<State>,
}

impl MemoryBucket {
    /// A bucket that does not exist yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            page_size: 1000,
            state: Mutex::new(State::default()),
        }
    }

    /// A bucket that already exists and holds `objects`
    pub fn with_objects<I, K>(name: impl Into<String>, objects: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        let bucket = Self::new(name);
        {
            let mut state = bucket.state.lock();
            state.exists = true;
            for (key, body) in objects {
                state.objects.insert(
                    key.into(),
                    StoredObject {
                        body,
                        content_type: "application/octet-stream".to_string(),
                    },
                );
            }
        }
        bucket
    }

    /// Page size used when listing, to exercise pagination
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make uploads and deletions of `key` fail
    pub fn fail_on(&self, key: impl Into<String>) {
        self.state.lock().failing_keys.insert(key.into());
    }

    /// Make the existence check fail with `message`
    pub fn fail_provisioning(&self, message: impl Into<String>) {
        self.state.lock().provisioning_error = Some(message.into());
    }

    pub fn exists(&self) -> bool {
        self.state.lock().exists
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().objects.keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.state.lock().objects.get(key).cloned()
    }

    pub fn calls(&self) -> CallLog {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl BucketStore for MemoryBucket {
    fn bucket(&self) -> &str {
        &self.name
    }

    async fn bucket_exists(&self) -> Result<bool> {
        let mut state = self.state.lock();
        state.calls.exists_checks += 1;
        if let Some(message) = &state.provisioning_error {
            return Err(DeployError::Remote(message.clone()));
        }
        Ok(state.exists)
    }

    async fn create_bucket(&self, _region: Option<&str>) -> Result<bool> {
        let mut state = self.state.lock();
        state.calls.creates += 1;
        let created = !state.exists;
        state.exists = true;
        Ok(created)
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.calls.listings += 1;
        if !state.exists {
            return Err(DeployError::Remote(format!(
                "bucket '{}' does not exist",
                self.name
            )));
        }

        let prefix = prefix.unwrap_or("");
        let mut keys = Vec::new();
        let mut start_after: Option<String> = None;

        // Emulate continuation-token paging
        loop {
            let page: Vec<String> = state
                .objects
                .keys()
                .filter(|k| k.starts_with(prefix))
                .filter(|k| start_after.as_ref().map_or(true, |after| *k > after))
                .take(self.page_size)
                .cloned()
                .collect();

            let last = page.last().cloned();
            let full = page.len() == self.page_size;
            keys.extend(page);

            match last {
                Some(last) if full => start_after = Some(last),
                _ => break,
            }
        }

        Ok(keys)
    }

    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<u64> {
        let body = tokio::fs::read(path).await?;

        let mut state = self.state.lock();
        state.calls.puts += 1;
        if state.failing_keys.contains(key) {
            return Err(DeployError::Remote(format!("injected failure for '{}'", key)));
        }
        if !state.exists {
            return Err(DeployError::Remote("NoSuchBucket".to_string()));
        }

        let size = body.len() as u64;
        state.objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(size)
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.delete_batches.push(keys.len());
        if let Some(key) = keys.iter().find(|k| state.failing_keys.contains(*k)) {
            return Err(DeployError::Remote(format!("injected failure for '{}'", key)));
        }
        for key in keys {
            state.objects.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_pages_through_everything() {
        let bucket = MemoryBucket::with_objects(
            "site",
            (0..7).map(|i| (format!("p/{}", i), vec![i as u8])),
        )
        .with_page_size(2);
        bucket.state.lock().objects.insert(
            "q/0".to_string(),
            StoredObject {
                body: vec![],
                content_type: String::new(),
            },
        );

        let keys = bucket.list_keys(Some("p/")).await.unwrap();
        assert_eq!(keys.len(), 7);
        assert!(keys.iter().all(|k| k.starts_with("p/")));

        let all = bucket.list_keys(None).await.unwrap();
        assert_eq!(all.len(), 8);
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let bucket = MemoryBucket::new("site");
        assert!(!bucket.bucket_exists().await.unwrap());
        assert!(bucket.create_bucket(None).await.unwrap());
        assert!(!bucket.create_bucket(None).await.unwrap());
        assert!(bucket.exists());
        assert_eq!(bucket.calls().creates, 2);
    }
}
