//! Directory-to-bucket mirroring
//!
//! Walks a local build directory, maps every file to a key under the bucket
//! prefix, and overwrites the remote copy. With removal enabled, remote keys
//! under the prefix that have no local file are deleted afterwards.
//!
//! # Feature Flags
//!
//! The S3 client requires the `sdk` feature (enabled by default). The
//! in-memory store used by tests requires `testing`.

pub mod content_type;
pub mod keys;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod mirror;
pub mod plan;
pub mod provision;
#[cfg(feature = "sdk")]
mod s3;
pub mod store;
pub mod walker;

pub use content_type::{content_type_for, DEFAULT_CONTENT_TYPE};
pub use keys::{map_key, normalize_prefix, strip_key};
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryBucket;
pub use mirror::{Mirror, MirrorOptions, MirrorReport, DELETE_BATCH_SIZE};
pub use plan::{keys_to_delete, PlannedUpload, SyncPlan};
pub use provision::{console_port_hint, ensure_bucket};
#[cfg(feature = "sdk")]
pub use s3::S3Bucket;
pub use store::BucketStore;
pub use walker::{walk_local, LocalFile};
