//! minio-deploy - static build deployment to S3-compatible storage
//!
//! Mirrors a local build directory (`dist/` by default) into a bucket prefix
//! on MinIO or any S3-compatible service, optionally removing remote objects
//! that no longer exist locally.

pub mod config;
pub mod deploy;
pub mod envfile;
pub mod error;
pub mod mc;
pub mod sync;

pub use config::{DeployConfig, Settings, Transport};
pub use error::{DeployError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
