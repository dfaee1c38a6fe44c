//! Bucket provisioning

use super::store::BucketStore;
use crate::error::{DeployError, Result};

/// Port the MinIO web console listens on by default
const CONSOLE_PORT: u16 = 9001;

/// Failure fragments seen when the client talks to a console port instead
/// of the S3 API
const CONSOLE_PATTERNS: &[&str] = &[
    "made to console port",
    "should be sent to api port",
    "<!doctype html",
    "<html",
    "text/html",
    "failed to parse xml",
    "invalid xml",
    "unexpected content type",
];

/// Make sure the store's bucket exists, creating it when absent.
///
/// Returns `true` when the bucket was created by this call. Any failure is
/// reported as [`DeployError::Provisioning`], with a hint when the failure
/// looks like a console/API port mix-up.
pub async fn ensure_bucket<S>(store: &S, region: Option<&str>, endpoint: &str) -> Result<bool>
where
    S: BucketStore + ?Sized,
{
    let bucket = store.bucket().to_string();
    let wrap = |e: DeployError| provisioning_error(&bucket, endpoint, e);

    if store.bucket_exists().await.map_err(wrap)? {
        tracing::info!("Bucket '{}' already exists", bucket);
        return Ok(false);
    }

    let created = store.create_bucket(region).await.map_err(wrap)?;
    if created {
        tracing::info!("Created bucket '{}'", bucket);
    } else {
        tracing::info!("Bucket '{}' already exists", bucket);
    }
    Ok(created)
}

/// Wrap a store failure as [`DeployError::Provisioning`], attaching a hint
/// when it looks like a console/API port mix-up
pub fn provisioning_error(bucket: &str, endpoint: &str, e: DeployError) -> DeployError {
    let message = match e {
        DeployError::Remote(message) => message,
        other => other.to_string(),
    };
    let hint = console_port_hint(&message, endpoint);
    DeployError::Provisioning {
        bucket: bucket.to_string(),
        message,
        hint,
    }
}

/// Guidance for failures that look like a console/API port mix-up
pub fn console_port_hint(message: &str, endpoint: &str) -> Option<String> {
    let lowered = message.to_ascii_lowercase();
    let pattern_match = CONSOLE_PATTERNS.iter().any(|p| lowered.contains(p));
    let console_port = endpoint_port(endpoint) == Some(CONSOLE_PORT);

    if !(pattern_match || console_port) {
        return None;
    }

    Some(format!(
        "'{}' looks like the MinIO console, not the S3 API. \
         Point MINIO_URL at the API port (9000 by default, e.g. http://localhost:9000).",
        endpoint
    ))
}

/// Explicit port of an `http(s)://host:port/...` URL
fn endpoint_port(endpoint: &str) -> Option<u16> {
    let rest = endpoint.split_once("://").map_or(endpoint, |(_, rest)| rest);
    let authority = rest.split('/').next()?;
    let authority = authority.rsplit('@').next()?;
    // Bracketed IPv6 hosts keep their colons inside the brackets
    let port = match authority.rfind(']') {
        Some(end) => authority[end + 1..].strip_prefix(':')?,
        None => authority.rsplit_once(':')?.1,
    };
    port.parse().ok()
}
