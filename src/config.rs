//! Deploy configuration
//!
//! Settings arrive in layers (command-line flags, process environment, the
//! `.env` file). They are merged into a [`Settings`] value and validated
//! once into an immutable [`DeployConfig`] that is passed down explicitly.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::envfile::EnvFile;
use crate::error::{DeployError, Result};
use crate::sync::keys::normalize_prefix;

pub const ENV_URL: &str = "MINIO_URL";
pub const ENV_ACCESS_KEY: &str = "MINIO_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "MINIO_SECRET_KEY";
pub const ENV_BUCKET: &str = "MINIO_BUCKET";
pub const ENV_PREFIX: &str = "MINIO_PREFIX";
pub const ENV_REGION: &str = "MINIO_REGION";
pub const ENV_ALIAS: &str = "MINIO_ALIAS";
pub const ENV_REMOVE_EXTRA: &str = "MINIO_REMOVE_EXTRA";
pub const ENV_SOURCE_DIR: &str = "SOURCE_DIR";
pub const ENV_TRANSPORT: &str = "DEPLOY_TRANSPORT";
pub const ENV_CONCURRENCY: &str = "DEPLOY_CONCURRENCY";

/// Conventional build output directory
pub const DEFAULT_SOURCE_DIR: &str = "dist";
/// Alias registered with `mc` when none is configured
pub const DEFAULT_ALIAS: &str = "minio";
/// Parallel uploads when none is configured
pub const DEFAULT_CONCURRENCY: usize = 8;

/// How the deploy talks to the object store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Native S3 client
    #[default]
    Sdk,
    /// MinIO Client (`mc`) subprocess
    Mc,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Sdk => "sdk",
            Transport::Mc => "mc",
        }
    }
}

impl FromStr for Transport {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sdk" | "s3" => Ok(Transport::Sdk),
            "mc" => Ok(Transport::Mc),
            other => Err(DeployError::InvalidConfig(format!(
                "unknown transport '{}' (expected 'sdk' or 'mc')",
                other
            ))),
        }
    }
}

/// Raw, possibly incomplete settings from one configuration layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub alias: Option<String>,
    pub remove_extra: Option<String>,
    pub source_dir: Option<String>,
    pub transport: Option<String>,
    pub concurrency: Option<String>,
}

impl Settings {
    /// Build settings from any variable lookup (process env, `.env`, test maps)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            endpoint: lookup(ENV_URL),
            access_key: lookup(ENV_ACCESS_KEY),
            secret_key: lookup(ENV_SECRET_KEY),
            bucket: lookup(ENV_BUCKET),
            prefix: lookup(ENV_PREFIX),
            region: lookup(ENV_REGION),
            alias: lookup(ENV_ALIAS),
            remove_extra: lookup(ENV_REMOVE_EXTRA),
            source_dir: lookup(ENV_SOURCE_DIR),
            transport: lookup(ENV_TRANSPORT),
            concurrency: lookup(ENV_CONCURRENCY),
        }
    }

    pub fn from_env_file(env: &EnvFile) -> Self {
        Self::from_lookup(|key| env.get(key).map(String::from))
    }

    /// Fill every unset (or blank) value from `fallback`
    pub fn or(self, fallback: Settings) -> Settings {
        fn pick(primary: Option<String>, fallback: Option<String>) -> Option<String> {
            match primary {
                Some(v) if !v.trim().is_empty() => Some(v),
                _ => fallback,
            }
        }

        Settings {
            endpoint: pick(self.endpoint, fallback.endpoint),
            access_key: pick(self.access_key, fallback.access_key),
            secret_key: pick(self.secret_key, fallback.secret_key),
            bucket: pick(self.bucket, fallback.bucket),
            prefix: pick(self.prefix, fallback.prefix),
            region: pick(self.region, fallback.region),
            alias: pick(self.alias, fallback.alias),
            remove_extra: pick(self.remove_extra, fallback.remove_extra),
            source_dir: pick(self.source_dir, fallback.source_dir),
            transport: pick(self.transport, fallback.transport),
            concurrency: pick(self.concurrency, fallback.concurrency),
        }
    }

    /// Validate into a [`DeployConfig`], reporting every missing key at once
    pub fn resolve(self) -> Result<DeployConfig> {
        let mut missing = Vec::new();
        let endpoint = required(self.endpoint, ENV_URL, &mut missing);
        let access_key = required(self.access_key, ENV_ACCESS_KEY, &mut missing);
        let secret_key = required(self.secret_key, ENV_SECRET_KEY, &mut missing);
        let bucket = required(self.bucket, ENV_BUCKET, &mut missing);

        if !missing.is_empty() {
            return Err(DeployError::MissingConfig(missing));
        }

        let endpoint = endpoint.trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(DeployError::InvalidConfig(format!(
                "{} must start with http:// or https:// (got '{}')",
                ENV_URL, endpoint
            )));
        }

        let transport = match optional(self.transport) {
            Some(t) => t.parse()?,
            None => Transport::default(),
        };

        let concurrency = match optional(self.concurrency) {
            Some(c) => match c.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(DeployError::InvalidConfig(format!(
                        "{} must be a positive integer (got '{}')",
                        ENV_CONCURRENCY, c
                    )))
                }
            },
            None => DEFAULT_CONCURRENCY,
        };

        let source_dir = optional(self.source_dir).unwrap_or_else(|| DEFAULT_SOURCE_DIR.into());
        let source_dir = PathBuf::from(shellexpand::tilde(&source_dir).as_ref());
        let prefix = optional(self.prefix).unwrap_or_default();

        Ok(DeployConfig {
            endpoint,
            access_key,
            secret_key,
            bucket,
            prefix: normalize_prefix(&prefix).to_string(),
            region: optional(self.region),
            alias: optional(self.alias).unwrap_or_else(|| DEFAULT_ALIAS.into()),
            remove_extra: optional(self.remove_extra)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            source_dir,
            transport,
            concurrency,
        })
    }
}

fn required(value: Option<String>, key: &str, missing: &mut Vec<String>) -> String {
    match optional(value) {
        Some(v) => v,
        None => {
            missing.push(key.to_string());
            String::new()
        }
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a boolean flag value (`1`, `true`, `yes`, `on`)
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Validated, immutable deploy configuration
#[derive(Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// Data-plane API URL, without trailing slash
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Normalized prefix (no leading/trailing separators), may be empty
    pub prefix: String,
    pub region: Option<String>,
    pub alias: String,
    pub remove_extra: bool,
    pub source_dir: PathBuf,
    pub transport: Transport,
    pub concurrency: usize,
}

impl DeployConfig {
    /// Human-readable destination, e.g. `site/widgets`
    pub fn destination(&self) -> String {
        if self.prefix.is_empty() {
            self.bucket.clone()
        } else {
            format!("{}/{}", self.bucket, self.prefix)
        }
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("region", &self.region)
            .field("alias", &self.alias)
            .field("remove_extra", &self.remove_extra)
            .field("source_dir", &self.source_dir)
            .field("transport", &self.transport)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
