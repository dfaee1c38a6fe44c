//! `.env` file handling
//!
//! The deploy configuration lives in a plain `KEY=value` file next to the
//! project. This module parses it, and scaffolds it from a template when the
//! file does not exist yet.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Default location of the configuration file, relative to the working directory
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Variables listed by the scaffolding utility, in display order
pub const KNOWN_VARS: &[&str] = &[
    "MINIO_URL",
    "MINIO_ACCESS_KEY",
    "MINIO_SECRET_KEY",
    "MINIO_BUCKET",
    "MINIO_PREFIX",
    "MINIO_REGION",
    "MINIO_ALIAS",
    "MINIO_REMOVE_EXTRA",
    "SOURCE_DIR",
];

/// Variables whose values are masked when printed
pub const SECRET_VARS: &[&str] = &["MINIO_SECRET_KEY"];

const TEMPLATE: &str = "\
# MinIO deploy settings
# NEVER commit real credentials. Keep this file in .gitignore

MINIO_URL=http://localhost:9000
MINIO_ACCESS_KEY=
MINIO_SECRET_KEY=
MINIO_BUCKET=

# Optional: sub-path inside the bucket (e.g. widgets/info)
MINIO_PREFIX=

# Optional: bucket region hint (e.g. us-east-1)
MINIO_REGION=

# Optional: alias name used by the mc transport (default: minio)
MINIO_ALIAS=minio

# Optional: set to 1 to remove remote files that no longer exist locally
MINIO_REMOVE_EXTRA=

# Optional: local build output to upload (default: dist)
SOURCE_DIR=dist
";

/// Parsed contents of a `.env` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    values: HashMap<String, String>,
}

impl EnvFile {
    /// Parse `.env` content.
    ///
    /// Blank lines, `#` comments, lines without `=` and lines with an empty
    /// key are skipped. Keys and values are trimmed and a single leading and
    /// trailing quote is removed from the value. Later duplicates win.
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }

            values.insert(key.to_string(), unquote(value.trim()).to_string());
        }

        Self { values }
    }

    /// Load a `.env` file, returning an empty set when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        tracing::debug!("Loading variables from '{}'", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .or_else(|| value.strip_prefix('\''))
        .unwrap_or(value);
    value
        .strip_suffix('"')
        .or_else(|| value.strip_suffix('\''))
        .unwrap_or(value)
}

/// Template written by [`init_env_file`]
pub fn template() -> &'static str {
    TEMPLATE
}

/// Outcome of [`init_env_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The template was written to the given path
    Created(PathBuf),
    /// The file already existed and was left untouched
    Existing(PathBuf, EnvFile),
}

/// Create the `.env` file from the template, or read it back if present
pub fn init_env_file(path: &Path) -> Result<InitOutcome> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        return Ok(InitOutcome::Existing(
            path.to_path_buf(),
            EnvFile::parse(&content),
        ));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, TEMPLATE)?;
    tracing::info!("Created {}", path.display());

    Ok(InitOutcome::Created(path.to_path_buf()))
}

/// Render the known variables as `KEY=value` lines
pub fn render_known_vars(env: &EnvFile, show_secrets: bool) -> Vec<String> {
    KNOWN_VARS
        .iter()
        .map(|key| {
            let value = env.get(key).unwrap_or("");
            if !show_secrets && !value.is_empty() && SECRET_VARS.contains(key) {
                format!("{}=********", key)
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect()
}
