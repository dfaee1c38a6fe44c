//! Local directory walk

use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{DeployError, Result};

/// A regular file found under the source directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalFile {
    pub absolute_path: PathBuf,
    /// Path relative to the walk root, always `/`-separated
    pub relative_path: String,
}

/// Collect every regular file under `root`, sorted by relative path.
///
/// Directories are not followed through symlinks. A symlink whose target is
/// a regular file is included; links to directories and dangling links are
/// skipped.
pub fn walk_local(root: &Path) -> Result<Vec<LocalFile>> {
    if !root.is_dir() {
        return Err(DeployError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("'{}' is not a directory", root.display()),
        )));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1);

    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            continue;
        }

        if file_type.is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => {
                    tracing::debug!("Skipping symlink to directory: {}", entry.path().display());
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Skipping dangling symlink {}: {}", entry.path().display(), e);
                    continue;
                }
            }
        } else if !file_type.is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| DeployError::InvalidPath(entry.path().to_path_buf()))?;

        files.push(LocalFile {
            absolute_path: entry.path().to_path_buf(),
            relative_path: to_slash_path(relative)?,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracing::debug!("Found {} files under {}", files.len(), root.display());

    Ok(files)
}

/// Join the normal components of a relative path with `/`
fn to_slash_path(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part
                .to_str()
                .ok_or_else(|| DeployError::InvalidPath(relative.to_path_buf()))?;
            parts.push(part);
        }
    }
    Ok(parts.join("/"))
}
