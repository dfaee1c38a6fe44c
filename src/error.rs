//! Error types for minio-deploy

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for deploy operations
pub type Result<T> = std::result::Result<T, DeployError>;

/// Main error type for minio-deploy
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Source directory not found: {}. Run the build first (e.g. npm run build)",
        .0.display()
    )]
    SourceNotFound(PathBuf),

    #[error("Failed to provision bucket '{bucket}': {message}{}", render_hint(.hint))]
    Provisioning {
        bucket: String,
        message: String,
        hint: Option<String>,
    },

    #[error("Transfer failed for '{key}' ({completed} of {total} operations completed): {message}")]
    Transfer {
        key: String,
        completed: usize,
        total: usize,
        message: String,
    },

    #[error("Remote storage error: {0}")]
    Remote(String),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("External tool error: {0}")]
    Tool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

fn render_hint(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!("\nHint: {}", hint),
        None => String::new(),
    }
}

impl DeployError {
    /// Whether the error happened before any network call was made
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            DeployError::MissingConfig(_)
                | DeployError::InvalidConfig(_)
                | DeployError::SourceNotFound(_)
        )
    }

    /// Process exit code for the binaries
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::MissingConfig(_) | DeployError::InvalidConfig(_) => 2,
            DeployError::SourceNotFound(_) => 3,
            DeployError::Provisioning { .. } => 4,
            DeployError::Transfer { .. } | DeployError::Remote(_) => 5,
            DeployError::Tool(_) => 6,
            _ => 1,
        }
    }
}
