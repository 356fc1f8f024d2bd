//! Error types for sitekit-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error on the session file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.sitekit/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The site directory or one of its files did not exist.
    #[error("site not found at {path}")]
    SiteNotFound { path: PathBuf },

    /// Site names become directory names; path separators and dot-names are rejected.
    #[error("invalid site name '{0}': use letters, digits, '-' or '_'")]
    InvalidSiteName(String),
}
