//! Error types for sitekit-sync.

use std::path::PathBuf;

use thiserror::Error;

use sitekit_core::{StoreError, ValidationIssue};

/// PostgREST / Postgres codes meaning "relation does not exist".
const MISSING_TABLE_CODES: &[&str] = &["42P01", "PGRST205"];

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the local store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (rows, snapshot).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The backend answered with a non-success status.
    #[error("remote error (HTTP {status}): {message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Connection, DNS or timeout failure, after all retries.
    #[error("remote unreachable after {attempts} attempt(s): {last}")]
    Unreachable { attempts: u32, last: String },

    /// A remote row could not be decoded into its entity type.
    #[error("cannot decode row from {table}: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    /// A write is planned for a table the backend does not have.
    #[error("table {table} does not exist on the backend")]
    MissingTable { table: String },

    #[error("duplicate id '{id}' in {table}")]
    DuplicateId { table: String, id: String },

    #[error("insert into {table} returned {got} row(s), expected {expected}")]
    InsertMismatch {
        table: String,
        expected: usize,
        got: usize,
    },

    /// The local document failed validation; nothing was sent.
    #[error("document has {} validation issue(s)", .0.len())]
    Invalid(Vec<ValidationIssue>),

    #[error("site '{site}' has no remote configured (set url/anon_key in site.yaml or SITEKIT_REMOTE_URL / SITEKIT_ANON_KEY)")]
    NotConfigured { site: String },

    #[error("site '{site}' has never been synced")]
    NeverSynced { site: String },

    /// `pull` would overwrite local edits.
    #[error("local changes not yet pushed: {}", .parts.join(", "))]
    UnsyncedChanges { parts: Vec<String> },

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl SyncError {
    /// True when the backend reports that the queried table does not exist.
    pub fn is_missing_table(&self) -> bool {
        match self {
            SyncError::Remote {
                status,
                code,
                message,
            } => {
                *status == 404
                    || code
                        .as_deref()
                        .map(|c| MISSING_TABLE_CODES.contains(&c))
                        .unwrap_or(false)
                    || message.contains("does not exist")
            }
            SyncError::MissingTable { .. } => true,
            _ => false,
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
