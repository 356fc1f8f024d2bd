//! # sitekit-sync
//!
//! Reconciles a local site document with its PostgREST backend.
//!
//! Call [`push`] to send local edits (settings row plus the four ordered
//! collections) and [`pull`] to replace the local document with the remote
//! one. [`run`] pushes every initialised site and is what the daemon uses.

pub mod apply;
pub mod auth;
pub mod diff;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod pull;
pub mod remote;
pub mod schema;
pub mod snapshot;
pub mod status;

pub use apply::{ApplyOutcome, IdMap, WriteResult};
pub use error::SyncError;
pub use pipeline::{
    connect_at, pull, pull_site, push, push_site, run, PartFailure, PullReport, PushReport,
    SiteScope, SyncScope,
};
pub use remote::{MemoryStore, RestStore, Row, RowStore};
pub use schema::Part;
pub use snapshot::Snapshot;
pub use status::StatusSignal;
