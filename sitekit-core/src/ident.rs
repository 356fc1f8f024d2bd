//! Identifier origin: client-generated temporary keys vs. backend-assigned ids.
//!
//! | Shape                        | Origin      | On push                          |
//! |------------------------------|-------------|----------------------------------|
//! | empty, `new-…`               | `Temporary` | inserted, backend assigns the key |
//! | UUID                         | `Server`    | updated, or re-inserted with key |
//! | anything else (`"1"`, millis)| `Client`    | updated when the backend has it  |
//!
//! Whether a record already exists is decided by the reconciliation planner
//! against the remote row set, never by shape alone.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use uuid::Uuid;

use crate::types::EntityId;

/// Prefix of keys minted for entries not yet known to the backend.
pub const TEMPORARY_PREFIX: &str = "new-";

/// Where an [`EntityId`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdOrigin {
    /// Minted locally for a brand-new entry; never sent to the backend.
    Temporary,
    /// Shaped like a backend-assigned key (UUID).
    Server,
    /// Client-chosen key of unknown provenance (seed ids, timestamps).
    Client,
}

/// Classify `id` by its shape.
pub fn classify(id: &EntityId) -> IdOrigin {
    let raw = id.as_str().trim();
    if raw.is_empty() || raw.starts_with(TEMPORARY_PREFIX) {
        IdOrigin::Temporary
    } else if Uuid::parse_str(raw).is_ok() {
        IdOrigin::Server
    } else {
        IdOrigin::Client
    }
}

impl EntityId {
    pub fn origin(&self) -> IdOrigin {
        classify(self)
    }

    pub fn is_temporary(&self) -> bool {
        self.origin() == IdOrigin::Temporary
    }
}

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Mint a fresh temporary key: `new-<unix-millis>-<sequence>`.
pub fn temporary_id() -> EntityId {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EntityId(format!(
        "{TEMPORARY_PREFIX}{}-{seq}",
        Utc::now().timestamp_millis()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", IdOrigin::Temporary)]
    #[case("   ", IdOrigin::Temporary)]
    #[case("new-1732000000000", IdOrigin::Temporary)]
    #[case("6f9619ff-8b86-d011-b42d-00cf4fc964ff", IdOrigin::Server)]
    #[case("1", IdOrigin::Client)]
    #[case("1732000000000", IdOrigin::Client)]
    #[case("renewal-2024", IdOrigin::Client)]
    fn classifies_by_shape(#[case] raw: &str, #[case] expected: IdOrigin) {
        assert_eq!(classify(&EntityId::from(raw)), expected);
    }

    #[test]
    fn temporary_ids_are_unique_and_temporary() {
        let a = temporary_id();
        let b = temporary_id();
        assert_ne!(a, b);
        assert!(a.is_temporary());
        assert!(b.as_str().starts_with(TEMPORARY_PREFIX));
    }
}
