//! sitekit core library: config document types, defaults, local store, errors.
//!
//! - [`types`]: newtypes, the [`SiteConfig`] document and its sections
//! - [`defaults`]: default palette and copy every load is merged over
//! - [`ident`]: temporary vs. server-assigned identifiers
//! - [`normalize`] / [`validate`]: pre-push document preparation
//! - [`store`]: profile / document / session persistence under `~/.sitekit/`
//! - [`error`]: [`StoreError`]

pub mod defaults;
pub mod error;
pub mod ident;
pub mod normalize;
pub mod store;
pub mod types;
pub mod validate;

pub use error::StoreError;
pub use ident::IdOrigin;
pub use normalize::NormalizeReport;
pub use types::{
    CollectionKind, EntityId, MediaQuote, NewsItem, Platform, RemoteProfile, SettingsSection,
    Session, SiteConfig, SiteName, SiteProfile, SocialLink, TeamMember,
};
pub use validate::ValidationIssue;
