//! Domain types for the sitekit config document and site profiles.
//!
//! Every document struct carries container-level `#[serde(default)]`, so a
//! partial YAML document or a partial remote JSON column is completed
//! field-by-field from [`crate::defaults`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a managed site (also its directory name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteName(pub String);

impl fmt::Display for SiteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SiteName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SiteName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Key of a collection entity.
///
/// Either a temporary client key (`new-…`, timestamps, seed ids) or a
/// backend-assigned identifier; see [`crate::ident`]. Serialized as a string,
/// deserialized from a string or an integer so numeric server keys survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Option::<RawId>::deserialize(deserializer)? {
            Some(RawId::Text(s)) => Self(s),
            Some(RawId::Signed(n)) => Self(n.to_string()),
            Some(RawId::Unsigned(n)) => Self(n.to_string()),
            None => Self::default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Font family offered by the theme editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FontFamily {
    Inter,
    #[default]
    Poppins,
    Roboto,
    #[serde(rename = "Playfair Display")]
    PlayfairDisplay,
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontFamily::Inter => write!(f, "Inter"),
            FontFamily::Poppins => write!(f, "Poppins"),
            FontFamily::Roboto => write!(f, "Roboto"),
            FontFamily::PlayfairDisplay => write!(f, "Playfair Display"),
        }
    }
}

/// Corner rounding applied to cards and buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Rounded {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "sm")]
    Sm,
    #[serde(rename = "md")]
    Md,
    #[serde(rename = "lg")]
    Lg,
    #[default]
    #[serde(rename = "xl")]
    Xl,
    #[serde(rename = "2xl")]
    Xl2,
    #[serde(rename = "3xl")]
    Xl3,
}

/// Social network of a [`SocialLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Platform {
    Facebook,
    Twitter,
    Instagram,
    Youtube,
    LinkedIn,
    TikTok,
    #[default]
    Website,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Facebook => "Facebook",
            Platform::Twitter => "Twitter",
            Platform::Instagram => "Instagram",
            Platform::Youtube => "Youtube",
            Platform::LinkedIn => "LinkedIn",
            Platform::TikTok => "TikTok",
            Platform::Website => "Website",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Settings sections (singleton record)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub name: String,
    pub logo_url: String,
    pub tagline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    pub background_color: String,
    pub text_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_color: Option<String>,
    pub is_sticky: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Footer {
    pub background_color: String,
    pub text_color: String,
    pub description: String,
    pub copyright_text: String,
}

/// Registration call-to-action shown in the footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub enabled: bool,
    pub button_text: String,
    pub url: String,
    pub button_color: String,
    pub button_text_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub primary_color: String,
    pub secondary_color: String,
    pub button_color: String,
    pub button_hover_color: String,
    pub font_family: FontFamily,
    pub rounded: Rounded,
}

/// Hero banner; `images` is the carousel and `image_url` mirrors its first slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hero {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub images: Vec<String>,
    pub cta_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cta_button_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cta_button_text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cta_button_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_button_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_button_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_button_text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_button_link: Option<String>,
    pub background_color: String,
    pub text_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct About {
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub background_color: String,
    pub text_color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub address: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionTitles {
    pub structure: String,
    pub news: String,
}

// ---------------------------------------------------------------------------
// Collection entities
// ---------------------------------------------------------------------------
//
// Optional entity fields serialize as `null` rather than being skipped: a
// row patch must be able to clear a column. Reading is more lenient: a NULL
// column decodes as the field's default.

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(default)]
    pub id: EntityId,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub photo_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub id: EntityId,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    /// Publication date, `YYYY-MM-DD`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_featured: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    #[serde(default)]
    pub id: EntityId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub platform: Platform,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub icon_color: Option<String>,
}

/// Press quote about the organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaQuote {
    #[serde(default)]
    pub id: EntityId,
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Root document
// ---------------------------------------------------------------------------

/// The whole editable site: singleton settings plus four ordered collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub identity: Identity,
    pub header: Header,
    pub footer: Footer,
    pub registration: Registration,
    pub theme: Theme,
    pub hero: Hero,
    pub about: About,
    pub contact: Contact,
    pub social_media: Vec<SocialLink>,
    pub team: Vec<TeamMember>,
    pub team_background_color: String,
    pub team_text_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_title_color: Option<String>,
    pub news: Vec<NewsItem>,
    pub news_background_color: String,
    pub news_text_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_title_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_title_color: Option<String>,
    pub section_titles: SectionTitles,
    pub media_quotes: Vec<MediaQuote>,
}

/// A part of the singleton settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingsSection {
    Identity,
    Header,
    Footer,
    Registration,
    Theme,
    Hero,
    About,
    Contact,
    /// The flat team/news/about colour fields.
    Palette,
    SectionTitles,
}

impl SettingsSection {
    pub fn all() -> &'static [SettingsSection] {
        &[
            SettingsSection::Identity,
            SettingsSection::Header,
            SettingsSection::Footer,
            SettingsSection::Registration,
            SettingsSection::Theme,
            SettingsSection::Hero,
            SettingsSection::About,
            SettingsSection::Contact,
            SettingsSection::Palette,
            SettingsSection::SectionTitles,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            SettingsSection::Identity => "identity",
            SettingsSection::Header => "header",
            SettingsSection::Footer => "footer",
            SettingsSection::Registration => "registration",
            SettingsSection::Theme => "theme",
            SettingsSection::Hero => "hero",
            SettingsSection::About => "about",
            SettingsSection::Contact => "contact",
            SettingsSection::Palette => "palette",
            SettingsSection::SectionTitles => "section_titles",
        }
    }
}

impl fmt::Display for SettingsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One of the four ordered collections, each stored in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    Team,
    News,
    Social,
    MediaQuotes,
}

impl CollectionKind {
    /// All collections in a stable order.
    pub fn all() -> &'static [CollectionKind] {
        &[
            CollectionKind::Team,
            CollectionKind::News,
            CollectionKind::Social,
            CollectionKind::MediaQuotes,
        ]
    }

    /// Backend table holding the collection's rows.
    pub fn table(&self) -> &'static str {
        match self {
            CollectionKind::Team => "team_members",
            CollectionKind::News => "news_items",
            CollectionKind::Social => "social_links",
            CollectionKind::MediaQuotes => "media_quotes",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            CollectionKind::Team => "team",
            CollectionKind::News => "news",
            CollectionKind::Social => "social",
            CollectionKind::MediaQuotes => "quotes",
        }
    }

    /// Number of entries of this kind in `config`.
    pub fn len_in(&self, config: &SiteConfig) -> usize {
        match self {
            CollectionKind::Team => config.team.len(),
            CollectionKind::News => config.news.len(),
            CollectionKind::Social => config.social_media.len(),
            CollectionKind::MediaQuotes => config.media_quotes.len(),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "team" | "team_members" => Ok(CollectionKind::Team),
            "news" | "news_items" => Ok(CollectionKind::News),
            "social" | "social_links" | "social_media" => Ok(CollectionKind::Social),
            "quotes" | "media_quotes" => Ok(CollectionKind::MediaQuotes),
            other => Err(format!(
                "unknown collection '{other}'; expected: team, news, social, quotes"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Profile & session
// ---------------------------------------------------------------------------

/// Environment variable overriding [`RemoteProfile::url`].
pub const ENV_REMOTE_URL: &str = "SITEKIT_REMOTE_URL";
/// Environment variable overriding [`RemoteProfile::anon_key`].
pub const ENV_ANON_KEY: &str = "SITEKIT_ANON_KEY";

fn default_settings_id() -> i64 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Connection details for the remote row store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProfile {
    /// Project base URL, e.g. `https://<ref>.supabase.co`.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    /// Primary key of the singleton settings row.
    #[serde(default = "default_settings_id")]
    pub settings_id: i64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl RemoteProfile {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            settings_id: default_settings_id(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }

    /// Apply `SITEKIT_REMOTE_URL` / `SITEKIT_ANON_KEY` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_REMOTE_URL).filter(|v| !v.trim().is_empty()) {
            self.url = url;
        }
        if let Some(key) = lookup(ENV_ANON_KEY).filter(|v| !v.trim().is_empty()) {
            self.anon_key = key;
        }
        self
    }

    /// True when both the URL and the key are filled in.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

/// A managed site: `~/.sitekit/sites/<name>/site.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: SiteName,
    pub remote: RemoteProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Authenticated operator session obtained by password sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(SiteName::from("campaign").to_string(), "campaign");
        assert_eq!(EntityId::from("new-1").to_string(), "new-1");
    }

    #[test]
    fn entity_id_accepts_numbers_and_null() {
        #[derive(Deserialize)]
        struct Row {
            id: EntityId,
        }
        let row: Row = serde_json::from_str(r#"{"id": 42}"#).expect("numeric id");
        assert_eq!(row.id, EntityId::from("42"));
        let row: Row = serde_json::from_str(r#"{"id": null}"#).expect("null id");
        assert!(row.id.is_empty());
        let row: Row = serde_json::from_str(r#"{"id": "abc"}"#).expect("string id");
        assert_eq!(row.id.as_str(), "abc");
    }

    #[test]
    fn entity_id_serializes_as_string() {
        let json = serde_json::to_string(&EntityId::from("7")).expect("serialize");
        assert_eq!(json, r#""7""#);
    }

    #[test]
    fn enums_use_document_spelling() {
        assert_eq!(
            serde_json::to_string(&FontFamily::PlayfairDisplay).unwrap(),
            r#""Playfair Display""#
        );
        assert_eq!(serde_json::to_string(&Rounded::Xl2).unwrap(), r#""2xl""#);
        assert_eq!(serde_json::to_string(&Platform::LinkedIn).unwrap(), r#""LinkedIn""#);
    }

    #[test]
    fn collection_kind_parses_aliases() {
        assert_eq!("team".parse::<CollectionKind>(), Ok(CollectionKind::Team));
        assert_eq!("media_quotes".parse::<CollectionKind>(), Ok(CollectionKind::MediaQuotes));
        assert_eq!("Social".parse::<CollectionKind>(), Ok(CollectionKind::Social));
        assert!("gallery".parse::<CollectionKind>().is_err());
    }

    #[test]
    fn partial_section_is_completed_from_defaults() {
        let header: Header = serde_json::from_str(r##"{"text_color": "#000000"}"##).unwrap();
        assert_eq!(header.text_color, "#000000");
        assert_eq!(header.background_color, Header::default().background_color);
        assert!(header.is_sticky);
    }

    #[test]
    fn null_entity_columns_decode_as_defaults() {
        let item: NewsItem = serde_json::from_str(
            r#"{"id": "n1", "title": "Gala", "date": null, "images": null,
                "is_featured": null, "tags": null, "slug": null}"#,
        )
        .expect("null columns");
        assert_eq!(item.title, "Gala");
        assert!(item.date.is_empty());
        assert!(item.images.is_empty() && item.tags.is_empty());
        assert!(!item.is_featured);

        let link: SocialLink =
            serde_json::from_str(r#"{"id": 3, "platform": null, "url": "https://x.org"}"#)
                .expect("null platform");
        assert_eq!(link.platform, Platform::Website);

        let member: TeamMember =
            serde_json::from_str(r#"{"id": "t1", "name": "Ada", "role": null, "photo_url": null}"#)
                .expect("null team columns");
        assert!(member.role.is_empty() && member.photo_url.is_empty());
    }

    #[test]
    fn required_entity_columns_must_be_present() {
        let missing = serde_json::from_str::<MediaQuote>(r#"{"id": "q1", "source": "Herald"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn env_overrides_replace_remote_credentials() {
        let profile = RemoteProfile::new("https://old.example", "old-key").with_overrides_from(
            |key| match key {
                ENV_REMOTE_URL => Some("https://new.example".to_string()),
                ENV_ANON_KEY => Some("   ".to_string()),
                _ => None,
            },
        );
        assert_eq!(profile.url, "https://new.example");
        assert_eq!(profile.anon_key, "old-key", "blank override is ignored");
    }

    #[test]
    fn session_expiry() {
        let now = Utc::now();
        let session = Session {
            access_token: "t".into(),
            refresh_token: None,
            email: "ops@example.org".into(),
            expires_at: Some(now - chrono::Duration::seconds(1)),
        };
        assert!(session.is_expired(now));
        let open = Session { expires_at: None, ..session };
        assert!(!open.is_expired(now));
    }
}
