//! Mapping between the config document and backend rows.
//!
//! The singleton settings row stores each section as a JSON column plus the
//! flat colour columns; each collection entity is one row carrying its
//! fields and an `order_index`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use sitekit_core::types::{
    About, Contact, Footer, Header, Hero, Identity, Registration, SectionTitles, Theme,
};
use sitekit_core::{
    CollectionKind, EntityId, MediaQuote, NewsItem, SettingsSection, SiteConfig, SocialLink,
    TeamMember,
};

use crate::remote::Row;
use crate::SyncError;

/// Table holding the singleton settings row.
pub const SETTINGS_TABLE: &str = "site_settings";
/// Column persisting an entity's position within its collection.
pub const ORDER_COLUMN: &str = "order_index";

const PALETTE_COLUMNS: &[&str] = &[
    "team_background_color",
    "team_text_color",
    "team_title_color",
    "news_background_color",
    "news_text_color",
    "news_title_color",
    "about_title_color",
];

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

/// A unit of synchronisation: one settings section or one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Part {
    Settings(SettingsSection),
    Collection(CollectionKind),
}

impl Part {
    pub fn all() -> Vec<Part> {
        SettingsSection::all()
            .iter()
            .copied()
            .map(Part::Settings)
            .chain(CollectionKind::all().iter().copied().map(Part::Collection))
            .collect()
    }

    pub fn key(&self) -> &'static str {
        match self {
            Part::Settings(section) => section.key(),
            Part::Collection(kind) => kind.key(),
        }
    }
}

impl std::fmt::Display for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// JSON value of `part` within `config`.
pub fn part_value(config: &SiteConfig, part: Part) -> Result<Value, SyncError> {
    Ok(match part {
        Part::Settings(SettingsSection::Palette) => Value::Object(palette_columns(config)),
        Part::Settings(section) => section_value(config, section)?,
        Part::Collection(CollectionKind::Team) => serde_json::to_value(&config.team)?,
        Part::Collection(CollectionKind::News) => serde_json::to_value(&config.news)?,
        Part::Collection(CollectionKind::Social) => serde_json::to_value(&config.social_media)?,
        Part::Collection(CollectionKind::MediaQuotes) => {
            serde_json::to_value(&config.media_quotes)?
        }
    })
}

fn section_value(config: &SiteConfig, section: SettingsSection) -> Result<Value, SyncError> {
    Ok(match section {
        SettingsSection::Identity => serde_json::to_value(&config.identity)?,
        SettingsSection::Header => serde_json::to_value(&config.header)?,
        SettingsSection::Footer => serde_json::to_value(&config.footer)?,
        SettingsSection::Registration => serde_json::to_value(&config.registration)?,
        SettingsSection::Theme => serde_json::to_value(&config.theme)?,
        SettingsSection::Hero => serde_json::to_value(&config.hero)?,
        SettingsSection::About => serde_json::to_value(&config.about)?,
        SettingsSection::Contact => serde_json::to_value(&config.contact)?,
        SettingsSection::SectionTitles => serde_json::to_value(&config.section_titles)?,
        SettingsSection::Palette => Value::Object(palette_columns(config)),
    })
}

fn palette_columns(config: &SiteConfig) -> Row {
    let mut row = Row::new();
    let text = |s: &str| Value::String(s.to_string());
    let opt = |s: &Option<String>| s.clone().map(Value::String).unwrap_or(Value::Null);
    row.insert(PALETTE_COLUMNS[0].into(), text(config.team_background_color.as_str()));
    row.insert(PALETTE_COLUMNS[1].into(), text(config.team_text_color.as_str()));
    row.insert(PALETTE_COLUMNS[2].into(), opt(&config.team_title_color));
    row.insert(PALETTE_COLUMNS[3].into(), text(config.news_background_color.as_str()));
    row.insert(PALETTE_COLUMNS[4].into(), text(config.news_text_color.as_str()));
    row.insert(PALETTE_COLUMNS[5].into(), opt(&config.news_title_color));
    row.insert(PALETTE_COLUMNS[6].into(), opt(&config.about_title_color));
    row
}

// ---------------------------------------------------------------------------
// Settings row
// ---------------------------------------------------------------------------

/// Columns of the settings row that `section` owns.
pub fn section_columns(section: SettingsSection) -> Vec<&'static str> {
    match section {
        SettingsSection::Palette => PALETTE_COLUMNS.to_vec(),
        other => vec![other.key()],
    }
}

/// Full settings row for `config` (every column, `id` included).
pub fn settings_to_row(config: &SiteConfig, settings_id: i64) -> Result<Row, SyncError> {
    let mut row = Row::new();
    row.insert("id".into(), Value::from(settings_id));
    for section in SettingsSection::all() {
        match section {
            SettingsSection::Palette => row.extend(palette_columns(config)),
            other => {
                row.insert(other.key().into(), section_value(config, *other)?);
            }
        }
    }
    Ok(row)
}

/// Settings portion of a document decoded from the settings row.
///
/// Each JSON column is merged over its defaults; empty or missing background
/// and text colours fall back to the default palette, optional title colours
/// stay unset. Collections are left empty.
pub fn settings_from_row(row: &Row) -> SiteConfig {
    let defaults = SiteConfig::default();
    SiteConfig {
        identity: column::<Identity>(row, "identity"),
        header: column::<Header>(row, "header"),
        footer: column::<Footer>(row, "footer"),
        registration: column::<Registration>(row, "registration"),
        theme: column::<Theme>(row, "theme"),
        hero: column::<Hero>(row, "hero"),
        about: column::<About>(row, "about"),
        contact: column::<Contact>(row, "contact"),
        section_titles: column::<SectionTitles>(row, "section_titles"),
        team_background_color: flat(row, "team_background_color")
            .unwrap_or(defaults.team_background_color),
        team_text_color: flat(row, "team_text_color").unwrap_or(defaults.team_text_color),
        team_title_color: flat(row, "team_title_color"),
        news_background_color: flat(row, "news_background_color")
            .unwrap_or(defaults.news_background_color),
        news_text_color: flat(row, "news_text_color").unwrap_or(defaults.news_text_color),
        news_title_color: flat(row, "news_title_color"),
        about_title_color: flat(row, "about_title_color"),
        social_media: Vec::new(),
        team: Vec::new(),
        news: Vec::new(),
        media_quotes: Vec::new(),
    }
}

/// Decode a JSON section column field by field over the section defaults.
///
/// Null members keep their default; a member of the wrong type is dropped
/// on its own without discarding the rest of the section.
fn column<T: Serialize + DeserializeOwned + Default>(row: &Row, name: &str) -> T {
    let stored = match row.get(name) {
        None | Some(Value::Null) => return T::default(),
        Some(Value::Object(stored)) => stored,
        Some(other) => {
            tracing::warn!("settings column '{name}' is not an object, using defaults: {other}");
            return T::default();
        }
    };

    let mut merged = match serde_json::to_value(T::default()) {
        Ok(Value::Object(defaults)) => defaults,
        _ => Row::new(),
    };
    for (field, value) in stored.iter().filter(|(_, v)| !v.is_null()) {
        let mut candidate = merged.clone();
        candidate.insert(field.clone(), value.clone());
        match serde_json::from_value::<T>(Value::Object(candidate.clone())) {
            Ok(_) => merged = candidate,
            Err(e) => tracing::warn!("settings column '{name}': ignoring field '{field}': {e}"),
        }
    }
    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}

fn flat(row: &Row, name: &str) -> Option<String> {
    row.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Collection entities
// ---------------------------------------------------------------------------

/// A collection entry stored as one row of its own table.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const KIND: CollectionKind;

    fn id(&self) -> &EntityId;
    fn set_id(&mut self, id: EntityId);
    fn items(config: &SiteConfig) -> &Vec<Self>;
    fn items_mut(config: &mut SiteConfig) -> &mut Vec<Self>;
}

macro_rules! entity {
    ($ty:ty, $kind:expr, $field:ident) => {
        impl Entity for $ty {
            const KIND: CollectionKind = $kind;

            fn id(&self) -> &EntityId {
                &self.id
            }

            fn set_id(&mut self, id: EntityId) {
                self.id = id;
            }

            fn items(config: &SiteConfig) -> &Vec<Self> {
                &config.$field
            }

            fn items_mut(config: &mut SiteConfig) -> &mut Vec<Self> {
                &mut config.$field
            }
        }
    };
}

entity!(TeamMember, CollectionKind::Team, team);
entity!(NewsItem, CollectionKind::News, news);
entity!(SocialLink, CollectionKind::Social, social_media);
entity!(MediaQuote, CollectionKind::MediaQuotes, media_quotes);

/// Row for `entity` at position `order_index`, without the `id` column.
pub fn entity_to_row<E: Entity>(entity: &E, order_index: usize) -> Result<Row, SyncError> {
    let mut row = match serde_json::to_value(entity)? {
        Value::Object(row) => row,
        other => {
            let mut row = Row::new();
            row.insert("value".into(), other);
            row
        }
    };
    row.remove("id");
    row.insert(ORDER_COLUMN.into(), Value::from(order_index as u64));
    Ok(row)
}

/// Decode a backend row; unknown columns such as `created_at` are ignored.
pub fn entity_from_row<E: Entity>(row: &Row) -> Result<E, SyncError> {
    serde_json::from_value(Value::Object(row.clone())).map_err(|source| SyncError::Decode {
        table: E::KIND.table().to_string(),
        source,
    })
}

/// Decode rows already sorted by `order_index`.
pub fn entities_from_rows<E: Entity>(rows: &[Row]) -> Result<Vec<E>, SyncError> {
    rows.iter().map(entity_from_row).collect()
}

/// Fill the collections of `config` from per-table rows.
pub fn collections_from_rows(
    config: &mut SiteConfig,
    rows: &BTreeMap<CollectionKind, Vec<Row>>,
) -> Result<(), SyncError> {
    let empty = Vec::new();
    let get = |kind: CollectionKind| rows.get(&kind).unwrap_or(&empty);
    config.team = entities_from_rows(get(CollectionKind::Team))?;
    config.news = entities_from_rows(get(CollectionKind::News))?;
    config.social_media = entities_from_rows(get(CollectionKind::Social))?;
    config.media_quotes = entities_from_rows(get(CollectionKind::MediaQuotes))?;
    Ok(())
}
