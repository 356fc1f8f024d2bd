//! Document validation run before every push.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;

use crate::defaults::MAX_HERO_IMAGES;
use crate::types::{CollectionKind, EntityId, SiteConfig};

/// One reason a document cannot be pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted location, e.g. `hero.images` or `news[2].date`.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config`; an empty result means it may be pushed.
pub fn validate(config: &SiteConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if config.hero.images.len() > MAX_HERO_IMAGES {
        issues.push(ValidationIssue::new(
            "hero.images",
            format!(
                "carousel holds at most {MAX_HERO_IMAGES} images, found {}",
                config.hero.images.len()
            ),
        ));
    }

    for (i, member) in config.team.iter().enumerate() {
        if member.name.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("team[{i}].name"), "name is required"));
        }
    }

    for (i, item) in config.news.iter().enumerate() {
        if item.title.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("news[{i}].title"), "title is required"));
        }
        if !is_iso_date(&item.date) {
            issues.push(ValidationIssue::new(
                format!("news[{i}].date"),
                format!("expected YYYY-MM-DD, got '{}'", item.date),
            ));
        }
    }

    for (i, link) in config.social_media.iter().enumerate() {
        if link.url.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("social_media[{i}].url"), "URL is required"));
        }
    }

    for (i, quote) in config.media_quotes.iter().enumerate() {
        if quote.content.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("media_quotes[{i}].content"),
                "quote text is required",
            ));
        }
        if quote.source.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("media_quotes[{i}].source"),
                "media source is required",
            ));
        }
    }

    check_unique(CollectionKind::Team, config.team.iter().map(|m| &m.id), &mut issues);
    check_unique(CollectionKind::News, config.news.iter().map(|n| &n.id), &mut issues);
    check_unique(CollectionKind::Social, config.social_media.iter().map(|s| &s.id), &mut issues);
    check_unique(
        CollectionKind::MediaQuotes,
        config.media_quotes.iter().map(|q| &q.id),
        &mut issues,
    );

    issues
}

fn check_unique<'a>(
    kind: CollectionKind,
    ids: impl Iterator<Item = &'a EntityId>,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen = HashSet::new();
    for id in ids.filter(|id| !id.is_empty()) {
        if !seen.insert(id.as_str()) {
            issues.push(ValidationIssue::new(
                kind.key(),
                format!("duplicate id '{id}'"),
            ));
        }
    }
}

fn is_iso_date(raw: &str) -> bool {
    raw.len() == 10 && NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}
