//! Pre-push document preparation.
//!
//! Normalisation is idempotent: running it on its own output changes nothing.

use std::collections::HashSet;

use crate::ident::temporary_id;
use crate::types::{EntityId, SiteConfig};

/// What [`normalize`] changed, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub hero_synced: bool,
    pub ids_minted: usize,
    pub slugs_written: usize,
}

impl NormalizeReport {
    pub fn is_noop(&self) -> bool {
        !self.hero_synced && self.ids_minted == 0 && self.slugs_written == 0
    }
}

/// Normalise `config` in place.
pub fn normalize(config: &mut SiteConfig) -> NormalizeReport {
    let mut report = NormalizeReport {
        hero_synced: sync_hero_images(config),
        ..NormalizeReport::default()
    };

    report.ids_minted += mint_missing(config.team.iter_mut().map(|m| &mut m.id));
    report.ids_minted += mint_missing(config.news.iter_mut().map(|n| &mut n.id));
    report.ids_minted += mint_missing(config.social_media.iter_mut().map(|s| &mut s.id));
    report.ids_minted += mint_missing(config.media_quotes.iter_mut().map(|q| &mut q.id));

    report.slugs_written = assign_slugs(config);
    report
}

/// Keep `hero.image_url` equal to the first carousel slide.
fn sync_hero_images(config: &mut SiteConfig) -> bool {
    let hero = &mut config.hero;
    let before = hero.images.len();
    hero.images.retain(|url| !url.trim().is_empty());
    let pruned = hero.images.len() != before;
    match hero.images.first() {
        Some(first) if *first != hero.image_url => {
            hero.image_url = first.clone();
            true
        }
        Some(_) => pruned,
        None if !hero.image_url.trim().is_empty() => {
            hero.images.push(hero.image_url.clone());
            true
        }
        None => pruned,
    }
}

fn mint_missing<'a>(ids: impl Iterator<Item = &'a mut EntityId>) -> usize {
    let mut minted = 0;
    for id in ids {
        if id.is_empty() {
            *id = temporary_id();
            minted += 1;
        }
    }
    minted
}

/// Derive missing news slugs from titles and de-duplicate all slugs in
/// document order (`-2`, `-3`, …).
fn assign_slugs(config: &mut SiteConfig) -> usize {
    let mut written = 0;
    let mut taken = HashSet::new();
    for item in &mut config.news {
        let base = match item.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => {
                let derived = slugify(&item.title);
                if derived.is_empty() {
                    item.id.as_str().to_string()
                } else {
                    derived
                }
            }
        };

        let mut candidate = base.clone();
        let mut n = 2;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{base}-{n}");
            n += 1;
        }

        if item.slug.as_deref() != Some(candidate.as_str()) {
            item.slug = Some(candidate);
            written += 1;
        }
    }
    written
}

/// URL slug: lowercase ASCII alphanumerics, every other run collapsed to `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewsItem;

    fn news(id: &str, title: &str, slug: Option<&str>) -> NewsItem {
        NewsItem {
            id: EntityId::from(id),
            title: title.to_string(),
            date: "2024-01-20".to_string(),
            content: String::new(),
            image_url: String::new(),
            images: vec![],
            is_featured: false,
            tags: vec![],
            slug: slug.map(str::to_string),
        }
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Annual Meeting: 2024 -- Plans! "), "annual-meeting-2024-plans");
        assert_eq!(slugify("Ünïcode only"), "n-code-only");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn hero_first_slide_drives_image_url() {
        let mut config = SiteConfig::default();
        config.hero.images = vec!["a.jpg".into(), "b.jpg".into()];
        config.hero.image_url = "old.jpg".into();
        let report = normalize(&mut config);
        assert!(report.hero_synced);
        assert_eq!(config.hero.image_url, "a.jpg");
    }

    #[test]
    fn blank_slides_are_pruned_and_reported() {
        let mut config = SiteConfig::default();
        config.hero.images = vec!["a.jpg".into(), "  ".into(), "b.jpg".into()];
        config.hero.image_url = "a.jpg".into();
        let report = normalize(&mut config);
        assert!(report.hero_synced);
        assert!(!report.is_noop());
        assert_eq!(config.hero.images, vec!["a.jpg".to_string(), "b.jpg".to_string()]);
    }

    #[test]
    fn lone_image_url_seeds_carousel() {
        let mut config = SiteConfig::default();
        config.hero.images.clear();
        config.hero.image_url = "only.jpg".into();
        normalize(&mut config);
        assert_eq!(config.hero.images, vec!["only.jpg".to_string()]);
    }

    #[test]
    fn empty_ids_get_temporary_keys() {
        let mut config = SiteConfig::default();
        config.news = vec![news("", "Launch", None)];
        let report = normalize(&mut config);
        assert_eq!(report.ids_minted, 1);
        assert!(config.news[0].id.is_temporary());
    }

    #[test]
    fn duplicate_slugs_are_suffixed_in_order() {
        let mut config = SiteConfig::default();
        config.news = vec![
            news("a", "Town Hall", None),
            news("b", "Town hall", None),
            news("c", "Other", Some("town-hall")),
        ];
        normalize(&mut config);
        let slugs: Vec<_> = config.news.iter().map(|n| n.slug.clone().unwrap()).collect();
        assert_eq!(slugs, ["town-hall", "town-hall-2", "town-hall-3"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut config = SiteConfig::default();
        config.news = vec![news("a", "Town Hall", None), news("b", "Town Hall", None)];
        normalize(&mut config);
        let second = normalize(&mut config);
        assert!(second.is_noop(), "second pass changed: {second:?}");
    }
}
