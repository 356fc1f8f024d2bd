//! Default palette and copy.
//!
//! Every load (local document or remote record) is merged over these values,
//! so a missing field never reaches the site as an empty string.

use crate::types::{
    About, Contact, EntityId, FontFamily, Footer, Header, Hero, Identity, Platform, Registration,
    Rounded, SectionTitles, SiteConfig, SocialLink, Theme,
};

pub const PRIMARY_COLOR: &str = "#2563eb";
pub const SECONDARY_COLOR: &str = "#1e40af";
pub const WHITE: &str = "#ffffff";
pub const INK: &str = "#111827";
pub const MIST: &str = "#f9fafb";

/// Maximum number of hero carousel slides.
pub const MAX_HERO_IMAGES: usize = 15;

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "Our Organisation".to_string(),
            logo_url: "https://via.placeholder.com/150/2563eb/ffffff?text=LOGO".to_string(),
            tagline: "Building together".to_string(),
            site_url: None,
        }
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            background_color: WHITE.to_string(),
            text_color: INK.to_string(),
            hover_color: Some(PRIMARY_COLOR.to_string()),
            is_sticky: true,
        }
    }
}

impl Default for Footer {
    fn default() -> Self {
        Self {
            background_color: INK.to_string(),
            text_color: WHITE.to_string(),
            description: "Be part of the change. Sign up as a volunteer or member.".to_string(),
            copyright_text: "All rights reserved.".to_string(),
        }
    }
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            enabled: true,
            button_text: "Sign up now".to_string(),
            url: "#contact".to_string(),
            button_color: PRIMARY_COLOR.to_string(),
            button_text_color: WHITE.to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: PRIMARY_COLOR.to_string(),
            secondary_color: SECONDARY_COLOR.to_string(),
            button_color: PRIMARY_COLOR.to_string(),
            button_hover_color: SECONDARY_COLOR.to_string(),
            font_family: FontFamily::Poppins,
            rounded: Rounded::Xl,
        }
    }
}

impl Default for Hero {
    fn default() -> Self {
        let slide = "https://picsum.photos/1920/1080?random=1".to_string();
        Self {
            title: "Together we make real change".to_string(),
            subtitle: "Join our movement for a fair, prosperous and forward-looking community."
                .to_string(),
            image_url: slide.clone(),
            images: vec![slide],
            cta_text: "Join now".to_string(),
            cta_button_color: Some(PRIMARY_COLOR.to_string()),
            cta_button_text_color: Some(WHITE.to_string()),
            cta_button_link: Some("#contact".to_string()),
            secondary_button_text: Some("Learn more".to_string()),
            secondary_button_color: Some("transparent".to_string()),
            secondary_button_text_color: Some(INK.to_string()),
            secondary_button_link: Some("#about".to_string()),
            background_color: WHITE.to_string(),
            text_color: INK.to_string(),
        }
    }
}

impl Default for About {
    fn default() -> Self {
        Self {
            title: "About us".to_string(),
            content: "We are an organisation dedicated to empowering communities through \
                      education, technology and solidarity."
                .to_string(),
            image_url: "https://picsum.photos/800/600?random=2".to_string(),
            background_color: MIST.to_string(),
            text_color: INK.to_string(),
        }
    }
}

impl Default for SectionTitles {
    fn default() -> Self {
        Self {
            structure: "Organisation".to_string(),
            news: "News & Activities".to_string(),
        }
    }
}

fn seed_social(id: &str, platform: Platform, url: &str) -> SocialLink {
    SocialLink {
        id: EntityId::from(id),
        platform,
        url: url.to_string(),
        icon_url: None,
        icon_color: None,
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            identity: Identity::default(),
            header: Header::default(),
            footer: Footer::default(),
            registration: Registration::default(),
            theme: Theme::default(),
            hero: Hero::default(),
            about: About::default(),
            contact: Contact::default(),
            social_media: vec![
                seed_social("1", Platform::Facebook, "https://facebook.com"),
                seed_social("2", Platform::Twitter, "https://twitter.com"),
                seed_social("3", Platform::Instagram, "https://instagram.com"),
            ],
            team: Vec::new(),
            team_background_color: WHITE.to_string(),
            team_text_color: INK.to_string(),
            team_title_color: Some(INK.to_string()),
            news: Vec::new(),
            news_background_color: MIST.to_string(),
            news_text_color: INK.to_string(),
            news_title_color: Some(INK.to_string()),
            about_title_color: Some(INK.to_string()),
            section_titles: SectionTitles::default(),
            media_quotes: Vec::new(),
        }
    }
}
