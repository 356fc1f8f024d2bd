//! `sitekit init <site> --url <url> --anon-key <key>`

use anyhow::{Context, Result};
use clap::Args;

use sitekit_core::{store, RemoteProfile, SiteName};

/// Register a site under `~/.sitekit/sites/<site>/`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Site name (letters, digits, `-`, `_`).
    pub site: String,

    /// Backend base URL, e.g. https://<ref>.supabase.co
    #[arg(long, default_value = "")]
    pub url: String,

    /// Public API key sent with every request.
    #[arg(long, default_value = "")]
    pub anon_key: String,

    /// Primary key of the singleton settings row.
    #[arg(long, default_value_t = 1)]
    pub settings_id: i64,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let site = SiteName::from(self.site);

        let mut remote = RemoteProfile::new(self.url, self.anon_key);
        remote.settings_id = self.settings_id;

        let profile = store::init_at(&home, site.clone(), remote)
            .with_context(|| format!("failed to init site '{site}'"))?;

        println!("✓ Initialised '{}'", profile.name);
        println!("  Document: {}", store::config_path_at(&home, &site).display());
        if !profile.remote.with_env_overrides().is_configured() {
            println!("  No backend configured yet; set url/anon_key in site.yaml or SITEKIT_REMOTE_URL / SITEKIT_ANON_KEY.");
        }
        Ok(())
    }
}
