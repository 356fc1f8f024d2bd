//! `sitekit reset <site>`: local document back to defaults.

use anyhow::{Context, Result};
use clap::Args;

use sitekit_core::{store, SiteName};

#[derive(Args, Debug)]
pub struct ResetArgs {
    pub site: String,
}

impl ResetArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let site = SiteName::from(self.site);
        store::reset_config_at(&home, &site)
            .with_context(|| format!("reset failed for '{site}'"))?;
        println!("✓ '{site}' reset to defaults (run `sitekit push {site}` to publish)");
        Ok(())
    }
}
