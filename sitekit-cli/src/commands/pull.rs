//! `sitekit pull <site> [--force]`

use anyhow::{Context, Result};
use clap::Args;

use sitekit_core::SiteName;
use sitekit_sync::pipeline;

#[derive(Args, Debug)]
pub struct PullArgs {
    pub site: String,

    /// Overwrite local edits that were never pushed.
    #[arg(long)]
    pub force: bool,
}

impl PullArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let site = SiteName::from(self.site);

        let report = pipeline::pull_site(&home, &site, self.force)
            .with_context(|| format!("pull failed for '{site}'"))?;

        if report.changed.is_empty() {
            println!("✓ '{site}' already matches the backend");
        } else {
            let parts: Vec<_> = report.changed.iter().map(|p| p.key()).collect();
            println!("✓ '{site}' pulled ({} changed: {})", parts.len(), parts.join(", "));
        }
        Ok(())
    }
}
