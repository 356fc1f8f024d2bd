//! `sitekit diff <site>`: what a push would change, as unified diffs.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use sitekit_core::SiteName;
use sitekit_sync::diff::{diff_site, DiffSource};
use sitekit_sync::pipeline;

/// Arguments for `sitekit diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    pub site: String,

    /// Compare with the last sync snapshot instead of the live backend.
    #[arg(long)]
    pub offline: bool,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let site = SiteName::from(self.site);

        let result = if self.offline {
            diff_site(&home, &site, DiffSource::Snapshot)
        } else {
            let (remote, settings_id) = pipeline::connect_at(&home, &site)
                .with_context(|| format!("cannot connect '{site}'"))?;
            diff_site(
                &home,
                &site,
                DiffSource::Live {
                    store: &remote,
                    settings_id,
                },
            )
        }
        .with_context(|| format!("diff failed for '{site}'"))?;

        if !self.offline && result.against != "remote" {
            eprintln!(
                "{} backend unreadable; comparing '{}' with its {} instead",
                "warning:".yellow().bold(),
                result.site,
                result.against
            );
        }

        if result.diffs.is_empty() {
            println!("No differences for '{}' against {}.", result.site, result.against);
            return Ok(());
        }

        for diff in result.diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        Ok(())
    }
}
