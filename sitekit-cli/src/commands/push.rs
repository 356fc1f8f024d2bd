//! `sitekit push`: reconcile local edits into the backend.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use sitekit_core::{store, SiteName};
use sitekit_sync::{
    pipeline::{self, SyncScope},
    PushReport, SyncError, WriteResult,
};

/// Arguments for `sitekit push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Site to push (omit when using `--all`).
    pub site: Option<String>,

    /// Push every initialised site.
    #[arg(long, conflicts_with = "site")]
    pub all: bool,

    /// Limit to one part: settings, team, news, social or quotes.
    #[arg(long, value_name = "PART")]
    pub only: Option<SyncScope>,

    /// Show the planned writes without sending anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl PushArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let scope = self.only.unwrap_or(SyncScope::All);

        let sites = if self.all {
            let sites = store::list_sites_at(&home).context("failed to list sites")?;
            if sites.is_empty() {
                println!("No sites initialised. Run `sitekit init` first.");
                return Ok(());
            }
            sites
        } else {
            let name = self.site.context("provide a site name or use --all")?;
            vec![SiteName::from(name)]
        };

        let mut failed = Vec::new();
        for site in &sites {
            match pipeline::push_site(&home, site, scope, self.dry_run) {
                Ok(report) => {
                    print_report(&report);
                    if !report.is_success() {
                        failed.push(site.to_string());
                    }
                }
                Err(SyncError::Invalid(issues)) => {
                    eprintln!("{} '{site}' was not pushed:", "✗".red());
                    for issue in &issues {
                        eprintln!("  {issue}");
                    }
                    failed.push(site.to_string());
                }
                Err(err) => {
                    eprintln!("{} '{site}': {err}", "✗".red());
                    failed.push(site.to_string());
                }
            }
        }

        if !failed.is_empty() {
            bail!("push failed for {}", failed.join(", "));
        }
        Ok(())
    }
}

fn print_report(report: &PushReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let changes = report.changes();
    let unchanged = report.writes.len() - changes;

    if changes == 0 && report.failures.is_empty() {
        println!("{prefix}✓ '{}': nothing to do", report.site);
        return;
    }

    let mark = if report.is_success() {
        "✓".green()
    } else {
        "!".yellow()
    };
    println!(
        "{prefix}{mark} '{}' pushed ({changes} changed, {unchanged} unchanged)",
        report.site
    );

    for write in &report.writes {
        match write {
            WriteResult::Inserted { table, id } => println!("  +  {table}/{id}"),
            WriteResult::Updated { table, id } => println!("  ✎  {table}/{id}"),
            WriteResult::Deleted { table, id } => println!("  -  {table}/{id}"),
            WriteResult::WouldInsert { table, id } => println!("  ~+ {table}/{id}"),
            WriteResult::WouldUpdate { table, id } => println!("  ~✎ {table}/{id}"),
            WriteResult::WouldDelete { table, id } => println!("  ~- {table}/{id}"),
            WriteResult::Unchanged { .. } => {}
        }
    }
    for (local, server) in &report.id_map {
        println!("  ·  {local} → {server}");
    }
    for failure in &report.failures {
        println!("  {} {}: {}", "✗".red(), failure.part, failure.error);
    }
}
