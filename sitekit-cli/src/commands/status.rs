//! `sitekit status`: local vs. last-synced state for every site.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use sitekit_core::{store, SiteName};
use sitekit_sync::{
    snapshot,
    status::{check, format_datetime_age},
    StatusSignal,
};

/// Arguments for `sitekit status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only this site.
    #[arg(long)]
    pub site: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;

        let mut sites = store::list_sites_at(&home).context("failed to list sites")?;
        if let Some(filter) = self.site.as_ref() {
            sites.retain(|site| site.0 == *filter);
        }

        let rows = build_rows(&home, &sites)?;
        if self.json {
            print_json(rows)
        } else {
            print_table(rows);
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
struct SiteStatus {
    site: String,
    remote: String,
    signal: StatusSignal,
    last_sync_age: String,
    last_sync_at: Option<String>,
}

#[derive(Serialize)]
struct SiteStatusJson {
    site: String,
    remote: String,
    status: &'static str,
    detail: String,
    last_sync_age: String,
    last_sync_at: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "site")]
    site: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
    #[tabled(rename = "remote")]
    remote: String,
}

fn build_rows(home: &Path, sites: &[SiteName]) -> Result<Vec<SiteStatus>> {
    let mut rows = Vec::new();
    for site in sites {
        let signal =
            check(home, site).with_context(|| format!("status check failed for '{site}'"))?;
        let profile = store::load_profile_at(home, site)?;
        let snap = snapshot::load_at(home, site)
            .with_context(|| format!("failed to load snapshot for '{site}'"))?;
        let (last_sync_at, last_sync_age) = if snap.is_empty() {
            (None, "never".to_string())
        } else {
            (Some(snap.synced_at.to_rfc3339()), format_datetime_age(snap.synced_at))
        };

        rows.push(SiteStatus {
            site: site.to_string(),
            remote: profile.remote.with_env_overrides().url,
            signal,
            last_sync_age,
            last_sync_at,
        });
    }
    Ok(rows)
}

fn print_json(rows: Vec<SiteStatus>) -> Result<()> {
    let payload: Vec<SiteStatusJson> = rows
        .into_iter()
        .map(|row| SiteStatusJson {
            status: row.signal.label(),
            detail: signal_detail(&row.signal),
            site: row.site,
            remote: row.remote,
            last_sync_age: row.last_sync_age,
            last_sync_at: row.last_sync_at,
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(rows: Vec<SiteStatus>) {
    let pending = rows
        .iter()
        .filter(|r| !matches!(r.signal, StatusSignal::Current))
        .count();
    println!(
        "sitekit v{} | {} sites | {} need push",
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        pending,
    );
    if rows.is_empty() {
        println!("No sites initialised.");
        return;
    }

    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            status: format!("{} {}", signal_indicator(&row.signal), row.signal.label().to_uppercase()),
            detail: signal_detail(&row.signal),
            site: row.site,
            last_sync: row.last_sync_age,
            remote: if row.remote.is_empty() { "-".to_string() } else { row.remote },
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if pending > 0 {
        println!("Run 'sitekit push --all' to publish local edits.");
    }
}

fn signal_indicator(signal: &StatusSignal) -> String {
    match signal {
        StatusSignal::NeverSynced => "■".bright_black().bold().to_string(),
        StatusSignal::Current => "■".green().bold().to_string(),
        StatusSignal::Modified { .. } => "■".red().bold().to_string(),
        StatusSignal::Pending { .. } => "■".yellow().bold().to_string(),
    }
}

fn signal_detail(signal: &StatusSignal) -> String {
    match signal {
        StatusSignal::NeverSynced => "no snapshot".to_string(),
        StatusSignal::Current => "up to date".to_string(),
        StatusSignal::Modified { parts } => {
            let keys: Vec<_> = parts.iter().map(|p| p.key()).collect();
            format!("{} edited", keys.join(", "))
        }
        StatusSignal::Pending { temporary } => format!("{temporary} unsaved entr(ies)"),
    }
}
