//! `sitekit check <site>`: can the backend be reached, do the tables exist?

use anyhow::{bail, Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use sitekit_core::{CollectionKind, SiteName};
use sitekit_sync::remote::Probe;
use sitekit_sync::schema::SETTINGS_TABLE;
use sitekit_sync::{pipeline, RowStore};

#[derive(Args, Debug)]
pub struct CheckArgs {
    pub site: String,
}

#[derive(Tabled)]
struct ProbeRow {
    table: &'static str,
    state: &'static str,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let site = SiteName::from(self.site);
        let (remote, _) = pipeline::connect_at(&home, &site)
            .with_context(|| format!("cannot connect '{site}'"))?;

        let tables = std::iter::once(SETTINGS_TABLE).chain(CollectionKind::all().iter().map(|k| k.table()));
        let mut rows = Vec::new();
        for table in tables {
            let probe = remote
                .probe(table)
                .with_context(|| format!("backend check failed for '{site}' at {table}"))?;
            rows.push(ProbeRow {
                table,
                state: match probe {
                    Probe::Reachable => "ok",
                    Probe::TableMissing => "missing",
                },
            });
        }

        let missing = rows.iter().filter(|r| r.state == "missing").count();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");

        if missing > 0 {
            bail!("{missing} table(s) missing on the backend for '{site}'");
        }
        println!("✓ '{site}' backend reachable at {}", remote.base_url());
        Ok(())
    }
}
