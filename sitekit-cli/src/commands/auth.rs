//! `sitekit login` / `sitekit logout`

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::Args;

use sitekit_core::SiteName;
use sitekit_sync::auth;

#[derive(Args, Debug)]
pub struct LoginArgs {
    pub site: String,

    #[arg(long)]
    pub email: String,

    /// Read from stdin when omitted.
    #[arg(long)]
    pub password: Option<String>,
}

impl LoginArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let site = SiteName::from(self.site);
        let password = match self.password {
            Some(password) => password,
            None => read_password()?,
        };

        let session = auth::login_at(&home, &site, &self.email, &password)
            .with_context(|| format!("login failed for '{site}'"))?;
        match session.expires_at {
            Some(at) => println!("✓ Signed in to '{site}' as {} (until {})", session.email, at.to_rfc3339()),
            None => println!("✓ Signed in to '{site}' as {}", session.email),
        }
        Ok(())
    }
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("empty password");
    }
    Ok(password)
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    pub site: String,
}

impl LogoutArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let site = SiteName::from(self.site);
        if auth::logout_at(&home, &site).with_context(|| format!("logout failed for '{site}'"))? {
            println!("✓ Signed out of '{site}'");
        } else {
            println!("'{site}' has no stored session");
        }
        Ok(())
    }
}
