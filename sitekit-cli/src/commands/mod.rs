pub mod auth;
pub mod check;
pub mod daemon;
pub mod diff;
pub mod init;
pub mod pull;
pub mod push;
pub mod reset;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}
