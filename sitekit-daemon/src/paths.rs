use std::path::{Path, PathBuf};
use std::time::Duration;

use sitekit_core::store::sitekit_dir_at;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

pub const DAEMON_SOCKET: &str = "daemon.sock";
pub const CONFIG_FILE: &str = "config.yaml";

pub fn sites_root(home: &Path) -> PathBuf {
    sitekit_dir_at(home).join("sites")
}

pub fn socket_path(home: &Path) -> PathBuf {
    sitekit_dir_at(home).join(DAEMON_SOCKET)
}

/// Site whose document lives at `path`, if `path` is a `sites/<name>/config.yaml`.
pub fn site_for_config_path(path: &Path, sites: &Path) -> Option<String> {
    if path.file_name().and_then(|n| n.to_str()) != Some(CONFIG_FILE) {
        return None;
    }
    let dir = path.parent()?;
    if dir.parent()? != sites {
        return None;
    }
    dir.file_name().and_then(|n| n.to_str()).map(str::to_string)
}
