//! Operator sign-in against the backend's password grant.

use std::path::Path;

use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use sitekit_core::{store, RemoteProfile, Session, SiteName};

use crate::remote::RestStore;
use crate::SyncError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

/// `POST /auth/v1/token?grant_type=password`.
pub fn sign_in(remote: &RemoteProfile, email: &str, password: &str) -> Result<Session, SyncError> {
    let client = RestStore::new(remote);
    let url = format!("{}/auth/v1/token", client.base_url());
    let body = json!({ "email": email, "password": password });

    let value = client
        .execute(
            |agent| agent.post(&url).query("grant_type", "password"),
            Some(&body),
        )
        .map_err(|err| match err {
            SyncError::Remote { status, message, .. } if status < 500 => SyncError::Auth(message),
            other => other,
        })?
        .ok_or_else(|| SyncError::Auth("empty token response".to_string()))?;

    let token: TokenResponse = serde_json::from_value(value)?;
    Ok(session_from(token, email, Utc::now()))
}

fn session_from(token: TokenResponse, email: &str, now: chrono::DateTime<Utc>) -> Session {
    Session {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        email: token
            .user
            .and_then(|u| u.email)
            .unwrap_or_else(|| email.to_string()),
        expires_at: token.expires_in.map(|secs| now + Duration::seconds(secs)),
    }
}

/// `POST /auth/v1/logout` with the session's token.
pub fn sign_out(remote: &RemoteProfile, session: &Session) -> Result<(), SyncError> {
    let client = RestStore::with_session(remote, Some(session));
    let url = format!("{}/auth/v1/logout", client.base_url());
    client.execute(|agent| agent.post(&url), None)?;
    Ok(())
}

/// Remote profile of `site` with environment overrides applied.
pub fn remote_profile_at(home: &Path, site: &SiteName) -> Result<RemoteProfile, SyncError> {
    let remote = store::load_profile_at(home, site)?.remote.with_env_overrides();
    if !remote.is_configured() {
        return Err(SyncError::NotConfigured {
            site: site.to_string(),
        });
    }
    Ok(remote)
}

/// Sign in and store the session for `site`.
pub fn login_at(home: &Path, site: &SiteName, email: &str, password: &str) -> Result<Session, SyncError> {
    let remote = remote_profile_at(home, site)?;
    let session = sign_in(&remote, email, password)?;
    store::save_session_at(home, site, &session)?;
    tracing::info!("signed in to {site} as {}", session.email);
    Ok(session)
}

/// Revoke (best effort) and delete the stored session. Returns `false` when
/// there was none.
pub fn logout_at(home: &Path, site: &SiteName) -> Result<bool, SyncError> {
    let Some(session) = store::load_session_at(home, site)? else {
        return Ok(false);
    };
    match remote_profile_at(home, site) {
        Ok(remote) => {
            if let Err(err) = sign_out(&remote, &session) {
                tracing::warn!("remote sign-out failed, clearing local session anyway: {err}");
            }
        }
        Err(err) => tracing::warn!("skipping remote sign-out: {err}"),
    }
    Ok(store::clear_session_at(home, site)?)
}
