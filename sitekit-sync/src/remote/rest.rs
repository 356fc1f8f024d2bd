//! PostgREST client over a blocking `ureq` agent.
//!
//! | Operation      | Request                                                    |
//! |----------------|------------------------------------------------------------|
//! | `select`       | `GET /rest/v1/<t>?select=*&order=<col>.asc`                |
//! | `select_by_id` | `GET /rest/v1/<t>?select=*&id=eq.<id>`                     |
//! | `insert`       | `POST /rest/v1/<t>` with `Prefer: return=representation`   |
//! | `update`       | `PATCH /rest/v1/<t>?id=eq.<id>`                            |
//! | `delete`       | `DELETE /rest/v1/<t>?id=in.("a","b")`                      |
//!
//! Transport failures and 5xx answers are retried with exponential backoff;
//! 4xx answers fail immediately with the backend's message.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use sitekit_core::{RemoteProfile, Session};

use super::{Row, RowStore};
use crate::SyncError;

/// Retry schedule for one request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Doubles after every failed attempt.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Error body shapes returned by PostgREST and the auth endpoint.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<Value>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// [`RowStore`] backed by a PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct RestStore {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    bearer: String,
    retry: RetryPolicy,
}

impl RestStore {
    /// Client authenticated with the anon key only.
    pub fn new(remote: &RemoteProfile) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(remote.timeout_secs.max(1)))
                .build(),
            base_url: remote.url.trim_end_matches('/').to_string(),
            api_key: remote.anon_key.clone(),
            bearer: remote.anon_key.clone(),
            retry: RetryPolicy {
                max_retries: remote.max_retries,
                ..RetryPolicy::default()
            },
        }
    }

    /// Client that sends the session's access token when it is still valid.
    pub fn with_session(remote: &RemoteProfile, session: Option<&Session>) -> Self {
        let mut store = Self::new(remote);
        match session {
            Some(s) if !s.is_expired(Utc::now()) => store.bearer = s.access_token.clone(),
            Some(s) => {
                tracing::warn!("session for {} has expired; using the anon key", s.email);
            }
            None => {}
        }
        store
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    /// Send one request with retry and backoff.
    ///
    /// `build` is called once per attempt. Returns the parsed JSON body, or
    /// `None` when the body is empty.
    pub(crate) fn execute<F>(&self, build: F, body: Option<&Value>) -> Result<Option<Value>, SyncError>
    where
        F: Fn(&ureq::Agent) -> ureq::Request,
    {
        let mut backoff = self.retry.initial_backoff;
        let mut last_err = String::new();

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    "remote: retry attempt {}/{} after {:?}",
                    attempt,
                    self.retry.max_retries,
                    backoff
                );
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(self.retry.max_backoff);
            }

            let request = build(&self.agent)
                .set("apikey", &self.api_key)
                .set("Authorization", &format!("Bearer {}", self.bearer));
            let result = match body {
                Some(json) => request.send_json(json.clone()),
                None => request.call(),
            };

            match result {
                Ok(response) => {
                    let text = response.into_string().map_err(|e| SyncError::Unreachable {
                        attempts: attempt + 1,
                        last: format!("failed to read response body: {e}"),
                    })?;
                    if text.trim().is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(serde_json::from_str(&text)?));
                }
                Err(ureq::Error::Status(status, response)) if status < 500 => {
                    return Err(status_error(status, response));
                }
                Err(ureq::Error::Status(status, response)) => {
                    let err = status_error(status, response);
                    tracing::warn!("remote: {err}");
                    last_err = err.to_string();
                }
                Err(ureq::Error::Transport(transport)) => {
                    tracing::warn!("remote: {transport}");
                    last_err = transport.to_string();
                }
            }
        }

        Err(SyncError::Unreachable {
            attempts: self.retry.max_retries + 1,
            last: last_err,
        })
    }
}

fn status_error(status: u16, response: ureq::Response) -> SyncError {
    let text = response.into_string().unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let code = body.code.map(|c| match c {
        Value::String(s) => s,
        other => other.to_string(),
    });
    let message = body
        .message
        .or(body.error_description)
        .or(body.msg)
        .or(body.error)
        .unwrap_or_else(|| if text.is_empty() { format!("HTTP {status}") } else { text });
    SyncError::Remote {
        status,
        code,
        message,
    }
}

fn into_rows(value: Option<Value>) -> Vec<Row> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        Some(Value::Object(row)) => vec![row],
        _ => Vec::new(),
    }
}

/// `in.("a","b")` filter value.
fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("\"{id}\"")).collect();
    format!("in.({})", quoted.join(","))
}

impl RowStore for RestStore {
    fn select(&self, table: &str, order_by: Option<&str>) -> Result<Vec<Row>, SyncError> {
        let url = self.table_url(table);
        let order = order_by.map(|column| format!("{column}.asc"));
        let value = self.execute(
            |agent| {
                let request = agent.get(&url).query("select", "*");
                match &order {
                    Some(order) => request.query("order", order),
                    None => request,
                }
            },
            None,
        )?;
        Ok(into_rows(value))
    }

    fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Row>, SyncError> {
        let url = self.table_url(table);
        let filter = format!("eq.{id}");
        let value = self.execute(
            |agent| agent.get(&url).query("select", "*").query("id", &filter),
            None,
        )?;
        Ok(into_rows(value).into_iter().next())
    }

    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, SyncError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.table_url(table);
        let body = Value::Array(rows.into_iter().map(Value::Object).collect());
        let value = self.execute(
            |agent| agent.post(&url).set("Prefer", "return=representation"),
            Some(&body),
        )?;
        Ok(into_rows(value))
    }

    fn update(&self, table: &str, id: &str, patch: Row) -> Result<(), SyncError> {
        let url = self.table_url(table);
        let filter = format!("eq.{id}");
        let body = Value::Object(patch);
        self.execute(
            |agent| {
                agent
                    .request("PATCH", &url)
                    .query("id", &filter)
                    .set("Prefer", "return=minimal")
            },
            Some(&body),
        )?;
        Ok(())
    }

    fn delete(&self, table: &str, ids: &[String]) -> Result<(), SyncError> {
        if ids.is_empty() {
            return Ok(());
        }
        let url = self.table_url(table);
        let filter = in_filter(ids);
        self.execute(
            |agent| agent.delete(&url).query("id", &filter),
            None,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn in_filter_quotes_ids() {
        assert_eq!(in_filter(&["1".into(), "a-b".into()]), r#"in.("1","a-b")"#);
    }

    #[test]
    fn rows_from_array_or_object() {
        assert_eq!(into_rows(Some(json!([{"id": 1}, 3]))).len(), 1);
        assert_eq!(into_rows(Some(json!({"id": 1}))).len(), 1);
        assert!(into_rows(None).is_empty());
    }

    #[test]
    fn base_url_is_trimmed_and_session_preferred() {
        let remote = RemoteProfile::new("https://abc.supabase.co/", "anon");
        let session = Session {
            access_token: "jwt".into(),
            refresh_token: None,
            email: "ops@example.org".into(),
            expires_at: None,
        };
        let store = RestStore::with_session(&remote, Some(&session));
        assert_eq!(store.base_url(), "https://abc.supabase.co");
        assert_eq!(store.table_url("news_items"), "https://abc.supabase.co/rest/v1/news_items");
        assert_eq!(store.bearer, "jwt");
        assert_eq!(store.api_key, "anon");
    }

    #[test]
    fn expired_session_falls_back_to_anon_key() {
        let remote = RemoteProfile::new("https://abc.supabase.co", "anon");
        let session = Session {
            access_token: "jwt".into(),
            refresh_token: None,
            email: "ops@example.org".into(),
            expires_at: Some(Utc::now() - chrono::Duration::minutes(1)),
        };
        let store = RestStore::with_session(&remote, Some(&session));
        assert_eq!(store.bearer, "anon");
    }

    #[test]
    fn unreachable_host_exhausts_retries() {
        let remote = RemoteProfile {
            timeout_secs: 1,
            ..RemoteProfile::new("http://127.0.0.1:9", "anon")
        };
        let store = RestStore::new(&remote).with_retry(RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        });
        let err = store.select("news_items", None).unwrap_err();
        assert!(matches!(err, SyncError::Unreachable { attempts: 2, .. }), "got: {err}");
    }
}
