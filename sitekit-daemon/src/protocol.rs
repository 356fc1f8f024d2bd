use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;

/// One request line: `{"cmd":"sync","site":"campaign"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

impl DaemonRequest {
    pub fn status() -> Self {
        Self::command("status", None)
    }

    pub fn stop() -> Self {
        Self::command("stop", None)
    }

    /// Push `site`, or every site when `None`.
    pub fn sync(site: Option<String>) -> Self {
        Self::command("sync", site)
    }

    fn command(cmd: &str, site: Option<String>) -> Self {
        Self {
            cmd: cmd.to_string(),
            site,
        }
    }
}

/// One response line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    fn into_data(self) -> Result<Value, DaemonError> {
        if self.ok {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(DaemonError::Protocol(
                self.error.unwrap_or_else(|| "unknown daemon error".to_string()),
            ))
        }
    }
}

/// Write one request line to the daemon socket and read one response line.
pub fn send_request(home: &Path, request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    let socket = socket_path(home);
    if !socket.exists() {
        return Err(DaemonError::DaemonNotRunning { socket });
    }

    let mut stream = UnixStream::connect(&socket).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound
        | std::io::ErrorKind::ConnectionRefused
        | std::io::ErrorKind::ConnectionReset => DaemonError::DaemonNotRunning {
            socket: socket.clone(),
        },
        _ => io_err(&socket, err),
    })?;

    let mut payload = serde_json::to_string(request)?;
    payload.push('\n');
    stream
        .write_all(payload.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| io_err(&socket, e))?;

    let mut line = String::new();
    let read = BufReader::new(stream)
        .read_line(&mut line)
        .map_err(|e| io_err(&socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(
            "daemon closed connection before responding".to_string(),
        ));
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Status payload; retries briefly while a freshly started daemon binds.
pub fn request_status(home: &Path) -> Result<Value, DaemonError> {
    const ATTEMPTS: usize = 5;
    let request = DaemonRequest::status();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match send_request(home, &request) {
            Ok(response) => return response.into_data(),
            Err(DaemonError::DaemonNotRunning { .. }) if attempt < ATTEMPTS => {
                sleep(Duration::from_millis(100));
            }
            Err(err) => return Err(err),
        }
    }
}

pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    send_request(home, &DaemonRequest::stop())?.into_data().map(|_| ())
}

pub fn request_sync(home: &Path, site: Option<String>) -> Result<Value, DaemonError> {
    send_request(home, &DaemonRequest::sync(site))?.into_data()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn request_lines_omit_missing_site() {
        let line = serde_json::to_string(&DaemonRequest::status()).unwrap();
        assert_eq!(line, r#"{"cmd":"status"}"#);
        let line = serde_json::to_string(&DaemonRequest::sync(Some("campaign".into()))).unwrap();
        assert_eq!(line, r#"{"cmd":"sync","site":"campaign"}"#);
    }

    #[test]
    fn error_response_becomes_protocol_error() {
        let err = DaemonResponse::error("boom").into_data().unwrap_err();
        assert!(matches!(err, DaemonError::Protocol(ref m) if m == "boom"));
        assert_eq!(
            DaemonResponse::ok(json!({"a": 1})).into_data().unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn missing_socket_means_not_running() {
        let home = TempDir::new().unwrap();
        let err = request_stop(home.path()).unwrap_err();
        assert!(matches!(err, DaemonError::DaemonNotRunning { .. }));
    }
}
