use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::Instant;

use sitekit_core::{store, SiteName, SiteProfile};
use sitekit_sync::pipeline::{self, SiteScope};
use sitekit_sync::{status, PushReport, SyncError};

use crate::error::{io_err, DaemonError};
use crate::paths::{site_for_config_path, sites_root, socket_path, DEBOUNCE_WINDOW};
use crate::protocol::{DaemonRequest, DaemonResponse};

pub type SiteCache = HashMap<SiteName, SiteProfile>;

/// Unix seconds of the last push without failures, per site name.
pub type SyncTimestamps = HashMap<String, u64>;

struct SyncJob {
    scope: SiteScope,
    source: &'static str,
    respond_to: oneshot::Sender<Result<SyncSummary, String>>,
}

fn scope_label(scope: &SiteScope) -> String {
    match scope {
        SiteScope::All => "all".to_string(),
        SiteScope::Site(site) => site.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub target: String,
    pub source: String,
    pub sites: Vec<String>,
    pub changes: usize,
    pub unchanged: usize,
    /// `site: message` for every site or part that failed.
    pub failures: Vec<String>,
    pub duration_ms: u128,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon runtime.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let sites = sites_root(&home);
    fs::create_dir_all(&sites).map_err(|e| io_err(&sites, e))?;

    let cache = Arc::new(RwLock::new(load_site_cache(&home)?));
    let timestamps: Arc<RwLock<SyncTimestamps>> = Arc::new(RwLock::new(HashMap::new()));
    let started_at_unix = unix_seconds_now();

    let (sync_tx, sync_rx) = mpsc::channel::<SyncJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let sync_tx = sync_tx.clone();
        tokio::spawn(async move {
            let result = watcher_task(home, sync_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let cache = cache.clone();
        let timestamps = timestamps.clone();
        tokio::spawn(async move {
            let result =
                sync_processor_task(home, cache, timestamps, sync_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let state = SocketState {
            home: home.clone(),
            cache: cache.clone(),
            timestamps: timestamps.clone(),
            sync_tx: sync_tx.clone(),
            shutdown_tx: shutdown.clone(),
            started_at_unix,
        };
        tokio::spawn(async move {
            let result = socket_server_task(state, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, shutting down daemon");
                        let _ = shutdown.send(());
                        Ok(())
                    }
                    Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                }
            }
        })
    };

    let (watcher_result, processor_result, socket_result, signal_result) =
        tokio::join!(watcher_handle, processor_handle, socket_handle, signal_handle);

    handle_join("watcher", watcher_result)?;
    handle_join("sync_processor", processor_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

async fn watcher_task(
    home: PathBuf,
    sync_tx: mpsc::Sender<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let sites = sites_root(&home);
    // FSEvents reports real paths (/private/var/... on macOS).
    let sites = fs::canonicalize(&sites).unwrap_or(sites);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;

    let mut watched_dirs = HashSet::new();
    register_sites_tree(&mut watcher, &mut watched_dirs, &sites)?;

    let mut debounce = HashMap::<PathBuf, Instant>::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    continue;
                }

                for path in event.paths {
                    // New site directories need their own watch.
                    if path.is_dir() && path.starts_with(&sites) {
                        register_sites_tree(&mut watcher, &mut watched_dirs, &path)?;
                        continue;
                    }

                    let Some(site) = site_for_config_path(&path, &sites) else {
                        continue;
                    };
                    if !should_process_event(&mut debounce, &path, Instant::now()) {
                        continue;
                    }

                    let scope = SiteScope::Site(SiteName::from(site));
                    match enqueue_sync(&sync_tx, scope, "watcher").await {
                        Ok(summary) => {
                            tracing::info!(
                                target = %summary.target,
                                changes = summary.changes,
                                failures = summary.failures.len(),
                                duration_ms = summary.duration_ms,
                                "watcher-triggered push completed",
                            );
                            if let Err(err) = run_status_scan(home.clone()).await {
                                tracing::warn!(error = %err, "status scan after push failed");
                            }
                        }
                        Err(err) => tracing::error!(error = %err, "watcher-triggered push failed"),
                    }
                }
            }
        }
    }

    Ok(())
}

fn register_sites_tree(
    watcher: &mut RecommendedWatcher,
    watched_dirs: &mut HashSet<PathBuf>,
    root: &Path,
) -> Result<(), DaemonError> {
    let mut dirs = vec![root.to_path_buf()];
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(io_err(root, err)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(root, e))?;
        if entry.file_type().map_err(|e| io_err(entry.path(), e))?.is_dir() {
            dirs.push(entry.path());
        }
    }

    for dir in dirs {
        let canonical = match fs::canonicalize(&dir) {
            Ok(path) => path,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&dir, err)),
        };
        if watched_dirs.insert(canonical.clone()) {
            watcher.watch(&canonical, RecursiveMode::NonRecursive)?;
            tracing::debug!(path = %canonical.display(), "watching site directory");
        }
    }
    Ok(())
}

fn should_process_event(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
) -> bool {
    should_process_event_with_threshold(debounce, path, now, DEBOUNCE_WINDOW)
}

fn should_process_event_with_threshold(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
    threshold: Duration,
) -> bool {
    debounce.retain(|_, seen_at| now.duration_since(*seen_at) <= Duration::from_secs(30));
    match debounce.get(path) {
        Some(last_seen) if now.duration_since(*last_seen) < threshold => false,
        _ => {
            debounce.insert(path.to_path_buf(), now);
            true
        }
    }
}

async fn run_status_scan(home: PathBuf) -> Result<(), DaemonError> {
    tokio::task::spawn_blocking(move || -> Result<(), DaemonError> {
        for site in store::list_sites_at(&home)? {
            let signal = status::check(&home, &site)?;
            tracing::info!(site = %site, signal = signal.label(), "status after push");
        }
        Ok(())
    })
    .await
    .map_err(|err| DaemonError::Protocol(format!("status scan join error: {err}")))?
}

// ---------------------------------------------------------------------------
// Sync processor
// ---------------------------------------------------------------------------

async fn sync_processor_task(
    home: PathBuf,
    cache: Arc<RwLock<SiteCache>>,
    timestamps: Arc<RwLock<SyncTimestamps>>,
    mut sync_rx: mpsc::Receiver<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = sync_rx.recv() => {
                let Some(job) = maybe_job else { break };
                let started = Instant::now();
                let target = scope_label(&job.scope);

                let home_for_push = home.clone();
                let scope = job.scope;
                let pushed = tokio::task::spawn_blocking(move || {
                    pipeline::run(&home_for_push, scope, false)
                })
                .await
                .map_err(|err| DaemonError::Protocol(format!("push task join error: {err}")))?;

                let outcome = match pushed {
                    Ok(results) => match refresh_cache(home.clone(), cache.clone()).await {
                        Ok(()) => {
                            let now = unix_seconds_now();
                            let mut ts = timestamps.write().await;
                            for (site, result) in &results {
                                if matches!(result, Ok(report) if report.is_success()) {
                                    ts.insert(site.to_string(), now);
                                }
                            }
                            drop(ts);
                            Ok(build_sync_summary(target, job.source, results, started.elapsed()))
                        }
                        Err(err) => Err(err.to_string()),
                    },
                    Err(err) => Err(err.to_string()),
                };

                let _ = job.respond_to.send(outcome);
            }
        }
    }

    Ok(())
}

async fn enqueue_sync(
    sync_tx: &mpsc::Sender<SyncJob>,
    scope: SiteScope,
    source: &'static str,
) -> Result<SyncSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    sync_tx
        .send(SyncJob {
            scope,
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync response"))?;
    outcome.map_err(DaemonError::Protocol)
}

fn build_sync_summary(
    target: String,
    source: &'static str,
    results: Vec<(SiteName, Result<PushReport, SyncError>)>,
    duration: Duration,
) -> SyncSummary {
    let mut summary = SyncSummary {
        target,
        source: source.to_string(),
        sites: Vec::new(),
        changes: 0,
        unchanged: 0,
        failures: Vec::new(),
        duration_ms: duration.as_millis(),
    };

    for (site, result) in results {
        match result {
            Ok(report) => {
                for write in &report.writes {
                    if write.is_change() {
                        summary.changes += 1;
                    } else {
                        summary.unchanged += 1;
                    }
                }
                summary.failures.extend(
                    report
                        .failures
                        .iter()
                        .map(|f| format!("{site}/{}: {}", f.part, f.error)),
                );
            }
            Err(err) => summary.failures.push(format!("{site}: {err}")),
        }
        summary.sites.push(site.0);
    }
    summary
}

fn load_site_cache(home: &Path) -> Result<SiteCache, DaemonError> {
    let mut cache = HashMap::new();
    for site in store::list_sites_at(home)? {
        let profile = store::load_profile_at(home, &site)?;
        cache.insert(site, profile);
    }
    Ok(cache)
}

async fn refresh_cache(home: PathBuf, cache: Arc<RwLock<SiteCache>>) -> Result<(), DaemonError> {
    let refreshed = tokio::task::spawn_blocking(move || load_site_cache(&home))
        .await
        .map_err(|err| DaemonError::Protocol(format!("cache refresh join error: {err}")))??;
    *cache.write().await = refreshed;
    Ok(())
}

// ---------------------------------------------------------------------------
// Socket server
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct SocketState {
    home: PathBuf,
    cache: Arc<RwLock<SiteCache>>,
    timestamps: Arc<RwLock<SyncTimestamps>>,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
}

async fn socket_server_task(
    state: SocketState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = socket_path(&state.home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "daemon listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, state).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(stream: UnixStream, state: SocketState) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                let response = DaemonResponse::error(format!("invalid request JSON: {err}"));
                write_response(&mut writer, &response).await?;
                continue;
            }
        };

        let stop = request.cmd == "stop";
        let response = dispatch(&state, request).await;
        write_response(&mut writer, &response).await?;
        if stop {
            break;
        }
    }

    Ok(())
}

async fn dispatch(state: &SocketState, request: DaemonRequest) -> DaemonResponse {
    match request.cmd.as_str() {
        "status" => DaemonResponse::ok(
            build_status_payload(
                &state.home,
                &state.cache,
                &state.timestamps,
                state.started_at_unix,
            )
            .await,
        ),
        "sync" => {
            let scope = match request.site {
                Some(site) => SiteScope::Site(SiteName::from(site)),
                None => SiteScope::All,
            };
            match enqueue_sync(&state.sync_tx, scope, "socket").await {
                Ok(summary) => DaemonResponse::ok(json!(summary)),
                Err(err) => DaemonResponse::error(err.to_string()),
            }
        }
        "stop" => {
            let _ = state.shutdown_tx.send(());
            DaemonResponse::ok(json!({ "stopping": true }))
        }
        other => DaemonResponse::error(format!("unknown command '{other}'")),
    }
}

async fn build_status_payload(
    home: &Path,
    cache: &RwLock<SiteCache>,
    timestamps: &RwLock<SyncTimestamps>,
    started_at_unix: u64,
) -> Value {
    let mut profiles: Vec<(String, String)> = cache
        .read()
        .await
        .iter()
        .map(|(name, profile)| (name.0.clone(), profile.remote.url.clone()))
        .collect();
    profiles.sort();

    let ts_snapshot = timestamps.read().await.clone();

    let sites: Vec<Value> = profiles
        .iter()
        .map(|(name, url)| {
            json!({
                "name": name,
                "remote": url,
                "last_sync_at_unix": ts_snapshot.get(name).copied().unwrap_or(0),
            })
        })
        .collect();

    json!({
        "running": true,
        "started_at_unix": started_at_unix,
        "last_sync_at_unix": ts_snapshot.values().copied().max().unwrap_or(0),
        "sites": sites,
        "socket": socket_path(home).display().to_string(),
        "sites_root": sites_root(home).display().to_string(),
    })
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    if StdUnixStream::connect(socket).is_ok() {
        return Err(DaemonError::Protocol(format!(
            "daemon socket already in use: {}",
            socket.display()
        )));
    }
    tracing::warn!(socket = %socket.display(), "removing stale daemon socket before bind");

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let mut payload = serde_json::to_string(response)?;
    payload.push('\n');
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use sitekit_core::{EntityId, RemoteProfile};
    use sitekit_sync::pipeline::PartFailure;
    use sitekit_sync::WriteResult;
    use tempfile::TempDir;
    use tokio::time::advance;

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn debounce_coalesces_rapid_saves() {
        let threshold = Duration::from_millis(100);
        let mut debounce = HashMap::<PathBuf, Instant>::new();
        let path = PathBuf::from("/tmp/.sitekit/sites/campaign/config.yaml");
        let mut triggers = 0usize;

        for _ in 0..5 {
            if should_process_event_with_threshold(&mut debounce, &path, Instant::now(), threshold)
            {
                triggers += 1;
            }
            advance(Duration::from_millis(10)).await;
        }
        advance(Duration::from_millis(150)).await;
        if should_process_event_with_threshold(&mut debounce, &path, Instant::now(), threshold) {
            triggers += 1;
        }

        assert_eq!(triggers, 2, "burst collapses to one push, next save pushes again");
    }

    #[test]
    fn site_cache_lists_initialised_sites() {
        let home = TempDir::new().expect("home");
        for name in ["campaign", "foundation"] {
            store::init_at(
                home.path(),
                SiteName::from(name),
                RemoteProfile::new("https://backend.example.org", "anon"),
            )
            .expect("init");
        }
        let cache = load_site_cache(home.path()).expect("cache");
        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache[&SiteName::from("campaign")].remote.url,
            "https://backend.example.org"
        );
    }

    #[test]
    fn status_payload_before_any_push() {
        let home = TempDir::new().expect("home");
        let cache = RwLock::new(SiteCache::new());
        let timestamps = RwLock::new(SyncTimestamps::new());

        let payload = tokio_test::block_on(build_status_payload(
            home.path(),
            &cache,
            &timestamps,
            1_000_000,
        ));
        assert_eq!(payload["running"], json!(true));
        assert_eq!(payload["started_at_unix"], json!(1_000_000u64));
        assert_eq!(payload["last_sync_at_unix"], json!(0u64));
        assert!(payload["sites"].as_array().expect("sites").is_empty());
    }

    #[tokio::test]
    async fn status_payload_reports_per_site_timestamps() {
        let home = TempDir::new().expect("home");
        for name in ["campaign", "foundation"] {
            store::init_at(home.path(), SiteName::from(name), RemoteProfile::new("https://b", "k"))
                .expect("init");
        }
        let cache = RwLock::new(load_site_cache(home.path()).expect("cache"));
        let timestamps = RwLock::new(
            [("campaign".to_string(), 1_000_100u64)]
                .into_iter()
                .collect::<SyncTimestamps>(),
        );

        let payload = build_status_payload(home.path(), &cache, &timestamps, 1_000_000).await;
        assert_eq!(payload["last_sync_at_unix"], json!(1_000_100u64));
        let sites = payload["sites"].as_array().expect("sites");
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0]["name"], "campaign");
        assert_eq!(sites[0]["last_sync_at_unix"], json!(1_000_100u64));
        assert_eq!(sites[1]["name"], "foundation");
        assert_eq!(sites[1]["last_sync_at_unix"], json!(0u64));
    }

    #[test]
    fn summary_counts_changes_and_failures() {
        let report = PushReport {
            site: "campaign".into(),
            writes: vec![
                WriteResult::Inserted {
                    table: "news_items",
                    id: EntityId::from("a"),
                },
                WriteResult::Unchanged {
                    table: "social_links",
                    id: EntityId::from("b"),
                },
            ],
            failures: vec![PartFailure {
                part: "team".into(),
                error: "HTTP 500".into(),
            }],
            ..PushReport::default()
        };
        let results = vec![
            (SiteName::from("campaign"), Ok(report)),
            (
                SiteName::from("foundation"),
                Err(SyncError::NotConfigured {
                    site: "foundation".into(),
                }),
            ),
        ];

        let summary = build_sync_summary("all".into(), "socket", results, Duration::from_millis(7));
        assert_eq!(summary.sites, ["campaign", "foundation"]);
        assert_eq!(summary.changes, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.failures.len(), 2);
        assert!(summary.failures[0].starts_with("campaign/team"));
        assert!(summary.failures[1].starts_with("foundation:"));
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let home = TempDir::new().expect("home");
        let (sync_tx, _sync_rx) = mpsc::channel(1);
        let (shutdown_tx, _) = broadcast::channel(1);
        let state = SocketState {
            home: home.path().to_path_buf(),
            cache: Arc::new(RwLock::new(SiteCache::new())),
            timestamps: Arc::new(RwLock::new(SyncTimestamps::new())),
            sync_tx,
            shutdown_tx,
            started_at_unix: 0,
        };
        let request = DaemonRequest {
            cmd: "render".into(),
            site: None,
        };
        let response = dispatch(&state, request).await;
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("unknown command 'render'"));
    }

    #[tokio::test]
    async fn stop_command_broadcasts_shutdown() {
        let home = TempDir::new().expect("home");
        let (sync_tx, _sync_rx) = mpsc::channel(1);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let state = SocketState {
            home: home.path().to_path_buf(),
            cache: Arc::new(RwLock::new(SiteCache::new())),
            timestamps: Arc::new(RwLock::new(SyncTimestamps::new())),
            sync_tx,
            shutdown_tx,
            started_at_unix: 0,
        };
        let response = dispatch(&state, DaemonRequest::stop()).await;
        assert!(response.ok);
        shutdown_rx.recv().await.expect("shutdown signal");
    }
}
