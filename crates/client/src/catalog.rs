//! File catalog presentation state.
//!
//! The catalog owns the ordered file list supplied by the caller, shows a
//! loading state for a fixed settle delay after mount, and keeps a
//! "last updated" timestamp fresh on a fixed period. The refresh timer is a
//! spawned task owned by the catalog and cancelled on [`FileCatalog::dispose`]
//! or drop.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use protocol::FileItem;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default loading settle delay after mount.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Default period of the "last updated" refresh.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format the distance from `past` to `now` (both Unix seconds).
pub fn format_time_ago(past: u64, now: u64) -> String {
    let elapsed = now.saturating_sub(past);

    if elapsed < 60 {
        "Just now".to_string()
    } else if elapsed < 3600 {
        format!("{}m ago", elapsed / 60)
    } else if elapsed < 86400 {
        format!("{}h ago", elapsed / 3600)
    } else {
        format!("{}d ago", elapsed / 86400)
    }
}

/// Human-readable base-1024 size with one decimal place.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let value = bytes as f64;
    let exponent = (value.ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(SIZE_UNITS.len() - 1);
    let scaled = value / 1024f64.powi(exponent as i32);

    format!("{:.1} {}", scaled, SIZE_UNITS[exponent])
}

/// Current time as Unix seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Catalog timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogTiming {
    pub settle_delay: Duration,
    pub refresh_interval: Duration,
}

impl Default for CatalogTiming {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Whether the list is shown yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogPhase {
    Loading,
    Ready,
}

/// Freshness timestamp and how often it has been refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    /// Unix seconds of the last refresh.
    pub last_updated: u64,
    /// Refreshes since mount (or since the files were last replaced).
    pub refreshes: u64,
}

/// Snapshot published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogState {
    pub phase: CatalogPhase,
    pub freshness: Freshness,
}

/// Button state for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadButton {
    /// Clickable.
    Ready,
    /// Disabled while the link is generated.
    Generating,
}

impl DownloadButton {
    pub fn label(&self) -> &'static str {
        match self {
            DownloadButton::Ready => "Download",
            DownloadButton::Generating => "Generating...",
        }
    }

    pub fn disabled(&self) -> bool {
        matches!(self, DownloadButton::Generating)
    }
}

/// One rendered catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub id: String,
    pub name: String,
    pub uploaded_by: String,
    pub uploaded: String,
    pub size: String,
    pub button: DownloadButton,
}

/// Rendered catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogView {
    Loading,
    Empty,
    List {
        header: String,
        last_updated: String,
        rows: Vec<CatalogRow>,
    },
}

/// Owned handle to the refresh task.
struct RefreshTimer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    fn stop(&self) {
        self.token.cancel();
        self.handle.abort();
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Mounted file catalog.
///
/// Must be created inside a tokio runtime.
pub struct FileCatalog {
    files: Vec<FileItem>,
    state: Arc<watch::Sender<CatalogState>>,
    timing: CatalogTiming,
    clock: fn() -> u64,
    timer: Option<RefreshTimer>,
}

impl FileCatalog {
    /// Mount with the default timing and wall clock.
    pub fn mount(files: Vec<FileItem>) -> Self {
        Self::mount_with(files, CatalogTiming::default(), now_secs)
    }

    /// Mount with explicit timing and clock.
    pub fn mount_with(files: Vec<FileItem>, timing: CatalogTiming, clock: fn() -> u64) -> Self {
        let (state, _) = watch::channel(CatalogState {
            phase: CatalogPhase::Loading,
            freshness: Freshness {
                last_updated: clock(),
                refreshes: 0,
            },
        });

        let mut catalog = Self {
            files,
            state: Arc::new(state),
            timing,
            clock,
            timer: None,
        };
        catalog.start_timer();
        catalog
    }

    /// Files in the order they were supplied.
    pub fn files(&self) -> &[FileItem] {
        &self.files
    }

    /// Current snapshot.
    pub fn state(&self) -> CatalogState {
        *self.state.borrow()
    }

    /// Receiver notified on phase and freshness changes.
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Whether the refresh timer is still owned.
    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    /// Supply a new file list; restarts the settle delay and the timer.
    pub fn replace_files(&mut self, files: Vec<FileItem>) {
        debug!(count = files.len(), "Replacing catalog files");
        self.files = files;
        self.stop_timer();
        let now = (self.clock)();
        self.state.send_modify(|state| {
            state.phase = CatalogPhase::Loading;
            state.freshness = Freshness {
                last_updated: now,
                refreshes: 0,
            };
        });
        self.start_timer();
    }

    /// Tear down: cancel the refresh timer. No refresh runs afterwards.
    pub fn dispose(&mut self) {
        if self.timer.is_some() {
            debug!("Disposing file catalog");
        }
        self.stop_timer();
    }

    /// Render the catalog at `now` (Unix seconds).
    ///
    /// `is_downloading` reports download-guard membership per file id.
    pub fn render(&self, now: u64, is_downloading: impl Fn(&str) -> bool) -> CatalogView {
        let state = self.state();
        if state.phase == CatalogPhase::Loading {
            return CatalogView::Loading;
        }
        if self.files.is_empty() {
            return CatalogView::Empty;
        }

        let count = self.files.len();
        let header = format!(
            "{} file{} available for download",
            count,
            if count == 1 { "" } else { "s" }
        );

        let rows = self
            .files
            .iter()
            .map(|file| CatalogRow {
                id: file.id.clone(),
                name: file.name.clone(),
                uploaded_by: file.uploaded_by.clone(),
                uploaded: format_time_ago(file.uploaded_at, now),
                size: format_file_size(file.size),
                button: if is_downloading(&file.id) {
                    DownloadButton::Generating
                } else {
                    DownloadButton::Ready
                },
            })
            .collect();

        CatalogView::List {
            header,
            last_updated: format_time_ago(state.freshness.last_updated, now),
            rows,
        }
    }

    fn start_timer(&mut self) {
        let token = CancellationToken::new();
        let state = Arc::clone(&self.state);
        let timing = self.timing;
        let clock = self.clock;
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => return,
                _ = tokio::time::sleep(timing.settle_delay) => {}
            }
            state.send_modify(|s| {
                s.phase = CatalogPhase::Ready;
                s.freshness.last_updated = clock();
                s.freshness.refreshes += 1;
            });

            let mut ticker = interval_at(
                Instant::now() + timing.refresh_interval,
                timing.refresh_interval,
            );
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        state.send_modify(|s| {
                            s.freshness.last_updated = clock();
                            s.freshness.refreshes += 1;
                        });
                    }
                }
            }
        });

        self.timer = Some(RefreshTimer { token, handle });
    }

    fn stop_timer(&mut self) {
        // Dropping the handle cancels and aborts the task.
        self.timer.take();
    }
}

impl Drop for FileCatalog {
    fn drop(&mut self) {
        self.stop_timer();
    }
}
