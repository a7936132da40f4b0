//! Per-file download guard and secure-link construction.
//!
//! A file id is a member of the downloading set from the moment a request
//! starts until it completes, whatever the outcome. A second request for a
//! member id is a no-op; distinct ids may be pending at the same time.

use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashSet;
use protocol::token;
use tracing::{debug, error, info};

use crate::backend::{DownloadResolver, LinkOpener};

/// Result of [`DownloadGuard::request_download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The secure link was built and handed to the opener.
    Opened(String),
    /// A request for this id is already pending.
    AlreadyInFlight,
    /// The resolver or opener failed.
    Failed(String),
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Concurrency guard in front of the download resolver.
pub struct DownloadGuard<R, O> {
    resolver: R,
    opener: O,
    origin: String,
    downloading: DashSet<String>,
    clock: fn() -> u64,
}

impl<R: DownloadResolver, O: LinkOpener> DownloadGuard<R, O> {
    /// Create a guard that builds links under `origin`.
    pub fn new(resolver: R, opener: O, origin: impl Into<String>) -> Self {
        Self {
            resolver,
            opener,
            origin: origin.into(),
            downloading: DashSet::new(),
            clock: now_millis,
        }
    }

    /// Replace the millisecond clock used for tokens.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Whether a request for `file_id` is pending.
    ///
    /// Callers disable their trigger while this holds.
    pub fn is_downloading(&self, file_id: &str) -> bool {
        self.downloading.contains(file_id)
    }

    /// Ids currently awaiting resolution, in no particular order.
    pub fn in_flight(&self) -> Vec<String> {
        self.downloading.iter().map(|id| id.key().clone()).collect()
    }

    /// Resolve `file_id` and open its secure-download link.
    pub async fn request_download(&self, file_id: &str) -> DownloadOutcome {
        if !self.downloading.insert(file_id.to_string()) {
            debug!(file_id, "Download already in flight");
            return DownloadOutcome::AlreadyInFlight;
        }
        let _entry = Membership {
            set: &self.downloading,
            id: file_id,
        };

        let link = match self.resolver.resolve_download(file_id).await {
            Ok(link) => link,
            Err(err) => {
                error!(file_id, error = %err, "Download failed");
                return DownloadOutcome::Failed(err.to_string());
            }
        };
        debug!(file_id, backend_url = %link.download_url, "Resolved download link");

        let url = token::secure_download_url(&self.origin, file_id, (self.clock)());
        match self.opener.open(&url) {
            Ok(()) => {
                info!(file_id, "Opened secure download link");
                DownloadOutcome::Opened(url)
            }
            Err(err) => {
                error!(file_id, error = %err, "Download failed");
                DownloadOutcome::Failed(err.to_string())
            }
        }
    }
}

/// Removes the id from the downloading set on every exit path.
struct Membership<'a> {
    set: &'a DashSet<String>,
    id: &'a str,
}

impl Drop for Membership<'_> {
    fn drop(&mut self) {
        self.set.remove(self.id);
    }
}
