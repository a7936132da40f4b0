//! Collaborator interfaces consumed by the workflows.
//!
//! The workflows never talk to the network directly. Each external
//! operation is a trait so the HTTP adapter, an in-process fake, or a test
//! double can be plugged in.

use std::sync::Arc;

use protocol::messages::LiveStats;
use protocol::{DownloadLink, FileItem, ProtocolError, Role, SignupResult, UploadFile};
use thiserror::Error;

/// Failure reported by a collaborator.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Missing or expired credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unexpected HTTP status.
    #[error("backend returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Body detail or reason phrase.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Backend answered `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The link could not be opened.
    #[error("failed to open link: {0}")]
    Open(String),
}

impl From<ProtocolError> for BackendError {
    fn from(err: ProtocolError) -> Self {
        BackendError::Decode(err.to_string())
    }
}

/// Result type for collaborator calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Persists an uploaded file.
#[allow(async_fn_in_trait)]
pub trait Uploader {
    /// Upload `file`. Called at most once per accepted candidate.
    async fn upload(&self, file: &UploadFile) -> BackendResult<()>;
}

/// Issues download URLs for catalog entries.
#[allow(async_fn_in_trait)]
pub trait DownloadResolver {
    /// Resolve `file_id` into a backend download URL.
    async fn resolve_download(&self, file_id: &str) -> BackendResult<DownloadLink>;
}

/// Account operations.
#[allow(async_fn_in_trait)]
pub trait Authenticator {
    /// Returns `Ok(false)` for bad credentials or an unverified email;
    /// the two are not distinguished.
    async fn login(&self, email: &str, password: &str, role: Role) -> BackendResult<bool>;

    /// Register a new account.
    async fn signup(&self, email: &str, password: &str, role: Role) -> BackendResult<SignupResult>;
}

/// Supplies the ordered catalog contents.
#[allow(async_fn_in_trait)]
pub trait FileSource {
    /// Files in the order the backend returns them.
    async fn list_files(&self) -> BackendResult<Vec<FileItem>>;
}

/// Service-wide counters.
#[allow(async_fn_in_trait)]
pub trait StatsSource {
    async fn live_stats(&self) -> BackendResult<LiveStats>;
}

/// Opens a URL in a new browsing context.
pub trait LinkOpener {
    fn open(&self, url: &str) -> BackendResult<()>;
}

impl<T: Uploader + ?Sized> Uploader for Arc<T> {
    async fn upload(&self, file: &UploadFile) -> BackendResult<()> {
        (**self).upload(file).await
    }
}

impl<T: DownloadResolver + ?Sized> DownloadResolver for Arc<T> {
    async fn resolve_download(&self, file_id: &str) -> BackendResult<DownloadLink> {
        (**self).resolve_download(file_id).await
    }
}

impl<T: Authenticator + ?Sized> Authenticator for Arc<T> {
    async fn login(&self, email: &str, password: &str, role: Role) -> BackendResult<bool> {
        (**self).login(email, password, role).await
    }

    async fn signup(&self, email: &str, password: &str, role: Role) -> BackendResult<SignupResult> {
        (**self).signup(email, password, role).await
    }
}

impl<T: FileSource + ?Sized> FileSource for Arc<T> {
    async fn list_files(&self) -> BackendResult<Vec<FileItem>> {
        (**self).list_files().await
    }
}

impl<T: StatsSource + ?Sized> StatsSource for Arc<T> {
    async fn live_stats(&self) -> BackendResult<LiveStats> {
        (**self).live_stats().await
    }
}

impl<T: LinkOpener + ?Sized> LinkOpener for Arc<T> {
    fn open(&self, url: &str) -> BackendResult<()> {
        (**self).open(url)
    }
}

/// Opener that records URLs instead of launching anything.
///
/// Used by the command-line front end, which prints the links.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: std::sync::Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs opened so far, oldest first.
    pub fn opened(&self) -> Vec<String> {
        match self.opened.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LinkOpener for RecordingOpener {
    fn open(&self, url: &str) -> BackendResult<()> {
        let mut guard = self
            .opened
            .lock()
            .map_err(|_| BackendError::Open("opener lock poisoned".to_string()))?;
        guard.push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_opener_keeps_order() {
        let opener = RecordingOpener::new();
        opener.open("https://a/1").unwrap();
        opener.open("https://a/2").unwrap();
        assert_eq!(opener.opened(), vec!["https://a/1", "https://a/2"]);
    }

    #[test]
    fn test_arc_opener_delegates() {
        let opener = Arc::new(RecordingOpener::new());
        LinkOpener::open(&opener, "https://a/x").unwrap();
        assert_eq!(opener.opened().len(), 1);
    }

    #[test]
    fn test_protocol_error_maps_to_decode() {
        let err: BackendError = ProtocolError::Deserialization("bad".to_string()).into();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[test]
    fn test_status_display() {
        let err = BackendError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned status 500: boom");
    }
}
