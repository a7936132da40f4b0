//! Upload workflow: file selection, drag-and-drop and upload lifecycle.
//!
//! ```text
//! Idle ──submit──▶ Validating ──ok──▶ Uploading ──▶ Success
//!   ▲                   │                  │
//!   │                   └──rejected──▶ Error ◀──failed
//!   └──────────── next submit / reset ─────┘
//! ```
//!
//! State is published on a [`tokio::sync::watch`] channel so a view can
//! render the uploading indicator while the upload future is pending.

use protocol::UploadFile;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::Uploader;
use crate::validation::{validate_file, ValidationError};

/// Message shown when the uploader fails.
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";

/// Lifecycle of the current upload attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Checking the candidate against the upload rules.
    Validating,
    /// Waiting on the uploader.
    Uploading { file_name: String },
    /// Last attempt succeeded.
    Success { file_name: String },
    /// Last attempt was rejected or failed.
    Error { reason: String },
}

impl UploadStatus {
    /// Whether an upload call is outstanding.
    pub fn is_uploading(&self) -> bool {
        matches!(self, UploadStatus::Uploading { .. })
    }

    /// Inline error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            UploadStatus::Error { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Snapshot published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadView {
    pub status: UploadStatus,
    /// True only while a pointer carrying files hovers the drop target.
    pub drag_active: bool,
}

/// Drop-zone highlight, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZoneTone {
    Dragging,
    Success,
    Error,
    Neutral,
}

impl UploadView {
    /// Highlight for the drop zone.
    pub fn tone(&self) -> DropZoneTone {
        if self.drag_active {
            DropZoneTone::Dragging
        } else {
            match self.status {
                UploadStatus::Success { .. } => DropZoneTone::Success,
                UploadStatus::Error { .. } => DropZoneTone::Error,
                _ => DropZoneTone::Neutral,
            }
        }
    }
}

/// Pointer events on the drop target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Enter,
    Over,
    Leave,
    Drop(Vec<UploadFile>),
}

/// How a drag event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragHandled {
    /// The platform's default file-open behavior must be suppressed.
    pub suppress_default: bool,
    /// Present when a drop carried files.
    pub outcome: Option<SubmitOutcome>,
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The batch was empty.
    Ignored,
    /// An upload is already in flight.
    Busy,
    /// Validation failed; the uploader was not called.
    Rejected(ValidationError),
    /// The uploader accepted the file.
    Uploaded,
    /// The uploader failed.
    Failed,
}

/// Single-slot upload workflow.
pub struct UploadWorkflow<U> {
    uploader: U,
    state: watch::Sender<UploadView>,
}

impl<U: Uploader> UploadWorkflow<U> {
    pub fn new(uploader: U) -> Self {
        let (state, _) = watch::channel(UploadView::default());
        Self { uploader, state }
    }

    /// Current snapshot.
    pub fn view(&self) -> UploadView {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<UploadView> {
        self.state.subscribe()
    }

    /// Files chosen through the file picker.
    pub async fn select_files(&self, files: Vec<UploadFile>) -> SubmitOutcome {
        self.submit_candidate(files).await
    }

    /// Validate and upload the first file of `files`; the rest are dropped.
    pub async fn submit_candidate(&self, files: Vec<UploadFile>) -> SubmitOutcome {
        let Some(file) = files.into_iter().next() else {
            return SubmitOutcome::Ignored;
        };

        let mut busy = false;
        self.state.send_modify(|view| {
            if view.status.is_uploading() {
                busy = true;
            } else {
                view.status = UploadStatus::Validating;
            }
        });
        if busy {
            debug!(file = %file.name, "Upload already in progress, ignoring candidate");
            return SubmitOutcome::Busy;
        }

        if let Err(err) = validate_file(&file.name, file.size) {
            info!(file = %file.name, size = file.size, reason = %err, "Rejected upload candidate");
            self.set_status(UploadStatus::Error {
                reason: err.to_string(),
            });
            return SubmitOutcome::Rejected(err);
        }

        self.set_status(UploadStatus::Uploading {
            file_name: file.name.clone(),
        });
        let mut in_flight = InFlight {
            state: &self.state,
            armed: true,
        };

        let result = self.uploader.upload(&file).await;
        in_flight.armed = false;

        match result {
            Ok(()) => {
                info!(file = %file.name, size = file.size, "Upload complete");
                self.set_status(UploadStatus::Success {
                    file_name: file.name,
                });
                SubmitOutcome::Uploaded
            }
            Err(err) => {
                warn!(file = %file.name, error = %err, "Upload failed");
                self.set_status(UploadStatus::Error {
                    reason: UPLOAD_FAILED_MESSAGE.to_string(),
                });
                SubmitOutcome::Failed
            }
        }
    }

    /// Feed a pointer event from the drop target.
    pub async fn handle_drag(&self, event: DragEvent) -> DragHandled {
        let outcome = match event {
            DragEvent::Enter | DragEvent::Over => {
                self.set_drag(true);
                None
            }
            DragEvent::Leave => {
                self.set_drag(false);
                None
            }
            DragEvent::Drop(files) => {
                self.set_drag(false);
                if files.is_empty() {
                    None
                } else {
                    Some(self.submit_candidate(files).await)
                }
            }
        };

        DragHandled {
            suppress_default: true,
            outcome,
        }
    }

    /// Return to Idle unless an upload is in flight.
    pub fn reset(&self) -> bool {
        self.state.send_if_modified(|view| {
            if view.status.is_uploading() || view.status == UploadStatus::Idle {
                false
            } else {
                view.status = UploadStatus::Idle;
                true
            }
        })
    }

    fn set_status(&self, status: UploadStatus) {
        self.state.send_modify(|view| view.status = status);
    }

    fn set_drag(&self, active: bool) {
        self.state.send_if_modified(|view| {
            let changed = view.drag_active != active;
            view.drag_active = active;
            changed
        });
    }
}

/// Clears the uploading indicator if the upload future is dropped mid-flight.
struct InFlight<'a> {
    state: &'a watch::Sender<UploadView>,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|view| view.status = UploadStatus::Idle);
        }
    }
}
